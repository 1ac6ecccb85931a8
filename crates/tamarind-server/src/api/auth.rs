use actix_web::{HttpResponse, post, web};
use serde::Deserialize;

use tamarind_auth::AuthContext;
use tamarind_common::TamarindError;

use crate::{error::ApiError, model::app_state::AppState, model::response};

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    username: String,
    #[serde(default)]
    password: String,
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    #[serde(default)]
    refresh_token: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct LogoutRequest {
    refresh_token: Option<String>,
}

#[post("/login")]
async fn login(
    data: web::Data<AppState>,
    body: web::Json<LoginRequest>,
) -> Result<HttpResponse, ApiError> {
    let pair = data
        .session_service
        .login(&body.username, &body.password)
        .await?;

    Ok(response::http_ok(pair))
}

#[post("/refresh")]
async fn refresh(
    data: web::Data<AppState>,
    body: web::Json<RefreshRequest>,
) -> Result<HttpResponse, ApiError> {
    if body.refresh_token.is_empty() {
        return Err(TamarindError::validation("refresh_token is required").into());
    }

    let pair = data.session_service.refresh(&body.refresh_token).await?;

    Ok(response::http_ok(pair))
}

/// Revoke the calling token and optionally its refresh token
#[post("/logout")]
async fn logout(
    data: web::Data<AppState>,
    auth: web::ReqData<AuthContext>,
    body: Option<web::Json<LogoutRequest>>,
) -> Result<HttpResponse, ApiError> {
    let refresh_token = body.and_then(|b| b.into_inner().refresh_token);

    data.session_service
        .logout(&auth, refresh_token.as_deref())
        .await?;

    Ok(HttpResponse::NoContent().finish())
}
