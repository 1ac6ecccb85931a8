use actix_web::{HttpResponse, delete, get, post, put, web};
use serde::Deserialize;

use tamarind_auth::{AuthContext, service::user::UserUpdate};
use tamarind_persistence::UserRole;

use crate::{error::ApiError, model::app_state::AppState, model::response};

#[derive(Debug, Deserialize)]
pub struct CreateUserForm {
    #[serde(default)]
    username: String,
    #[serde(default)]
    password: String,
    #[serde(default)]
    role: UserRole,
}

#[get("/users")]
async fn list(
    data: web::Data<AppState>,
    auth: web::ReqData<AuthContext>,
) -> Result<HttpResponse, ApiError> {
    data.user_service.require_admin(&auth.username).await?;

    let users = data.user_service.list().await?;
    Ok(response::http_ok(users))
}

#[post("/users")]
async fn create(
    data: web::Data<AppState>,
    auth: web::ReqData<AuthContext>,
    body: web::Json<CreateUserForm>,
) -> Result<HttpResponse, ApiError> {
    data.user_service.require_admin(&auth.username).await?;

    let user = data
        .user_service
        .create(&body.username, &body.password, body.role)
        .await?;
    Ok(response::http_created(user))
}

#[get("/users/{username}")]
async fn get_user(
    data: web::Data<AppState>,
    auth: web::ReqData<AuthContext>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    data.user_service.require_admin(&auth.username).await?;

    let user = data.user_service.get(&path).await?;
    Ok(response::http_ok(user))
}

#[put("/users/{username}")]
async fn update(
    data: web::Data<AppState>,
    auth: web::ReqData<AuthContext>,
    path: web::Path<String>,
    body: web::Json<UserUpdate>,
) -> Result<HttpResponse, ApiError> {
    data.user_service.require_admin(&auth.username).await?;

    let user = data
        .user_service
        .update(&path, body.into_inner())
        .await?;
    Ok(response::http_ok(user))
}

#[delete("/users/{username}")]
async fn remove(
    data: web::Data<AppState>,
    auth: web::ReqData<AuthContext>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    data.user_service.require_admin(&auth.username).await?;

    data.user_service.delete(&path).await?;
    Ok(HttpResponse::NoContent().finish())
}
