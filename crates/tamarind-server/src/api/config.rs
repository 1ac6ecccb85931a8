use std::str::FromStr;

use actix_web::{HttpResponse, delete, get, post, put, web};
use serde::Deserialize;

use tamarind_auth::AuthContext;
use tamarind_common::TamarindError;
use tamarind_config::WatchOutcome;
use tamarind_persistence::{ConfigKey, ConfigType};

use crate::{error::ApiError, model::app_state::AppState, model::response};

#[derive(Debug, Deserialize)]
struct GroupPath {
    namespace: String,
    group: String,
}

#[derive(Debug, Deserialize)]
struct ConfigPath {
    namespace: String,
    group: String,
    key: String,
}

impl ConfigPath {
    fn config_key(&self) -> ConfigKey {
        ConfigKey::new(&self.namespace, &self.group, &self.key)
    }
}

#[derive(Debug, Deserialize)]
pub struct PublishForm {
    #[serde(default)]
    value: String,
    #[serde(rename = "type")]
    config_type: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RollbackForm {
    version: i64,
}

#[get("/namespaces/{namespace}/groups/{group}/configs")]
async fn list(
    data: web::Data<AppState>,
    path: web::Path<GroupPath>,
) -> Result<HttpResponse, ApiError> {
    let configs = data
        .config_service
        .list(&path.namespace, &path.group)
        .await?;
    Ok(response::http_ok(configs))
}

#[get("/namespaces/{namespace}/groups/{group}/configs/{key}")]
async fn get_config(
    data: web::Data<AppState>,
    path: web::Path<ConfigPath>,
) -> Result<HttpResponse, ApiError> {
    let config = data.config_service.get(&path.config_key()).await?;
    Ok(response::http_ok(config))
}

#[put("/namespaces/{namespace}/groups/{group}/configs/{key}")]
async fn publish(
    data: web::Data<AppState>,
    auth: web::ReqData<AuthContext>,
    path: web::Path<ConfigPath>,
    body: web::Json<PublishForm>,
) -> Result<HttpResponse, ApiError> {
    let form = body.into_inner();
    let config_type = match form.config_type.as_deref() {
        Some(t) => ConfigType::from_str(t).map_err(TamarindError::Validation)?,
        None => ConfigType::default(),
    };

    let config = data
        .config_service
        .publish(&path.config_key(), &form.value, config_type, &auth.username)
        .await?;

    Ok(response::http_created(config))
}

#[delete("/namespaces/{namespace}/groups/{group}/configs/{key}")]
async fn remove(
    data: web::Data<AppState>,
    auth: web::ReqData<AuthContext>,
    path: web::Path<ConfigPath>,
) -> Result<HttpResponse, ApiError> {
    data.config_service
        .delete(&path.config_key(), &auth.username)
        .await?;
    Ok(HttpResponse::NoContent().finish())
}

/// Long-poll until the key changes or the watch window closes
///
/// A client that disconnects drops this future, which releases its
/// subscription.
#[get("/namespaces/{namespace}/groups/{group}/configs/{key}/watch")]
async fn watch(
    data: web::Data<AppState>,
    path: web::Path<ConfigPath>,
) -> Result<HttpResponse, ApiError> {
    let outcome = data
        .config_service
        .watch(path.config_key(), data.watch_timeout)
        .await?;

    match outcome {
        WatchOutcome::Changed(config) => Ok(response::http_ok(config)),
        WatchOutcome::Timeout => Ok(HttpResponse::NotModified().finish()),
    }
}

#[get("/namespaces/{namespace}/groups/{group}/configs/{key}/history")]
async fn history(
    data: web::Data<AppState>,
    path: web::Path<ConfigPath>,
) -> Result<HttpResponse, ApiError> {
    let records = data.config_service.history(&path.config_key()).await?;
    Ok(response::http_ok(records))
}

#[post("/namespaces/{namespace}/groups/{group}/configs/{key}/rollback")]
async fn rollback(
    data: web::Data<AppState>,
    auth: web::ReqData<AuthContext>,
    path: web::Path<ConfigPath>,
    body: web::Json<RollbackForm>,
) -> Result<HttpResponse, ApiError> {
    let config = data
        .config_service
        .rollback(&path.config_key(), body.version, &auth.username)
        .await?;
    Ok(response::http_ok(config))
}
