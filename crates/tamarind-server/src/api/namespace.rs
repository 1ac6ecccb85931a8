use actix_web::{HttpResponse, delete, get, post, web};
use serde::{Deserialize, Serialize};

use crate::{error::ApiError, model::app_state::AppState, model::response};

#[derive(Debug, Serialize, Deserialize)]
pub struct NamespaceForm {
    #[serde(default)]
    name: String,
}

#[get("/namespaces")]
async fn list(data: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let namespaces = data.namespace_service.list().await?;
    Ok(response::http_ok(namespaces))
}

#[post("/namespaces")]
async fn create(
    data: web::Data<AppState>,
    body: web::Json<NamespaceForm>,
) -> Result<HttpResponse, ApiError> {
    let form = body.into_inner();
    data.namespace_service.create(&form.name).await?;
    Ok(response::http_created(form))
}

/// Only empty, non-default namespaces can be removed
#[delete("/namespaces/{namespace}")]
async fn remove(
    data: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    data.namespace_service.delete(&path).await?;
    Ok(HttpResponse::NoContent().finish())
}
