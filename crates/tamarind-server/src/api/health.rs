use actix_web::{HttpResponse, get, http::StatusCode, web};
use serde::Serialize;

use tamarind_common::error::SERVICE_UNAVAILABLE;

use crate::model::{app_state::AppState, response};

#[derive(Debug, Serialize)]
struct HealthStatus {
    status: &'static str,
    storage: String,
}

/// Liveness plus a round trip to the persistence backend
#[get("/health")]
async fn health(data: web::Data<AppState>) -> HttpResponse {
    let storage = data.persistence.storage_mode().to_string();

    match data.persistence.health_check().await {
        Ok(()) => response::http_ok(HealthStatus {
            status: "UP",
            storage,
        }),
        Err(e) => {
            tracing::warn!("Health check failed for {} storage: {}", storage, e);
            response::Result::<()>::http_response(
                StatusCode::SERVICE_UNAVAILABLE,
                SERVICE_UNAVAILABLE.code,
                SERVICE_UNAVAILABLE.message.to_string(),
                (),
            )
        }
    }
}
