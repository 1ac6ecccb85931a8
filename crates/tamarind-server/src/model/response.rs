//! HTTP response bodies

use actix_web::{HttpResponse, HttpResponseBuilder, http::StatusCode};
use serde::{Deserialize, Serialize};

/// Envelope carried by every error response
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Result<T> {
    pub code: i32,
    pub message: String,
    pub data: T,
}

impl<T> Result<T> {
    pub fn new(code: i32, message: String, data: T) -> Self {
        Result::<T> {
            code,
            message,
            data,
        }
    }

    pub fn http_response(
        status: StatusCode,
        code: i32,
        message: String,
        data: impl Serialize,
    ) -> HttpResponse {
        HttpResponseBuilder::new(status).json(Result::new(code, message, data))
    }
}

/// Plain JSON body for a successful call
pub fn http_ok(data: impl Serialize) -> HttpResponse {
    HttpResponse::Ok().json(data)
}

pub fn http_created(data: impl Serialize) -> HttpResponse {
    HttpResponse::Created().json(data)
}
