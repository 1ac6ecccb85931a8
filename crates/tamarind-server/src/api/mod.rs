//! REST handlers under `/api/v1`

pub mod auth;
pub mod config;
pub mod health;
pub mod namespace;
pub mod route;
pub mod user;

use actix_web::{error, web};

use tamarind_common::TamarindError;

use crate::error::ApiError;

/// Report malformed JSON bodies with the standard error envelope
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(|err, _req| {
        let message = err.to_string();
        error::InternalError::from_response(
            err,
            actix_web::ResponseError::error_response(&ApiError::from(
                TamarindError::Validation(message),
            )),
        )
        .into()
    })
}

/// Report malformed path segments with the standard error envelope
pub fn path_config() -> web::PathConfig {
    web::PathConfig::default().error_handler(|err, _req| {
        let message = err.to_string();
        error::InternalError::from_response(
            err,
            actix_web::ResponseError::error_response(&ApiError::from(
                TamarindError::Validation(message),
            )),
        )
        .into()
    })
}
