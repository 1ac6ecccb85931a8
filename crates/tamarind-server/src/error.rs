// Error handling for the HTTP surface
// Maps the shared error taxonomy onto status codes and error bodies

use std::fmt::{Display, Formatter};

use actix_web::{HttpResponse, http::StatusCode};

use tamarind_common::error::{AppError, SERVER_ERROR, TamarindError};

use crate::model::response as common;

// Local wrapper so actix-web error handling can be implemented
// (Cannot impl foreign trait for foreign type due to orphan rules)
#[derive(Debug)]
pub struct ApiError {
    inner: AppError,
}

impl Display for ApiError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.inner)
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(value: anyhow::Error) -> Self {
        ApiError {
            inner: AppError::from(value),
        }
    }
}

impl From<TamarindError> for ApiError {
    fn from(value: TamarindError) -> Self {
        ApiError {
            inner: AppError::from(value),
        }
    }
}

impl ApiError {
    pub fn kind(&self) -> Option<&TamarindError> {
        self.inner.kind()
    }
}

pub fn status_of(err: &TamarindError) -> StatusCode {
    match err {
        TamarindError::NotFound(_) => StatusCode::NOT_FOUND,
        TamarindError::Conflict(_) => StatusCode::CONFLICT,
        TamarindError::Validation(_) => StatusCode::BAD_REQUEST,
        TamarindError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
        TamarindError::RateLimited(_) => StatusCode::TOO_MANY_REQUESTS,
        TamarindError::Forbidden(_) => StatusCode::FORBIDDEN,
        TamarindError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl actix_web::error::ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        self.kind()
            .map(status_of)
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }

    fn error_response(&self) -> HttpResponse {
        match self.kind() {
            Some(TamarindError::Internal(_)) | None => {
                tracing::error!("Request failed: {:#}", self.inner.inner());
                common::Result::<()>::http_response(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    SERVER_ERROR.code,
                    SERVER_ERROR.message.to_string(),
                    (),
                )
            }
            Some(err) => common::Result::<()>::http_response(
                status_of(err),
                err.error_code().code,
                err.to_string(),
                (),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::ResponseError;
    use tamarind_common::error::{RATE_LIMITED, RESOURCE_NOT_FOUND};

    #[test]
    fn test_status_mapping() {
        let cases = [
            (TamarindError::NotFound(String::new()), 404),
            (TamarindError::Conflict(String::new()), 409),
            (TamarindError::Validation(String::new()), 400),
            (TamarindError::Unauthorized(String::new()), 401),
            (TamarindError::RateLimited(String::new()), 429),
            (TamarindError::Forbidden(String::new()), 403),
            (TamarindError::Internal(String::new()), 500),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status_code().as_u16(), status);
        }
    }

    #[test]
    fn test_unknown_error_is_internal() {
        let err = ApiError::from(anyhow::anyhow!("connection refused"));
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(err.kind().is_none());
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(
            TamarindError::NotFound(String::new()).error_code(),
            RESOURCE_NOT_FOUND
        );
        assert_eq!(
            TamarindError::RateLimited(String::new()).error_code(),
            RATE_LIMITED
        );
        let resp = ApiError::from(TamarindError::not_found("config x not found")).error_response();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }
}
