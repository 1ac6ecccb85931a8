//! Error types and error codes for Tamarind
//!
//! This module defines:
//! - `TamarindError`: the closed error taxonomy shared by every component
//! - `AppError`: wrapper carried across the HTTP boundary
//! - `ErrorCode`: structured error codes for API responses

use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

/// Application-specific error types
///
/// Each variant maps to exactly one HTTP status at the API surface.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum TamarindError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    RateLimited(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl TamarindError {
    pub fn not_found(msg: impl Into<String>) -> anyhow::Error {
        TamarindError::NotFound(msg.into()).into()
    }

    pub fn conflict(msg: impl Into<String>) -> anyhow::Error {
        TamarindError::Conflict(msg.into()).into()
    }

    pub fn validation(msg: impl Into<String>) -> anyhow::Error {
        TamarindError::Validation(msg.into()).into()
    }

    pub fn unauthorized(msg: impl Into<String>) -> anyhow::Error {
        TamarindError::Unauthorized(msg.into()).into()
    }

    pub fn forbidden(msg: impl Into<String>) -> anyhow::Error {
        TamarindError::Forbidden(msg.into()).into()
    }

    /// Error code reported to clients for this variant
    pub fn error_code(&self) -> ErrorCode<'static> {
        match self {
            TamarindError::NotFound(_) => RESOURCE_NOT_FOUND,
            TamarindError::Conflict(_) => RESOURCE_CONFLICT,
            TamarindError::Validation(_) => PARAMETER_VALIDATE_ERROR,
            TamarindError::Unauthorized(_) => UNAUTHORIZED,
            TamarindError::RateLimited(_) => RATE_LIMITED,
            TamarindError::Forbidden(_) => ACCESS_DENIED,
            TamarindError::Internal(_) => SERVER_ERROR,
        }
    }
}

/// Wrapper for application errors
#[derive(Debug)]
pub struct AppError {
    inner: anyhow::Error,
}

impl Display for AppError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.inner)
    }
}

impl From<anyhow::Error> for AppError {
    fn from(value: anyhow::Error) -> Self {
        AppError { inner: value }
    }
}

impl From<TamarindError> for AppError {
    fn from(value: TamarindError) -> Self {
        AppError {
            inner: value.into(),
        }
    }
}

impl AppError {
    pub fn inner(&self) -> &anyhow::Error {
        &self.inner
    }

    /// The taxonomy variant behind this error, if any
    pub fn kind(&self) -> Option<&TamarindError> {
        self.inner.downcast_ref::<TamarindError>()
    }
}

/// Error code structure for API responses
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorCode<'a> {
    pub code: i32,
    pub message: &'a str,
}

pub const SUCCESS: ErrorCode<'static> = ErrorCode {
    code: 0,
    message: "success",
};

pub const UNAUTHORIZED: ErrorCode<'static> = ErrorCode {
    code: 10000,
    message: "unauthorized",
};

pub const ACCESS_DENIED: ErrorCode<'static> = ErrorCode {
    code: 10001,
    message: "access denied",
};

pub const RATE_LIMITED: ErrorCode<'static> = ErrorCode {
    code: 10002,
    message: "rate limit exceeded",
};

pub const PARAMETER_VALIDATE_ERROR: ErrorCode<'static> = ErrorCode {
    code: 20002,
    message: "parameter validate error",
};

pub const RESOURCE_NOT_FOUND: ErrorCode<'static> = ErrorCode {
    code: 20004,
    message: "resource not found",
};

pub const RESOURCE_CONFLICT: ErrorCode<'static> = ErrorCode {
    code: 20005,
    message: "resource conflict",
};

pub const SERVER_ERROR: ErrorCode<'static> = ErrorCode {
    code: 30000,
    message: "internal server error",
};

pub const SERVICE_UNAVAILABLE: ErrorCode<'static> = ErrorCode {
    code: 30001,
    message: "storage unavailable",
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tamarind_error_display() {
        let err = TamarindError::NotFound("config not found".to_string());
        assert_eq!(format!("{}", err), "config not found");

        let err = TamarindError::Internal("connection reset".to_string());
        assert_eq!(format!("{}", err), "internal error: connection reset");
    }

    #[test]
    fn test_error_code_mapping() {
        assert_eq!(
            TamarindError::Conflict(String::new()).error_code(),
            RESOURCE_CONFLICT
        );
        assert_eq!(
            TamarindError::RateLimited(String::new()).error_code(),
            RATE_LIMITED
        );
        assert_eq!(
            TamarindError::Forbidden(String::new()).error_code(),
            ACCESS_DENIED
        );
    }

    #[test]
    fn test_app_error_keeps_kind() {
        let app_err = AppError::from(TamarindError::validation("empty name"));
        assert_eq!(
            app_err.kind(),
            Some(&TamarindError::Validation("empty name".to_string()))
        );

        let app_err = AppError::from(anyhow::anyhow!("socket closed"));
        assert!(app_err.kind().is_none());
        assert_eq!(format!("{}", app_err), "socket closed");
    }
}
