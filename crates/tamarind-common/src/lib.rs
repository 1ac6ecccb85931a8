//! Tamarind Common - Shared types and utilities
//!
//! This crate provides the foundational types used across all Tamarind components:
//! - Error taxonomy and error codes
//! - Name validation helpers
//! - Common constants

pub mod error;
pub mod utils;

pub use error::{AppError, ErrorCode, TamarindError};
pub use utils::{is_valid, validate_name};

/// Namespace that always exists and can never be deleted
pub const DEFAULT_NAMESPACE: &str = "public";

/// Username of the bootstrap administrator
pub const DEFAULT_ADMIN_USERNAME: &str = "admin";

/// Version carried by the notification emitted when a config is deleted
pub const DELETED_VERSION: i64 = -1;
