//! Tamarind Auth - Authentication and session lifecycle
//!
//! This crate provides:
//! - Signed access/refresh token issuance and validation
//! - Revocation and per-token rate limiting
//! - User lifecycle with the last-admin guard
//! - Background sweep of expired token state

pub mod model;
pub mod service;

// Re-export commonly used types
pub use model::*;
pub use service::session::SessionService;
pub use service::token::TokenService;
pub use service::user::UserService;
