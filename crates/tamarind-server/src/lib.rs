//! Tamarind Server - HTTP surface of the configuration service
//!
//! Wires the persistence backend, config and auth services into an
//! actix-web application:
//! - `api`: REST handlers under `/api/v1`
//! - `middleware`: bearer-token authorization
//! - `model`: configuration, shared state and response bodies
//! - `startup`: logging, HTTP server and shutdown handling

pub mod api;
pub mod error;
pub mod middleware;
pub mod model;
pub mod startup;

pub use error::ApiError;
pub use model::app_state::AppState;
pub use model::config::Configuration;
