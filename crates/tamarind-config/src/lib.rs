//! Tamarind Config - Versioned configuration management
//!
//! This crate provides:
//! - The versioning and history engine wrapping every config mutation
//! - Namespace management
//! - Key-scoped long-poll change notification

pub mod service;

pub use service::config::ConfigService;
pub use service::namespace::NamespaceService;
pub use service::watcher::{Subscription, WatchOutcome, Watcher};
