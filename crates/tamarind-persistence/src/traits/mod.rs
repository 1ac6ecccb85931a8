//! Persistence traits for the unified storage abstraction layer
//!
//! These traits abstract over the in-memory backend and the external
//! relational database backend. Getters return `Option` for absent rows so
//! callers decide whether absence is an error.

pub mod auth;
pub mod config;
pub mod namespace;

pub use auth::AuthPersistence;
pub use config::ConfigPersistence;
pub use namespace::NamespacePersistence;

use async_trait::async_trait;

use crate::model::StorageMode;

/// Unified persistence service trait
///
/// This is the main interface for all storage operations. The store never
/// emits change notifications; that is the caller's job after a successful
/// mutation.
#[async_trait]
pub trait PersistenceService:
    ConfigPersistence + NamespacePersistence + AuthPersistence + Send + Sync
{
    /// Get the current storage mode
    fn storage_mode(&self) -> StorageMode;

    /// Health check for the storage backend
    async fn health_check(&self) -> anyhow::Result<()>;
}
