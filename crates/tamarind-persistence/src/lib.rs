//! Tamarind Persistence - Storage model and backends
//!
//! This crate provides:
//! - Domain model types shared by every backend
//! - Persistence trait abstractions for unified storage
//! - An in-memory backend and a SeaORM-backed relational backend

pub mod entity;
pub mod memory;
pub mod model;
pub mod sql;
pub mod traits;

// Re-export sea-orm for convenience
pub use sea_orm;

// Re-export persistence traits
pub use traits::{AuthPersistence, ConfigPersistence, NamespacePersistence, PersistenceService};

// Re-export backends
pub use memory::MemoryPersistService;
pub use sql::ExternalDbPersistService;

// Re-export model types
pub use model::{
    Config, ConfigHistory, ConfigKey, ConfigType, OpType, StorageMode, TokenUsage, User,
    UserRole, UserStatus,
};
