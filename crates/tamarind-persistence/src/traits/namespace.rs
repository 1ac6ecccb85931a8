//! Namespace persistence trait

use async_trait::async_trait;

/// Namespace persistence operations
#[async_trait]
pub trait NamespacePersistence: Send + Sync {
    /// Create a namespace
    ///
    /// Fails with `Validation` for an empty name and `Conflict` when it exists.
    async fn namespace_create(&self, name: &str) -> anyhow::Result<()>;

    /// Delete a namespace
    ///
    /// Fails with `Forbidden` for the default namespace or while configs
    /// still reference it, and with `NotFound` when absent.
    async fn namespace_delete(&self, name: &str) -> anyhow::Result<()>;

    /// All namespace names, sorted
    async fn namespace_find_all(&self) -> anyhow::Result<Vec<String>>;

    /// Check whether a namespace exists
    async fn namespace_check(&self, name: &str) -> anyhow::Result<bool>;
}
