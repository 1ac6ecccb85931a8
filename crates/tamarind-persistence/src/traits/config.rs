//! Config persistence trait
//!
//! Defines the interface for config entries and their history records.

use async_trait::async_trait;

use crate::model::{Config, ConfigHistory, ConfigKey};

/// Config and config history persistence operations
#[async_trait]
pub trait ConfigPersistence: Send + Sync {
    // ==================== Config Operations ====================

    /// Find a config by its composite key
    async fn config_find_one(&self, key: &ConfigKey) -> anyhow::Result<Option<Config>>;

    /// Insert or overwrite a config
    ///
    /// On conflict the value, type, version and `updated_*` fields are
    /// replaced while `created_*` fields are kept.
    async fn config_upsert(&self, config: &Config) -> anyhow::Result<()>;

    /// Remove a config; removing an absent key succeeds
    async fn config_delete(&self, key: &ConfigKey) -> anyhow::Result<()>;

    /// All configs in a group, in no particular order
    async fn config_list(&self, namespace: &str, group: &str) -> anyhow::Result<Vec<Config>>;

    /// Number of configs referencing a namespace
    async fn config_count_by_namespace(&self, namespace: &str) -> anyhow::Result<u64>;

    // ==================== History Operations ====================

    /// Append a history record
    async fn history_create(&self, record: &ConfigHistory) -> anyhow::Result<()>;

    /// History of a key ordered by version, newest first
    async fn history_list(&self, key: &ConfigKey) -> anyhow::Result<Vec<ConfigHistory>>;

    /// Find the history record carrying an exact version
    async fn history_find_by_version(
        &self,
        key: &ConfigKey,
        version: i64,
    ) -> anyhow::Result<Option<ConfigHistory>>;

    /// Highest version ever recorded for a key
    async fn history_max_version(&self, key: &ConfigKey) -> anyhow::Result<Option<i64>>;
}
