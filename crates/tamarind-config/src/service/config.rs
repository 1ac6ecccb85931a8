//! Config service layer
//!
//! Wraps every config mutation with a per-key version stamp, an immutable
//! history record and a watch notification.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use dashmap::DashMap;
use tokio::sync::Mutex;

use tamarind_common::{TamarindError, validate_name};
use tamarind_persistence::{
    Config, ConfigHistory, ConfigKey, ConfigType, OpType, PersistenceService,
};

use crate::service::watcher::{WatchOutcome, Watcher};

/// Last version handed out for a key; `None` until seeded from storage
type VersionSlot = Arc<Mutex<Option<i64>>>;

fn validate_key(key: &ConfigKey) -> anyhow::Result<()> {
    validate_name("namespace", &key.namespace)?;
    validate_name("group", &key.group)?;
    validate_name("key", &key.key)
}

/// Versioned config store
///
/// Mutations of one key are serialized by that key's version slot, so
/// version order equals mutation order and versions never collide. Unrelated
/// keys proceed in parallel.
pub struct ConfigService {
    persistence: Arc<dyn PersistenceService>,
    watcher: Watcher,
    versions: DashMap<ConfigKey, VersionSlot>,
}

impl ConfigService {
    pub fn new(persistence: Arc<dyn PersistenceService>, watcher: Watcher) -> Self {
        Self {
            persistence,
            watcher,
            versions: DashMap::new(),
        }
    }

    pub fn watcher(&self) -> &Watcher {
        &self.watcher
    }

    fn version_slot(&self, key: &ConfigKey) -> VersionSlot {
        self.versions.entry(key.clone()).or_default().clone()
    }

    /// Reserve the next version for `key`
    ///
    /// The slot is seeded from the highest version found in the current
    /// config or its history, so counters survive restarts on durable
    /// backends. Reserved numbers are never reused, even if the write fails.
    async fn reserve_version(
        &self,
        key: &ConfigKey,
        slot: &mut Option<i64>,
        current: Option<&Config>,
    ) -> anyhow::Result<i64> {
        let last = match *slot {
            Some(last) => last,
            None => {
                let recorded = self.persistence.history_max_version(key).await?;
                current.map(|c| c.version).max(recorded).unwrap_or(0)
            }
        };
        let next = last + 1;
        *slot = Some(next);
        Ok(next)
    }

    /// Append a history record; a failure is logged and the mutation stands
    ///
    /// Returns whether the record was stored.
    async fn record_history(&self, record: ConfigHistory) -> bool {
        let Err(e) = self.persistence.history_create(&record).await else {
            return true;
        };
        tracing::warn!(
            "Failed to record {} history for {}/{}/{} version {}: {}",
            record.op_type,
            record.namespace,
            record.group,
            record.key,
            record.version,
            e
        );
        false
    }

    async fn require_namespace(&self, namespace: &str) -> anyhow::Result<()> {
        if !self.persistence.namespace_check(namespace).await? {
            return Err(TamarindError::not_found(format!(
                "namespace '{}' not found",
                namespace
            )));
        }
        Ok(())
    }

    /// Write a new value under a fresh version; caller holds the key's slot
    async fn write_locked(
        &self,
        key: &ConfigKey,
        slot: &mut Option<i64>,
        value: &str,
        config_type: ConfigType,
        operator: &str,
        op_type: Option<OpType>,
    ) -> anyhow::Result<Config> {
        let existing = self.persistence.config_find_one(key).await?;
        let version = self.reserve_version(key, slot, existing.as_ref()).await?;
        let now = Utc::now();

        let op_type = op_type.unwrap_or(if existing.is_some() {
            OpType::Update
        } else {
            OpType::Create
        });

        let (created_by, created_at) = match existing {
            Some(c) => (c.created_by, c.created_at),
            None => (operator.to_string(), now),
        };

        let config = Config {
            namespace: key.namespace.clone(),
            group: key.group.clone(),
            key: key.key.clone(),
            value: value.to_string(),
            config_type,
            version,
            created_by,
            updated_by: operator.to_string(),
            created_at,
            updated_at: now,
        };

        self.persistence.config_upsert(&config).await?;
        self.record_history(ConfigHistory::new(&config, op_type, operator))
            .await;
        self.watcher.notify(&config);

        tracing::info!("{} {} version {} by {}", op_type, key, version, operator);

        Ok(config)
    }

    /// Create or update a config
    pub async fn publish(
        &self,
        key: &ConfigKey,
        value: &str,
        config_type: ConfigType,
        operator: &str,
    ) -> anyhow::Result<Config> {
        validate_key(key)?;
        self.require_namespace(&key.namespace).await?;

        let cell = self.version_slot(key);
        let mut slot = cell.lock().await;
        self.write_locked(key, &mut slot, value, config_type, operator, None)
            .await
    }

    /// Delete a config
    ///
    /// Returns `false` when the key did not exist, in which case nothing is
    /// recorded and no watcher is woken.
    pub async fn delete(&self, key: &ConfigKey, operator: &str) -> anyhow::Result<bool> {
        validate_key(key)?;

        let cell = self.version_slot(key);
        let mut slot = cell.lock().await;

        let Some(existing) = self.persistence.config_find_one(key).await? else {
            return Ok(false);
        };
        let version = self.reserve_version(key, &mut slot, Some(&existing)).await?;

        self.persistence.config_delete(key).await?;

        let tombstone = Config {
            value: String::new(),
            version,
            updated_by: operator.to_string(),
            updated_at: Utc::now(),
            ..existing
        };
        let recorded = self
            .record_history(ConfigHistory::new(&tombstone, OpType::Delete, operator))
            .await;
        self.watcher.notify(&Config::deleted(key, operator));

        tracing::info!("DELETE {} version {} by {}", key, version, operator);

        // History now carries the last version, so an idle slot can be reseeded
        drop(slot);
        drop(cell);
        if recorded {
            self.versions
                .remove_if(key, |_, cell| Arc::strong_count(cell) == 1);
        }

        Ok(true)
    }

    /// Restore the value recorded under `version` as a new version
    ///
    /// Any record can be restored. A deletion record restores its empty value.
    pub async fn rollback(
        &self,
        key: &ConfigKey,
        version: i64,
        operator: &str,
    ) -> anyhow::Result<Config> {
        validate_key(key)?;

        let cell = self.version_slot(key);
        let mut slot = cell.lock().await;

        let target = self
            .persistence
            .history_find_by_version(key, version)
            .await?
            .ok_or_else(|| {
                TamarindError::not_found(format!("version {} not found for {}", version, key))
            })?;
        self.require_namespace(&key.namespace).await?;

        self.write_locked(
            key,
            &mut slot,
            &target.value,
            target.config_type,
            operator,
            Some(OpType::Rollback),
        )
        .await
    }

    pub async fn get(&self, key: &ConfigKey) -> anyhow::Result<Config> {
        validate_key(key)?;
        self.persistence
            .config_find_one(key)
            .await?
            .ok_or_else(|| TamarindError::not_found(format!("config {} not found", key)))
    }

    /// Configs of a group, sorted by key
    pub async fn list(&self, namespace: &str, group: &str) -> anyhow::Result<Vec<Config>> {
        validate_name("namespace", namespace)?;
        validate_name("group", group)?;

        let mut configs = self.persistence.config_list(namespace, group).await?;
        configs.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(configs)
    }

    /// History of a key, newest first
    pub async fn history(&self, key: &ConfigKey) -> anyhow::Result<Vec<ConfigHistory>> {
        validate_key(key)?;
        self.persistence.history_list(key).await
    }

    /// Long-poll for the next change of `key`
    pub async fn watch(&self, key: ConfigKey, timeout: Duration) -> anyhow::Result<WatchOutcome> {
        validate_key(&key)?;
        Ok(self.watcher.wait(key, timeout).await)
    }
}
