// In-memory persistence backend
// Sharded concurrent maps; all state is lost when the process exits

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::{DashMap, DashSet};
use parking_lot::RwLock;

use tamarind_common::{DEFAULT_NAMESPACE, TamarindError};

use crate::model::{Config, ConfigHistory, ConfigKey, StorageMode, TokenUsage, User};
use crate::traits::{AuthPersistence, ConfigPersistence, NamespacePersistence, PersistenceService};

/// In-process persistence using sharded concurrent maps
///
/// Unrelated keys land on different shards and never contend. Users sit
/// behind a single `RwLock` so that last-admin checks and the mutation they
/// guard happen atomically.
pub struct MemoryPersistService {
    configs: DashMap<ConfigKey, Config>,
    history: DashMap<ConfigKey, Vec<ConfigHistory>>,
    namespaces: DashSet<String>,
    users: RwLock<HashMap<String, User>>,
    token_blacklist: DashMap<String, DateTime<Utc>>,
    token_usage: DashMap<String, TokenUsage>,
}

impl Default for MemoryPersistService {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryPersistService {
    /// Create an empty store holding only the default namespace
    pub fn new() -> Self {
        let namespaces = DashSet::new();
        namespaces.insert(DEFAULT_NAMESPACE.to_string());

        Self {
            configs: DashMap::new(),
            history: DashMap::new(),
            namespaces,
            users: RwLock::new(HashMap::new()),
            token_blacklist: DashMap::new(),
            token_usage: DashMap::new(),
        }
    }
}

// ============================================================================
// PersistenceService implementation
// ============================================================================

#[async_trait]
impl PersistenceService for MemoryPersistService {
    fn storage_mode(&self) -> StorageMode {
        StorageMode::Memory
    }

    async fn health_check(&self) -> anyhow::Result<()> {
        Ok(())
    }
}

// ============================================================================
// ConfigPersistence implementation
// ============================================================================

#[async_trait]
impl ConfigPersistence for MemoryPersistService {
    async fn config_find_one(&self, key: &ConfigKey) -> anyhow::Result<Option<Config>> {
        Ok(self.configs.get(key).map(|c| c.value().clone()))
    }

    async fn config_upsert(&self, config: &Config) -> anyhow::Result<()> {
        self.configs
            .entry(config.config_key())
            .and_modify(|existing| {
                existing.value = config.value.clone();
                existing.config_type = config.config_type;
                existing.version = config.version;
                existing.updated_by = config.updated_by.clone();
                existing.updated_at = config.updated_at;
            })
            .or_insert_with(|| config.clone());
        Ok(())
    }

    async fn config_delete(&self, key: &ConfigKey) -> anyhow::Result<()> {
        self.configs.remove(key);
        Ok(())
    }

    async fn config_list(&self, namespace: &str, group: &str) -> anyhow::Result<Vec<Config>> {
        Ok(self
            .configs
            .iter()
            .filter(|e| e.key().namespace == namespace && e.key().group == group)
            .map(|e| e.value().clone())
            .collect())
    }

    async fn config_count_by_namespace(&self, namespace: &str) -> anyhow::Result<u64> {
        Ok(self
            .configs
            .iter()
            .filter(|e| e.key().namespace == namespace)
            .count() as u64)
    }

    async fn history_create(&self, record: &ConfigHistory) -> anyhow::Result<()> {
        let key = ConfigKey::new(&record.namespace, &record.group, &record.key);
        self.history.entry(key).or_default().push(record.clone());
        Ok(())
    }

    async fn history_list(&self, key: &ConfigKey) -> anyhow::Result<Vec<ConfigHistory>> {
        let mut records = self
            .history
            .get(key)
            .map(|h| h.value().clone())
            .unwrap_or_default();
        records.sort_by(|a, b| b.version.cmp(&a.version));
        Ok(records)
    }

    async fn history_find_by_version(
        &self,
        key: &ConfigKey,
        version: i64,
    ) -> anyhow::Result<Option<ConfigHistory>> {
        Ok(self
            .history
            .get(key)
            .and_then(|h| h.iter().find(|r| r.version == version).cloned()))
    }

    async fn history_max_version(&self, key: &ConfigKey) -> anyhow::Result<Option<i64>> {
        Ok(self
            .history
            .get(key)
            .and_then(|h| h.iter().map(|r| r.version).max()))
    }
}

// ============================================================================
// NamespacePersistence implementation
// ============================================================================

#[async_trait]
impl NamespacePersistence for MemoryPersistService {
    async fn namespace_create(&self, name: &str) -> anyhow::Result<()> {
        if name.is_empty() {
            return Err(TamarindError::validation("namespace name must not be empty"));
        }
        if !self.namespaces.insert(name.to_string()) {
            return Err(TamarindError::conflict(format!(
                "namespace '{}' already exists",
                name
            )));
        }
        Ok(())
    }

    async fn namespace_delete(&self, name: &str) -> anyhow::Result<()> {
        if name == DEFAULT_NAMESPACE {
            return Err(TamarindError::forbidden(
                "the default namespace cannot be deleted",
            ));
        }
        if !self.namespaces.contains(name) {
            return Err(TamarindError::not_found(format!(
                "namespace '{}' not found",
                name
            )));
        }
        if self.config_count_by_namespace(name).await? > 0 {
            return Err(TamarindError::forbidden(format!(
                "namespace '{}' still contains configs",
                name
            )));
        }
        self.namespaces.remove(name);
        Ok(())
    }

    async fn namespace_find_all(&self) -> anyhow::Result<Vec<String>> {
        let mut names: Vec<String> = self.namespaces.iter().map(|n| n.key().clone()).collect();
        names.sort();
        Ok(names)
    }

    async fn namespace_check(&self, name: &str) -> anyhow::Result<bool> {
        Ok(self.namespaces.contains(name))
    }
}

// ============================================================================
// AuthPersistence implementation
// ============================================================================

fn active_admin_count(users: &HashMap<String, User>) -> usize {
    users.values().filter(|u| u.is_active_admin()).count()
}

#[async_trait]
impl AuthPersistence for MemoryPersistService {
    async fn user_create(&self, user: &User) -> anyhow::Result<()> {
        let mut users = self.users.write();
        if users.contains_key(&user.username) {
            return Err(TamarindError::conflict(format!(
                "user '{}' already exists",
                user.username
            )));
        }
        users.insert(user.username.clone(), user.clone());
        Ok(())
    }

    async fn user_find_by_username(&self, username: &str) -> anyhow::Result<Option<User>> {
        Ok(self.users.read().get(username).cloned())
    }

    async fn user_list(&self) -> anyhow::Result<Vec<User>> {
        let mut users: Vec<User> = self.users.read().values().cloned().collect();
        users.sort_by(|a, b| a.username.cmp(&b.username));
        Ok(users)
    }

    async fn user_update(&self, user: &User) -> anyhow::Result<()> {
        let mut users = self.users.write();
        let admins = active_admin_count(&users);
        let Some(existing) = users.get_mut(&user.username) else {
            return Err(TamarindError::not_found(format!(
                "user '{}' not found",
                user.username
            )));
        };
        if existing.is_active_admin() && !user.is_active_admin() && admins <= 1 {
            return Err(TamarindError::forbidden(
                "cannot demote or disable the last active admin",
            ));
        }
        existing.password = user.password.clone();
        existing.role = user.role;
        existing.status = user.status;
        existing.updated_at = user.updated_at;
        Ok(())
    }

    async fn user_delete(&self, username: &str) -> anyhow::Result<()> {
        let mut users = self.users.write();
        let Some(existing) = users.get(username) else {
            return Err(TamarindError::not_found(format!(
                "user '{}' not found",
                username
            )));
        };
        if existing.is_active_admin() && active_admin_count(&users) <= 1 {
            return Err(TamarindError::forbidden("cannot delete the last active admin"));
        }
        users.remove(username);
        Ok(())
    }

    async fn user_count(&self) -> anyhow::Result<u64> {
        Ok(self.users.read().len() as u64)
    }

    async fn token_blacklist_add(
        &self,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> anyhow::Result<()> {
        self.token_blacklist.insert(token.to_string(), expires_at);
        Ok(())
    }

    async fn token_is_blacklisted(&self, token: &str) -> anyhow::Result<bool> {
        let now = Utc::now();
        self.token_blacklist
            .remove_if(token, |_, expires_at| *expires_at <= now);
        Ok(self.token_blacklist.contains_key(token))
    }

    async fn token_cleanup_expired(&self) -> anyhow::Result<u64> {
        let now = Utc::now();
        let before = self.token_blacklist.len() + self.token_usage.len();
        self.token_blacklist.retain(|_, expires_at| *expires_at > now);
        self.token_usage.retain(|_, usage| !usage.is_expired(now));
        let after = self.token_blacklist.len() + self.token_usage.len();
        Ok(before.saturating_sub(after) as u64)
    }

    async fn token_usage_increment(&self, token: &str, window: Duration) -> anyhow::Result<i64> {
        let now = Utc::now();
        let window = chrono::Duration::from_std(window)?;
        let fresh = || TokenUsage {
            count: 0,
            window_start: now,
            window_end: now + window,
        };

        let mut usage = self
            .token_usage
            .entry(token.to_string())
            .or_insert_with(fresh);
        if usage.is_expired(now) {
            *usage = fresh();
        }
        usage.count += 1;
        Ok(usage.count)
    }

    async fn token_check_rate_limit(&self, token: &str, limit: i64) -> anyhow::Result<bool> {
        let now = Utc::now();
        Ok(match self.token_usage.get(token) {
            Some(usage) if !usage.is_expired(now) => usage.count < limit,
            _ => true,
        })
    }

    async fn token_usage_reset(&self, token: &str) -> anyhow::Result<()> {
        self.token_usage.remove(token);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ConfigType, OpType, UserRole, UserStatus};

    fn sample_config(namespace: &str, key: &str, value: &str, version: i64) -> Config {
        let now = Utc::now();
        Config {
            namespace: namespace.to_string(),
            group: "default".to_string(),
            key: key.to_string(),
            value: value.to_string(),
            config_type: ConfigType::Text,
            version,
            created_by: "admin".to_string(),
            updated_by: "admin".to_string(),
            created_at: now,
            updated_at: now,
        }
    }

    fn error_kind(err: &anyhow::Error) -> Option<&TamarindError> {
        err.downcast_ref::<TamarindError>()
    }

    // ==================== Config Tests ====================

    #[tokio::test]
    async fn test_config_upsert_and_find() {
        let store = MemoryPersistService::new();
        let first = sample_config("public", "db.url", "pg://x", 1);
        store.config_upsert(&first).await.unwrap();

        let mut second = sample_config("public", "db.url", "pg://y", 2);
        second.created_by = "someone-else".to_string();
        second.updated_by = "bob".to_string();
        store.config_upsert(&second).await.unwrap();

        let found = store
            .config_find_one(&first.config_key())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.value, "pg://y");
        assert_eq!(found.version, 2);
        assert_eq!(found.created_by, "admin");
        assert_eq!(found.updated_by, "bob");
    }

    #[tokio::test]
    async fn test_config_find_missing_is_none() {
        let store = MemoryPersistService::new();
        let key = ConfigKey::new("public", "default", "missing");
        assert!(store.config_find_one(&key).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_config_delete_is_idempotent() {
        let store = MemoryPersistService::new();
        let config = sample_config("public", "k", "v", 1);
        store.config_upsert(&config).await.unwrap();

        store.config_delete(&config.config_key()).await.unwrap();
        store.config_delete(&config.config_key()).await.unwrap();
        assert!(
            store
                .config_find_one(&config.config_key())
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_config_list_scoped_to_group() {
        let store = MemoryPersistService::new();
        store
            .config_upsert(&sample_config("public", "a", "1", 1))
            .await
            .unwrap();
        store
            .config_upsert(&sample_config("public", "b", "2", 1))
            .await
            .unwrap();
        let mut other = sample_config("public", "c", "3", 1);
        other.group = "other".to_string();
        store.config_upsert(&other).await.unwrap();

        let listed = store.config_list("public", "default").await.unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(store.config_count_by_namespace("public").await.unwrap(), 3);
    }

    // ==================== History Tests ====================

    #[tokio::test]
    async fn test_history_ordered_newest_first() {
        let store = MemoryPersistService::new();
        for version in [1, 3, 2] {
            let config = sample_config("public", "k", "v", version);
            store
                .history_create(&ConfigHistory::new(&config, OpType::Update, "admin"))
                .await
                .unwrap();
        }

        let key = ConfigKey::new("public", "default", "k");
        let versions: Vec<i64> = store
            .history_list(&key)
            .await
            .unwrap()
            .iter()
            .map(|h| h.version)
            .collect();
        assert_eq!(versions, vec![3, 2, 1]);
        assert_eq!(store.history_max_version(&key).await.unwrap(), Some(3));
        assert!(
            store
                .history_find_by_version(&key, 2)
                .await
                .unwrap()
                .is_some()
        );
        assert!(
            store
                .history_find_by_version(&key, 9)
                .await
                .unwrap()
                .is_none()
        );
    }

    // ==================== Namespace Tests ====================

    #[tokio::test]
    async fn test_namespace_lifecycle() {
        let store = MemoryPersistService::new();
        assert!(store.namespace_check(DEFAULT_NAMESPACE).await.unwrap());

        store.namespace_create("teamA").await.unwrap();
        let err = store.namespace_create("teamA").await.unwrap_err();
        assert!(matches!(error_kind(&err), Some(TamarindError::Conflict(_))));

        let err = store.namespace_create("").await.unwrap_err();
        assert!(matches!(
            error_kind(&err),
            Some(TamarindError::Validation(_))
        ));

        assert_eq!(
            store.namespace_find_all().await.unwrap(),
            vec!["public".to_string(), "teamA".to_string()]
        );

        store.namespace_delete("teamA").await.unwrap();
        assert!(!store.namespace_check("teamA").await.unwrap());
    }

    #[tokio::test]
    async fn test_namespace_delete_rules() {
        let store = MemoryPersistService::new();

        let err = store.namespace_delete(DEFAULT_NAMESPACE).await.unwrap_err();
        assert!(matches!(error_kind(&err), Some(TamarindError::Forbidden(_))));

        let err = store.namespace_delete("ghost").await.unwrap_err();
        assert!(matches!(error_kind(&err), Some(TamarindError::NotFound(_))));

        store.namespace_create("teamB").await.unwrap();
        store
            .config_upsert(&sample_config("teamB", "k", "v", 1))
            .await
            .unwrap();
        let err = store.namespace_delete("teamB").await.unwrap_err();
        assert!(matches!(error_kind(&err), Some(TamarindError::Forbidden(_))));
        assert!(store.namespace_check("teamB").await.unwrap());
    }

    // ==================== User Tests ====================

    #[tokio::test]
    async fn test_user_create_conflict() {
        let store = MemoryPersistService::new();
        let user = User::new("alice", "digest", UserRole::User);
        store.user_create(&user).await.unwrap();

        let err = store.user_create(&user).await.unwrap_err();
        assert!(matches!(error_kind(&err), Some(TamarindError::Conflict(_))));
        assert_eq!(store.user_count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_last_admin_cannot_be_deleted() {
        let store = MemoryPersistService::new();
        store
            .user_create(&User::new("admin", "digest", UserRole::Admin))
            .await
            .unwrap();

        let err = store.user_delete("admin").await.unwrap_err();
        assert!(matches!(error_kind(&err), Some(TamarindError::Forbidden(_))));

        store
            .user_create(&User::new("root", "digest", UserRole::Admin))
            .await
            .unwrap();
        store.user_delete("admin").await.unwrap();

        let err = store.user_delete("root").await.unwrap_err();
        assert!(matches!(error_kind(&err), Some(TamarindError::Forbidden(_))));
        assert!(
            store
                .user_find_by_username("root")
                .await
                .unwrap()
                .is_some()
        );
    }

    #[tokio::test]
    async fn test_last_admin_cannot_be_demoted() {
        let store = MemoryPersistService::new();
        let mut admin = User::new("admin", "digest", UserRole::Admin);
        store.user_create(&admin).await.unwrap();

        admin.role = UserRole::User;
        let err = store.user_update(&admin).await.unwrap_err();
        assert!(matches!(error_kind(&err), Some(TamarindError::Forbidden(_))));

        let err = store
            .user_update(&User::new("ghost", "digest", UserRole::User))
            .await
            .unwrap_err();
        assert!(matches!(error_kind(&err), Some(TamarindError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_last_active_admin_cannot_be_disabled() {
        let store = MemoryPersistService::new();
        let mut admin = User::new("admin", "digest", UserRole::Admin);
        store.user_create(&admin).await.unwrap();

        admin.status = UserStatus::Inactive;
        let err = store.user_update(&admin).await.unwrap_err();
        assert!(matches!(error_kind(&err), Some(TamarindError::Forbidden(_))));

        let stored = store.user_find_by_username("admin").await.unwrap().unwrap();
        assert!(stored.is_active_admin());
    }

    #[tokio::test]
    async fn test_inactive_admin_does_not_cover_last_active_admin() {
        let store = MemoryPersistService::new();
        store
            .user_create(&User::new("admin", "digest", UserRole::Admin))
            .await
            .unwrap();
        let mut dormant = User::new("dormant", "digest", UserRole::Admin);
        dormant.status = UserStatus::Inactive;
        store.user_create(&dormant).await.unwrap();

        let err = store.user_delete("admin").await.unwrap_err();
        assert!(matches!(error_kind(&err), Some(TamarindError::Forbidden(_))));

        let mut demoted = store.user_find_by_username("admin").await.unwrap().unwrap();
        demoted.role = UserRole::User;
        let err = store.user_update(&demoted).await.unwrap_err();
        assert!(matches!(error_kind(&err), Some(TamarindError::Forbidden(_))));

        // Inactive admins carry no weight and can go
        store.user_delete("dormant").await.unwrap();
        assert_eq!(store.user_count().await.unwrap(), 1);
    }

    // ==================== Token Tests ====================

    #[tokio::test]
    async fn test_blacklist_expiry() {
        let store = MemoryPersistService::new();
        store
            .token_blacklist_add("live", Utc::now() + chrono::Duration::hours(1))
            .await
            .unwrap();
        store
            .token_blacklist_add("stale", Utc::now() - chrono::Duration::seconds(1))
            .await
            .unwrap();

        assert!(store.token_is_blacklisted("live").await.unwrap());
        assert!(!store.token_is_blacklisted("stale").await.unwrap());
        assert!(!store.token_is_blacklisted("unknown").await.unwrap());
    }

    #[tokio::test]
    async fn test_cleanup_removes_expired_entries() {
        let store = MemoryPersistService::new();
        store
            .token_blacklist_add("stale", Utc::now() - chrono::Duration::seconds(1))
            .await
            .unwrap();
        store
            .token_blacklist_add("live", Utc::now() + chrono::Duration::hours(1))
            .await
            .unwrap();
        store
            .token_usage_increment("short", Duration::from_millis(1))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(5)).await;

        let removed = store.token_cleanup_expired().await.unwrap();
        assert_eq!(removed, 2);
        assert!(store.token_blacklist.contains_key("live"));
        assert!(store.token_usage.is_empty());
    }

    #[tokio::test]
    async fn test_rate_limit_window() {
        let store = MemoryPersistService::new();
        let window = Duration::from_secs(60);

        assert!(store.token_check_rate_limit("t", 3).await.unwrap());
        for expected in 1..=3 {
            assert_eq!(
                store.token_usage_increment("t", window).await.unwrap(),
                expected
            );
        }
        assert!(!store.token_check_rate_limit("t", 3).await.unwrap());

        store.token_usage_reset("t").await.unwrap();
        assert!(store.token_check_rate_limit("t", 3).await.unwrap());
    }

    #[tokio::test]
    async fn test_expired_window_starts_fresh() {
        let store = MemoryPersistService::new();
        let window = Duration::from_millis(20);
        store.token_usage_increment("t", window).await.unwrap();
        store.token_usage_increment("t", window).await.unwrap();
        assert!(!store.token_check_rate_limit("t", 2).await.unwrap());

        tokio::time::sleep(Duration::from_millis(30)).await;
        assert!(store.token_check_rate_limit("t", 2).await.unwrap());
        assert_eq!(store.token_usage_increment("t", window).await.unwrap(), 1);
    }
}
