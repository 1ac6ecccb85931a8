//! SQL backend tests against an in-memory SQLite database

use std::time::Duration;

use chrono::Utc;
use sea_orm::{ConnectOptions, Database};

use tamarind_common::TamarindError;
use tamarind_persistence::{
    AuthPersistence, Config, ConfigHistory, ConfigKey, ConfigPersistence, ConfigType,
    ExternalDbPersistService, NamespacePersistence, OpType, PersistenceService, StorageMode, User,
    UserRole, UserStatus,
};

async fn create_test_service() -> ExternalDbPersistService {
    // A single connection keeps every query on the same in-memory database
    let mut opt = ConnectOptions::new("sqlite::memory:");
    opt.max_connections(1).min_connections(1).sqlx_logging(false);

    let db = Database::connect(opt).await.unwrap();
    let service = ExternalDbPersistService::new(db);
    service.init_schema().await.unwrap();
    service
}

fn sample_config(namespace: &str, key: &str, value: &str, version: i64) -> Config {
    let now = Utc::now();
    Config {
        namespace: namespace.to_string(),
        group: "default".to_string(),
        key: key.to_string(),
        value: value.to_string(),
        config_type: ConfigType::Properties,
        version,
        created_by: "admin".to_string(),
        updated_by: "admin".to_string(),
        created_at: now,
        updated_at: now,
    }
}

fn kind(err: &anyhow::Error) -> Option<&TamarindError> {
    err.downcast_ref::<TamarindError>()
}

// ============================================================================
// Schema
// ============================================================================

#[tokio::test]
async fn test_schema_init_is_idempotent() {
    let service = create_test_service().await;
    service.init_schema().await.unwrap();

    assert_eq!(service.storage_mode(), StorageMode::ExternalDb);
    service.health_check().await.unwrap();
    assert_eq!(
        service.namespace_find_all().await.unwrap(),
        vec!["public".to_string()]
    );
}

// ============================================================================
// Configs and history
// ============================================================================

#[tokio::test]
async fn test_config_upsert_keeps_creator() {
    let service = create_test_service().await;
    service
        .config_upsert(&sample_config("public", "db.url", "pg://x", 1))
        .await
        .unwrap();

    let mut update = sample_config("public", "db.url", "pg://y", 2);
    update.created_by = "intruder".to_string();
    update.updated_by = "bob".to_string();
    service.config_upsert(&update).await.unwrap();

    let key = ConfigKey::new("public", "default", "db.url");
    let stored = service.config_find_one(&key).await.unwrap().unwrap();
    assert_eq!(stored.value, "pg://y");
    assert_eq!(stored.version, 2);
    assert_eq!(stored.created_by, "admin");
    assert_eq!(stored.updated_by, "bob");
    assert_eq!(stored.config_type, ConfigType::Properties);

    service.config_delete(&key).await.unwrap();
    service.config_delete(&key).await.unwrap();
    assert!(service.config_find_one(&key).await.unwrap().is_none());
}

#[tokio::test]
async fn test_history_queries() {
    let service = create_test_service().await;
    let key = ConfigKey::new("public", "default", "k");

    assert_eq!(service.history_max_version(&key).await.unwrap(), None);

    for (version, op) in [(1, OpType::Create), (2, OpType::Update), (3, OpType::Delete)] {
        let config = sample_config("public", "k", "v", version);
        service
            .history_create(&ConfigHistory::new(&config, op, "admin"))
            .await
            .unwrap();
    }

    let history = service.history_list(&key).await.unwrap();
    let versions: Vec<i64> = history.iter().map(|h| h.version).collect();
    assert_eq!(versions, vec![3, 2, 1]);
    assert_eq!(history[0].op_type, OpType::Delete);

    assert_eq!(service.history_max_version(&key).await.unwrap(), Some(3));
    let found = service.history_find_by_version(&key, 2).await.unwrap();
    assert_eq!(found.map(|h| h.op_type), Some(OpType::Update));
    assert!(
        service
            .history_find_by_version(&key, 42)
            .await
            .unwrap()
            .is_none()
    );
}

// ============================================================================
// Namespaces
// ============================================================================

#[tokio::test]
async fn test_namespace_rules() {
    let service = create_test_service().await;

    service.namespace_create("teamA").await.unwrap();
    let err = service.namespace_create("teamA").await.unwrap_err();
    assert!(matches!(kind(&err), Some(TamarindError::Conflict(_))));

    service
        .config_upsert(&sample_config("teamA", "k", "v", 1))
        .await
        .unwrap();
    let err = service.namespace_delete("teamA").await.unwrap_err();
    assert!(matches!(kind(&err), Some(TamarindError::Forbidden(_))));

    let err = service.namespace_delete("public").await.unwrap_err();
    assert!(matches!(kind(&err), Some(TamarindError::Forbidden(_))));

    let err = service.namespace_delete("ghost").await.unwrap_err();
    assert!(matches!(kind(&err), Some(TamarindError::NotFound(_))));

    service
        .config_delete(&ConfigKey::new("teamA", "default", "k"))
        .await
        .unwrap();
    service.namespace_delete("teamA").await.unwrap();
    assert!(!service.namespace_check("teamA").await.unwrap());
}

// ============================================================================
// Users
// ============================================================================

#[tokio::test]
async fn test_user_lifecycle_and_last_admin() {
    let service = create_test_service().await;
    service
        .user_create(&User::new("admin", "digest", UserRole::Admin))
        .await
        .unwrap();
    service
        .user_create(&User::new("alice", "digest", UserRole::User))
        .await
        .unwrap();

    let err = service
        .user_create(&User::new("alice", "other", UserRole::User))
        .await
        .unwrap_err();
    assert!(matches!(kind(&err), Some(TamarindError::Conflict(_))));
    assert_eq!(service.user_count().await.unwrap(), 2);

    let err = service.user_delete("admin").await.unwrap_err();
    assert!(matches!(kind(&err), Some(TamarindError::Forbidden(_))));

    let mut demoted = service
        .user_find_by_username("admin")
        .await
        .unwrap()
        .unwrap();
    demoted.role = UserRole::User;
    let err = service.user_update(&demoted).await.unwrap_err();
    assert!(matches!(kind(&err), Some(TamarindError::Forbidden(_))));

    let mut promoted = service
        .user_find_by_username("alice")
        .await
        .unwrap()
        .unwrap();
    promoted.role = UserRole::Admin;
    service.user_update(&promoted).await.unwrap();
    service.user_delete("admin").await.unwrap();

    let names: Vec<String> = service
        .user_list()
        .await
        .unwrap()
        .into_iter()
        .map(|u| u.username)
        .collect();
    assert_eq!(names, vec!["alice".to_string()]);
}

#[tokio::test]
async fn test_last_active_admin_cannot_be_disabled() {
    let service = create_test_service().await;
    let mut admin = User::new("admin", "digest", UserRole::Admin);
    service.user_create(&admin).await.unwrap();

    admin.status = UserStatus::Inactive;
    let err = service.user_update(&admin).await.unwrap_err();
    assert!(matches!(kind(&err), Some(TamarindError::Forbidden(_))));

    let stored = service
        .user_find_by_username("admin")
        .await
        .unwrap()
        .unwrap();
    assert!(stored.is_active_admin());
}

#[tokio::test]
async fn test_inactive_admin_does_not_cover_last_active_admin() {
    let service = create_test_service().await;
    service
        .user_create(&User::new("admin", "digest", UserRole::Admin))
        .await
        .unwrap();
    let mut dormant = User::new("dormant", "digest", UserRole::Admin);
    dormant.status = UserStatus::Inactive;
    service.user_create(&dormant).await.unwrap();

    let err = service.user_delete("admin").await.unwrap_err();
    assert!(matches!(kind(&err), Some(TamarindError::Forbidden(_))));

    dormant.status = UserStatus::Active;
    service.user_update(&dormant).await.unwrap();
    service.user_delete("admin").await.unwrap();

    let err = service.user_delete("dormant").await.unwrap_err();
    assert!(matches!(kind(&err), Some(TamarindError::Forbidden(_))));
}

// ============================================================================
// Token state
// ============================================================================

#[tokio::test]
async fn test_token_state() {
    let service = create_test_service().await;

    service
        .token_blacklist_add("revoked", Utc::now() + chrono::Duration::hours(1))
        .await
        .unwrap();
    service
        .token_blacklist_add("stale", Utc::now() - chrono::Duration::seconds(5))
        .await
        .unwrap();
    assert!(service.token_is_blacklisted("revoked").await.unwrap());
    assert!(!service.token_is_blacklisted("stale").await.unwrap());

    let window = Duration::from_secs(60);
    assert_eq!(service.token_usage_increment("t", window).await.unwrap(), 1);
    assert_eq!(service.token_usage_increment("t", window).await.unwrap(), 2);
    assert!(!service.token_check_rate_limit("t", 2).await.unwrap());
    assert!(service.token_check_rate_limit("t", 3).await.unwrap());

    service.token_usage_reset("t").await.unwrap();
    assert!(service.token_check_rate_limit("t", 1).await.unwrap());

    assert_eq!(service.token_cleanup_expired().await.unwrap(), 1);
    assert!(service.token_is_blacklisted("revoked").await.unwrap());
}
