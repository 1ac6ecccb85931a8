//! SQL-based persistence backend (PostgreSQL/MySQL/SQLite via SeaORM)
//!
//! This module implements the `PersistenceService` trait with direct SeaORM
//! queries. Absent rows are reported as `None`; every other `DbErr` is
//! propagated unchanged so the API surface can classify it as internal.

pub mod schema;

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::sea_query::OnConflict;
use sea_orm::*;

use tamarind_common::{DEFAULT_NAMESPACE, TamarindError};

use crate::entity::{
    config_history, config_info, namespace_info, token_blacklist, token_usage, users,
};
use crate::model::{
    Config, ConfigHistory, ConfigKey, ConfigType, OpType, StorageMode, User, UserRole, UserStatus,
};
use crate::traits::*;

/// External database persistence service
///
/// Wraps a pooled SeaORM `DatabaseConnection`.
pub struct ExternalDbPersistService {
    db: DatabaseConnection,
}

impl ExternalDbPersistService {
    /// Create a new ExternalDbPersistService with the given database connection
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Get a reference to the underlying database connection
    pub fn db(&self) -> &DatabaseConnection {
        &self.db
    }

    /// Create missing tables and seed the default namespace
    pub async fn init_schema(&self) -> anyhow::Result<()> {
        schema::create_tables(&self.db).await
    }
}

// ============================================================================
// Row conversions
// ============================================================================

fn parse_column<T: std::str::FromStr<Err = String>>(value: &str) -> anyhow::Result<T> {
    value
        .parse::<T>()
        .map_err(|e| TamarindError::Internal(format!("corrupt row: {}", e)).into())
}

pub(crate) fn config_from_model(model: config_info::Model) -> anyhow::Result<Config> {
    Ok(Config {
        config_type: parse_column::<ConfigType>(&model.config_type)?,
        namespace: model.namespace,
        group: model.group_name,
        key: model.config_key,
        value: model.value,
        version: model.version,
        created_by: model.created_by,
        updated_by: model.updated_by,
        created_at: model.created_at,
        updated_at: model.updated_at,
    })
}

pub(crate) fn history_from_model(model: config_history::Model) -> anyhow::Result<ConfigHistory> {
    Ok(ConfigHistory {
        config_type: parse_column::<ConfigType>(&model.config_type)?,
        op_type: parse_column::<OpType>(&model.op_type)?,
        id: model.id,
        namespace: model.namespace,
        group: model.group_name,
        key: model.config_key,
        value: model.value,
        version: model.version,
        operator: model.operator,
        created_at: model.created_at,
    })
}

pub(crate) fn user_from_model(model: users::Model) -> anyhow::Result<User> {
    Ok(User {
        role: parse_column::<UserRole>(&model.role)?,
        status: parse_column::<UserStatus>(&model.status)?,
        username: model.username,
        password: model.password,
        created_at: model.created_at,
        updated_at: model.updated_at,
    })
}

fn is_unique_violation(err: &DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}

// ============================================================================
// PersistenceService implementation
// ============================================================================

#[async_trait]
impl PersistenceService for ExternalDbPersistService {
    fn storage_mode(&self) -> StorageMode {
        StorageMode::ExternalDb
    }

    async fn health_check(&self) -> anyhow::Result<()> {
        self.db.ping().await?;
        Ok(())
    }
}

// ============================================================================
// ConfigPersistence implementation
// ============================================================================

#[async_trait]
impl ConfigPersistence for ExternalDbPersistService {
    async fn config_find_one(&self, key: &ConfigKey) -> anyhow::Result<Option<Config>> {
        config_info::Entity::find_by_id((
            key.namespace.clone(),
            key.group.clone(),
            key.key.clone(),
        ))
        .one(&self.db)
        .await?
        .map(config_from_model)
        .transpose()
    }

    async fn config_upsert(&self, config: &Config) -> anyhow::Result<()> {
        let model = config_info::ActiveModel {
            namespace: Set(config.namespace.clone()),
            group_name: Set(config.group.clone()),
            config_key: Set(config.key.clone()),
            value: Set(config.value.clone()),
            config_type: Set(config.config_type.to_string()),
            version: Set(config.version),
            created_by: Set(config.created_by.clone()),
            updated_by: Set(config.updated_by.clone()),
            created_at: Set(config.created_at),
            updated_at: Set(config.updated_at),
        };

        config_info::Entity::insert(model)
            .on_conflict(
                OnConflict::columns([
                    config_info::Column::Namespace,
                    config_info::Column::GroupName,
                    config_info::Column::ConfigKey,
                ])
                .update_columns([
                    config_info::Column::Value,
                    config_info::Column::ConfigType,
                    config_info::Column::Version,
                    config_info::Column::UpdatedBy,
                    config_info::Column::UpdatedAt,
                ])
                .to_owned(),
            )
            .exec_without_returning(&self.db)
            .await?;
        Ok(())
    }

    async fn config_delete(&self, key: &ConfigKey) -> anyhow::Result<()> {
        config_info::Entity::delete_many()
            .filter(config_info::Column::Namespace.eq(key.namespace.as_str()))
            .filter(config_info::Column::GroupName.eq(key.group.as_str()))
            .filter(config_info::Column::ConfigKey.eq(key.key.as_str()))
            .exec(&self.db)
            .await?;
        Ok(())
    }

    async fn config_list(&self, namespace: &str, group: &str) -> anyhow::Result<Vec<Config>> {
        config_info::Entity::find()
            .filter(config_info::Column::Namespace.eq(namespace))
            .filter(config_info::Column::GroupName.eq(group))
            .all(&self.db)
            .await?
            .into_iter()
            .map(config_from_model)
            .collect()
    }

    async fn config_count_by_namespace(&self, namespace: &str) -> anyhow::Result<u64> {
        Ok(config_info::Entity::find()
            .filter(config_info::Column::Namespace.eq(namespace))
            .count(&self.db)
            .await?)
    }

    async fn history_create(&self, record: &ConfigHistory) -> anyhow::Result<()> {
        let model = config_history::ActiveModel {
            id: Set(record.id.clone()),
            namespace: Set(record.namespace.clone()),
            group_name: Set(record.group.clone()),
            config_key: Set(record.key.clone()),
            value: Set(record.value.clone()),
            config_type: Set(record.config_type.to_string()),
            version: Set(record.version),
            op_type: Set(record.op_type.to_string()),
            operator: Set(record.operator.clone()),
            created_at: Set(record.created_at),
        };

        config_history::Entity::insert(model)
            .exec_without_returning(&self.db)
            .await?;
        Ok(())
    }

    async fn history_list(&self, key: &ConfigKey) -> anyhow::Result<Vec<ConfigHistory>> {
        config_history::Entity::find()
            .filter(config_history::Column::Namespace.eq(key.namespace.as_str()))
            .filter(config_history::Column::GroupName.eq(key.group.as_str()))
            .filter(config_history::Column::ConfigKey.eq(key.key.as_str()))
            .order_by_desc(config_history::Column::Version)
            .all(&self.db)
            .await?
            .into_iter()
            .map(history_from_model)
            .collect()
    }

    async fn history_find_by_version(
        &self,
        key: &ConfigKey,
        version: i64,
    ) -> anyhow::Result<Option<ConfigHistory>> {
        config_history::Entity::find()
            .filter(config_history::Column::Namespace.eq(key.namespace.as_str()))
            .filter(config_history::Column::GroupName.eq(key.group.as_str()))
            .filter(config_history::Column::ConfigKey.eq(key.key.as_str()))
            .filter(config_history::Column::Version.eq(version))
            .one(&self.db)
            .await?
            .map(history_from_model)
            .transpose()
    }

    async fn history_max_version(&self, key: &ConfigKey) -> anyhow::Result<Option<i64>> {
        let max = config_history::Entity::find()
            .select_only()
            .column_as(config_history::Column::Version.max(), "max_version")
            .filter(config_history::Column::Namespace.eq(key.namespace.as_str()))
            .filter(config_history::Column::GroupName.eq(key.group.as_str()))
            .filter(config_history::Column::ConfigKey.eq(key.key.as_str()))
            .into_tuple::<Option<i64>>()
            .one(&self.db)
            .await?;
        Ok(max.flatten())
    }
}

// ============================================================================
// NamespacePersistence implementation
// ============================================================================

#[async_trait]
impl NamespacePersistence for ExternalDbPersistService {
    async fn namespace_create(&self, name: &str) -> anyhow::Result<()> {
        if name.is_empty() {
            return Err(TamarindError::validation("namespace name must not be empty"));
        }

        let conflict = || TamarindError::conflict(format!("namespace '{}' already exists", name));
        if self.namespace_check(name).await? {
            return Err(conflict());
        }

        let result = namespace_info::ActiveModel {
            name: Set(name.to_string()),
            created_at: Set(Utc::now()),
        }
        .insert(&self.db)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(e) if is_unique_violation(&e) => Err(conflict()),
            Err(e) => Err(e.into()),
        }
    }

    async fn namespace_delete(&self, name: &str) -> anyhow::Result<()> {
        if name == DEFAULT_NAMESPACE {
            return Err(TamarindError::forbidden(
                "the default namespace cannot be deleted",
            ));
        }

        let tx = self.db.begin().await?;

        let existing = namespace_info::Entity::find_by_id(name)
            .lock_exclusive()
            .one(&tx)
            .await?;
        if existing.is_none() {
            return Err(TamarindError::not_found(format!(
                "namespace '{}' not found",
                name
            )));
        }

        let referencing = config_info::Entity::find()
            .filter(config_info::Column::Namespace.eq(name))
            .count(&tx)
            .await?;
        if referencing > 0 {
            return Err(TamarindError::forbidden(format!(
                "namespace '{}' still contains configs",
                name
            )));
        }

        namespace_info::Entity::delete_by_id(name).exec(&tx).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn namespace_find_all(&self) -> anyhow::Result<Vec<String>> {
        Ok(namespace_info::Entity::find()
            .order_by_asc(namespace_info::Column::Name)
            .all(&self.db)
            .await?
            .into_iter()
            .map(|n| n.name)
            .collect())
    }

    async fn namespace_check(&self, name: &str) -> anyhow::Result<bool> {
        Ok(namespace_info::Entity::find_by_id(name)
            .one(&self.db)
            .await?
            .is_some())
    }
}

// ============================================================================
// AuthPersistence implementation
// ============================================================================

/// Active admin rows locked for the remainder of the transaction
async fn lock_active_admins(tx: &DatabaseTransaction) -> anyhow::Result<usize> {
    Ok(users::Entity::find()
        .filter(users::Column::Role.eq(UserRole::Admin.as_str()))
        .filter(users::Column::Status.eq(UserStatus::Active.as_str()))
        .lock_exclusive()
        .all(tx)
        .await?
        .len())
}

fn is_active_admin(model: &users::Model) -> bool {
    model.role == UserRole::Admin.as_str() && model.status == UserStatus::Active.as_str()
}

#[async_trait]
impl AuthPersistence for ExternalDbPersistService {
    async fn user_create(&self, user: &User) -> anyhow::Result<()> {
        let conflict = || {
            TamarindError::conflict(format!("user '{}' already exists", user.username))
        };
        if users::Entity::find_by_id(user.username.as_str())
            .one(&self.db)
            .await?
            .is_some()
        {
            return Err(conflict());
        }

        let result = users::ActiveModel {
            username: Set(user.username.clone()),
            password: Set(user.password.clone()),
            role: Set(user.role.to_string()),
            status: Set(user.status.to_string()),
            created_at: Set(user.created_at),
            updated_at: Set(user.updated_at),
        }
        .insert(&self.db)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(e) if is_unique_violation(&e) => Err(conflict()),
            Err(e) => Err(e.into()),
        }
    }

    async fn user_find_by_username(&self, username: &str) -> anyhow::Result<Option<User>> {
        users::Entity::find_by_id(username)
            .one(&self.db)
            .await?
            .map(user_from_model)
            .transpose()
    }

    async fn user_list(&self) -> anyhow::Result<Vec<User>> {
        users::Entity::find()
            .order_by_asc(users::Column::Username)
            .all(&self.db)
            .await?
            .into_iter()
            .map(user_from_model)
            .collect()
    }

    async fn user_update(&self, user: &User) -> anyhow::Result<()> {
        let tx = self.db.begin().await?;

        let Some(existing) = users::Entity::find_by_id(user.username.as_str())
            .lock_exclusive()
            .one(&tx)
            .await?
        else {
            return Err(TamarindError::not_found(format!(
                "user '{}' not found",
                user.username
            )));
        };

        if is_active_admin(&existing)
            && !user.is_active_admin()
            && lock_active_admins(&tx).await? <= 1
        {
            return Err(TamarindError::forbidden(
                "cannot demote or disable the last active admin",
            ));
        }

        let mut model: users::ActiveModel = existing.into();
        model.password = Set(user.password.clone());
        model.role = Set(user.role.to_string());
        model.status = Set(user.status.to_string());
        model.updated_at = Set(user.updated_at);
        model.update(&tx).await?;

        tx.commit().await?;
        Ok(())
    }

    async fn user_delete(&self, username: &str) -> anyhow::Result<()> {
        let tx = self.db.begin().await?;

        let Some(existing) = users::Entity::find_by_id(username)
            .lock_exclusive()
            .one(&tx)
            .await?
        else {
            return Err(TamarindError::not_found(format!(
                "user '{}' not found",
                username
            )));
        };

        if is_active_admin(&existing) && lock_active_admins(&tx).await? <= 1 {
            return Err(TamarindError::forbidden("cannot delete the last active admin"));
        }

        users::Entity::delete_by_id(username).exec(&tx).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn user_count(&self) -> anyhow::Result<u64> {
        Ok(users::Entity::find().count(&self.db).await?)
    }

    async fn token_blacklist_add(
        &self,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> anyhow::Result<()> {
        let model = token_blacklist::ActiveModel {
            token: Set(token.to_string()),
            expires_at: Set(expires_at),
        };

        token_blacklist::Entity::insert(model)
            .on_conflict(
                OnConflict::column(token_blacklist::Column::Token)
                    .update_column(token_blacklist::Column::ExpiresAt)
                    .to_owned(),
            )
            .exec_without_returning(&self.db)
            .await?;
        Ok(())
    }

    async fn token_is_blacklisted(&self, token: &str) -> anyhow::Result<bool> {
        Ok(token_blacklist::Entity::find_by_id(token)
            .filter(token_blacklist::Column::ExpiresAt.gt(Utc::now()))
            .one(&self.db)
            .await?
            .is_some())
    }

    async fn token_cleanup_expired(&self) -> anyhow::Result<u64> {
        let now = Utc::now();

        let blacklist = token_blacklist::Entity::delete_many()
            .filter(token_blacklist::Column::ExpiresAt.lte(now))
            .exec(&self.db)
            .await?;
        let usage = token_usage::Entity::delete_many()
            .filter(token_usage::Column::WindowEnd.lte(now))
            .exec(&self.db)
            .await?;

        Ok(blacklist.rows_affected + usage.rows_affected)
    }

    async fn token_usage_increment(&self, token: &str, window: Duration) -> anyhow::Result<i64> {
        let now = Utc::now();
        let window = chrono::Duration::from_std(window)?;

        let tx = self.db.begin().await?;

        let existing = token_usage::Entity::find_by_id(token)
            .lock_exclusive()
            .one(&tx)
            .await?;

        let count = match existing {
            Some(usage) if usage.window_end > now => {
                let count = usage.count + 1;
                let mut model: token_usage::ActiveModel = usage.into();
                model.count = Set(count);
                model.update(&tx).await?;
                count
            }
            _ => {
                let model = token_usage::ActiveModel {
                    token: Set(token.to_string()),
                    count: Set(1),
                    window_start: Set(now),
                    window_end: Set(now + window),
                };
                token_usage::Entity::insert(model)
                    .on_conflict(
                        OnConflict::column(token_usage::Column::Token)
                            .update_columns([
                                token_usage::Column::Count,
                                token_usage::Column::WindowStart,
                                token_usage::Column::WindowEnd,
                            ])
                            .to_owned(),
                    )
                    .exec_without_returning(&tx)
                    .await?;
                1
            }
        };

        tx.commit().await?;
        Ok(count)
    }

    async fn token_check_rate_limit(&self, token: &str, limit: i64) -> anyhow::Result<bool> {
        let usage = token_usage::Entity::find_by_id(token)
            .filter(token_usage::Column::WindowEnd.gt(Utc::now()))
            .one(&self.db)
            .await?;
        Ok(usage.is_none_or(|u| u.count < limit))
    }

    async fn token_usage_reset(&self, token: &str) -> anyhow::Result<()> {
        token_usage::Entity::delete_by_id(token)
            .exec(&self.db)
            .await?;
        Ok(())
    }
}
