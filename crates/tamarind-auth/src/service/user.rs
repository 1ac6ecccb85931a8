//! User service

use std::sync::Arc;

use chrono::Utc;
use serde::Deserialize;

use tamarind_common::{DEFAULT_ADMIN_USERNAME, TamarindError, validate_name};
use tamarind_persistence::{PersistenceService, User, UserRole, UserStatus};

use crate::service::password::hash_password;

/// Partial update of a user; absent fields are left unchanged
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserUpdate {
    pub password: Option<String>,
    pub role: Option<UserRole>,
    pub status: Option<UserStatus>,
}

pub struct UserService {
    persistence: Arc<dyn PersistenceService>,
    bcrypt_cost: u32,
}

impl UserService {
    pub fn new(persistence: Arc<dyn PersistenceService>, bcrypt_cost: u32) -> Self {
        Self {
            persistence,
            bcrypt_cost,
        }
    }

    /// Fail with `Forbidden` unless `username` is an active admin
    pub async fn require_admin(&self, username: &str) -> anyhow::Result<()> {
        match self.persistence.user_find_by_username(username).await? {
            Some(user) if user.is_active_admin() => Ok(()),
            _ => Err(TamarindError::forbidden("admin role required")),
        }
    }

    pub async fn create(
        &self,
        username: &str,
        password: &str,
        role: UserRole,
    ) -> anyhow::Result<User> {
        validate_name("username", username)?;
        let digest = hash_password(password, self.bcrypt_cost)?;

        let user = User::new(username, &digest, role);
        self.persistence.user_create(&user).await?;

        tracing::info!("Created user '{}' with role {}", username, role);
        Ok(user)
    }

    pub async fn get(&self, username: &str) -> anyhow::Result<User> {
        self.persistence
            .user_find_by_username(username)
            .await?
            .ok_or_else(|| TamarindError::not_found(format!("user '{}' not found", username)))
    }

    pub async fn list(&self) -> anyhow::Result<Vec<User>> {
        self.persistence.user_list().await
    }

    pub async fn update(&self, username: &str, update: UserUpdate) -> anyhow::Result<User> {
        let mut user = self.get(username).await?;

        if let Some(password) = update.password.as_deref() {
            user.password = hash_password(password, self.bcrypt_cost)?;
        }
        if let Some(role) = update.role {
            user.role = role;
        }
        if let Some(status) = update.status {
            user.status = status;
        }
        user.updated_at = Utc::now();

        self.persistence.user_update(&user).await?;
        tracing::info!("Updated user '{}'", username);
        Ok(user)
    }

    /// Delete a user; the last active admin is never removed
    pub async fn delete(&self, username: &str) -> anyhow::Result<()> {
        self.persistence.user_delete(username).await?;
        tracing::info!("Deleted user '{}'", username);
        Ok(())
    }

    /// Create the bootstrap admin when no user exists yet
    ///
    /// Returns whether a user was created.
    pub async fn ensure_default_admin(&self, password: &str) -> anyhow::Result<bool> {
        if self.persistence.user_count().await? > 0 {
            return Ok(false);
        }

        match self
            .create(DEFAULT_ADMIN_USERNAME, password, UserRole::Admin)
            .await
        {
            Ok(_) => {
                tracing::warn!(
                    "Created default admin user '{}'; change its password",
                    DEFAULT_ADMIN_USERNAME
                );
                Ok(true)
            }
            // Another instance sharing the database won the race
            Err(e) if matches!(
                e.downcast_ref::<TamarindError>(),
                Some(TamarindError::Conflict(_))
            ) =>
            {
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }
}
