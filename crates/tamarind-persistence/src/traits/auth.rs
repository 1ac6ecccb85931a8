//! Auth persistence trait
//!
//! Defines the interface for user accounts and transient token state.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::model::User;

/// User and token-state persistence operations
#[async_trait]
pub trait AuthPersistence: Send + Sync {
    // ==================== User Operations ====================

    /// Create a user, failing with `Conflict` when the username is taken
    async fn user_create(&self, user: &User) -> anyhow::Result<()>;

    /// Find a user by username
    async fn user_find_by_username(&self, username: &str) -> anyhow::Result<Option<User>>;

    /// All users, sorted by username
    async fn user_list(&self) -> anyhow::Result<Vec<User>>;

    /// Replace a user's password, role and status
    ///
    /// Fails with `NotFound` when absent and `Forbidden` when the change
    /// would demote the last admin.
    async fn user_update(&self, user: &User) -> anyhow::Result<()>;

    /// Delete a user
    ///
    /// Fails with `NotFound` when absent and `Forbidden` when the user is the
    /// last admin. The admin count is read under the same lock or transaction
    /// as the delete.
    async fn user_delete(&self, username: &str) -> anyhow::Result<()>;

    /// Number of stored users
    async fn user_count(&self) -> anyhow::Result<u64>;

    // ==================== Token Operations ====================

    /// Revoke a token until `expires_at`
    async fn token_blacklist_add(
        &self,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> anyhow::Result<()>;

    /// Whether a token is revoked; expired entries do not count
    async fn token_is_blacklisted(&self, token: &str) -> anyhow::Result<bool>;

    /// Drop expired blacklist entries and expired usage windows, returning
    /// the number of removed entries
    async fn token_cleanup_expired(&self) -> anyhow::Result<u64>;

    /// Count one request against a token, opening a fresh window of length
    /// `window` when none is active. Returns the count within the window.
    async fn token_usage_increment(&self, token: &str, window: Duration) -> anyhow::Result<i64>;

    /// Whether the token may issue another request under `limit`
    async fn token_check_rate_limit(&self, token: &str, limit: i64) -> anyhow::Result<bool>;

    /// Forget the usage window of a token
    async fn token_usage_reset(&self, token: &str) -> anyhow::Result<()>;
}
