//! Authentication models
//!
//! Token claims, issued token pairs, request auth context and settings.

use std::time::Duration;

use serde::{Deserialize, Serialize};

pub const AUTHORIZATION_HEADER: &str = "Authorization";
pub const TOKEN_PREFIX: &str = "Bearer ";

pub const DEFAULT_ACCESS_TOKEN_EXPIRE_SECONDS: i64 = 7200;
pub const DEFAULT_REFRESH_TOKEN_EXPIRE_SECONDS: i64 = 604800;
pub const DEFAULT_RATE_LIMIT_MAX_REQUESTS: i64 = 100;
pub const DEFAULT_RATE_LIMIT_WINDOW_SECONDS: u64 = 60;
pub const DEFAULT_CLEANUP_INTERVAL_SECONDS: u64 = 300;
pub const DEFAULT_ADMIN_PASSWORD: &str = "admin";
pub const DEFAULT_BCRYPT_COST: u32 = 10;

/// bcrypt ignores input beyond 72 bytes
pub const MAX_PASSWORD_LENGTH: usize = 72;

pub const INVALID_CREDENTIALS_MESSAGE: &str = "invalid credentials";
pub const ACCOUNT_DISABLED_MESSAGE: &str = "account disabled";
pub const TOKEN_REVOKED_MESSAGE: &str = "token revoked";
pub const RATE_LIMITED_MESSAGE: &str = "rate limit exceeded";
pub const INVALID_TOKEN_MESSAGE: &str = "invalid token";

/// Kind tag carried by every token
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

impl TokenKind {
    pub fn as_str(self) -> &'static str {
        match self {
            TokenKind::Access => "access",
            TokenKind::Refresh => "refresh",
        }
    }
}

impl std::fmt::Display for TokenKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// JWT payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub username: String,
    pub token_type: TokenKind,
    pub iat: i64,
    pub exp: i64,
    /// Unique per token so two tokens issued in the same second differ
    pub jti: String,
}

/// Access and refresh tokens returned by login and refresh
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    /// Access token lifetime in seconds
    pub expires_in: i64,
}

/// Identity attached to an authorized request
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthContext {
    pub username: String,
    /// The bearer token that authorized the request
    pub token: String,
}

/// Tunables of the auth subsystem
#[derive(Debug, Clone)]
pub struct AuthSettings {
    pub secret: String,
    pub access_token_expire_seconds: i64,
    pub refresh_token_expire_seconds: i64,
    pub rate_limit_max_requests: i64,
    pub rate_limit_window: Duration,
    pub cleanup_interval: Duration,
    pub bcrypt_cost: u32,
}

impl AuthSettings {
    pub fn new(secret: &str) -> Self {
        Self {
            secret: secret.to_string(),
            access_token_expire_seconds: DEFAULT_ACCESS_TOKEN_EXPIRE_SECONDS,
            refresh_token_expire_seconds: DEFAULT_REFRESH_TOKEN_EXPIRE_SECONDS,
            rate_limit_max_requests: DEFAULT_RATE_LIMIT_MAX_REQUESTS,
            rate_limit_window: Duration::from_secs(DEFAULT_RATE_LIMIT_WINDOW_SECONDS),
            cleanup_interval: Duration::from_secs(DEFAULT_CLEANUP_INTERVAL_SECONDS),
            bcrypt_cost: DEFAULT_BCRYPT_COST,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_kind_serde() {
        assert_eq!(TokenKind::Refresh.to_string(), "refresh");
        let kind: TokenKind = serde_json::from_str("\"access\"").unwrap();
        assert_eq!(kind, TokenKind::Access);
    }

    #[test]
    fn test_default_settings() {
        let settings = AuthSettings::new("secret");
        assert_eq!(settings.access_token_expire_seconds, 7200);
        assert_eq!(settings.refresh_token_expire_seconds, 7 * 24 * 3600);
        assert_eq!(settings.rate_limit_max_requests, 100);
        assert_eq!(settings.rate_limit_window, Duration::from_secs(60));
    }
}
