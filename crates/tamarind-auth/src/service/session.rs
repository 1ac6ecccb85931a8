//! Session lifecycle: login, refresh, logout and request authorization

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};

use tamarind_common::TamarindError;
use tamarind_persistence::PersistenceService;

use crate::model::{
    ACCOUNT_DISABLED_MESSAGE, AuthContext, AuthSettings, INVALID_CREDENTIALS_MESSAGE,
    RATE_LIMITED_MESSAGE, TOKEN_REVOKED_MESSAGE, TokenKind, TokenPair,
};
use crate::service::password::{hash_password, verify_password};
use crate::service::token::TokenService;

fn expiry_of(exp: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(exp, 0).unwrap_or_else(Utc::now)
}

pub struct SessionService {
    persistence: Arc<dyn PersistenceService>,
    tokens: TokenService,
    /// Checked when the user is unknown so both paths pay for one bcrypt run
    dummy_digest: String,
    rate_limit_max_requests: i64,
    rate_limit_window: Duration,
}

impl SessionService {
    pub fn new(persistence: Arc<dyn PersistenceService>, settings: &AuthSettings) -> Self {
        let dummy_digest = hash_password(&uuid::Uuid::new_v4().to_string(), settings.bcrypt_cost)
            .unwrap_or_else(|e| {
                tracing::warn!("Failed to prepare dummy password digest: {}", e);
                String::new()
            });

        Self {
            persistence,
            tokens: TokenService::new(settings),
            dummy_digest,
            rate_limit_max_requests: settings.rate_limit_max_requests,
            rate_limit_window: settings.rate_limit_window,
        }
    }

    pub fn tokens(&self) -> &TokenService {
        &self.tokens
    }

    /// Exchange credentials for a token pair
    pub async fn login(&self, username: &str, password: &str) -> anyhow::Result<TokenPair> {
        let user = if username.is_empty() || password.is_empty() {
            None
        } else {
            match self.persistence.user_find_by_username(username).await? {
                Some(u) => Some(u).filter(|u| verify_password(password, &u.password)),
                None => {
                    verify_password(password, &self.dummy_digest);
                    None
                }
            }
        };

        let Some(user) = user else {
            tracing::info!("Login rejected for '{}'", username);
            return Err(TamarindError::unauthorized(INVALID_CREDENTIALS_MESSAGE));
        };
        if !user.is_active() {
            return Err(TamarindError::unauthorized(ACCOUNT_DISABLED_MESSAGE));
        }

        tracing::info!("User '{}' logged in", username);
        self.tokens.issue_pair(&user.username)
    }

    /// Rotate a refresh token into a brand-new pair
    ///
    /// The presented refresh token stays valid unless it was revoked.
    pub async fn refresh(&self, refresh_token: &str) -> anyhow::Result<TokenPair> {
        if self.persistence.token_is_blacklisted(refresh_token).await? {
            return Err(TamarindError::unauthorized(TOKEN_REVOKED_MESSAGE));
        }
        let claims = self.tokens.validate(refresh_token, TokenKind::Refresh)?;

        match self
            .persistence
            .user_find_by_username(&claims.username)
            .await?
        {
            Some(user) if user.is_active() => self.tokens.issue_pair(&user.username),
            Some(_) => Err(TamarindError::unauthorized(ACCOUNT_DISABLED_MESSAGE)),
            None => Err(TamarindError::unauthorized(INVALID_CREDENTIALS_MESSAGE)),
        }
    }

    /// Revoke the access token of the current request and, optionally, a
    /// refresh token belonging to the same user
    pub async fn logout(
        &self,
        ctx: &AuthContext,
        refresh_token: Option<&str>,
    ) -> anyhow::Result<()> {
        let claims = self.tokens.decode(&ctx.token)?;
        self.revoke(&ctx.token, claims.exp).await?;

        if let Some(refresh_token) = refresh_token {
            let refresh = self.tokens.validate(refresh_token, TokenKind::Refresh)?;
            if refresh.username != ctx.username {
                return Err(TamarindError::forbidden(
                    "refresh token belongs to another user",
                ));
            }
            self.revoke(refresh_token, refresh.exp).await?;
        }

        tracing::info!("User '{}' logged out", ctx.username);
        Ok(())
    }

    async fn revoke(&self, token: &str, exp: i64) -> anyhow::Result<()> {
        self.persistence
            .token_blacklist_add(token, expiry_of(exp))
            .await?;
        self.tokens.invalidate(token);
        Ok(())
    }

    /// Authorize a protected request carrying `token`
    ///
    /// Checks run in order and stop at the first failure: revocation, rate
    /// limit, then signature, expiry and kind. A request rejected by the rate
    /// limit is not counted; every request past that point is.
    pub async fn authorize(&self, token: &str) -> anyhow::Result<AuthContext> {
        if self.persistence.token_is_blacklisted(token).await? {
            return Err(TamarindError::unauthorized(TOKEN_REVOKED_MESSAGE));
        }

        if !self
            .persistence
            .token_check_rate_limit(token, self.rate_limit_max_requests)
            .await?
        {
            return Err(TamarindError::RateLimited(RATE_LIMITED_MESSAGE.to_string()).into());
        }
        self.persistence
            .token_usage_increment(token, self.rate_limit_window)
            .await?;

        let claims = self.tokens.validate(token, TokenKind::Access)?;
        Ok(AuthContext {
            username: claims.username,
            token: token.to_string(),
        })
    }
}
