//! JWT token service

use std::time::Duration;

use chrono::Utc;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use moka::sync::Cache;

use tamarind_common::TamarindError;

use crate::model::{AuthSettings, Claims, INVALID_TOKEN_MESSAGE, TokenKind, TokenPair};

/// Issues and validates HS256-signed tokens
///
/// Decoded claims are cached to avoid re-verifying the signature of a hot
/// token on every request. Expiry is re-checked on every cache hit.
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    access_ttl: i64,
    refresh_ttl: i64,
    cache: Cache<String, Claims>,
}

impl TokenService {
    pub fn new(settings: &AuthSettings) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Self {
            encoding_key: EncodingKey::from_secret(settings.secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(settings.secret.as_bytes()),
            validation,
            access_ttl: settings.access_token_expire_seconds,
            refresh_ttl: settings.refresh_token_expire_seconds,
            cache: Cache::builder()
                .max_capacity(10_000)
                .time_to_live(Duration::from_secs(300))
                .build(),
        }
    }

    /// Access token lifetime in seconds
    pub fn access_ttl(&self) -> i64 {
        self.access_ttl
    }

    /// Sign a token of the given kind for `username`
    pub fn issue(&self, username: &str, kind: TokenKind) -> anyhow::Result<(String, Claims)> {
        let ttl = match kind {
            TokenKind::Access => self.access_ttl,
            TokenKind::Refresh => self.refresh_ttl,
        };
        let now = Utc::now().timestamp();

        let claims = Claims {
            sub: username.to_string(),
            username: username.to_string(),
            token_type: kind,
            iat: now,
            exp: now + ttl,
            jti: uuid::Uuid::new_v4().to_string(),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)?;
        Ok((token, claims))
    }

    /// Issue a fresh access and refresh token for `username`
    pub fn issue_pair(&self, username: &str) -> anyhow::Result<TokenPair> {
        let (access_token, _) = self.issue(username, TokenKind::Access)?;
        let (refresh_token, _) = self.issue(username, TokenKind::Refresh)?;

        Ok(TokenPair {
            access_token,
            refresh_token,
            expires_in: self.access_ttl,
        })
    }

    /// Verify signature and expiry
    pub fn decode(&self, token: &str) -> anyhow::Result<Claims> {
        if let Some(claims) = self.cache.get(token) {
            if claims.exp > Utc::now().timestamp() {
                return Ok(claims);
            }
            self.cache.invalidate(token);
        }

        let data = decode::<Claims>(token, &self.decoding_key, &self.validation).map_err(|e| {
            tracing::debug!("Token rejected: {}", e);
            TamarindError::unauthorized(INVALID_TOKEN_MESSAGE)
        })?;

        self.cache.insert(token.to_string(), data.claims.clone());
        Ok(data.claims)
    }

    /// Verify signature, expiry and kind
    pub fn validate(&self, token: &str, kind: TokenKind) -> anyhow::Result<Claims> {
        let claims = self.decode(token)?;
        if claims.token_type != kind {
            return Err(TamarindError::unauthorized(format!(
                "expected {} token",
                kind
            )));
        }
        Ok(claims)
    }

    /// Drop a token from the decode cache
    pub fn invalidate(&self, token: &str) {
        self.cache.invalidate(token);
    }
}
