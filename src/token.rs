//! Service-to-service access tokens via the client-credentials grant.
//!
//! [`TokenGetter`] performs the exchange lazily and caches the returned token
//! until its expiry instant passes. Clones share one cache slot.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{error, trace};

use crate::config::TokenGetterConfig;
use crate::error::TokenFetchError;

/// How many characters of an access token may appear in trace logs.
const TOKEN_LOG_PREFIX_CHARS: usize = 5;

/// Token payload returned by the identity provider's token endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Token {
    #[serde(default)]
    pub access_token: String,
    #[serde(rename = "expires_in", default)]
    pub expires_in_seconds: i64,
    #[serde(default)]
    pub refresh_expires_in: i64,
    #[serde(default)]
    pub token_type: String,
    #[serde(rename = "not-before-policy", default)]
    pub not_before_policy: i64,
    #[serde(default)]
    pub scope: String,
}

/// A token paired with the absolute instant it stops being usable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenContainer {
    pub token: Token,
    pub expires_at: DateTime<Utc>,
}

impl TokenContainer {
    /// Expired only strictly after `expires_at`; a token whose expiry equals
    /// `now` is still served.
    fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }
}

/// Fetches and caches a client-credentials access token.
#[derive(Debug, Clone)]
pub struct TokenGetter {
    config: TokenGetterConfig,
    http: reqwest::Client,
    cached: Arc<Mutex<Option<TokenContainer>>>,
}

impl TokenGetter {
    /// Create a token getter with a default HTTP client and an empty cache.
    pub fn new(config: TokenGetterConfig) -> Self {
        Self::with_http_client(config, reqwest::Client::new())
    }

    /// Like [`TokenGetter::new`] but with a caller-supplied client, e.g. to
    /// impose a timeout or to point tests at a fake responder.
    pub fn with_http_client(config: TokenGetterConfig, http: reqwest::Client) -> Self {
        Self {
            config,
            http,
            cached: Arc::new(Mutex::new(None)),
        }
    }

    /// Return the cached token, fetching a fresh one first when none is held
    /// or the held one has expired.
    ///
    /// The cache slot stays locked for the duration of a fetch, so concurrent
    /// callers on a cold or expired cache wait for the single in-flight
    /// exchange instead of stampeding the token endpoint. A failed fetch
    /// leaves the slot untouched.
    pub async fn get_token(&self) -> Result<TokenContainer, TokenFetchError> {
        let mut slot = self.cached.lock().await;

        if let Some(current) = slot.as_ref() {
            if current.is_expired_at(Utc::now()) {
                trace!("getting a new token because the existing one expired");
            } else {
                return Ok(current.clone());
            }
        } else {
            trace!("getting a new token because we don't have one yet");
        }

        let fresh = self.fetch().await?;
        *slot = Some(fresh.clone());
        Ok(fresh)
    }

    async fn fetch(&self) -> Result<TokenContainer, TokenFetchError> {
        let response = self
            .http
            .post(&self.config.token_url)
            .form(&[
                ("client_id", self.config.client_id.as_str()),
                ("client_secret", self.config.client_secret.as_str()),
                ("grant_type", "client_credentials"),
            ])
            .send()
            .await
            .map_err(|err| {
                error!(error = %err, "token request failed");
                TokenFetchError::Transport(err)
            })?;

        let body = response.bytes().await.map_err(TokenFetchError::Transport)?;

        let token: Token = serde_json::from_slice(&body).map_err(|err| {
            error!(error = %err, "token response could not be decoded");
            TokenFetchError::Decode(err)
        })?;

        let prefix: String = token
            .access_token
            .chars()
            .take(TOKEN_LOG_PREFIX_CHARS)
            .collect();
        let expires_at = Utc::now() + Duration::seconds(token.expires_in_seconds);

        trace!(
            access_token_prefix = %prefix,
            token_type = %token.token_type,
            expires_in = token.expires_in_seconds,
            %expires_at,
            "obtained service token"
        );

        Ok(TokenContainer { token, expires_at })
    }
}
