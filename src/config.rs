//! Construction-time settings for the introspector and the token getter.

use thiserror::Error;

/// A required setting was absent at construction time.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing configuration: {0}")]
    Missing(&'static str),
}

/// Settings for [`crate::introspect::Introspector`].
#[derive(Debug, Clone)]
pub struct IntrospectConfig {
    pub client_id: String,
    pub client_secret: String,
    /// Host of the identity provider, without scheme or port.
    pub host: String,
    /// Defaults to `"443"` when left empty.
    pub port: String,
    /// Defaults to `"https"` when left empty.
    pub scheme: String,
    /// Scope the introspected token must carry.
    pub scope: String,
    /// Path of the token-introspection endpoint on the provider.
    pub introspect_path: String,
}

impl IntrospectConfig {
    /// Read settings from `KEYCLOAK_*` environment variables.
    ///
    /// `KEYCLOAK_PORT` and `KEYCLOAK_SCHEME` may be unset; the constructor
    /// defaults then apply. Every other variable is required.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            client_id: require_env("KEYCLOAK_CLIENT_ID")?,
            client_secret: require_env("KEYCLOAK_CLIENT_SECRET")?,
            host: require_env("KEYCLOAK_HOST")?,
            port: std::env::var("KEYCLOAK_PORT").unwrap_or_default(),
            scheme: std::env::var("KEYCLOAK_SCHEME").unwrap_or_default(),
            scope: require_env("KEYCLOAK_REQUIRED_SCOPE")?,
            introspect_path: require_env("KEYCLOAK_INTROSPECT_PATH")?,
        })
    }
}

/// Settings for [`crate::token::TokenGetter`].
#[derive(Debug, Clone)]
pub struct TokenGetterConfig {
    pub client_id: String,
    pub client_secret: String,
    /// Full URL of the client-credentials token endpoint.
    pub token_url: String,
}

impl TokenGetterConfig {
    /// Read settings from `KEYCLOAK_*` environment variables. All are required.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            client_id: require_env("KEYCLOAK_CLIENT_ID")?,
            client_secret: require_env("KEYCLOAK_CLIENT_SECRET")?,
            token_url: require_env("KEYCLOAK_TOKEN_URL")?,
        })
    }
}

fn require_env(key: &'static str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::Missing(key))
}
