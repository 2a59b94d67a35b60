//! Keycloak client authorization for axum services.
//!
//! Two independent pieces, no shared state:
//! - [`introspect::Introspector`] validates inbound `Bearer` tokens against a
//!   token-introspection endpoint and ships an axum middleware,
//!   [`introspect::validate_bearer`].
//! - [`token::TokenGetter`] obtains an outbound service token via the
//!   client-credentials grant and caches it until expiry.
//!
//! Trust decisions are delegated entirely to the remote provider; this crate
//! performs no signature verification or key management.

pub mod config;
pub mod error;
pub mod introspect;
pub mod token;

pub use config::{ConfigError, IntrospectConfig, TokenGetterConfig};
pub use error::{AuthError, TokenFetchError};
pub use introspect::{validate_bearer, ClientDetails, Introspector};
pub use token::{Token, TokenContainer, TokenGetter};
