//! Bearer-token validation against a Keycloak token-introspection endpoint.
//!
//! [`Introspector`] holds the client credentials and the endpoint location.
//! [`Introspector::verify_token_from_header`] validates a raw `Authorization`
//! value directly; [`validate_bearer`] wraps it as an axum middleware that
//! gates a router.

use axum::extract::{Request, State};
use axum::http::{header, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use reqwest::header::CONTENT_TYPE;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{error, trace};

use crate::config::IntrospectConfig;
use crate::error::AuthError;

const TOKEN_HEADER_PARTS: usize = 2;

/// Client details reported by the introspection endpoint.
///
/// Every field is defaulted so a minimal `{"active": false}` response still
/// decodes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientDetails {
    #[serde(default)]
    pub active: bool,
    /// Space-delimited scope list carried by the token.
    #[serde(default)]
    pub scope: String,
    #[serde(rename = "clientId", default)]
    pub client_id: String,
}

/// Validates inbound bearer tokens by asking the identity provider whether
/// they are active and carry the required scope.
#[derive(Debug, Clone)]
pub struct Introspector {
    config: IntrospectConfig,
    http: reqwest::Client,
}

impl Introspector {
    /// Create an introspector with a default HTTP client.
    ///
    /// An empty `scheme` or `port` in the config falls back to `https`/`443`.
    pub fn new(config: IntrospectConfig) -> Self {
        Self::with_http_client(config, reqwest::Client::new())
    }

    /// Like [`Introspector::new`] but with a caller-supplied client, e.g. to
    /// impose a timeout or to point tests at a fake responder.
    pub fn with_http_client(mut config: IntrospectConfig, http: reqwest::Client) -> Self {
        if config.scheme.is_empty() {
            config.scheme = "https".to_string();
        }
        if config.port.is_empty() {
            config.port = "443".to_string();
        }
        Self { config, http }
    }

    fn introspect_url(&self) -> String {
        format!(
            "{}://{}:{}{}",
            self.config.scheme, self.config.host, self.config.port, self.config.introspect_path
        )
    }

    /// Split `Bearer <token>` into its parts and return the raw token.
    ///
    /// Exactly two space-separated parts are accepted; tokens are assumed
    /// never to contain whitespace.
    fn raw_token<'a>(&self, authorization_header: &'a str) -> Result<&'a str, AuthError> {
        let parts: Vec<&str> = authorization_header.split(' ').collect();
        if parts.len() != TOKEN_HEADER_PARTS || parts[0] != "Bearer" {
            error!(
                header_parts = parts.len(),
                "authorization header incorrect"
            );
            return Err(AuthError::MalformedAuthHeader);
        }
        Ok(parts[1])
    }

    /// Verify an `Authorization` header value of the form `Bearer <token>`.
    ///
    /// Returns `(true, Some(details))` when the provider reports the token
    /// active and its scope string contains the required scope as a substring
    /// (`admin-scope` satisfies a required scope of `admin`). Every other
    /// outcome is an error; an explicitly inactive token and a wrong scope
    /// both surface as [`AuthError::UnauthorizedOrUnknown`].
    ///
    /// The response status code is not inspected: a non-JSON error page from
    /// the provider surfaces as [`AuthError::IntrospectionDecode`].
    pub async fn verify_token_from_header(
        &self,
        authorization_header: &str,
    ) -> Result<(bool, Option<ClientDetails>), AuthError> {
        let token = self.raw_token(authorization_header)?;
        let url = self.introspect_url();

        trace!(%url, "introspecting token");

        let response = self
            .http
            .post(&url)
            .basic_auth(&self.config.client_id, Some(&self.config.client_secret))
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(format!("token={token}"))
            .send()
            .await
            .map_err(AuthError::IntrospectionTransport)?;

        let body = response
            .bytes()
            .await
            .map_err(AuthError::IntrospectionTransport)?;

        let details: ClientDetails = serde_json::from_slice(&body).map_err(|err| {
            error!(error = %err, "introspection response could not be decoded");
            AuthError::IntrospectionDecode(err)
        })?;

        if details.active && details.scope.contains(&self.config.scope) {
            trace!(client_id = %details.client_id, "authorized client");
            return Ok((true, Some(details)));
        }

        Err(AuthError::UnauthorizedOrUnknown)
    }
}

/// Axum middleware that gates a router behind token introspection.
///
/// ```ignore
/// let introspector = Introspector::new(config);
/// let app = Router::new()
///     .route("/", get(handler))
///     .layer(middleware::from_fn_with_state(introspector, validate_bearer));
/// ```
///
/// A missing `Authorization` header behaves as an empty one. Every
/// verification failure — malformed header, transport or decode error, and
/// inactive or out-of-scope tokens, which also surface as errors — responds
/// with `500` and `{"error": "<message>"}`. The `401` arm only fires for a
/// successful-but-unauthorized verdict, which
/// [`Introspector::verify_token_from_header`] never produces today.
///
/// On success the [`ClientDetails`] are inserted into the request extensions
/// before the inner service runs.
pub async fn validate_bearer(
    State(introspector): State<Introspector>,
    mut request: Request,
    next: Next,
) -> Response {
    let authorization = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_string();

    match introspector.verify_token_from_header(&authorization).await {
        Err(err) => {
            error!(error = %err, "token validation failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": err.to_string() })),
            )
                .into_response()
        }
        Ok((true, Some(details))) => {
            request.extensions_mut().insert(details);
            next.run(request).await
        }
        Ok(_) => (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "error": { "error": AuthError::UnauthorizedOrUnknown.to_string() } })),
        )
            .into_response(),
    }
}
