use thiserror::Error;

/// Failures while validating an inbound bearer token.
#[derive(Debug, Error)]
pub enum AuthError {
    /// The `Authorization` header was absent, had the wrong number of parts,
    /// or did not use the `Bearer` scheme.
    #[error("authorization header incorrect or invalid, wrong number of parts")]
    MalformedAuthHeader,

    /// The introspection endpoint could not be reached or the response body
    /// could not be read.
    #[error("token introspection request failed: {0}")]
    IntrospectionTransport(#[source] reqwest::Error),

    /// The introspection response was not valid JSON.
    #[error("token introspection response could not be decoded: {0}")]
    IntrospectionDecode(#[source] serde_json::Error),

    /// The token was reported inactive, lacked the required scope, or the
    /// response matched no recognized outcome. The remote contract does not
    /// let us tell these apart, so one error kind covers all of them.
    #[error("unknown error encountered while trying to validate token")]
    UnauthorizedOrUnknown,
}

/// Failures while fetching a service access token. The cached token is left
/// untouched in either case.
#[derive(Debug, Error)]
pub enum TokenFetchError {
    /// The token endpoint could not be reached or the response body could not
    /// be read.
    #[error("token request failed: {0}")]
    Transport(#[source] reqwest::Error),

    /// The token response was not valid JSON.
    #[error("token response could not be decoded: {0}")]
    Decode(#[source] serde_json::Error),
}
