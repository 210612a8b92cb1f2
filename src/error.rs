//! Client error types.

use thiserror::Error;

/// Errors from the credential exchange and token renewal path.
#[derive(Error, Debug)]
pub enum AuthError {
    /// The backend rejected the login credentials.
    #[error("login rejected: HTTP {0}")]
    LoginRejected(reqwest::StatusCode),

    /// The auth call never produced an HTTP response (connect, timeout, TLS).
    #[error("auth transport error: {0}")]
    Transport(#[from] reqwest::Error),
}

/// Errors from an authorized request to a protected endpoint.
#[derive(Error, Debug)]
pub enum RequestError {
    /// The backend answered with a non-success status.
    #[error("HTTP {0}")]
    Http(reqwest::StatusCode),

    /// The request failed below the HTTP layer (connect, timeout, TLS).
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The response body could not be decoded into the expected shape.
    #[error("decode error: {0}")]
    Decode(String),
}
