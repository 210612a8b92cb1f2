//! HTTP client for the imaging backend.
//!
//! [`ApiClient`] owns the transport, the authentication manager, and the
//! authorized request path: every protected GET is preceded by a token
//! freshness check and reissued exactly once after a 401. All failure modes
//! come back as typed results so a polling caller can treat every outcome
//! uniformly; nothing in this module panics or unwinds across the API
//! boundary.

use std::time::Duration;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;

use crate::auth::{AuthManager, Credentials};
use crate::connection::ServerAddress;
use crate::error::{AuthError, RequestError};
use crate::types::{Frame, ImagePayload, InferenceResult};

/// HTTP transport configuration for connection reliability.
///
/// Tuned for a viewer that polls a local or networked backend about once a
/// second: a polling client must never stall indefinitely on a single call,
/// so every request carries a bounded timeout.
#[derive(Debug, Clone)]
pub struct HttpConfig {
    /// Connection timeout (how long to wait for the TCP/TLS handshake).
    pub connect_timeout: Duration,
    /// Request timeout (total budget for one HTTP call).
    pub request_timeout: Duration,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(5),
            request_timeout: Duration::from_secs(10),
        }
    }
}

/// Everything needed to construct an [`ApiClient`].
///
/// The embedding application is responsible for producing a validated address
/// and credentials (from its settings UI, environment, or config file); this
/// library performs no file I/O of its own.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Backend base address.
    pub address: ServerAddress,
    /// Login credentials.
    pub credentials: Credentials,
    /// Transport timeouts.
    pub http: HttpConfig,
}

impl ClientConfig {
    /// Configuration with default transport timeouts.
    #[must_use]
    pub fn new(address: ServerAddress, credentials: Credentials) -> Self {
        Self {
            address,
            credentials,
            http: HttpConfig::default(),
        }
    }
}

/// Authorized HTTP client for the backend REST surface.
pub struct ApiClient {
    http: reqwest::Client,
    image_url: String,
    results_url: String,
    auth: AuthManager,
}

impl ApiClient {
    /// Build a client from configuration.
    ///
    /// Fails only if the underlying transport stack cannot be initialized.
    pub fn new(config: ClientConfig) -> Result<Self, RequestError> {
        let http = reqwest::Client::builder()
            .connect_timeout(config.http.connect_timeout)
            .timeout(config.http.request_timeout)
            .build()?;
        let base = config.address.as_str().trim_end_matches('/').to_string();
        let auth = AuthManager::new(http.clone(), &base, config.credentials);
        Ok(Self {
            http,
            image_url: format!("{base}/api/image"),
            results_url: format!("{base}/api/results"),
            auth,
        })
    }

    /// Perform the initial credential exchange.
    pub async fn login(&mut self) -> Result<(), AuthError> {
        self.auth.login().await
    }

    /// Access the authentication manager (token state introspection).
    #[must_use]
    pub fn auth(&self) -> &AuthManager {
        &self.auth
    }

    /// Fetch the latest camera frame.
    ///
    /// Returns `Ok(None)` when the backend has no frame to serve.
    pub async fn fetch_frame(&mut self) -> Result<Option<Frame>, RequestError> {
        let url = self.image_url.clone();
        let Some(payload) = self.get_protected::<ImagePayload>(&url).await? else {
            return Ok(None);
        };
        let image_data = BASE64
            .decode(&payload.image_data_base64)
            .map_err(|error| RequestError::Decode(format!("image payload: {error}")))?;
        Ok(Some(Frame {
            image_id: payload.image_id,
            image_data,
        }))
    }

    /// Fetch the analysis results for the current frame.
    ///
    /// Returns `Ok(None)` when no results are available yet.
    pub async fn fetch_results(&mut self) -> Result<Option<InferenceResult>, RequestError> {
        let url = self.results_url.clone();
        self.get_protected(&url).await
    }

    /// Execute one authorized GET against a protected endpoint.
    ///
    /// The token is renewed up front if due. A 401 answer triggers a forced
    /// refresh and exactly one reissue of the request; whatever the second
    /// attempt yields is final, so at most two HTTP attempts are made per
    /// logical call.
    ///
    /// `Ok(None)` is returned for an absent payload: 204, an empty body, or
    /// a JSON `null`.
    pub async fn get_protected<T: DeserializeOwned>(
        &mut self,
        url: &str,
    ) -> Result<Option<T>, RequestError> {
        self.auth.ensure_fresh().await;

        let mut response = self.auth.authorize(self.http.get(url)).send().await?;

        if response.status() == StatusCode::UNAUTHORIZED {
            // The backend invalidated the token ahead of its advertised
            // lifetime. Refresh once and reissue; the second outcome stands.
            tracing::warn!(url, "unauthorized, refreshing token and retrying");
            self.auth.force_refresh().await;
            response = self.auth.authorize(self.http.get(url)).send().await?;
        }

        let status = response.status();
        if status == StatusCode::NO_CONTENT {
            return Ok(None);
        }
        if !status.is_success() {
            tracing::warn!(url, %status, "request failed");
            return Err(RequestError::Http(status));
        }

        let body = response.bytes().await?;
        if body.is_empty() {
            return Ok(None);
        }
        // A literal `null` body also counts as "nothing to serve".
        serde_json::from_slice::<Option<T>>(&body)
            .map_err(|error| RequestError::Decode(error.to_string()))
    }
}
