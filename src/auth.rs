//! Session and token lifecycle management.
//!
//! [`AuthManager`] owns the single authenticated session against the backend:
//! it performs the initial credential exchange, renews the access token before
//! it expires, and stamps outgoing requests with the bearer header. Renewal
//! failures are contained here: the caller keeps going with the stale token
//! and discovers a true invalidation through a 401 on the next protected
//! call, which triggers [`AuthManager::force_refresh`].

use std::time::{Duration, Instant};

use reqwest::RequestBuilder;
use serde::{Deserialize, Serialize};

use crate::error::AuthError;

/// Safety margin subtracted from the server-reported token lifetime, so the
/// token is renewed before it can expire mid-flight.
const EXPIRY_MARGIN: Duration = Duration::from_secs(20);

/// Username/password pair for the credential exchange.
///
/// Produced by the embedding application from its own configuration; this
/// library never reads credential files.
#[derive(Clone)]
pub struct Credentials {
    /// Account name presented to the login endpoint.
    pub username: String,
    /// Account password presented to the login endpoint.
    pub password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// An issued token pair with its computed expiry.
///
/// Replaced wholesale on every successful login or refresh, never partially
/// mutated.
#[derive(Debug, Clone)]
pub struct Session {
    access_token: String,
    refresh_token: String,
    expires_at: Instant,
}

impl Session {
    fn from_response(response: AuthResponse, issued_at: Instant) -> Self {
        // Lifetimes at or below the margin count as already expired.
        let lifetime =
            Duration::from_secs(response.expires_in.saturating_sub(EXPIRY_MARGIN.as_secs()));
        Self {
            access_token: response.access_token,
            refresh_token: response.refresh_token,
            expires_at: issued_at + lifetime,
        }
    }

    /// Returns `true` while the access token is considered usable.
    #[must_use]
    pub fn is_valid(&self, now: Instant) -> bool {
        now < self.expires_at
    }

    /// Instant after which the access token is due for renewal.
    #[must_use]
    pub fn expires_at(&self) -> Instant {
        self.expires_at
    }

    /// Attach the access token to an outgoing request.
    fn apply(&self, request: RequestBuilder) -> RequestBuilder {
        request.bearer_auth(&self.access_token)
    }
}

#[derive(Serialize)]
struct LoginRequest<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
struct RefreshRequest<'a> {
    refresh_token: &'a str,
}

#[derive(Deserialize)]
struct AuthResponse {
    access_token: String,
    refresh_token: String,
    expires_in: u64,
}

/// Owns the authenticated session and keeps its access token fresh.
///
/// One manager maintains exactly one session against one backend. All methods
/// take `&mut self`; the expected usage is a single task driving login,
/// renewal, and requests sequentially.
pub struct AuthManager {
    http: reqwest::Client,
    login_url: String,
    refresh_url: String,
    credentials: Credentials,
    session: Option<Session>,
}

impl AuthManager {
    /// Create a manager for the given backend base URL.
    ///
    /// No network traffic happens until [`login`](Self::login) is called.
    pub fn new(http: reqwest::Client, base_url: &str, credentials: Credentials) -> Self {
        let base = base_url.trim_end_matches('/');
        Self {
            http,
            login_url: format!("{base}/api/auth/login"),
            refresh_url: format!("{base}/api/auth/refresh"),
            credentials,
            session: None,
        }
    }

    /// Exchange the stored credentials for a token pair.
    ///
    /// A rejected exchange leaves any previously stored session untouched.
    pub async fn login(&mut self) -> Result<(), AuthError> {
        tracing::info!(url = %self.login_url, "logging in");
        let response = self
            .http
            .post(&self.login_url)
            .json(&LoginRequest {
                username: &self.credentials.username,
                password: &self.credentials.password,
            })
            .send()
            .await?;

        if !response.status().is_success() {
            tracing::warn!(status = %response.status(), "login rejected");
            return Err(AuthError::LoginRejected(response.status()));
        }

        let issued_at = Instant::now();
        let body: AuthResponse = response.json().await?;
        self.session = Some(Session::from_response(body, issued_at));
        tracing::info!("login successful");
        Ok(())
    }

    /// Renew the session if the access token has reached its expiry margin.
    ///
    /// Does nothing while the stored token is still valid, and nothing at all
    /// when no login has happened yet. A failed renewal keeps the previous
    /// session in place and is reported only through the log; the next
    /// protected call surfaces a 401 if the token is truly dead.
    pub async fn ensure_fresh(&mut self) {
        match &self.session {
            Some(session) if !session.is_valid(Instant::now()) => {}
            _ => return,
        }
        tracing::info!("access token expired, refreshing");
        if let Err(error) = self.refresh().await {
            tracing::warn!(%error, "token refresh failed, keeping previous session");
        }
    }

    /// Renew the session regardless of the stored expiry.
    ///
    /// Used after a 401, which means the backend invalidated the token ahead
    /// of its advertised lifetime. Failures are contained the same way as in
    /// [`ensure_fresh`](Self::ensure_fresh).
    pub async fn force_refresh(&mut self) {
        if self.session.is_none() {
            tracing::debug!("no session to refresh");
            return;
        }
        tracing::info!("forcing token refresh");
        if let Err(error) = self.refresh().await {
            tracing::warn!(%error, "forced token refresh failed, keeping previous session");
        }
    }

    async fn refresh(&mut self) -> Result<(), AuthError> {
        let Some(current) = &self.session else {
            return Ok(());
        };
        let response = self
            .http
            .post(&self.refresh_url)
            .json(&RefreshRequest {
                refresh_token: &current.refresh_token,
            })
            .send()
            .await?;

        if !response.status().is_success() {
            // Keep the stale session; a 401 downstream will tell the truth.
            tracing::warn!(status = %response.status(), "token refresh rejected");
            return Ok(());
        }

        let issued_at = Instant::now();
        let body: AuthResponse = response.json().await?;
        self.session = Some(Session::from_response(body, issued_at));
        tracing::info!("token refresh completed");
        Ok(())
    }

    /// Attach the current access token to an outgoing request.
    ///
    /// A manager with no session leaves the request untouched; the backend
    /// will answer 401.
    pub fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.session {
            Some(session) => session.apply(request),
            None => request,
        }
    }

    /// The currently stored session, if a login has succeeded.
    #[must_use]
    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(expires_in: u64) -> AuthResponse {
        AuthResponse {
            access_token: "tok-a".to_string(),
            refresh_token: "tok-r".to_string(),
            expires_in,
        }
    }

    #[test]
    fn test_expiry_margin_applied() {
        let issued = Instant::now();
        let session = Session::from_response(response(40), issued);

        // 40s lifetime minus the 20s margin: due for renewal at issued+20.
        assert_eq!(session.expires_at(), issued + Duration::from_secs(20));
        assert!(session.is_valid(issued + Duration::from_secs(19)));
        assert!(!session.is_valid(issued + Duration::from_secs(20)));
        assert!(!session.is_valid(issued + Duration::from_secs(40)));
    }

    #[test]
    fn test_short_lifetime_expires_immediately() {
        let issued = Instant::now();

        // At or below the margin the token counts as already expired.
        let session = Session::from_response(response(20), issued);
        assert!(!session.is_valid(issued));

        let session = Session::from_response(response(5), issued);
        assert!(!session.is_valid(issued));
    }

    #[test]
    fn test_credentials_debug_redacts_password() {
        let creds = Credentials {
            username: "operator".to_string(),
            password: "hunter2".to_string(),
        };
        let rendered = format!("{creds:?}");
        assert!(rendered.contains("operator"));
        assert!(!rendered.contains("hunter2"));
    }
}
