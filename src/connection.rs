//! Backend address configuration and URL normalization.
//!
//! This module provides types and utilities for managing the backend address:
//! - [`ServerAddress`]: Validated backend URL with source tracking
//! - [`AddressSource`]: Where the address configuration came from
//! - [`AddressError`]: User-friendly validation errors
//!
//! # Address Resolution Precedence
//!
//! Addresses are resolved in this order (highest priority first):
//! 1. User input (typed in UI)
//! 2. Persisted from previous session (via caller-provided string)
//! 3. `CELLSCOPE_SERVER_URL` environment variable
//! 4. Default: `http://127.0.0.1:8000`
//!
//! # URL Normalization
//!
//! The [`normalize_url`] function handles common input formats:
//! - Bare host:port (e.g., `192.168.1.20:8000` → `http://192.168.1.20:8000`)
//! - Missing port (e.g., `http://localhost` → `http://localhost:8000`)
//! - IPv6 addresses (e.g., `[::1]:8000` → `http://[::1]:8000`)
//!
//! # Example
//!
//! ```
//! use cellscope_client::connection::{ServerAddress, AddressSource};
//!
//! // Parse and normalize a user-provided address
//! let addr = ServerAddress::parse("192.168.1.20:8000", AddressSource::UserInput)?;
//! assert_eq!(addr.as_str(), "http://192.168.1.20:8000/");
//! assert!(!addr.is_tls());
//! # Ok::<(), cellscope_client::connection::AddressError>(())
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use url::Url;

/// Default HTTP port for the imaging backend.
pub const DEFAULT_SERVER_PORT: u16 = 8000;

/// Default backend address when no configuration is provided.
pub const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:8000";

/// Environment variable consulted during address resolution.
pub const SERVER_URL_ENV: &str = "CELLSCOPE_SERVER_URL";

/// Source of the backend address configuration.
///
/// Used for display in the UI and for determining precedence when
/// multiple sources provide addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AddressSource {
    /// Hardcoded default (`http://127.0.0.1:8000`)
    Default,
    /// Loaded from `CELLSCOPE_SERVER_URL` environment variable
    Environment,
    /// Restored from previous session via storage
    Persisted,
    /// User typed in the UI address field
    UserInput,
}

impl AddressSource {
    /// Returns the priority for address resolution (higher = preferred).
    #[must_use]
    pub fn priority(self) -> u8 {
        match self {
            Self::Default => 0,
            Self::Environment => 1,
            Self::Persisted => 2,
            Self::UserInput => 3,
        }
    }

    /// Returns a short label for display in the UI.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::Environment => "env",
            Self::Persisted => "saved",
            Self::UserInput => "user",
        }
    }
}

impl fmt::Display for AddressSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Default => write!(f, "Default"),
            Self::Environment => write!(f, "Environment (CELLSCOPE_SERVER_URL)"),
            Self::Persisted => write!(f, "Saved from previous session"),
            Self::UserInput => write!(f, "User input"),
        }
    }
}

/// Validated backend address with metadata.
///
/// This struct holds a normalized URL that has been validated for use
/// with the HTTP client. It also tracks the source of the address for
/// display purposes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerAddress {
    /// The normalized URL (always has scheme and port)
    url: String,
    /// Where this address came from
    source: AddressSource,
    /// Original input string (for display/debugging)
    original: String,
}

impl ServerAddress {
    /// Parse and normalize a backend URL.
    ///
    /// # Arguments
    ///
    /// * `input` - The URL string (may be bare host:port, missing scheme, etc.)
    /// * `source` - Where this address came from
    ///
    /// # Returns
    ///
    /// A validated `ServerAddress` or an `AddressError` if validation fails.
    ///
    /// # Example
    ///
    /// ```
    /// use cellscope_client::connection::{ServerAddress, AddressSource};
    ///
    /// let addr = ServerAddress::parse("localhost:8000", AddressSource::UserInput)?;
    /// assert_eq!(addr.as_str(), "http://localhost:8000/");
    /// # Ok::<(), cellscope_client::connection::AddressError>(())
    /// ```
    pub fn parse(input: &str, source: AddressSource) -> Result<Self, AddressError> {
        let normalized = normalize_url(input)?;
        Ok(Self {
            url: normalized.to_string(),
            source,
            original: input.to_string(),
        })
    }

    /// Returns the normalized URL string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.url
    }

    /// Returns where this address came from.
    #[must_use]
    pub fn source(&self) -> AddressSource {
        self.source
    }

    /// Returns the original input string before normalization.
    #[must_use]
    pub fn original(&self) -> &str {
        &self.original
    }

    /// Returns `true` if this address uses TLS (https scheme).
    #[must_use]
    pub fn is_tls(&self) -> bool {
        self.url.starts_with("https://")
    }

    /// Creates a new address with a different source.
    ///
    /// Useful when loading a persisted address (changes source from UserInput to Persisted).
    #[must_use]
    pub fn with_source(mut self, source: AddressSource) -> Self {
        self.source = source;
        self
    }
}

impl fmt::Display for ServerAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.url)
    }
}

impl FromStr for ServerAddress {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s, AddressSource::UserInput)
    }
}

impl Default for ServerAddress {
    fn default() -> Self {
        Self {
            url: format!("{DEFAULT_SERVER_URL}/"),
            source: AddressSource::Default,
            original: DEFAULT_SERVER_URL.to_string(),
        }
    }
}

/// URL validation error with user-friendly messages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddressError {
    /// Input was empty or whitespace-only
    EmptyInput,
    /// URL parsing failed
    InvalidUrl(String),
    /// No host was found in the URL
    MissingHost,
    /// Port could not be set (should not happen with valid hosts)
    InvalidPort(String),
    /// Unsupported URL scheme (only http/https allowed)
    UnsupportedScheme(String),
}

impl std::error::Error for AddressError {}

impl fmt::Display for AddressError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyInput => write!(f, "Address cannot be empty"),
            Self::InvalidUrl(e) => write!(f, "Invalid URL: {e}"),
            Self::MissingHost => write!(f, "URL must include a host"),
            Self::InvalidPort(e) => write!(f, "Invalid port: {e}"),
            Self::UnsupportedScheme(s) => write!(f, "Unsupported scheme '{s}' (use http or https)"),
        }
    }
}

/// Normalize a backend URL string.
///
/// This function handles common input formats and ensures the result
/// is a valid URL for the HTTP client:
///
/// - Adds `http://` scheme if missing
/// - Adds default port (8000) if missing
/// - Trims whitespace
/// - Normalizes scheme to lowercase
///
/// # Arguments
///
/// * `input` - The URL string to normalize
///
/// # Returns
///
/// A normalized [`Url`] or an [`AddressError`] if validation fails.
///
/// # Examples
///
/// ```
/// use cellscope_client::connection::normalize_url;
///
/// // Bare host:port
/// let url = normalize_url("192.168.1.100:8000")?;
/// assert_eq!(url.as_str(), "http://192.168.1.100:8000/");
///
/// // IPv6
/// let url = normalize_url("[::1]:8080")?;
/// assert_eq!(url.as_str(), "http://[::1]:8080/");
/// # Ok::<(), cellscope_client::connection::AddressError>(())
/// ```
pub fn normalize_url(input: &str) -> Result<Url, AddressError> {
    let input = input.trim();

    if input.is_empty() {
        return Err(AddressError::EmptyInput);
    }

    // Add scheme if missing
    let with_scheme = if input.contains("://") {
        input.to_string()
    } else {
        format!("http://{input}")
    };

    // Parse URL
    let mut url = Url::parse(&with_scheme).map_err(|e| AddressError::InvalidUrl(e.to_string()))?;

    // Validate scheme
    let scheme = url.scheme().to_lowercase();
    if scheme != "http" && scheme != "https" {
        return Err(AddressError::UnsupportedScheme(scheme));
    }

    // Validate host
    if url.host().is_none() {
        return Err(AddressError::MissingHost);
    }

    // Add default port if missing
    if url.port().is_none() {
        url.set_port(Some(DEFAULT_SERVER_PORT))
            .map_err(|()| AddressError::InvalidPort("Cannot set port on this URL".to_string()))?;
    }

    Ok(url)
}

/// Resolve the backend address from multiple sources with precedence.
///
/// Tries sources in order of priority (highest first):
/// 1. User input (if provided and valid)
/// 2. Persisted address (from previous session)
/// 3. `CELLSCOPE_SERVER_URL` environment variable
/// 4. Default: `http://127.0.0.1:8000`
///
/// # Arguments
///
/// * `user_input` - Optional user-typed address
/// * `persisted_addr` - Optional persisted address string from storage
///
/// # Returns
///
/// The resolved [`ServerAddress`] (never fails, falls back to default).
pub fn resolve_address(user_input: Option<&str>, persisted_addr: Option<&str>) -> ServerAddress {
    // 1. User input (highest priority)
    if let Some(input) = user_input {
        if !input.trim().is_empty() {
            if let Ok(addr) = ServerAddress::parse(input, AddressSource::UserInput) {
                return addr;
            }
        }
    }

    // 2. Persisted from previous session
    if let Some(persisted) = persisted_addr {
        if let Ok(addr) = ServerAddress::parse(persisted, AddressSource::Persisted) {
            return addr;
        }
    }

    // 3. Environment variable
    if let Ok(env_url) = std::env::var(SERVER_URL_ENV) {
        if let Ok(addr) = ServerAddress::parse(&env_url, AddressSource::Environment) {
            return addr;
        }
    }

    // 4. Default fallback
    ServerAddress::default()
}
