//! Client library for the CellScope imaging service.
//!
//! This crate provides the resilience layer a viewer frontend needs to talk
//! to a CellScope backend: token-based authentication with proactive renewal,
//! an authorized request path that retries exactly once on 401, and a polling
//! loop that surfaces new frames and connection health to its observer. It is
//! UI-agnostic and can be used by desktop frontends, CLI tools, and test
//! harnesses.

pub mod auth;
pub mod client;
pub mod connection;
pub mod error;
pub mod poll;
pub mod types;

pub use auth::{AuthManager, Credentials, Session};
pub use client::{ApiClient, ClientConfig, HttpConfig};
pub use connection::{
    normalize_url, resolve_address, AddressError, AddressSource, ServerAddress,
    DEFAULT_SERVER_PORT, DEFAULT_SERVER_URL, SERVER_URL_ENV,
};
pub use error::{AuthError, RequestError};
pub use poll::{ConnectionState, FramePoller, PollConfig, PollObserver};
pub use types::{Frame, InferenceResult};
