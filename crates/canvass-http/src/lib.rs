//! Authenticated HTTP client for the Canvass dashboard API
//!
//! Wraps outbound calls to the campaign-platform REST backend with
//! credential attachment, CSRF header injection, transport-error
//! classification, and a one-shot token-refresh-and-retry on 401.
//!
//! ## Features
//!
//! - **Configurable base address**: env override, dev-proxy origin, or
//!   alternate-port fallback
//! - **Bearer normalization**: malformed `Authorization` values are cleaned
//!   or dropped, never sent
//! - **Single refresh-retry**: an expired access token triggers at most one
//!   refresh and one re-issue of the original request
//! - **Swappable token storage**: via `canvass_session::TokenStore`
//! - **Testing support**: easy mocking with wiremock

pub mod auth;
pub mod client;
pub mod config;
pub mod envelope;
pub mod error;
pub mod refresh;

pub use client::{ApiClient, RequestOptions, ResponseBody};
pub use config::{ApiConfig, BASE_URL_ENV};
pub use error::{ApiError, Result};

/// Re-export commonly used types
pub use canvass_session::{AuthScheme, SessionTokens, TokenStore};
pub use reqwest::{header, Method, StatusCode};
