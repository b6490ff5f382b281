//! Session credentials for the Canvass dashboard API
//!
//! Holds the access/refresh token pair used by `canvass-http` and the
//! pluggable `TokenStore` the refresh flow reads and writes.
//!
//! ## Features
//!
//! - **Trait-based storage**: swap the backing store without touching the client
//! - **File-backed store**: JSON credentials file for the legacy persisted-token mode
//! - **In-memory store**: zero-setup backend for tests and cookie-only sessions

pub mod error;
pub mod store;
pub mod tokens;

pub use error::{Result, StoreError};
pub use store::{FileTokenStore, MemoryTokenStore, TokenStore};
pub use tokens::{AuthScheme, SessionTokens};
