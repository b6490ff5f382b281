//! Authorization-header normalization and CSRF cookie lookup

use std::sync::Arc;

use reqwest::cookie::{CookieStore, Jar};
use url::Url;

/// Normalize a raw `Authorization` value into a clean `Bearer <token>` form.
///
/// Control characters are turned into whitespace, a missing or oddly-cased
/// `Bearer` prefix is tolerated, and stray whitespace is trimmed. Returns
/// `None` when no token-like substring remains; the caller must then drop
/// the header entirely, since a malformed `Authorization` value fails at
/// the transport layer before the request is ever sent.
pub fn normalize_bearer(raw: &str) -> Option<String> {
    let cleaned: String = raw
        .chars()
        .map(|c| if c.is_control() { ' ' } else { c })
        .collect();

    let mut parts = cleaned.split_whitespace();
    let first = parts.next()?;
    let token = if first.eq_ignore_ascii_case("bearer") {
        parts.next()?
    } else {
        first
    };

    Some(format!("Bearer {token}"))
}

/// Read a named cookie's value out of the shared jar for the given URL
pub(crate) fn cookie_value(jar: &Arc<Jar>, url: &Url, name: &str) -> Option<String> {
    let header = jar.cookies(url)?;
    let raw = header.to_str().ok()?;
    raw.split(';').map(str::trim).find_map(|pair| {
        let (key, value) = pair.split_once('=')?;
        (key == name).then(|| value.to_string())
    })
}
