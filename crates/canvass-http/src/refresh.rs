//! Token refresh against the auth endpoint
//!
//! Cookie-based refresh is preferred: the shared jar carries the session
//! and the body is an empty JSON object. When that yields no token the
//! legacy flow posts the refresh token persisted in the store. Neither
//! path working is a terminal session failure for the caller.

use canvass_session::{SessionTokens, TokenStore};
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, warn};
use url::Url;

use crate::error::Result;

/// Wire shape of a successful refresh response
#[derive(Debug, Deserialize)]
struct RefreshResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
}

/// Attempt one token refresh. `Ok(None)` means no refresh is available and
/// the session is terminally expired.
pub(crate) async fn refresh_session(
    http: &Client,
    refresh_url: &Url,
    store: &dyn TokenStore,
) -> Result<Option<SessionTokens>> {
    if let Some(tokens) = cookie_refresh(http, refresh_url, store).await? {
        return Ok(Some(tokens));
    }
    legacy_refresh(http, refresh_url, store).await
}

async fn cookie_refresh(
    http: &Client,
    refresh_url: &Url,
    store: &dyn TokenStore,
) -> Result<Option<SessionTokens>> {
    let response = match http.post(refresh_url.clone()).json(&json!({})).send().await {
        Ok(response) => response,
        Err(e) => {
            warn!("cookie refresh transport failure: {e}");
            return Ok(None);
        }
    };

    if !response.status().is_success() {
        debug!(status = %response.status(), "cookie refresh rejected");
        return Ok(None);
    }

    let body: RefreshResponse = match response.json().await {
        Ok(body) => body,
        Err(e) => {
            debug!("cookie refresh body undecodable: {e}");
            return Ok(None);
        }
    };

    if body.access_token.trim().is_empty() {
        debug!("cookie refresh returned no access token");
        return Ok(None);
    }

    let tokens = SessionTokens::new(body.access_token, body.refresh_token);

    // Mirror into the store only when a legacy persisted pair already
    // exists; a pure cookie session never writes local state.
    if store.read()?.is_some_and(|stored| stored.has_refresh()) {
        store.write(&tokens)?;
    }

    debug!("cookie-based token refresh succeeded");
    Ok(Some(tokens))
}

async fn legacy_refresh(
    http: &Client,
    refresh_url: &Url,
    store: &dyn TokenStore,
) -> Result<Option<SessionTokens>> {
    let Some(refresh_token) = store
        .read()?
        .and_then(|stored| stored.refresh_token)
        .filter(|token| !token.trim().is_empty())
    else {
        debug!("no stored refresh token, session is not refreshable");
        return Ok(None);
    };

    let response = match http
        .post(refresh_url.clone())
        .json(&json!({ "refresh_token": refresh_token }))
        .send()
        .await
    {
        Ok(response) => response,
        Err(e) => {
            warn!("legacy refresh transport failure: {e}");
            return Ok(None);
        }
    };

    if !response.status().is_success() {
        debug!(status = %response.status(), "legacy refresh rejected");
        return Ok(None);
    }

    let body: RefreshResponse = match response.json().await {
        Ok(body) => body,
        Err(e) => {
            debug!("legacy refresh body undecodable: {e}");
            return Ok(None);
        }
    };

    if body.access_token.trim().is_empty() {
        return Ok(None);
    }

    // The server may rotate the refresh token; keep the old one when it
    // does not.
    let tokens = SessionTokens::new(
        body.access_token,
        body.refresh_token.or(Some(refresh_token)),
    );
    store.write(&tokens)?;

    debug!("legacy token refresh succeeded");
    Ok(Some(tokens))
}
