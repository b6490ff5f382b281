//! Authenticated API client

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use canvass_session::{AuthScheme, SessionTokens, TokenStore};
use reqwest::cookie::Jar;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Method, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{debug, warn};
use url::Url;

use crate::auth::{cookie_value, normalize_bearer};
use crate::config::ApiConfig;
use crate::envelope::extract_message;
use crate::error::{ApiError, Result};
use crate::refresh::refresh_session;

/// Per-request options: method (default GET), extra headers, JSON body.
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    method: Option<Method>,
    headers: Vec<(String, String)>,
    body: Option<Value>,
}

impl RequestOptions {
    /// Create empty options (a plain GET)
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the HTTP method
    pub fn method(mut self, method: Method) -> Self {
        self.method = Some(method);
        self
    }

    /// Add a header; names are matched case-insensitively
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Set a JSON body
    pub fn json(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }
}

/// Successful response body, dispatched on the response's content type
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseBody {
    /// The response declared a JSON content type
    Json(Value),
    /// Anything else, returned as raw text
    Text(String),
}

/// Outcome of the single refresh attempt a 401 is allowed
enum RefreshOutcome {
    /// Session renewed; carries the new tokens when the backend returned
    /// them (a raced cookie-mode refresh may not)
    Renewed(Option<SessionTokens>),
    /// No refresh path available, the session is terminally expired
    Unavailable,
}

/// Authenticated client for the dashboard REST backend.
///
/// Every call attaches credentials for the configured [`AuthScheme`],
/// injects the CSRF header on state-changing methods, and recovers exactly
/// once from an expired access token by refreshing and re-issuing the
/// original request. All failures surface as a single [`ApiError`] whose
/// message is ready to show to the user.
pub struct ApiClient {
    http: reqwest::Client,
    jar: Arc<Jar>,
    base: Url,
    refresh_url: Url,
    csrf_header: HeaderName,
    config: ApiConfig,
    scheme: AuthScheme,
    store: Arc<dyn TokenStore>,
    refresh_gate: Mutex<()>,
    refresh_epoch: AtomicU64,
}

impl ApiClient {
    /// Create a client. The base address is resolved once, here.
    pub fn new(config: ApiConfig, scheme: AuthScheme, store: Arc<dyn TokenStore>) -> Result<Self> {
        let base = config.resolve_base_url()?;
        let refresh_url = base
            .join(&config.refresh_path)
            .map_err(|e| ApiError::InvalidPath(format!("{}: {e}", config.refresh_path)))?;
        let csrf_header = HeaderName::from_bytes(config.csrf_header.as_bytes()).map_err(|e| {
            ApiError::InvalidHeader {
                name: config.csrf_header.clone(),
                reason: e.to_string(),
            }
        })?;

        let jar = Arc::new(Jar::default());
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .user_agent(&config.user_agent)
            .cookie_provider(jar.clone())
            .build()
            .map_err(|e| ApiError::Build(e.to_string()))?;

        Ok(Self {
            http,
            jar,
            base,
            refresh_url,
            csrf_header,
            config,
            scheme,
            store,
            refresh_gate: Mutex::new(()),
            refresh_epoch: AtomicU64::new(0),
        })
    }

    /// Resolved base address
    pub fn base_url(&self) -> &Url {
        &self.base
    }

    /// Perform a call and decode the JSON response body as `T`
    pub async fn request<T: DeserializeOwned>(
        &self,
        path: &str,
        options: RequestOptions,
    ) -> Result<T> {
        let response = self.execute(path, &options).await?;
        let body = response.text().await.map_err(|e| self.connectivity(e))?;
        Ok(serde_json::from_str(&body)?)
    }

    /// Perform a call and return the body as parsed JSON or raw text,
    /// dispatched on the response's content type
    pub async fn request_body(&self, path: &str, options: RequestOptions) -> Result<ResponseBody> {
        let response = self.execute(path, &options).await?;
        let json = is_json(&response);
        let body = response.text().await.map_err(|e| self.connectivity(e))?;
        if json {
            Ok(ResponseBody::Json(serde_json::from_str(&body)?))
        } else {
            Ok(ResponseBody::Text(body))
        }
    }

    /// Perform a call and return the raw text body
    pub async fn request_text(&self, path: &str, options: RequestOptions) -> Result<String> {
        let response = self.execute(path, &options).await?;
        response.text().await.map_err(|e| self.connectivity(e))
    }

    /// Perform a call and return the raw byte payload, for file and
    /// export downloads. Same refresh semantics as every other call.
    pub async fn request_bytes(&self, path: &str, options: RequestOptions) -> Result<Vec<u8>> {
        let response = self.execute(path, &options).await?;
        let bytes = response.bytes().await.map_err(|e| self.connectivity(e))?;
        Ok(bytes.to_vec())
    }

    /// GET a JSON resource
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.request(path, RequestOptions::new()).await
    }

    /// POST a JSON body and decode the JSON response
    pub async fn post_json<T: DeserializeOwned>(
        &self,
        path: &str,
        body: &impl Serialize,
    ) -> Result<T> {
        let value = serde_json::to_value(body)?;
        self.request(path, RequestOptions::new().method(Method::POST).json(value))
            .await
    }

    /// PUT a JSON body and decode the JSON response
    pub async fn put_json<T: DeserializeOwned>(
        &self,
        path: &str,
        body: &impl Serialize,
    ) -> Result<T> {
        let value = serde_json::to_value(body)?;
        self.request(path, RequestOptions::new().method(Method::PUT).json(value))
            .await
    }

    /// PATCH a JSON body and decode the JSON response
    pub async fn patch_json<T: DeserializeOwned>(
        &self,
        path: &str,
        body: &impl Serialize,
    ) -> Result<T> {
        let value = serde_json::to_value(body)?;
        self.request(path, RequestOptions::new().method(Method::PATCH).json(value))
            .await
    }

    /// DELETE a resource, discarding the response body
    pub async fn delete(&self, path: &str) -> Result<()> {
        self.execute(path, &RequestOptions::new().method(Method::DELETE))
            .await?;
        Ok(())
    }

    /// Send the request, recovering at most once from a 401 via token
    /// refresh. The retry is a straight-line second send, never a
    /// re-entrant call, so the one-retry bound is structural.
    async fn execute(&self, path: &str, options: &RequestOptions) -> Result<Response> {
        let url = self.resolve_path(path)?;
        let method = options.method.clone().unwrap_or(Method::GET);
        let mut headers = self.prepare_headers(&method, &url, &options.headers)?;
        let sent_bearer = headers.contains_key(AUTHORIZATION);

        // Snapshot before sending so a refresh completed by a concurrent
        // request while ours was in flight is detected in refresh_once.
        let epoch = self.refresh_epoch.load(Ordering::Acquire);

        debug!(%method, %url, "sending request");
        let response = self
            .send(&method, &url, headers.clone(), options.body.as_ref())
            .await?;

        if response.status() != StatusCode::UNAUTHORIZED || self.is_auth_path(&url) {
            return self.finish(response).await;
        }

        warn!(%url, "access token rejected, attempting refresh");
        match self.refresh_once(epoch).await? {
            RefreshOutcome::Renewed(tokens) => {
                // Header-authenticated calls get the new bearer token; a
                // cookie session retries unchanged since the refresh
                // already updated the jar.
                if sent_bearer {
                    if let Some(tokens) = &tokens {
                        headers.insert(
                            AUTHORIZATION,
                            header_value("authorization", &format!("Bearer {}", tokens.access_token))?,
                        );
                    }
                }
                debug!(%method, %url, "re-issuing request after refresh");
                let retried = self
                    .send(&method, &url, headers, options.body.as_ref())
                    .await?;
                self.finish(retried).await
            }
            RefreshOutcome::Unavailable => {
                if sent_bearer {
                    self.store.clear()?;
                }
                Err(ApiError::SessionExpired)
            }
        }
    }

    /// Refresh the session at most once, de-duplicating concurrent
    /// attempts behind a single gate.
    async fn refresh_once(&self, observed_epoch: u64) -> Result<RefreshOutcome> {
        let _gate = self.refresh_gate.lock().await;

        // Lost the race: another request already refreshed. Reuse its
        // result instead of spending a second refresh call.
        if self.refresh_epoch.load(Ordering::Acquire) != observed_epoch {
            return Ok(RefreshOutcome::Renewed(self.store.read()?));
        }

        match refresh_session(&self.http, &self.refresh_url, self.store.as_ref()).await? {
            Some(tokens) => {
                self.refresh_epoch.fetch_add(1, Ordering::AcqRel);
                Ok(RefreshOutcome::Renewed(Some(tokens)))
            }
            None => Ok(RefreshOutcome::Unavailable),
        }
    }

    async fn send(
        &self,
        method: &Method,
        url: &Url,
        headers: HeaderMap,
        body: Option<&Value>,
    ) -> Result<Response> {
        let mut request = self.http.request(method.clone(), url.clone()).headers(headers);
        if let Some(body) = body {
            request = request.json(body);
        }
        request.send().await.map_err(|e| self.connectivity(e))
    }

    /// Map a success status to the response and everything else to a
    /// `Status` error with the extracted server message.
    async fn finish(&self, response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(ApiError::Status {
            status,
            message: extract_message(&body, status),
        })
    }

    fn prepare_headers(
        &self,
        method: &Method,
        url: &Url,
        extra: &[(String, String)],
    ) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();

        for (name, value) in extra {
            // A malformed Authorization value fails at the transport
            // layer before the request is sent, so it is normalized or
            // dropped, never forwarded as-is.
            if name.eq_ignore_ascii_case("authorization") {
                match normalize_bearer(value) {
                    Some(clean) => {
                        headers.insert(AUTHORIZATION, header_value(name, &clean)?);
                    }
                    None => debug!("dropping unusable authorization header"),
                }
                continue;
            }

            let parsed = HeaderName::from_bytes(name.as_bytes()).map_err(|e| {
                ApiError::InvalidHeader {
                    name: name.clone(),
                    reason: e.to_string(),
                }
            })?;
            headers.insert(parsed, header_value(name, value)?);
        }

        if self.scheme == AuthScheme::Bearer && !headers.contains_key(AUTHORIZATION) {
            if let Some(tokens) = self.store.read()? {
                if let Some(clean) = normalize_bearer(&tokens.access_token) {
                    headers.insert(AUTHORIZATION, header_value("authorization", &clean)?);
                }
            }
        }

        if is_state_changing(method) && !headers.contains_key(&self.csrf_header) {
            if let Some(token) = cookie_value(&self.jar, url, &self.config.csrf_cookie) {
                headers.insert(self.csrf_header.clone(), header_value("csrf", &token)?);
            }
        }

        Ok(headers)
    }

    fn resolve_path(&self, path: &str) -> Result<Url> {
        if path.starts_with("http://") || path.starts_with("https://") {
            return Url::parse(path).map_err(|e| ApiError::InvalidPath(format!("{path}: {e}")));
        }
        self.base
            .join(path)
            .map_err(|e| ApiError::InvalidPath(format!("{path}: {e}")))
    }

    /// 401s on login/refresh endpoints are real failures, never
    /// refresh-eligible.
    fn is_auth_path(&self, url: &Url) -> bool {
        url.path().starts_with(&self.config.auth_prefix)
    }

    fn connectivity(&self, e: reqwest::Error) -> ApiError {
        let mut detail = e.to_string();
        if let Some(origin) = &self.config.origin {
            detail = format!("{detail} (dashboard origin {origin})");
        }
        ApiError::Connectivity {
            url: self.base.to_string(),
            detail,
        }
    }
}

fn header_value(name: &str, value: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(value).map_err(|e| ApiError::InvalidHeader {
        name: name.to_string(),
        reason: e.to_string(),
    })
}

fn is_state_changing(method: &Method) -> bool {
    matches!(method.as_str(), "POST" | "PUT" | "PATCH" | "DELETE")
}

fn is_json(response: &Response) -> bool {
    response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|ct| ct.contains("application/json"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use canvass_session::MemoryTokenStore;

    fn client() -> ApiClient {
        ApiClient::new(
            ApiConfig::new().with_base_url("http://127.0.0.1:8000"),
            AuthScheme::Cookie,
            Arc::new(MemoryTokenStore::new()),
        )
        .unwrap()
    }

    #[test]
    fn test_state_changing_methods() {
        assert!(is_state_changing(&Method::POST));
        assert!(is_state_changing(&Method::PUT));
        assert!(is_state_changing(&Method::PATCH));
        assert!(is_state_changing(&Method::DELETE));
        assert!(!is_state_changing(&Method::GET));
        assert!(!is_state_changing(&Method::HEAD));
    }

    #[test]
    fn test_relative_path_joins_base() {
        let client = client();
        let url = client.resolve_path("/api/candidates").unwrap();
        assert_eq!(url.as_str(), "http://127.0.0.1:8000/api/candidates");
    }

    #[test]
    fn test_absolute_url_passes_through() {
        let client = client();
        let url = client.resolve_path("https://elsewhere.example/x").unwrap();
        assert_eq!(url.as_str(), "https://elsewhere.example/x");
    }

    #[test]
    fn test_auth_paths_detected() {
        let client = client();
        let login = client.resolve_path("/api/auth/login").unwrap();
        let refresh = client.resolve_path("/api/auth/refresh").unwrap();
        let other = client.resolve_path("/api/candidates").unwrap();
        assert!(client.is_auth_path(&login));
        assert!(client.is_auth_path(&refresh));
        assert!(!client.is_auth_path(&other));
    }

    #[test]
    fn test_bearer_scheme_attaches_stored_token() {
        let store = Arc::new(MemoryTokenStore::with_tokens(SessionTokens::new(
            "tok-1", None,
        )));
        let client = ApiClient::new(
            ApiConfig::new().with_base_url("http://127.0.0.1:8000"),
            AuthScheme::Bearer,
            store,
        )
        .unwrap();

        let url = client.resolve_path("/api/candidates").unwrap();
        let headers = client.prepare_headers(&Method::GET, &url, &[]).unwrap();
        assert_eq!(headers.get(AUTHORIZATION).unwrap(), "Bearer tok-1");
    }

    #[test]
    fn test_caller_authorization_is_normalized() {
        let client = client();
        let url = client.resolve_path("/api/candidates").unwrap();
        let extra = vec![("Authorization".to_string(), "  tok-2\n".to_string())];
        let headers = client.prepare_headers(&Method::GET, &url, &extra).unwrap();
        assert_eq!(headers.get(AUTHORIZATION).unwrap(), "Bearer tok-2");
    }

    #[test]
    fn test_unusable_authorization_is_dropped() {
        let client = client();
        let url = client.resolve_path("/api/candidates").unwrap();
        let extra = vec![("Authorization".to_string(), "Bearer \n".to_string())];
        let headers = client.prepare_headers(&Method::GET, &url, &extra).unwrap();
        assert!(headers.get(AUTHORIZATION).is_none());
    }
}
