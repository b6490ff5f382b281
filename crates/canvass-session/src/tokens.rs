//! Session token pair and authentication scheme

use serde::{Deserialize, Serialize};

/// Access/refresh token pair for an authenticated session.
///
/// Both tokens are opaque strings issued by the backend; the client never
/// inspects their contents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionTokens {
    /// Short-lived bearer credential sent on API calls
    pub access_token: String,

    /// Longer-lived credential used to obtain a new access token
    #[serde(default)]
    pub refresh_token: Option<String>,
}

impl SessionTokens {
    /// Create a token pair
    pub fn new(access_token: impl Into<String>, refresh_token: Option<String>) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token,
        }
    }

    /// Whether a usable refresh token is present
    pub fn has_refresh(&self) -> bool {
        self.refresh_token
            .as_deref()
            .is_some_and(|t| !t.trim().is_empty())
    }
}

/// How the current session authenticates against the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthScheme {
    /// Server-managed session cookie; the client never attaches bearer headers
    Cookie,

    /// Bearer token from the token store, attached as an `Authorization` header
    Bearer,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_has_refresh() {
        let with = SessionTokens::new("a", Some("r".to_string()));
        assert!(with.has_refresh());

        let without = SessionTokens::new("a", None);
        assert!(!without.has_refresh());

        let blank = SessionTokens::new("a", Some("   ".to_string()));
        assert!(!blank.has_refresh());
    }

    #[test]
    fn test_tokens_deserialize_without_refresh() {
        let tokens: SessionTokens = serde_json::from_str(r#"{"access_token":"abc"}"#).unwrap();
        assert_eq!(tokens.access_token, "abc");
        assert_eq!(tokens.refresh_token, None);
    }

    #[test]
    fn test_auth_scheme_serde() {
        assert_eq!(
            serde_json::to_string(&AuthScheme::Cookie).unwrap(),
            r#""cookie""#
        );
        let scheme: AuthScheme = serde_json::from_str(r#""bearer""#).unwrap();
        assert_eq!(scheme, AuthScheme::Bearer);
    }
}
