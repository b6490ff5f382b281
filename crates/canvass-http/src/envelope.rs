//! Server error-envelope decoding
//!
//! The backend reports failures in a handful of conventional JSON shapes:
//! `{"detail": "text"}`, `{"detail": {"message": "text"}}`,
//! `{"detail": [{"msg": "text"}, ...]}` (validation errors), or a bare
//! `{"message": "text"}`. Anything else falls back to a generic message
//! carrying the status code.

use reqwest::StatusCode;
use serde::Deserialize;

/// Known error-body shapes, tried in order by the untagged decode
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ErrorEnvelope {
    Detail { detail: Detail },
    Message { message: String },
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Detail {
    Text(String),
    Object { message: String },
    Items(Vec<DetailItem>),
}

#[derive(Debug, Deserialize)]
struct DetailItem {
    #[serde(default)]
    msg: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

impl ErrorEnvelope {
    fn into_message(self) -> Option<String> {
        match self {
            ErrorEnvelope::Detail { detail } => detail.into_message(),
            ErrorEnvelope::Message { message } => non_empty(message),
        }
    }
}

impl Detail {
    fn into_message(self) -> Option<String> {
        match self {
            Detail::Text(text) => non_empty(text),
            Detail::Object { message } => non_empty(message),
            Detail::Items(items) => items
                .into_iter()
                .next()
                .and_then(|item| item.msg.or(item.message))
                .and_then(non_empty),
        }
    }
}

fn non_empty(text: String) -> Option<String> {
    if text.trim().is_empty() {
        None
    } else {
        Some(text)
    }
}

/// Generic fallback for unrecognized error bodies
fn fallback(status: StatusCode) -> String {
    format!("request failed (status {})", status.as_u16())
}

/// Extract a user-presentable message from an error response body.
///
/// Empty and non-JSON bodies are tolerated; they produce the generic
/// fallback message for the given status.
pub fn extract_message(body: &str, status: StatusCode) -> String {
    serde_json::from_str::<ErrorEnvelope>(body)
        .ok()
        .and_then(ErrorEnvelope::into_message)
        .unwrap_or_else(|| fallback(status))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detail_string() {
        let msg = extract_message(r#"{"detail":"Y"}"#, StatusCode::BAD_REQUEST);
        assert_eq!(msg, "Y");
    }

    #[test]
    fn test_detail_object() {
        let msg = extract_message(
            r#"{"detail":{"message":"plan not found"}}"#,
            StatusCode::NOT_FOUND,
        );
        assert_eq!(msg, "plan not found");
    }

    #[test]
    fn test_detail_validation_list() {
        let msg = extract_message(
            r#"{"detail":[{"msg":"X"},{"msg":"second"}]}"#,
            StatusCode::UNPROCESSABLE_ENTITY,
        );
        assert_eq!(msg, "X");
    }

    #[test]
    fn test_detail_list_message_field() {
        let msg = extract_message(
            r#"{"detail":[{"message":"bad field"}]}"#,
            StatusCode::UNPROCESSABLE_ENTITY,
        );
        assert_eq!(msg, "bad field");
    }

    #[test]
    fn test_top_level_message() {
        let msg = extract_message(r#"{"message":"nope"}"#, StatusCode::FORBIDDEN);
        assert_eq!(msg, "nope");
    }

    #[test]
    fn test_unrecognized_shape_falls_back() {
        let msg = extract_message(r#"{"error":"odd"}"#, StatusCode::BAD_GATEWAY);
        assert_eq!(msg, "request failed (status 502)");
    }

    #[test]
    fn test_empty_body_falls_back() {
        let msg = extract_message("", StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(msg, "request failed (status 500)");
    }

    #[test]
    fn test_non_json_body_falls_back() {
        let msg = extract_message("<html>Bad Gateway</html>", StatusCode::BAD_GATEWAY);
        assert_eq!(msg, "request failed (status 502)");
    }

    #[test]
    fn test_empty_detail_list_falls_back() {
        let msg = extract_message(r#"{"detail":[]}"#, StatusCode::BAD_REQUEST);
        assert_eq!(msg, "request failed (status 400)");
    }
}
