//! Shared handling of Google REST error bodies.
//!
//! Both Identity Toolkit and Firestore answer failures with
//! `{"error": {"code": 400, "message": "...", "status": "..."}}`. Identity
//! Toolkit puts its code at the front of `message`, optionally followed by
//! ` : ` and a detail (`WEAK_PASSWORD : Password should be at least 6
//! characters`); Firestore puts it in `status`.

use serde::Deserialize;

use crate::error::{SyncError, SyncResult};

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: Option<String>,
}

/// Splits `CODE : detail` into its parts.
///
/// A message made only of upper-case letters, digits and underscores is a
/// bare code and is returned as both code and message.
pub fn split_code(message: &str) -> (Option<String>, String) {
    if let Some((code, detail)) = message.split_once(" : ") {
        if is_code(code) {
            return (Some(code.to_string()), detail.trim().to_string());
        }
    }
    if is_code(message) {
        return (Some(message.to_string()), message.to_string());
    }
    (None, message.to_string())
}

fn is_code(s: &str) -> bool {
    !s.is_empty()
        && s.chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_')
}

/// Builds the error for a failed response body.
pub fn parse_error(status: u16, body: &str) -> SyncError {
    match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(envelope) => {
            let (code, message) = split_code(&envelope.error.message);
            SyncError::Http {
                status,
                code: code.or(envelope.error.status),
                message,
            }
        }
        Err(_) => SyncError::Http {
            status,
            code: None,
            message: if body.trim().is_empty() {
                format!("HTTP {}", status)
            } else {
                body.trim().to_string()
            },
        },
    }
}

/// Passes successful responses through and turns the rest into errors.
pub async fn check(response: reqwest::Response) -> SyncResult<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(parse_error(status.as_u16(), &body))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_code() {
        assert_eq!(
            split_code("WEAK_PASSWORD : Password should be at least 6 characters"),
            (
                Some("WEAK_PASSWORD".to_string()),
                "Password should be at least 6 characters".to_string()
            )
        );
        assert_eq!(
            split_code("EMAIL_EXISTS"),
            (Some("EMAIL_EXISTS".to_string()), "EMAIL_EXISTS".to_string())
        );
        assert_eq!(split_code("Missing or insufficient permissions.").0, None);
    }

    #[test]
    fn test_parse_identity_toolkit_error() {
        let body = r#"{"error":{"code":400,"message":"INVALID_PASSWORD","errors":[]}}"#;
        match parse_error(400, body) {
            SyncError::Http { status, code, .. } => {
                assert_eq!(status, 400);
                assert_eq!(code.as_deref(), Some("INVALID_PASSWORD"));
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_parse_firestore_error_uses_status() {
        let body = r#"{"error":{"code":403,"message":"Missing or insufficient permissions.","status":"PERMISSION_DENIED"}}"#;
        let err = parse_error(403, body);
        assert_eq!(err.code(), Some("PERMISSION_DENIED"));
        assert!(err.to_string().contains("insufficient permissions"));
    }

    #[test]
    fn test_parse_non_json_body() {
        let err = parse_error(502, "Bad Gateway");
        assert_eq!(err.code(), None);
        assert!(err.to_string().contains("Bad Gateway"));

        assert!(parse_error(500, "").to_string().contains("HTTP 500"));
    }
}
