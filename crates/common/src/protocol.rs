//! JSON bodies exchanged with HTTP hosts of the engine.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Create endpoint
// ---------------------------------------------------------------------------

/// Successful response body for a create call: the identifier under which
/// the (encrypted) record was stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatedResponse {
    pub id: String,
}

// ---------------------------------------------------------------------------
// Error response
// ---------------------------------------------------------------------------

/// Standard error response body returned on any non-2xx status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Short machine-readable error code (e.g. `"bad_request"`).
    pub code: String,
    /// Human-readable description safe to expose to callers.
    pub message: String,
    /// Engine failure kind, when the error came from the crypto layer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

impl ErrorResponse {
    /// Construct an [`ErrorResponse`] from a code and message.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            kind: None,
        }
    }

    pub fn with_kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = Some(kind.into());
        self
    }
}

// ---------------------------------------------------------------------------
// Health check
// ---------------------------------------------------------------------------

/// Response body for `GET /health`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Overall service status: `"ok"` or `"degraded"`.
    pub status: String,
    /// Whether usable key material is loaded.
    pub keys_loaded: bool,
    /// Number of registered container strategies.
    pub strategies: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_response_omits_absent_kind() {
        let e = ErrorResponse::new("bad_request", "field is empty");
        let json = serde_json::to_value(&e).unwrap();
        assert_eq!(json["code"], "bad_request");
        assert!(json.get("kind").is_none());

        let e = e.with_kind("EmptyData");
        let json = serde_json::to_value(&e).unwrap();
        assert_eq!(json["kind"], "EmptyData");
    }

    #[test]
    fn health_response_serde() {
        let h = HealthResponse {
            status: "ok".into(),
            keys_loaded: true,
            strategies: 5,
        };
        let json = serde_json::to_string(&h).unwrap();
        let decoded: HealthResponse = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded.strategies, 5);
        assert!(decoded.keys_loaded);
    }

    #[test]
    fn created_response_shape() {
        let body: CreatedResponse = serde_json::from_str(r#"{"id":"abc"}"#).unwrap();
        assert_eq!(body, CreatedResponse { id: "abc".into() });
    }
}
