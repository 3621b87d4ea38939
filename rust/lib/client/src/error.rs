// ── Error codes ─────────────────────────────────────────────────────
//
// Stable, machine-readable identifiers. Views match on these, never on the
// human-readable message.

/// Stable error code constants.
pub mod error_code {
    pub const NETWORK: &str = "NETWORK";
    pub const UNAUTHENTICATED: &str = "UNAUTHENTICATED";
    pub const NOT_FOUND: &str = "NOT_FOUND";
    pub const VALIDATION_FAILED: &str = "VALIDATION_FAILED";
    pub const SERVER: &str = "SERVER";
    pub const DECODE: &str = "DECODE";
}

// ── ApiError ────────────────────────────────────────────────────────

/// Client-side API error.
///
/// Every remote call resolves to exactly one of these. Nothing here is
/// retried by the client.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ApiError {
    /// Transport failure, no HTTP response.
    #[error("network: {0}")]
    Network(String),

    /// Missing, expired or rejected credential (401).
    #[error("auth: {0}")]
    Auth(String),

    /// Target entity does not exist server-side (404).
    #[error("not found: {0}")]
    NotFound(String),

    /// Malformed input rejected by the server (400/422).
    #[error("validation: {message}")]
    Validation {
        field: Option<String>,
        message: String,
    },

    /// Any other non-2xx response.
    #[error("HTTP {status}: {message}")]
    Server { status: u16, message: String },

    /// The response body did not match the expected schema.
    #[error("decode: {0}")]
    Decode(String),
}

/// How a view should present an error to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Surface {
    /// Non-blocking notice; the current snapshot stays on screen.
    Notice,
    /// Send the user back to the login entry point.
    Relogin,
    /// Explicit failure message.
    Message,
    /// Show next to the named input field.
    Inline { field: String },
    /// Generic failure notice.
    Generic,
}

impl ApiError {
    /// Build the error for a non-2xx response.
    ///
    /// The body is inspected for `{"error": ...}`, `{"message": ...}` and an
    /// optional `{"field": ...}`; anything else is kept verbatim.
    pub fn from_status(status: u16, body: &str) -> Self {
        let parsed: Option<serde_json::Value> = serde_json::from_str(body).ok();
        let message = parsed
            .as_ref()
            .and_then(|v| v.get("error").or_else(|| v.get("message")))
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .unwrap_or_else(|| body.trim().to_string());
        let field = parsed
            .as_ref()
            .and_then(|v| v.get("field"))
            .and_then(|v| v.as_str())
            .map(str::to_string);

        match status {
            401 => ApiError::Auth(message),
            404 => ApiError::NotFound(message),
            400 | 422 => ApiError::Validation { field, message },
            _ => ApiError::Server { status, message },
        }
    }

    /// Validation error tied to one input field.
    pub fn invalid_field(field: &str, message: impl Into<String>) -> Self {
        ApiError::Validation {
            field: Some(field.to_string()),
            message: message.into(),
        }
    }

    /// Stable, machine-readable error code.
    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::Network(_) => error_code::NETWORK,
            ApiError::Auth(_) => error_code::UNAUTHENTICATED,
            ApiError::NotFound(_) => error_code::NOT_FOUND,
            ApiError::Validation { .. } => error_code::VALIDATION_FAILED,
            ApiError::Server { .. } => error_code::SERVER,
            ApiError::Decode(_) => error_code::DECODE,
        }
    }

    pub fn surface(&self) -> Surface {
        match self {
            ApiError::Network(_) => Surface::Notice,
            ApiError::Auth(_) => Surface::Relogin,
            ApiError::NotFound(_) => Surface::Message,
            ApiError::Validation { field: Some(f), .. } => Surface::Inline { field: f.clone() },
            ApiError::Validation { field: None, .. } => Surface::Message,
            ApiError::Server { .. } | ApiError::Decode(_) => Surface::Generic,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ApiError::NotFound(_))
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            ApiError::Decode(e.to_string())
        } else {
            ApiError::Network(e.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping() {
        assert!(matches!(ApiError::from_status(401, ""), ApiError::Auth(_)));
        assert!(matches!(ApiError::from_status(404, ""), ApiError::NotFound(_)));
        assert!(matches!(ApiError::from_status(400, ""), ApiError::Validation { .. }));
        assert!(matches!(ApiError::from_status(422, ""), ApiError::Validation { .. }));
        assert!(matches!(
            ApiError::from_status(500, ""),
            ApiError::Server { status: 500, .. }
        ));
        assert!(matches!(
            ApiError::from_status(409, ""),
            ApiError::Server { status: 409, .. }
        ));
    }

    #[test]
    fn message_taken_from_json_body() {
        let err = ApiError::from_status(404, r#"{"error":"Board not found"}"#);
        assert_eq!(err, ApiError::NotFound("Board not found".into()));

        let err = ApiError::from_status(500, r#"{"code":"INTERNAL","message":"db down"}"#);
        assert_eq!(
            err,
            ApiError::Server {
                status: 500,
                message: "db down".into()
            }
        );
    }

    #[test]
    fn plain_text_body_kept() {
        let err = ApiError::from_status(502, "Bad Gateway\n");
        assert_eq!(err.to_string(), "HTTP 502: Bad Gateway");
    }

    #[test]
    fn validation_field_is_inline() {
        let err = ApiError::from_status(400, r#"{"error":"invalid email","field":"email"}"#);
        assert_eq!(
            err.surface(),
            Surface::Inline {
                field: "email".into()
            }
        );
        assert_eq!(err.error_code(), "VALIDATION_FAILED");
    }

    #[test]
    fn surface_mapping() {
        assert_eq!(ApiError::Network("x".into()).surface(), Surface::Notice);
        assert_eq!(ApiError::Auth("x".into()).surface(), Surface::Relogin);
        assert_eq!(ApiError::NotFound("x".into()).surface(), Surface::Message);
        assert_eq!(ApiError::Decode("x".into()).surface(), Surface::Generic);
        assert_eq!(
            ApiError::Server {
                status: 503,
                message: "x".into()
            }
            .surface(),
            Surface::Generic
        );
    }
}
