//! Classified API errors.
//!
//! Every terminal failure of a logical operation surfaces as one
//! [`ApiError`], carrying enough context (status, request id, message,
//! structured validation details, retry-after hint) for the caller to decide
//! remediation or file a support report. Classification is total: any status
//! and any body shape produce an error value, never a panic or a secondary
//! failure.

use std::time::Duration;

use http::{HeaderMap, StatusCode};
use serde_json::Value;
use thiserror::Error;

use hny_transport::{parse_retry_after, HttpError};

/// Request-correlation header names, most specific first.
const REQUEST_ID_HEADERS: [&str; 2] = ["x-honeycomb-request-id", "x-request-id"];

/// One field-level validation failure from a 422 response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldViolation {
    /// Field path, e.g. `"name"` or `"query.time_range"`
    pub field: String,
    /// Human-readable description of the violation
    pub message: String,
}

/// Error type for API operations.
#[derive(Error, Debug, Clone)]
#[non_exhaustive]
pub enum ApiError {
    /// Authentication failed (401): missing, malformed or revoked key.
    #[error("authentication failed: {message}")]
    Auth {
        message: String,
        request_id: Option<String>,
    },

    /// Authenticated but not allowed (403).
    #[error("forbidden: {message}")]
    Forbidden {
        message: String,
        request_id: Option<String>,
    },

    /// Resource does not exist (404).
    #[error("not found: {message}")]
    NotFound {
        message: String,
        request_id: Option<String>,
    },

    /// The server rejected the request body (422); `details` carries
    /// field-level violations when the body exposed them.
    #[error("validation failed: {message}")]
    Validation {
        message: String,
        request_id: Option<String>,
        details: Vec<FieldViolation>,
    },

    /// Rate limited (429). `retry_after` is the server's wait hint, absent
    /// when the response carried none.
    #[error("rate limit exceeded: {message}")]
    RateLimit {
        message: String,
        request_id: Option<String>,
        retry_after: Option<Duration>,
    },

    /// Server-side failure (5xx and anything unclassified).
    #[error("server error (status {status}): {message}")]
    Server {
        message: String,
        status: u16,
        request_id: Option<String>,
    },

    /// An attempt (or the whole operation) timed out before a response.
    #[error("request timed out: {message}")]
    Timeout { message: String },

    /// Connection-level failure: DNS, refused, reset, TLS.
    #[error("connection failed: {message}")]
    Connection { message: String },

    /// The caller cancelled the operation between attempts.
    #[error("operation cancelled")]
    Cancelled,

    /// A 2xx response carried a body this client could not decode.
    #[error("invalid response body: {message}")]
    InvalidResponse { message: String },

    /// Local precondition failed before any request was sent
    /// (range-checked fields, unresolved query specs).
    #[error("invalid request: {message}")]
    InvalidRequest { message: String },
}

impl ApiError {
    /// HTTP status associated with this error, absent for failures that
    /// never produced a response.
    #[must_use]
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Auth { .. } => Some(401),
            Self::Forbidden { .. } => Some(403),
            Self::NotFound { .. } => Some(404),
            Self::Validation { .. } => Some(422),
            Self::RateLimit { .. } => Some(429),
            Self::Server { status, .. } => Some(*status),
            Self::Timeout { .. }
            | Self::Connection { .. }
            | Self::Cancelled
            | Self::InvalidResponse { .. }
            | Self::InvalidRequest { .. } => None,
        }
    }

    /// Request-correlation identifier, when the response carried one.
    #[must_use]
    pub fn request_id(&self) -> Option<&str> {
        match self {
            Self::Auth { request_id, .. }
            | Self::Forbidden { request_id, .. }
            | Self::NotFound { request_id, .. }
            | Self::Validation { request_id, .. }
            | Self::RateLimit { request_id, .. }
            | Self::Server { request_id, .. } => request_id.as_deref(),
            Self::Timeout { .. }
            | Self::Connection { .. }
            | Self::Cancelled
            | Self::InvalidResponse { .. }
            | Self::InvalidRequest { .. } => None,
        }
    }

    /// Server-provided wait hint for rate-limited requests.
    #[must_use]
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::RateLimit { retry_after, .. } => *retry_after,
            _ => None,
        }
    }

    /// Field-level details of a validation failure.
    #[must_use]
    pub fn validation_details(&self) -> &[FieldViolation] {
        match self {
            Self::Validation { details, .. } => details,
            _ => &[],
        }
    }

    /// Whether retrying the same operation later could succeed.
    #[must_use]
    pub fn is_retriable(&self) -> bool {
        matches!(
            self,
            Self::RateLimit { .. } | Self::Server { .. } | Self::Timeout { .. } | Self::Connection { .. }
        )
    }
}

impl From<HttpError> for ApiError {
    fn from(err: HttpError) -> Self {
        match err {
            HttpError::Timeout(d) => Self::Timeout {
                message: format!("attempt timed out after {d:?}"),
            },
            HttpError::DeadlineExceeded(d) => Self::Timeout {
                message: format!("operation deadline exceeded after {d:?}"),
            },
            HttpError::Cancelled => Self::Cancelled,
            HttpError::Transport(source) => Self::Connection {
                message: source.to_string(),
            },
            HttpError::Tls(source) => Self::Connection {
                message: format!("TLS failure: {source}"),
            },
            HttpError::ServiceClosed => Self::Connection {
                message: "client worker shut down unexpectedly".to_owned(),
            },
            HttpError::Json(e) => Self::InvalidResponse {
                message: e.to_string(),
            },
            HttpError::BodyTooLarge { limit, actual } => Self::InvalidResponse {
                message: format!("response body too large: limit {limit}, got {actual}"),
            },
            // Non-2xx surfaced through a checked read; classify from what we have.
            HttpError::HttpStatus {
                status,
                body_preview,
                ..
            } => classify_response(status, &HeaderMap::new(), body_preview.as_bytes()),
            // Builder/config failures: the request never left the process.
            other => Self::InvalidRequest {
                message: other.to_string(),
            },
        }
    }
}

/// Map a terminal HTTP response to a classified error.
///
/// Tolerates the three documented error body shapes — `{"error": "..."}`,
/// RFC 9457 problem objects, JSON:API error arrays — and falls back to a
/// message built from the status code when the body is missing or
/// unparseable. This function never fails.
#[must_use]
pub fn classify_response(status: StatusCode, headers: &HeaderMap, body: &[u8]) -> ApiError {
    let parsed: Option<Value> = serde_json::from_slice(body).ok();
    let message = extract_message(parsed.as_ref(), status);
    let request_id = extract_request_id(headers);

    match status.as_u16() {
        401 => ApiError::Auth {
            message,
            request_id,
        },
        403 => ApiError::Forbidden {
            message,
            request_id,
        },
        404 => ApiError::NotFound {
            message,
            request_id,
        },
        422 => ApiError::Validation {
            message,
            request_id,
            details: extract_violations(parsed.as_ref()),
        },
        429 => ApiError::RateLimit {
            message,
            request_id,
            retry_after: parse_retry_after(headers),
        },
        status => ApiError::Server {
            message,
            status,
            request_id,
        },
    }
}

fn extract_request_id(headers: &HeaderMap) -> Option<String> {
    REQUEST_ID_HEADERS.iter().find_map(|name| {
        headers
            .get(*name)
            .and_then(|v| v.to_str().ok())
            .map(String::from)
    })
}

/// Pull a human-readable message out of whichever body shape arrived.
fn extract_message(body: Option<&Value>, status: StatusCode) -> String {
    if let Some(body) = body {
        // Simple shape: {"error": "..."}
        if let Some(msg) = body.get("error").and_then(Value::as_str) {
            if !msg.is_empty() {
                return msg.to_owned();
            }
        }

        // RFC 9457 problem: prefer detail, fall back to title.
        for key in ["detail", "title"] {
            if let Some(msg) = body.get(key).and_then(Value::as_str) {
                if !msg.is_empty() {
                    return msg.to_owned();
                }
            }
        }

        // JSON:API: {"errors": [{"detail"|"title"|"message": ...}, ...]}
        if let Some(errors) = body.get("errors").and_then(Value::as_array) {
            let messages: Vec<&str> = errors
                .iter()
                .filter_map(|e| {
                    ["detail", "title", "message"]
                        .iter()
                        .find_map(|k| e.get(*k).and_then(Value::as_str))
                })
                .filter(|m| !m.is_empty())
                .collect();
            if !messages.is_empty() {
                return messages.join("; ");
            }
        }
    }

    // Unparseable or empty body: the status line is all we know.
    match status.canonical_reason() {
        Some(reason) => format!("HTTP {} {reason}", status.as_u16()),
        None => format!("HTTP {}", status.as_u16()),
    }
}

/// Collect field-level violations from the shapes the API is known to emit.
fn extract_violations(body: Option<&Value>) -> Vec<FieldViolation> {
    let Some(body) = body else {
        return Vec::new();
    };

    let mut violations = Vec::new();
    for key in ["type_detail", "errors"] {
        let Some(entries) = body.get(key).and_then(Value::as_array) else {
            continue;
        };
        for entry in entries {
            let field = entry
                .get("field")
                .and_then(Value::as_str)
                .map(String::from)
                .or_else(|| pointer_field(entry));
            let message = ["description", "message", "detail", "title"]
                .iter()
                .find_map(|k| entry.get(*k).and_then(Value::as_str))
                .unwrap_or_default();
            if let Some(field) = field {
                violations.push(FieldViolation {
                    field,
                    message: message.to_owned(),
                });
            }
        }
        if !violations.is_empty() {
            break;
        }
    }
    violations
}

/// JSON:API `source.pointer` → trailing path segment as the field name.
fn pointer_field(entry: &Value) -> Option<String> {
    entry
        .get("source")
        .and_then(|s| s.get("pointer"))
        .and_then(Value::as_str)
        .and_then(|p| p.rsplit('/').next())
        .filter(|s| !s.is_empty())
        .map(String::from)
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use serde_json::json;

    fn classify_json(status: u16, body: &Value) -> ApiError {
        classify_response(
            StatusCode::from_u16(status).unwrap(),
            &HeaderMap::new(),
            body.to_string().as_bytes(),
        )
    }

    #[test]
    fn status_to_kind_mapping() {
        assert!(matches!(
            classify_json(401, &json!({"error": "no key"})),
            ApiError::Auth { .. }
        ));
        assert!(matches!(
            classify_json(403, &json!({"error": "nope"})),
            ApiError::Forbidden { .. }
        ));
        assert!(matches!(
            classify_json(404, &json!({"error": "gone"})),
            ApiError::NotFound { .. }
        ));
        assert!(matches!(
            classify_json(422, &json!({"error": "bad"})),
            ApiError::Validation { .. }
        ));
        assert!(matches!(
            classify_json(429, &json!({"error": "slow down"})),
            ApiError::RateLimit { .. }
        ));
        for status in [500, 502, 503, 504, 418, 451] {
            assert!(matches!(
                classify_json(status, &json!({"error": "x"})),
                ApiError::Server { .. }
            ));
        }
    }

    #[test]
    fn classification_is_total_over_4xx_and_5xx() {
        let bodies: [&[u8]; 4] = [
            b"",
            b"not json at all",
            br#"{"error": "simple"}"#,
            br#"{"errors": [{"detail": "jsonapi"}]}"#,
        ];
        for status in 400..=599u16 {
            for body in bodies {
                let err =
                    classify_response(StatusCode::from_u16(status).unwrap(), &HeaderMap::new(), body);
                assert!(!err.to_string().is_empty(), "empty message for {status}");
            }
        }
    }

    #[test]
    fn simple_error_shape_message() {
        let err = classify_json(404, &json!({"error": "dataset not found"}));
        assert_eq!(err.to_string(), "not found: dataset not found");
    }

    #[test]
    fn problem_shape_prefers_detail_over_title() {
        let err = classify_json(
            403,
            &json!({
                "type": "https://api.honeycomb.io/problems/forbidden",
                "title": "Forbidden",
                "status": 403,
                "detail": "key lacks the triggers scope"
            }),
        );
        assert_eq!(err.to_string(), "forbidden: key lacks the triggers scope");
    }

    #[test]
    fn jsonapi_shape_joins_messages() {
        let err = classify_json(
            500,
            &json!({"errors": [{"title": "first"}, {"detail": "second"}]}),
        );
        assert!(err.to_string().contains("first; second"));
    }

    #[test]
    fn unparseable_body_falls_back_to_status_line() {
        let err = classify_response(
            StatusCode::SERVICE_UNAVAILABLE,
            &HeaderMap::new(),
            b"<html>oops</html>",
        );
        assert_eq!(
            err.to_string(),
            "server error (status 503): HTTP 503 Service Unavailable"
        );
    }

    #[test]
    fn validation_extracts_type_detail_fields() {
        let err = classify_json(
            422,
            &json!({
                "error": "invalid",
                "type_detail": [{"field": "name", "description": "required"}]
            }),
        );
        let details = err.validation_details();
        assert_eq!(details.len(), 1);
        assert_eq!(details[0].field, "name");
        assert_eq!(details[0].message, "required");
        assert!(matches!(err, ApiError::Validation { .. }));
    }

    #[test]
    fn validation_extracts_problem_errors_array() {
        let err = classify_json(
            422,
            &json!({
                "title": "Unprocessable Entity",
                "status": 422,
                "errors": [
                    {"field": "frequency", "message": "must be at least 60"},
                    {"field": "threshold.value", "message": "required"}
                ]
            }),
        );
        let details = err.validation_details();
        assert_eq!(details.len(), 2);
        assert_eq!(details[1].field, "threshold.value");
    }

    #[test]
    fn validation_extracts_jsonapi_pointer_fields() {
        let err = classify_json(
            422,
            &json!({
                "errors": [{
                    "detail": "is required",
                    "source": {"pointer": "/data/attributes/name"}
                }]
            }),
        );
        let details = err.validation_details();
        assert_eq!(details.len(), 1);
        assert_eq!(details[0].field, "name");
        assert_eq!(details[0].message, "is required");
    }

    #[test]
    fn validation_without_recognizable_details_is_empty() {
        let err = classify_json(422, &json!({"error": "invalid"}));
        assert!(err.validation_details().is_empty());
    }

    #[test]
    fn rate_limit_carries_retry_after_hint() {
        let mut headers = HeaderMap::new();
        headers.insert("retry-after", "30".parse().unwrap());
        let err = classify_response(
            StatusCode::TOO_MANY_REQUESTS,
            &headers,
            br#"{"error": "rate limited"}"#,
        );
        assert_eq!(err.retry_after(), Some(Duration::from_secs(30)));

        let err = classify_response(
            StatusCode::TOO_MANY_REQUESTS,
            &HeaderMap::new(),
            br#"{"error": "rate limited"}"#,
        );
        assert_eq!(err.retry_after(), None);
    }

    #[test]
    fn request_id_is_extracted_from_known_headers() {
        let mut headers = HeaderMap::new();
        headers.insert("x-honeycomb-request-id", "req-123".parse().unwrap());
        let err = classify_response(StatusCode::NOT_FOUND, &headers, b"");
        assert_eq!(err.request_id(), Some("req-123"));

        let mut headers = HeaderMap::new();
        headers.insert("x-request-id", "req-456".parse().unwrap());
        let err = classify_response(StatusCode::NOT_FOUND, &headers, b"");
        assert_eq!(err.request_id(), Some("req-456"));

        let err = classify_response(StatusCode::NOT_FOUND, &HeaderMap::new(), b"");
        assert_eq!(err.request_id(), None);
    }

    #[test]
    fn status_code_accessor_matches_kind() {
        assert_eq!(classify_json(401, &json!({})).status_code(), Some(401));
        assert_eq!(classify_json(502, &json!({})).status_code(), Some(502));
        assert_eq!(
            ApiError::Timeout {
                message: "t".to_owned()
            }
            .status_code(),
            None
        );
    }

    #[test]
    fn transport_errors_map_to_timeout_and_connection() {
        let err: ApiError = HttpError::Timeout(Duration::from_secs(5)).into();
        assert!(matches!(err, ApiError::Timeout { .. }));

        let err: ApiError = HttpError::Transport(Box::new(std::io::Error::new(
            std::io::ErrorKind::ConnectionRefused,
            "refused",
        )))
        .into();
        assert!(matches!(err, ApiError::Connection { .. }));

        let err: ApiError = HttpError::Cancelled.into();
        assert!(matches!(err, ApiError::Cancelled));
    }

    #[test]
    fn retriability_follows_kind() {
        assert!(classify_json(429, &json!({})).is_retriable());
        assert!(classify_json(503, &json!({})).is_retriable());
        assert!(!classify_json(404, &json!({})).is_retriable());
        assert!(!classify_json(422, &json!({})).is_retriable());
        assert!(ApiError::Connection {
            message: "x".to_owned()
        }
        .is_retriable());
        assert!(!ApiError::Cancelled.is_retriable());
    }
}
