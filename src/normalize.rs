//! Response normalization
//!
//! Collapses every possible upstream outcome (transport failure, any
//! status, any body) into a single [`NormalizedResult`] value. The
//! classification is total: no `(status, body)` pair escapes it, and an
//! unparseable body degrades to bounded detail text instead of an error
//! bubbling out of the call.

use reqwest::StatusCode;
use serde_json::{Value, json};
use tracing::warn;

use crate::dispatch::RawResponse;
use crate::{Error, Result};

/// Byte budget for failure detail text, bounding memory and log growth
const DETAIL_BUDGET: usize = 1000;

/// Success outcome of one upstream call
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// 200 with a parsed JSON body
    Data(Value),
    /// 204, the upstream's shape for completed deletions
    NoContent,
    /// 200 with an empty body; success, but distinguishable so operators
    /// can spot upstreams that should have returned data
    EmptyOk,
    /// Any other 2xx
    GenericOk(u16),
}

impl Outcome {
    /// Stable label for logs and the wire shape
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Data(_) => "data",
            Self::NoContent => "no_content",
            Self::EmptyOk => "empty_ok",
            Self::GenericOk(_) => "generic_ok",
        }
    }
}

/// The single value returned across the core boundary, immutable once built
#[derive(Debug, Clone, PartialEq)]
pub enum NormalizedResult {
    /// Call succeeded
    Success {
        /// Originating operation key
        operation: String,
        /// What kind of success the upstream reported
        outcome: Outcome,
    },
    /// Call failed; carries enough to debug but never the credential
    Failure {
        /// Originating operation key
        operation: String,
        /// Taxonomy label (`network`, `http_error`, `invalid_argument`, ...)
        classification: &'static str,
        /// HTTP status when the failure came from a response
        http_status: Option<u16>,
        /// Parsed problem JSON, or detail text bounded to 1000 bytes
        detail: Value,
        /// Request URL when one was attempted
        request_url: Option<String>,
    },
}

impl NormalizedResult {
    /// True for any success outcome
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// Convert a taxonomy error into a failure payload
    pub fn from_error(err: Error, operation: &str) -> Self {
        let classification = err.classification();
        match err {
            Error::HttpError {
                status,
                detail,
                url,
            } => Self::Failure {
                operation: operation.to_string(),
                classification,
                http_status: Some(status),
                detail,
                request_url: Some(url),
            },
            other => Self::Failure {
                operation: operation.to_string(),
                classification,
                http_status: None,
                detail: Value::String(truncate_detail(&other.to_string())),
                request_url: None,
            },
        }
    }

    /// JSON-serializable wire shape handed to the framing layer
    #[must_use]
    pub fn to_json(&self) -> Value {
        match self {
            Self::Success { operation, outcome } => match outcome {
                Outcome::Data(payload) => payload.clone(),
                Outcome::NoContent => json!({
                    "status": "success",
                    "kind": "no_content",
                    "message": "Operation completed successfully (no content returned)",
                    "operation": operation,
                    "http_status": 204,
                }),
                Outcome::EmptyOk => json!({
                    "status": "success",
                    "kind": "empty_ok",
                    "message": "Operation returned 200 OK with no content",
                    "operation": operation,
                    "http_status": 200,
                }),
                Outcome::GenericOk(status) => json!({
                    "status": "success",
                    "kind": "generic_ok",
                    "message": format!("Operation returned {status}"),
                    "operation": operation,
                    "http_status": status,
                }),
            },
            Self::Failure {
                operation,
                classification,
                http_status,
                detail,
                request_url,
            } => {
                let mut body = json!({
                    "error": classification,
                    "detail": detail,
                    "operation": operation,
                });
                let map = body.as_object_mut().expect("object literal");
                if let Some(status) = http_status {
                    map.insert("http_status".to_string(), json!(status));
                }
                if let Some(url) = request_url {
                    map.insert("url".to_string(), json!(url));
                }
                body
            }
        }
    }
}

/// Classify one raw outcome into the normalized result type
///
/// Rules, in order: transport failure, 204, 200 with body, 200 empty,
/// other 2xx, everything else as an HTTP error.
pub fn normalize(result: Result<RawResponse>, operation: &str) -> NormalizedResult {
    let raw = match result {
        Ok(raw) => raw,
        Err(err) => return NormalizedResult::from_error(err, operation),
    };

    if raw.status == StatusCode::NO_CONTENT {
        return NormalizedResult::Success {
            operation: operation.to_string(),
            outcome: Outcome::NoContent,
        };
    }

    if raw.status == StatusCode::OK {
        if raw.body.is_empty() {
            // Unusual but observed upstream behavior; success, flagged
            // for operator visibility.
            warn!(operation = %operation, "200 OK with empty body");
            return NormalizedResult::Success {
                operation: operation.to_string(),
                outcome: Outcome::EmptyOk,
            };
        }
        return match serde_json::from_str(&raw.body) {
            Ok(payload) => NormalizedResult::Success {
                operation: operation.to_string(),
                outcome: Outcome::Data(payload),
            },
            Err(_) => NormalizedResult::Failure {
                operation: operation.to_string(),
                classification: "invalid_response_body",
                http_status: Some(200),
                detail: Value::String(truncate_detail(&raw.body)),
                request_url: Some(raw.url),
            },
        };
    }

    if raw.status.is_success() {
        return NormalizedResult::Success {
            operation: operation.to_string(),
            outcome: Outcome::GenericOk(raw.status.as_u16()),
        };
    }

    // 4xx/5xx (and anything else non-2xx): prefer the structured problem
    // body, fall back to bounded text.
    let detail = serde_json::from_str(&raw.body)
        .unwrap_or_else(|_| Value::String(truncate_detail(&raw.body)));

    NormalizedResult::Failure {
        operation: operation.to_string(),
        classification: "http_error",
        http_status: Some(raw.status.as_u16()),
        detail,
        request_url: Some(raw.url),
    }
}

/// Truncate to the detail budget without splitting a UTF-8 character
fn truncate_detail(text: &str) -> String {
    if text.len() <= DETAIL_BUDGET {
        return text.to_string();
    }
    let mut end = DETAIL_BUDGET;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    text[..end].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(status: u16, body: &str) -> Result<RawResponse> {
        Ok(RawResponse {
            status: StatusCode::from_u16(status).unwrap(),
            body: body.to_string(),
            url: "https://api.example.com/test".to_string(),
        })
    }

    #[test]
    fn classification_is_total_over_the_contract_grid() {
        let cases: Vec<(Result<RawResponse>, &str)> = vec![
            (raw(204, ""), "no_content"),
            (raw(200, r#"{"ok":true}"#), "data"),
            (raw(200, "not json"), "invalid_response_body"),
            (raw(200, ""), "empty_ok"),
            (raw(201, ""), "generic_ok"),
            (raw(404, r#"{"status":404}"#), "http_error"),
            (raw(500, "internal blowup"), "http_error"),
            (Err(Error::Network("timed out".into())), "network"),
        ];

        for (input, expected) in cases {
            let result = normalize(input, "op");
            let label = match &result {
                NormalizedResult::Success { outcome, .. } => outcome.kind(),
                NormalizedResult::Failure { classification, .. } => classification,
            };
            assert_eq!(label, expected);
        }
    }

    #[test]
    fn data_success_carries_parsed_payload() {
        let result = normalize(raw(200, r#"{"reachabilityStatus":"CONNECTED_DATA"}"#), "op");
        match result {
            NormalizedResult::Success {
                outcome: Outcome::Data(payload),
                ..
            } => assert_eq!(payload["reachabilityStatus"], "CONNECTED_DATA"),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn http_error_prefers_problem_json() {
        let result = normalize(
            raw(404, r#"{"status":404,"code":"NOT_FOUND","message":"device not found"}"#),
            "device_reachability_retrieve",
        );
        match result {
            NormalizedResult::Failure {
                http_status,
                detail,
                request_url,
                ..
            } => {
                assert_eq!(http_status, Some(404));
                assert_eq!(detail["message"], "device not found");
                assert!(request_url.is_some());
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn http_error_falls_back_to_bounded_text() {
        let long_body = "x".repeat(5000);
        let result = normalize(raw(500, &long_body), "op");
        match result {
            NormalizedResult::Failure { detail, .. } => {
                assert_eq!(detail.as_str().unwrap().len(), 1000);
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn invalid_json_detail_is_bounded() {
        let body = format!("<html>{}</html>", "y".repeat(4000));
        let result = normalize(raw(200, &body), "op");
        match result {
            NormalizedResult::Failure {
                classification,
                detail,
                ..
            } => {
                assert_eq!(classification, "invalid_response_body");
                assert!(detail.as_str().unwrap().len() <= 1000);
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        // Multi-byte characters straddling the budget must not split
        let text = "é".repeat(600);
        let truncated = truncate_detail(&text);
        assert!(truncated.len() <= 1000);
        assert!(truncated.chars().all(|c| c == 'é'));
    }

    #[test]
    fn wire_shape_for_data_is_the_payload_itself() {
        let result = normalize(raw(200, r#"{"a":1}"#), "op");
        assert_eq!(result.to_json(), serde_json::json!({"a":1}));
    }

    #[test]
    fn wire_shape_for_no_content_is_a_status_marker() {
        let result = normalize(raw(204, ""), "qod_sessions_delete");
        let wire = result.to_json();
        assert_eq!(wire["status"], "success");
        assert_eq!(wire["kind"], "no_content");
        assert_eq!(wire["http_status"], 204);
        assert_eq!(wire["operation"], "qod_sessions_delete");
    }

    #[test]
    fn empty_ok_stays_distinguishable_from_data() {
        let result = normalize(raw(200, ""), "op");
        assert!(result.is_success());
        assert_eq!(result.to_json()["kind"], "empty_ok");
    }

    #[test]
    fn pre_dispatch_errors_map_to_failures() {
        let result =
            NormalizedResult::from_error(Error::InvalidArgument("phone_number".into()), "op");
        match result {
            NormalizedResult::Failure {
                classification,
                http_status,
                ..
            } => {
                assert_eq!(classification, "invalid_argument");
                assert_eq!(http_status, None);
            }
            other => panic!("unexpected: {other:?}"),
        }
    }
}
