//! Translation layer between backend response shapes and typed values.
//!
//! The backend answers either `{ "success": bool, "data": T, "error": ... }`
//! or the bare `T`. Everything above this module sees [`ApiResponse`].

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::ApiError;

/// Envelope-agnostic response.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse<T> {
    /// Whether the server reported success.
    pub ok: bool,
    /// Payload on success.
    pub value: Option<T>,
    /// Server error string on failure.
    pub error: Option<String>,
}

impl ApiResponse<Value> {
    /// Normalizes either envelope convention.
    #[must_use]
    pub fn normalize(body: Value) -> Self {
        let success = body.get("success").and_then(Value::as_bool);
        match success {
            Some(false) => Self {
                ok: false,
                value: None,
                error: error_text(&body),
            },
            Some(true) => {
                let value = match body {
                    Value::Object(mut fields) => match fields.remove("data") {
                        Some(data) => data,
                        None => Value::Object(fields),
                    },
                    other => other,
                };
                Self {
                    ok: true,
                    value: Some(value),
                    error: None,
                }
            }
            None => Self {
                ok: true,
                value: Some(body),
                error: None,
            },
        }
    }

    /// Parses raw body text and normalizes it.
    pub fn parse(body: &str) -> Result<Self, ApiError> {
        let value: Value = serde_json::from_str(body)
            .map_err(|err| ApiError::Parse(format!("invalid JSON: {err}")))?;
        Ok(Self::normalize(value))
    }

    /// Decodes the payload into `T`.
    pub fn decode<T: DeserializeOwned>(self) -> Result<ApiResponse<T>, ApiError> {
        let value = match self.value {
            Some(raw) => Some(
                serde_json::from_value(raw).map_err(|err| ApiError::Parse(err.to_string()))?,
            ),
            None => None,
        };
        Ok(ApiResponse {
            ok: self.ok,
            value,
            error: self.error,
        })
    }
}

impl<T> ApiResponse<T> {
    /// Converts to a `Result`, turning `ok: false` into [`ApiError::Rejected`].
    pub fn into_result(self) -> Result<T, ApiError> {
        match (self.ok, self.value) {
            (true, Some(value)) => Ok(value),
            (true, None) => Err(ApiError::Parse("response carried no payload".into())),
            (false, _) => Err(ApiError::Rejected { error: self.error }),
        }
    }
}

fn error_text(body: &Value) -> Option<String> {
    ["error", "message", "detail"]
        .iter()
        .filter_map(|key| body.get(*key))
        .find_map(describe)
}

fn describe(value: &Value) -> Option<String> {
    match value {
        Value::String(text) if !text.trim().is_empty() => Some(text.clone()),
        Value::Array(items) => {
            let parts: Vec<String> = items
                .iter()
                .filter_map(|item| {
                    item.get("msg")
                        .and_then(Value::as_str)
                        .map(str::to_string)
                        .or_else(|| item.as_str().map(str::to_string))
                })
                .collect();
            (!parts.is_empty()).then(|| parts.join("; "))
        }
        _ => None,
    }
}

/// Extracts a server error string from a non-2xx body, if it is JSON.
#[must_use]
pub fn server_error_of(body: &str) -> Option<String> {
    serde_json::from_str::<Value>(body)
        .ok()
        .as_ref()
        .and_then(error_text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn unwraps_success_envelope() {
        let response = ApiResponse::normalize(json!({ "success": true, "data": [1, 2] }));
        assert!(response.ok);
        assert_eq!(response.value, Some(json!([1, 2])));
    }

    #[test]
    fn bare_payload_passes_through() {
        let response = ApiResponse::normalize(json!([{ "id": 1 }]));
        assert!(response.ok);
        let items: Vec<Value> = response.decode().unwrap().into_result().unwrap();
        assert_eq!(items.len(), 1);
    }

    #[test]
    fn success_without_data_keeps_object() {
        let response = ApiResponse::normalize(json!({ "success": true, "policy_id": 4 }));
        assert_eq!(response.value.unwrap()["policy_id"], 4);
    }

    #[test]
    fn failure_envelope_becomes_rejected() {
        let response = ApiResponse::normalize(json!({ "success": false, "message": "nope" }));
        assert!(!response.ok);
        let err = response.into_result().unwrap_err();
        assert_eq!(err.server_error(), Some("nope"));
    }

    #[test]
    fn extracts_validation_detail_lists() {
        let body = r#"{"detail":[{"msg":"field required"},{"msg":"too long"}]}"#;
        assert_eq!(
            server_error_of(body).as_deref(),
            Some("field required; too long")
        );
        assert_eq!(server_error_of("<html>oops</html>"), None);
    }

    #[test]
    fn malformed_payload_is_parse_error() {
        let err = ApiResponse::parse("{not json").unwrap_err();
        assert!(matches!(err, ApiError::Parse(_)));
        let err = ApiResponse::normalize(json!({ "success": true, "data": "x" }))
            .decode::<Vec<i64>>()
            .unwrap_err();
        assert!(matches!(err, ApiError::Parse(_)));
    }
}
