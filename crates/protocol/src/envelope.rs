use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Errors produced while decoding backend payloads.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("empty response body")]
    EmptyBody,
}

/// Structured error body returned by the backend on non-2xx responses.
///
/// Shape: `{ "success": false, "error": "<message>" }`. Some routes use
/// `message` instead of `error`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ApiError {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub success: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ApiError {
    /// Extracts the server-supplied message from a raw body, if any.
    ///
    /// Unparseable bodies and blank messages yield `None` so the caller
    /// can fall back to a status-coded message.
    pub fn message_from_body(body: &[u8]) -> Option<String> {
        let parsed: ApiError = serde_json::from_slice(body).ok()?;
        parsed
            .error
            .filter(|m| !m.trim().is_empty())
            .or_else(|| parsed.message.filter(|m| !m.trim().is_empty()))
    }
}

/// Decodes a success payload that may or may not be wrapped.
///
/// The backend answers `{ "success": true, "data": { ... } }`; older
/// routes put the fields at the top level. Both decode to `T`.
pub fn parse_api_payload<T: DeserializeOwned>(body: &[u8]) -> Result<T, ProtocolError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Err(ProtocolError::EmptyBody);
    }

    let value: serde_json::Value = serde_json::from_slice(body)?;
    let payload = match value {
        serde_json::Value::Object(mut map)
            if map.contains_key("success") && map.get("data").is_some_and(|d| d.is_object()) =>
        {
            map.remove("data").unwrap_or(serde_json::Value::Null)
        }
        other => other,
    };
    Ok(serde_json::from_value(payload)?)
}
