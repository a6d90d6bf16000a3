use base64::{engine::general_purpose, Engine as _};
use serde::Deserialize;
use serde_json::Value;
use url::form_urlencoded::byte_serialize;

use crate::error::ConsoleApiError;

/// One poll cycle worth of client state sent to the console router.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedRequest {
    /// Console token authorizing the session.
    pub session: String,
    /// Raw keystrokes captured since the previous cycle. May be empty.
    pub keys: Vec<u8>,
    pub width: u16,
    pub height: u16,
}

impl FeedRequest {
    pub fn new(session: impl Into<String>, keys: Vec<u8>, width: u16, height: u16) -> Self {
        Self {
            session: session.into(),
            keys,
            width,
            height,
        }
    }

    /// Encode as an `application/x-www-form-urlencoded` body.
    ///
    /// Keys are percent-encoded byte for byte, so partial UTF-8 sequences and
    /// control bytes survive unchanged.
    pub fn to_form_body(&self) -> String {
        let mut body = String::new();
        push_field(&mut body, "session", self.session.as_bytes());
        push_field(&mut body, "keys", &self.keys);
        push_field(&mut body, "width", self.width.to_string().as_bytes());
        push_field(&mut body, "height", self.height.to_string().as_bytes());
        body
    }
}

fn push_field(body: &mut String, name: &str, value: &[u8]) {
    if !body.is_empty() {
        body.push('&');
    }
    body.push_str(name);
    body.push('=');
    body.extend(byte_serialize(value));
}

/// Decoded answer to a feed request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedResponse {
    /// Session is alive; raw terminal output to display.
    Output(Vec<u8>),
    /// Session ended on the remote side; human-readable closing message.
    Closed(String),
}

#[derive(Debug, Deserialize)]
struct RawFeedResponse {
    #[serde(default)]
    session: Value,
    #[serde(default)]
    data: Value,
}

/// Parse a feed response body.
///
/// `session` is considered alive unless it is absent, `null` or `false`.
pub fn decode_feed_response(body: &[u8]) -> Result<FeedResponse, ConsoleApiError> {
    let raw: RawFeedResponse = serde_json::from_slice(body)?;

    if !is_truthy(&raw.session) {
        return Ok(FeedResponse::Closed(closing_text(raw.data)));
    }

    match raw.data {
        Value::String(encoded) => decode_output(&encoded).map(FeedResponse::Output),
        Value::Null => Ok(FeedResponse::Output(Vec::new())),
        other => Err(ConsoleApiError::InvalidPayload(format!(
            "'data' must be a base64 string, got {}",
            value_type_name(&other)
        ))),
    }
}

/// Decode a base64 output chunk. Embedded whitespace (line wrapping) is ignored.
pub fn decode_output(encoded: &str) -> Result<Vec<u8>, ConsoleApiError> {
    let compact: String = encoded
        .chars()
        .filter(|ch| !ch.is_ascii_whitespace())
        .collect();
    general_purpose::STANDARD
        .decode(compact)
        .map_err(|err| ConsoleApiError::InvalidPayload(err.to_string()))
}

/// Encode terminal output the way the console router transports it.
pub fn encode_output(bytes: &[u8]) -> String {
    general_purpose::STANDARD.encode(bytes)
}

fn is_truthy(value: &Value) -> bool {
    !matches!(value, Value::Null | Value::Bool(false))
}

fn closing_text(data: Value) -> String {
    match data {
        Value::String(text) => text,
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn value_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
