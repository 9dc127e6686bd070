//! Envelope model: an opaque payload plus typed metadata.
//!
//! Envelopes are immutable once built. Every transition consumes the envelope
//! and hands back a new one, so a buffered copy can never observe a change
//! made to the version in flight.

use crate::error::EnvelopeError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Lineage id, stamped once on first entry.
pub const TRACE_ID: &str = "trace_id";
/// Absolute retry deadline in epoch milliseconds.
pub const RETRY_UNTIL: &str = "retry_until";
/// Number of attempts already scheduled.
pub const RETRY_COUNT: &str = "retry_count";
pub const REQUEST_URL: &str = "request_url";
pub const REQUEST_METHOD: &str = "request_method";
/// Last observed status of the remote call.
pub const STATUS_CODE: &str = "status_code";
/// MIME type describing `payload`.
pub const CONTENT_TYPE: &str = "content_type";

/// A single metadata value.
///
/// On the wire integers and strings are plain JSON scalars; timestamps are
/// `{"timestamp_ms": <epoch millis>}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum HeaderValue {
    Integer(i64),
    Text(String),
    Timestamp { timestamp_ms: i64 },
}

impl HeaderValue {
    /// Integer view of the value. Timestamps yield epoch millis and text is
    /// parsed as a decimal integer.
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Self::Integer(value) => Some(*value),
            Self::Timestamp { timestamp_ms } => Some(*timestamp_ms),
            Self::Text(text) => text.trim().parse().ok(),
        }
    }

    /// Integer view of the value for header `key`, failing with
    /// [`EnvelopeError::InvalidHeader`] when it does not read as one.
    pub fn to_integer(&self, key: &'static str) -> Result<i64, EnvelopeError> {
        self.as_integer()
            .ok_or_else(|| EnvelopeError::InvalidHeader {
                key,
                reason: format!("expected an integer, got {self:?}"),
            })
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }
}

impl From<i64> for HeaderValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<u32> for HeaderValue {
    fn from(value: u32) -> Self {
        Self::Integer(i64::from(value))
    }
}

impl From<&str> for HeaderValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for HeaderValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

/// Envelope metadata keyed by header name.
pub type Metadata = BTreeMap<String, HeaderValue>;

/// Unit of work flowing through the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(with = "base64_payload")]
    payload: Vec<u8>,
    #[serde(default)]
    metadata: Metadata,
}

impl Envelope {
    pub fn new(payload: impl Into<Vec<u8>>, metadata: Metadata) -> Self {
        Self {
            payload: payload.into(),
            metadata,
        }
    }

    /// Start an envelope with the given payload and no metadata.
    pub fn with_payload(payload: impl Into<Vec<u8>>) -> Self {
        Self::new(payload, Metadata::new())
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    pub fn header(&self, key: &str) -> Option<&HeaderValue> {
        self.metadata.get(key)
    }

    pub fn contains_header(&self, key: &str) -> bool {
        self.metadata.contains_key(key)
    }

    /// Text header value, if present and textual.
    pub fn text_header(&self, key: &str) -> Option<&str> {
        self.header(key).and_then(HeaderValue::as_text)
    }

    /// Integer header value. Present-but-unparsable is a contract violation.
    pub fn integer_header(&self, key: &'static str) -> Result<Option<i64>, EnvelopeError> {
        self.header(key)
            .map(|value| value.to_integer(key))
            .transpose()
    }

    /// New envelope with `key` set, replacing any previous value.
    pub fn set_header(mut self, key: &str, value: impl Into<HeaderValue>) -> Self {
        self.metadata.insert(key.to_string(), value.into());
        self
    }

    /// New envelope with `key` set only when it is not already present.
    pub fn set_header_if_absent<F>(mut self, key: &str, value: F) -> Self
    where
        F: FnOnce() -> HeaderValue,
    {
        self.metadata.entry(key.to_string()).or_insert_with(value);
        self
    }

    /// New envelope carrying `payload` and the same metadata.
    pub fn replace_payload(mut self, payload: impl Into<Vec<u8>>) -> Self {
        self.payload = payload.into();
        self
    }
}

mod base64_payload {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use serde::{Deserialize, Deserializer, Serializer};

    pub(super) fn serialize<S>(payload: &[u8], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&STANDARD.encode(payload))
    }

    pub(super) fn deserialize<'de, D>(deserializer: D) -> Result<Vec<u8>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let encoded = String::deserialize(deserializer)?;
        STANDARD
            .decode(encoded.as_bytes())
            .map_err(serde::de::Error::custom)
    }
}
