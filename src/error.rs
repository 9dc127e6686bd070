//! Unified error types for the retry stage.

use std::fmt;

// ---------------------------------------------------------------------------
// ConfigError
// ---------------------------------------------------------------------------

/// Errors when loading or parsing configuration. Always fatal at startup.
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Toml(toml::de::Error),
    Invalid(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "io: {e}"),
            Self::Toml(e) => write!(f, "toml: {e}"),
            Self::Invalid(msg) => write!(f, "invalid config: {msg}"),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<std::io::Error> for ConfigError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(e: toml::de::Error) -> Self {
        Self::Toml(e)
    }
}

// ---------------------------------------------------------------------------
// EnvelopeError
// ---------------------------------------------------------------------------

/// An envelope broke the metadata contract expected from the upstream stage.
///
/// Only the offending envelope fails; the stage keeps processing others.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnvelopeError {
    /// A header required for this transition is absent.
    MissingHeader(&'static str),
    /// A header is present but its value cannot be interpreted.
    InvalidHeader { key: &'static str, reason: String },
    /// Exactly one of `retry_until` / `retry_count` is present.
    InconsistentRetryHeaders,
}

impl fmt::Display for EnvelopeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingHeader(key) => write!(f, "missing header `{key}`"),
            Self::InvalidHeader { key, reason } => write!(f, "invalid header `{key}`: {reason}"),
            Self::InconsistentRetryHeaders => write!(
                f,
                "`retry_until` and `retry_count` must be both present or both absent"
            ),
        }
    }
}

impl std::error::Error for EnvelopeError {}

// ---------------------------------------------------------------------------
// TransportError
// ---------------------------------------------------------------------------

/// Errors raised by the JSON-lines binder.
#[derive(Debug)]
pub enum TransportError {
    Io(std::io::Error),
    /// An input line is not a valid envelope.
    Decode(serde_json::Error),
    /// An outbound frame could not be serialized.
    Encode(serde_json::Error),
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "io: {e}"),
            Self::Decode(e) => write!(f, "malformed envelope: {e}"),
            Self::Encode(e) => write!(f, "failed to encode frame: {e}"),
        }
    }
}

impl std::error::Error for TransportError {}

impl From<std::io::Error> for TransportError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

// ---------------------------------------------------------------------------
// StageError (top-level)
// ---------------------------------------------------------------------------

/// Top-level error for the stage process.
#[derive(Debug)]
pub enum StageError {
    Config(ConfigError),
    Transport(TransportError),
}

impl fmt::Display for StageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(e) => write!(f, "config: {e}"),
            Self::Transport(e) => write!(f, "transport: {e}"),
        }
    }
}

impl std::error::Error for StageError {}

impl From<ConfigError> for StageError {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

impl From<TransportError> for StageError {
    fn from(e: TransportError) -> Self {
        Self::Transport(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let e = ConfigError::from(io_err);
        let s = e.to_string();
        assert!(s.starts_with("io:"), "got: {s}");
        assert!(s.contains("file not found"));
    }

    #[test]
    fn config_error_from_toml() {
        let toml_err: toml::de::Error = toml::from_str::<toml::Value>("x = [unclosed").unwrap_err();
        let e = ConfigError::from(toml_err);
        assert!(e.to_string().starts_with("toml:"));
    }

    #[test]
    fn envelope_error_display_variants() {
        assert_eq!(
            EnvelopeError::MissingHeader("request_method").to_string(),
            "missing header `request_method`"
        );
        assert_eq!(
            EnvelopeError::InvalidHeader {
                key: "retry_count",
                reason: "expected an integer".into(),
            }
            .to_string(),
            "invalid header `retry_count`: expected an integer"
        );
        assert!(EnvelopeError::InconsistentRetryHeaders
            .to_string()
            .contains("both present or both absent"));
    }

    #[test]
    fn transport_error_decode_message() {
        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let e = TransportError::Decode(json_err);
        assert!(e.to_string().starts_with("malformed envelope:"), "got: {e}");
    }

    #[test]
    fn stage_error_from_config_error() {
        let se = StageError::from(ConfigError::Invalid("retry.duration is required".into()));
        assert_eq!(
            se.to_string(),
            "config: invalid config: retry.duration is required"
        );
    }
}
