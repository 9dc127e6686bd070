//! Diagnostic envelope emitted when a lineage runs out of retries.

use crate::envelope::{Envelope, CONTENT_TYPE, REQUEST_METHOD, REQUEST_URL, STATUS_CODE};
use crate::error::EnvelopeError;
use crate::media_type::{MediaType, APPLICATION_JSON, TEXT_PLAIN, TEXT_XML};
use serde_json::{Map, Value};
use std::fmt;

/// Fixed `message` field of every diagnostic payload.
pub const RETRY_EXHAUSTED_MESSAGE: &str = "Retry exhausted for request received.";

/// `status_code` stamped on every diagnostic envelope.
pub const BAD_GATEWAY: i64 = 502;

/// Standard HTTP request methods accepted in `request_method`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Head,
    Post,
    Put,
    Patch,
    Delete,
    Options,
    Trace,
}

impl HttpMethod {
    pub fn parse(name: &str) -> Option<Self> {
        Some(match name {
            "GET" => Self::Get,
            "HEAD" => Self::Head,
            "POST" => Self::Post,
            "PUT" => Self::Put,
            "PATCH" => Self::Patch,
            "DELETE" => Self::Delete,
            "OPTIONS" => Self::Options,
            "TRACE" => Self::Trace,
            _ => return None,
        })
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Head => "HEAD",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
            Self::Options => "OPTIONS",
            Self::Trace => "TRACE",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Build the diagnostic envelope for an exhausted request.
///
/// Incoming metadata is kept; `status_code` becomes [`BAD_GATEWAY`] and
/// `content_type` becomes `application/json`. A payload that fails to decode
/// is embedded as text, never raised as an error.
pub fn report(envelope: Envelope) -> Result<Envelope, EnvelopeError> {
    let method_name = envelope
        .text_header(REQUEST_METHOD)
        .ok_or(EnvelopeError::MissingHeader(REQUEST_METHOD))?;
    let method = HttpMethod::parse(method_name).ok_or_else(|| EnvelopeError::InvalidHeader {
        key: REQUEST_METHOD,
        reason: format!("unknown HTTP method `{method_name}`"),
    })?;
    let remote_status = envelope.integer_header(STATUS_CODE)?;

    let mut diagnostic = Map::new();
    diagnostic.insert(
        "url".to_string(),
        envelope
            .text_header(REQUEST_URL)
            .map_or(Value::Null, |url| Value::String(url.to_string())),
    );
    diagnostic.insert("method".to_string(), Value::String(method.to_string()));
    diagnostic.insert(
        "remote_status_code".to_string(),
        remote_status.map_or(Value::Null, Value::from),
    );
    diagnostic.insert(
        "message".to_string(),
        Value::String(RETRY_EXHAUSTED_MESSAGE.to_string()),
    );
    if method == HttpMethod::Post && has_textual_content_type(&envelope) {
        diagnostic.insert("body".to_string(), decode_body(envelope.payload()));
    }

    let payload = Value::Object(diagnostic).to_string();
    Ok(envelope
        .replace_payload(payload)
        .set_header(STATUS_CODE, BAD_GATEWAY)
        .set_header(CONTENT_TYPE, APPLICATION_JSON))
}

/// True when `content_type` is JSON, plain text or XML compatible.
fn has_textual_content_type(envelope: &Envelope) -> bool {
    let Some(media_type) = envelope.text_header(CONTENT_TYPE).and_then(MediaType::parse) else {
        return false;
    };
    [APPLICATION_JSON, TEXT_PLAIN, TEXT_XML]
        .into_iter()
        .filter_map(MediaType::parse)
        .any(|textual| media_type.is_compatible_with(&textual))
}

/// Parsed JSON when the payload is JSON, its text otherwise.
fn decode_body(payload: &[u8]) -> Value {
    serde_json::from_slice(payload)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(payload).into_owned()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::envelope::{RETRY_COUNT, RETRY_UNTIL, TRACE_ID};
    use serde_json::json;

    const PAST: i64 = 1_546_268_400_000;

    fn exhausted(method: &str) -> Envelope {
        Envelope::with_payload("Test Payload")
            .set_header(TRACE_ID, "lineage-7")
            .set_header(REQUEST_METHOD, method)
            .set_header(REQUEST_URL, "http://some.domain/")
            .set_header(STATUS_CODE, 429i64)
            .set_header(RETRY_UNTIL, PAST)
            .set_header(RETRY_COUNT, 1u32)
    }

    fn diagnostic(envelope: &Envelope) -> Value {
        serde_json::from_slice(envelope.payload()).expect("diagnostic payload is JSON")
    }

    #[test]
    fn json_post_embeds_parsed_body() {
        let input = exhausted("POST")
            .set_header(CONTENT_TYPE, "application/json")
            .replace_payload(r#"{"glossary": {"title": "example glossary", "GlossSeeAlso": ["GML", "XML"]}}"#);

        let output = report(input).expect("report");
        assert_eq!(
            diagnostic(&output),
            json!({
                "url": "http://some.domain/",
                "method": "POST",
                "remote_status_code": 429,
                "message": RETRY_EXHAUSTED_MESSAGE,
                "body": {"glossary": {"title": "example glossary", "GlossSeeAlso": ["GML", "XML"]}}
            })
        );
        assert_eq!(output.integer_header(STATUS_CODE), Ok(Some(BAD_GATEWAY)));
        assert_eq!(output.text_header(CONTENT_TYPE), Some(APPLICATION_JSON));
        assert_eq!(output.text_header(TRACE_ID), Some("lineage-7"));
        assert_eq!(output.integer_header(RETRY_COUNT), Ok(Some(1)));
        assert_eq!(output.integer_header(RETRY_UNTIL), Ok(Some(PAST)));
    }

    #[test]
    fn get_has_no_body() {
        let output = report(exhausted("GET")).expect("report");
        let value = diagnostic(&output);
        assert!(value.get("body").is_none(), "got: {value}");
        assert_eq!(value["method"], "GET");
        assert_eq!(value["message"], RETRY_EXHAUSTED_MESSAGE);
    }

    #[test]
    fn malformed_json_falls_back_to_text() {
        let input = exhausted("POST").set_header(CONTENT_TYPE, "application/json");
        let value = diagnostic(&report(input).expect("report"));
        assert_eq!(value["body"], "Test Payload");
    }

    #[test]
    fn xml_post_embeds_text() {
        let xml = "<note>\n  <to>Tove</to>\n</note>";
        let input = exhausted("POST")
            .set_header(CONTENT_TYPE, "text/xml; charset=ISO-8859-1")
            .replace_payload(xml);
        let value = diagnostic(&report(input).expect("report"));
        assert_eq!(value["body"], xml);
    }

    #[test]
    fn post_without_content_type_has_no_body() {
        let value = diagnostic(&report(exhausted("POST")).expect("report"));
        assert!(value.get("body").is_none());
    }

    #[test]
    fn post_with_binary_content_type_has_no_body() {
        let input = exhausted("POST").set_header(CONTENT_TYPE, "application/octet-stream");
        let value = diagnostic(&report(input).expect("report"));
        assert!(value.get("body").is_none());
    }

    #[test]
    fn json_suffix_wildcard_content_type_embeds_body() {
        // A `*+json` content type still counts as JSON for the body rule.
        let input = exhausted("POST")
            .set_header(CONTENT_TYPE, "application/*+json")
            .replace_payload(r#"{"id":1}"#);
        let value = diagnostic(&report(input).expect("report"));
        assert_eq!(value["body"], json!({"id": 1}));
    }

    #[test]
    fn missing_url_is_null() {
        let input = Envelope::with_payload("")
            .set_header(REQUEST_METHOD, "DELETE")
            .set_header(STATUS_CODE, 503i64);
        let value = diagnostic(&report(input).expect("report"));
        assert_eq!(value["url"], Value::Null);
        assert_eq!(value["remote_status_code"], 503);
    }

    #[test]
    fn missing_method_is_a_contract_violation() {
        let no_method = Envelope::with_payload("").set_header(STATUS_CODE, 429i64);
        assert_eq!(
            report(no_method),
            Err(EnvelopeError::MissingHeader(REQUEST_METHOD))
        );

        let no_status = Envelope::with_payload("").set_header(REQUEST_METHOD, "GET");
        let output = report(no_status).expect("status is optional");
        assert_eq!(diagnostic(&output)["remote_status_code"], Value::Null);

        let garbled = exhausted("GET").set_header(STATUS_CODE, "teapot");
        assert!(matches!(
            report(garbled),
            Err(EnvelopeError::InvalidHeader {
                key: STATUS_CODE,
                ..
            })
        ));
    }

    #[test]
    fn unknown_method_is_rejected() {
        let input = exhausted("FETCH");
        assert!(matches!(
            report(input),
            Err(EnvelopeError::InvalidHeader {
                key: REQUEST_METHOD,
                ..
            })
        ));
    }
}
