//! Minimal MIME type parsing and compatibility checks.

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaType {
    kind: String,
    subtype: String,
}

pub const APPLICATION_JSON: &str = "application/json";
pub const TEXT_PLAIN: &str = "text/plain";
pub const TEXT_XML: &str = "text/xml";

const WILDCARD: &str = "*";

impl MediaType {
    /// Parse `type/subtype[; params]`. Parameters are dropped and names are
    /// lower-cased. Returns `None` for anything that is not a media type.
    pub fn parse(text: &str) -> Option<Self> {
        let essence = text.split(';').next()?.trim();
        let (kind, subtype) = essence.split_once('/')?;
        let (kind, subtype) = (kind.trim(), subtype.trim());
        if kind.is_empty() || subtype.is_empty() || subtype.contains('/') {
            return None;
        }
        if kind == WILDCARD && subtype != WILDCARD {
            return None;
        }
        Some(Self {
            kind: kind.to_ascii_lowercase(),
            subtype: subtype.to_ascii_lowercase(),
        })
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn subtype(&self) -> &str {
        &self.subtype
    }

    fn is_wildcard_kind(&self) -> bool {
        self.kind == WILDCARD
    }

    fn is_wildcard_subtype(&self) -> bool {
        self.subtype == WILDCARD || self.subtype.starts_with("*+")
    }

    /// Structured-syntax suffix, e.g. `json` for `application/problem+json`.
    fn suffix(&self) -> Option<&str> {
        self.subtype.rsplit_once('+').map(|(_, suffix)| suffix)
    }

    /// `*+json` matches a concrete `json` subtype or any `...+json` subtype.
    fn wildcard_suffix_matches(&self, concrete: &MediaType) -> bool {
        let Some(suffix) = self.suffix() else {
            return false;
        };
        suffix == concrete.subtype || concrete.suffix() == Some(suffix)
    }

    /// Symmetric compatibility: wildcards on either side match.
    ///
    /// `text/*` matches `text/plain`, and `application/*+json` matches both
    /// `application/problem+json` and `application/json`.
    pub fn is_compatible_with(&self, other: &MediaType) -> bool {
        if self.is_wildcard_kind() || other.is_wildcard_kind() {
            return true;
        }
        if self.kind != other.kind {
            return false;
        }
        if self.subtype == other.subtype {
            return true;
        }
        if self.subtype == WILDCARD || other.subtype == WILDCARD {
            return true;
        }
        match (self.is_wildcard_subtype(), other.is_wildcard_subtype()) {
            (true, false) => self.wildcard_suffix_matches(other),
            (false, true) => other.wildcard_suffix_matches(self),
            _ => false,
        }
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.kind, self.subtype)
    }
}
