//! Media types for request bodies and responses.
//!
//! # Design
//! `MediaType` is a closed set. Requests declare one to pick a body encoding;
//! responses are matched against the received `Content-Type` with `matches`,
//! which ignores case and parameters such as `charset`, so
//! `application/json; charset=utf-8` still decodes as JSON.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Media types understood for request encoding and response decoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MediaType {
    #[serde(rename = "application/json")]
    Json,
    #[serde(rename = "application/octet-stream")]
    OctetStream,
    #[serde(rename = "application/x-www-form-urlencoded")]
    FormUrlEncoded,
    #[serde(rename = "multipart/form-data")]
    MultipartForm,
    #[serde(rename = "text/plain")]
    TextPlain,
}

impl MediaType {
    pub const ALL: [MediaType; 5] = [
        MediaType::Json,
        MediaType::OctetStream,
        MediaType::FormUrlEncoded,
        MediaType::MultipartForm,
        MediaType::TextPlain,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MediaType::Json => "application/json",
            MediaType::OctetStream => "application/octet-stream",
            MediaType::FormUrlEncoded => "application/x-www-form-urlencoded",
            MediaType::MultipartForm => "multipart/form-data",
            MediaType::TextPlain => "text/plain",
        }
    }

    /// Whether a `Content-Type` header value names this media type. Parameters
    /// such as `charset` are tolerated.
    pub fn matches(&self, content_type: &str) -> bool {
        content_type.to_ascii_lowercase().contains(self.as_str())
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unrecognized media type `{0}`")]
pub struct UnknownMediaType(pub String);

impl FromStr for MediaType {
    type Err = UnknownMediaType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let essence = s.split(';').next().unwrap_or_default().trim();
        MediaType::ALL
            .into_iter()
            .find(|media| media.as_str().eq_ignore_ascii_case(essence))
            .ok_or_else(|| UnknownMediaType(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_canonical_names_and_parameters() {
        assert_eq!("application/json".parse::<MediaType>().unwrap(), MediaType::Json);
        assert_eq!(
            "text/plain; charset=utf-8".parse::<MediaType>().unwrap(),
            MediaType::TextPlain
        );
        assert!("image/png".parse::<MediaType>().is_err());
    }

    #[test]
    fn matches_is_case_insensitive_substring() {
        assert!(MediaType::Json.matches("Application/JSON;charset=UTF-8"));
        assert!(MediaType::OctetStream.matches("application/octet-stream"));
        assert!(!MediaType::Json.matches("text/plain"));
        assert!(!MediaType::Json.matches(""));
    }

    #[test]
    fn serializes_as_mime_string() {
        let json = serde_json::to_string(&MediaType::FormUrlEncoded).unwrap();
        assert_eq!(json, "\"application/x-www-form-urlencoded\"");
    }
}
