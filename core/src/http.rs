//! Wire-level request and response types exchanged with a `Transport`.
//!
//! # Design
//! The executor resolves an `EndpointRequest` into a `WireRequest` (a fully
//! built URL, stringified headers and an encoded body) and hands it to the
//! transport, which answers with a `WireResponse`. Response bodies are only
//! reachable through consuming accessors, so a body is read at most once.

use std::fmt;
use std::str::FromStr;

use bytes::Bytes;
use serde_json::Value;

use crate::error::BodyError;
use crate::stream::{ByteStream, StreamError};

/// HTTP method for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
    Patch,
    Head,
    Options,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Head => "HEAD",
            HttpMethod::Options => "OPTIONS",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a method name is not one of the supported verbs.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unsupported HTTP method `{0}`")]
pub struct UnknownMethod(pub String);

impl FromStr for HttpMethod {
    type Err = UnknownMethod;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(HttpMethod::Get),
            "POST" => Ok(HttpMethod::Post),
            "PUT" => Ok(HttpMethod::Put),
            "DELETE" => Ok(HttpMethod::Delete),
            "PATCH" => Ok(HttpMethod::Patch),
            "HEAD" => Ok(HttpMethod::Head),
            "OPTIONS" => Ok(HttpMethod::Options),
            _ => Err(UnknownMethod(s.to_string())),
        }
    }
}

/// Encoded request body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WireBody {
    Text(String),
    Bytes(Bytes),
}

impl WireBody {
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            WireBody::Text(text) => text.as_bytes(),
            WireBody::Bytes(bytes) => bytes,
        }
    }

    pub fn into_bytes(self) -> Bytes {
        match self {
            WireBody::Text(text) => Bytes::from(text),
            WireBody::Bytes(bytes) => bytes,
        }
    }
}

/// A fully resolved request, produced once per call and reissued unchanged
/// on every retry attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WireRequest {
    pub url: String,
    pub method: HttpMethod,
    pub headers: Vec<(String, String)>,
    pub body: Option<WireBody>,
}

impl WireRequest {
    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }
}

/// Body of a response as handed back by a transport.
///
/// Transports with a native streaming body return `Streaming`; the rest
/// buffer and return `Full`. Either way the caller sees the same accessors.
#[derive(Debug)]
pub enum ResponseBody {
    Full(Bytes),
    Streaming(ByteStream),
}

impl ResponseBody {
    pub fn empty() -> Self {
        ResponseBody::Full(Bytes::new())
    }

    /// Buffer the whole body.
    pub async fn bytes(self) -> Result<Bytes, StreamError> {
        match self {
            ResponseBody::Full(bytes) => Ok(bytes),
            ResponseBody::Streaming(stream) => stream.collect_bytes().await,
        }
    }

    /// Buffer the whole body and decode it as UTF-8, replacing invalid
    /// sequences.
    pub async fn text(self) -> Result<String, BodyError> {
        let bytes = self.bytes().await?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    pub async fn json(self) -> Result<Value, BodyError> {
        let bytes = self.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Pull-based view of the body. A buffered body becomes a single-chunk
    /// stream.
    pub fn into_stream(self) -> ByteStream {
        match self {
            ResponseBody::Full(bytes) => ByteStream::from_bytes(bytes),
            ResponseBody::Streaming(stream) => stream,
        }
    }
}

impl From<Bytes> for ResponseBody {
    fn from(bytes: Bytes) -> Self {
        ResponseBody::Full(bytes)
    }
}

impl From<&'static str> for ResponseBody {
    fn from(text: &'static str) -> Self {
        ResponseBody::Full(Bytes::from_static(text.as_bytes()))
    }
}

impl From<String> for ResponseBody {
    fn from(text: String) -> Self {
        ResponseBody::Full(Bytes::from(text))
    }
}

impl From<ByteStream> for ResponseBody {
    fn from(stream: ByteStream) -> Self {
        ResponseBody::Streaming(stream)
    }
}

/// A response as returned by a transport.
#[derive(Debug)]
pub struct WireResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: ResponseBody,
}

impl WireResponse {
    pub fn new(status: u16, body: impl Into<ResponseBody>) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: body.into(),
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Case-insensitive header lookup; the first matching header wins.
    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

fn find_header<'a>(headers: &'a [(String, String)], name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(name))
        .map(|(_, value)| value.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn method_parses_case_insensitively() {
        assert_eq!("get".parse::<HttpMethod>().unwrap(), HttpMethod::Get);
        assert_eq!("PATCH".parse::<HttpMethod>().unwrap(), HttpMethod::Patch);
        assert_eq!(
            "TRACE".parse::<HttpMethod>().unwrap_err(),
            UnknownMethod("TRACE".to_string())
        );
    }

    #[test]
    fn header_lookup_ignores_case() {
        let response = WireResponse::new(200, "").with_header("Content-Type", "text/plain");
        assert_eq!(response.header("content-type"), Some("text/plain"));
        assert_eq!(response.header("accept"), None);
    }

    #[test]
    fn success_range_is_2xx_only() {
        assert!(WireResponse::new(200, "").is_success());
        assert!(WireResponse::new(299, "").is_success());
        assert!(!WireResponse::new(302, "").is_success());
        assert!(!WireResponse::new(404, "").is_success());
    }

    #[tokio::test]
    async fn buffered_body_decodes_lossy_text() {
        let body = ResponseBody::Full(Bytes::from_static(b"caf\xc3\xa9 \xff"));
        assert_eq!(body.text().await.unwrap(), "café \u{fffd}");
    }

    #[tokio::test]
    async fn invalid_json_body_is_an_error() {
        let body = ResponseBody::from("Hello, world!");
        assert!(matches!(body.json().await, Err(BodyError::Json(_))));
    }
}
