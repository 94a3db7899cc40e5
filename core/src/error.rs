//! Classified errors surfaced to callers of the executor.
//!
//! # Design
//! Every failure lands in exactly one of four kinds. `Network` means the
//! exchange never completed, `Parse` means it completed but the body could not
//! be decoded, `Status` means it completed with a non-success status, and
//! `Other` covers everything else, including invalid endpoint descriptions.
//! An `Error` is immutable once built: fields are private and only readable
//! through accessors.

use std::error::Error as StdError;
use std::fmt;

use bytes::Bytes;
use serde_json::{Map, Value};

use crate::stream::StreamError;
use crate::transport::TransportError;

/// Boxed error used for causes coming from transports, suppliers and streams.
pub type BoxError = Box<dyn StdError + Send + Sync>;

/// The four mutually exclusive failure kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Network,
    Parse,
    Status,
    Other,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Network => "NETWORK",
            ErrorKind::Parse => "PARSE",
            ErrorKind::Status => "STATUS",
            ErrorKind::Other => "OTHER",
        }
    }
}

/// Response body attached to a `Status` error, decoded per the response's
/// content type.
#[derive(Debug, Clone, PartialEq)]
pub enum ErrorBody {
    Json(Value),
    Text(String),
    Binary(Bytes),
}

impl ErrorBody {
    fn to_json(&self) -> Value {
        match self {
            ErrorBody::Json(value) => value.clone(),
            ErrorBody::Text(text) => Value::String(text.clone()),
            ErrorBody::Binary(bytes) => Value::String(format!("<{} bytes>", bytes.len())),
        }
    }
}

/// A classified failure of one endpoint call.
#[derive(Debug)]
pub struct Error {
    kind: ErrorKind,
    source: Option<BoxError>,
    status: Option<u16>,
    body: Option<ErrorBody>,
}

impl Error {
    pub fn network(source: impl Into<BoxError>) -> Self {
        Self {
            kind: ErrorKind::Network,
            source: Some(source.into()),
            status: None,
            body: None,
        }
    }

    pub fn parse(source: impl Into<BoxError>, status: u16) -> Self {
        Self {
            kind: ErrorKind::Parse,
            source: Some(source.into()),
            status: Some(status),
            body: None,
        }
    }

    pub fn status(status: u16, body: Option<ErrorBody>) -> Self {
        Self {
            kind: ErrorKind::Status,
            source: None,
            status: Some(status),
            body,
        }
    }

    pub fn other(source: impl Into<BoxError>) -> Self {
        Self {
            kind: ErrorKind::Other,
            source: Some(source.into()),
            status: None,
            body: None,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// HTTP status, present for `Parse` and `Status` errors.
    pub fn http_status(&self) -> Option<u16> {
        self.status
    }

    pub fn body(&self) -> Option<&ErrorBody> {
        self.body.as_ref()
    }

    /// The underlying cause, if any.
    pub fn cause(&self) -> Option<&(dyn StdError + Send + Sync + 'static)> {
        self.source.as_deref()
    }

    pub fn is_network(&self) -> bool {
        self.kind == ErrorKind::Network
    }

    pub fn is_status(&self) -> bool {
        self.kind == ErrorKind::Status
    }

    fn to_json(&self) -> Value {
        let mut fields = Map::new();
        if let Some(body) = &self.body {
            fields.insert("body".to_string(), body.to_json());
        }
        if let Some(source) = &self.source {
            fields.insert("originalError".to_string(), Value::String(source.to_string()));
        }
        if let Some(status) = self.status {
            fields.insert("status".to_string(), Value::from(status));
        }
        fields.insert("type".to_string(), Value::String(self.kind.as_str().to_string()));
        Value::Object(fields)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match serde_json::to_string_pretty(&self.to_json()) {
            Ok(rendered) => f.write_str(&rendered),
            Err(_) => write!(f, "{} error", self.kind.as_str()),
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source.as_deref().map(|e| e as &(dyn StdError + 'static))
    }
}

impl From<TransportError> for Error {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::Network(source) => Error::network(source),
            // A transport may already hand back a classified error.
            TransportError::Other(source) => match source.downcast::<Error>() {
                Ok(classified) => *classified,
                Err(source) => Error::other(source),
            },
        }
    }
}

/// Walk an error's source chain and return the first classified error.
pub fn find_classified<'a>(err: &'a (dyn StdError + 'static)) -> Option<&'a Error> {
    let mut current = Some(err);
    while let Some(candidate) = current {
        if let Some(classified) = candidate.downcast_ref::<Error>() {
            return Some(classified);
        }
        current = candidate.source();
    }
    None
}

/// Failure while reading or decoding a response body.
#[derive(Debug, thiserror::Error)]
pub enum BodyError {
    #[error("failed to read response body: {0}")]
    Read(#[from] StreamError),
    #[error("failed to decode JSON body: {0}")]
    Json(#[from] serde_json::Error),
}
