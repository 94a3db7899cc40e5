//! Caller-facing description of one endpoint call.
//!
//! # Design
//! Generated service stubs fill in an `EndpointRequest` per call. Values that
//! travel in the URL or in headers are restricted to `ParamValue` scalars, and
//! request bodies to the closed `Payload` set, so whether a value can be sent
//! under a given media type is checked once, when the request is encoded.

use std::fmt;

use bytes::Bytes;
use serde::Serialize;
use serde_json::Value;

use crate::error::Error;
use crate::http::HttpMethod;
use crate::media::MediaType;

/// A scalar that can be rendered into a path segment, query value or header.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Str(s) => f.write_str(s),
            ParamValue::Int(n) => write!(f, "{n}"),
            ParamValue::Float(n) => f.write_str(&format_number(*n)),
            ParamValue::Bool(b) => write!(f, "{b}"),
        }
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        ParamValue::Str(value.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        ParamValue::Str(value)
    }
}

impl From<&String> for ParamValue {
    fn from(value: &String) -> Self {
        ParamValue::Str(value.clone())
    }
}

macro_rules! int_param {
    ($($ty:ty),*) => {
        $(impl From<$ty> for ParamValue {
            fn from(value: $ty) -> Self {
                ParamValue::Int(i64::from(value))
            }
        })*
    };
}

int_param!(i8, i16, i32, i64, u8, u16, u32);

macro_rules! wide_param {
    ($($ty:ty),*) => {
        $(impl From<$ty> for ParamValue {
            /// Values beyond `i64::MAX` keep their exact decimal digits.
            fn from(value: $ty) -> Self {
                i64::try_from(value).map_or_else(|_| ParamValue::Str(value.to_string()), ParamValue::Int)
            }
        })*
    };
}

wide_param!(u64, usize, isize);

impl From<f64> for ParamValue {
    fn from(value: f64) -> Self {
        ParamValue::Float(value)
    }
}

impl From<f32> for ParamValue {
    /// Widened through its shortest decimal form, so `0.1f32` renders as
    /// `0.1` rather than the nearest `f64`.
    fn from(value: f32) -> Self {
        ParamValue::Float(value.to_string().parse().unwrap_or(f64::from(value)))
    }
}

/// Render a float the way JSON-producing clients spell numbers: integral
/// values without a fraction, exponent form outside `[1e-6, 1e21)`, and
/// `NaN`/`Infinity` for non-finite values.
fn format_number(value: f64) -> String {
    if value.is_nan() {
        return "NaN".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    if value == 0.0 {
        return "0".to_string();
    }
    let magnitude = value.abs();
    if (1e-6..1e21).contains(&magnitude) {
        return value.to_string();
    }
    let rendered = format!("{value:e}");
    match rendered.split_once('e') {
        Some((mantissa, exponent)) if !exponent.starts_with('-') => format!("{mantissa}e+{exponent}"),
        _ => rendered,
    }
}

impl From<bool> for ParamValue {
    fn from(value: bool) -> Self {
        ParamValue::Bool(value)
    }
}

/// A query argument: absent, one value, or a list repeated under its key.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryValue {
    Null,
    Single(ParamValue),
    Many(Vec<ParamValue>),
}

macro_rules! single_query {
    ($($ty:ty),*) => {
        $(impl From<$ty> for QueryValue {
            fn from(value: $ty) -> Self {
                QueryValue::Single(value.into())
            }
        })*
    };
}

single_query!(
    ParamValue, &str, String, &String, i8, i16, i32, i64, isize, u8, u16, u32, u64, usize, f32, f64,
    bool
);

impl<T: Into<ParamValue>> From<Option<T>> for QueryValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(QueryValue::Null, |v| QueryValue::Single(v.into()))
    }
}

impl<T: Into<ParamValue>> From<Vec<T>> for QueryValue {
    fn from(values: Vec<T>) -> Self {
        QueryValue::Many(values.into_iter().map(Into::into).collect())
    }
}

/// Request body, interpreted according to the declared request media type.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Json(Value),
    Text(String),
    Bytes(Bytes),
}

/// Everything needed to issue one endpoint call.
#[derive(Debug, Clone, PartialEq)]
pub struct EndpointRequest {
    /// Service name, only used for diagnostics.
    pub service_name: Option<String>,
    /// Endpoint name, only used for diagnostics.
    pub endpoint_name: Option<String>,
    pub method: HttpMethod,
    /// Template such as `/catalog/{datasetRid}/branches/{branch}`.
    pub path: String,
    /// Substituted positionally into the placeholders of `path`.
    pub path_args: Vec<Option<ParamValue>>,
    pub query_args: Vec<(String, QueryValue)>,
    pub headers: Vec<(String, Option<ParamValue>)>,
    pub body: Option<Payload>,
    pub request_media_type: Option<MediaType>,
    pub response_media_type: Option<MediaType>,
    /// Return `application/octet-stream` responses as a `ByteStream`
    /// instead of a buffer.
    pub wants_streamed_binary: bool,
}

impl EndpointRequest {
    pub fn new(method: HttpMethod, path: impl Into<String>) -> Self {
        Self {
            service_name: None,
            endpoint_name: None,
            method,
            path: path.into(),
            path_args: Vec::new(),
            query_args: Vec::new(),
            headers: Vec::new(),
            body: None,
            request_media_type: None,
            response_media_type: None,
            wants_streamed_binary: false,
        }
    }

    pub fn named(mut self, service: impl Into<String>, endpoint: impl Into<String>) -> Self {
        self.service_name = Some(service.into());
        self.endpoint_name = Some(endpoint.into());
        self
    }

    pub fn path_arg(mut self, value: impl Into<ParamValue>) -> Self {
        self.path_args.push(Some(value.into()));
        self
    }

    /// A `None` argument renders as an empty path segment.
    pub fn optional_path_arg<T: Into<ParamValue>>(mut self, value: Option<T>) -> Self {
        self.path_args.push(value.map(Into::into));
        self
    }

    pub fn query(mut self, key: impl Into<String>, value: impl Into<QueryValue>) -> Self {
        self.query_args.push((key.into(), value.into()));
        self
    }

    pub fn query_many<I, T>(mut self, key: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<ParamValue>,
    {
        let values = values.into_iter().map(Into::into).collect();
        self.query_args.push((key.into(), QueryValue::Many(values)));
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.headers.push((name.into(), Some(value.into())));
        self
    }

    /// A `None` header is dropped rather than sent.
    pub fn optional_header<T: Into<ParamValue>>(
        mut self,
        name: impl Into<String>,
        value: Option<T>,
    ) -> Self {
        self.headers.push((name.into(), value.map(Into::into)));
        self
    }

    pub fn body(mut self, payload: Payload, media_type: MediaType) -> Self {
        self.body = Some(payload);
        self.request_media_type = Some(media_type);
        self
    }

    /// Serialize `value` as the JSON request body.
    pub fn json_body<T: Serialize + ?Sized>(self, value: &T) -> Result<Self, Error> {
        let value = serde_json::to_value(value).map_err(Error::other)?;
        Ok(self.body(Payload::Json(value), MediaType::Json))
    }

    pub fn accept(mut self, media_type: MediaType) -> Self {
        self.response_media_type = Some(media_type);
        self
    }

    pub fn stream_binary(mut self) -> Self {
        self.wants_streamed_binary = true;
        self
    }
}
