//! Path, query string and body encoding.
//!
//! # Design
//! All three encoders are pure functions over an `EndpointRequest`'s parts,
//! so they run before any I/O and a malformed request fails with an `Other`
//! error without touching the network. Path segments and query components
//! use the `encodeURIComponent` character set. Body encoding is a match over
//! (media type, payload) pairs; a pair with no rule is an error rather than a
//! best-effort conversion.

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde_json::Value;

use crate::endpoint::{ParamValue, Payload, QueryValue};
use crate::error::Error;
use crate::http::WireBody;
use crate::media::MediaType;

/// Everything except the characters `encodeURIComponent` leaves alone.
const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Percent-encode one URL component (path segment, query key or value).
pub fn encode_component(input: &str) -> String {
    utf8_percent_encode(input, COMPONENT).to_string()
}

/// Substitute `path_args` into the `{...}` placeholders of `template`, left
/// to right. A single leading slash is dropped and `None` arguments become
/// empty segments.
pub fn build_path(template: &str, path_args: &[Option<ParamValue>]) -> Result<String, Error> {
    let template = template.strip_prefix('/').unwrap_or(template);
    let mut path = String::with_capacity(template.len());
    let mut args = path_args.iter();
    let mut placeholders = 0usize;
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        let after = &rest[open + 1..];
        let close = match after.find('}') {
            Some(0) | None => {
                // `{}` and an unclosed `{` are literal text.
                path.push_str(&rest[..=open]);
                rest = after;
                continue;
            }
            Some(close) => close,
        };
        placeholders += 1;
        path.push_str(&rest[..open]);
        if let Some(Some(value)) = args.next() {
            path.push_str(&encode_component(&value.to_string()));
        }
        rest = &after[close + 1..];
    }
    path.push_str(rest);

    if placeholders != path_args.len() {
        return Err(Error::other(format!(
            "path template `{template}` has {placeholders} placeholders but {} arguments were given",
            path_args.len()
        )));
    }
    Ok(path)
}

/// Render query arguments as `k=v&k=v`, without the leading `?`. Null values
/// are skipped, lists repeat their key, and keys are never deduplicated.
pub fn build_query(query_args: &[(String, QueryValue)]) -> String {
    let mut pairs = Vec::new();
    for (key, value) in query_args {
        match value {
            QueryValue::Null => {}
            QueryValue::Single(value) => pairs.push(query_pair(key, value)),
            QueryValue::Many(values) => {
                pairs.extend(values.iter().map(|value| query_pair(key, value)));
            }
        }
    }
    pairs.join("&")
}

fn query_pair(key: &str, value: &ParamValue) -> String {
    format!("{}={}", encode_component(key), encode_component(&value.to_string()))
}

/// Encode a request body for the declared media type.
///
/// Returns `Ok(None)` for a JSON `null` payload, which is not sent at all.
pub fn encode_body(
    payload: &Payload,
    media_type: Option<MediaType>,
) -> Result<Option<WireBody>, Error> {
    if matches!(payload, Payload::Json(Value::Null)) {
        return Ok(None);
    }
    let media_type = media_type.ok_or_else(|| Error::other("unrecognized request media type"))?;

    let body = match (media_type, payload) {
        (MediaType::Json, Payload::Json(value)) => WireBody::Text(to_json(value)?),
        (MediaType::Json, Payload::Text(text)) => {
            WireBody::Text(to_json(&Value::String(text.clone()))?)
        }
        (MediaType::OctetStream | MediaType::MultipartForm, Payload::Bytes(bytes)) => {
            WireBody::Bytes(bytes.clone())
        }
        (MediaType::OctetStream | MediaType::MultipartForm, Payload::Text(text)) => {
            WireBody::Text(text.clone())
        }
        (MediaType::OctetStream | MediaType::MultipartForm, Payload::Json(Value::String(text))) => {
            WireBody::Text(text.clone())
        }
        (MediaType::FormUrlEncoded, Payload::Json(Value::Object(fields))) => {
            WireBody::Text(build_query(&form_fields(fields)?))
        }
        (MediaType::FormUrlEncoded, Payload::Text(text)) => WireBody::Text(text.clone()),
        (MediaType::TextPlain, Payload::Text(text)) => WireBody::Text(text.clone()),
        (MediaType::TextPlain, Payload::Json(value)) => match scalar(value) {
            Some(value) => WireBody::Text(value.to_string()),
            None => {
                return Err(Error::other(
                    "invalid data: cannot send object as request media type text/plain",
                ))
            }
        },
        (MediaType::TextPlain, Payload::Bytes(_)) => {
            return Err(Error::other(
                "invalid data: cannot send object as request media type text/plain",
            ))
        }
        (media_type, _) => {
            return Err(Error::other(format!(
                "invalid data: payload cannot be sent as request media type {media_type}"
            )))
        }
    };
    Ok(Some(body))
}

fn to_json(value: &Value) -> Result<String, Error> {
    serde_json::to_string(value).map_err(Error::other)
}

fn scalar(value: &Value) -> Option<ParamValue> {
    match value {
        Value::String(s) => Some(ParamValue::Str(s.clone())),
        Value::Bool(b) => Some(ParamValue::Bool(*b)),
        Value::Number(n) => Some(match n.as_i64() {
            Some(i) => ParamValue::Int(i),
            None => ParamValue::Float(n.as_f64().unwrap_or_default()),
        }),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

fn form_fields(fields: &serde_json::Map<String, Value>) -> Result<Vec<(String, QueryValue)>, Error> {
    fields
        .iter()
        .map(|(key, value)| {
            let value = match value {
                Value::Null => QueryValue::Null,
                Value::Array(items) => QueryValue::Many(
                    items
                        .iter()
                        .map(|item| scalar(item).ok_or_else(|| nested_form_value(key)))
                        .collect::<Result<_, _>>()?,
                ),
                other => QueryValue::Single(scalar(other).ok_or_else(|| nested_form_value(key))?),
            };
            Ok((key.clone(), value))
        })
        .collect()
}

fn nested_form_value(key: &str) -> Error {
    Error::other(format!("invalid data: form field `{key}` is not a scalar"))
}
