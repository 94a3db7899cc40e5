//! Default transport on top of `reqwest`.
//!
//! # Design
//! Available with the `reqwest` cargo feature (on by default). The response
//! body is never buffered here; it is wrapped as a `ByteStream`, and the
//! executor decides whether to stream or collect it. Connection-level
//! failures (connect, timeout, request send) map to
//! `TransportError::Network`, everything else to `TransportError::Other`.

use async_trait::async_trait;
use reqwest::header::{HeaderName, HeaderValue};

use crate::http::{ResponseBody, WireBody, WireRequest, WireResponse};
use crate::stream::ByteStream;
use crate::transport::{Transport, TransportError};

/// Sends requests with a shared `reqwest::Client`. Response bodies are always
/// exposed as native streams; buffering happens only when the caller asks
/// for text, JSON or bytes.
#[derive(Debug, Clone, Default)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: &WireRequest) -> Result<WireResponse, TransportError> {
        let method = reqwest::Method::from_bytes(request.method.as_str().as_bytes())
            .map_err(TransportError::other)?;
        let mut builder = self.client.request(method, &request.url);
        for (name, value) in &request.headers {
            let name = HeaderName::from_bytes(name.as_bytes()).map_err(TransportError::other)?;
            let value = HeaderValue::from_str(value).map_err(TransportError::other)?;
            builder = builder.header(name, value);
        }
        if let Some(body) = &request.body {
            builder = builder.body(match body {
                WireBody::Text(text) => reqwest::Body::from(text.clone()),
                WireBody::Bytes(bytes) => reqwest::Body::from(bytes.clone()),
            });
        }

        let response = builder.send().await.map_err(classify)?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|value| (name.as_str().to_string(), value.to_string()))
            })
            .collect();
        let body = ResponseBody::Streaming(ByteStream::from_stream(response.bytes_stream()));

        Ok(WireResponse { status, headers, body })
    }
}

fn classify(err: reqwest::Error) -> TransportError {
    if err.is_connect() || err.is_timeout() || err.is_request() {
        TransportError::Network(Box::new(err))
    } else {
        TransportError::Other(Box::new(err))
    }
}
