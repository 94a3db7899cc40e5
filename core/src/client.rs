//! Turns endpoint descriptions into HTTP exchanges and classifies the outcome.
//!
//! # Design
//! `RequestExecutor` mirrors the host-does-IO split: `build_request` turns an
//! `EndpointRequest` into a `WireRequest`, `interpret_response` turns a
//! `WireResponse` into a `ResponsePayload` or a classified `Error`, and
//! `execute` runs the two around the configured `Transport`. Retries are not
//! the executor's concern; they come from wrapping the transport in a
//! `RetryingTransport`, which the builder does when a retry budget is set.

use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::Instrument;

use crate::config::{BridgeConfig, RetryConfig};
use crate::encode::{build_path, build_query, encode_body};
use crate::endpoint::EndpointRequest;
use crate::error::{BodyError, Error, ErrorBody};
use crate::http::{WireRequest, WireResponse};
use crate::media::MediaType;
use crate::retry::RetryingTransport;
use crate::stream::ByteStream;
use crate::supplier::Resolvable;
use crate::transport::Transport;
use crate::user_agent::{UserAgent, UserAgentEntry};

/// Header carrying the rendered user-agent chain.
pub const FETCH_USER_AGENT: &str = "Fetch-User-Agent";
const AUTHORIZATION: &str = "Authorization";
const CONTENT_TYPE: &str = "Content-Type";
const ACCEPT: &str = "Accept";
const NO_CONTENT: u16 = 204;

/// Successful outcome of an endpoint call.
#[derive(Debug)]
pub enum ResponsePayload {
    /// The server answered `204 No Content`.
    NoContent,
    Json(Value),
    Binary(Bytes),
    Stream(ByteStream),
    Text(String),
}

impl ResponsePayload {
    fn into_error_body(self) -> Option<ErrorBody> {
        match self {
            ResponsePayload::NoContent | ResponsePayload::Stream(_) => None,
            ResponsePayload::Json(value) => Some(ErrorBody::Json(value)),
            ResponsePayload::Binary(bytes) => Some(ErrorBody::Binary(bytes)),
            ResponsePayload::Text(text) => Some(ErrorBody::Text(text)),
        }
    }
}

/// Executes endpoint calls against one service.
#[derive(Clone)]
pub struct RequestExecutor {
    base_url: Resolvable<String>,
    token: Option<Resolvable<Option<String>>>,
    user_agent: UserAgent,
    transport: Arc<dyn Transport>,
}

impl fmt::Debug for RequestExecutor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestExecutor")
            .field("user_agent", &self.user_agent.as_str())
            .field("has_token", &self.token.is_some())
            .finish_non_exhaustive()
    }
}

impl RequestExecutor {
    pub fn builder() -> ExecutorBuilder {
        ExecutorBuilder::default()
    }

    /// The full chain sent in `Fetch-User-Agent`, ending with this library.
    pub fn user_agent(&self) -> &UserAgent {
        &self.user_agent
    }

    /// Resolve the URL, headers and body for one call without sending it.
    pub async fn build_request(&self, request: &EndpointRequest) -> Result<WireRequest, Error> {
        let path = build_path(&request.path, &request.path_args)?;
        let query = build_query(&request.query_args);
        let base_url = self.base_url.resolve().await.map_err(Error::other)?;

        let mut url = format!("{}/{}", base_url.trim_end_matches('/'), path);
        if !query.is_empty() {
            url.push('?');
            url.push_str(&query);
        }

        let mut headers: Vec<(String, String)> = request
            .headers
            .iter()
            .filter_map(|(name, value)| value.as_ref().map(|v| (name.clone(), v.to_string())))
            .collect();
        set_header(&mut headers, FETCH_USER_AGENT, self.user_agent.to_string());

        if let Some(token) = &self.token {
            if let Some(token) = token.resolve().await.map_err(Error::other)? {
                set_header(&mut headers, AUTHORIZATION, format!("Bearer {token}"));
            }
        }
        match request.request_media_type {
            // The transport fills in the multipart boundary.
            Some(MediaType::MultipartForm) | None => {}
            Some(media_type) => set_header(&mut headers, CONTENT_TYPE, media_type.to_string()),
        }
        if let Some(media_type) = request.response_media_type {
            set_header(&mut headers, ACCEPT, media_type.to_string());
        }

        let body = match &request.body {
            Some(payload) => encode_body(payload, request.request_media_type)?,
            None => None,
        };

        Ok(WireRequest {
            url,
            method: request.method,
            headers,
            body,
        })
    }

    /// Decode a response according to its status and `Content-Type`.
    ///
    /// With `stream_binary`, a successful `application/octet-stream` response
    /// is returned as a `ByteStream` without buffering.
    pub async fn interpret_response(
        &self,
        response: WireResponse,
        stream_binary: bool,
    ) -> Result<ResponsePayload, Error> {
        let status = response.status;
        if status == NO_CONTENT {
            return Ok(ResponsePayload::NoContent);
        }
        let success = response.is_success();
        let content_type = response.header(CONTENT_TYPE).unwrap_or_default().to_string();
        let body = response.body;

        if success && stream_binary && MediaType::OctetStream.matches(&content_type) {
            return Ok(ResponsePayload::Stream(body.into_stream()));
        }

        let payload = if MediaType::Json.matches(&content_type) {
            body.json().await.map(ResponsePayload::Json)
        } else if MediaType::OctetStream.matches(&content_type) {
            body.bytes()
                .await
                .map(ResponsePayload::Binary)
                .map_err(BodyError::from)
        } else {
            body.text().await.map(ResponsePayload::Text)
        }
        .map_err(|err| Error::parse(err, status))?;

        if !success {
            return Err(Error::status(status, payload.into_error_body()));
        }
        Ok(payload)
    }

    /// Build, send and interpret one call.
    pub async fn execute(&self, request: &EndpointRequest) -> Result<ResponsePayload, Error> {
        self.dispatch(request).await.map(|(_, payload)| payload)
    }

    /// Like [`RequestExecutor::execute`], decoding the body into `T`. Returns
    /// `None` for `204 No Content`.
    pub async fn call<T: DeserializeOwned>(
        &self,
        request: &EndpointRequest,
    ) -> Result<Option<T>, Error> {
        let (status, payload) = self.dispatch(request).await?;
        let value = match payload {
            ResponsePayload::NoContent => return Ok(None),
            ResponsePayload::Json(value) => value,
            ResponsePayload::Text(text) => Value::String(text),
            ResponsePayload::Binary(_) | ResponsePayload::Stream(_) => {
                return Err(Error::other(
                    "binary response cannot be decoded into a typed value, use `execute`",
                ))
            }
        };
        serde_json::from_value(value)
            .map(Some)
            .map_err(|err| Error::parse(err, status))
    }

    async fn dispatch(&self, request: &EndpointRequest) -> Result<(u16, ResponsePayload), Error> {
        let span = tracing::debug_span!(
            "endpoint_call",
            service = request.service_name.as_deref().unwrap_or_default(),
            endpoint = request.endpoint_name.as_deref().unwrap_or_default(),
            method = %request.method,
        );
        async {
            let wire = self.build_request(request).await?;
            tracing::debug!(url = %wire.url, "dispatching request");

            let response = self.transport.send(&wire).await.map_err(|err| {
                tracing::debug!(error = %err, "transport failed");
                Error::from(err)
            })?;
            let status = response.status;

            match self.interpret_response(response, request.wants_streamed_binary).await {
                Ok(payload) => Ok((status, payload)),
                Err(err) => {
                    tracing::debug!(status, kind = err.kind().as_str(), "call failed");
                    Err(err)
                }
            }
        }
        .instrument(span)
        .await
    }
}

/// Replace any header with the same name (ignoring case), then append.
fn set_header(headers: &mut Vec<(String, String)>, name: &str, value: String) {
    headers.retain(|(existing, _)| !existing.eq_ignore_ascii_case(name));
    headers.push((name.to_string(), value));
}

/// Builder for [`RequestExecutor`].
#[derive(Default)]
pub struct ExecutorBuilder {
    base_url: Option<Resolvable<String>>,
    token: Option<Resolvable<Option<String>>>,
    user_agents: Vec<UserAgentEntry>,
    transport: Option<Arc<dyn Transport>>,
    retry: Option<RetryConfig>,
}

impl ExecutorBuilder {
    /// Start from a loaded configuration: base URL, retry budget and user
    /// agents.
    pub fn from_config(config: BridgeConfig) -> Self {
        let mut builder = Self {
            user_agents: config.user_agents,
            retry: Some(config.retry),
            ..Self::default()
        };
        if let Some(base_url) = config.base_url {
            builder = builder.base_url(base_url);
        }
        builder
    }

    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(Resolvable::fixed(base_url.into()));
        self
    }

    /// Resolve the base URL on every call.
    pub fn base_url_supplier(mut self, base_url: Resolvable<String>) -> Self {
        self.base_url = Some(base_url);
        self
    }

    pub fn token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(Resolvable::fixed(Some(token.into())));
        self
    }

    /// Resolve the bearer token on every call; `None` sends no
    /// `Authorization` header.
    pub fn token_supplier(mut self, token: Resolvable<Option<String>>) -> Self {
        self.token = Some(token);
        self
    }

    /// Append a user agent. Add the most specific one first.
    pub fn user_agent(mut self, entry: UserAgentEntry) -> Self {
        self.user_agents.push(entry);
        self
    }

    pub fn transport(mut self, transport: impl Transport + 'static) -> Self {
        self.transport = Some(Arc::new(transport));
        self
    }

    pub fn shared_transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Retry 429 and 503 responses with exponential backoff.
    pub fn retry(mut self, retry: RetryConfig) -> Self {
        self.retry = Some(retry);
        self
    }

    pub fn build(self) -> Result<RequestExecutor, Error> {
        let base_url = self
            .base_url
            .ok_or_else(|| Error::other("a base URL is required"))?;
        let mut transport = match self.transport {
            Some(transport) => transport,
            None => default_transport()?,
        };
        if let Some(retry) = self.retry {
            transport = Arc::new(RetryingTransport::new(transport, retry.backoff()));
        }

        Ok(RequestExecutor {
            base_url,
            token: self.token,
            user_agent: UserAgent::new(self.user_agents).add_agent(UserAgentEntry::runtime()),
            transport,
        })
    }
}

#[cfg(feature = "reqwest")]
fn default_transport() -> Result<Arc<dyn Transport>, Error> {
    Ok(Arc::new(crate::reqwest_transport::ReqwestTransport::new()))
}

#[cfg(not(feature = "reqwest"))]
fn default_transport() -> Result<Arc<dyn Transport>, Error> {
    Err(Error::other(
        "no transport configured and the `reqwest` feature is disabled",
    ))
}
