//! Transport runtime for generated RPC clients.
//!
//! # Overview
//! Generated client code describes each call as an [`EndpointRequest`]
//! (method, path template, arguments, body and media types). A
//! [`RequestExecutor`] turns that description into an HTTP exchange through a
//! pluggable [`Transport`] and returns a decoded [`ResponsePayload`] or a
//! classified [`Error`].
//!
//! # Design
//! - Request building and response interpretation are plain async methods on
//!   the executor; the network round-trip sits behind the `Transport` trait,
//!   so everything above it is testable with in-memory transports.
//! - Every failure is one of four kinds (network, parse, status, other), see
//!   [`ErrorKind`].
//! - 429 and 503 responses are retried by [`RetryingTransport`], a transport
//!   decorator with exponential full-jitter backoff that honors
//!   `Retry-After`.
//! - Binary responses can be consumed as a pull-based [`ByteStream`] with
//!   backpressure; push-style producers feed one through a [`ChunkSink`].
//! - The `reqwest` feature (on by default) provides [`ReqwestTransport`].

pub mod client;
pub mod config;
pub mod encode;
pub mod endpoint;
pub mod error;
pub mod http;
pub mod media;
#[cfg(feature = "reqwest")]
pub mod reqwest_transport;
pub mod retry;
pub mod stream;
pub mod supplier;
pub mod transport;
pub mod user_agent;

pub use client::{ExecutorBuilder, RequestExecutor, ResponsePayload};
pub use config::{BridgeConfig, ConfigError, RetryConfig};
pub use endpoint::{EndpointRequest, ParamValue, Payload, QueryValue};
pub use error::{find_classified, BoxError, Error, ErrorBody, ErrorKind};
pub use http::{HttpMethod, ResponseBody, WireBody, WireRequest, WireResponse};
pub use media::MediaType;
#[cfg(feature = "reqwest")]
pub use reqwest_transport::ReqwestTransport;
pub use retry::{exponential_backoff, BackoffStrategy, ExponentialBackoff, RetryingTransport};
pub use stream::{ByteStream, ChunkSink, StreamError};
pub use supplier::Resolvable;
pub use transport::{transport_fn, Transport, TransportError};
pub use user_agent::{UserAgent, UserAgentEntry};
