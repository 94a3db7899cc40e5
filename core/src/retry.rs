//! Retries for overloaded servers.
//!
//! # Design
//! `RetryingTransport` wraps any transport and is itself a transport. It only
//! reacts to responses: `429 Too Many Requests` and `503 Service Unavailable`
//! are reissued while the backoff strategy allows it, every other response is
//! returned as is, and a transport failure is returned at once. Once the
//! budget is spent the last response is handed back unchanged; classifying it
//! is the executor's job.
//!
//! The attempt counter lives in the `send` call itself, so one
//! `RetryingTransport` can serve any number of concurrent calls.

use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;

use crate::http::{WireRequest, WireResponse};
use crate::transport::{Transport, TransportError};

/// Largest `Retry-After` value honoured, in milliseconds.
pub const MAX_RETRY_AFTER_MS: u64 = 60_000;

const TOO_MANY_REQUESTS: u16 = 429;
const SERVICE_UNAVAILABLE: u16 = 503;

/// Maps a zero-based attempt index to the delay before the next attempt, or
/// `None` to stop retrying.
pub trait BackoffStrategy: Send + Sync {
    fn backoff(&self, attempt: u32) -> Option<Duration>;
}

impl<F> BackoffStrategy for F
where
    F: Fn(u32) -> Option<Duration> + Send + Sync,
{
    fn backoff(&self, attempt: u32) -> Option<Duration> {
        self(attempt)
    }
}

/// Exponential backoff with full jitter: the delay after attempt `a` is drawn
/// uniformly from `[0, slot * 2^a)`, for at most `max_attempts` attempts in
/// total.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExponentialBackoff {
    max_attempts: u32,
    slot: Duration,
}

impl ExponentialBackoff {
    pub fn new(max_attempts: u32, slot: Duration) -> Self {
        Self { max_attempts, slot }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn slot(&self) -> Duration {
        self.slot
    }
}

/// Shorthand for `ExponentialBackoff::new` with the slot size in milliseconds.
pub fn exponential_backoff(max_attempts: u32, slot_ms: u64) -> ExponentialBackoff {
    ExponentialBackoff::new(max_attempts, Duration::from_millis(slot_ms))
}

impl BackoffStrategy for ExponentialBackoff {
    fn backoff(&self, attempt: u32) -> Option<Duration> {
        if attempt.saturating_add(1) >= self.max_attempts {
            return None;
        }
        let slot_ms = u64::try_from(self.slot.as_millis()).unwrap_or(u64::MAX);
        let upper = 1u64
            .checked_shl(attempt)
            .and_then(|factor| factor.checked_mul(slot_ms))
            .unwrap_or(u64::MAX);
        if upper == 0 {
            return Some(Duration::ZERO);
        }
        Some(Duration::from_millis(rand::thread_rng().gen_range(0..upper)))
    }
}

/// Transport decorator that reissues rate-limited and unavailable responses.
#[derive(Debug, Clone)]
pub struct RetryingTransport<T, B = ExponentialBackoff> {
    delegate: T,
    backoff: B,
}

impl<T, B> RetryingTransport<T, B> {
    pub fn new(delegate: T, backoff: B) -> Self {
        Self { delegate, backoff }
    }

    pub fn into_inner(self) -> T {
        self.delegate
    }
}

impl<T, B: BackoffStrategy> RetryingTransport<T, B> {
    /// Delay before reissuing after `response` on attempt `attempt`, or `None`
    /// if the response is final.
    fn retry_delay(&self, response: &WireResponse, attempt: u32) -> Option<Duration> {
        if response.status != TOO_MANY_REQUESTS && response.status != SERVICE_UNAVAILABLE {
            return None;
        }
        let suggested = self.backoff.backoff(attempt)?;
        Some(retry_after(response).unwrap_or(suggested))
    }
}

/// The `Retry-After` header as a delay, if its leading integer lies within
/// `[0, MAX_RETRY_AFTER_MS]`.
///
/// Only the leading run of digits counts, with an optional sign, so `"1.5"`
/// reads as 1 and `"120abc"` as 120. A value without leading digits is
/// ignored.
pub fn retry_after(response: &WireResponse) -> Option<Duration> {
    let value = response.header("Retry-After")?.trim_start();
    let (negative, unsigned) = match value.as_bytes().first() {
        Some(b'-') => (true, &value[1..]),
        Some(b'+') => (false, &value[1..]),
        _ => (false, value),
    };
    let end = unsigned
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(unsigned.len());
    let millis = unsigned[..end].parse::<u64>().ok()?;
    if negative && millis != 0 {
        return None;
    }
    (millis <= MAX_RETRY_AFTER_MS).then(|| Duration::from_millis(millis))
}

#[async_trait]
impl<T, B> Transport for RetryingTransport<T, B>
where
    T: Transport,
    B: BackoffStrategy,
{
    async fn send(&self, request: &WireRequest) -> Result<WireResponse, TransportError> {
        let mut attempt = 0u32;
        loop {
            tracing::debug!(attempt, url = %request.url, "sending request");
            let response = self.delegate.send(request).await?;
            if response.is_success() {
                return Ok(response);
            }
            let Some(delay) = self.retry_delay(&response, attempt) else {
                if attempt > 0 {
                    tracing::debug!(
                        attempt,
                        status = response.status,
                        "no retries left, returning last response"
                    );
                }
                return Ok(response);
            };
            tracing::warn!(
                attempt,
                status = response.status,
                delay_ms = delay.as_millis() as u64,
                "server overloaded, retrying"
            );
            drop(response);
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }
}
