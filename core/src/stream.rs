//! Pull-based byte streams for binary response bodies.
//!
//! # Design
//! `ByteStream` is the single stream type handed to callers, whatever the
//! transport produced: a native streaming body, a buffered body, or chunks
//! pushed by a callback-driven source through `channel()`.
//!
//! The push adapter is a bounded channel of capacity one. A producer holding
//! the `ChunkSink` suspends in `send` until the consumer has pulled the
//! previous chunk. Terminal signals consume the sink, so a source can finish
//! or fail exactly once. A sink dropped without either (a producer that
//! panicked or returned early) ends the stream with an error, never with a
//! clean end. Dropping or cancelling the stream closes the channel so the
//! producer observes `ConsumerGone` on its next send.

use std::fmt;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};

use bytes::{Bytes, BytesMut};
use futures_util::stream::{self, BoxStream, FusedStream, Stream, StreamExt};
use tokio::sync::mpsc;

use crate::error::BoxError;

/// Failure reported by the source of a byte stream.
#[derive(Debug, thiserror::Error)]
#[error("byte stream failed: {0}")]
pub struct StreamError(#[source] BoxError);

impl StreamError {
    pub fn new(source: impl Into<BoxError>) -> Self {
        Self(source.into())
    }
}

/// Returned to a producer once the consuming stream was dropped or cancelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("byte stream consumer went away")]
pub struct ConsumerGone;

type Chunk = Result<Bytes, StreamError>;

enum Source {
    Channel {
        rx: mpsc::Receiver<Chunk>,
        /// Set by `ChunkSink::finish`; a closed channel without it is an
        /// abandoned producer.
        finished: Arc<AtomicBool>,
    },
    Native(BoxStream<'static, Chunk>),
    Done,
}

/// A lazily pulled sequence of byte chunks.
///
/// The stream is fused: after it has yielded its end or an error, every
/// further poll returns `None`, and the underlying source has already been
/// released.
pub struct ByteStream {
    source: Source,
}

impl ByteStream {
    /// Adapt an already buffered body. An empty buffer yields no chunks.
    pub fn from_bytes(bytes: Bytes) -> Self {
        if bytes.is_empty() {
            return Self { source: Source::Done };
        }
        Self {
            source: Source::Native(stream::once(async move { Ok(bytes) }).boxed()),
        }
    }

    /// Wrap a native streaming body.
    pub fn from_stream<S, E>(inner: S) -> Self
    where
        S: Stream<Item = Result<Bytes, E>> + Send + 'static,
        E: Into<BoxError>,
    {
        Self {
            source: Source::Native(inner.map(|chunk| chunk.map_err(StreamError::new)).boxed()),
        }
    }

    /// Bridge a push-based source into a pull-based stream.
    pub fn channel() -> (ChunkSink, ByteStream) {
        let (tx, rx) = mpsc::channel(1);
        let finished = Arc::new(AtomicBool::new(false));
        let sink = ChunkSink {
            tx,
            finished: finished.clone(),
        };
        (sink, ByteStream { source: Source::Channel { rx, finished } })
    }

    /// Stop consuming and release the source. Producers see `ConsumerGone`.
    pub fn cancel(mut self) {
        if let Source::Channel { rx, .. } = &mut self.source {
            rx.close();
        }
        self.source = Source::Done;
    }

    /// Drain the remaining chunks into one buffer.
    pub async fn collect_bytes(mut self) -> Result<Bytes, StreamError> {
        let mut buffer = BytesMut::new();
        while let Some(chunk) = self.next().await {
            buffer.extend_from_slice(&chunk?);
        }
        Ok(buffer.freeze())
    }
}

impl fmt::Debug for ByteStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match self.source {
            Source::Channel { .. } => "channel",
            Source::Native(_) => "native",
            Source::Done => "done",
        };
        f.debug_struct("ByteStream").field("source", &state).finish()
    }
}

impl Stream for ByteStream {
    type Item = Chunk;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        let polled = match &mut this.source {
            Source::Done => return Poll::Ready(None),
            Source::Channel { rx, finished } => match rx.poll_recv(cx) {
                Poll::Ready(None) if !finished.load(Ordering::Acquire) => Poll::Ready(Some(Err(
                    StreamError::new("producer dropped before finishing"),
                ))),
                polled => polled,
            },
            Source::Native(inner) => inner.as_mut().poll_next(cx),
        };
        match polled {
            Poll::Pending => Poll::Pending,
            Poll::Ready(Some(Ok(chunk))) => Poll::Ready(Some(Ok(chunk))),
            Poll::Ready(Some(Err(err))) => {
                this.source = Source::Done;
                Poll::Ready(Some(Err(err)))
            }
            Poll::Ready(None) => {
                this.source = Source::Done;
                Poll::Ready(None)
            }
        }
    }
}

impl FusedStream for ByteStream {
    fn is_terminated(&self) -> bool {
        matches!(self.source, Source::Done)
    }
}

/// Producer half of `ByteStream::channel`.
#[derive(Debug)]
pub struct ChunkSink {
    tx: mpsc::Sender<Chunk>,
    finished: Arc<AtomicBool>,
}

impl ChunkSink {
    /// Queue one chunk, waiting while the previous one has not been pulled.
    pub async fn send(&self, chunk: Bytes) -> Result<(), ConsumerGone> {
        self.tx.send(Ok(chunk)).await.map_err(|_| ConsumerGone)
    }

    /// End the stream normally. Dropping the sink without calling this or
    /// [`ChunkSink::fail`] ends the stream with an error.
    pub fn finish(self) {
        self.finished.store(true, Ordering::Release);
    }

    /// End the stream with an error. The consumer sees it after any chunk
    /// still queued.
    pub async fn fail(self, err: impl Into<BoxError>) {
        // A consumer that already left has nothing to report to.
        let _ = self.tx.send(Err(StreamError::new(err))).await;
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    /// Resolves once the consumer dropped or cancelled the stream.
    pub async fn closed(&self) {
        self.tx.closed().await
    }
}
