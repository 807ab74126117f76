//! Transport queue seams.
//!
//! The dispatcher does not own a transport. It consumes anything that yields
//! ordered byte messages until closed ([`QueueSource`]) and produces into
//! anything that accepts them ([`QueueSink`]). Tokio `mpsc` channels are the
//! in-process implementation.

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::mpsc;

/// The queue refused a message because it is closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("transport queue is closed")]
pub struct QueueClosed;

/// Consumer end of a transport queue.
#[async_trait]
pub trait QueueSource: Send {
    /// Waits for the next message. Returns `None` once the queue is closed
    /// and drained.
    async fn recv(&mut self) -> Option<Bytes>;
}

/// Producer end of a transport queue. Safe to share between producers.
#[async_trait]
pub trait QueueSink: Send + Sync {
    /// Pushes one message, waiting for capacity if the queue is bounded.
    ///
    /// # Errors
    ///
    /// Returns [`QueueClosed`] if the consumer end is gone.
    async fn send(&self, message: Bytes) -> Result<(), QueueClosed>;
}

#[async_trait]
impl QueueSource for mpsc::Receiver<Bytes> {
    async fn recv(&mut self) -> Option<Bytes> {
        mpsc::Receiver::recv(self).await
    }
}

#[async_trait]
impl QueueSource for mpsc::UnboundedReceiver<Bytes> {
    async fn recv(&mut self) -> Option<Bytes> {
        mpsc::UnboundedReceiver::recv(self).await
    }
}

#[async_trait]
impl QueueSink for mpsc::Sender<Bytes> {
    async fn send(&self, message: Bytes) -> Result<(), QueueClosed> {
        mpsc::Sender::send(self, message)
            .await
            .map_err(|_| QueueClosed)
    }
}

#[async_trait]
impl QueueSink for mpsc::UnboundedSender<Bytes> {
    async fn send(&self, message: Bytes) -> Result<(), QueueClosed> {
        mpsc::UnboundedSender::send(self, message).map_err(|_| QueueClosed)
    }
}

/// Creates an in-memory queue holding at most `capacity` messages.
///
/// # Panics
///
/// Panics if `capacity` is zero.
#[must_use]
pub fn bounded(capacity: usize) -> (mpsc::Sender<Bytes>, mpsc::Receiver<Bytes>) {
    mpsc::channel(capacity)
}

/// Creates an in-memory queue without a capacity limit.
#[must_use]
pub fn unbounded() -> (mpsc::UnboundedSender<Bytes>, mpsc::UnboundedReceiver<Bytes>) {
    mpsc::unbounded_channel()
}
