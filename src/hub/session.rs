//! Subscriber sessions
//!
//! A session is split in two halves when it is created:
//! - [`SessionHandle`]: held by the coordinator, the only producer for the queue
//! - [`SubscriberSession`]: moved into the delivery task, the only consumer
//!
//! The delivery task drains the queue into a [`Transport`] until the transport
//! is cancelled, a write fails, or the hub shuts down. A [`DeregisterGuard`]
//! travels with the task so the coordinator is told to forget the session on
//! every exit path.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio_util::sync::CancellationToken;

use super::frame::Frame;
use crate::stats::SessionStats;
use crate::transport::Transport;

static NEXT_SESSION_ID: AtomicU64 = AtomicU64::new(1);

/// Per-instance session identity
///
/// Two sessions with the same diagnostic name still get distinct ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(u64);

impl SessionId {
    fn next() -> Self {
        Self(NEXT_SESSION_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Raw numeric id
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Why a frame could not be queued for a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnqueueError {
    /// Queue is at capacity; the frame is dropped for this session
    Full,
    /// Delivery loop is gone; deregistration is pending
    Closed,
}

impl std::fmt::Display for EnqueueError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EnqueueError::Full => write!(f, "Session queue full"),
            EnqueueError::Closed => write!(f, "Session closed"),
        }
    }
}

impl std::error::Error for EnqueueError {}

/// Coordinator-side half of a session
#[derive(Debug)]
pub struct SessionHandle {
    id: SessionId,
    name: Arc<str>,
    tx: mpsc::Sender<Frame>,
}

impl SessionHandle {
    /// Session id
    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Diagnostic name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Queue a frame without waiting
    pub fn enqueue(&self, frame: Frame) -> Result<(), EnqueueError> {
        match self.tx.try_send(frame) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => Err(EnqueueError::Full),
            Err(TrySendError::Closed(_)) => Err(EnqueueError::Closed),
        }
    }

    /// Number of frames waiting in the queue
    pub fn queued(&self) -> usize {
        self.tx.max_capacity() - self.tx.capacity()
    }
}

/// How a delivery loop ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    /// Transport signalled that the peer went away
    Cancelled,
    /// Writing or flushing a frame failed
    WriteFailed(std::io::ErrorKind),
    /// Hub is shutting down
    Shutdown,
    /// Coordinator released the queue
    QueueClosed,
}

/// Consumer-side half of a session, driven by its delivery task
#[derive(Debug)]
pub struct SubscriberSession {
    id: SessionId,
    name: Arc<str>,
    rx: mpsc::Receiver<Frame>,
}

impl SubscriberSession {
    /// Create a session with a bounded queue of `capacity` frames.
    ///
    /// Returns the session and the handle the coordinator enqueues through.
    pub fn new(name: impl Into<String>, capacity: usize) -> (Self, SessionHandle) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let id = SessionId::next();
        let name: Arc<str> = Arc::from(name.into());

        let handle = SessionHandle {
            id,
            name: Arc::clone(&name),
            tx,
        };

        (Self { id, name, rx }, handle)
    }

    /// Session id
    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Diagnostic name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Run the delivery loop until the transport or hub ends it.
    ///
    /// Each frame is written and flushed before the next is taken. Frames
    /// still queued when the loop ends are abandoned.
    pub async fn run<T: Transport>(
        mut self,
        mut transport: T,
        cancel: CancellationToken,
        shutdown: CancellationToken,
        guard: DeregisterGuard,
    ) -> (SessionEnd, SessionStats) {
        let _guard = guard;
        let started = Instant::now();
        let mut stats = SessionStats::new();

        let end = loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break SessionEnd::Cancelled,
                _ = shutdown.cancelled() => break SessionEnd::Shutdown,
                next = self.rx.recv() => {
                    let Some(frame) = next else {
                        break SessionEnd::QueueClosed;
                    };

                    tracing::debug!(session = %self.name, size = frame.len(), "Writing to client");

                    let written = tokio::select! {
                        biased;
                        _ = cancel.cancelled() => break SessionEnd::Cancelled,
                        _ = shutdown.cancelled() => break SessionEnd::Shutdown,
                        result = deliver(&mut transport, &frame) => result,
                    };

                    if let Err(e) = written {
                        tracing::warn!(session = %self.name, error = %e, "Client write failed");
                        break SessionEnd::WriteFailed(e.kind());
                    }

                    stats.record_frame(frame.len());
                }
            }
        };

        stats.duration = started.elapsed();

        tracing::info!(
            session = %self.name,
            id = %self.id,
            reason = ?end,
            frames = stats.frames_sent,
            bytes = stats.bytes_sent,
            "Client closed"
        );

        (end, stats)
    }

    #[cfg(test)]
    pub(crate) fn try_next(&mut self) -> Option<Frame> {
        self.rx.try_recv().ok()
    }
}

async fn deliver<T: Transport>(transport: &mut T, frame: &Frame) -> std::io::Result<()> {
    transport.write_frame(frame).await?;
    transport.flush().await
}

/// Requests deregistration of a session when dropped
///
/// Moved into the delivery task, so the request goes out however the task
/// ends, including a panic.
#[derive(Debug)]
pub struct DeregisterGuard {
    id: SessionId,
    tx: mpsc::UnboundedSender<SessionId>,
}

impl DeregisterGuard {
    /// Guard `id`, reporting to the coordinator's deregistration channel
    pub fn new(id: SessionId, tx: mpsc::UnboundedSender<SessionId>) -> Self {
        Self { id, tx }
    }
}

impl Drop for DeregisterGuard {
    fn drop(&mut self) {
        // Coordinator already gone means there is nothing left to deregister from
        let _ = self.tx.send(self.id);
    }
}
