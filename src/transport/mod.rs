//! Subscriber transports
//!
//! A [`Transport`] is the write side of one subscriber's stream. The delivery
//! loop writes each frame and flushes immediately, so a transport has to be
//! able to push partial output to the peer. Transports that cannot do that
//! report it through [`Transport::supports_flush`] and are refused at
//! subscribe time.
//!
//! Two implementations are provided:
//! - [`IoTransport`] wraps any `AsyncWrite` (sockets, pipes, `tokio::io::duplex`)
//! - [`ChannelTransport`] feeds a streaming HTTP response body; see [`FrameStream`]

pub mod channel;

use std::future::Future;
use std::io;

use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::hub::Frame;

pub use channel::{ChannelTransport, FrameStream};

/// Write side of a subscriber stream
pub trait Transport: Send + 'static {
    /// Write one complete frame
    fn write_frame(&mut self, frame: &Frame) -> impl Future<Output = io::Result<()>> + Send;

    /// Push anything buffered by [`write_frame`](Self::write_frame) to the peer
    fn flush(&mut self) -> impl Future<Output = io::Result<()>> + Send;

    /// Whether [`flush`](Self::flush) actually reaches the peer
    fn supports_flush(&self) -> bool {
        true
    }
}

/// Transport over any async byte sink
#[derive(Debug)]
pub struct IoTransport<W> {
    inner: W,
}

impl<W> IoTransport<W>
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    /// Wrap a writer
    pub fn new(inner: W) -> Self {
        Self { inner }
    }

    /// Unwrap the writer
    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W> Transport for IoTransport<W>
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    async fn write_frame(&mut self, frame: &Frame) -> io::Result<()> {
        self.inner.write_all(frame.as_bytes()).await
    }

    async fn flush(&mut self) -> io::Result<()> {
        self.inner.flush().await
    }
}
