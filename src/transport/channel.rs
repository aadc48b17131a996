//! Channel transport for streaming HTTP bodies
//!
//! ```text
//!   delivery loop ──write_frame()──► mpsc(1) ──► FrameStream ──► HTTP body
//!                                                    │
//!                                     dropped on disconnect
//!                                                    │
//!   delivery loop ◄──────── cancelled() ◄── DropGuard ┘
//! ```
//!
//! The HTTP server polls [`FrameStream`] as the response body and writes
//! each chunk out as soon as it is yielded. When the client goes away the
//! server drops the body, which cancels the session's token.

use std::convert::Infallible;
use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::Bytes;
use futures::Stream;
use tokio::sync::mpsc;
use tokio_util::sync::{CancellationToken, DropGuard};

use super::Transport;
use crate::hub::Frame;

/// Sending half: handed to the subscriber session
#[derive(Debug)]
pub struct ChannelTransport {
    tx: mpsc::Sender<Bytes>,
}

impl ChannelTransport {
    /// Create a transport and the body stream it feeds.
    ///
    /// `cancel` fires when the returned stream is dropped.
    pub fn new(cancel: CancellationToken) -> (Self, FrameStream) {
        // One slot: a frame is handed straight to the body, nothing piles up here
        let (tx, rx) = mpsc::channel(1);

        let stream = FrameStream {
            rx,
            _cancel_on_drop: cancel.drop_guard(),
        };

        (Self { tx }, stream)
    }
}

impl Transport for ChannelTransport {
    async fn write_frame(&mut self, frame: &Frame) -> io::Result<()> {
        self.tx
            .send(frame.bytes())
            .await
            .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "response body dropped"))
    }

    async fn flush(&mut self) -> io::Result<()> {
        // Frames are yielded to the body as whole chunks; nothing is held back
        Ok(())
    }
}

/// Receiving half: used as the streaming response body
pub struct FrameStream {
    rx: mpsc::Receiver<Bytes>,
    _cancel_on_drop: DropGuard,
}

impl Stream for FrameStream {
    type Item = Result<Bytes, Infallible>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx).map(|next| next.map(Ok))
    }
}

impl std::fmt::Debug for FrameStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameStream").finish_non_exhaustive()
    }
}
