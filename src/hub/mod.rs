//! Broadcast hub core
//!
//! The hub fans published events out to every connected subscriber. A single
//! coordinator task owns the subscriber set; everything else talks to it by
//! message.
//!
//! # Architecture
//!
//! ```text
//!   publish() ──Broadcast──┐
//!   subscribe() ─Register──┤         Coordinator task
//!                          ├──► ┌──────────────────────────┐
//!   DeregisterGuard ───────┘    │ sessions: HashMap<       │
//!        (on drop)              │   SessionId,             │
//!                               │   SessionHandle { tx }   │
//!                               │ >                        │
//!                               └────────────┬─────────────┘
//!                                            │ encode once, try_send
//!              ┌─────────────────────────────┼──────────────────────┐
//!              ▼                             ▼                      ▼
//!        queue (bounded)               queue (bounded)        queue (bounded)
//!              │                             │                      │
//!       delivery loop                  delivery loop          delivery loop
//!              │ write + flush               │                      │
//!              ▼                             ▼                      ▼
//!          Transport                     Transport              Transport
//! ```
//!
//! # Delivery semantics
//!
//! Best effort, at most once. A full subscriber queue drops the frame for
//! that subscriber only; publishers are never told. Frames are encoded once
//! into `bytes::Bytes` and shared by reference count across all queues.

pub mod config;
pub mod coordinator;
pub mod frame;
pub mod handle;
pub mod session;

pub use config::HubConfig;
pub use coordinator::{Coordinator, FanOut};
pub use frame::{encode, BroadcastRequest, Frame};
pub use handle::{Hub, Subscription};
pub use session::{
    DeregisterGuard, EnqueueError, SessionEnd, SessionHandle, SessionId, SubscriberSession,
};
