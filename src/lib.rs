//! # sse-hub
//!
//! A real-time event broadcast hub. Subscribers hold long-lived
//! Server-Sent Events streams; every published event is fanned out to all of
//! them on a best-effort basis. There is no history: a subscriber only sees
//! events published while it is connected.
//!
//! ## Quick start
//!
//! ```no_run
//! use sse_hub::{HubServer, ServerConfig};
//!
//! # async fn example() -> sse_hub::error::Result<()> {
//! let server = HubServer::new(ServerConfig::default());
//! let hub = server.hub().clone();
//!
//! tokio::spawn(async move {
//!     let _ = hub.publish("greeting", "hello\nworld").await;
//! });
//!
//! server.run().await
//! # }
//! ```
//!
//! ## Modules
//!
//! - [`hub`]: coordinator actor, subscriber sessions, frame encoding
//! - [`transport`]: the write side of a subscriber stream
//! - [`server`]: axum routes and listener
//! - [`stats`]: counters reported by the coordinator

pub mod error;
pub mod hub;
pub mod server;
pub mod stats;
pub mod transport;

pub use error::{Error, HubError, Result};
pub use hub::{encode, BroadcastRequest, Frame, Hub, HubConfig, Subscription};
pub use server::{HubServer, ServerConfig};
pub use stats::HubStats;
pub use transport::{ChannelTransport, IoTransport, Transport};
