//! HTTP surface for the hub
//!
//! - `GET /sse` opens an event stream (one subscriber session per request)
//! - `POST /broadcast` with `{"event": ..., "data": ...}` publishes to all streams
//! - `GET /stats` reports hub counters as JSON

pub mod config;
pub mod listener;
mod routes;

pub use config::ServerConfig;
pub use listener::HubServer;
