//! Server configuration

use std::net::{Ipv4Addr, SocketAddr};

/// HTTP server configuration options
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind to
    pub bind_addr: SocketAddr,

    /// Maximum concurrent subscribers (0 = unlimited)
    pub max_subscribers: usize,

    /// Route that opens an event stream
    pub subscribe_path: String,

    /// Route that accepts broadcasts
    pub broadcast_path: String,

    /// Route that reports hub statistics
    pub stats_path: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from((Ipv4Addr::UNSPECIFIED, 8080)),
            max_subscribers: 0, // Unlimited
            subscribe_path: "/sse".to_string(),
            broadcast_path: "/broadcast".to_string(),
            stats_path: "/stats".to_string(),
        }
    }
}

impl ServerConfig {
    /// Create a new config with custom bind address
    pub fn with_addr(addr: SocketAddr) -> Self {
        Self {
            bind_addr: addr,
            ..Default::default()
        }
    }

    /// Set the bind address
    pub fn bind(mut self, addr: SocketAddr) -> Self {
        self.bind_addr = addr;
        self
    }

    /// Set maximum concurrent subscribers
    pub fn max_subscribers(mut self, max: usize) -> Self {
        self.max_subscribers = max;
        self
    }

    /// Set the subscribe route
    pub fn subscribe_path(mut self, path: impl Into<String>) -> Self {
        self.subscribe_path = path.into();
        self
    }

    /// Set the broadcast route
    pub fn broadcast_path(mut self, path: impl Into<String>) -> Self {
        self.broadcast_path = path.into();
        self
    }
}
