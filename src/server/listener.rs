//! Hub HTTP server
//!
//! Binds the listener and serves the subscribe/broadcast routes on top of a
//! [`Hub`].

use std::future::Future;
use std::net::SocketAddr;

use tokio::net::TcpListener;

use crate::error::Result;
use crate::hub::{Hub, HubConfig};
use crate::server::config::ServerConfig;
use crate::server::routes;

/// Server-Sent Events hub server
pub struct HubServer {
    config: ServerConfig,
    hub: Hub,
}

impl HubServer {
    /// Create a new server with the given configuration
    ///
    /// Starts the hub coordinator, so this must run inside a tokio runtime.
    pub fn new(config: ServerConfig) -> Self {
        Self::with_hub_config(config, HubConfig::default())
    }

    /// Create a new server with custom hub configuration
    pub fn with_hub_config(config: ServerConfig, hub_config: HubConfig) -> Self {
        Self::with_hub(config, Hub::with_config(hub_config))
    }

    /// Serve an existing hub
    pub fn with_hub(config: ServerConfig, hub: Hub) -> Self {
        Self { config, hub }
    }

    /// Get a handle to the hub, e.g. to publish from in-process code
    pub fn hub(&self) -> &Hub {
        &self.hub
    }

    /// Get the bind address
    pub fn bind_addr(&self) -> SocketAddr {
        self.config.bind_addr
    }

    /// Run the server
    ///
    /// This method blocks until the server fails.
    pub async fn run(&self) -> Result<()> {
        self.run_until(std::future::pending()).await
    }

    /// Run the server with graceful shutdown
    pub async fn run_until<F>(&self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let listener = TcpListener::bind(self.config.bind_addr).await?;
        self.serve(listener, shutdown).await
    }

    /// Serve on an already bound listener until `shutdown` resolves.
    ///
    /// On shutdown the hub is stopped too, which ends every open event
    /// stream so in-flight responses can complete.
    pub async fn serve<F>(&self, listener: TcpListener, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = listener.local_addr()?;
        tracing::info!(
            addr = %addr,
            subscribe = %self.config.subscribe_path,
            broadcast = %self.config.broadcast_path,
            "SSE hub listening"
        );

        let app = routes::router(self.hub.clone(), &self.config);
        let hub = self.hub.clone();

        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(async move {
            shutdown.await;
            tracing::info!("Shutdown signal received");
            hub.shutdown();
        })
        .await?;

        tracing::info!(addr = %addr, "SSE hub stopped");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpStream;
    use tokio::sync::oneshot;

    use super::*;

    async fn start(config: ServerConfig) -> (SocketAddr, Hub, oneshot::Sender<()>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = HubServer::new(config);
        let hub = server.hub().clone();
        let (stop_tx, stop_rx) = oneshot::channel::<()>();

        tokio::spawn(async move {
            server
                .serve(listener, async move {
                    let _ = stop_rx.await;
                })
                .await
        });

        (addr, hub, stop_tx)
    }

    async fn read_until(stream: &mut TcpStream, buf: &mut String, needle: &str) {
        let mut chunk = [0u8; 1024];
        tokio::time::timeout(Duration::from_secs(5), async {
            while !buf.contains(needle) {
                let n = stream.read(&mut chunk).await.unwrap();
                assert!(n > 0, "connection closed before {:?} arrived", needle);
                buf.push_str(&String::from_utf8_lossy(&chunk[..n]));
            }
        })
        .await
        .expect("timed out waiting for response data");
    }

    async fn open_stream(addr: SocketAddr) -> (TcpStream, String) {
        let mut stream = TcpStream::connect(addr).await.unwrap();
        stream
            .write_all(b"GET /sse HTTP/1.1\r\nHost: localhost\r\n\r\n")
            .await
            .unwrap();

        let mut buf = String::new();
        read_until(&mut stream, &mut buf, "\r\n\r\n").await;
        (stream, buf)
    }

    #[tokio::test]
    async fn test_subscribe_headers_and_delivery() {
        let (addr, hub, _stop) = start(ServerConfig::default()).await;
        let (mut stream, head) = open_stream(addr).await;

        let head = head.to_ascii_lowercase();
        assert!(head.starts_with("http/1.1 200"));
        assert!(head.contains("content-type: text/event-stream"));
        assert!(head.contains("cache-control: no-cache"));
        assert!(head.contains("access-control-allow-origin: *"));

        hub.publish("ping", "a\nb").await.unwrap();

        let mut body = String::new();
        read_until(&mut stream, &mut body, "event: ping\ndata: a\ndata: b\n\n").await;
    }

    #[tokio::test]
    async fn test_broadcast_route() {
        let (addr, _hub, _stop) = start(ServerConfig::default()).await;
        let (mut subscriber, _) = open_stream(addr).await;

        let payload = r#"{"event":"news","data":"line1\nline2"}"#;
        let request = format!(
            "POST /broadcast HTTP/1.1\r\nHost: localhost\r\nContent-Type: application/json\r\nContent-Length: {}\r\n\r\n{}",
            payload.len(),
            payload
        );
        let mut publisher = TcpStream::connect(addr).await.unwrap();
        publisher.write_all(request.as_bytes()).await.unwrap();

        let mut reply = String::new();
        read_until(&mut publisher, &mut reply, "\r\n").await;
        assert!(reply.starts_with("HTTP/1.1 202"));

        let mut body = String::new();
        read_until(
            &mut subscriber,
            &mut body,
            "event: news\ndata: line1\ndata: line2\n\n",
        )
        .await;
    }

    #[tokio::test]
    async fn test_disconnect_deregisters() {
        let (addr, hub, _stop) = start(ServerConfig::default()).await;
        let (stream, _) = open_stream(addr).await;
        assert_eq!(hub.stats().await.unwrap().active_sessions, 1);

        drop(stream);

        tokio::time::timeout(Duration::from_secs(5), async {
            while hub.stats().await.unwrap().active_sessions != 0 {
                // The server only notices the close once it tries to write
                hub.publish("ping", "").await.unwrap();
                tokio::time::sleep(Duration::from_millis(20)).await;
            }
        })
        .await
        .expect("session was not removed after disconnect");
    }

    #[tokio::test]
    async fn test_subscriber_limit() {
        let (addr, _hub, _stop) = start(ServerConfig::default().max_subscribers(1)).await;
        let (_first, head) = open_stream(addr).await;
        assert!(head.starts_with("HTTP/1.1 200"));

        let (_second, head) = open_stream(addr).await;
        assert!(head.starts_with("HTTP/1.1 503"));
    }

    #[tokio::test]
    async fn test_shutdown_ends_streams() {
        let (addr, hub, stop) = start(ServerConfig::default()).await;
        let (mut stream, _) = open_stream(addr).await;

        stop.send(()).unwrap();

        // Terminating zero-length chunk, then the connection closes
        let mut rest = String::new();
        read_until(&mut stream, &mut rest, "0\r\n\r\n").await;
        assert!(hub.is_shutdown());
    }
}
