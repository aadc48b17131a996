//! HTTP handlers for subscribe, broadcast and stats

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::body::Body;
use axum::extract::{ConnectInfo, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio_util::sync::CancellationToken;

use super::config::ServerConfig;
use crate::error::HubError;
use crate::hub::{BroadcastRequest, Frame, Hub};
use crate::transport::{ChannelTransport, Transport};

#[derive(Clone)]
pub(crate) struct AppState {
    hub: Hub,
    limiter: Option<Arc<Semaphore>>,
}

pub(crate) fn router(hub: Hub, config: &ServerConfig) -> Router {
    let limiter = if config.max_subscribers > 0 {
        Some(Arc::new(Semaphore::new(config.max_subscribers)))
    } else {
        None
    };

    Router::new()
        .route(&config.subscribe_path, get(subscribe))
        .route(&config.broadcast_path, post(broadcast))
        .route(&config.stats_path, get(stats))
        .with_state(AppState { hub, limiter })
}

/// Channel transport that holds a subscriber slot for as long as it lives
struct LimitedTransport {
    inner: ChannelTransport,
    _permit: Option<OwnedSemaphorePermit>,
}

impl Transport for LimitedTransport {
    async fn write_frame(&mut self, frame: &Frame) -> io::Result<()> {
        self.inner.write_frame(frame).await
    }

    async fn flush(&mut self) -> io::Result<()> {
        self.inner.flush().await
    }

    fn supports_flush(&self) -> bool {
        self.inner.supports_flush()
    }
}

async fn subscribe(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
) -> Response {
    let permit = match state.limiter {
        Some(sem) => match sem.try_acquire_owned() {
            Ok(permit) => Some(permit),
            Err(_) => {
                tracing::warn!(peer = %peer, "Subscribe rejected: limit reached");
                return (StatusCode::SERVICE_UNAVAILABLE, "subscriber limit reached")
                    .into_response();
            }
        },
        None => None,
    };

    let cancel = CancellationToken::new();
    let (inner, body) = ChannelTransport::new(cancel.clone());
    let transport = LimitedTransport {
        inner,
        _permit: permit,
    };

    match state.hub.subscribe(peer.to_string(), transport, cancel).await {
        Ok(_subscription) => (
            [
                (header::CONTENT_TYPE, "text/event-stream"),
                (header::CACHE_CONTROL, "no-cache"),
                (header::ACCESS_CONTROL_ALLOW_ORIGIN, "*"),
            ],
            Body::from_stream(body),
        )
            .into_response(),
        Err(HubError::FlushUnsupported) => (StatusCode::BAD_REQUEST, "no flusher").into_response(),
        Err(e) => {
            tracing::warn!(peer = %peer, error = %e, "Subscribe failed");
            (StatusCode::SERVICE_UNAVAILABLE, e.to_string()).into_response()
        }
    }
}

async fn broadcast(
    State(state): State<AppState>,
    Json(request): Json<BroadcastRequest>,
) -> Response {
    match state.hub.submit(request).await {
        Ok(()) => StatusCode::ACCEPTED.into_response(),
        Err(e @ HubError::PublishTimeout(_)) => {
            (StatusCode::GATEWAY_TIMEOUT, e.to_string()).into_response()
        }
        Err(e) => (StatusCode::SERVICE_UNAVAILABLE, e.to_string()).into_response(),
    }
}

async fn stats(State(state): State<AppState>) -> Response {
    match state.hub.stats().await {
        Ok(stats) => Json(stats).into_response(),
        Err(e) => (StatusCode::SERVICE_UNAVAILABLE, e.to_string()).into_response(),
    }
}
