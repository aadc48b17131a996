//! Hub handle: the entry points transports and publishers call into

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::config::HubConfig;
use super::coordinator::{Command, Coordinator};
use super::frame::BroadcastRequest;
use super::session::{DeregisterGuard, SessionEnd, SessionId, SubscriberSession};
use crate::error::HubError;
use crate::stats::{HubStats, SessionStats};
use crate::transport::Transport;

/// Cloneable handle to a running coordinator
///
/// The coordinator task is spawned on construction and runs until
/// [`shutdown`](Hub::shutdown) is called or the last handle is dropped.
#[derive(Debug, Clone)]
pub struct Hub {
    commands: mpsc::Sender<Command>,
    deregistrations: mpsc::UnboundedSender<SessionId>,
    shutdown: CancellationToken,
    config: Arc<HubConfig>,
}

impl Hub {
    /// Start a hub with default configuration
    ///
    /// Must be called from within a tokio runtime.
    pub fn new() -> Self {
        Self::with_config(HubConfig::default())
    }

    /// Start a hub with custom configuration
    pub fn with_config(config: HubConfig) -> Self {
        let (commands, command_rx) = mpsc::channel(config.command_capacity.max(1));
        let (deregistrations, deregistration_rx) = mpsc::unbounded_channel();
        let shutdown = CancellationToken::new();

        tokio::spawn(Coordinator::new().run(command_rx, deregistration_rx, shutdown.clone()));

        Self {
            commands,
            deregistrations,
            shutdown,
            config: Arc::new(config),
        }
    }

    /// Get the hub configuration
    pub fn config(&self) -> &HubConfig {
        &self.config
    }

    /// Open a subscriber session over `transport`.
    ///
    /// `cancel` is the transport's disconnect signal. The session is
    /// registered before this returns, and its delivery loop is running.
    /// Dropping the returned future does not abandon the session: it still
    /// registers and runs until `cancel` fires or the hub shuts down.
    pub async fn subscribe<T: Transport>(
        &self,
        name: impl Into<String>,
        transport: T,
        cancel: CancellationToken,
    ) -> Result<Subscription, HubError> {
        let name = name.into();

        if !transport.supports_flush() {
            tracing::warn!(session = %name, "Subscribe rejected: transport cannot flush");
            return Err(HubError::FlushUnsupported);
        }

        let (session, handle) = SubscriberSession::new(name, self.config.queue_capacity);
        let id = session.id();

        tracing::info!(session = %session.name(), id = %id, "Client connected");

        let commands = self.commands.clone();
        let deregistrations = self.deregistrations.clone();
        let shutdown = self.shutdown.clone();
        let (ready_tx, ready) = oneshot::channel();

        // Registration runs inside the delivery task: a dropped caller cannot
        // leave a registered session without a running loop
        let task = tokio::spawn(async move {
            let (ack, registered) = oneshot::channel();
            let accepted = match commands
                .send(Command::Register {
                    session: handle,
                    ack,
                })
                .await
            {
                Ok(()) => registered.await.is_ok(),
                Err(_) => false,
            };

            if !accepted {
                let _ = ready_tx.send(Err(HubError::CoordinatorClosed));
                return None;
            }

            let guard = DeregisterGuard::new(id, deregistrations);
            let _ = ready_tx.send(Ok(()));
            Some(session.run(transport, cancel, shutdown, guard).await)
        });

        match ready.await {
            Ok(Ok(())) => Ok(Subscription { id, task }),
            Ok(Err(e)) => Err(e),
            Err(_) => Err(HubError::CoordinatorClosed),
        }
    }

    /// Publish an event to every current subscriber.
    ///
    /// Returns once the coordinator has accepted the broadcast. Nothing is
    /// reported about individual subscribers.
    pub async fn publish(
        &self,
        event: impl Into<String>,
        data: impl Into<String>,
    ) -> Result<(), HubError> {
        self.submit(BroadcastRequest::new(event, data)).await
    }

    /// Hand a broadcast request to the coordinator.
    ///
    /// Waits until the coordinator takes the request, bounded by
    /// [`HubConfig::publish_timeout`] when set.
    pub async fn submit(&self, request: BroadcastRequest) -> Result<(), HubError> {
        match self.config.publish_timeout {
            Some(limit) => tokio::time::timeout(limit, self.hand_off(request))
                .await
                .map_err(|_| {
                    tracing::warn!(timeout = ?limit, "Publish not accepted in time");
                    HubError::PublishTimeout(limit)
                })?,
            None => self.hand_off(request).await,
        }
    }

    async fn hand_off(&self, request: BroadcastRequest) -> Result<(), HubError> {
        let (ack, accepted) = oneshot::channel();
        self.commands
            .send(Command::Broadcast { request, ack })
            .await
            .map_err(|_| HubError::CoordinatorClosed)?;
        accepted.await.map_err(|_| HubError::CoordinatorClosed)
    }

    /// Snapshot of hub statistics
    pub async fn stats(&self) -> Result<HubStats, HubError> {
        let (reply, rx) = oneshot::channel();
        self.commands
            .send(Command::Stats { reply })
            .await
            .map_err(|_| HubError::CoordinatorClosed)?;
        rx.await.map_err(|_| HubError::CoordinatorClosed)
    }

    /// Stop the coordinator and end every session's delivery loop
    pub fn shutdown(&self) {
        if !self.shutdown.is_cancelled() {
            tracing::info!("Hub shutting down");
            self.shutdown.cancel();
        }
    }

    /// Whether shutdown has been requested
    pub fn is_shutdown(&self) -> bool {
        self.shutdown.is_cancelled()
    }
}

impl Default for Hub {
    fn default() -> Self {
        Self::new()
    }
}

/// A running subscriber session
#[derive(Debug)]
pub struct Subscription {
    id: SessionId,
    task: JoinHandle<Option<(SessionEnd, SessionStats)>>,
}

impl Subscription {
    /// Session id
    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Whether the delivery loop has ended
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Wait for the delivery loop to end.
    ///
    /// Returns `None` if the task panicked or was aborted. Deregistration has
    /// been requested either way by the time this returns.
    pub async fn closed(self) -> Option<(SessionEnd, SessionStats)> {
        self.task.await.ok().flatten()
    }
}
