//! Coordinator actor
//!
//! The coordinator exclusively owns the active session set. Everything that
//! touches the set arrives as a message and is handled one at a time, so
//! register, deregister and broadcast are totally ordered and no lock is
//! needed around the map.

use std::collections::HashMap;

use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;

use super::frame::BroadcastRequest;
use super::session::{EnqueueError, SessionHandle, SessionId};
use crate::stats::{HubCounters, HubStats};

/// Messages accepted by the coordinator mailbox
#[derive(Debug)]
pub(crate) enum Command {
    /// Add a session; replies with the new active count
    Register {
        session: SessionHandle,
        ack: oneshot::Sender<usize>,
    },
    /// Fan a broadcast out; replies as soon as the request is accepted
    Broadcast {
        request: BroadcastRequest,
        ack: oneshot::Sender<()>,
    },
    /// Report current statistics
    Stats { reply: oneshot::Sender<HubStats> },
}

/// Outcome of one broadcast across the active set
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FanOut {
    /// Sessions the frame was queued for
    pub enqueued: usize,
    /// Sessions whose queue was full
    pub dropped_full: usize,
    /// Sessions whose delivery loop had already ended
    pub dropped_closed: usize,
}

/// Owner of the active session set
#[derive(Debug, Default)]
pub struct Coordinator {
    sessions: HashMap<SessionId, SessionHandle>,
    counters: HubCounters,
}

impl Coordinator {
    /// Create an empty coordinator
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of active sessions
    pub fn active_count(&self) -> usize {
        self.sessions.len()
    }

    /// Whether a session is currently registered
    pub fn contains(&self, id: SessionId) -> bool {
        self.sessions.contains_key(&id)
    }

    /// Current statistics
    pub fn stats(&self) -> HubStats {
        self.counters.snapshot(self.sessions.len())
    }

    /// Add a session to the active set. Returns the new active count.
    pub fn register(&mut self, session: SessionHandle) -> usize {
        let id = session.id();
        let name = session.name().to_owned();

        self.sessions.insert(id, session);
        self.counters.total_sessions += 1;

        tracing::info!(
            session = %name,
            id = %id,
            clients = self.sessions.len(),
            "New client"
        );

        self.sessions.len()
    }

    /// Remove a session if present. Returns whether it was removed.
    pub fn deregister(&mut self, id: SessionId) -> bool {
        match self.sessions.remove(&id) {
            Some(session) => {
                tracing::info!(
                    session = %session.name(),
                    id = %id,
                    clients = self.sessions.len(),
                    "Removed client"
                );
                true
            }
            None => {
                tracing::debug!(id = %id, "Deregister for unknown session ignored");
                false
            }
        }
    }

    /// Encode once and queue the frame for every active session without waiting.
    ///
    /// A full queue only costs that session this frame.
    pub fn broadcast(&mut self, request: &BroadcastRequest) -> FanOut {
        tracing::info!(
            count = self.sessions.len(),
            event = %request.event,
            size = request.data.len(),
            "Broadcast to clients"
        );

        let frame = request.encode();
        let mut fan_out = FanOut::default();

        for session in self.sessions.values() {
            match session.enqueue(frame.clone()) {
                Ok(()) => fan_out.enqueued += 1,
                Err(EnqueueError::Full) => {
                    fan_out.dropped_full += 1;
                    tracing::warn!(
                        session = %session.name(),
                        id = %session.id(),
                        event = %request.event,
                        "Client queue full, frame dropped"
                    );
                }
                Err(EnqueueError::Closed) => {
                    fan_out.dropped_closed += 1;
                    tracing::debug!(
                        session = %session.name(),
                        id = %session.id(),
                        "Client gone, deregistration pending"
                    );
                }
            }
        }

        self.counters.broadcasts += 1;
        self.counters.frames_enqueued += fan_out.enqueued as u64;
        self.counters.frames_dropped += (fan_out.dropped_full + fan_out.dropped_closed) as u64;

        fan_out
    }

    /// Serve the mailbox until shutdown or until every hub handle is dropped
    pub(crate) async fn run(
        mut self,
        mut commands: mpsc::Receiver<Command>,
        mut deregistrations: mpsc::UnboundedReceiver<SessionId>,
        shutdown: CancellationToken,
    ) {
        tracing::debug!("Coordinator started");

        loop {
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                Some(id) = deregistrations.recv() => {
                    self.deregister(id);
                }
                command = commands.recv() => match command {
                    Some(command) => self.handle(command),
                    None => break,
                },
            }
        }

        tracing::info!(
            clients = self.sessions.len(),
            broadcasts = self.counters.broadcasts,
            "Coordinator stopped"
        );
    }

    fn handle(&mut self, command: Command) {
        match command {
            Command::Register { session, ack } => {
                let count = self.register(session);
                let _ = ack.send(count);
            }
            Command::Broadcast { request, ack } => {
                // Release the publisher first; fan-out itself never waits
                let _ = ack.send(());
                self.broadcast(&request);
            }
            Command::Stats { reply } => {
                let _ = reply.send(self.stats());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hub::session::SubscriberSession;

    fn ping() -> BroadcastRequest {
        BroadcastRequest::new("ping", "a\nb")
    }

    #[test]
    fn test_register_deregister_counts() {
        let mut coordinator = Coordinator::new();
        let (_a, a) = SubscriberSession::new("a", 8);
        let (_b, b) = SubscriberSession::new("b", 8);
        let (a_id, b_id) = (a.id(), b.id());

        assert_eq!(coordinator.register(a), 1);
        assert_eq!(coordinator.register(b), 2);

        assert!(coordinator.deregister(a_id));
        assert_eq!(coordinator.active_count(), 1);

        // Second deregister of the same session is a no-op
        assert!(!coordinator.deregister(a_id));
        assert_eq!(coordinator.active_count(), 1);

        assert!(coordinator.deregister(b_id));
        assert_eq!(coordinator.active_count(), 0);
        assert_eq!(coordinator.stats().total_sessions, 2);
    }

    #[test]
    fn test_deregister_never_registered() {
        let mut coordinator = Coordinator::new();
        let (_kept, kept) = SubscriberSession::new("kept", 8);
        let (stranger, _) = SubscriberSession::new("stranger", 8);
        coordinator.register(kept);

        assert!(!coordinator.deregister(stranger.id()));
        assert_eq!(coordinator.active_count(), 1);
    }

    #[test]
    fn test_broadcast_reaches_every_session_once() {
        let mut coordinator = Coordinator::new();
        let mut sessions = Vec::new();
        for i in 0..5 {
            let (session, handle) = SubscriberSession::new(format!("client-{}", i), 8);
            coordinator.register(handle);
            sessions.push(session);
        }

        let fan_out = coordinator.broadcast(&ping());
        assert_eq!(fan_out.enqueued, 5);

        for session in &mut sessions {
            let frame = session.try_next().unwrap();
            assert_eq!(frame.as_bytes(), b"event: ping\ndata: a\ndata: b\n\n");
            assert!(session.try_next().is_none());
        }
    }

    #[test]
    fn test_full_queue_drops_only_for_that_session() {
        let mut coordinator = Coordinator::new();
        let (_slow, slow) = SubscriberSession::new("slow", 1);
        let (mut fast, fast_handle) = SubscriberSession::new("fast", 8);
        let slow_id = slow.id();

        slow.enqueue(ping().encode()).unwrap();
        coordinator.register(slow);
        coordinator.register(fast_handle);

        let fan_out = coordinator.broadcast(&BroadcastRequest::new("next", "x"));

        assert_eq!(fan_out.enqueued, 1);
        assert_eq!(fan_out.dropped_full, 1);
        assert!(coordinator.contains(slow_id));
        assert_eq!(coordinator.sessions[&slow_id].queued(), 1);
        assert_eq!(
            fast.try_next().unwrap().as_bytes(),
            b"event: next\ndata: x\n\n"
        );
        assert_eq!(coordinator.stats().frames_dropped, 1);
    }

    #[test]
    fn test_same_name_sessions_independent() {
        let mut coordinator = Coordinator::new();
        let (_first, first) = SubscriberSession::new("10.0.0.1:4000", 8);
        let (mut second, second_handle) = SubscriberSession::new("10.0.0.1:4000", 8);
        let first_id = first.id();

        coordinator.register(first);
        coordinator.register(second_handle);
        assert_eq!(coordinator.active_count(), 2);

        coordinator.deregister(first_id);
        assert_eq!(coordinator.active_count(), 1);

        assert_eq!(coordinator.broadcast(&ping()).enqueued, 1);
        assert!(second.try_next().is_some());
    }

    #[test]
    fn test_closed_session_left_registered_until_deregistered() {
        let mut coordinator = Coordinator::new();
        let (session, handle) = SubscriberSession::new("gone", 8);
        let id = handle.id();
        coordinator.register(handle);
        drop(session);

        let fan_out = coordinator.broadcast(&ping());

        assert_eq!(fan_out.dropped_closed, 1);
        assert!(coordinator.contains(id));
    }

    #[test]
    fn test_broadcast_with_no_sessions() {
        let mut coordinator = Coordinator::new();

        assert_eq!(coordinator.broadcast(&ping()), FanOut::default());
        assert_eq!(coordinator.stats().broadcasts, 1);
    }
}
