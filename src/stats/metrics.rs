//! Statistics for the hub and its subscriber sessions

use std::time::{Duration, Instant};

use serde::Serialize;

/// Per-session delivery statistics
#[derive(Debug, Clone, Default)]
pub struct SessionStats {
    /// Frames written to the transport
    pub frames_sent: u64,
    /// Bytes written to the transport
    pub bytes_sent: u64,
    /// How long the delivery loop ran
    pub duration: Duration,
}

impl SessionStats {
    /// Create new stats tracker
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one frame written to the transport
    pub fn record_frame(&mut self, size: usize) {
        self.frames_sent += 1;
        self.bytes_sent += size as u64;
    }
}

/// Hub-wide counters, owned and updated by the coordinator
#[derive(Debug, Clone)]
pub struct HubCounters {
    started_at: Instant,
    /// Sessions ever registered
    pub total_sessions: u64,
    /// Broadcasts processed
    pub broadcasts: u64,
    /// Frames placed into session queues
    pub frames_enqueued: u64,
    /// Frames dropped because a session queue was full or closed
    pub frames_dropped: u64,
}

impl HubCounters {
    pub fn new() -> Self {
        Self {
            started_at: Instant::now(),
            total_sessions: 0,
            broadcasts: 0,
            frames_enqueued: 0,
            frames_dropped: 0,
        }
    }

    /// Time since the coordinator started
    pub fn uptime(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// Take a snapshot with the current active session count
    pub fn snapshot(&self, active_sessions: usize) -> HubStats {
        HubStats {
            active_sessions,
            total_sessions: self.total_sessions,
            broadcasts: self.broadcasts,
            frames_enqueued: self.frames_enqueued,
            frames_dropped: self.frames_dropped,
            uptime_secs: self.uptime().as_secs(),
        }
    }
}

impl Default for HubCounters {
    fn default() -> Self {
        Self::new()
    }
}

/// Point-in-time view of hub activity
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct HubStats {
    /// Sessions currently registered
    pub active_sessions: usize,
    /// Sessions ever registered
    pub total_sessions: u64,
    /// Broadcasts processed
    pub broadcasts: u64,
    /// Frames placed into session queues
    pub frames_enqueued: u64,
    /// Frames dropped because a session queue was full or closed
    pub frames_dropped: u64,
    /// Seconds since the coordinator started
    pub uptime_secs: u64,
}
