//! Hub and session statistics

pub mod metrics;

pub use metrics::{HubCounters, HubStats, SessionStats};
