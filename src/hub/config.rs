//! Hub configuration

use std::time::Duration;

/// Configuration for the coordinator and its sessions
#[derive(Debug, Clone)]
pub struct HubConfig {
    /// Capacity of each subscriber's outbound queue
    pub queue_capacity: usize,

    /// Capacity of the coordinator's command mailbox
    ///
    /// Publishers additionally wait for the coordinator to accept their
    /// request, so this only bounds how many requests may sit in the mailbox.
    pub command_capacity: usize,

    /// Upper bound on how long `publish` waits for acceptance (None = forever)
    pub publish_timeout: Option<Duration>,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 8,
            command_capacity: 1,
            publish_timeout: None,
        }
    }
}

impl HubConfig {
    /// Set the per-subscriber queue capacity (minimum 1)
    pub fn queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity.max(1);
        self
    }

    /// Set the coordinator mailbox capacity (minimum 1)
    pub fn command_capacity(mut self, capacity: usize) -> Self {
        self.command_capacity = capacity.max(1);
        self
    }

    /// Bound how long a publisher waits for the coordinator
    pub fn publish_timeout(mut self, timeout: Duration) -> Self {
        self.publish_timeout = Some(timeout);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = HubConfig::default();

        assert_eq!(config.queue_capacity, 8);
        assert_eq!(config.command_capacity, 1);
        assert!(config.publish_timeout.is_none());
    }

    #[test]
    fn test_zero_capacities_clamped() {
        let config = HubConfig::default().queue_capacity(0).command_capacity(0);

        assert_eq!(config.queue_capacity, 1);
        assert_eq!(config.command_capacity, 1);
    }

    #[test]
    fn test_builder_chaining() {
        let config = HubConfig::default()
            .queue_capacity(32)
            .publish_timeout(Duration::from_secs(2));

        assert_eq!(config.queue_capacity, 32);
        assert_eq!(config.publish_timeout, Some(Duration::from_secs(2)));
    }
}
