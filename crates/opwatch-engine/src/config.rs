//! Monitoring configuration.

use std::time::Duration;

/// Configuration for a live monitoring session.
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// Frames per analysis window (~seconds at 1 fps sampling)
    pub chunk_size: usize,
    /// Frames shared between consecutive windows
    pub chunk_overlap: usize,
    /// Bounded wait on the dispatch queue, so the worker observes the stop
    /// signal even when the queue is empty
    pub queue_poll_interval: Duration,
    /// How long stop() waits for the worker before aborting it
    pub shutdown_timeout: Duration,
    /// Prior chunk analyses retained for prompt context
    pub chunk_history_limit: usize,
    /// Detection analyses retained per step
    pub detection_history_limit: usize,
    /// Allowed gap before earlier pending steps are marked missed
    pub missed_step_gap: usize,
    /// Broadcast channel capacity for live updates
    pub event_capacity: usize,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            chunk_size: 7,
            chunk_overlap: 2,
            queue_poll_interval: Duration::from_secs(1),
            shutdown_timeout: Duration::from_secs(30),
            chunk_history_limit: 10,
            detection_history_limit: 3,
            missed_step_gap: 2,
            event_capacity: 256,
        }
    }
}

impl MonitorConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            chunk_size: env_parse("OPWATCH_CHUNK_SIZE", defaults.chunk_size),
            chunk_overlap: env_parse("OPWATCH_CHUNK_OVERLAP", defaults.chunk_overlap),
            queue_poll_interval: Duration::from_millis(env_parse(
                "OPWATCH_QUEUE_POLL_MS",
                defaults.queue_poll_interval.as_millis() as u64,
            )),
            shutdown_timeout: Duration::from_secs(env_parse(
                "OPWATCH_SHUTDOWN_TIMEOUT_SECS",
                defaults.shutdown_timeout.as_secs(),
            )),
            chunk_history_limit: env_parse("OPWATCH_CHUNK_HISTORY", defaults.chunk_history_limit),
            detection_history_limit: env_parse(
                "OPWATCH_DETECTION_HISTORY",
                defaults.detection_history_limit,
            ),
            missed_step_gap: env_parse("OPWATCH_MISSED_STEP_GAP", defaults.missed_step_gap),
            event_capacity: env_parse("OPWATCH_EVENT_CAPACITY", defaults.event_capacity),
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = MonitorConfig::default();
        assert_eq!(config.chunk_size, 7);
        assert_eq!(config.chunk_overlap, 2);
        assert_eq!(config.missed_step_gap, 2);
        assert_eq!(config.queue_poll_interval, Duration::from_secs(1));
    }
}
