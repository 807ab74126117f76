//! Consume loop configuration.
//!
//! This module defines queue sizing, dispatch concurrency and how dropped
//! traffic is reported.

use serde::Deserialize;

use crate::events::UnroutableLog;

/// Consumer settings.
#[derive(Debug, Deserialize, Clone)]
pub struct ConsumerSettings {
    /// Capacity of the in-memory queue. Producers wait when it is full.
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
    /// Handlers allowed to run at once. `1` keeps strict queue order.
    #[serde(default = "default_max_in_flight")]
    pub max_in_flight: usize,
    /// Log level for messages addressed to unknown services or methods.
    #[serde(default)]
    pub log_unroutable: UnroutableLog,
}

impl Default for ConsumerSettings {
    fn default() -> Self {
        Self {
            queue_capacity: default_queue_capacity(),
            max_in_flight: default_max_in_flight(),
            log_unroutable: UnroutableLog::default(),
        }
    }
}

fn default_queue_capacity() -> usize {
    10
}

fn default_max_in_flight() -> usize {
    1
}
