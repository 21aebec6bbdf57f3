use crate::merge::MergePolicy;
use crate::queue::QueueConfig;
use movequeue_config::TypeData;
use std::time::Duration;

/// Settings for one queue + dispatcher pair.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    pub merge_policy: MergePolicy,
    pub queue: QueueConfig,
    /// Cadence of [`Dispatcher::run`](crate::Dispatcher::run).
    pub tick_interval: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            merge_policy: MergePolicy::default(),
            queue: QueueConfig::default(),
            tick_interval: Duration::from_millis(50),
        }
    }
}

impl PipelineConfig {
    /// Read settings from a table, keeping defaults for absent or invalid keys.
    ///
    /// Keys: `merge_policy`, `queue_capacity` (0 = unbounded),
    /// `enqueue_timeout_ms`, `tick_interval_ms`.
    pub fn from_data(data: &TypeData) -> Self {
        let defaults = Self::default();
        let default_capacity = defaults.queue.capacity.unwrap_or(0) as i64;
        let capacity = data.get_int_or("queue_capacity", default_capacity);
        let timeout_ms = data.get_int_or(
            "enqueue_timeout_ms",
            defaults.queue.enqueue_timeout.as_millis() as i64,
        );
        let tick_ms = data.get_int_or("tick_interval_ms", defaults.tick_interval.as_millis() as i64);

        Self {
            merge_policy: data.get_enum_or("merge_policy", defaults.merge_policy),
            queue: QueueConfig {
                capacity: (capacity > 0).then_some(capacity as usize),
                enqueue_timeout: Duration::from_millis(timeout_ms.max(0) as u64),
            },
            tick_interval: Duration::from_millis(tick_ms.max(1) as u64),
        }
    }
}
