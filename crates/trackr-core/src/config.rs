//! Pipeline configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::domain::report::Page;

/// Tunables for the report pipeline. Durations are serialized in seconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Redis list the jobs travel on.
    pub queue_key: String,

    /// How long one pop blocks before the dispatcher re-checks shutdown.
    #[serde(with = "secs")]
    pub dequeue_timeout: Duration,

    #[serde(with = "secs")]
    pub summary_ttl: Duration,

    /// Dispatcher loops per process.
    pub dispatchers: usize,

    /// Pause after a queue error.
    #[serde(with = "secs")]
    pub error_backoff: Duration,

    pub default_page_size: u32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            queue_key: "report:queue".to_string(),
            dequeue_timeout: Duration::from_secs(5),
            summary_ttl: Duration::from_secs(60),
            dispatchers: 1,
            error_backoff: Duration::from_secs(1),
            default_page_size: Page::DEFAULT_TAKE,
        }
    }
}

mod secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_secs)
    }
}
