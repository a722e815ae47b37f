//! Pool configuration.

use serde::{Deserialize, Serialize};
use taskpool_common::{Result, verify_arg};

/// Configuration of a [`ConcurrentPool`](crate::ConcurrentPool).
///
/// The configuration is validated once, when the pool is constructed, and is
/// immutable afterwards. It can be deserialized from any serde format; missing
/// fields take their [`Default`] values.
///
/// ```
/// use taskpool::PoolConfig;
///
/// let config = PoolConfig::new(4).with_thread_name_prefix("ingest");
/// assert!(config.validate().is_ok());
/// assert!(PoolConfig::new(0).validate().is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    /// Number of worker threads, and the capacity of both internal queues.
    /// Must be in `1..=PoolConfig::MAX_WORKER_COUNT`.
    pub worker_count: usize,

    /// Optional prefix for the names of the threads spawned during execution.
    /// Threads are named `{prefix}-producer`, `{prefix}-worker-{i}` and
    /// `{prefix}-collector`. An empty prefix leaves the threads unnamed.
    pub thread_name_prefix: Option<String>,
}

impl PoolConfig {
    /// Worker count used when the available parallelism cannot be determined.
    pub const FALLBACK_WORKER_COUNT: usize = 8;

    /// Largest accepted worker count.
    pub const MAX_WORKER_COUNT: usize = 4096;

    pub fn new(worker_count: usize) -> PoolConfig {
        PoolConfig {
            worker_count,
            thread_name_prefix: None,
        }
    }

    pub fn with_thread_name_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.thread_name_prefix = Some(prefix.into());
        self
    }

    pub fn validate(&self) -> Result<()> {
        verify_arg!(worker_count, self.worker_count >= 1);
        verify_arg!(worker_count, self.worker_count <= Self::MAX_WORKER_COUNT);
        Ok(())
    }

    /// Capacity of the work and results queues.
    pub fn queue_capacity(&self) -> usize {
        self.worker_count
    }

    pub(crate) fn thread_name(&self, role: &str) -> Option<String> {
        self.thread_name_prefix
            .as_deref()
            .filter(|prefix| !prefix.is_empty())
            .map(|prefix| format!("{prefix}-{role}"))
    }
}

impl Default for PoolConfig {
    /// Sizes the pool from the system's available parallelism.
    fn default() -> Self {
        let worker_count = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(Self::FALLBACK_WORKER_COUNT);
        PoolConfig::new(worker_count.min(Self::MAX_WORKER_COUNT))
    }
}
