//! Wall-clock stopwatch.

use std::time::{Duration, Instant};

/// A stopwatch measuring elapsed wall-clock time from its creation until
/// [`stop`](Self::stop).
///
/// # Example
///
/// ```
/// use taskpool_workflow::stopwatch::Stopwatch;
///
/// let mut stopwatch = Stopwatch::start_new();
/// // ... do some work ...
/// stopwatch.stop();
/// let elapsed = stopwatch.elapsed();
/// assert_eq!(stopwatch.elapsed(), elapsed);
/// println!("took {elapsed:?}");
/// ```
#[derive(Clone, Debug)]
pub struct Stopwatch {
    started_at: Instant,
    stopped: Option<Duration>,
}

impl Stopwatch {
    /// Creates a new stopwatch and starts it immediately.
    pub fn start_new() -> Stopwatch {
        Stopwatch {
            started_at: Instant::now(),
            stopped: None,
        }
    }

    /// Stops the stopwatch, freezing the elapsed time. No-op if it is already
    /// stopped.
    pub fn stop(&mut self) {
        if self.stopped.is_none() {
            self.stopped = Some(self.started_at.elapsed());
        }
    }

    /// Returns the elapsed time so far.
    ///
    /// While running, this is the time since [`start_new`](Self::start_new).
    pub fn elapsed(&self) -> Duration {
        self.stopped.unwrap_or_else(|| self.started_at.elapsed())
    }
}
