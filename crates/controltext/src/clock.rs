//! Monotonic millisecond clock for driving notifiers.
//!
//! The control plane never reads time itself; every `set` and `tick` is
//! stamped by the caller. This clock counts from the moment the session
//! started, using `std::time::Instant` for monotonic guarantees.

use std::time::{Duration, Instant};

use controlplane::Milliseconds;

#[derive(Debug, Clone, Copy)]
pub struct SessionClock {
    start: Instant,
}

impl SessionClock {
    /// Start counting from now.
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Milliseconds since [`SessionClock::start`].
    pub fn now(&self) -> Milliseconds {
        Milliseconds::try_from(self.elapsed().as_millis()).unwrap_or(Milliseconds::MAX)
    }
}

impl Default for SessionClock {
    fn default() -> Self {
        Self::start()
    }
}
