use std::time::{Duration, Instant};

/// Optional point in time after which a wait gives up.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Deadline {
    started: Instant,
    limit: Option<Duration>,
}

impl Deadline {
    pub(crate) fn after(limit: Option<Duration>) -> Self {
        Self {
            started: Instant::now(),
            limit,
        }
    }

    pub(crate) fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    pub(crate) fn expired(&self) -> bool {
        self.limit.is_some_and(|l| self.started.elapsed() >= l)
    }

    /// Time left, capped by `slice`. `slice` alone when there is no limit.
    pub(crate) fn next_slice(&self, slice: Duration) -> Duration {
        match self.limit {
            None => slice,
            Some(l) => l.saturating_sub(self.started.elapsed()).min(slice),
        }
    }
}
