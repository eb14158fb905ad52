use std::time::{Duration, Instant};

use shuttle_exec::WorkerExit;
use shuttle_model::{BusRole, Weekday};

/// Outcome of one bus.
#[derive(Debug, Clone)]
pub struct BusReport {
    pub role: BusRole,
    /// Names written to the worker, in order.
    pub sent: Vec<String>,
    /// Count carried by the worker's completion record.
    pub acknowledged: u32,
    pub pid: i32,
    pub spawned_at: Instant,
    pub reaped_at: Instant,
    pub exit: WorkerExit,
}

impl BusReport {
    /// `true` if the worker read every name it was sent and exited cleanly.
    pub fn is_complete(&self) -> bool {
        self.acknowledged as usize == self.sent.len() && self.exit.success()
    }

    pub fn lifetime(&self) -> Duration {
        self.reaped_at.saturating_duration_since(self.spawned_at)
    }
}

/// Outcome of a whole dispatch. `buses` is empty when nobody was available.
#[derive(Debug, Clone)]
pub struct DispatchReport {
    pub day: Weekday,
    pub buses: Vec<BusReport>,
}

impl DispatchReport {
    pub fn new(day: Weekday) -> Self {
        Self {
            day,
            buses: Vec::new(),
        }
    }

    pub fn total_sent(&self) -> usize {
        self.buses.iter().map(|b| b.sent.len()).sum()
    }

    pub fn total_acknowledged(&self) -> u64 {
        self.buses.iter().map(|b| u64::from(b.acknowledged)).sum()
    }

    pub fn bus(&self, role: BusRole) -> Option<&BusReport> {
        self.buses.iter().find(|b| b.role == role)
    }
}
