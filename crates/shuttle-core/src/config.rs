use std::time::Duration;

use serde::{Deserialize, Serialize};
use shuttle_exec::{HandshakeKind, QueueKey, WaitPolicy};

use crate::{DispatchError, DispatchResult};

/// Dispatch configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// Where the completion queue key is derived from.
    pub queue: QueueKey,
    /// Readiness mechanism.
    pub handshake: HandshakeKind,
    /// Upper bound on a worker's readiness wait. `None` waits forever.
    pub handshake_timeout_ms: Option<u64>,
    /// Upper bound on a worker's completion wait. `None` waits forever.
    pub completion_timeout_ms: Option<u64>,
    /// Re-check interval while waiting.
    pub poll_interval_ms: u64,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            queue: QueueKey::default(),
            handshake: HandshakeKind::default(),
            handshake_timeout_ms: None,
            completion_timeout_ms: None,
            poll_interval_ms: 10,
        }
    }
}

impl DispatchConfig {
    pub fn validate(&self) -> DispatchResult<()> {
        if self.poll_interval_ms == 0 {
            return Err(DispatchError::InvalidConfig(
                "poll_interval_ms must be positive".into(),
            ));
        }
        if self.queue.project_id == 0 {
            return Err(DispatchError::InvalidConfig(
                "queue.project_id must be non-zero".into(),
            ));
        }
        Ok(())
    }

    pub fn wait_policy(&self) -> WaitPolicy {
        WaitPolicy {
            handshake_timeout: self.handshake_timeout_ms.map(Duration::from_millis),
            completion_timeout: self.completion_timeout_ms.map(Duration::from_millis),
            poll_interval: Duration::from_millis(self.poll_interval_ms),
        }
    }
}
