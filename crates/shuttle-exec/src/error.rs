use std::{io, time::Duration};

use shuttle_model::BusRole;
use thiserror::Error;

use crate::worker::{WorkerExit, WorkerState};

#[derive(Debug, Error)]
pub enum ExecError {
    #[error("{op} failed: {source}")]
    Os {
        op: &'static str,
        #[source]
        source: io::Error,
    },

    #[error("{role} worker did not signal readiness within {waited:?}")]
    HandshakeTimeout { role: BusRole, waited: Duration },

    #[error("{role} worker went away before signalling readiness")]
    WorkerGone { role: BusRole },

    #[error("{role} worker sent readiness token {got}, expected {}", .role.ordinal())]
    RoleMismatch { role: BusRole, got: u8 },

    #[error("no completion record from {role} worker within {waited:?}")]
    CompletionTimeout { role: BusRole, waited: Duration },

    #[error("{role} worker exited ({exit}) without posting a completion record")]
    WorkerExited { role: BusRole, exit: WorkerExit },

    #[error("completion queue is full")]
    QueueFull,

    #[error("completion queue does not exist or has been removed")]
    QueueGone,

    #[error("invalid completion record: {0}")]
    InvalidRecord(String),

    #[error("{role} worker is {state}; cannot {action}")]
    Protocol {
        role: BusRole,
        state: WorkerState,
        action: &'static str,
    },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("{0} is not supported on this platform")]
    Unsupported(&'static str),
}

impl ExecError {
    /// Wrap `errno` of the syscall that just failed.
    pub(crate) fn last_os(op: &'static str) -> Self {
        Self::Os {
            op,
            source: io::Error::last_os_error(),
        }
    }

    pub(crate) fn os(op: &'static str, source: io::Error) -> Self {
        Self::Os { op, source }
    }

    /// Raw `errno`, if the failure came from the OS.
    pub fn raw_os_error(&self) -> Option<i32> {
        match self {
            Self::Os { source, .. } => source.raw_os_error(),
            _ => None,
        }
    }
}

pub type ExecResult<T> = Result<T, ExecError>;
