use shuttle_exec::ExecError;
use shuttle_model::BusRole;
use thiserror::Error;

/// Failure of a dispatch.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// Queue, pipe or process creation failed.
    #[error("dispatch setup failed: {0}")]
    Setup(#[source] ExecError),

    #[error("{role}: readiness handshake failed: {source}")]
    Handshake {
        role: BusRole,
        #[source]
        source: ExecError,
    },

    #[error("{role}: batch transfer failed: {source}")]
    Transfer {
        role: BusRole,
        #[source]
        source: ExecError,
    },

    #[error("{role}: completion not received: {source}")]
    Completion {
        role: BusRole,
        #[source]
        source: ExecError,
    },

    #[error("{role}: unexpected completion record '{label}'")]
    ForeignRecord { role: BusRole, label: String },

    #[error("{role}: reaping worker failed: {source}")]
    Reap {
        role: BusRole,
        #[source]
        source: ExecError,
    },

    #[error("removing the completion queue failed: {0}")]
    Teardown(#[source] ExecError),

    #[error("{count} applicants do not fit on two buses (max {max})")]
    TooManyApplicants { count: usize, max: usize },

    #[error("applicant name {0:?} cannot be sent as one record")]
    InvalidName(String),

    #[error("invalid dispatch config: {0}")]
    InvalidConfig(String),
}

impl DispatchError {
    /// Setup failures end the whole program; everything else is reported and survived.
    pub fn is_fatal(&self) -> bool {
        matches!(self, DispatchError::Setup(_))
    }

    /// Bus the failure belongs to, if any.
    pub fn role(&self) -> Option<BusRole> {
        match self {
            DispatchError::Handshake { role, .. }
            | DispatchError::Transfer { role, .. }
            | DispatchError::Completion { role, .. }
            | DispatchError::ForeignRecord { role, .. }
            | DispatchError::Reap { role, .. } => Some(*role),
            _ => None,
        }
    }
}

pub type DispatchResult<T> = Result<T, DispatchError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_setup_is_fatal() {
        assert!(DispatchError::Setup(ExecError::QueueGone).is_fatal());
        assert!(
            !DispatchError::Completion {
                role: BusRole::First,
                source: ExecError::QueueGone,
            }
            .is_fatal()
        );
        assert!(!DispatchError::TooManyApplicants { count: 11, max: 10 }.is_fatal());
    }

    #[test]
    fn role_is_exposed_for_per_bus_failures() {
        let err = DispatchError::Transfer {
            role: BusRole::Second,
            source: ExecError::QueueFull,
        };
        assert_eq!(err.role(), Some(BusRole::Second));
        assert!(err.to_string().starts_with("second bus:"));
        assert_eq!(DispatchError::Teardown(ExecError::QueueGone).role(), None);
    }
}
