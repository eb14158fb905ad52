//! Dispatch coordinator.
//!
//! Runs the batches of a [`DispatchPlan`] strictly one after another:
//!
//! ```text
//! open queue -> [spawn -> ready -> transfer -> completion -> reap] x batches -> remove queue
//! ```
//!
//! Two workers of one dispatch are never alive at the same time. Every handle
//! opened for a worker is released before the next one is spawned, on error
//! paths included.
use std::time::Instant;

use shuttle_exec::{CompletionChannel, CompletionRecord, WaitPolicy, spawn_worker};
use shuttle_model::{BusRole, Weekday};
use tracing::{debug, error, info, warn};

use crate::{Batch, BusReport, DispatchConfig, DispatchError, DispatchReport, DispatchResult, plan};

/// Drives dispatches with a fixed configuration.
///
/// Forks; call it from a process whose other threads are idle.
#[derive(Debug, Clone)]
pub struct Coordinator {
    config: DispatchConfig,
    policy: WaitPolicy,
}

impl Coordinator {
    pub fn new(config: DispatchConfig) -> DispatchResult<Self> {
        config.validate()?;
        let policy = config.wait_policy();
        Ok(Self { config, policy })
    }

    pub fn config(&self) -> &DispatchConfig {
        &self.config
    }

    /// Dispatch the applicants available on `day`.
    ///
    /// `names` is the roster's view for that day, in roster order.
    pub fn dispatch(&self, day: Weekday, names: &[String]) -> DispatchResult<DispatchReport> {
        let plan = plan(names)?;
        let mut report = DispatchReport::new(day);

        if plan.is_empty() {
            info!(%day, "No applicant");
            return Ok(report);
        }

        let channel = CompletionChannel::open(&self.config.queue).map_err(|e| {
            error!(error = %e, "opening the completion queue failed");
            DispatchError::Setup(e)
        })?;
        debug!(%day, batches = plan.batches.len(), total = plan.total(), "dispatch planned");

        for batch in &plan.batches {
            let bus = self.run_batch(&channel, batch).inspect_err(|e| {
                error!(role = %batch.role, error = %e, "bus failed");
            })?;
            report.buses.push(bus);
        }

        channel.destroy().map_err(DispatchError::Teardown)?;
        info!(
            %day,
            sent = report.total_sent(),
            acknowledged = report.total_acknowledged(),
            "dispatch finished"
        );
        Ok(report)
    }

    /// Coordinator side of one worker's protocol.
    ///
    /// On any error the worker handle is dropped here, which kills and reaps it.
    fn run_batch(&self, channel: &CompletionChannel, batch: &Batch) -> DispatchResult<BusReport> {
        let role = batch.role;

        let mut worker = spawn_worker(role, self.config.handshake, channel.sender())
            .map_err(DispatchError::Setup)?;
        let pid = worker.pid();
        let spawned_at = worker.spawned_at();
        info!(%role, pid, "Worker for the {role} is created");

        worker
            .await_ready(&self.policy)
            .map_err(|source| DispatchError::Handshake { role, source })?;

        let sent = worker
            .transfer(&batch.names)
            .map_err(|source| DispatchError::Transfer { role, source })?;
        info!(%role, "The coordinator sent {sent} applicants to the {role}");

        let record = worker
            .await_completion(channel, &self.policy)
            .map_err(|source| DispatchError::Completion { role, source })?;
        let acknowledged = acknowledge(role, sent, record)?;

        let exit = worker
            .reap()
            .map_err(|source| DispatchError::Reap { role, source })?;

        Ok(BusReport {
            role,
            sent: batch.names.clone(),
            acknowledged,
            pid,
            spawned_at,
            reaped_at: Instant::now(),
            exit,
        })
    }
}

/// Accept `record` as the completion of `role`'s batch of `sent` names.
///
/// A record labelled for another bus is an error; a differing count is only logged.
fn acknowledge(role: BusRole, sent: usize, record: CompletionRecord) -> DispatchResult<u32> {
    if record.role() != Some(role) {
        return Err(DispatchError::ForeignRecord {
            role,
            label: record.label,
        });
    }
    if record.count as usize != sent {
        warn!(%role, sent, acknowledged = record.count, "worker acknowledged a different count");
    }
    Ok(record.count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DispatchConfig;

    #[test]
    fn invalid_config_is_rejected_up_front() {
        let cfg = DispatchConfig {
            poll_interval_ms: 0,
            ..Default::default()
        };
        assert!(matches!(
            Coordinator::new(cfg).unwrap_err(),
            DispatchError::InvalidConfig(_)
        ));
    }

    #[test]
    fn record_for_the_other_bus_is_rejected() {
        let err = acknowledge(
            BusRole::Second,
            2,
            CompletionRecord::for_role(BusRole::First, 2),
        )
        .unwrap_err();
        match err {
            DispatchError::ForeignRecord { role, label } => {
                assert_eq!(role, BusRole::Second);
                assert_eq!(label, "first bus");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(matches!(
            acknowledge(BusRole::First, 1, CompletionRecord::new("third bus", 1)),
            Err(DispatchError::ForeignRecord { .. })
        ));
    }

    #[test]
    fn own_record_is_accepted_even_with_a_short_count() {
        let record = CompletionRecord::for_role(BusRole::First, 3);
        assert_eq!(acknowledge(BusRole::First, 3, record.clone()).unwrap(), 3);
        assert_eq!(acknowledge(BusRole::First, 5, record).unwrap(), 3);
    }

    #[test]
    fn too_many_applicants_fail_before_any_ipc() {
        let dir = tempfile::tempdir().unwrap();
        let mut cfg = DispatchConfig::default();
        cfg.queue.path = dir.path().to_path_buf();
        let key = cfg.queue.clone();

        let coordinator = Coordinator::new(cfg).unwrap();
        let names: Vec<String> = (0..11).map(|i| format!("P{i}")).collect();
        let err = coordinator.dispatch(Weekday::Monday, &names).unwrap_err();

        assert!(matches!(err, DispatchError::TooManyApplicants { .. }));
        assert!(!CompletionChannel::exists(&key).unwrap());
    }
}
