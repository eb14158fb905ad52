//! Two-bus dispatch: splits the applicants of one day into batches, hands each
//! batch to a forked worker and collects every worker's acknowledgement.
mod config;
pub use config::DispatchConfig;

mod error;
pub use error::{DispatchError, DispatchResult};

mod plan;
pub use plan::{BUS_CAPACITY, Batch, DispatchPlan, MAX_DISPATCH, SPLIT_THRESHOLD, plan};

mod report;
pub use report::{BusReport, DispatchReport};

mod coordinator;
pub use coordinator::Coordinator;
