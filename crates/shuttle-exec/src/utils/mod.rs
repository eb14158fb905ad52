mod log;
pub(crate) use log::{raw_log, raw_log_errno};

mod wait;
pub(crate) use wait::Deadline;
