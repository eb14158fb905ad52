mod logger;
pub use logger::*;

/// Evaluate a `Result`-returning expression and log the error, if any, instead of propagating it.
///
/// Meant for best-effort cleanup paths where the caller has nothing better to do with the failure.
#[macro_export]
macro_rules! log_if_err {
    ($run:expr) => {
        $crate::log_if_err!($run, stringify!($run))
    };

    ($run:expr, $msg:expr $(,)?) => {
        if let Err(err) = $run {
            ::tracing::error!(error = %err, "FAILED: {}", $msg)
        }
    };
}
