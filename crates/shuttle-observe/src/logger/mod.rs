mod config;
mod error;
mod install;
mod object;

pub use config::LoggerConfig;
pub use error::{LoggerError, LoggerResult};
pub use object::LoggerFormat;
pub use object::LoggerLevel;
pub use object::{LoggerTimeZone, init_local_offset};

/// Installs the global tracing subscriber described by `cfg`.
///
/// Call once, early in `main()`, and before the first dispatch: forked
/// workers inherit the installed subscriber and log through it.
///
/// For [`LoggerTimeZone::Local`] call [`init_local_offset`] first, while the
/// process is still single-threaded.
///
/// # Examples
/// ```rust
/// use shuttle_observe::{LoggerConfig, init_logger};
///
/// let config = LoggerConfig::default();
/// init_logger(&config).expect("Failed to initialize logger");
/// tracing::info!("logger ready");
/// ```
pub fn init_logger(cfg: &LoggerConfig) -> LoggerResult<()> {
    match cfg.format {
        LoggerFormat::Text => install::logger_text(cfg),
        LoggerFormat::Json => install::logger_json(cfg),
        LoggerFormat::Journald => install::logger_journald(cfg),
    }
}
