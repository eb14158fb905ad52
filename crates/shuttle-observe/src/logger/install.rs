use tracing::Subscriber;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::logger::{
    config::LoggerConfig,
    error::{LoggerError, LoggerResult},
    object::ProcessTimer,
};

/// Human-readable text output on stdout.
pub fn logger_text(cfg: &LoggerConfig) -> LoggerResult<()> {
    let filter = cfg.level.to_env_filter();
    let fmt_layer = fmt::layer()
        .with_ansi(cfg.should_use_color())
        .with_target(cfg.with_targets)
        .with_timer(ProcessTimer::new(cfg.tz, cfg.with_pid));

    let subscriber = tracing_subscriber::registry().with(filter).with(fmt_layer);
    init_subscriber(subscriber)
}

/// One JSON object per line on stdout.
pub fn logger_json(cfg: &LoggerConfig) -> LoggerResult<()> {
    let filter = cfg.level.to_env_filter();
    let fmt_layer = fmt::layer()
        .json()
        .with_ansi(false)
        .with_target(cfg.with_targets)
        .with_timer(ProcessTimer::new(cfg.tz, cfg.with_pid));

    let subscriber = tracing_subscriber::registry().with(filter).with(fmt_layer);
    init_subscriber(subscriber)
}

/// systemd-journald output; journald records the pid itself.
#[cfg(target_os = "linux")]
pub fn logger_journald(cfg: &LoggerConfig) -> LoggerResult<()> {
    let filter = cfg.level.to_env_filter();
    let journald =
        tracing_journald::layer().map_err(LoggerError::JournaldUnavailable)?;

    let subscriber = tracing_subscriber::registry().with(filter).with(journald);
    init_subscriber(subscriber)
}

#[cfg(not(target_os = "linux"))]
pub fn logger_journald(_cfg: &LoggerConfig) -> LoggerResult<()> {
    Err(LoggerError::JournaldNotSupported)
}

fn init_subscriber<S>(subscriber: S) -> LoggerResult<()>
where
    S: Subscriber + Send + Sync + 'static,
{
    subscriber
        .try_init()
        .map_err(|_| LoggerError::AlreadyInitialized)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_install_is_rejected() {
        let cfg = LoggerConfig {
            use_color: false,
            ..Default::default()
        };

        // Another test in this binary may already have installed a subscriber;
        // either way the second call below must fail.
        let _ = logger_text(&cfg);
        assert!(matches!(
            logger_json(&cfg),
            Err(LoggerError::AlreadyInitialized)
        ));
    }

    #[test]
    #[cfg(not(target_os = "linux"))]
    fn journald_is_unsupported_off_linux() {
        let result = logger_journald(&LoggerConfig::default());
        assert!(matches!(result, Err(LoggerError::JournaldNotSupported)));
    }
}
