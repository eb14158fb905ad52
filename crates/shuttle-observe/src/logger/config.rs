use serde::{Deserialize, Serialize};
use std::io::IsTerminal;

use crate::logger::object::{LoggerFormat, LoggerLevel, LoggerTimeZone};

/// Logger configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggerConfig {
    /// Output format.
    pub format: LoggerFormat,
    /// Filter expression (e.g. `"info"`, `"shuttle_exec=debug,info"`).
    pub level: LoggerLevel,
    /// Timezone for timestamps.
    pub tz: LoggerTimeZone,
    /// Include module targets in each line.
    pub with_targets: bool,
    /// Colored output when stdout is a terminal.
    pub use_color: bool,
    /// Stamp every line with the emitting process id.
    ///
    /// The coordinator and its workers write to the same stdout; the pid is the
    /// only way to tell their lines apart.
    pub with_pid: bool,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            format: LoggerFormat::default(),
            level: LoggerLevel::default(),
            tz: LoggerTimeZone::default(),
            with_targets: false,
            use_color: true,
            with_pid: true,
        }
    }
}

impl LoggerConfig {
    /// Color is used only if enabled in config and stdout is a terminal.
    ///
    /// Evaluate at initialization time, not while parsing config.
    pub fn should_use_color(&self) -> bool {
        self.use_color && std::io::stdout().is_terminal()
    }
}
