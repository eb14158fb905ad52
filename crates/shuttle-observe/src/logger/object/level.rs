use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;

use crate::logger::LoggerError;

const DEFAULT_FILTER: &str = "info";

/// Log filter in `EnvFilter` syntax, checked when constructed.
///
/// Workers log under the `shuttle_exec` target, the coordinator under
/// `shuttle_core`, so `"shuttle_exec=warn,info"` quiets per-name worker lines.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "String")]
#[serde(into = "String")]
pub struct LoggerLevel(String);

impl LoggerLevel {
    /// # Examples
    /// ```
    /// use shuttle_observe::LoggerLevel;
    ///
    /// let lvl = LoggerLevel::new("shuttle_exec=debug,info").unwrap();
    /// assert_eq!(lvl.as_str(), "shuttle_exec=debug,info");
    /// ```
    pub fn new(s: impl Into<String>) -> Result<Self, LoggerError> {
        Self::try_from(s.into())
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Build the filter. Falls back to `info` if the expression no longer parses.
    pub fn to_env_filter(&self) -> EnvFilter {
        EnvFilter::try_new(self.as_str()).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
    }
}

impl Default for LoggerLevel {
    fn default() -> Self {
        Self(DEFAULT_FILTER.to_string())
    }
}

impl FromStr for LoggerLevel {
    type Err = LoggerError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::try_from(s.to_owned())
    }
}

impl TryFrom<String> for LoggerLevel {
    type Error = LoggerError;
    fn try_from(s: String) -> Result<Self, Self::Error> {
        if s.trim().is_empty() {
            return Ok(Self::default());
        }
        EnvFilter::try_new(&s)
            .map(|_| LoggerLevel(s.clone()))
            .map_err(|e| LoggerError::InvalidLevel {
                filter: s,
                reason: e.to_string(),
            })
    }
}

impl From<LoggerLevel> for String {
    fn from(l: LoggerLevel) -> Self {
        l.0
    }
}
