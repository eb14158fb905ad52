use std::{
    fmt,
    str::FromStr,
    sync::{OnceLock, RwLock},
};

use serde::{Deserialize, Serialize};
use time::UtcOffset;

use crate::logger::error::LoggerError;

/// Cached local UTC offset, filled by [`init_local_offset`].
static LOCAL_OFFSET: RwLock<UtcOffset> = RwLock::new(UtcOffset::UTC);

static INIT_DONE: OnceLock<()> = OnceLock::new();

/// Timezone for log timestamps.
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq)]
pub enum LoggerTimeZone {
    #[default]
    Utc,
    Local,
}

impl FromStr for LoggerTimeZone {
    type Err = LoggerError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "utc" => Ok(Self::Utc),
            "local" => Ok(Self::Local),
            _ => Err(LoggerError::InvalidTimeZone(s.to_string())),
        }
    }
}

impl fmt::Display for LoggerTimeZone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LoggerTimeZone::Utc => "utc",
            LoggerTimeZone::Local => "local",
        })
    }
}

/// Detects and caches the local offset.
///
/// Call from `main()` before any thread is spawned; detection fails in
/// multi-threaded processes on most Unix platforms. Falls back to UTC.
pub fn init_local_offset() {
    let offset = UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC);
    if let Ok(mut guard) = LOCAL_OFFSET.write() {
        *guard = offset;
    }
    let _ = INIT_DONE.set(());
}

/// Cached local offset; detects lazily if [`init_local_offset`] was never called.
pub(crate) fn local_offset() -> UtcOffset {
    INIT_DONE.get_or_init(|| {
        if let Ok(detected) = UtcOffset::current_local_offset() {
            if let Ok(mut guard) = LOCAL_OFFSET.write() {
                *guard = detected;
            }
        }
    });

    LOCAL_OFFSET
        .read()
        .map(|guard| *guard)
        .unwrap_or(UtcOffset::UTC)
}
