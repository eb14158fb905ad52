use std::fmt;

use time::{OffsetDateTime, format_description::well_known::Rfc3339};
use tracing_subscriber::fmt::{format::Writer, time::FormatTime};

use crate::logger::object::timezone::{LoggerTimeZone, local_offset};

/// RFC 3339 timestamp, optionally followed by the current process id.
///
/// The pid is read on every call: a forked worker keeps the parent's
/// subscriber but must report its own id.
#[derive(Debug, Clone, Copy)]
pub struct ProcessTimer {
    tz: LoggerTimeZone,
    with_pid: bool,
}

impl ProcessTimer {
    pub fn new(tz: LoggerTimeZone, with_pid: bool) -> Self {
        Self { tz, with_pid }
    }

    fn now(&self) -> OffsetDateTime {
        let now = OffsetDateTime::now_utc();
        match self.tz {
            LoggerTimeZone::Utc => now,
            LoggerTimeZone::Local => now.to_offset(local_offset()),
        }
    }
}

impl FormatTime for ProcessTimer {
    fn format_time(&self, w: &mut Writer<'_>) -> fmt::Result {
        match self.now().format(&Rfc3339) {
            Ok(ts) => write!(w, "{ts}")?,
            Err(_) => write!(w, "<invalid-time>")?,
        }
        if self.with_pid {
            write!(w, " [{}]", std::process::id())?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(timer: ProcessTimer) -> String {
        let mut buf = String::new();
        timer.format_time(&mut Writer::new(&mut buf)).unwrap();
        buf
    }

    #[test]
    fn includes_pid_when_enabled() {
        let out = render(ProcessTimer::new(LoggerTimeZone::Utc, true));
        assert!(out.ends_with(&format!(" [{}]", std::process::id())), "{out}");
        assert!(out.contains('T'));
    }

    #[test]
    fn omits_pid_when_disabled() {
        let out = render(ProcessTimer::new(LoggerTimeZone::Utc, false));
        assert!(!out.contains('['), "{out}");
        assert!(out.ends_with('Z'), "{out}");
    }
}
