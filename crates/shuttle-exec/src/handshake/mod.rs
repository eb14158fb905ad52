//! Worker → coordinator readiness handshake.
//!
//! A worker must announce that it has finished its setup before the
//! coordinator writes the batch. Both halves are created before `fork()`:
//! the worker keeps the [`ReadyNotifier`], the coordinator the [`ReadyWaiter`].
//!
//! Two mechanisms are available:
//! - [`HandshakeKind::Pipe`]: a one-shot pipe private to the worker/coordinator
//!   pair. The worker writes its role ordinal as a single byte.
//! - [`HandshakeKind::Signal`] (Linux): per-role signals, `SIGUSR1` for the first
//!   bus and `SIGUSR2` for the second, aimed at the coordinating thread and
//!   collected with `sigtimedwait`. No handler is installed.
use std::{fmt, str::FromStr, time::Duration};

use serde::{Deserialize, Serialize};
use shuttle_model::BusRole;
use tracing::trace;

use crate::{ExecError, ExecResult};

mod pipe;
#[cfg(target_os = "linux")]
mod signal;

/// Readiness mechanism used by a dispatch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HandshakeKind {
    #[default]
    Pipe,
    Signal,
}

impl FromStr for HandshakeKind {
    type Err = ExecError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pipe" => Ok(Self::Pipe),
            "signal" => Ok(Self::Signal),
            other => Err(ExecError::InvalidConfig(format!("unknown handshake kind: {other}"))),
        }
    }
}

impl fmt::Display for HandshakeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            HandshakeKind::Pipe => "pipe",
            HandshakeKind::Signal => "signal",
        })
    }
}

/// Create both halves of a handshake for `role`. Must run before `fork()`.
pub(crate) fn prepare(kind: HandshakeKind, role: BusRole) -> ExecResult<(ReadyNotifier, ReadyWaiter)> {
    trace!(%kind, %role, "preparing readiness handshake");
    match kind {
        HandshakeKind::Pipe => {
            let (n, w) = pipe::prepare(role)?;
            Ok((ReadyNotifier::Pipe(n), ReadyWaiter::Pipe(w)))
        }
        #[cfg(target_os = "linux")]
        HandshakeKind::Signal => {
            let (n, w) = signal::prepare(role)?;
            Ok((ReadyNotifier::Signal(n), ReadyWaiter::Signal(w)))
        }
        #[cfg(not(target_os = "linux"))]
        HandshakeKind::Signal => Err(ExecError::Unsupported("signal handshake")),
    }
}

/// Worker half.
pub(crate) enum ReadyNotifier {
    Pipe(pipe::PipeNotifier),
    #[cfg(target_os = "linux")]
    Signal(signal::SignalNotifier),
}

impl ReadyNotifier {
    /// Tell the coordinator this worker is ready. Consumes the notifier: readiness is announced once.
    pub(crate) fn notify(self) -> ExecResult<()> {
        match self {
            ReadyNotifier::Pipe(n) => n.notify(),
            #[cfg(target_os = "linux")]
            ReadyNotifier::Signal(n) => n.notify(),
        }
    }
}

/// Coordinator half.
pub(crate) enum ReadyWaiter {
    Pipe(pipe::PipeWaiter),
    #[cfg(target_os = "linux")]
    Signal(signal::SignalWaiter),
}

impl ReadyWaiter {
    /// Wait for the worker's readiness.
    ///
    /// `still_alive` is polled between slices by mechanisms that cannot observe
    /// the worker's death on their own; it returns `false` once the worker is gone.
    pub(crate) fn wait(
        &mut self,
        timeout: Option<Duration>,
        poll: Duration,
        still_alive: impl FnMut() -> ExecResult<bool>,
    ) -> ExecResult<()> {
        match self {
            ReadyWaiter::Pipe(w) => w.wait(timeout, poll, still_alive),
            #[cfg(target_os = "linux")]
            ReadyWaiter::Signal(w) => w.wait(timeout, poll, still_alive),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_pipe() {
        assert_eq!(HandshakeKind::default(), HandshakeKind::Pipe);
    }

    #[test]
    fn parses_and_displays() {
        for kind in [HandshakeKind::Pipe, HandshakeKind::Signal] {
            assert_eq!(kind.to_string().parse::<HandshakeKind>().unwrap(), kind);
        }
        assert_eq!(" SIGNAL ".parse::<HandshakeKind>().unwrap(), HandshakeKind::Signal);
        assert!("carrier-pigeon".parse::<HandshakeKind>().is_err());
    }

    #[test]
    fn serde_uses_lowercase_names() {
        let json = serde_json::to_string(&HandshakeKind::Signal).unwrap();
        assert_eq!(json, r#""signal""#);
        let back: HandshakeKind = serde_json::from_str(r#""pipe""#).unwrap();
        assert_eq!(back, HandshakeKind::Pipe);
    }
}
