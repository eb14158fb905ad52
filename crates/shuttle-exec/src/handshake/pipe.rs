use std::{io::Write, time::Duration};

use shuttle_model::BusRole;

use crate::{ExecError, ExecResult, PipeReader, PipeWriter, pipe::channel};

pub(crate) struct PipeNotifier {
    role: BusRole,
    tx: PipeWriter,
}

pub(crate) struct PipeWaiter {
    role: BusRole,
    rx: PipeReader,
}

pub(crate) fn prepare(role: BusRole) -> ExecResult<(PipeNotifier, PipeWaiter)> {
    let (rx, tx) = channel().map_err(|e| ExecError::os("pipe (handshake)", e))?;
    Ok((PipeNotifier { role, tx }, PipeWaiter { role, rx }))
}

impl PipeNotifier {
    pub(crate) fn notify(mut self) -> ExecResult<()> {
        self.tx
            .write_all(&[self.role.ordinal()])
            .map_err(|e| ExecError::os("write readiness token", e))
    }
}

impl PipeWaiter {
    /// End-of-stream before the token means every copy of the write end is
    /// closed, i.e. the worker exited without announcing itself. The pipe
    /// reports that on its own, so liveness is never polled.
    pub(crate) fn wait(
        &mut self,
        timeout: Option<Duration>,
        _poll: Duration,
        _still_alive: impl FnMut() -> ExecResult<bool>,
    ) -> ExecResult<()> {
        let readable = self
            .rx
            .wait_readable(timeout)
            .map_err(|e| ExecError::os("poll readiness pipe", e))?;
        if !readable {
            return Err(ExecError::HandshakeTimeout {
                role: self.role,
                waited: timeout.unwrap_or_default(),
            });
        }

        match self
            .rx
            .read_byte()
            .map_err(|e| ExecError::os("read readiness token", e))?
        {
            Some(token) if token == self.role.ordinal() => Ok(()),
            Some(token) => Err(ExecError::RoleMismatch {
                role: self.role,
                got: token,
            }),
            None => Err(ExecError::WorkerGone { role: self.role }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wait(waiter: &mut PipeWaiter, timeout: Option<Duration>) -> ExecResult<()> {
        waiter.wait(timeout, Duration::from_millis(5), || Ok(true))
    }

    #[test]
    fn token_unblocks_waiter() {
        let (notifier, mut waiter) = prepare(BusRole::Second).unwrap();
        notifier.notify().unwrap();
        wait(&mut waiter, Some(Duration::from_secs(5))).unwrap();
    }

    #[test]
    fn foreign_token_is_rejected() {
        let (mut notifier, mut waiter) = prepare(BusRole::First).unwrap();
        notifier.tx.write_all(&[BusRole::Second.ordinal()]).unwrap();

        let err = wait(&mut waiter, Some(Duration::from_secs(5))).unwrap_err();
        assert!(matches!(
            err,
            ExecError::RoleMismatch {
                role: BusRole::First,
                got: 2
            }
        ));
    }

    #[test]
    fn closed_notifier_means_worker_gone() {
        let (notifier, mut waiter) = prepare(BusRole::First).unwrap();
        drop(notifier);

        let err = wait(&mut waiter, None).unwrap_err();
        assert!(matches!(err, ExecError::WorkerGone { role: BusRole::First }));
    }

    #[test]
    fn silent_worker_times_out() {
        let (_notifier, mut waiter) = prepare(BusRole::Second).unwrap();
        let err = wait(&mut waiter, Some(Duration::from_millis(20))).unwrap_err();
        assert!(matches!(err, ExecError::HandshakeTimeout { .. }));
    }
}
