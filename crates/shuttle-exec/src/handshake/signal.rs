//! Signal-based readiness (Linux only).
//!
//! | role       | signal    |
//! |------------|-----------|
//! | first bus  | `SIGUSR1` |
//! | second bus | `SIGUSR2` |
//!
//! Both signals are blocked in the coordinating thread before the worker is
//! forked, the worker aims its signal at that thread with `tgkill`, and the
//! coordinator collects exactly its role's signal with `sigtimedwait`. A
//! signal of the other role stays pending and is discarded when the mask is
//! restored, so it can never be mistaken for this worker's readiness.
use std::{io, marker::PhantomData, mem, ptr, time::Duration};

use shuttle_model::BusRole;

use crate::{ExecError, ExecResult, utils::Deadline};

const HANDSHAKE_SIGNALS: [libc::c_int; 2] = [libc::SIGUSR1, libc::SIGUSR2];

/// Signal a worker of `role` uses to announce readiness.
pub(crate) const fn signal_for(role: BusRole) -> libc::c_int {
    match role {
        BusRole::First => libc::SIGUSR1,
        BusRole::Second => libc::SIGUSR2,
    }
}

pub(crate) struct SignalNotifier {
    signo: libc::c_int,
    pid: libc::pid_t,
    tid: libc::pid_t,
}

pub(crate) struct SignalWaiter {
    role: BusRole,
    signo: libc::c_int,
    _mask: SignalMask,
}

pub(crate) fn prepare(role: BusRole) -> ExecResult<(SignalNotifier, SignalWaiter)> {
    let mask = SignalMask::block(&HANDSHAKE_SIGNALS)
        .map_err(|e| ExecError::os("pthread_sigmask", e))?;
    drain(&signal_set(&HANDSHAKE_SIGNALS));

    let pid = unsafe { libc::getpid() };
    let tid = unsafe { libc::syscall(libc::SYS_gettid) } as libc::pid_t;
    let signo = signal_for(role);

    Ok((
        SignalNotifier { signo, pid, tid },
        SignalWaiter {
            role,
            signo,
            _mask: mask,
        },
    ))
}

impl SignalNotifier {
    pub(crate) fn notify(self) -> ExecResult<()> {
        let rc = unsafe {
            libc::syscall(
                libc::SYS_tgkill,
                self.pid as libc::c_long,
                self.tid as libc::c_long,
                self.signo as libc::c_long,
            )
        };
        if rc == -1 {
            return Err(ExecError::last_os("tgkill"));
        }
        Ok(())
    }
}

impl SignalWaiter {
    pub(crate) fn wait(
        &mut self,
        timeout: Option<Duration>,
        poll: Duration,
        mut still_alive: impl FnMut() -> ExecResult<bool>,
    ) -> ExecResult<()> {
        let set = signal_set(&[self.signo]);
        let deadline = Deadline::after(timeout);

        loop {
            if take(&set, deadline.next_slice(poll))? {
                return Ok(());
            }
            if deadline.expired() {
                return Err(ExecError::HandshakeTimeout {
                    role: self.role,
                    waited: deadline.elapsed(),
                });
            }
            if !still_alive()? {
                // The signal may have landed between the last wait and the exit.
                if take(&set, Duration::ZERO)? {
                    return Ok(());
                }
                return Err(ExecError::WorkerGone { role: self.role });
            }
        }
    }
}

/// Wait up to `slice` for one signal from `set`. `false` on timeout or interruption.
fn take(set: &libc::sigset_t, slice: Duration) -> ExecResult<bool> {
    let ts = libc::timespec {
        tv_sec: slice.as_secs() as libc::time_t,
        tv_nsec: slice.subsec_nanos() as libc::c_long,
    };
    let rc = unsafe { libc::sigtimedwait(set, ptr::null_mut(), &ts) };
    if rc > 0 {
        return Ok(true);
    }
    let err = io::Error::last_os_error();
    match err.raw_os_error() {
        Some(libc::EAGAIN) | Some(libc::EINTR) => Ok(false),
        _ => Err(ExecError::os("sigtimedwait", err)),
    }
}

/// Consume every pending signal in `set` without blocking.
fn drain(set: &libc::sigset_t) {
    let zero = libc::timespec {
        tv_sec: 0,
        tv_nsec: 0,
    };
    while unsafe { libc::sigtimedwait(set, ptr::null_mut(), &zero) } > 0 {}
}

fn signal_set(signals: &[libc::c_int]) -> libc::sigset_t {
    unsafe {
        let mut set: libc::sigset_t = mem::zeroed();
        libc::sigemptyset(&mut set);
        for &s in signals {
            libc::sigaddset(&mut set, s);
        }
        set
    }
}

/// Blocks the handshake signals in the current thread until dropped.
///
/// Not `Send`: the mask belongs to the thread that created it.
struct SignalMask {
    previous: libc::sigset_t,
    _thread_bound: PhantomData<*const ()>,
}

impl SignalMask {
    fn block(signals: &[libc::c_int]) -> io::Result<Self> {
        let set = signal_set(signals);
        let mut previous: libc::sigset_t = unsafe { mem::zeroed() };
        let rc = unsafe { libc::pthread_sigmask(libc::SIG_BLOCK, &set, &mut previous) };
        if rc != 0 {
            return Err(io::Error::from_raw_os_error(rc));
        }
        Ok(Self {
            previous,
            _thread_bound: PhantomData,
        })
    }
}

impl Drop for SignalMask {
    fn drop(&mut self) {
        drain(&signal_set(&HANDSHAKE_SIGNALS));
        unsafe {
            libc::pthread_sigmask(libc::SIG_SETMASK, &self.previous, ptr::null_mut());
        }
    }
}
