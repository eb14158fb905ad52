//! Forked workers.
//!
//! [`spawn_worker`] forks once. The child runs [`run_worker_body`] and never
//! returns into the caller's frames; the parent gets a [`WorkerHandle`] that
//! owns the write end of the data pipe, the readiness waiter and the pid, and
//! walks the per-worker protocol:
//!
//! ```text
//! Spawned -> Ready -> Transferring -> AwaitingCompletion -> Done
//! ```
use std::{
    fmt,
    io::{self, BufRead, BufReader, Write},
    panic::{self, AssertUnwindSafe},
    thread,
    time::{Duration, Instant},
};

use shuttle_model::BusRole;
use tracing::{debug, error, info, trace, warn};

use crate::{
    CompletionChannel, CompletionRecord, CompletionSender, ExecError, ExecResult, HandshakeKind,
    PipeReader, PipeWriter,
    handshake::{self, ReadyNotifier, ReadyWaiter},
    pipe::channel,
    utils::{Deadline, raw_log, raw_log_errno},
};

/// Worker exit codes.
const EXIT_OK: libc::c_int = 0;
const EXIT_HANDSHAKE: libc::c_int = 2;
const EXIT_READ: libc::c_int = 3;
const EXIT_POST: libc::c_int = 4;
const EXIT_PANIC: libc::c_int = 101;

/// Bounds on the coordinator's waits.
#[derive(Debug, Clone, Copy)]
pub struct WaitPolicy {
    /// Give up on the readiness handshake after this long. `None` waits forever.
    pub handshake_timeout: Option<Duration>,
    /// Give up on the completion record after this long. `None` waits forever.
    pub completion_timeout: Option<Duration>,
    /// How often queue and worker liveness are re-checked while waiting.
    pub poll_interval: Duration,
}

impl Default for WaitPolicy {
    fn default() -> Self {
        Self {
            handshake_timeout: None,
            completion_timeout: None,
            poll_interval: Duration::from_millis(10),
        }
    }
}

/// Protocol position of a worker, as seen by the coordinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    Spawned,
    Ready,
    Transferring,
    AwaitingCompletion,
    Done,
}

impl fmt::Display for WorkerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            WorkerState::Spawned => "spawned",
            WorkerState::Ready => "ready",
            WorkerState::Transferring => "transferring",
            WorkerState::AwaitingCompletion => "awaiting completion",
            WorkerState::Done => "done",
        })
    }
}

/// How a reaped worker ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerExit {
    Code(i32),
    Signal(i32),
}

impl WorkerExit {
    fn from_wait_status(status: libc::c_int) -> Self {
        if libc::WIFSIGNALED(status) {
            WorkerExit::Signal(libc::WTERMSIG(status))
        } else {
            WorkerExit::Code(libc::WEXITSTATUS(status))
        }
    }

    pub fn success(&self) -> bool {
        matches!(self, WorkerExit::Code(0))
    }
}

impl fmt::Display for WorkerExit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkerExit::Code(c) => write!(f, "exit code {c}"),
            WorkerExit::Signal(s) => write!(f, "killed by signal {s}"),
        }
    }
}

/// Everything a worker owns after the fork.
struct WorkerContext {
    role: BusRole,
    data: PipeReader,
    ready: ReadyNotifier,
    sender: CompletionSender,
}

/// Fork a worker for `role`.
///
/// Must be called from a single-threaded process, or with every other thread
/// idle: the child only inherits the calling thread.
pub fn spawn_worker(
    role: BusRole,
    kind: HandshakeKind,
    sender: CompletionSender,
) -> ExecResult<WorkerHandle> {
    let (data_rx, data_tx) = channel().map_err(|e| ExecError::os("pipe (data)", e))?;
    let (notifier, waiter) = handshake::prepare(kind, role)?;

    // Anything still buffered would be written twice, once by each process.
    let _ = io::stdout().flush();

    match unsafe { libc::fork() } {
        -1 => Err(ExecError::last_os("fork")),
        0 => {
            drop(waiter);
            drop(data_tx);
            let ctx = WorkerContext {
                role,
                data: data_rx,
                ready: notifier,
                sender,
            };
            let code = match panic::catch_unwind(AssertUnwindSafe(|| run_worker_body(ctx))) {
                Ok(code) => code,
                Err(_) => {
                    raw_log(b"shuttle-exec: worker panicked\n");
                    EXIT_PANIC
                }
            };
            unsafe { libc::_exit(code) }
        }
        pid => {
            drop(notifier);
            drop(data_rx);
            debug!(%role, pid, handshake = %kind, "worker spawned");
            Ok(WorkerHandle {
                pid,
                role,
                state: WorkerState::Spawned,
                data: Some(data_tx),
                ready: waiter,
                exit: None,
                spawned_at: Instant::now(),
            })
        }
    }
}

/// Worker side of the protocol. Returns the process exit code.
///
/// Announces readiness, drains the data pipe to end-of-stream and posts one
/// completion record carrying the number of names actually read.
fn run_worker_body(ctx: WorkerContext) -> libc::c_int {
    let WorkerContext {
        role,
        data,
        ready,
        sender,
    } = ctx;

    if let Err(e) = ready.notify() {
        raw_log(b"shuttle-exec: worker could not signal readiness: ");
        raw_log_errno(e.raw_os_error().unwrap_or(0));
        return EXIT_HANDSHAKE;
    }
    info!("Worker for the {role} is ready");

    let mut count: u32 = 0;
    for line in BufReader::new(data).lines() {
        match line {
            Ok(name) => {
                count += 1;
                info!(bus = %role, "{name}");
            }
            Err(e) => {
                error!(bus = %role, error = %e, "reading batch failed");
                return EXIT_READ;
            }
        }
    }

    match sender.post(&CompletionRecord::for_role(role, count)) {
        Ok(()) => EXIT_OK,
        Err(_) => EXIT_POST,
    }
}

/// Coordinator-side handle to one forked worker.
///
/// Dropping a handle whose worker has not been reaped kills and reaps it, so
/// no early return leaves a child behind.
pub struct WorkerHandle {
    pid: libc::pid_t,
    role: BusRole,
    state: WorkerState,
    data: Option<PipeWriter>,
    ready: ReadyWaiter,
    exit: Option<WorkerExit>,
    spawned_at: Instant,
}

impl WorkerHandle {
    pub fn pid(&self) -> libc::pid_t {
        self.pid
    }

    pub fn role(&self) -> BusRole {
        self.role
    }

    pub fn state(&self) -> WorkerState {
        self.state
    }

    pub fn spawned_at(&self) -> Instant {
        self.spawned_at
    }

    /// `Spawned -> Ready`: wait for the worker's readiness notification.
    pub fn await_ready(&mut self, policy: &WaitPolicy) -> ExecResult<()> {
        self.expect_state(WorkerState::Spawned, "await readiness")?;

        let pid = self.pid;
        let exit = &mut self.exit;
        self.ready.wait(policy.handshake_timeout, policy.poll_interval, || {
            if exit.is_none() {
                *exit = wait_pid(pid, libc::WNOHANG)?;
            }
            Ok(exit.is_none())
        })?;

        self.state = WorkerState::Ready;
        trace!(role = %self.role, pid = self.pid, "worker ready");
        Ok(())
    }

    /// `Ready -> Transferring -> AwaitingCompletion`: stream the batch and close the pipe.
    ///
    /// Each name is written as one newline-terminated record. Closing the write
    /// end is what tells the worker the batch is over.
    pub fn transfer(&mut self, batch: &[String]) -> ExecResult<usize> {
        self.expect_state(WorkerState::Ready, "transfer a batch")?;
        self.state = WorkerState::Transferring;

        let Some(mut pipe) = self.data.take() else {
            return Err(self.protocol_error("transfer a batch"));
        };
        for name in batch {
            pipe.write_all(name.as_bytes())
                .and_then(|_| pipe.write_all(b"\n"))
                .map_err(|e| ExecError::os("write batch", e))?;
        }
        drop(pipe);

        self.state = WorkerState::AwaitingCompletion;
        trace!(role = %self.role, sent = batch.len(), "batch transferred");
        Ok(batch.len())
    }

    /// Wait for this worker's completion record.
    ///
    /// Polls the queue and the worker's liveness until a record arrives, the
    /// worker exits without posting, or the timeout elapses.
    pub fn await_completion(
        &mut self,
        channel: &CompletionChannel,
        policy: &WaitPolicy,
    ) -> ExecResult<CompletionRecord> {
        self.expect_state(WorkerState::AwaitingCompletion, "await completion")?;
        let deadline = Deadline::after(policy.completion_timeout);

        loop {
            if let Some(record) = channel.try_receive()? {
                return Ok(record);
            }
            if self.exit.is_none() {
                self.exit = wait_pid(self.pid, libc::WNOHANG)?;
            }
            if let Some(exit) = self.exit {
                // A well-behaved worker posts before exiting; look once more.
                return match channel.try_receive()? {
                    Some(record) => Ok(record),
                    None => Err(ExecError::WorkerExited {
                        role: self.role,
                        exit,
                    }),
                };
            }
            if deadline.expired() {
                return Err(ExecError::CompletionTimeout {
                    role: self.role,
                    waited: deadline.elapsed(),
                });
            }
            thread::sleep(deadline.next_slice(policy.poll_interval));
        }
    }

    /// `AwaitingCompletion -> Done`: collect the worker's exit status.
    pub fn reap(&mut self) -> ExecResult<WorkerExit> {
        self.expect_state(WorkerState::AwaitingCompletion, "reap")?;
        let exit = match self.exit {
            Some(exit) => exit,
            None => wait_pid(self.pid, 0)?.ok_or_else(|| self.protocol_error("reap"))?,
        };
        self.exit = Some(exit);
        self.state = WorkerState::Done;

        if !exit.success() {
            warn!(role = %self.role, pid = self.pid, %exit, "worker ended abnormally");
        }
        Ok(exit)
    }

    fn expect_state(&self, want: WorkerState, action: &'static str) -> ExecResult<()> {
        if self.state != want {
            return Err(self.protocol_error(action));
        }
        Ok(())
    }

    fn protocol_error(&self, action: &'static str) -> ExecError {
        ExecError::Protocol {
            role: self.role,
            state: self.state,
            action,
        }
    }
}

impl Drop for WorkerHandle {
    fn drop(&mut self) {
        drop(self.data.take());
        if self.exit.is_some() {
            return;
        }
        warn!(role = %self.role, pid = self.pid, state = %self.state, "killing unfinished worker");
        unsafe {
            libc::kill(self.pid, libc::SIGKILL);
        }
        if let Err(e) = wait_pid(self.pid, 0) {
            error!(role = %self.role, pid = self.pid, error = %e, "reaping killed worker failed");
        }
    }
}

/// `waitpid` retried on `EINTR`. `None` if `WNOHANG` was given and the child is still running.
fn wait_pid(pid: libc::pid_t, flags: libc::c_int) -> ExecResult<Option<WorkerExit>> {
    loop {
        let mut status: libc::c_int = 0;
        let rc = unsafe { libc::waitpid(pid, &mut status, flags) };
        match rc {
            -1 => {
                let err = io::Error::last_os_error();
                if err.kind() == io::ErrorKind::Interrupted {
                    continue;
                }
                return Err(ExecError::os("waitpid", err));
            }
            0 => return Ok(None),
            _ => return Ok(Some(WorkerExit::from_wait_status(status))),
        }
    }
}
