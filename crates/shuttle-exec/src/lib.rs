//! Process-level plumbing for bus dispatch: data pipes, readiness handshakes,
//! the shared completion queue and forked workers.
//!
//! Everything here talks to the kernel through `libc`; nothing in this crate
//! knows how batches are planned.
#[cfg(not(unix))]
compile_error!("shuttle-exec requires a Unix platform (fork, pipes, System V message queues)");

mod error;
pub use error::{ExecError, ExecResult};

mod utils;

mod pipe;
pub use pipe::{PipeReader, PipeWriter, channel};

mod handshake;
pub use handshake::HandshakeKind;

mod record;
pub use record::{CompletionRecord, LABEL_CAPACITY, MESSAGE_TAG};

mod queue;
pub use queue::{CompletionChannel, CompletionSender, QueueKey};

mod worker;
pub use worker::{WaitPolicy, WorkerExit, WorkerHandle, WorkerState, spawn_worker};
