//! Completion channel: a System V message queue shared by the coordinator
//! and its workers, addressed by a key derived from a well-known path.
use std::{
    ffi::CString,
    io,
    os::unix::ffi::OsStrExt,
    path::{Path, PathBuf},
    ptr,
};

use serde::{Deserialize, Serialize};
use shuttle_observe::log_if_err;
use tracing::{debug, error, info, warn};

use crate::{
    CompletionRecord, ExecError, ExecResult, MESSAGE_TAG,
    record::RawMessage,
};

/// Well-known token for the completion queue: `ftok(path, project_id)`.
///
/// `path` must exist; only its identity (device and inode) matters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueKey {
    pub path: PathBuf,
    pub project_id: u8,
}

impl Default for QueueKey {
    fn default() -> Self {
        Self {
            path: PathBuf::from("/tmp"),
            project_id: b'S',
        }
    }
}

impl QueueKey {
    pub fn new(path: impl Into<PathBuf>, project_id: u8) -> Self {
        Self {
            path: path.into(),
            project_id,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Derive the System V IPC key.
    pub fn token(&self) -> ExecResult<libc::key_t> {
        if self.project_id == 0 {
            return Err(ExecError::InvalidConfig("queue project id must be non-zero".into()));
        }
        let c_path = CString::new(self.path.as_os_str().as_bytes())
            .map_err(|_| ExecError::InvalidConfig(format!("queue key path {:?} contains NUL", self.path)))?;

        let key = unsafe { libc::ftok(c_path.as_ptr(), libc::c_int::from(self.project_id)) };
        if key == -1 {
            return Err(ExecError::last_os("ftok"));
        }
        Ok(key)
    }
}

/// Owning handle to the completion queue.
///
/// The queue is removed from the system by [`CompletionChannel::destroy`], or on
/// drop as a best-effort fallback, so no record outlives a dispatch.
#[derive(Debug)]
pub struct CompletionChannel {
    id: libc::c_int,
    key: libc::key_t,
    removed: bool,
}

/// Non-owning handle a worker uses to post its record.
#[derive(Debug, Clone, Copy)]
pub struct CompletionSender {
    id: libc::c_int,
}

impl CompletionChannel {
    /// Create the queue, or attach to it if it already exists.
    ///
    /// Completion records left behind by an earlier, aborted dispatch are discarded.
    pub fn open(key: &QueueKey) -> ExecResult<Self> {
        let token = key.token()?;
        let id = unsafe { libc::msgget(token, libc::IPC_CREAT | 0o600) };
        if id == -1 {
            return Err(ExecError::last_os("msgget"));
        }
        let channel = Self {
            id,
            key: token,
            removed: false,
        };

        let mut stale = 0usize;
        while channel.recv(libc::IPC_NOWAIT)?.is_some() {
            stale += 1;
        }
        if stale > 0 {
            warn!(stale, "discarded completion records from a previous dispatch");
        }

        debug!(id, key = token, path = %key.path.display(), "completion channel open");
        Ok(channel)
    }

    /// `true` if a queue is currently registered under `key`.
    pub fn exists(key: &QueueKey) -> ExecResult<bool> {
        let token = key.token()?;
        let id = unsafe { libc::msgget(token, 0) };
        if id != -1 {
            return Ok(true);
        }
        let err = io::Error::last_os_error();
        match err.raw_os_error() {
            Some(libc::ENOENT) => Ok(false),
            _ => Err(ExecError::os("msgget", err)),
        }
    }

    pub fn id(&self) -> libc::c_int {
        self.id
    }

    pub fn sender(&self) -> CompletionSender {
        CompletionSender { id: self.id }
    }

    /// Block until the next completion record arrives.
    ///
    /// An interrupted wait is reported as an error, not retried.
    pub fn receive(&self) -> ExecResult<CompletionRecord> {
        match self.recv(0) {
            Ok(Some(record)) => Ok(arrived(record)),
            Ok(None) => Err(ExecError::QueueGone),
            Err(e) => {
                error!(id = self.id, error = %e, "receiving completion record failed");
                Err(e)
            }
        }
    }

    /// Take the next completion record if one is queued.
    pub fn try_receive(&self) -> ExecResult<Option<CompletionRecord>> {
        match self.recv(libc::IPC_NOWAIT) {
            Ok(record) => Ok(record.map(arrived)),
            Err(e) => {
                error!(id = self.id, error = %e, "receiving completion record failed");
                Err(e)
            }
        }
    }

    /// Remove the queue from the system.
    pub fn destroy(mut self) -> ExecResult<()> {
        self.removed = true;
        remove(self.id)?;
        debug!(id = self.id, key = self.key, "completion channel destroyed");
        Ok(())
    }

    fn recv(&self, flags: libc::c_int) -> ExecResult<Option<CompletionRecord>> {
        let mut raw = RawMessage::zeroed();
        let n = unsafe {
            libc::msgrcv(
                self.id,
                &mut raw as *mut RawMessage as *mut libc::c_void,
                RawMessage::PAYLOAD_LEN,
                MESSAGE_TAG,
                flags,
            )
        };
        if n == -1 {
            let err = io::Error::last_os_error();
            return match err.raw_os_error() {
                Some(libc::ENOMSG) => Ok(None),
                Some(libc::EIDRM) | Some(libc::EINVAL) => Err(ExecError::QueueGone),
                Some(libc::E2BIG) => Err(ExecError::InvalidRecord("oversized message".into())),
                _ => Err(ExecError::os("msgrcv", err)),
            };
        }
        if n as usize != RawMessage::PAYLOAD_LEN {
            return Err(ExecError::InvalidRecord(format!(
                "payload is {n} bytes, expected {}",
                RawMessage::PAYLOAD_LEN
            )));
        }
        CompletionRecord::decode(&raw).map(Some)
    }
}

impl Drop for CompletionChannel {
    fn drop(&mut self) {
        if !self.removed {
            log_if_err!(remove(self.id), "removing completion channel");
        }
    }
}

impl CompletionSender {
    /// Enqueue `record` without blocking.
    ///
    /// Fails with [`ExecError::QueueFull`] or [`ExecError::QueueGone`]; the failure is logged here.
    pub fn post(&self, record: &CompletionRecord) -> ExecResult<()> {
        let raw = record.encode()?;
        let rc = unsafe {
            libc::msgsnd(
                self.id,
                &raw as *const RawMessage as *const libc::c_void,
                RawMessage::PAYLOAD_LEN,
                libc::IPC_NOWAIT,
            )
        };
        if rc == -1 {
            let err = io::Error::last_os_error();
            let mapped = match err.raw_os_error() {
                Some(libc::EAGAIN) => ExecError::QueueFull,
                Some(libc::EIDRM) | Some(libc::EINVAL) => ExecError::QueueGone,
                _ => ExecError::os("msgsnd", err),
            };
            error!(id = self.id, label = %record.label, error = %mapped, "posting completion record failed");
            return Err(mapped);
        }
        debug!(id = self.id, label = %record.label, count = record.count, "completion record posted");
        Ok(())
    }
}

fn arrived(record: CompletionRecord) -> CompletionRecord {
    info!("The {} has arrived with {} applicants", record.label, record.count);
    record
}

fn remove(id: libc::c_int) -> ExecResult<()> {
    let rc = unsafe { libc::msgctl(id, libc::IPC_RMID, ptr::null_mut()) };
    if rc == -1 {
        return Err(ExecError::last_os("msgctl(IPC_RMID)"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use shuttle_model::BusRole;
    use tempfile::TempDir;

    fn fresh_key() -> (TempDir, QueueKey) {
        let dir = tempfile::tempdir().unwrap();
        let key = QueueKey::new(dir.path(), b'T');
        (dir, key)
    }

    #[test]
    fn default_key_points_at_tmp() {
        let key = QueueKey::default();
        assert_eq!(key.path(), Path::new("/tmp"));
        assert_ne!(key.project_id, 0);
    }

    #[test]
    fn key_requires_existing_path() {
        let err = QueueKey::new("/definitely/not/here", b'T').token().unwrap_err();
        assert!(matches!(err, ExecError::Os { op: "ftok", .. }));
    }

    #[test]
    fn key_config_parses_with_defaults() {
        let key: QueueKey = serde_json::from_str(r#"{"project_id": 66}"#).unwrap();
        assert_eq!(key.project_id, b'B');
        assert_eq!(key.path, PathBuf::from("/tmp"));
    }

    #[test]
    fn posted_record_is_received_once() {
        let (_dir, key) = fresh_key();
        let channel = CompletionChannel::open(&key).unwrap();

        channel
            .sender()
            .post(&CompletionRecord::for_role(BusRole::First, 3))
            .unwrap();

        let record = channel.receive().unwrap();
        assert_eq!(record, CompletionRecord::new("first bus", 3));
        assert!(channel.try_receive().unwrap().is_none());

        channel.destroy().unwrap();
    }

    #[test]
    fn foreign_message_class_is_not_received() {
        let (_dir, key) = fresh_key();
        let channel = CompletionChannel::open(&key).unwrap();

        let mut foreign = CompletionRecord::new("noise", 9).encode().unwrap();
        foreign.mtype = MESSAGE_TAG + 2;
        let rc = unsafe {
            libc::msgsnd(
                channel.id(),
                &foreign as *const RawMessage as *const libc::c_void,
                RawMessage::PAYLOAD_LEN,
                libc::IPC_NOWAIT,
            )
        };
        assert_eq!(rc, 0);

        assert!(channel.try_receive().unwrap().is_none());
        channel.destroy().unwrap();
    }

    #[test]
    fn reopening_discards_stale_records() {
        let (_dir, key) = fresh_key();
        let first = CompletionChannel::open(&key).unwrap();
        first
            .sender()
            .post(&CompletionRecord::for_role(BusRole::Second, 4))
            .unwrap();

        let second = CompletionChannel::open(&key).unwrap();
        assert_eq!(second.id(), first.id());
        assert!(second.try_receive().unwrap().is_none());

        std::mem::forget(first);
        second.destroy().unwrap();
    }

    #[test]
    fn post_after_destroy_fails_observably() {
        let (_dir, key) = fresh_key();
        let channel = CompletionChannel::open(&key).unwrap();
        let stale = channel.sender();
        channel.destroy().unwrap();

        let err = stale
            .post(&CompletionRecord::for_role(BusRole::First, 1))
            .unwrap_err();
        assert!(matches!(err, ExecError::QueueGone));
    }

    #[test]
    fn existence_follows_lifecycle() {
        let (_dir, key) = fresh_key();
        assert!(!CompletionChannel::exists(&key).unwrap());

        let channel = CompletionChannel::open(&key).unwrap();
        assert!(CompletionChannel::exists(&key).unwrap());

        drop(channel);
        assert!(!CompletionChannel::exists(&key).unwrap());
    }
}
