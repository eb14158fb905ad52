//! Completion record and its fixed-size System V message layout.
use std::mem;

use shuttle_model::BusRole;

use crate::{ExecError, ExecResult};

/// Message class of completion records. Receivers filter on it, so foreign
/// traffic on the same queue is never mistaken for a completion.
pub const MESSAGE_TAG: libc::c_long = 5;

/// Size of the label field, NUL terminator included.
pub const LABEL_CAPACITY: usize = 100;

/// What a worker reports once its batch is drained.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionRecord {
    pub label: String,
    pub count: u32,
}

impl CompletionRecord {
    pub fn new(label: impl Into<String>, count: u32) -> Self {
        Self {
            label: label.into(),
            count,
        }
    }

    pub fn for_role(role: BusRole, count: u32) -> Self {
        Self::new(role.label(), count)
    }

    /// Role named by the label, if it is one of the bus labels.
    pub fn role(&self) -> Option<BusRole> {
        BusRole::from_label(&self.label)
    }

    /// Validate and lay the record out for `msgsnd`.
    ///
    /// Rules:
    /// - label is non-empty, has no NUL byte and fits in `LABEL_CAPACITY - 1` bytes;
    /// - count fits in a C `int`.
    pub(crate) fn encode(&self) -> ExecResult<RawMessage> {
        let bytes = self.label.as_bytes();
        if bytes.is_empty() || bytes.len() >= LABEL_CAPACITY {
            return Err(ExecError::InvalidRecord(format!(
                "label must be 1..{} bytes, got {}",
                LABEL_CAPACITY,
                bytes.len()
            )));
        }
        if bytes.contains(&0) {
            return Err(ExecError::InvalidRecord("label contains a NUL byte".into()));
        }
        let count = libc::c_int::try_from(self.count)
            .map_err(|_| ExecError::InvalidRecord(format!("count {} out of range", self.count)))?;

        let mut raw = RawMessage::zeroed();
        raw.mtype = MESSAGE_TAG;
        raw.mtext[..bytes.len()].copy_from_slice(bytes);
        raw.count = count;
        Ok(raw)
    }

    /// Validate a message received with `msgrcv`.
    pub(crate) fn decode(raw: &RawMessage) -> ExecResult<Self> {
        if raw.mtype != MESSAGE_TAG {
            return Err(ExecError::InvalidRecord(format!(
                "unexpected message class {}",
                raw.mtype
            )));
        }
        let end = raw
            .mtext
            .iter()
            .position(|&b| b == 0)
            .ok_or_else(|| ExecError::InvalidRecord("label is not NUL terminated".into()))?;
        let label = std::str::from_utf8(&raw.mtext[..end])
            .map_err(|e| ExecError::InvalidRecord(format!("label is not UTF-8: {e}")))?;
        let count = u32::try_from(raw.count)
            .map_err(|_| ExecError::InvalidRecord(format!("negative count {}", raw.count)))?;

        Ok(Self::new(label, count))
    }
}

/// Wire layout shared by sender and receiver.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub(crate) struct RawMessage {
    pub(crate) mtype: libc::c_long,
    pub(crate) mtext: [u8; LABEL_CAPACITY],
    pub(crate) count: libc::c_int,
}

impl RawMessage {
    /// Bytes after `mtype`, as passed to `msgsnd`/`msgrcv`.
    pub(crate) const PAYLOAD_LEN: usize = mem::size_of::<RawMessage>() - mem::size_of::<libc::c_long>();

    pub(crate) fn zeroed() -> Self {
        Self {
            mtype: 0,
            mtext: [0; LABEL_CAPACITY],
            count: 0,
        }
    }
}
