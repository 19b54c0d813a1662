//! The tagged result every connection/download worker publishes exactly once
//! onto the [`ResultQueue`](crate::queue::ResultQueue).
//!
//! The original implementation dispatched these through a small class
//! hierarchy, each variant overriding a `process(manager)` method. A plain
//! enum matched in [`Manager::dispatch`](crate::manager::Manager::dispatch)
//! says the same thing without the indirection of virtual dispatch for what
//! is, underneath, six fixed shapes of data.

use bytes::Bytes;

use crate::url::MirrorUrl;

/// One mirror's outcome for the task it was just running.
#[derive(Debug)]
pub enum TaskResult {
    /// A HEAD probe (or FTP SIZE) succeeded: the mirror knows the file size.
    HeadData {
        name: String,
        status: u16,
        file_size: u64,
    },
    /// An HTTP(S) HEAD probe returned a redirect; `location` is the resolved
    /// destination URL.
    Redirect {
        name: String,
        status: u16,
        location: MirrorUrl,
    },
    /// A download task reported partial progress (one 32 KiB fragment read).
    Progress { name: String, task_progress: u64 },
    /// A HEAD probe failed outright (bad status, connection error).
    HeadError { name: String, status: u16 },
    /// A download task failed partway through; `offset` is the block that
    /// needs to be retried by another mirror.
    Error {
        name: String,
        status: u16,
        offset: u64,
    },
    /// A download task completed: `data` is the full block read from
    /// `offset`.
    Data {
        name: String,
        status: u16,
        offset: u64,
        data: Bytes,
    },
}

impl TaskResult {
    /// The name (host) of the mirror this result came from.
    pub fn mirror_name(&self) -> &str {
        match self {
            Self::HeadData { name, .. }
            | Self::Redirect { name, .. }
            | Self::Progress { name, .. }
            | Self::HeadError { name, .. }
            | Self::Error { name, .. }
            | Self::Data { name, .. } => name,
        }
    }
}
