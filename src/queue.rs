//! The result queue workers publish onto and the coordinator drains: the
//! single channel every connection/download task's outcome flows through.

use std::time::Duration;

use tokio::sync::mpsc;

use crate::task_result::TaskResult;

/// Poll interval the coordinator waits between drains of an empty queue.
pub const POLL_INTERVAL: Duration = Duration::from_millis(10);

pub type ResultSender = mpsc::UnboundedSender<TaskResult>;

/// Receiving half of the result queue, owned by the [`Manager`].
///
/// [`Manager`]: crate::manager::Manager
pub struct ResultQueue {
    receiver: mpsc::UnboundedReceiver<TaskResult>,
}

impl ResultQueue {
    pub fn channel() -> (ResultSender, Self) {
        let (tx, rx) = mpsc::unbounded_channel();
        (tx, Self { receiver: rx })
    }

    /// Pops the next result if one is already queued, waiting up to
    /// [`POLL_INTERVAL`] for one to arrive. Returns `None` on timeout - the
    /// caller should go back to waiting on mirror connections, exactly the
    /// `queue.Empty` branch of the original polling loop.
    pub async fn try_recv_timeout(&mut self) -> Option<TaskResult> {
        tokio::time::timeout(POLL_INTERVAL, self.receiver.recv())
            .await
            .ok()
            .flatten()
    }
}
