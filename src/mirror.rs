//! A single mirror's connection/download state machine.
//!
//! HTTP and HTTPS mirrors behave identically once a request is built (the
//! difference is only in the URL scheme reqwest sees), so unlike the
//! original's `Mirror`/`HTTXMirror`/`HTTPMirror`/`HTTPSMirror`/`FTPMirror`
//! class hierarchy, protocol differences here are a single runtime branch on
//! [`Protocol`] rather than a subclass per protocol.

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::connection::Connection;
use crate::console::Console;
use crate::queue::ResultSender;
use crate::url::{MirrorUrl, Protocol};
use crate::workers::{connect, download};

type WorkerHandle = JoinHandle<Option<Connection>>;

/// Per-mirror state: what connection it holds, whether it's mid-task, and
/// whether it's ready for its next assignment.
pub struct Mirror {
    pub url: MirrorUrl,
    block_size: u64,
    timeout: Duration,
    client: reqwest::Client,
    pub file_size: u64,
    pub task_progress: u64,
    conn: Option<Connection>,
    pub need_connect: bool,
    pub ready: bool,
    conn_task: Option<WorkerHandle>,
    dnl_task: Option<WorkerHandle>,
    /// FTP mirrors print "Connected to ..." only once, even though they
    /// reconnect before every block.
    announced: bool,
    /// Flipped by [`cancel`](Self::cancel); observed by the connect/download
    /// workers so a shutdown aborts in-flight network I/O instead of waiting
    /// for it to finish naturally.
    token: CancellationToken,
}

impl Mirror {
    pub fn new(url: MirrorUrl, block_size: u64, timeout: Duration, client: reqwest::Client) -> Self {
        Self {
            url,
            block_size,
            timeout,
            client,
            file_size: 0,
            task_progress: 0,
            conn: None,
            need_connect: true,
            ready: false,
            conn_task: None,
            dnl_task: None,
            announced: false,
            token: CancellationToken::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.url.host
    }

    /// Starts a fresh connection attempt (HEAD probe, or FTP login+CWD+SIZE).
    pub fn connect(&mut self, tx: ResultSender) {
        self.ready = false;
        self.need_connect = false;
        let url = self.url.clone();
        let timeout = self.timeout;
        let client = self.client.clone();
        let token = self.token.clone();
        self.conn_task = Some(match url.protocol {
            Protocol::Http | Protocol::Https => {
                tokio::spawn(connect::connect_http(url, timeout, client, tx, token))
            }
            Protocol::Ftp => tokio::spawn(connect::connect_ftp(url, timeout, tx, token)),
        });
    }

    /// Starts downloading the block starting at `offset`.
    pub fn download(&mut self, offset: u64, tx: ResultSender) {
        self.ready = false;
        let url = self.url.clone();
        let client = self.client.clone();
        let block_size = self.block_size;
        let file_size = self.file_size;
        #[allow(clippy::unwrap_used)]
        let conn = self.conn.take().unwrap_or(Connection::Http);
        let token = self.token.clone();
        self.dnl_task = Some(match url.protocol {
            Protocol::Http | Protocol::Https => tokio::spawn(download::download_http(
                url, client, offset, block_size, tx, token,
            )),
            Protocol::Ftp => tokio::spawn(download::download_ftp(
                url, conn, offset, block_size, file_size, tx, token,
            )),
        });
    }

    /// Polls (non-blockingly) whether this mirror's in-flight tasks have
    /// finished. Returns `true` once neither a connect nor a download task
    /// is still running, at which point the mirror is idle: ready to be
    /// given a task, or to be connected.
    ///
    /// A finished `JoinHandle` *is* the one-shot "task done" event here -
    /// the direct substitute for the original's `threading.Event` that each
    /// worker thread set right before exiting.
    pub async fn wait_connection(&mut self) -> bool {
        if let Some(task) = &self.conn_task {
            if !task.is_finished() {
                return false;
            }
            #[allow(clippy::unwrap_used)]
            let task = self.conn_task.take().unwrap();
            if let Ok(conn) = task.await {
                self.conn = conn;
            }
        }
        if let Some(task) = &self.dnl_task {
            if !task.is_finished() {
                return false;
            }
            #[allow(clippy::unwrap_used)]
            let task = self.dnl_task.take().unwrap();
            if let Ok(conn) = task.await {
                self.conn = conn;
            }
        }
        true
    }

    /// Marks the current task as finished. FTP mirrors always need a fresh
    /// connection before their next block (the control connection is closed
    /// after every transfer); HTTP(S) mirrors are immediately ready again.
    pub fn done(&mut self) {
        self.task_progress = 0;
        self.ready = true;
        if self.url.protocol == Protocol::Ftp {
            self.ready = false;
            self.need_connect = true;
        }
    }

    /// Prints the "connected" message, once per mirror for FTP (which
    /// reconnects before every block and would otherwise spam the console).
    pub fn announce_connected(&mut self, console: &dyn Console) {
        if self.url.protocol == Protocol::Ftp {
            if self.announced {
                return;
            }
            self.announced = true;
        }
        console.message(&format!("Connected to {}", self.url.host));
    }

    /// Tells any live connect/download task to stop cooperatively. The task
    /// observes this at its next cancellation point and returns without
    /// publishing a `TaskResult` - the mirror is about to be joined and
    /// dropped, so there is nothing left to report it to.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Waits for any in-flight tasks to finish, without regard for their
    /// result - used during shutdown.
    pub async fn join(&mut self) {
        if let Some(task) = self.conn_task.take() {
            let _ = task.await;
        }
        if let Some(task) = self.dnl_task.take() {
            let _ = task.await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_mirror(protocol_url: &str) -> Mirror {
        #[allow(clippy::unwrap_used)]
        let url = MirrorUrl::parse(protocol_url).unwrap();
        Mirror::new(url, 1024, Duration::from_secs(5), reqwest::Client::new())
    }

    #[test]
    fn new_mirror_needs_connect_and_is_not_ready() {
        let mirror = test_mirror("http://example.com/file.bin");
        assert!(mirror.need_connect);
        assert!(!mirror.ready);
    }

    #[test]
    fn http_done_marks_ready_without_requiring_reconnect() {
        let mut mirror = test_mirror("http://example.com/file.bin");
        mirror.need_connect = false;
        mirror.done();
        assert!(mirror.ready);
        assert!(!mirror.need_connect);
    }

    #[test]
    fn ftp_done_requires_reconnect_before_next_block() {
        let mut mirror = test_mirror("ftp://example.com/file.bin");
        mirror.need_connect = false;
        mirror.done();
        assert!(!mirror.ready);
        assert!(mirror.need_connect);
    }

    #[tokio::test]
    async fn wait_connection_is_true_with_no_tasks_running() {
        let mut mirror = test_mirror("http://example.com/file.bin");
        assert!(mirror.wait_connection().await);
    }
}
