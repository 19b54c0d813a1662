//! The connection and download tasks a [`Mirror`](crate::mirror::Mirror)
//! spawns. Each task is a `tokio::spawn`ed async function - the idiomatic
//! substitute for the original's per-protocol `threading.Thread` subclasses -
//! that publishes exactly one terminal [`TaskResult`](crate::task_result::TaskResult)
//! onto the shared result queue and returns the [`Connection`](crate::connection::Connection)
//! the mirror should keep (or `None` if it needs to reconnect before its next task).

pub mod connect;
pub mod download;

pub(crate) fn user_agent() -> String {
    format!(
        "pymget-rs/{} ({} {})",
        crate::VERSION,
        std::env::consts::OS,
        std::env::consts::ARCH
    )
}
