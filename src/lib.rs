//! pymget core library.
//!
//! Downloads a single file in parallel from multiple HTTP/HTTPS/FTP mirrors,
//! each mirror contributing disjoint byte ranges into one output file, with
//! crash-safe resume via a sidecar state file.
//!
//! # Architecture
//!
//! - [`url`] - mirror URL parsing and redirect-location resolution
//! - [`mirror`] - per-mirror connection/download state machine
//! - [`workers`] - the connection and download tasks spawned per mirror
//! - [`manager`] - the coordinator: assigns offsets, drains results, dispatches work
//! - [`outfile`] / [`context`] - the output file and its crash-safe resume record
//! - [`console`] - terminal message/warning/error/ask/progress output
//! - [`config`] - the parsed configuration the CLI produces

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod connection;
pub mod console;
pub mod context;
pub mod error;
pub mod manager;
pub mod mirror;
pub mod outfile;
pub mod queue;
pub mod task_result;
pub mod units;
pub mod url;
pub mod workers;

pub use config::Config;
pub use console::Console;
pub use context::Context;
pub use error::{ManagerError, UrlError};
pub use manager::Manager;
pub use mirror::Mirror;
pub use outfile::OutputFile;
pub use url::{MirrorUrl, Protocol};

/// User-agent / version string reported to mirrors and in `--version` output.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Fixed fragment size used by every download worker: 32 KiB.
pub const FRAGMENT_SIZE: usize = 32 * 1024;
