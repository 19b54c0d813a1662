//! CLI argument definitions using clap derive macros.

use clap::Parser;

/// Download a file in parallel from multiple HTTP/HTTPS/FTP mirrors.
///
/// Each mirror contributes disjoint byte ranges to one output file. A
/// `.pymget` sidecar file records progress so an interrupted download can
/// resume where it left off.
#[derive(Parser, Debug)]
#[command(name = "pymget")]
#[command(author, version, about)]
pub struct Args {
    /// Mirror URLs (http://, https:// or ftp://).
    pub urls: Vec<String>,

    /// Block size per request, e.g. `4M`, `512K`, or a plain byte count.
    #[arg(short = 'b', long = "block-size", default_value = "4M")]
    pub block_size: String,

    /// Network timeout in seconds.
    #[arg(short = 'T', long, default_value_t = 10)]
    pub timeout: u64,

    /// Read additional mirror URLs from a file, one per line.
    #[arg(short = 'u', long = "urls-file")]
    pub urls_file: Option<String>,

    /// Output file path or directory (defaults to the server's filename in
    /// the current directory).
    #[arg(short = 'o', long = "out-file", default_value = "")]
    pub out_file: String,

    /// Increase output verbosity (-v for debug, -vv for trace).
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output.
    #[arg(short, long)]
    pub quiet: bool,
}
