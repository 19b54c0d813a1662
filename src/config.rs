//! Turns raw CLI input into a validated [`Config`]: parses the block-size
//! suffix, reads an optional `--urls-file`, and resolves every mirror URL.

use std::path::Path;
use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;

use crate::console::Console;
use crate::error::CliError;
use crate::url::MirrorUrl;

/// Fully validated run configuration, ready to hand to [`Manager::new`].
///
/// [`Manager::new`]: crate::manager::Manager::new
#[derive(Debug)]
pub struct Config {
    pub urls: Vec<MirrorUrl>,
    pub block_size: u64,
    pub timeout: Duration,
    pub out_file: String,
}

impl Config {
    /// Builds a [`Config`] from already-split CLI fields. `block_size` and
    /// `urls_file` are the raw, unvalidated strings the user typed. Every
    /// malformed URL is reported through `console` and dropped rather than
    /// silently discarded, so a single typo doesn't just quietly shrink the
    /// mirror list.
    pub fn build(
        mut urls: Vec<String>,
        block_size: &str,
        timeout_secs: u64,
        urls_file: Option<&str>,
        out_file: String,
        console: &dyn Console,
    ) -> Result<Self, CliError> {
        if let Some(path) = urls_file {
            urls.extend(read_urls_file(path)?);
        }

        let mut parsed = Vec::with_capacity(urls.len());
        for u in &urls {
            match MirrorUrl::parse(u) {
                Ok(parsed_url) => parsed.push(parsed_url),
                Err(e) => {
                    tracing::warn!(url = %u, error = %e, "dropping malformed mirror URL");
                    console.error(&format!("skipping invalid mirror URL {u}: {e}"));
                }
            }
        }
        let urls = parsed;
        if urls.is_empty() {
            return Err(CliError::NoUrls);
        }

        Ok(Self {
            urls,
            block_size: parse_block_size(block_size)?,
            timeout: Duration::from_secs(timeout_secs),
            out_file,
        })
    }
}

/// Parses a block-size argument like `4M`, `512K`, or a bare byte count.
pub fn parse_block_size(value: &str) -> Result<u64, CliError> {
    static BLOCK_SIZE_RE: LazyLock<Regex> =
        LazyLock::new(|| {
            #[allow(clippy::unwrap_used)]
            Regex::new(r"^(\d+)([a-zA-Z])?$").unwrap()
        });
    let caps = BLOCK_SIZE_RE
        .captures(value)
        .ok_or_else(|| CliError::InvalidArgument {
            name: "block size",
            value: value.to_string(),
        })?;
    #[allow(clippy::unwrap_used)]
    let number: u64 = caps[1].parse().map_err(|_| CliError::InvalidArgument {
        name: "block size",
        value: value.to_string(),
    })?;
    match caps.get(2).map(|m| m.as_str()) {
        None => Ok(number),
        Some(unit) if unit.eq_ignore_ascii_case("k") => Ok(number * 1024),
        Some(unit) if unit.eq_ignore_ascii_case("m") => Ok(number * 1024 * 1024),
        Some(_) => Err(CliError::InvalidArgument {
            name: "block size",
            value: value.to_string(),
        }),
    }
}

fn read_urls_file(path: &str) -> Result<Vec<String>, CliError> {
    let path_buf = Path::new(path);
    let contents = std::fs::read_to_string(path_buf).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => CliError::FileNotFound {
            path: path_buf.to_path_buf(),
        },
        std::io::ErrorKind::PermissionDenied => CliError::PermissionDenied {
            path: path_buf.to_path_buf(),
        },
        _ => CliError::CorruptedFile {
            path: path_buf.to_path_buf(),
        },
    })?;
    Ok(contents
        .lines()
        .map(|line| line.trim_end_matches(['\r', '\n']).to_string())
        .filter(|line| !line.is_empty())
        .collect())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::console::RecordingConsole;

    #[test]
    fn parses_plain_number() {
        assert_eq!(parse_block_size("4096").unwrap(), 4096);
    }

    #[test]
    fn parses_kilobytes() {
        assert_eq!(parse_block_size("512K").unwrap(), 512 * 1024);
        assert_eq!(parse_block_size("512k").unwrap(), 512 * 1024);
    }

    #[test]
    fn parses_megabytes() {
        assert_eq!(parse_block_size("4M").unwrap(), 4 * 1024 * 1024);
    }

    #[test]
    fn rejects_unknown_suffix() {
        assert!(parse_block_size("4G").is_err());
    }

    #[test]
    fn rejects_non_numeric() {
        assert!(parse_block_size("abc").is_err());
    }

    #[test]
    fn build_rejects_empty_url_list() {
        let console = RecordingConsole::new(true);
        let result = Config::build(vec![], "4M", 10, None, String::new(), &console);
        assert!(matches!(result, Err(CliError::NoUrls)));
    }

    #[test]
    fn build_filters_invalid_urls_and_keeps_valid_ones() {
        let console = RecordingConsole::new(true);
        let config = Config::build(
            vec!["not a url".to_string(), "http://example.com/file.iso".to_string()],
            "4M",
            10,
            None,
            String::new(),
            &console,
        )
        .unwrap();
        assert_eq!(config.urls.len(), 1);
        let messages = console.messages.lock().unwrap();
        assert!(messages.iter().any(|m| m.contains("not a url")));
    }

    #[test]
    fn build_reads_urls_file() {
        let dir = tempfile::tempdir().unwrap();
        let file_path = dir.path().join("mirrors.txt");
        std::fs::write(&file_path, "http://a.example.com/f.iso\nftp://b.example.com/f.iso\n")
            .unwrap();
        let console = RecordingConsole::new(true);
        let config = Config::build(
            vec![],
            "4M",
            10,
            Some(file_path.to_str().unwrap()),
            String::new(),
            &console,
        )
        .unwrap();
        assert_eq!(config.urls.len(), 2);
    }

    #[test]
    fn build_missing_urls_file_is_an_error() {
        let console = RecordingConsole::new(true);
        let result = Config::build(vec![], "4M", 10, Some("/no/such/file.txt"), String::new(), &console);
        assert!(matches!(result, Err(CliError::FileNotFound { .. })));
    }
}
