//! Crash-safe resume record: a small sidecar file recording how far a
//! download has gotten, so a second run of the program can continue instead
//! of starting over.
//!
//! File format (all integers 64-bit little-endian):
//!
//! ```text
//! offset          u64
//! written_bytes   u64
//! failed_count    u64
//! failed_offsets  [u64; failed_count]
//! ```

use std::collections::HashSet;
use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

const HEADER_LEN: usize = 24; // 3 * size_of::<u64>()

/// The resume record sitting next to the output file as `<filename>.pymget`.
#[derive(Debug)]
pub struct Context {
    path: PathBuf,
    pub offset: u64,
    pub written_bytes: u64,
    pub failed_parts: Vec<u64>,
    /// `true` when no usable resume record was found: this is a first run.
    pub clean: bool,
}

impl Context {
    /// Loads the resume record sitting next to `fullpath`, if any. Any read
    /// or parse failure is treated the same as "no record" (clean start) —
    /// a half-written or foreign sidecar file should never abort a download.
    pub fn load(fullpath: &Path) -> Self {
        let path = sidecar_path(fullpath);
        match Self::try_load(&path) {
            Some((offset, written_bytes, failed_parts)) => Self {
                path,
                offset,
                written_bytes,
                failed_parts,
                clean: false,
            },
            None => Self {
                path,
                offset: 0,
                written_bytes: 0,
                failed_parts: Vec::new(),
                clean: true,
            },
        }
    }

    fn try_load(path: &Path) -> Option<(u64, u64, Vec<u64>)> {
        let mut file = fs::File::open(path).ok()?;
        let mut header = [0_u8; HEADER_LEN];
        file.read_exact(&mut header).ok()?;
        let offset = u64::from_le_bytes(header[0..8].try_into().ok()?);
        let written_bytes = u64::from_le_bytes(header[8..16].try_into().ok()?);
        let failed_count = u64::from_le_bytes(header[16..24].try_into().ok()?);
        let failed_count = usize::try_from(failed_count).ok()?;

        let mut body = vec![0_u8; failed_count.checked_mul(8)?];
        file.read_exact(&mut body).ok()?;
        let failed_parts = body
            .chunks_exact(8)
            .map(|chunk| {
                #[allow(clippy::unwrap_used)]
                u64::from_le_bytes(chunk.try_into().unwrap())
            })
            .collect();
        Some((offset, written_bytes, failed_parts))
    }

    /// Whether `offset`/`written_bytes`/`failed_parts` differ from what's
    /// currently recorded.
    fn modified(&self, offset: u64, written_bytes: u64, failed_parts: &[u64]) -> bool {
        self.offset != offset
            || self.written_bytes != written_bytes
            || self.failed_parts.iter().collect::<HashSet<_>>()
                != failed_parts.iter().collect::<HashSet<_>>()
    }

    /// Rewrites the sidecar file if the given state differs from what's
    /// currently recorded. A no-op write avoids wearing out disks with a
    /// fresh fsync on every queue-drain iteration when nothing changed.
    pub fn update(&mut self, offset: u64, written_bytes: u64, failed_parts: Vec<u64>) {
        if !self.modified(offset, written_bytes, &failed_parts) {
            return;
        }
        self.offset = offset;
        self.written_bytes = written_bytes;
        self.failed_parts = failed_parts;

        let mut buf = Vec::with_capacity(HEADER_LEN + self.failed_parts.len() * 8);
        buf.extend_from_slice(&self.offset.to_le_bytes());
        buf.extend_from_slice(&self.written_bytes.to_le_bytes());
        #[allow(clippy::cast_possible_truncation)]
        buf.extend_from_slice(&(self.failed_parts.len() as u64).to_le_bytes());
        for part in &self.failed_parts {
            buf.extend_from_slice(&part.to_le_bytes());
        }
        // Best-effort: a failed write here only costs a slower resume later.
        if let Ok(mut file) = fs::File::create(&self.path) {
            let _ = file.write_all(&buf);
        }
    }

    /// Resets to a clean, zeroed state and rewrites the sidecar file.
    pub fn reset(&mut self) {
        self.update(0, 0, Vec::new());
        self.clean = true;
    }

    /// Removes the sidecar file once the download has completed. Ignores
    /// errors: a missing file is already the desired end state.
    pub fn delete(&self) {
        let _ = fs::remove_file(&self.path);
    }
}

fn sidecar_path(fullpath: &Path) -> PathBuf {
    let mut name = fullpath.as_os_str().to_os_string();
    name.push(".pymget");
    PathBuf::from(name)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn load_with_no_sidecar_is_clean() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("file.iso");
        let ctx = Context::load(&target);
        assert!(ctx.clean);
        assert_eq!(ctx.offset, 0);
        assert!(ctx.failed_parts.is_empty());
    }

    #[test]
    fn round_trips_through_update_and_load() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("file.iso");
        let mut ctx = Context::load(&target);
        ctx.update(4096, 2048, vec![0, 2048]);

        let reloaded = Context::load(&target);
        assert!(!reloaded.clean);
        assert_eq!(reloaded.offset, 4096);
        assert_eq!(reloaded.written_bytes, 2048);
        assert_eq!(reloaded.failed_parts, vec![0, 2048]);
    }

    #[test]
    fn reset_zeroes_state_and_marks_clean() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("file.iso");
        let mut ctx = Context::load(&target);
        ctx.update(4096, 2048, vec![0]);
        ctx.reset();
        assert!(ctx.clean);
        assert_eq!(ctx.offset, 0);
        assert!(ctx.failed_parts.is_empty());

        let reloaded = Context::load(&target);
        assert_eq!(reloaded.offset, 0);
    }

    #[test]
    fn delete_removes_sidecar_file() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("file.iso");
        let mut ctx = Context::load(&target);
        ctx.update(1, 1, vec![]);
        assert!(sidecar_path(&target).exists());
        ctx.delete();
        assert!(!sidecar_path(&target).exists());
    }

    #[test]
    fn garbage_sidecar_file_is_treated_as_clean() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("file.iso");
        fs::write(sidecar_path(&target), b"not a context file").unwrap();
        let ctx = Context::load(&target);
        assert!(ctx.clean);
    }
}
