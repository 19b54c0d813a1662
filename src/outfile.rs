//! The output file the coordinator writes downloaded ranges into, plus the
//! directory/overwrite prompts needed to get it open.

use std::path::{Path, PathBuf};

use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncSeekExt, AsyncWriteExt};

use crate::console::Console;
use crate::context::Context;
use crate::error::{ManagerError, OutfileError};

/// The file being written to, plus its crash-safe resume [`Context`].
pub struct OutputFile {
    pub filename: String,
    pub fullpath: PathBuf,
    pub context: Context,
    file: File,
}

impl OutputFile {
    /// Resolves `user_path` (the `-o`/`--out-file` argument, may be empty)
    /// against `server_filename` (the name the first mirror agreed on),
    /// prompting to create missing directories or confirm overwrites as
    /// needed, then opens the file for writing/updating.
    pub async fn create(
        server_filename: &str,
        user_path: &str,
        console: &dyn Console,
    ) -> Result<Self, ManagerError> {
        let (filename, dir, fullpath) = if user_path.is_empty() {
            (server_filename.to_string(), PathBuf::new(), PathBuf::from(server_filename))
        } else if tokio::fs::metadata(user_path).await.is_ok_and(|m| m.is_dir()) {
            let dir = PathBuf::from(user_path);
            let fullpath = dir.join(server_filename);
            (server_filename.to_string(), dir, fullpath)
        } else {
            let fullpath = PathBuf::from(user_path);
            let filename = fullpath
                .file_name()
                .map_or_else(|| server_filename.to_string(), |n| n.to_string_lossy().into_owned());
            let dir = fullpath.parent().map_or_else(PathBuf::new, Path::to_path_buf);
            check_folders(&dir, console).await?;
            (filename, dir, fullpath)
        };
        let _ = dir;

        let mut context = Context::load(&fullpath);
        let file = open_file(&fullpath, &mut context, console).await?;

        Ok(Self {
            filename,
            fullpath,
            context,
            file,
        })
    }

    /// Moves the write cursor to `offset` bytes from the start of the file.
    pub async fn seek(&mut self, offset: u64) -> Result<(), OutfileError> {
        self.file
            .seek(std::io::SeekFrom::Start(offset))
            .await
            .map_err(|e| OutfileError::write(&self.fullpath, e))?;
        Ok(())
    }

    /// Writes `data` at the current cursor position.
    pub async fn write(&mut self, data: &[u8]) -> Result<(), OutfileError> {
        self.file
            .write_all(data)
            .await
            .map_err(|e| OutfileError::write(&self.fullpath, e))
    }

    pub async fn flush(&mut self) -> Result<(), OutfileError> {
        self.file
            .flush()
            .await
            .map_err(|e| OutfileError::write(&self.fullpath, e))
    }
}

async fn check_folders(dir: &Path, console: &dyn Console) -> Result<(), ManagerError> {
    if dir.as_os_str().is_empty() || tokio::fs::metadata(dir).await.is_ok_and(|m| m.is_dir()) {
        return Ok(());
    }

    let mut built = PathBuf::new();
    for component in dir.components() {
        built.push(component);
        match tokio::fs::metadata(&built).await {
            Ok(meta) if meta.is_dir() => continue,
            Ok(_) => return Err(OutfileError::dir_is_file(&built).into()),
            Err(_) => {}
        }
        if !console.ask(&format!("Create directory {}?", built.display()), true) {
            return Err(ManagerError::Cancel);
        }
        tokio::fs::create_dir(&built)
            .await
            .map_err(|e| OutfileError::create_dir(&built, e))?;
    }
    Ok(())
}

async fn open_file(
    fullpath: &Path,
    context: &mut Context,
    console: &dyn Console,
) -> Result<File, ManagerError> {
    if context.clean {
        if tokio::fs::metadata(fullpath).await.is_ok() {
            if !console.ask(&format!("{} already exists. Overwrite?", fullpath.display()), false) {
                return Err(ManagerError::Cancel);
            }
        }
        return File::create(fullpath)
            .await
            .map_err(|e| OutfileError::create_file(fullpath, e).into());
    }

    match OpenOptions::new().read(true).write(true).open(fullpath).await {
        Ok(file) => Ok(file),
        Err(e) if tokio::fs::metadata(fullpath).await.is_ok() => {
            Err(OutfileError::open_file(fullpath, e).into())
        }
        Err(_) => {
            if !console.ask(&format!("{} does not exist. Create?", fullpath.display()), true) {
                return Err(ManagerError::Cancel);
            }
            context.reset();
            File::create(fullpath)
                .await
                .map_err(|e| OutfileError::create_file(fullpath, e).into())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::console::RecordingConsole;

    #[tokio::test]
    #[allow(clippy::unwrap_used)]
    async fn creates_new_file_with_server_filename_in_given_directory() {
        let dir = tempfile::tempdir().unwrap();
        let console = RecordingConsole::new(true);
        let out = OutputFile::create("archive.iso", dir.path().to_str().unwrap(), &console)
            .await
            .unwrap();
        assert_eq!(out.filename, "archive.iso");
        assert!(out.fullpath.starts_with(dir.path()));
    }

    #[tokio::test]
    #[allow(clippy::unwrap_used)]
    async fn empty_user_path_uses_server_filename_in_cwd() {
        let console = RecordingConsole::new(true);
        let tmp = tempfile::tempdir().unwrap();
        std::env::set_current_dir(tmp.path()).unwrap();
        let out = OutputFile::create("server-name.bin", "", &console).await.unwrap();
        assert_eq!(out.fullpath, PathBuf::from("server-name.bin"));
    }

    #[tokio::test]
    #[allow(clippy::unwrap_used)]
    async fn explicit_filename_overrides_server_name() {
        let dir = tempfile::tempdir().unwrap();
        let console = RecordingConsole::new(true);
        let target = dir.path().join("renamed.bin");
        let out = OutputFile::create("server-name.bin", target.to_str().unwrap(), &console)
            .await
            .unwrap();
        assert_eq!(out.filename, "renamed.bin");
        assert_eq!(out.fullpath, target);
    }

    #[tokio::test]
    #[allow(clippy::unwrap_used)]
    async fn declining_overwrite_cancels() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("existing.bin");
        tokio::fs::write(&target, b"old").await.unwrap();
        let console = RecordingConsole::new(false);
        let result = OutputFile::create("existing.bin", target.to_str().unwrap(), &console).await;
        assert!(matches!(result, Err(ManagerError::Cancel)));
    }
}
