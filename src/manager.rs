//! The coordinator: creates a [`Mirror`] per URL, drives their connect/
//! download cycle, drains the result queue, and owns the output file and
//! its resume [`Context`].

use std::collections::{HashMap, VecDeque};
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tracing::{info, instrument, warn};

use crate::config::Config;
use crate::console::Console;
use crate::error::ManagerError;
use crate::mirror::Mirror;
use crate::outfile::OutputFile;
use crate::queue::{ResultQueue, ResultSender};
use crate::task_result::TaskResult;
use crate::units::calc_units;
use crate::url::MirrorUrl;

pub struct Manager {
    block_size: u64,
    timeout: Duration,
    server_filename: String,
    mirrors: HashMap<String, Mirror>,
    client: reqwest::Client,
    tx: ResultSender,
    rx: ResultQueue,
    outfile: OutputFile,
    offset: u64,
    written_bytes: u64,
    failed_parts: VecDeque<u64>,
    file_size: u64,
    parts_in_progress: Vec<u64>,
    console: Arc<dyn Console>,
}

impl Manager {
    /// Creates a mirror per URL in `config`, resolves the output filename,
    /// opens the output file (and loads its resume context), and seeds
    /// progress state from that context.
    pub async fn new(config: Config, console: Arc<dyn Console>) -> Result<Self, ManagerError> {
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| ManagerError::Fatal(format!("failed to build HTTP client: {e}")))?;

        let (tx, rx) = ResultQueue::channel();
        let mut mirrors = HashMap::new();
        let mut server_filename = String::new();

        for url in config.urls {
            insert_mirror(
                &mut mirrors,
                &mut server_filename,
                url,
                config.block_size,
                config.timeout,
                client.clone(),
                console.as_ref(),
            );
        }
        if mirrors.is_empty() {
            return Err(ManagerError::Fatal("no usable mirrors given".to_string()));
        }
        if server_filename.is_empty() {
            server_filename = "out".to_string();
        }

        let outfile = OutputFile::create(&server_filename, &config.out_file, console.as_ref()).await?;
        let offset = outfile.context.offset;
        let written_bytes = outfile.context.written_bytes;
        let failed_parts = outfile.context.failed_parts.iter().copied().collect();

        Ok(Self {
            block_size: config.block_size,
            timeout: config.timeout,
            server_filename,
            mirrors,
            client,
            tx,
            rx,
            outfile,
            offset,
            written_bytes,
            failed_parts,
            file_size: 0,
            parts_in_progress: Vec::new(),
            console,
        })
    }

    /// Runs until the file is fully downloaded, a fatal error occurs, or
    /// Ctrl-C is pressed.
    #[instrument(skip(self), fields(filename = %self.server_filename))]
    pub async fn download(&mut self) -> Result<(), ManagerError> {
        let cancelled = Arc::new(AtomicBool::new(false));
        let ctrlc_flag = Arc::clone(&cancelled);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                ctrlc_flag.store(true, Ordering::SeqCst);
            }
        });

        while (self.file_size == 0 || self.written_bytes < self.file_size)
            && !cancelled.load(Ordering::SeqCst)
        {
            self.wait_connections().await;
            loop {
                let Some(result) = self.rx.try_recv_timeout().await else {
                    break;
                };
                let dispatch_result = self.dispatch(result).await;
                let mut in_flight: Vec<u64> = self.parts_in_progress.clone();
                in_flight.extend(self.failed_parts.iter().copied());
                self.outfile.context.update(self.offset, self.written_bytes, in_flight);
                dispatch_result?;
            }
        }

        if cancelled.load(Ordering::SeqCst) {
            for mirror in self.mirrors.values() {
                mirror.cancel();
            }
        }

        for mirror in self.mirrors.values_mut() {
            mirror.join().await;
        }
        self.console.finish();

        if cancelled.load(Ordering::SeqCst) {
            let mut in_flight: Vec<u64> = self.parts_in_progress.clone();
            in_flight.extend(self.failed_parts.iter().copied());
            self.outfile.context.update(self.offset, self.written_bytes, in_flight);
            return Err(ManagerError::Cancel);
        }
        self.outfile.context.delete();
        info!(bytes = self.written_bytes, "download complete");
        Ok(())
    }

    async fn wait_connections(&mut self) {
        let names: Vec<String> = self.mirrors.keys().cloned().collect();
        for name in names {
            let Some(mirror) = self.mirrors.get_mut(&name) else {
                continue;
            };
            if !mirror.wait_connection().await {
                continue;
            }
            if mirror.ready {
                self.give_task(&name);
            } else if mirror.need_connect {
                let tx = self.tx.clone();
                if let Some(mirror) = self.mirrors.get_mut(&name) {
                    mirror.connect(tx);
                }
            }
        }
    }

    fn give_task(&mut self, name: &str) {
        let Some(offset) = self.next_offset() else {
            return;
        };
        let tx = self.tx.clone();
        if let Some(mirror) = self.mirrors.get_mut(name) {
            mirror.download(offset, tx);
        }
        self.parts_in_progress.push(offset);
    }

    fn next_offset(&mut self) -> Option<u64> {
        if let Some(offset) = self.failed_parts.pop_front() {
            return Some(offset);
        }
        if self.offset < self.file_size || self.file_size == 0 {
            let offset = self.offset;
            self.offset += self.block_size;
            return Some(offset);
        }
        None
    }

    async fn dispatch(&mut self, result: TaskResult) -> Result<(), ManagerError> {
        match result {
            TaskResult::HeadData { name, file_size, .. } => self.set_file_size(&name, file_size).await,
            TaskResult::Redirect { name, location, .. } => {
                self.redirect(&name, location).await;
                Ok(())
            }
            TaskResult::Progress { name, task_progress } => {
                self.set_progress(&name, task_progress);
                Ok(())
            }
            TaskResult::HeadError { name, status } => self.do_error(&name, status).await,
            TaskResult::Error { name, status, offset } => {
                self.add_failed_part(offset);
                self.do_error(&name, status).await
            }
            TaskResult::Data { name, offset, data, .. } => self.write_data(&name, offset, &data).await,
        }
    }

    async fn set_file_size(&mut self, name: &str, file_size: u64) -> Result<(), ManagerError> {
        if self.file_size == 0 {
            self.file_size = file_size;
            self.console.set_total(file_size);
            self.outfile.seek(file_size.saturating_sub(1)).await?;
            self.outfile.write(&[0_u8]).await?;
            self.console.message(&format!(
                "Downloading {} ({} bytes, {})",
                self.outfile.filename,
                file_size,
                calc_units(file_size as f64)
            ));
        } else if self.file_size != file_size {
            return Err(ManagerError::FileSize);
        }
        if let Some(mirror) = self.mirrors.get_mut(name) {
            mirror.file_size = file_size;
            mirror.ready = true;
            mirror.announce_connected(self.console.as_ref());
        }
        Ok(())
    }

    async fn redirect(&mut self, name: &str, location: MirrorUrl) {
        let location_url = location.url.clone();
        self.delete_mirror(name).await;
        insert_mirror(
            &mut self.mirrors,
            &mut self.server_filename,
            location,
            self.block_size,
            self.timeout,
            self.client.clone(),
            self.console.as_ref(),
        );
        self.console
            .message(&format!("{name} redirected to {location_url}"));
    }

    async fn do_error(&mut self, name: &str, status: u16) -> Result<(), ManagerError> {
        let msg = match status {
            0 => format!("unable to connect to {name}"),
            200 => format!("{name} does not support partial downloads"),
            other => format!("{name} returned HTTP {other}"),
        };
        self.console.error(&msg);
        self.delete_mirror(name).await;
        if self.mirrors.is_empty() {
            return Err(ManagerError::Fatal(
                "all mirrors failed; download cannot continue".to_string(),
            ));
        }
        Ok(())
    }

    async fn delete_mirror(&mut self, name: &str) {
        if let Some(mut mirror) = self.mirrors.remove(name) {
            mirror.join().await;
        }
    }

    fn add_failed_part(&mut self, offset: u64) {
        self.del_active_part(offset);
        self.failed_parts.push_back(offset);
    }

    fn del_active_part(&mut self, offset: u64) {
        if let Some(pos) = self.parts_in_progress.iter().position(|&o| o == offset) {
            self.parts_in_progress.remove(pos);
        }
    }

    fn set_progress(&mut self, name: &str, task_progress: u64) {
        if let Some(mirror) = self.mirrors.get_mut(name) {
            mirror.task_progress = task_progress;
        }
        let in_flight: u64 = self.mirrors.values().map(|m| m.task_progress).sum();
        let progress = self.written_bytes + in_flight;
        self.console.progress(progress);
    }

    async fn write_data(&mut self, name: &str, offset: u64, data: &[u8]) -> Result<(), ManagerError> {
        self.del_active_part(offset);
        self.outfile.seek(offset).await?;
        self.outfile.write(data).await?;
        self.written_bytes += data.len() as u64;
        if let Some(mirror) = self.mirrors.get_mut(name) {
            mirror.done();
        }
        Ok(())
    }
}

fn insert_mirror(
    mirrors: &mut HashMap<String, Mirror>,
    server_filename: &mut String,
    url: MirrorUrl,
    block_size: u64,
    timeout: Duration,
    client: reqwest::Client,
    console: &dyn Console,
) {
    let mirror = Mirror::new(url, block_size, timeout, client);
    if !filename_agrees(server_filename, &mirror, console) {
        warn!(host = mirror.name(), "mirror rejected: filename disagreement");
        return;
    }
    mirrors.insert(mirror.name().to_string(), mirror);
}

/// Checks the mirror's filename against the one already agreed on by
/// earlier mirrors (the first mirror to report a filename decides it for
/// everyone else).
fn filename_agrees(server_filename: &mut String, mirror: &Mirror, console: &dyn Console) -> bool {
    if server_filename.is_empty() {
        if mirror.url.filename.is_empty() {
            console.warning(&format!(
                "{} did not report a filename",
                mirror.name()
            ));
            return console.ask(
                &format!("Download from {} anyway?", mirror.name()),
                false,
            );
        }
        *server_filename = mirror.url.filename.clone();
        return true;
    }
    let base = Path::new(server_filename.as_str())
        .file_name()
        .map_or_else(|| server_filename.clone(), |n| n.to_string_lossy().into_owned());
    if base == mirror.url.filename {
        return true;
    }
    console.warning(&format!(
        "{} offers a different filename than {server_filename}",
        mirror.name()
    ));
    console.ask(&format!("Download from {} anyway?", mirror.name()), false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::console::RecordingConsole;

    #[test]
    fn filename_agrees_accepts_first_mirror_unconditionally() {
        let mut server_filename = String::new();
        let mirror = Mirror::new(
            #[allow(clippy::unwrap_used)]
            MirrorUrl::parse("http://a.example.com/file.iso").unwrap(),
            1024,
            Duration::from_secs(1),
            reqwest::Client::new(),
        );
        let console = RecordingConsole::new(true);
        assert!(filename_agrees(&mut server_filename, &mirror, &console));
        assert_eq!(server_filename, "file.iso");
    }

    #[test]
    fn filename_agrees_matches_basename_of_explicit_path() {
        let mut server_filename = "downloads/file.iso".to_string();
        let mirror = Mirror::new(
            #[allow(clippy::unwrap_used)]
            MirrorUrl::parse("http://b.example.com/other/file.iso").unwrap(),
            1024,
            Duration::from_secs(1),
            reqwest::Client::new(),
        );
        let console = RecordingConsole::new(true);
        assert!(filename_agrees(&mut server_filename, &mirror, &console));
    }

    #[test]
    fn filename_disagreement_asks_before_accepting() {
        let mut server_filename = "file.iso".to_string();
        let mirror = Mirror::new(
            #[allow(clippy::unwrap_used)]
            MirrorUrl::parse("http://b.example.com/different.iso").unwrap(),
            1024,
            Duration::from_secs(1),
            reqwest::Client::new(),
        );
        let console = RecordingConsole::new(false);
        assert!(!filename_agrees(&mut server_filename, &mirror, &console));
    }
}
