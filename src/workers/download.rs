//! Download workers: stream one block (at most `block_size` bytes) from
//! `offset`, publishing a [`TaskResult::Progress`] per 32 KiB fragment and a
//! final [`TaskResult::Data`] or [`TaskResult::Error`].

use bytes::{Bytes, BytesMut};
use futures_util::TryStreamExt;
use tokio_util::sync::CancellationToken;
use tracing::{instrument, warn};

use crate::FRAGMENT_SIZE;
use crate::connection::Connection;
use crate::queue::ResultSender;
use crate::task_result::TaskResult;
use crate::url::MirrorUrl;

use super::user_agent;

/// Downloads `[offset, offset + block_size)` over a ranged GET. The server
/// may answer with less than `block_size` bytes near the end of the file;
/// the loop stops once it has everything the `Content-Length` promised.
///
/// Cancelling `cancel` aborts the request or the in-flight body stream; the
/// task returns without publishing a final `TaskResult`.
#[instrument(skip(client, tx, cancel), fields(host = %url.host, offset))]
pub async fn download_http(
    url: MirrorUrl,
    client: reqwest::Client,
    offset: u64,
    block_size: u64,
    tx: ResultSender,
    cancel: CancellationToken,
) -> Option<Connection> {
    let result = run_http(&url, &client, offset, block_size, &tx, &cancel).await;
    match result {
        Ok(()) => Some(Connection::Http),
        Err(Some(status)) => {
            let _ = tx.send(TaskResult::Error {
                name: url.host.clone(),
                status,
                offset,
            });
            None
        }
        Err(None) => None,
    }
}

/// `Err(Some(status))` is a reportable failure; `Err(None)` means the task
/// was cancelled and nothing should be published.
async fn run_http(
    url: &MirrorUrl,
    client: &reqwest::Client,
    offset: u64,
    block_size: u64,
    tx: &ResultSender,
    cancel: &CancellationToken,
) -> Result<(), Option<u16>> {
    let full_url = format!("{}://{}{}", url.protocol, url.host, url.request);
    let referer = format!("{}://{}/", url.protocol, url.host);
    let range = format!("bytes={}-{}", offset, offset + block_size - 1);

    let request = client
        .get(&full_url)
        .header("User-Agent", user_agent())
        .header("Referer", referer)
        .header(reqwest::header::RANGE, range)
        .send();

    let response = tokio::select! {
        biased;
        () = cancel.cancelled() => return Err(None),
        result = request => result.map_err(|_| Some(0_u16))?,
    };

    let status = response.status();
    if status != reqwest::StatusCode::PARTIAL_CONTENT {
        return Err(Some(status.as_u16()));
    }

    let part_size = response
        .headers()
        .get(reqwest::header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(block_size);

    let mut data = BytesMut::with_capacity(usize::try_from(part_size).unwrap_or(0));
    let mut stream = response.bytes_stream();
    while (data.len() as u64) < part_size {
        let next = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(None),
            next = stream.try_next() => next,
        };
        let Some(chunk) = next.map_err(|_| Some(0_u16))? else {
            break;
        };
        for fragment in chunk.chunks(FRAGMENT_SIZE) {
            data.extend_from_slice(fragment);
            let _ = tx.send(TaskResult::Progress {
                name: url.host.clone(),
                task_progress: data.len() as u64,
            });
        }
    }

    if (data.len() as u64) < part_size {
        return Err(Some(0));
    }

    let _ = tx.send(TaskResult::Data {
        name: url.host.clone(),
        status: status.as_u16(),
        offset,
        data: Bytes::from(data),
    });
    Ok(())
}

/// Downloads `[offset, offset + block_size)` (or up to `file_size`,
/// whichever comes first) over FTP `RETR`, resuming at `offset` via `REST`.
/// The control connection is always closed afterwards and a fresh one
/// re-established for the next block - matching real-world FTP servers that
/// only allow one transfer per session.
///
/// Cancelling `cancel` aborts the in-flight FTP command or read; the task
/// still closes the control connection but returns without publishing a
/// final `TaskResult`.
#[instrument(skip(conn, tx, cancel), fields(host = %url.host, offset))]
pub async fn download_ftp(
    url: MirrorUrl,
    conn: Connection,
    offset: u64,
    block_size: u64,
    file_size: u64,
    tx: ResultSender,
    cancel: CancellationToken,
) -> Option<Connection> {
    let Connection::Ftp(mut ftp) = conn else {
        let _ = tx.send(TaskResult::Error {
            name: url.host.clone(),
            status: 0,
            offset,
        });
        return None;
    };

    match run_ftp(&url, &mut ftp, offset, block_size, file_size, &tx, &cancel).await {
        Ok(()) => {}
        Err(Some(())) => {
            let _ = tx.send(TaskResult::Error {
                name: url.host.clone(),
                status: 0,
                offset,
            });
        }
        Err(None) => {}
    }
    let _ = ftp.quit().await;
    None
}

/// `Err(Some(()))` is a reportable failure; `Err(None)` means the task was
/// cancelled and nothing should be published.
async fn run_ftp(
    url: &MirrorUrl,
    ftp: &mut suppaftp::AsyncFtpStream,
    offset: u64,
    block_size: u64,
    file_size: u64,
    tx: &ResultSender,
    cancel: &CancellationToken,
) -> Result<(), Option<()>> {
    use futures_util::io::AsyncReadExt;

    if offset > 0 {
        let result = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(None),
            #[allow(clippy::unwrap_used)]
            result = ftp.resume_transfer(usize::try_from(offset).map_err(|_| Some(()))?) => result,
        };
        result.map_err(|e| {
            warn!(error = %e, "REST failed");
            Some(())
        })?;
    }

    let reader_result = tokio::select! {
        biased;
        () = cancel.cancelled() => return Err(None),
        result = ftp.retr_as_stream(&url.filename) => result,
    };
    let mut reader = reader_result.map_err(|e| {
        warn!(error = %e, "RETR failed");
        Some(())
    })?;

    let mut data = Vec::with_capacity(usize::try_from(block_size).unwrap_or(0));
    loop {
        let remaining_in_block = block_size - data.len() as u64;
        let remaining_in_file = file_size.saturating_sub(offset + data.len() as u64);
        let to_read = remaining_in_block.min(FRAGMENT_SIZE as u64) as usize;

        let mut buf = vec![0_u8; to_read];
        let n = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(None),
            result = reader.read(&mut buf) => result.map_err(|_| Some(()))?,
        };
        if n == 0 {
            break;
        }
        data.extend_from_slice(&buf[..n]);
        let _ = tx.send(TaskResult::Progress {
            name: url.host.clone(),
            task_progress: data.len() as u64,
        });

        if remaining_in_block.saturating_sub(n as u64) == 0 || remaining_in_file.saturating_sub(n as u64) == 0 {
            break;
        }
    }

    ftp.finalize_retr_stream(reader).await.map_err(|e| {
        warn!(error = %e, "failed to finalize RETR stream");
        Some(())
    })?;

    let _ = tx.send(TaskResult::Data {
        name: url.host.clone(),
        status: 206,
        offset,
        data: Bytes::from(data),
    });
    Ok(())
}
