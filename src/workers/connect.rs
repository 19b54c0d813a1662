//! Connect workers: one HEAD probe (HTTP/HTTPS) or one login+CWD+SIZE
//! (FTP), run once per mirror each time it needs a fresh connection.

use std::time::Duration;

use suppaftp::AsyncFtpStream;
use suppaftp::types::FileType;
use tokio_util::sync::CancellationToken;
use tracing::{instrument, warn};

use crate::connection::Connection;
use crate::queue::ResultSender;
use crate::task_result::TaskResult;
use crate::url::MirrorUrl;

use super::user_agent;

/// Probes an HTTP(S) mirror with a HEAD request, following at most one
/// redirect hop per call (the manager re-dispatches a fresh connect worker
/// against the resolved location, matching the original's `redirect()`
/// handling in the coordinator rather than the connection itself).
///
/// Cancelling `cancel` aborts the HEAD request in flight; the task returns
/// without publishing anything onto `tx`.
#[instrument(skip(client, tx, cancel), fields(host = %url.host))]
pub async fn connect_http(
    url: MirrorUrl,
    timeout: Duration,
    client: reqwest::Client,
    tx: ResultSender,
    cancel: CancellationToken,
) -> Option<Connection> {
    let full_url = format!("{}://{}{}", url.protocol, url.host, url.request);
    let referer = format!("{}://{}/", url.protocol, url.host);

    let request = client
        .head(&full_url)
        .header("User-Agent", user_agent())
        .header("Referer", referer)
        .timeout(timeout)
        .send();

    let result = tokio::select! {
        biased;
        () = cancel.cancelled() => return None,
        result = request => result,
    };

    let response = match result {
        Ok(response) => response,
        Err(e) => {
            warn!(error = %e, "HEAD request failed");
            let _ = tx.send(TaskResult::HeadError {
                name: url.host.clone(),
                status: 0,
            });
            return None;
        }
    };

    let status = response.status();
    if status.is_redirection() {
        let location = response
            .headers()
            .get("Location")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let result = location.and_then(|loc| url.resolve_redirect(&loc).ok());
        let Some(resolved) = result else {
            let _ = tx.send(TaskResult::HeadError {
                name: url.host.clone(),
                status: status.as_u16(),
            });
            return None;
        };
        let _ = tx.send(TaskResult::Redirect {
            name: url.host.clone(),
            status: status.as_u16(),
            location: resolved,
        });
        return None;
    }

    if status != reqwest::StatusCode::OK {
        let _ = tx.send(TaskResult::HeadError {
            name: url.host.clone(),
            status: status.as_u16(),
        });
        return None;
    }

    let Some(file_size) = response
        .headers()
        .get(reqwest::header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u64>().ok())
    else {
        let _ = tx.send(TaskResult::HeadError {
            name: url.host.clone(),
            status: status.as_u16(),
        });
        return None;
    };

    let _ = tx.send(TaskResult::HeadData {
        name: url.host.clone(),
        status: status.as_u16(),
        file_size,
    });
    Some(Connection::Http)
}

/// Logs into an FTP mirror anonymously, switches to binary mode, changes
/// into the target directory and queries the file size with `SIZE`.
///
/// Cancelling `cancel` aborts whichever FTP command is in flight; the task
/// returns without publishing anything onto `tx`.
#[instrument(skip(tx, cancel), fields(host = %url.host))]
pub async fn connect_ftp(
    url: MirrorUrl,
    timeout: Duration,
    tx: ResultSender,
    cancel: CancellationToken,
) -> Option<Connection> {
    let result = tokio::select! {
        biased;
        () = cancel.cancelled() => return None,
        result = try_connect_ftp(&url, timeout) => result,
    };
    match result {
        Ok((ftp, file_size)) => {
            let _ = tx.send(TaskResult::HeadData {
                name: url.host.clone(),
                status: 200,
                file_size,
            });
            Some(Connection::Ftp(Box::new(ftp)))
        }
        Err(e) => {
            warn!(error = %e, "FTP connect failed");
            let _ = tx.send(TaskResult::HeadError {
                name: url.host.clone(),
                status: 0,
            });
            None
        }
    }
}

async fn try_connect_ftp(url: &MirrorUrl, timeout: Duration) -> anyhow::Result<(AsyncFtpStream, u64)> {
    let addr = if url.host.contains(':') {
        url.host.clone()
    } else {
        format!("{}:21", url.host)
    };
    let mut ftp = tokio::time::timeout(timeout, AsyncFtpStream::connect(&addr))
        .await
        .map_err(|_| anyhow::anyhow!("connection to {addr} timed out"))??;
    ftp.login("anonymous", "").await?;
    ftp.transfer_type(FileType::Binary).await?;
    if !url.path.is_empty() {
        ftp.cwd(&url.path).await?;
    }
    let size = ftp.size(&url.filename).await?;
    Ok((ftp, u64::try_from(size)?))
}
