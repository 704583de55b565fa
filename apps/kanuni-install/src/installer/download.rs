//! Streaming HTTP downloads for release artifacts.
//!
//! Files are streamed to disk chunk by chunk and written under a `.part` name
//! that is renamed into place once the body has been fully received. There is
//! no retry loop: a failed download fails the run.
//!
//! Progress is reported through an optional [`ProgressCallback`];
//! [`text_progress`] renders the single-line meter used by the CLI.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use futures_util::StreamExt;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::errors::InstallerError;

/// User-Agent sent with every request. GitHub's API rejects requests without one.
pub const USER_AGENT: &str = concat!("kanuni-install/", env!("CARGO_PKG_VERSION"));

/// Overall timeout for a single download.
const REQUEST_TIMEOUT_SECS: u64 = 300;

/// Minimum interval between progress callback invocations.
const PROGRESS_INTERVAL: Duration = Duration::from_millis(250);

/// Progress event emitted during downloads.
#[derive(Debug, Clone)]
pub enum ProgressEvent {
    Started {
        url: String,
        /// Total size from `Content-Length`, 0 when unknown.
        total: u64,
    },
    Progress {
        downloaded: u64,
        /// Bytes per second since the download started.
        speed: u64,
    },
    Completed,
    Failed {
        error: String,
    },
}

/// Receiver for [`ProgressEvent`]s.
pub type ProgressCallback = Arc<dyn Fn(ProgressEvent) + Send + Sync>;

/// Builds the HTTP client shared by all stages of a run.
///
/// # Errors
///
/// Returns [`InstallerError::DownloadFailed`] if the TLS backend cannot be initialised.
pub fn http_client() -> Result<reqwest::Client, InstallerError> {
    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
        .build()
        .map_err(|e| InstallerError::download_failed("(client)", format!("HTTP client: {e}")))
}

/// Downloads `url` to `dest`.
///
/// # Errors
///
/// Returns [`InstallerError::DownloadFailed`] on connection errors, non-2xx
/// responses, interrupted bodies, or local write failures. Connection failures
/// and 404/410 responses are flagged as unavailable. No partial file is left at
/// `dest`.
pub async fn download_file(
    client: &reqwest::Client,
    url: &str,
    dest: &Path,
    progress: Option<&ProgressCallback>,
) -> Result<u64, InstallerError> {
    let part = part_path(dest);
    let result = stream_to(client, url, &part, progress).await;

    match result {
        Ok(bytes) => {
            tokio::fs::rename(&part, dest).await.map_err(|e| {
                InstallerError::download_failed(url, format!("failed to finalize download: {e}"))
            })?;
            if let Some(cb) = progress {
                cb(ProgressEvent::Completed);
            }
            debug!(%url, bytes, "download complete");
            Ok(bytes)
        }
        Err(e) => {
            let _ = tokio::fs::remove_file(&part).await;
            if let Some(cb) = progress {
                cb(ProgressEvent::Failed {
                    error: e.to_string(),
                });
            }
            Err(e)
        }
    }
}

fn part_path(dest: &Path) -> PathBuf {
    let mut name = dest.file_name().unwrap_or_default().to_os_string();
    name.push(".part");
    dest.with_file_name(name)
}

async fn stream_to(
    client: &reqwest::Client,
    url: &str,
    dest: &Path,
    progress: Option<&ProgressCallback>,
) -> Result<u64, InstallerError> {
    let fail = |reason: String| InstallerError::download_failed(url, reason);

    debug!(%url, "downloading");
    let response = client.get(url).send().await.map_err(|e| {
        if e.is_connect() {
            InstallerError::download_unavailable(url, format!("failed to connect: {e}"))
        } else {
            fail(format!("request failed: {e}"))
        }
    })?;

    let status = response.status();
    if !status.is_success() {
        let reason = format!("HTTP error {}", status.as_u16());
        return Err(if is_absent(status) {
            InstallerError::download_unavailable(url, reason)
        } else {
            fail(reason)
        });
    }

    let total = response.content_length().unwrap_or(0);
    if let Some(cb) = progress {
        cb(ProgressEvent::Started {
            url: url.to_string(),
            total,
        });
    }

    let mut file = tokio::fs::File::create(dest)
        .await
        .map_err(|e| fail(format!("failed to create {}: {e}", dest.display())))?;

    let mut stream = response.bytes_stream();
    let mut downloaded: u64 = 0;
    let start = Instant::now();
    let mut last_update = Instant::now();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| fail(format!("connection interrupted: {e}")))?;
        file.write_all(&chunk)
            .await
            .map_err(|e| fail(format!("failed to write {}: {e}", dest.display())))?;
        downloaded += chunk.len() as u64;

        if let Some(cb) = progress
            && last_update.elapsed() >= PROGRESS_INTERVAL
        {
            cb(ProgressEvent::Progress {
                downloaded,
                speed: bytes_per_second(downloaded, start.elapsed()),
            });
            last_update = Instant::now();
        }
    }

    file.flush()
        .await
        .map_err(|e| fail(format!("failed to flush {}: {e}", dest.display())))?;

    if let Some(cb) = progress {
        cb(ProgressEvent::Progress {
            downloaded,
            speed: bytes_per_second(downloaded, start.elapsed()),
        });
    }

    Ok(downloaded)
}

/// Statuses that mean the server has nothing at this URL.
fn is_absent(status: reqwest::StatusCode) -> bool {
    matches!(status, reqwest::StatusCode::NOT_FOUND | reqwest::StatusCode::GONE)
}

#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
fn bytes_per_second(bytes: u64, elapsed: Duration) -> u64 {
    let secs = elapsed.as_secs_f64();
    if secs > 0.0 {
        (bytes as f64 / secs) as u64
    } else {
        0
    }
}

/// Progress callback that draws `downloaded/total (pct%) speed` on stdout.
#[must_use]
pub fn text_progress() -> ProgressCallback {
    let total = Arc::new(Mutex::new(0u64));
    Arc::new(move |event| match event {
        ProgressEvent::Started { total: t, .. } => {
            if let Ok(mut guard) = total.lock() {
                *guard = t;
            }
        }
        ProgressEvent::Progress { downloaded, speed } => {
            let t = total.lock().map(|g| *g).unwrap_or(0);
            print!("\r{}", format_progress(downloaded, t, speed));
            let _ = std::io::stdout().flush();
        }
        ProgressEvent::Completed | ProgressEvent::Failed { .. } => println!(),
    })
}

#[allow(clippy::cast_precision_loss)]
#[allow(clippy::cast_possible_truncation)]
#[allow(clippy::cast_sign_loss)]
fn format_progress(downloaded: u64, total: u64, speed: u64) -> String {
    let downloaded_str = format_bytes(downloaded);
    let speed_str = format!("{}/s", format_bytes(speed));
    if total == 0 {
        return format!("{downloaded_str} {speed_str}     ");
    }
    let percent = (downloaded as f64 / total as f64 * 100.0).min(100.0) as u8;
    format!(
        "{downloaded_str}/{} ({percent}%) {speed_str}     ",
        format_bytes(total)
    )
}

/// Formats bytes into a human-readable string (KB, MB, GB).
fn format_bytes(bytes: u64) -> String {
    const KB: f64 = 1024.0;
    const MB: f64 = KB * 1024.0;
    const GB: f64 = MB * 1024.0;

    #[allow(clippy::cast_precision_loss)]
    let bytes_f = bytes as f64;

    if bytes_f >= GB {
        format!("{:.2} GB", bytes_f / GB)
    } else if bytes_f >= MB {
        format!("{:.2} MB", bytes_f / MB)
    } else if bytes_f >= KB {
        format!("{:.2} KB", bytes_f / KB)
    } else {
        format!("{bytes} B")
    }
}
