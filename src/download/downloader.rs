//! Concurrent, size-capped file downloader
//!
//! Each file goes through the same steps:
//! 1. Skip if the destination file already exists
//! 2. HEAD probe; a declared size over the ceiling aborts before any transfer
//! 3. Stream the body into a temporary sibling file, counting bytes and
//!    failing on a stall longer than the transfer timeout
//! 4. Flush, sync, then rename the temporary file into place
//!
//! A failure in one file never affects the others.

use crate::config::DownloadConfig;
use crate::crawler::{RateLimiter, ShutdownHandle};
use crate::download::derive_filename;
use crate::url::NormalizedUrl;
use futures::future;
use futures::stream::{self, Stream, StreamExt};
use reqwest::header::{HeaderMap, CONTENT_LENGTH};
use reqwest::Client;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use thiserror::Error;
use tokio::io::AsyncWriteExt;

/// How an oversize file was detected
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SizeCheck {
    /// Content-Length announced more than the ceiling
    Declared(u64),
    /// More bytes than the ceiling arrived
    Observed(u64),
}

impl fmt::Display for SizeCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Declared(size) => write!(f, "declared size of {} bytes", size),
            Self::Observed(size) => write!(f, "transfer of at least {} bytes", size),
        }
    }
}

/// Why a single download failed
#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("network error: {0}")]
    Network(String),

    #[error("request timed out")]
    Timeout,

    #[error("HTTP {0}")]
    HttpStatus(u16),

    #[error("{check} exceeds the {limit}-byte limit")]
    SizeLimitExceeded { check: SizeCheck, limit: u64 },

    #[error("filesystem error: {0}")]
    Filesystem(#[from] std::io::Error),
}

impl From<reqwest::Error> for DownloadError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Timeout
        } else {
            Self::Network(e.to_string())
        }
    }
}

impl DownloadError {
    pub fn is_size_limit(&self) -> bool {
        matches!(self, Self::SizeLimitExceeded { .. })
    }
}

/// Result of one download task
#[derive(Debug)]
pub struct DownloadOutcome {
    pub url: NormalizedUrl,
    pub success: bool,
    /// Sanitized name the file has (or would have) in the destination directory
    pub filename: String,
    /// Bytes written to the final path; zero for failures and skipped files
    pub bytes_written: u64,
    /// The file already existed, nothing was transferred
    pub already_present: bool,
    pub error: Option<DownloadError>,
}

impl DownloadOutcome {
    fn transferred(url: NormalizedUrl, filename: String, bytes_written: u64) -> Self {
        Self {
            url,
            success: true,
            filename,
            bytes_written,
            already_present: false,
            error: None,
        }
    }

    fn already_present(url: NormalizedUrl, filename: String) -> Self {
        Self {
            url,
            success: true,
            filename,
            bytes_written: 0,
            already_present: true,
            error: None,
        }
    }

    fn failed(url: NormalizedUrl, filename: String, error: DownloadError) -> Self {
        Self {
            url,
            success: false,
            filename,
            bytes_written: 0,
            already_present: false,
            error: Some(error),
        }
    }
}

/// Aggregate of a download batch
#[derive(Debug, Default)]
pub struct DownloadReport {
    pub outcomes: Vec<DownloadOutcome>,
    /// Successful outcomes, already-present files included
    pub successful: usize,
    pub failed: usize,
    pub already_present: usize,
    pub total_bytes: u64,
    /// Files never started because the run was interrupted
    pub not_started: usize,
}

impl DownloadReport {
    pub fn from_outcomes(outcomes: Vec<DownloadOutcome>) -> Self {
        let successful = outcomes.iter().filter(|o| o.success).count();
        let already_present = outcomes.iter().filter(|o| o.already_present).count();
        let total_bytes = outcomes.iter().map(|o| o.bytes_written).sum();

        Self {
            failed: outcomes.len() - successful,
            successful,
            already_present,
            total_bytes,
            not_started: 0,
            outcomes,
        }
    }

    pub fn is_partial(&self) -> bool {
        self.not_started > 0
    }

    pub fn transferred(&self) -> usize {
        self.successful - self.already_present
    }
}

/// Downloads files into one destination directory
#[derive(Debug)]
pub struct Downloader {
    dest_dir: PathBuf,
    config: DownloadConfig,
    client: Client,
    limiter: RateLimiter,
    temp_seq: AtomicU64,
    shutdown: ShutdownHandle,
}

impl Downloader {
    /// Creates a downloader, creating `dest_dir` if it does not exist
    ///
    /// The downloader has its own rate limiter, separate from the crawl's.
    pub async fn new(
        dest_dir: impl Into<PathBuf>,
        config: DownloadConfig,
        client: Client,
    ) -> Result<Self, DownloadError> {
        let dest_dir = dest_dir.into();
        tokio::fs::create_dir_all(&dest_dir).await?;

        Ok(Self {
            limiter: RateLimiter::new(Duration::from_millis(config.request_delay_ms)),
            dest_dir,
            config,
            client,
            temp_seq: AtomicU64::new(0),
            shutdown: ShutdownHandle::default(),
        })
    }

    /// Stops starting new files once `shutdown` is triggered
    pub fn with_shutdown(mut self, shutdown: ShutdownHandle) -> Self {
        self.shutdown = shutdown;
        self
    }

    pub fn dest_dir(&self) -> &Path {
        &self.dest_dir
    }

    /// Downloads every URL, at most `workers` at a time
    ///
    /// Yields one outcome per started file. After an interrupt no further file
    /// is started; transfers already running finish or time out, and the
    /// remaining files are counted in `not_started`.
    pub async fn download_all<I>(&self, files: I) -> DownloadReport
    where
        I: IntoIterator<Item = NormalizedUrl>,
    {
        let files: Vec<NormalizedUrl> = files.into_iter().collect();
        let total = files.len();
        tracing::info!("Downloading {} files to {}", total, self.dest_dir.display());

        let outcomes: Vec<DownloadOutcome> = stream::iter(files)
            .take_while(|_| future::ready(!self.shutdown.is_triggered()))
            .map(|url| self.download_file(url))
            .buffer_unordered(self.config.workers.max(1))
            .collect()
            .await;

        let mut report = DownloadReport::from_outcomes(outcomes);
        report.not_started = total - report.outcomes.len();
        if report.is_partial() {
            tracing::warn!(
                "Downloads interrupted, {} files not started",
                report.not_started
            );
        }
        report
    }

    /// Downloads a single file
    pub async fn download_file(&self, url: NormalizedUrl) -> DownloadOutcome {
        let filename = derive_filename(&url);
        let final_path = self.dest_dir.join(&filename);

        if tokio::fs::try_exists(&final_path).await.unwrap_or(false) {
            tracing::info!("Already present: {}", filename);
            return DownloadOutcome::already_present(url, filename);
        }

        match self.transfer(&url, &filename, &final_path).await {
            Ok(bytes) => {
                tracing::info!("Downloaded {} ({} bytes)", filename, bytes);
                DownloadOutcome::transferred(url, filename, bytes)
            }
            Err(e) => {
                if e.is_size_limit() {
                    tracing::warn!("Skipping {}: {}", url, e);
                } else {
                    tracing::error!("Failed to download {}: {}", url, e);
                }
                DownloadOutcome::failed(url, filename, e)
            }
        }
    }

    async fn transfer(
        &self,
        url: &NormalizedUrl,
        filename: &str,
        final_path: &Path,
    ) -> Result<u64, DownloadError> {
        let limit = self.config.max_file_size;

        self.limiter.wait().await;
        self.probe_size(url, limit).await?;

        let idle = Duration::from_secs(self.config.transfer_timeout_secs);
        let response = tokio::time::timeout(idle, self.client.get(url.as_url().clone()).send())
            .await
            .map_err(|_| DownloadError::Timeout)??;

        let status = response.status();
        if !status.is_success() {
            return Err(DownloadError::HttpStatus(status.as_u16()));
        }

        if let Some(size) = declared_length(response.headers()) {
            if size > limit {
                return Err(DownloadError::SizeLimitExceeded {
                    check: SizeCheck::Declared(size),
                    limit,
                });
            }
        }

        let seq = self.temp_seq.fetch_add(1, Ordering::Relaxed);
        let temp_path = self.dest_dir.join(format!("{}.{}.tmp", filename, seq));

        let written = match write_limited(response.bytes_stream(), &temp_path, limit, idle).await {
            Ok(written) => written,
            Err(e) => {
                remove_temp(&temp_path).await;
                return Err(e);
            }
        };

        if let Err(e) = tokio::fs::rename(&temp_path, final_path).await {
            remove_temp(&temp_path).await;
            return Err(e.into());
        }

        Ok(written)
    }

    /// Rejects files whose HEAD response declares a size over `limit`
    ///
    /// A failed or inconclusive probe lets the transfer go ahead; the byte
    /// counter still enforces the ceiling.
    async fn probe_size(&self, url: &NormalizedUrl, limit: u64) -> Result<(), DownloadError> {
        let response = match self
            .client
            .head(url.as_url().clone())
            .timeout(Duration::from_secs(self.config.probe_timeout_secs))
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                tracing::debug!("HEAD {} failed: {}", url, e);
                return Ok(());
            }
        };

        if !response.status().is_success() {
            tracing::debug!("HEAD {} answered {}", url, response.status());
            return Ok(());
        }

        match declared_length(response.headers()) {
            Some(size) if size > limit => Err(DownloadError::SizeLimitExceeded {
                check: SizeCheck::Declared(size),
                limit,
            }),
            _ => Ok(()),
        }
    }
}

/// Content-Length as sent by the server
///
/// Read from the header itself: `Response::content_length` reports the body
/// size hint, which is zero for HEAD responses.
fn declared_length(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse().ok())
}

/// Writes `stream` to `path`, failing as soon as more than `limit` bytes arrive
///
/// `idle` bounds the wait for each chunk, not the whole transfer. The file is
/// flushed and synced before returning. On error the caller removes the file.
async fn write_limited<S, B, E>(
    mut stream: S,
    path: &Path,
    limit: u64,
    idle: Duration,
) -> Result<u64, DownloadError>
where
    S: Stream<Item = Result<B, E>> + Unpin,
    B: AsRef<[u8]>,
    E: Into<DownloadError>,
{
    let mut file = tokio::fs::File::create(path).await?;
    let mut written = 0u64;

    loop {
        let next = tokio::time::timeout(idle, stream.next())
            .await
            .map_err(|_| DownloadError::Timeout)?;
        let Some(chunk) = next else {
            break;
        };
        let chunk = chunk.map_err(Into::into)?;
        let bytes = chunk.as_ref();

        written += bytes.len() as u64;
        if written > limit {
            return Err(DownloadError::SizeLimitExceeded {
                check: SizeCheck::Observed(written),
                limit,
            });
        }

        file.write_all(bytes).await?;
    }

    file.flush().await?;
    file.sync_all().await?;
    Ok(written)
}

async fn remove_temp(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            tracing::warn!("Could not remove {}: {}", path.display(), e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const IDLE: Duration = Duration::from_secs(5);

    fn chunks(sizes: &[usize]) -> impl Stream<Item = Result<Vec<u8>, DownloadError>> + Unpin {
        stream::iter(
            sizes
                .iter()
                .map(|&n| Ok(vec![7u8; n]))
                .collect::<Vec<_>>(),
        )
    }

    #[tokio::test]
    async fn test_write_limited_within_ceiling() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.tmp");

        let written = write_limited(chunks(&[300, 300, 400]), &path, 1000, IDLE).await.unwrap();
        assert_eq!(written, 1000);
        assert_eq!(std::fs::read(&path).unwrap().len(), 1000);
    }

    #[tokio::test]
    async fn test_write_limited_stops_over_ceiling() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.tmp");

        let err = write_limited(chunks(&[600, 600, 600]), &path, 1000, IDLE)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DownloadError::SizeLimitExceeded {
                check: SizeCheck::Observed(1200),
                limit: 1000
            }
        ));
        // The over-limit chunk is never written
        assert_eq!(std::fs::read(&path).unwrap().len(), 600);
    }

    #[tokio::test]
    async fn test_write_limited_propagates_stream_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.tmp");
        let failing = stream::iter(vec![Ok(vec![1u8; 10]), Err(DownloadError::Timeout)]);

        let err = write_limited(failing, &path, 1000, IDLE).await.unwrap_err();
        assert!(matches!(err, DownloadError::Timeout));
    }

    #[tokio::test]
    async fn test_write_limited_slow_steady_stream_completes() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.tmp");
        // 10 chunks, 60ms apart: far longer in total than the idle bound
        let slow = Box::pin(stream::iter(0..10).then(|_| async {
            tokio::time::sleep(Duration::from_millis(60)).await;
            Ok::<_, DownloadError>(vec![1u8; 100])
        }));

        let written = write_limited(slow, &path, 10_000, Duration::from_millis(300))
            .await
            .unwrap();
        assert_eq!(written, 1000);
    }

    #[tokio::test]
    async fn test_write_limited_stalled_stream_times_out() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.tmp");
        let stalled = stream::iter(vec![Ok::<_, DownloadError>(vec![1u8; 10])])
            .chain(stream::pending());

        let err = write_limited(stalled, &path, 1000, Duration::from_millis(100))
            .await
            .unwrap_err();
        assert!(matches!(err, DownloadError::Timeout));
    }

    #[test]
    fn test_declared_length() {
        let mut headers = HeaderMap::new();
        assert_eq!(declared_length(&headers), None);
        headers.insert(CONTENT_LENGTH, "157286400".parse().unwrap());
        assert_eq!(declared_length(&headers), Some(157_286_400));
        headers.insert(CONTENT_LENGTH, "garbage".parse().unwrap());
        assert_eq!(declared_length(&headers), None);
    }

    #[test]
    fn test_report_counts() {
        let url = |p: &str| NormalizedUrl::parse(&format!("https://example.test/{}", p)).unwrap();
        let report = DownloadReport::from_outcomes(vec![
            DownloadOutcome::transferred(url("a.pdf"), "a.pdf".into(), 100),
            DownloadOutcome::already_present(url("b.pdf"), "b.pdf".into()),
            DownloadOutcome::failed(url("c.pdf"), "c.pdf".into(), DownloadError::Timeout),
        ]);

        assert_eq!(report.successful, 2);
        assert_eq!(report.already_present, 1);
        assert_eq!(report.transferred(), 1);
        assert_eq!(report.failed, 1);
        assert_eq!(report.total_bytes, 100);
        assert!(!report.is_partial());
    }

    #[test]
    fn test_size_error_message() {
        let err = DownloadError::SizeLimitExceeded {
            check: SizeCheck::Declared(150),
            limit: 100,
        };
        assert_eq!(
            err.to_string(),
            "declared size of 150 bytes exceeds the 100-byte limit"
        );
        assert!(err.is_size_limit());
    }
}
