use crate::error::LaunchError;
use crate::game::installer::config::{DEFAULT_MAX_ATTEMPTS, RETRY_DELAY_MS};
use crate::game::installer::core::batch::BatchArtifact;
use crate::game::installer::types::ProgressReporter;
use crate::utils::hash::{calculate_sha1, sha1_matches};
use anyhow::{Context, Result};
use futures::StreamExt;
use reqwest::Client;
use sha1::{Digest, Sha1};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tokio::fs::{create_dir_all, File};
use tokio::io::AsyncWriteExt;

/// Result of a single fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    Downloaded,
    /// Destination was already present and valid; no request was made
    Skipped,
}

#[derive(Debug, Clone)]
pub struct FetchOptions {
    pub max_attempts: u32,
    /// Base retry delay; attempt `n` waits `n * retry_delay`
    pub retry_delay: Duration,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            retry_delay: Duration::from_millis(RETRY_DELAY_MS),
        }
    }
}

/// Fetch one planned artifact to its destination
pub async fn fetch(
    client: &Client,
    artifact: &BatchArtifact,
    options: &FetchOptions,
    reporter: &dyn ProgressReporter,
) -> Result<FetchOutcome> {
    download_to_path(
        client,
        &artifact.url,
        &artifact.path,
        artifact.sha1.as_deref(),
        options,
        reporter,
    )
    .await
}

/// Whether an existing destination can be reused as-is
async fn existing_file_is_valid(path: &Path, expected_sha1: Option<&str>) -> bool {
    match tokio::fs::metadata(path).await {
        Ok(metadata) if metadata.is_file() => {}
        _ => return false,
    }

    let Some(expected) = expected_sha1 else {
        log::debug!("File exists and no hash provided, skipping: {:?}", path);
        return true;
    };

    match calculate_sha1(path).await {
        Ok(computed) if sha1_matches(&computed, expected) => {
            log::debug!("File exists and hash matches, skipping: {:?}", path);
            true
        }
        Ok(computed) => {
            log::info!(
                "File exists but hash mismatches ({} != {}), re-downloading: {:?}",
                computed,
                expected,
                path
            );
            false
        }
        Err(e) => {
            log::warn!(
                "Failed to read existing file for validation: {} - {}",
                e,
                path.display()
            );
            false
        }
    }
}

/// Transport errors and server-side statuses are worth another attempt
fn is_retryable(err: &anyhow::Error) -> bool {
    match LaunchError::find(err) {
        Some(LaunchError::FetchFailed { status, .. }) => *status >= 500 || *status == 429,
        Some(_) => false,
        None => err.chain().any(|c| c.downcast_ref::<reqwest::Error>().is_some()),
    }
}

/// Download a file to a path with SHA1 validation and retry logic.
///
/// Skips the request entirely when the destination already holds a valid copy.
/// On failure no partial data is left at the destination.
pub async fn download_to_path(
    client: &Client,
    url: &str,
    path: &Path,
    expected_sha1: Option<&str>,
    options: &FetchOptions,
    reporter: &dyn ProgressReporter,
) -> Result<FetchOutcome> {
    if existing_file_is_valid(path, expected_sha1).await {
        return Ok(FetchOutcome::Skipped);
    }

    log::debug!("Downloading: {} -> {:?}", url, path);

    if let Some(parent) = path.parent() {
        create_dir_all(parent)
            .await
            .with_context(|| format!("Failed to create directory {:?}", parent))?;
    }

    let max_attempts = options.max_attempts.max(1);
    let mut attempt = 0;
    loop {
        attempt += 1;
        match download_with_validation(client, url, path, expected_sha1, reporter).await {
            Ok(()) => {
                log::debug!("Download complete: {:?}", path);
                return Ok(FetchOutcome::Downloaded);
            }
            Err(e) if attempt < max_attempts && is_retryable(&e) && !reporter.is_cancelled() => {
                log::warn!(
                    "Download failed (attempt {}/{}) : {}. Retrying...",
                    attempt,
                    max_attempts,
                    e
                );
                tokio::time::sleep(options.retry_delay * attempt).await;
            }
            Err(e) => {
                remove_if_present(path).await;
                log::error!("Download of {} failed after {} attempt(s): {}", url, attempt, e);
                return Err(e);
            }
        }
    }
}

fn part_path(path: &Path) -> PathBuf {
    let tmp_name = format!(
        "{}.part",
        path.file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("download")
    );
    path.with_file_name(tmp_name)
}

async fn remove_if_present(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            log::warn!("Failed to remove {:?}: {}", path, e);
        }
    }
}

async fn download_with_validation(
    client: &Client,
    url: &str,
    path: &Path,
    expected_sha1: Option<&str>,
    reporter: &dyn ProgressReporter,
) -> Result<()> {
    let tmp_path = part_path(path);
    let result = stream_to_part_file(client, url, path, &tmp_path, expected_sha1, reporter).await;
    if result.is_err() {
        remove_if_present(&tmp_path).await;
    }
    result
}

async fn stream_to_part_file(
    client: &Client,
    url: &str,
    path: &Path,
    tmp_path: &Path,
    expected_sha1: Option<&str>,
    reporter: &dyn ProgressReporter,
) -> Result<()> {
    let start = Instant::now();
    let response = client.get(url).send().await?;

    if !response.status().is_success() {
        return Err(LaunchError::FetchFailed {
            url: url.to_string(),
            status: response.status().as_u16(),
        }
        .into());
    }

    let total_size = response.content_length();
    log::debug!("Download size: {:?} bytes", total_size);

    // Write to a temporary file first, then rename onto the final path.
    let mut file = File::create(tmp_path).await?;
    let mut downloaded: u64 = 0;
    let mut chunk_count: u64 = 0;
    let mut hasher = Sha1::new();

    let mut stream = response.bytes_stream();
    while let Some(chunk_result) = stream.next().await {
        if reporter.is_cancelled() {
            log::warn!("Download cancelled: {:?}", path);
            anyhow::bail!("Download cancelled by user");
        }

        let chunk = chunk_result?;
        file.write_all(&chunk).await?;
        hasher.update(&chunk);

        downloaded += chunk.len() as u64;
        chunk_count += 1;
        reporter.update_bytes(downloaded, total_size);
    }
    file.flush().await?;
    file.sync_all().await?;
    drop(file);

    if let Some(expected) = expected_sha1 {
        let computed = format!("{:x}", hasher.finalize());
        if !sha1_matches(&computed, expected) {
            return Err(LaunchError::IntegrityError {
                path: path.to_path_buf(),
                expected: expected.to_string(),
                actual: computed,
            }
            .into());
        }
        log::debug!("SHA1 validated: {}", computed);
    }

    tokio::fs::rename(tmp_path, path).await?;

    let secs = start.elapsed().as_secs_f64();
    let throughput = (downloaded as f64 / 1024.0 / 1024.0) / secs.max(0.001); // MB/s
    log::info!(
        "Download stats: url={}, size={} bytes, chunks={}, time={:.2}s, throughput={:.2} MB/s",
        url,
        downloaded,
        chunk_count,
        secs,
        throughput
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::installer::types::SilentProgressReporter;
    use wiremock::matchers::{method, path as url_path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const HELLO_SHA1: &str = "2aae6c35c94fcfb415dbe95f408b9ce91ee846ed";

    fn quick() -> FetchOptions {
        FetchOptions {
            max_attempts: 2,
            retry_delay: Duration::from_millis(1),
        }
    }

    #[tokio::test]
    async fn downloads_and_creates_parent_dirs() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(url_path("/lib.jar"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"hello world".to_vec()))
            .expect(1)
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("a/b/c/lib.jar");
        let outcome = download_to_path(
            &Client::new(),
            &format!("{}/lib.jar", server.uri()),
            &dest,
            Some(HELLO_SHA1),
            &quick(),
            &SilentProgressReporter,
        )
        .await
        .unwrap();

        assert_eq!(outcome, FetchOutcome::Downloaded);
        assert_eq!(std::fs::read(&dest).unwrap(), b"hello world");
        assert!(!part_path(&dest).exists());
    }

    #[tokio::test]
    async fn existing_file_without_checksum_is_skipped() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("x.bin");
        std::fs::write(&dest, b"anything").unwrap();

        let outcome = download_to_path(
            &Client::new(),
            &format!("{}/x.bin", server.uri()),
            &dest,
            None,
            &quick(),
            &SilentProgressReporter,
        )
        .await
        .unwrap();
        assert_eq!(outcome, FetchOutcome::Skipped);
    }

    #[tokio::test]
    async fn not_found_is_fetch_failed_without_retry() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .expect(1)
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("missing.jar");
        let err = download_to_path(
            &Client::new(),
            &format!("{}/missing.jar", server.uri()),
            &dest,
            None,
            &quick(),
            &SilentProgressReporter,
        )
        .await
        .unwrap_err();

        assert!(matches!(
            LaunchError::find(&err),
            Some(LaunchError::FetchFailed { status: 404, .. })
        ));
        assert!(!dest.exists());
        assert!(!part_path(&dest).exists());
    }

    #[tokio::test]
    async fn server_errors_are_retried() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .expect(2)
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let err = download_to_path(
            &Client::new(),
            &format!("{}/flaky.jar", server.uri()),
            &dir.path().join("flaky.jar"),
            None,
            &quick(),
            &SilentProgressReporter,
        )
        .await
        .unwrap_err();
        assert!(matches!(
            LaunchError::find(&err),
            Some(LaunchError::FetchFailed { status: 503, .. })
        ));
    }

    #[tokio::test]
    async fn checksum_mismatch_removes_download() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"tampered".to_vec()))
            .expect(1)
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("lib.jar");
        let err = download_to_path(
            &Client::new(),
            &format!("{}/lib.jar", server.uri()),
            &dest,
            Some(HELLO_SHA1),
            &quick(),
            &SilentProgressReporter,
        )
        .await
        .unwrap_err();

        match LaunchError::find(&err) {
            Some(LaunchError::IntegrityError { path, expected, .. }) => {
                assert_eq!(path, &dest);
                assert_eq!(expected, HELLO_SHA1);
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert!(!dest.exists());
        assert!(!part_path(&dest).exists());
    }
}
