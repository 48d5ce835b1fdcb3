use crate::error::LaunchError;
use crate::game::installer::core::downloader::{fetch, FetchOptions, FetchOutcome};
use crate::game::installer::types::ProgressReporter;
use anyhow::Result;
use futures::stream::{self, StreamExt};
use reqwest::Client;
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

/// One file to place on disk: source, absolute destination and optional SHA1
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchArtifact {
    pub name: String,
    pub url: String,
    pub path: PathBuf,
    pub sha1: Option<String>,
    pub is_native: bool,
}

/// What to do with the rest of a batch once one artifact fails
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Stop starting new downloads; in-flight ones still finish
    #[default]
    AbortOnFirst,
    /// Run everything and report every failure
    CollectAll,
}

#[derive(Debug)]
pub struct BatchFailure {
    pub name: String,
    pub path: PathBuf,
    pub error: anyhow::Error,
}

#[derive(Debug, Default)]
pub struct BatchReport {
    pub total: usize,
    pub downloaded: usize,
    pub skipped: usize,
    /// Artifacts never attempted because the batch was aborted
    pub not_started: usize,
    pub failures: Vec<BatchFailure>,
}

impl BatchReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty() && self.not_started == 0
    }

    /// Log every failure and turn them into a single error
    pub fn ensure_success(self) -> Result<Self> {
        if self.is_success() {
            return Ok(self);
        }
        for failure in &self.failures {
            log::error!("Failed to download {}: {:#}", failure.name, failure.error);
        }
        Err(LaunchError::BatchFailed {
            failed: self.failures.len(),
            total: self.total,
        }
        .into())
    }
}

enum TaskResult {
    Done(FetchOutcome),
    Failed(BatchFailure),
    NotStarted,
}

pub struct BatchDownloader {
    client: Client,
    concurrency: usize,
    policy: FailurePolicy,
    options: FetchOptions,
}

impl BatchDownloader {
    /// `concurrency == 0` means no ceiling
    pub fn new(client: Client, concurrency: usize) -> Self {
        Self {
            client,
            concurrency,
            policy: FailurePolicy::default(),
            options: FetchOptions::default(),
        }
    }

    pub fn with_policy(mut self, policy: FailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_options(mut self, options: FetchOptions) -> Self {
        self.options = options;
        self
    }

    pub async fn download_all(
        &self,
        artifacts: Vec<BatchArtifact>,
        reporter: Arc<dyn ProgressReporter>,
    ) -> BatchReport {
        // Deduplicate artifacts by path to avoid concurrent writes to the same file
        let mut unique_artifacts = Vec::new();
        let mut seen_paths = HashSet::new();
        for artifact in artifacts {
            if seen_paths.insert(artifact.path.clone()) {
                unique_artifacts.push(artifact);
            }
        }

        let total = unique_artifacts.len();
        let mut report = BatchReport {
            total,
            ..Default::default()
        };
        if total == 0 {
            return report;
        }

        let limit = match self.concurrency {
            0 => total,
            n => n,
        };
        let finished = Arc::new(AtomicUsize::new(0));
        let aborted = Arc::new(AtomicBool::new(false));
        reporter.set_step_count(0, Some(total as u32));

        let results = stream::iter(unique_artifacts)
            .map(|artifact| {
                let client = self.client.clone();
                let options = self.options.clone();
                let policy = self.policy;
                let reporter = reporter.clone();
                let finished = finished.clone();
                let aborted = aborted.clone();

                async move {
                    if aborted.load(Ordering::SeqCst) || reporter.is_cancelled() {
                        return TaskResult::NotStarted;
                    }

                    let result = fetch(&client, &artifact, &options, &*reporter).await;

                    let count = finished.fetch_add(1, Ordering::SeqCst) + 1;
                    reporter.set_step_count(count as u32, Some(total as u32));
                    if count % 50 == 0 || count == total {
                        log::info!("Batch download progress: {}/{}", count, total);
                    }

                    match result {
                        Ok(outcome) => TaskResult::Done(outcome),
                        Err(error) => {
                            log::warn!("Failed to download {} from {}: {}", artifact.name, artifact.url, error);
                            if policy == FailurePolicy::AbortOnFirst {
                                aborted.store(true, Ordering::SeqCst);
                            }
                            TaskResult::Failed(BatchFailure {
                                name: artifact.name,
                                path: artifact.path,
                                error,
                            })
                        }
                    }
                }
            })
            .buffer_unordered(limit)
            .collect::<Vec<_>>()
            .await;

        for result in results {
            match result {
                TaskResult::Done(FetchOutcome::Downloaded) => report.downloaded += 1,
                TaskResult::Done(FetchOutcome::Skipped) => report.skipped += 1,
                TaskResult::Failed(failure) => report.failures.push(failure),
                TaskResult::NotStarted => report.not_started += 1,
            }
        }

        log::info!(
            "Batch finished: {} downloaded, {} already present, {} failed, {} not started",
            report.downloaded,
            report.skipped,
            report.failures.len(),
            report.not_started
        );
        report
    }
}
