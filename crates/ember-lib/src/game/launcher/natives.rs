//! Native library extraction for the launcher

use crate::error::LaunchError;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Reserved metadata prefix never copied out of a native archive
const METADATA_PREFIX: &str = "META-INF/";

/// A downloaded native classifier jar and its extra exclusion prefixes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NativeArchive {
    pub path: PathBuf,
    pub exclude: Vec<String>,
}

#[derive(Debug, Default)]
pub struct ExtractionReport {
    pub archives: usize,
    pub files: usize,
    /// Entries that could not be written and were left out
    pub skipped_entries: usize,
    pub failures: Vec<(PathBuf, anyhow::Error)>,
}

impl ExtractionReport {
    /// Log every failed archive and surface the first one
    pub fn ensure_success(mut self) -> Result<Self> {
        if self.failures.is_empty() {
            return Ok(self);
        }
        for (path, err) in &self.failures {
            log::error!("Failed to extract natives from {:?}: {:#}", path, err);
        }
        let (_, first) = self.failures.remove(0);
        Err(first)
    }
}

#[derive(Debug, Default)]
struct ArchiveStats {
    files: usize,
    skipped: usize,
}

/// Check if an entry should be left in the archive
fn should_exclude(entry_name: &str, exclusions: &[String]) -> bool {
    let upper = entry_name.to_ascii_uppercase();
    if upper.starts_with(METADATA_PREFIX) {
        return true;
    }
    exclusions.iter().any(|e| entry_name.starts_with(e.as_str()))
}

/// Extract every eligible entry of one archive. Unwritable entries are skipped.
fn extract_archive(archive: &NativeArchive, output_dir: &Path) -> Result<ArchiveStats> {
    log::debug!("Extracting natives from: {:?}", archive.path);
    let corrupt = || LaunchError::CorruptArchive {
        path: archive.path.clone(),
    };

    let file = std::fs::File::open(&archive.path).map_err(|e| {
        anyhow::Error::new(e)
            .context(format!("Failed to open {:?}", archive.path))
            .context(corrupt())
    })?;
    let mut zip = zip::ZipArchive::new(file)
        .map_err(|e| anyhow::Error::new(e).context(corrupt()))?;

    let mut stats = ArchiveStats::default();
    for i in 0..zip.len() {
        let mut entry = match zip.by_index(i) {
            Ok(entry) => entry,
            Err(e) => {
                log::warn!("Skipping unreadable entry #{} in {:?}: {}", i, archive.path, e);
                stats.skipped += 1;
                continue;
            }
        };

        if entry.is_dir() || should_exclude(entry.name(), &archive.exclude) {
            continue;
        }

        let Some(relative) = entry.enclosed_name() else {
            log::warn!("Skipping entry with unsafe path {:?} in {:?}", entry.name(), archive.path);
            stats.skipped += 1;
            continue;
        };
        let output_path = output_dir.join(relative);

        let written = (|| -> std::io::Result<()> {
            if let Some(parent) = output_path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let mut output_file = std::fs::File::create(&output_path)?;
            std::io::copy(&mut entry, &mut output_file)?;
            Ok(())
        })();

        match written {
            Ok(()) => stats.files += 1,
            Err(e) => {
                log::warn!("Failed to extract {:?} from {:?}: {}", output_path, archive.path, e);
                let _ = std::fs::remove_file(&output_path);
                stats.skipped += 1;
            }
        }
    }

    Ok(stats)
}

/// Clear `target_dir` and unpack every archive into it.
///
/// Archives are extracted concurrently on the blocking pool. A corrupt archive is
/// recorded in the report without stopping its siblings.
pub async fn extract_all(archives: &[NativeArchive], target_dir: &Path) -> Result<ExtractionReport> {
    if tokio::fs::try_exists(target_dir).await.unwrap_or(false) {
        log::debug!("Removing existing natives directory: {:?}", target_dir);
        tokio::fs::remove_dir_all(target_dir)
            .await
            .context(format!("Failed to clear natives directory {:?}", target_dir))?;
    }
    tokio::fs::create_dir_all(target_dir)
        .await
        .context(format!("Failed to create natives directory {:?}", target_dir))?;

    let tasks = archives.iter().cloned().map(|archive| {
        let target_dir = target_dir.to_path_buf();
        async move {
            let path = archive.path.clone();
            let result = tokio::task::spawn_blocking(move || extract_archive(&archive, &target_dir))
                .await
                .map_err(anyhow::Error::from)
                .and_then(|r| r);
            (path, result)
        }
    });

    let mut report = ExtractionReport {
        archives: archives.len(),
        ..Default::default()
    };
    for (path, result) in futures::future::join_all(tasks).await {
        match result {
            Ok(stats) => {
                report.files += stats.files;
                report.skipped_entries += stats.skipped;
            }
            Err(e) => report.failures.push((path, e)),
        }
    }

    log::info!(
        "Extracted {} native files from {} archives ({} entries skipped, {} archives failed)",
        report.files,
        report.archives,
        report.skipped_entries,
        report.failures.len()
    );
    Ok(report)
}
