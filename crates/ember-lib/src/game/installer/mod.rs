pub mod config;
pub mod core;
pub mod planner;
pub mod types;

use crate::game::installer::core::batch::{BatchDownloader, FailurePolicy};
use crate::game::installer::core::downloader::FetchOptions;
use crate::game::installer::core::session::NetworkSession;
use crate::game::launcher::natives::extract_all;
use crate::game::launcher::rules::RuleContext;
use crate::game::launcher::version_parser::ResolvedManifest;
use anyhow::{Context, Result};
use planner::{asset_index_artifact, load_asset_index, plan_assets_from, plan_libraries};
use std::path::PathBuf;
use std::sync::Arc;
use types::{GameDirs, ProgressReporter};

/// How the download stages behave
#[derive(Debug, Clone)]
pub struct InstallSpec {
    /// Number of concurrent downloads; 0 removes the ceiling
    pub concurrency: usize,
    pub failure_policy: FailurePolicy,
    pub fetch: FetchOptions,
    /// Asset CDN host
    pub resources_url: String,
}

impl Default for InstallSpec {
    fn default() -> Self {
        Self {
            concurrency: config::DEFAULT_CONCURRENCY,
            failure_policy: FailurePolicy::AbortOnFirst,
            fetch: FetchOptions::default(),
            resources_url: config::RESOURCES_URL.to_string(),
        }
    }
}

/// Everything on disk that the launch command refers to
#[derive(Debug, Clone)]
pub struct PreparedVersion {
    pub classpath: Vec<PathBuf>,
    pub natives_dir: PathBuf,
    pub asset_index_id: String,
    /// Asset keys left out because the index had no usable hash for them
    pub skipped_assets: Vec<String>,
}

/// Download and unpack everything a resolved version needs.
///
/// Stages run strictly in order: plan, libraries, natives, asset index, assets.
/// Manifest defects surface during planning, before any network activity.
pub async fn prepare_version(
    session: &NetworkSession,
    resolved: &ResolvedManifest,
    ctx: &RuleContext,
    dirs: &GameDirs,
    spec: &InstallSpec,
    reporter: Arc<dyn ProgressReporter>,
) -> Result<PreparedVersion> {
    let id = resolved.id();
    // Everything the manifest must declare is checked before the first request
    resolved.main_class()?;
    log::info!("Processing library list for {}", id);
    let plan = plan_libraries(resolved, ctx, dirs)?;
    let (asset_index_id, index_artifact) = asset_index_artifact(resolved, dirs)?;
    let index_path = index_artifact.path.clone();

    let downloader = BatchDownloader::new(session.client().clone(), spec.concurrency)
        .with_policy(spec.failure_policy)
        .with_options(spec.fetch.clone());

    reporter.start_step("Downloading libraries", None);
    downloader
        .download_all(plan.downloads(), reporter.clone())
        .await
        .ensure_success()
        .context("Library download failed")?;

    reporter.start_step("Extracting natives", None);
    let natives_dir = dirs.natives_dir(id);
    extract_all(&plan.native_archives(), &natives_dir)
        .await?
        .ensure_success()?;

    reporter.start_step("Downloading assets", None);
    downloader
        .download_all(vec![index_artifact], reporter.clone())
        .await
        .ensure_success()
        .context("Asset index download failed")?;

    let index = load_asset_index(&index_path).await?;
    let assets = plan_assets_from(&index, dirs, &spec.resources_url);
    log::info!(
        "Checking {} asset files listed in index {}",
        assets.artifacts.len(),
        asset_index_id
    );
    downloader
        .download_all(assets.artifacts, reporter.clone())
        .await
        .ensure_success()
        .context("Asset download failed")?;

    reporter.done(true, None);
    Ok(PreparedVersion {
        classpath: plan.classpath_paths(),
        natives_dir,
        asset_index_id,
        skipped_assets: assets.skipped,
    })
}
