//! The end-to-end launch sequence.

use crate::backup::{create_backup, BACKUP_FILE};
use crate::config::{LauncherConfig, UserConfig};
use crate::profiles::write_launcher_profiles;
use crate::progress::LogReporter;
use crate::setup::run_one_time_setup;
use anyhow::{Context, Result};
use ember_lib::game::installer::config::DEFAULT_JAVA_MAJOR;
use ember_lib::game::installer::core::batch::FailurePolicy;
use ember_lib::game::installer::core::jre_manager::AdoptiumRuntime;
use ember_lib::game::installer::core::session::NetworkSession;
use ember_lib::game::installer::core::traits::RuntimeProvider;
use ember_lib::game::installer::types::{GameDirs, PlatformIdentity, ProgressReporter};
use ember_lib::game::installer::{prepare_version, InstallSpec};
use ember_lib::game::launcher::{
    build_classpath, compile, launch_game, parse_version_json, resolve_version_chain, Bindings,
    RuleContext,
};
use std::path::PathBuf;
use std::sync::Arc;

const RUNTIME_DIR: &str = "java-runtime";

#[derive(Debug, Clone)]
pub struct RunOptions {
    pub root: PathBuf,
    /// Manifest filename overriding the launcher config
    pub version: Option<String>,
    pub concurrency: usize,
    pub collect_failures: bool,
    pub no_launch: bool,
}

/// Prepare and start the configured version. Returns the game's exit code.
pub async fn run(options: &RunOptions, session: &NetworkSession) -> Result<i32> {
    let root = &options.root;
    let launcher_config = LauncherConfig::load(root).await?;
    let user_config = UserConfig::load(root).await;
    let account = user_config.account();

    let platform = PlatformIdentity::detect()?;
    log::info!(
        "Detected OS: {}, Arch: {}",
        platform.os.as_str(),
        platform.arch.as_str()
    );

    let manifest_file = options
        .version
        .clone()
        .unwrap_or_else(|| launcher_config.version.clone());
    let manifest_path = root.join(&manifest_file);
    let target = parse_version_json(&manifest_path).await?;
    let resolved = resolve_version_chain(target, root).await?;
    let version_id = resolved.id().to_string();
    resolved.main_class()?;
    log::info!("Preparing Minecraft {}...", version_id);

    let dirs = GameDirs::new(launcher_config.game_dir());
    dirs.create_all(&version_id)
        .await
        .with_context(|| format!("Failed to create game directories under {:?}", dirs.root()))?;
    write_launcher_profiles(&dirs.launcher_profiles(), &version_id, &account).await?;
    tokio::fs::copy(&manifest_path, dirs.version_manifest(&version_id))
        .await
        .with_context(|| format!("Failed to copy {:?} into the versions directory", manifest_path))?;

    let ctx = RuleContext::new(platform, user_config.features());
    let reporter: Arc<dyn ProgressReporter> = Arc::new(LogReporter);
    let spec = InstallSpec {
        concurrency: options.concurrency,
        failure_policy: if options.collect_failures {
            FailurePolicy::CollectAll
        } else {
            FailurePolicy::AbortOnFirst
        },
        ..InstallSpec::default()
    };
    let prepared = prepare_version(session, &resolved, &ctx, &dirs, &spec, reporter.clone()).await?;
    if !prepared.skipped_assets.is_empty() {
        log::warn!("{} assets had no usable hash", prepared.skipped_assets.len());
    }

    let major = resolved.java_major().unwrap_or(DEFAULT_JAVA_MAJOR);
    let runtime = AdoptiumRuntime::new(root.join(RUNTIME_DIR), session.client().clone(), platform);
    let java = runtime.locate(major, reporter.clone()).await?;
    log::info!("Using Java {} at {:?}", major, java);

    run_one_time_setup(root, dirs.root(), &java, &version_id, &dirs.client_storage()).await?;

    let classpath = build_classpath(&prepared.classpath, platform.os);
    let bindings = Bindings::for_launch(
        &resolved,
        &dirs,
        &platform,
        &classpath,
        &account,
        user_config.resolution(),
    );
    let plan = compile(&resolved, &ctx, &bindings)?;

    if options.no_launch {
        log::info!("Launch command: {}", plan.command_line(&java).join(" "));
        return Ok(0);
    }

    log::info!("Launching Minecraft {}...", version_id);
    let status = launch_game(&plan, &java, dirs.root()).await?;
    log::info!("Minecraft exited with {}", status);

    if user_config.backup {
        if let Err(e) = create_backup(dirs.root(), &root.join(BACKUP_FILE)).await {
            log::error!("Backup failed: {:#}", e);
        }
    }

    Ok(status.code().unwrap_or(1))
}
