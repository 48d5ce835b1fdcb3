mod backup;
mod config;
mod launch;
mod profiles;
mod progress;
mod setup;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use ember_lib::game::installer::config::DEFAULT_CONCURRENCY;
use ember_lib::game::installer::core::downloader::FetchOptions;
use ember_lib::game::installer::core::session::NetworkSession;
use ember_lib::game::metadata::fetcher::{download_version_manifest, VersionSelector, VERSION_CATALOGUE_URL};
use launch::RunOptions;
use std::path::{Path, PathBuf};

const INTERRUPTED_EXIT_CODE: i32 = 130;

#[derive(Parser, Debug)]
#[command(name = "ember-launcher")]
#[command(about = "Prepare and launch a Minecraft version from local manifests", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Directory holding launcher_config.json and the manifests (defaults to the executable's directory)
    #[arg(long)]
    root: Option<PathBuf>,

    /// Manifest filename to launch instead of the configured one
    #[arg(long = "version", value_name = "MANIFEST")]
    version: Option<String>,

    /// Concurrent downloads; 0 removes the limit
    #[arg(long, default_value_t = DEFAULT_CONCURRENCY)]
    concurrency: usize,

    /// Keep downloading after a failure and report every failed file
    #[arg(long)]
    collect_failures: bool,

    /// Prepare everything but do not start the game
    #[arg(long)]
    no_launch: bool,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Download a version manifest from Mojang into the root directory
    FetchManifest {
        /// `latest` (or `0`), `snapshot`, or a version id such as 1.21.1
        #[arg(default_value = "latest")]
        version: String,

        /// Version catalogue to resolve against
        #[arg(long, default_value = VERSION_CATALOGUE_URL)]
        catalogue_url: String,
    },
    /// Write the offline player name and uuid into config.json
    InitConfig {
        #[arg(long)]
        username: String,

        /// Generated when omitted
        #[arg(long)]
        uuid: Option<String>,
    },
}

fn default_root() -> Result<PathBuf> {
    let exe = std::env::current_exe().context("Failed to locate the launcher executable")?;
    match exe.parent() {
        Some(dir) => Ok(dir.to_path_buf()),
        None => std::env::current_dir().context("Failed to read the working directory"),
    }
}

async fn fetch_manifest(
    session: &NetworkSession,
    catalogue_url: &str,
    version: &str,
    root: &Path,
) -> Result<i32> {
    let saved = download_version_manifest(
        session.client(),
        catalogue_url,
        &VersionSelector::parse(version),
        root,
        &FetchOptions::default(),
    )
    .await?;
    println!("Saved {}", saved.display());
    Ok(0)
}

async fn start(cli: Cli) -> Result<i32> {
    let root = match cli.root {
        Some(root) => root,
        None => default_root()?,
    };

    if let Some(Commands::InitConfig { username, uuid }) = &cli.command {
        let uuid = config::write_user_config(&root, username, uuid.as_deref()).await?;
        println!("Your UUID is {}. Don't share it with anyone.", uuid);
        return Ok(0);
    }

    let session = NetworkSession::new()?;
    let work = async {
        match &cli.command {
            Some(Commands::FetchManifest {
                version,
                catalogue_url,
            }) => fetch_manifest(&session, catalogue_url, version, &root).await,
            _ => {
                let options = RunOptions {
                    root: root.clone(),
                    version: cli.version.clone(),
                    concurrency: cli.concurrency,
                    collect_failures: cli.collect_failures,
                    no_launch: cli.no_launch,
                };
                launch::run(&options, &session).await
            }
        }
    };

    let result = tokio::select! {
        result = work => result,
        _ = tokio::signal::ctrl_c() => {
            log::warn!("Interrupted, shutting down");
            Ok(INTERRUPTED_EXIT_CODE)
        }
    };
    session.close();
    result
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let default_filter = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter)).init();

    let code = match start(cli).await {
        Ok(code) => code,
        Err(e) => {
            log::error!("An error occurred: {:#}", e);
            1
        }
    };
    std::process::exit(code);
}
