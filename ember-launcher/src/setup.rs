//! One-time loader installer run for freshly downloaded NeoForge versions.

use crate::profiles::ClientStorage;
use anyhow::{Context, Result};
use std::path::Path;
use tokio::process::Command;

pub const INSTALLER_JAR: &str = "neoinstaller.jar";
const NEOFORGE_PREFIX: &str = "neoforge-";

pub fn needs_setup(version_id: &str, storage: &ClientStorage) -> bool {
    version_id.starts_with(NEOFORGE_PREFIX) && !storage.is_set_up(version_id)
}

/// Run the installer jar against the game directory once per version.
///
/// A failed installer run is logged and left unrecorded so the next launch retries it.
pub async fn run_one_time_setup(
    root: &Path,
    game_dir: &Path,
    java: &Path,
    version_id: &str,
    storage_path: &Path,
) -> Result<()> {
    let mut storage = ClientStorage::load(storage_path).await;
    if !needs_setup(version_id, &storage) {
        return Ok(());
    }

    let installer = root.join(INSTALLER_JAR);
    if !installer.is_file() {
        log::warn!("{} needs setup but {:?} is missing, skipping", version_id, installer);
        return Ok(());
    }

    log::info!("Running NeoForge installer for {}", version_id);
    let output = Command::new(java)
        .arg("-jar")
        .arg(&installer)
        .arg("--install-client")
        .arg(game_dir)
        .current_dir(root)
        .output()
        .await
        .with_context(|| format!("Failed to start installer {:?}", installer))?;

    for line in String::from_utf8_lossy(&output.stdout).lines() {
        log::info!("[installer] {}", line);
    }
    for line in String::from_utf8_lossy(&output.stderr).lines() {
        log::warn!("[installer] {}", line);
    }

    if !output.status.success() {
        log::error!(
            "NeoForge installer exited with {}; continuing without recording setup",
            output.status
        );
        return Ok(());
    }

    storage.record_setup(version_id);
    storage.save(storage_path).await?;
    log::info!("NeoForge setup recorded for {}", version_id);
    Ok(())
}
