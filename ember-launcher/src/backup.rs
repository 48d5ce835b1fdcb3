//! Zip backup of the game directory taken after the game exits.

use anyhow::{Context, Result};
use std::fs::File;
use std::io::Write;
use std::path::Path;
use walkdir::WalkDir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

pub const BACKUP_FILE: &str = ".minecraft_autobackup.zip";

/// Zip `source` into `archive`, replacing any previous backup. Returns the file count.
pub async fn create_backup(source: &Path, archive: &Path) -> Result<usize> {
    let source = source.to_path_buf();
    let archive = archive.to_path_buf();
    tokio::task::spawn_blocking(move || write_backup(&source, &archive)).await?
}

fn write_backup(source: &Path, archive: &Path) -> Result<usize> {
    log::info!("Backing up {:?} to {:?}", source, archive);
    let part = archive.with_extension("zip.part");
    let file = File::create(&part).with_context(|| format!("Failed to create {:?}", part))?;
    let mut zip = ZipWriter::new(file);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    let mut files = 0;
    for entry in WalkDir::new(source).min_depth(1).into_iter().filter_map(|e| e.ok()) {
        let path = entry.path();
        if path == archive || path == part {
            continue;
        }
        let relative = path.strip_prefix(source)?;
        let name = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");

        if entry.file_type().is_dir() {
            zip.add_directory(format!("{}/", name), options)?;
        } else if entry.file_type().is_file() {
            zip.start_file(name, options)?;
            let mut input = File::open(path).with_context(|| format!("Failed to read {:?}", path))?;
            std::io::copy(&mut input, &mut zip)?;
            files += 1;
        }
    }
    zip.finish()?.flush()?;

    if archive.exists() {
        log::debug!("Removing existing backup zip: {:?}", archive);
        std::fs::remove_file(archive)?;
    }
    std::fs::rename(&part, archive)?;
    log::info!("Backup zip created at {:?} ({} files)", archive, files);
    Ok(files)
}
