//! Error taxonomy shared by the resolution, download and launch stages.
//!
//! Library functions return [`anyhow::Result`]; when a failure belongs to one of the
//! categories below it is raised as a [`LaunchError`] so callers can recover it with
//! `err.downcast_ref::<LaunchError>()`.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LaunchError {
    #[error("Malformed manifest: {0}")]
    MalformedManifest(String),

    #[error("Manifest is missing its id ({0})")]
    MissingIdentity(String),

    #[error("Manifest {id} is incomplete: {detail}")]
    IncompleteManifest { id: String, detail: String },

    #[error("Manifest {0} does not declare a main class")]
    MissingEntryPoint(String),

    #[error("Download failed: {url} (status {status})")]
    FetchFailed { url: String, status: u16 },

    #[error("SHA1 mismatch for {}: expected {expected}, got {actual}", path.display())]
    IntegrityError {
        path: PathBuf,
        expected: String,
        actual: String,
    },

    #[error("Corrupt archive: {}", path.display())]
    CorruptArchive { path: PathBuf },

    #[error("Unsupported platform: {0}")]
    UnsupportedPlatform(String),

    #[error("{failed} of {total} downloads failed")]
    BatchFailed { failed: usize, total: usize },

    #[error("Version {0} is not listed in the version catalogue")]
    UnknownVersion(String),

    #[error("No usable Java {major} runtime could be found or installed")]
    RuntimeUnavailable { major: u32 },
}

impl LaunchError {
    /// Finds a [`LaunchError`] anywhere in an error chain, including context layers.
    pub fn find(err: &anyhow::Error) -> Option<&LaunchError> {
        err.downcast_ref::<LaunchError>()
            .or_else(|| err.chain().find_map(|cause| cause.downcast_ref::<LaunchError>()))
    }
}
