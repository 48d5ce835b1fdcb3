use crate::game::installer::types::ProgressReporter;
use anyhow::Result;
use futures::future::BoxFuture;
use std::path::PathBuf;
use std::sync::Arc;

/// Supplies the Java executable a launch runs under.
/// Implementations may look for an existing runtime or install one.
pub trait RuntimeProvider: Send + Sync {
    /// Path to a `java` executable of the given major version
    fn locate<'a>(
        &'a self,
        major: u32,
        reporter: Arc<dyn ProgressReporter>,
    ) -> BoxFuture<'a, Result<PathBuf>>;
}
