pub mod installer;
pub mod launcher;
pub mod metadata;

// Re-export commonly used types
pub use installer::types::{GameDirs, PlatformIdentity};
pub use installer::{prepare_version, InstallSpec, PreparedVersion};
pub use launcher::{LaunchPlan, ResolvedManifest, VersionManifest};
