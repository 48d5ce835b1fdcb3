use crate::error::LaunchError;
use std::path::{Path, PathBuf};

/// Progress reporter trait for installer operations
/// Implementations forward updates to a terminal, log or UI
pub trait ProgressReporter: Send + Sync {
    /// Start a new step with optional total steps
    fn start_step(&self, name: &str, total_steps: Option<u32>);

    /// Update bytes transferred for download progress
    fn update_bytes(&self, transferred: u64, total: Option<u64>);

    /// Set a short status message
    fn set_message(&self, message: &str);

    /// Set a numeric step count for the current step (e.g. "3/12").
    /// `total` may be None when unknown.
    fn set_step_count(&self, current: u32, total: Option<u32>);

    /// Mark operation as complete
    fn done(&self, success: bool, message: Option<&str>);

    /// Check if operation has been cancelled
    fn is_cancelled(&self) -> bool {
        false
    }
}

/// A progress reporter that does nothing (silent).
/// Useful for background verification or tests.
pub struct SilentProgressReporter;

impl ProgressReporter for SilentProgressReporter {
    fn start_step(&self, _name: &str, _total_steps: Option<u32>) {}
    fn update_bytes(&self, _transferred: u64, _total: Option<u64>) {}
    fn set_message(&self, _message: &str) {}
    fn set_step_count(&self, _current: u32, _total: Option<u32>) {}
    fn done(&self, _success: bool, _message: Option<&str>) {}
}

/// Operating system families a manifest can target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OsType {
    Windows,
    MacOS,
    Linux,
}

impl OsType {
    /// Map a host OS identifier (as in `std::env::consts::OS`) to a supported family
    pub fn from_host(os: &str) -> Result<Self, LaunchError> {
        match os {
            "windows" => Ok(OsType::Windows),
            "macos" | "osx" => Ok(OsType::MacOS),
            "linux" => Ok(OsType::Linux),
            other => Err(LaunchError::UnsupportedPlatform(format!("operating system '{}'", other))),
        }
    }

    /// Get the OS name as a string (for rule matching)
    pub fn as_str(&self) -> &'static str {
        match self {
            OsType::Windows => "windows",
            OsType::Linux => "linux",
            OsType::MacOS => "osx",
        }
    }

    /// Get the classpath separator for this OS
    pub fn classpath_separator(&self) -> &'static str {
        match self {
            OsType::Windows => ";",
            _ => ":",
        }
    }
}

/// Architecture types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Arch {
    X64,
    X86,
    Arm64,
    Arm32,
}

impl Arch {
    /// Map a host architecture identifier (as in `std::env::consts::ARCH`)
    pub fn from_host(arch: &str) -> Result<Self, LaunchError> {
        match arch {
            "x86_64" | "amd64" | "x64" => Ok(Arch::X64),
            "x86" | "i386" | "i686" => Ok(Arch::X86),
            "aarch64" | "arm64" => Ok(Arch::Arm64),
            "arm" | "armv7" | "arm32" => Ok(Arch::Arm32),
            other => Err(LaunchError::UnsupportedPlatform(format!("architecture '{}'", other))),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Arch::X64 => "x64",
            Arch::X86 => "x86",
            Arch::Arm64 => "arm64",
            Arch::Arm32 => "arm32",
        }
    }

    /// Value substituted for `${arch}` in legacy natives templates
    pub fn bits_placeholder(&self) -> &'static str {
        match self {
            Arch::X64 => "64",
            Arch::X86 => "32",
            other => other.as_str(),
        }
    }
}

/// Host identity used for rule evaluation and native selection.
/// Detected once per run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlatformIdentity {
    pub os: OsType,
    pub arch: Arch,
}

impl PlatformIdentity {
    pub fn new(os: OsType, arch: Arch) -> Self {
        Self { os, arch }
    }

    /// Detect the current host.
    ///
    /// An unsupported operating system is an error. An unsupported architecture is
    /// reported and replaced by x64, which is what most manifests ship natives for.
    pub fn detect() -> Result<Self, LaunchError> {
        Self::from_host(std::env::consts::OS, std::env::consts::ARCH)
    }

    pub fn from_host(os: &str, arch: &str) -> Result<Self, LaunchError> {
        let os = OsType::from_host(os)?;
        let arch = match Arch::from_host(arch) {
            Ok(arch) => arch,
            Err(e) => {
                log::warn!("{}; falling back to x64", e);
                Arch::X64
            }
        };
        Ok(Self { os, arch })
    }
}

/// On-disk layout of a game directory
#[derive(Debug, Clone)]
pub struct GameDirs {
    root: PathBuf,
}

impl GameDirs {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Get the game directory itself
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn versions_dir(&self) -> PathBuf {
        self.root.join("versions")
    }

    pub fn version_dir(&self, version_id: &str) -> PathBuf {
        self.versions_dir().join(version_id)
    }

    /// `versions/<id>/<id>.jar`
    pub fn client_jar(&self, version_id: &str) -> PathBuf {
        self.version_dir(version_id).join(format!("{}.jar", version_id))
    }

    /// `versions/<id>/<id>.json`
    pub fn version_manifest(&self, version_id: &str) -> PathBuf {
        self.version_dir(version_id).join(format!("{}.json", version_id))
    }

    /// Get the path to the natives directory for this version
    pub fn natives_dir(&self, version_id: &str) -> PathBuf {
        self.version_dir(version_id)
            .join(format!("{}-natives", version_id))
    }

    pub fn libraries_dir(&self) -> PathBuf {
        self.root.join("libraries")
    }

    pub fn assets_dir(&self) -> PathBuf {
        self.root.join("assets")
    }

    pub fn asset_indexes_dir(&self) -> PathBuf {
        self.assets_dir().join("indexes")
    }

    pub fn asset_objects_dir(&self) -> PathBuf {
        self.assets_dir().join("objects")
    }

    pub fn launcher_profiles(&self) -> PathBuf {
        self.root.join("launcher_profiles.json")
    }

    pub fn client_storage(&self) -> PathBuf {
        self.root.join("client_storage.json")
    }

    /// Create every directory a launch writes into
    pub async fn create_all(&self, version_id: &str) -> std::io::Result<()> {
        for dir in [
            self.version_dir(version_id),
            self.natives_dir(version_id),
            self.libraries_dir(),
            self.asset_indexes_dir(),
            self.asset_objects_dir(),
        ] {
            tokio::fs::create_dir_all(&dir).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn host_identifiers_map_to_closed_set() {
        let p = PlatformIdentity::from_host("linux", "x86_64").unwrap();
        assert_eq!(p, PlatformIdentity::new(OsType::Linux, Arch::X64));

        let p = PlatformIdentity::from_host("macos", "aarch64").unwrap();
        assert_eq!(p.os.as_str(), "osx");
        assert_eq!(p.arch.as_str(), "arm64");
    }

    #[test]
    fn unknown_arch_falls_back_to_x64() {
        let p = PlatformIdentity::from_host("windows", "riscv64").unwrap();
        assert_eq!(p.arch, Arch::X64);
    }

    #[test]
    fn unknown_os_is_unsupported() {
        let err = PlatformIdentity::from_host("freebsd", "x86_64").unwrap_err();
        assert!(matches!(err, LaunchError::UnsupportedPlatform(_)));
    }

    #[test]
    fn arch_placeholder_uses_bit_width_for_x86_family() {
        assert_eq!(Arch::X64.bits_placeholder(), "64");
        assert_eq!(Arch::X86.bits_placeholder(), "32");
        assert_eq!(Arch::Arm64.bits_placeholder(), "arm64");
    }

    #[test]
    fn game_dirs_layout() {
        let dirs = GameDirs::new("/mc");
        assert_eq!(dirs.client_jar("1.21"), PathBuf::from("/mc/versions/1.21/1.21.jar"));
        assert_eq!(
            dirs.natives_dir("1.21"),
            PathBuf::from("/mc/versions/1.21/1.21-natives")
        );
        assert_eq!(dirs.asset_objects_dir(), PathBuf::from("/mc/assets/objects"));
    }
}
