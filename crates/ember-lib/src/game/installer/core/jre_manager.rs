use crate::error::LaunchError;
use crate::game::installer::config::ADOPTIUM_API_URL;
use crate::game::installer::core::downloader::{download_to_path, FetchOptions};
use crate::game::installer::core::traits::RuntimeProvider;
use crate::game::installer::types::{Arch, OsType, PlatformIdentity, ProgressReporter};
use anyhow::{Context, Result};
use futures::future::BoxFuture;
use futures::FutureExt;
use reqwest::Client;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Runtime provider backed by an install directory, the system Java and Eclipse Adoptium
pub struct AdoptiumRuntime {
    install_dir: PathBuf,
    client: Client,
    platform: PlatformIdentity,
    api_base: String,
    system_lookup: bool,
}

impl AdoptiumRuntime {
    pub fn new(install_dir: impl Into<PathBuf>, client: Client, platform: PlatformIdentity) -> Self {
        Self {
            install_dir: install_dir.into(),
            client,
            platform,
            api_base: ADOPTIUM_API_URL.to_string(),
            system_lookup: true,
        }
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    /// Whether `JAVA_HOME` and `PATH` are consulted before downloading
    pub fn with_system_lookup(mut self, enabled: bool) -> Self {
        self.system_lookup = enabled;
        self
    }

    fn managed_dir(&self, major: u32) -> PathBuf {
        self.install_dir.join(format!("jdk-{}", major))
    }

    /// Get or install a runtime of the required major version.
    /// Returns the path to the java executable.
    pub async fn get_or_install(
        &self,
        major: u32,
        reporter: &dyn ProgressReporter,
    ) -> Result<PathBuf> {
        log::info!("Ensuring Java {} is available", major);

        if let Some(java) = find_java_executable(&self.managed_dir(major)) {
            if verified_major(&java).await == Some(major) {
                log::info!("Found existing Java installation: {:?}", java);
                return Ok(java);
            }
            log::warn!("Ignoring unusable Java installation at {:?}", java);
        }

        if self.system_lookup {
            for candidate in system_java_candidates() {
                if verified_major(&candidate).await == Some(major) {
                    log::info!("Using system Java {}: {:?}", major, candidate);
                    return Ok(candidate);
                }
            }
        }

        log::info!("Downloading Java {} from Adoptium...", major);
        self.install(major, reporter)
            .await
            .map_err(|e| e.context(LaunchError::RuntimeUnavailable { major }))
    }

    async fn install(&self, major: u32, reporter: &dyn ProgressReporter) -> Result<PathBuf> {
        let url = adoptium_url(&self.api_base, major, &self.platform);
        let ext = archive_extension(self.platform.os);
        let archive = self
            .install_dir
            .join("downloads")
            .join(format!("jdk-{}.{}", major, ext));

        reporter.start_step(&format!("Downloading Java {}", major), None);
        download_to_path(
            &self.client,
            &url,
            &archive,
            None,
            &FetchOptions::default(),
            reporter,
        )
        .await?;

        let target = self.managed_dir(major);
        let install_root = self.install_dir.clone();
        let archive_path = archive.clone();
        let target_dir = target.clone();
        tokio::task::spawn_blocking(move || {
            unpack_runtime(&archive_path, &install_root, &target_dir)
        })
        .await
        .context("Runtime extraction task panicked")??;

        if let Err(e) = tokio::fs::remove_file(&archive).await {
            log::debug!("Could not remove runtime archive {:?}: {}", archive, e);
        }

        let java = find_java_executable(&target)
            .context("Could not find java executable after extraction")?;
        make_executable(&java)?;

        match verified_major(&java).await {
            Some(found) if found == major => {
                log::info!("Java {} installed successfully: {:?}", major, java);
                reporter.done(true, None);
                Ok(java)
            }
            found => {
                reporter.done(false, Some("Installed runtime failed verification"));
                anyhow::bail!(
                    "Installed runtime at {:?} reports major version {:?}",
                    java,
                    found
                )
            }
        }
    }
}

impl RuntimeProvider for AdoptiumRuntime {
    fn locate<'a>(
        &'a self,
        major: u32,
        reporter: Arc<dyn ProgressReporter>,
    ) -> BoxFuture<'a, Result<PathBuf>> {
        async move { self.get_or_install(major, &*reporter).await }.boxed()
    }
}

/// `{base}/{major}/ga/{os}/{arch}/jdk/hotspot/normal/eclipse`
pub fn adoptium_url(base: &str, major: u32, platform: &PlatformIdentity) -> String {
    let os = match platform.os {
        OsType::Windows => "windows",
        OsType::MacOS => "mac",
        OsType::Linux => "linux",
    };
    let arch = match platform.arch {
        Arch::X64 => "x64",
        Arch::X86 => "x32",
        Arch::Arm64 => "aarch64",
        Arch::Arm32 => "arm",
    };
    format!(
        "{}/{}/ga/{}/{}/jdk/hotspot/normal/eclipse",
        base.trim_end_matches('/'),
        major,
        os,
        arch
    )
}

fn archive_extension(os: OsType) -> &'static str {
    match os {
        OsType::Windows => "zip",
        _ => "tar.gz",
    }
}

/// Unpack into a staging directory next to `target`, then move it into place
fn unpack_runtime(archive: &Path, install_root: &Path, target: &Path) -> Result<()> {
    std::fs::create_dir_all(install_root)?;
    let staging = tempfile::tempdir_in(install_root)?;
    log::info!("Extracting runtime to: {:?}", target);

    let is_zip = archive
        .extension()
        .map(|e| e.eq_ignore_ascii_case("zip"))
        .unwrap_or(false);
    if is_zip {
        extract_zip(archive, staging.path())?;
    } else {
        extract_tar_gz(archive, staging.path())?;
    }

    if target.exists() {
        std::fs::remove_dir_all(target)?;
    }
    std::fs::rename(staging.path(), target)
        .with_context(|| format!("Failed to move runtime into {:?}", target))?;
    Ok(())
}

fn extract_zip(archive: &Path, dest: &Path) -> Result<()> {
    let file = std::fs::File::open(archive)?;
    let mut zip = zip::ZipArchive::new(file)
        .map_err(|_| LaunchError::CorruptArchive { path: archive.to_path_buf() })?;
    zip.extract(dest)?;
    Ok(())
}

/// Extract a tar.gz archive
fn extract_tar_gz(archive: &Path, dest: &Path) -> Result<()> {
    use flate2::read::GzDecoder;
    use tar::Archive;

    let file = std::fs::File::open(archive)?;
    let mut tar = Archive::new(GzDecoder::new(file));
    tar.unpack(dest)
        .map_err(|_| LaunchError::CorruptArchive { path: archive.to_path_buf() })?;
    Ok(())
}

fn make_executable(path: &Path) -> Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mut perms = std::fs::metadata(path)?.permissions();
        perms.set_mode(0o755);
        std::fs::set_permissions(path, perms)?;
    }
    #[cfg(not(unix))]
    let _ = path;
    Ok(())
}

fn java_executable_name() -> &'static str {
    if cfg!(windows) {
        "java.exe"
    } else {
        "java"
    }
}

/// Find the java executable in a runtime installation directory
pub fn find_java_executable(dir: &Path) -> Option<PathBuf> {
    // Common layouts:
    // - jdk-{major}/bin/java (direct extraction)
    // - jdk-{major}/jdk-{full-version}/bin/java (nested)
    // - jdk-{major}/jdk-{full-version}/Contents/Home/bin/java (macOS)
    let executable_name = java_executable_name();

    let direct = dir.join("bin").join(executable_name);
    if direct.is_file() {
        return Some(direct);
    }

    if let Ok(entries) = std::fs::read_dir(dir) {
        for entry in entries.flatten() {
            if entry.path().is_dir() {
                let nested = entry.path().join("bin").join(executable_name);
                if nested.is_file() {
                    return Some(nested);
                }

                let macos = entry.path().join("Contents/Home/bin").join(executable_name);
                if macos.is_file() {
                    return Some(macos);
                }
            }
        }
    }

    let macos = dir.join("Contents/Home/bin").join(executable_name);
    if macos.is_file() {
        return Some(macos);
    }

    None
}

/// `JAVA_HOME` first, then whatever `java` resolves to on the `PATH`
fn system_java_candidates() -> Vec<PathBuf> {
    let mut candidates = Vec::new();
    if let Some(home) = std::env::var_os("JAVA_HOME") {
        let java = PathBuf::from(home).join("bin").join(java_executable_name());
        if java.is_file() {
            candidates.push(java);
        }
    }
    if let Ok(java) = which::which("java") {
        let java = dunce::canonicalize(&java).unwrap_or(java);
        if !candidates.contains(&java) {
            candidates.push(java);
        }
    }
    candidates
}

async fn verified_major(path: &Path) -> Option<u32> {
    let path = path.to_path_buf();
    match tokio::task::spawn_blocking(move || verify_java(&path)).await {
        Ok(Ok(major)) => Some(major),
        Ok(Err(e)) => {
            log::debug!("Java verification failed: {:#}", e);
            None
        }
        Err(e) => {
            log::debug!("Java verification task failed: {}", e);
            None
        }
    }
}

/// Run `java -version` and return the major version it reports
pub fn verify_java(path: &Path) -> Result<u32> {
    if !path.exists() {
        anyhow::bail!("Java path does not exist: {:?}", path);
    }

    // java -version writes to stderr
    let output = std::process::Command::new(path)
        .arg("-version")
        .output()
        .context("Failed to run java -version")?;

    let version_str = String::from_utf8_lossy(&output.stderr);
    parse_major_version(&version_str)
        .context(format!("Could not parse Java version from: {}", version_str))
}

fn parse_major_version(version_output: &str) -> Option<u32> {
    // Look for patterns like "1.8.0", "17.0.1", "21-ea"
    let re = regex::Regex::new(r"version\s+?.\s*?(\d+)(\.(\d+))?").ok()?;
    let caps = re.captures(version_output)?;
    let major = caps.get(1)?.as_str().parse::<u32>().ok()?;
    if major == 1 {
        // 1.8.x -> 8
        return caps.get(3)?.as_str().parse::<u32>().ok();
    }
    Some(major)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn parses_java_version_output() {
        assert_eq!(
            parse_major_version(r#"openjdk version "17.0.1" 2021-10-19"#),
            Some(17)
        );
        assert_eq!(parse_major_version(r#"java version "1.8.0_311""#), Some(8));
        assert_eq!(parse_major_version(r#"openjdk version "21-ea" 2023-09-19"#), Some(21));
        assert_eq!(parse_major_version("command not found"), None);
    }

    #[test]
    fn builds_adoptium_urls() {
        let p = PlatformIdentity::new(OsType::MacOS, Arch::Arm64);
        assert_eq!(
            adoptium_url(ADOPTIUM_API_URL, 21, &p),
            "https://api.adoptium.net/v3/binary/latest/21/ga/mac/aarch64/jdk/hotspot/normal/eclipse"
        );
        let p = PlatformIdentity::new(OsType::Windows, Arch::X64);
        assert!(adoptium_url("http://localhost/", 17, &p).starts_with("http://localhost/17/ga/windows/x64/"));
    }

    #[test]
    fn finds_java_executable_in_common_layouts() {
        let tmp = tempfile::tempdir().unwrap();
        let exe = java_executable_name();

        let root = tmp.path().join("jdk-17");
        fs::create_dir_all(root.join("bin")).unwrap();
        let java_path = root.join("bin").join(exe);
        fs::write(&java_path, b"").unwrap();
        assert_eq!(find_java_executable(&root), Some(java_path));

        let nested_root = tmp.path().join("jdk-21");
        let nested_inner = nested_root.join("jdk-21.0.1+12");
        fs::create_dir_all(nested_inner.join("bin")).unwrap();
        let nested_java = nested_inner.join("bin").join(exe);
        fs::write(&nested_java, b"").unwrap();
        assert_eq!(find_java_executable(&nested_root), Some(nested_java));

        let mac_root = tmp.path().join("jdk-8");
        let mac_bin = mac_root.join("jdk8u402-b06/Contents/Home/bin");
        fs::create_dir_all(&mac_bin).unwrap();
        fs::write(mac_bin.join(exe), b"").unwrap();
        assert_eq!(find_java_executable(&mac_root), Some(mac_bin.join(exe)));

        assert_eq!(find_java_executable(&tmp.path().join("absent")), None);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn installs_runtime_from_archive() {
        use crate::game::installer::types::SilentProgressReporter;
        use flate2::write::GzEncoder;
        use flate2::Compression;
        use wiremock::matchers::{method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let script = b"#!/bin/sh\necho 'openjdk version \"17.0.2\" 2022-01-18' >&2\n";
        let mut builder = tar::Builder::new(GzEncoder::new(Vec::new(), Compression::default()));
        let mut header = tar::Header::new_gnu();
        header.set_size(script.len() as u64);
        header.set_mode(0o755);
        header.set_cksum();
        builder
            .append_data(&mut header, "jdk-17.0.2+8/bin/java", &script[..])
            .unwrap();
        let tarball = builder.into_inner().unwrap().finish().unwrap();

        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/17/ga/linux/x64/jdk/hotspot/normal/eclipse"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(tarball))
            .expect(1)
            .mount(&server)
            .await;

        let tmp = tempfile::tempdir().unwrap();
        let runtime = AdoptiumRuntime::new(
            tmp.path(),
            Client::new(),
            PlatformIdentity::new(OsType::Linux, Arch::X64),
        )
        .with_api_base(server.uri())
        .with_system_lookup(false);

        let java = runtime
            .get_or_install(17, &SilentProgressReporter)
            .await
            .unwrap();
        assert!(java.starts_with(tmp.path().join("jdk-17")));

        // Second call finds the managed install without touching the network
        let again = runtime
            .get_or_install(17, &SilentProgressReporter)
            .await
            .unwrap();
        assert_eq!(again, java);
    }

    #[tokio::test]
    async fn unavailable_runtime_is_reported() {
        use crate::game::installer::types::SilentProgressReporter;
        use wiremock::matchers::method;
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let tmp = tempfile::tempdir().unwrap();
        let runtime = AdoptiumRuntime::new(
            tmp.path(),
            Client::new(),
            PlatformIdentity::new(OsType::Linux, Arch::X64),
        )
        .with_api_base(server.uri())
        .with_system_lookup(false);

        let err = runtime
            .get_or_install(99, &SilentProgressReporter)
            .await
            .unwrap_err();
        assert!(matches!(
            LaunchError::find(&err),
            Some(LaunchError::RuntimeUnavailable { major: 99 })
        ));
    }
}
