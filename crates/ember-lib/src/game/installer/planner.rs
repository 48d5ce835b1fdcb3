//! Turns a resolved manifest into the concrete files a launch needs.
//!
//! Every planned artifact has an absolute destination, and no two artifacts in a plan
//! share one, so the download stage can write them concurrently without locking.

use crate::error::LaunchError;
use crate::game::installer::config::RESOURCES_URL;
use crate::game::installer::core::batch::BatchArtifact;
use crate::game::installer::types::GameDirs;
use crate::game::launcher::classifier::resolve_native;
use crate::game::launcher::natives::NativeArchive;
use crate::game::launcher::rules::RuleContext;
use crate::game::launcher::version_parser::ResolvedManifest;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::{Component, Path, PathBuf};

/// A native classifier archive plus the entry prefixes to leave out when unpacking
#[derive(Debug, Clone)]
pub struct NativeArtifact {
    pub artifact: BatchArtifact,
    pub exclude: Vec<String>,
}

/// Library half of a launch: classpath jars and native archives
#[derive(Debug, Clone, Default)]
pub struct ArtifactPlan {
    /// Classpath artifacts in manifest order, client binary last
    pub classpath: Vec<BatchArtifact>,
    pub natives: Vec<NativeArtifact>,
}

impl ArtifactPlan {
    /// Everything that has to be on disk before launch
    pub fn downloads(&self) -> Vec<BatchArtifact> {
        self.classpath
            .iter()
            .cloned()
            .chain(self.natives.iter().map(|n| n.artifact.clone()))
            .collect()
    }

    pub fn classpath_paths(&self) -> Vec<PathBuf> {
        self.classpath.iter().map(|a| a.path.clone()).collect()
    }

    pub fn native_archives(&self) -> Vec<NativeArchive> {
        self.natives
            .iter()
            .map(|n| NativeArchive {
                path: n.artifact.path.clone(),
                exclude: n.exclude.clone(),
            })
            .collect()
    }
}

/// Contents of `assets/indexes/<id>.json`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AssetIndexFile {
    #[serde(default)]
    pub objects: BTreeMap<String, AssetObject>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AssetObject {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
}

#[derive(Debug, Clone, Default)]
pub struct AssetPlan {
    pub artifacts: Vec<BatchArtifact>,
    /// Object keys that had no usable hash
    pub skipped: Vec<String>,
}

/// Join a manifest-supplied relative path under `base`, refusing anything that
/// would land outside it.
fn join_relative(base: &Path, relative: &str) -> Result<PathBuf> {
    let rel = Path::new(relative);
    let escapes = rel
        .components()
        .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
    if relative.is_empty() || escapes {
        return Err(LaunchError::MalformedManifest(format!(
            "artifact path '{}' must be relative and stay inside its directory",
            relative
        ))
        .into());
    }
    Ok(base.join(rel))
}

/// Plan classpath and native artifacts for the libraries that apply to this platform
pub fn plan_libraries(
    resolved: &ResolvedManifest,
    ctx: &RuleContext,
    dirs: &GameDirs,
) -> Result<ArtifactPlan> {
    let id = resolved.id();
    let client = resolved
        .downloads
        .as_ref()
        .and_then(|d| d.get("client"))
        .and_then(|c| Some((c.url.clone()?, c.sha1.clone()?)))
        .ok_or_else(|| LaunchError::IncompleteManifest {
            id: id.to_string(),
            detail: "downloads.client needs both url and sha1".to_string(),
        })?;
    let client = BatchArtifact {
        name: format!("{} client", id),
        url: client.0,
        path: dirs.client_jar(id),
        sha1: Some(client.1),
        is_native: false,
    };

    let libraries_dir = dirs.libraries_dir();
    let mut plan = ArtifactPlan::default();
    let mut seen: HashSet<PathBuf> = HashSet::from([client.path.clone()]);

    for lib in &resolved.libraries {
        if !ctx.permits_all(lib.rules.as_deref()) {
            log::debug!("Skipping library due to rules: {}", lib.name);
            continue;
        }

        if let Some(artifact) = lib.downloads.as_ref().and_then(|d| d.artifact.as_ref()) {
            if let (Some(path), Some(url)) = (&artifact.path, &artifact.url) {
                let dest = join_relative(&libraries_dir, path)
                    .with_context(|| format!("library {}", lib.name))?;
                if seen.insert(dest.clone()) {
                    plan.classpath.push(BatchArtifact {
                        name: lib.name.clone(),
                        url: url.clone(),
                        path: dest,
                        sha1: artifact.sha1.clone(),
                        is_native: false,
                    });
                }
            }
        }

        if let Some((classifier, native)) = resolve_native(lib, &ctx.platform) {
            if let (Some(path), Some(url)) = (&native.path, &native.url) {
                let dest = join_relative(&libraries_dir, path)
                    .with_context(|| format!("library {}:{}", lib.name, classifier))?;
                if seen.insert(dest.clone()) {
                    plan.natives.push(NativeArtifact {
                        artifact: BatchArtifact {
                            name: format!("{}:{}", lib.name, classifier),
                            url: url.clone(),
                            path: dest,
                            sha1: native.sha1.clone(),
                            is_native: true,
                        },
                        exclude: lib
                            .extract
                            .as_ref()
                            .map(|e| e.exclude.clone())
                            .unwrap_or_default(),
                    });
                }
            }
        }
    }

    plan.classpath.push(client);
    log::info!(
        "Planned {} classpath artifacts and {} native archives for {}",
        plan.classpath.len(),
        plan.natives.len(),
        id
    );
    Ok(plan)
}

/// The asset index download and its id
pub fn asset_index_artifact(
    resolved: &ResolvedManifest,
    dirs: &GameDirs,
) -> Result<(String, BatchArtifact)> {
    let incomplete = || LaunchError::IncompleteManifest {
        id: resolved.id().to_string(),
        detail: "assetIndex needs id, url and sha1".to_string(),
    };
    let index = resolved.asset_index.as_ref().ok_or_else(incomplete)?;
    let (Some(id), Some(url), Some(sha1)) = (&index.id, &index.url, &index.sha1) else {
        return Err(incomplete().into());
    };

    let path = join_relative(&dirs.asset_indexes_dir(), &format!("{}.json", id))?;
    Ok((
        id.clone(),
        BatchArtifact {
            name: format!("asset index {}", id),
            url: url.clone(),
            path,
            sha1: Some(sha1.clone()),
            is_native: false,
        },
    ))
}

pub async fn load_asset_index(path: &Path) -> Result<AssetIndexFile> {
    let content = tokio::fs::read_to_string(path)
        .await
        .context(format!("Failed to read asset index at {:?}", path))?;
    serde_json::from_str(&content).context(format!("Failed to parse asset index at {:?}", path))
}

/// Plan asset objects against the public resources host
pub fn plan_assets(index: &AssetIndexFile, dirs: &GameDirs) -> AssetPlan {
    plan_assets_from(index, dirs, RESOURCES_URL)
}

/// Plan asset objects: `objects/<hash[..2]>/<hash>` from `<host>/<hash[..2]>/<hash>`.
/// Objects without a usable hash are reported in `skipped`.
pub fn plan_assets_from(index: &AssetIndexFile, dirs: &GameDirs, host: &str) -> AssetPlan {
    let objects_dir = dirs.asset_objects_dir();
    let host = host.trim_end_matches('/');
    let mut plan = AssetPlan::default();
    let mut seen = HashSet::new();

    for (key, object) in &index.objects {
        let hash = match object.hash.as_deref() {
            Some(h) if h.len() >= 2 && h.chars().all(|c| c.is_ascii_hexdigit()) => h,
            _ => {
                log::warn!("Asset '{}' is missing a valid hash in index, skipping", key);
                plan.skipped.push(key.clone());
                continue;
            }
        };
        if !seen.insert(hash.to_string()) {
            continue;
        }

        let prefix = &hash[..2];
        plan.artifacts.push(BatchArtifact {
            name: key.clone(),
            url: format!("{}/{}/{}", host, prefix, hash),
            path: objects_dir.join(prefix).join(hash),
            sha1: Some(hash.to_string()),
            is_native: false,
        });
    }

    plan
}
