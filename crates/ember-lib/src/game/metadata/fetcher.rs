//! Mojang's version catalogue (`version_manifest_v2.json`) and per-version manifest downloads.

use crate::error::LaunchError;
use crate::game::installer::core::downloader::{download_to_path, FetchOptions};
use crate::game::installer::types::SilentProgressReporter;
use crate::game::launcher::version_parser::parse_version_json;
use anyhow::{Context, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const VERSION_CATALOGUE_URL: &str =
    "https://piston-meta.mojang.com/mc/game/version_manifest_v2.json";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionCatalogue {
    pub latest: Latest,
    pub versions: Vec<CatalogueEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Latest {
    pub release: String,
    pub snapshot: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogueEntry {
    pub id: String,

    #[serde(rename = "type")]
    pub release_type: String,

    pub url: String,

    #[serde(default)]
    pub sha1: Option<String>,
}

/// Which catalogue entry to download
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionSelector {
    LatestRelease,
    LatestSnapshot,
    Id(String),
}

impl VersionSelector {
    /// `latest` (or `0`) and `snapshot` pick the catalogue's latest entries; anything else is an id
    pub fn parse(input: &str) -> Self {
        match input.trim() {
            "" | "0" | "latest" => Self::LatestRelease,
            "snapshot" => Self::LatestSnapshot,
            id => Self::Id(id.to_string()),
        }
    }
}

impl VersionCatalogue {
    pub fn find(&self, selector: &VersionSelector) -> Result<&CatalogueEntry> {
        let id = match selector {
            VersionSelector::LatestRelease => &self.latest.release,
            VersionSelector::LatestSnapshot => &self.latest.snapshot,
            VersionSelector::Id(id) => id,
        };
        self.versions
            .iter()
            .find(|v| &v.id == id)
            .ok_or_else(|| LaunchError::UnknownVersion(id.clone()).into())
    }
}

pub async fn fetch_catalogue(client: &Client, url: &str) -> Result<VersionCatalogue> {
    log::info!("Fetching version catalogue from {}", url);
    let response = client
        .get(url)
        .send()
        .await
        .with_context(|| format!("Failed to request {}", url))?;
    if !response.status().is_success() {
        return Err(LaunchError::FetchFailed {
            url: url.to_string(),
            status: response.status().as_u16(),
        }
        .into());
    }
    let body = response.text().await?;
    serde_json::from_str(&body).map_err(|e| {
        LaunchError::MalformedManifest(format!("version catalogue from {}: {}", url, e)).into()
    })
}

/// Save the selected version's manifest as `<dest_dir>/<id>.json` and return its path.
///
/// The catalogue's checksum is verified, and an up-to-date file is left untouched.
pub async fn download_version_manifest(
    client: &Client,
    catalogue_url: &str,
    selector: &VersionSelector,
    dest_dir: &Path,
    options: &FetchOptions,
) -> Result<PathBuf> {
    let catalogue = fetch_catalogue(client, catalogue_url).await?;
    let entry = catalogue.find(selector)?;
    let dest = dest_dir.join(format!("{}.json", entry.id));

    download_to_path(
        client,
        &entry.url,
        &dest,
        entry.sha1.as_deref(),
        options,
        &SilentProgressReporter,
    )
    .await?;
    parse_version_json(&dest).await?;

    log::info!("Saved {} manifest to {:?}", entry.id, dest);
    Ok(dest)
}
