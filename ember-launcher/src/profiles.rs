//! `launcher_profiles.json` and `client_storage.json` in the game directory.

use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use ember_lib::game::launcher::Account;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::path::Path;

const PROFILES_FORMAT_VERSION: u32 = 4;

fn profiles_document(version_id: &str, account: &Account, last_used: DateTime<Utc>) -> Value {
    let profile_name = format!("custom-{}", version_id);
    let profile_key = account.uuid.replace('-', "");
    let account_key = format!("account-{}", profile_key);

    json!({
        "profiles": {
            &profile_name: {
                "lastUsed": last_used.to_rfc3339_opts(SecondsFormat::Millis, true),
                "lastVersionId": version_id,
                "name": &profile_name,
                "type": "custom"
            }
        },
        "authenticationDatabase": {
            &account_key: {
                "accessToken": account.access_token,
                "profiles": {
                    &profile_key: {
                        "displayName": account.player_name,
                        "playerUUID": account.uuid,
                        "userId": account.xuid
                    }
                },
                "username": account.player_name,
                "properties": []
            }
        },
        "settings": {},
        "selectedUser": {
            "account": account_key,
            "profile": profile_key
        },
        "version": PROFILES_FORMAT_VERSION
    })
}

/// Rewrite the profiles file so it points at `version_id`
pub async fn write_launcher_profiles(path: &Path, version_id: &str, account: &Account) -> Result<()> {
    log::info!("Checking launcher profiles...");
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let document = profiles_document(version_id, account, Utc::now());
    tokio::fs::write(path, serde_json::to_string_pretty(&document)?)
        .await
        .with_context(|| format!("Could not write launcher profiles file {:?}", path))?;
    log::info!("Created/updated {:?}", path);
    Ok(())
}

/// Launcher state kept between runs
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientStorage {
    /// Versions whose one-time installer already ran
    #[serde(rename = "setupNeoForge")]
    pub setup_neo_forge: Vec<String>,
}

impl ClientStorage {
    /// Missing, unparsable or wrongly shaped files start over empty
    pub async fn load(path: &Path) -> Self {
        let content = match tokio::fs::read_to_string(path).await {
            Ok(content) => content,
            Err(e) => {
                if e.kind() != std::io::ErrorKind::NotFound {
                    log::warn!("Could not read {:?}: {}. Reinitialising.", path, e);
                }
                return Self::default();
            }
        };
        serde_json::from_str(&content).unwrap_or_else(|e| {
            log::warn!("Invalid client storage {:?}: {}. Reinitialising.", path, e);
            Self::default()
        })
    }

    pub async fn save(&self, path: &Path) -> Result<()> {
        tokio::fs::write(path, serde_json::to_string_pretty(self)?)
            .await
            .with_context(|| format!("Failed to write {:?}", path))
    }

    pub fn is_set_up(&self, version_id: &str) -> bool {
        self.setup_neo_forge.iter().any(|id| id == version_id)
    }

    pub fn record_setup(&mut self, version_id: &str) {
        if !self.is_set_up(version_id) {
            self.setup_neo_forge.push(version_id.to_string());
        }
    }
}
