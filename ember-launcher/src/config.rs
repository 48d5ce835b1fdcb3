//! Launcher and user configuration files.

use anyhow::{Context, Result};
use ember_lib::game::launcher::{Account, FeatureSet, Resolution};
use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use uuid::Uuid;

pub const LAUNCHER_CONFIG_FILE: &str = "launcher_config.json";
pub const USER_CONFIG_FILE: &str = "config.json";

const DEFAULT_VERSION_MANIFEST: &str = "neoforge-21.1.162.json";
const DEFAULT_BASE_DIR: &str = ".mc_launcher_data";
const DEFAULT_GAME_DIR: &str = ".minecraft";
const THISDIR_TOKEN: &str = ":thisdir:";

/// Where the game lives and which manifest to start
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LauncherConfig {
    /// Target manifest filename, relative to the root directory
    pub version: String,
    pub base_path: PathBuf,
    /// Game directory name under `base_path`
    pub path: String,
}

impl LauncherConfig {
    pub async fn load(root: &Path) -> Result<Self> {
        let path = root.join(LAUNCHER_CONFIG_FILE);
        let content = tokio::fs::read_to_string(&path)
            .await
            .with_context(|| format!("{} not found in {:?}", LAUNCHER_CONFIG_FILE, root))?;
        Self::from_json(&content, root)
    }

    pub fn from_json(content: &str, root: &Path) -> Result<Self> {
        let raw: serde_json::Map<String, Value> = serde_json::from_str(content)
            .with_context(|| format!("Error parsing {}", LAUNCHER_CONFIG_FILE))?;
        let root_str = root.to_string_lossy();

        let get = |key: &str| {
            raw.get(key)
                .and_then(Value::as_str)
                .map(|v| v.replace(THISDIR_TOKEN, &root_str))
        };

        let config = Self {
            version: get("version").unwrap_or_else(|| DEFAULT_VERSION_MANIFEST.to_string()),
            base_path: get("basepath")
                .map(PathBuf::from)
                .unwrap_or_else(|| root.join(DEFAULT_BASE_DIR)),
            path: get("path").unwrap_or_else(|| DEFAULT_GAME_DIR.to_string()),
        };
        log::info!("Launcher config: {:?}", config);
        Ok(config)
    }

    pub fn game_dir(&self) -> PathBuf {
        self.base_path.join(&self.path)
    }
}

/// Optional per-user settings from `config.json`.
///
/// Every field is read on its own: a value of the wrong type is dropped with a
/// warning and only that field falls back to its default.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct UserConfig {
    #[serde(deserialize_with = "lenient_string")]
    pub auth_player_name: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub auth_uuid: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub auth_access_token: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub auth_xuid: Option<String>,
    #[serde(deserialize_with = "lenient_bool")]
    pub demo: bool,
    #[serde(deserialize_with = "lenient_bool")]
    pub backup: bool,
    /// Accepts a number or a numeric string
    #[serde(deserialize_with = "lenient_dimension")]
    pub resolution_width: Option<u32>,
    #[serde(deserialize_with = "lenient_dimension")]
    pub resolution_height: Option<u32>,
}

fn ignored<T>(value: &Value, expected: &str) -> Option<T> {
    if !value.is_null() {
        log::warn!("Ignoring {} in {}: expected {}", value, USER_CONFIG_FILE, expected);
    }
    None
}

fn lenient_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        other => ignored(&other, "a string"),
    })
}

fn lenient_bool<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    let value = Value::deserialize(deserializer)?;
    let parsed = match &value {
        Value::Bool(b) => Some(*b),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    };
    Ok(parsed.or_else(|| ignored(&value, "true or false")).unwrap_or(false))
}

fn lenient_dimension<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<u32>, D::Error> {
    let value = Value::deserialize(deserializer)?;
    let parsed = match &value {
        Value::Number(n) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
        Value::String(s) if s.trim().is_empty() => return Ok(None),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    };
    Ok(parsed.filter(|n| *n > 0).or_else(|| ignored(&value, "a positive size")))
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value.as_deref().filter(|v| !v.is_empty()).map(str::to_string)
}

impl UserConfig {
    /// Missing or unreadable config falls back to defaults
    pub async fn load(root: &Path) -> Self {
        let path = root.join(USER_CONFIG_FILE);
        match tokio::fs::read_to_string(&path).await {
            Ok(content) => Self::from_json(&content),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Self::default(),
            Err(e) => {
                log::warn!("Could not read {}: {}. Using defaults.", USER_CONFIG_FILE, e);
                Self::default()
            }
        }
    }

    pub fn from_json(content: &str) -> Self {
        serde_json::from_str(content).unwrap_or_else(|e| {
            log::warn!("Could not parse {}: {}. Using defaults.", USER_CONFIG_FILE, e);
            Self::default()
        })
    }

    pub fn account(&self) -> Account {
        let defaults = Account::default();
        Account {
            player_name: non_empty(&self.auth_player_name).unwrap_or(defaults.player_name),
            uuid: non_empty(&self.auth_uuid).unwrap_or(defaults.uuid),
            access_token: non_empty(&self.auth_access_token).unwrap_or(defaults.access_token),
            xuid: non_empty(&self.auth_xuid).unwrap_or(defaults.xuid),
            user_type: defaults.user_type,
        }
    }

    pub fn resolution(&self) -> Resolution {
        let defaults = Resolution::default();
        Resolution {
            width: self.resolution_width.unwrap_or(defaults.width),
            height: self.resolution_height.unwrap_or(defaults.height),
        }
    }

    pub fn has_custom_resolution(&self) -> bool {
        self.resolution_width.is_some() || self.resolution_height.is_some()
    }

    /// Feature flags consulted by conditional arguments
    pub fn features(&self) -> FeatureSet {
        FeatureSet::new()
            .with("is_demo_user", self.demo)
            .with("has_custom_resolution", self.has_custom_resolution())
    }
}

/// Write the offline identity into `config.json`, keeping any other settings already there.
///
/// An empty or missing uuid is replaced by a random v4 one. Returns the uuid written.
pub async fn write_user_config(root: &Path, username: &str, uuid: Option<&str>) -> Result<String> {
    let username = username.trim();
    if username.is_empty() {
        anyhow::bail!("A username is required");
    }
    let uuid = match uuid.map(str::trim).filter(|u| !u.is_empty()) {
        Some(u) => u.to_string(),
        None => Uuid::new_v4().to_string(),
    };

    let path = root.join(USER_CONFIG_FILE);
    let mut settings = match tokio::fs::read_to_string(&path).await {
        Ok(content) => match serde_json::from_str::<Value>(&content) {
            Ok(Value::Object(map)) => map,
            _ => {
                log::warn!("Replacing unreadable {}", USER_CONFIG_FILE);
                Map::new()
            }
        },
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Map::new(),
        Err(e) => return Err(e).with_context(|| format!("Failed to read {:?}", path)),
    };
    settings.insert("auth_player_name".into(), Value::from(username));
    settings.insert("auth_uuid".into(), Value::from(uuid.as_str()));

    let content = serde_json::to_string_pretty(&Value::Object(settings))?;
    tokio::fs::write(&path, content)
        .await
        .with_context(|| format!("Failed to write {:?}", path))?;
    log::info!("Wrote {} for {}", USER_CONFIG_FILE, username);
    Ok(uuid)
}
