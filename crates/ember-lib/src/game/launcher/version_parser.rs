//! Version manifest model, loading and inheritance merging

use crate::error::LaunchError;
use crate::game::launcher::arguments::split_preserving_quotes;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::ops::Deref;
use std::path::Path;

/// Complete version manifest as stored in `<id>.json`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionManifest {
    /// Version ID (e.g., "1.21.1" or "neoforge-21.1.162")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Parent version to inherit from
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inherits_from: Option<String>,

    /// Main class to execute
    #[serde(skip_serializing_if = "Option::is_none")]
    pub main_class: Option<String>,

    /// Game and JVM arguments
    #[serde(skip_serializing_if = "Option::is_none")]
    pub arguments: Option<Arguments>,

    /// Legacy arguments (pre-1.13)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub minecraft_arguments: Option<String>,

    #[serde(default)]
    pub libraries: Vec<Library>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub asset_index: Option<AssetIndex>,

    /// Assets id (legacy)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assets: Option<String>,

    /// Named downloads, `client` being the game binary
    #[serde(skip_serializing_if = "Option::is_none")]
    pub downloads: Option<HashMap<String, Artifact>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub java_version: Option<JavaVersion>,

    /// Logging configuration, passed through untouched
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logging: Option<serde_json::Value>,

    /// Version type (release, snapshot, etc.)
    #[serde(skip_serializing_if = "Option::is_none", rename = "type")]
    pub version_type: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub release_time: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub compliance_level: Option<u32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub minimum_launcher_version: Option<u32>,
}

/// Game and JVM arguments
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Arguments {
    #[serde(default)]
    pub game: Vec<Argument>,

    #[serde(default)]
    pub jvm: Vec<Argument>,
}

/// Argument that can be simple or conditional.
/// Any other JSON shape fails deserialization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Argument {
    /// Simple string argument
    Simple(String),

    /// Conditional argument with rules
    Conditional {
        #[serde(default)]
        rules: Vec<Rule>,
        value: ArgumentValue,
    },
}

/// Argument value can be a single string or array
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ArgumentValue {
    Single(String),
    Multiple(Vec<String>),
}

impl ArgumentValue {
    pub fn values(&self) -> &[String] {
        match self {
            ArgumentValue::Single(v) => std::slice::from_ref(v),
            ArgumentValue::Multiple(v) => v,
        }
    }
}

/// Rule for conditional arguments/libraries
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<RuleAction>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub os: Option<OsRule>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub features: Option<HashMap<String, bool>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleAction {
    Allow,
    Disallow,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OsRule {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Carried for completeness; not evaluated
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub arch: Option<String>,
}

/// Library definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Library {
    /// Maven coordinates, unique within a manifest
    pub name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub downloads: Option<LibraryDownloads>,

    /// Rules for conditional inclusion
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rules: Option<Vec<Rule>>,

    /// Legacy native classifiers (os name -> classifier template)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub natives: Option<HashMap<String, String>>,

    /// Extract rules for natives
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extract: Option<ExtractRules>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LibraryDownloads {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artifact: Option<Artifact>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub classifiers: Option<HashMap<String, Artifact>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Artifact {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sha1: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractRules {
    #[serde(default)]
    pub exclude: Vec<String>,
}

/// Asset index information
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetIndex {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sha1: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_size: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// Java version requirements
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JavaVersion {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub component: Option<String>,
    pub major_version: u32,
}

/// A manifest with its inheritance chain applied.
///
/// Always carries an id. Dereferences to the underlying [`VersionManifest`].
#[derive(Debug, Clone)]
pub struct ResolvedManifest {
    id: String,
    manifest: VersionManifest,
}

impl ResolvedManifest {
    /// Wrap a manifest that does not inherit from anything
    pub fn standalone(mut manifest: VersionManifest) -> Result<Self> {
        let id = manifest
            .id
            .clone()
            .ok_or_else(|| LaunchError::MissingIdentity("target manifest".into()))?;
        convert_legacy_arguments(&mut manifest, LegacyPlacement::Append);
        Ok(Self { id, manifest })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn main_class(&self) -> Result<&str> {
        self.manifest
            .main_class
            .as_deref()
            .filter(|c| !c.is_empty())
            .ok_or_else(|| LaunchError::MissingEntryPoint(self.id.clone()).into())
    }

    pub fn java_major(&self) -> Option<u32> {
        self.manifest.java_version.as_ref().map(|j| j.major_version)
    }

    pub fn version_type(&self) -> &str {
        self.manifest.version_type.as_deref().unwrap_or("release")
    }

    /// Arguments of one category; empty when the manifest declares none
    pub fn jvm_arguments(&self) -> &[Argument] {
        self.manifest
            .arguments
            .as_ref()
            .map(|a| a.jvm.as_slice())
            .unwrap_or_default()
    }

    pub fn game_arguments(&self) -> &[Argument] {
        self.manifest
            .arguments
            .as_ref()
            .map(|a| a.game.as_slice())
            .unwrap_or_default()
    }

    pub fn into_inner(self) -> VersionManifest {
        self.manifest
    }
}

impl Deref for ResolvedManifest {
    type Target = VersionManifest;

    fn deref(&self) -> &Self::Target {
        &self.manifest
    }
}

/// Parse manifest JSON; `origin` names the source in error messages
pub fn parse_manifest(json: &str, origin: &str) -> Result<VersionManifest> {
    serde_json::from_str(json)
        .map_err(|e| LaunchError::MalformedManifest(format!("{}: {}", origin, e)).into())
}

/// Parse a version json file
pub async fn parse_version_json(path: &Path) -> Result<VersionManifest> {
    let content = tokio::fs::read_to_string(path)
        .await
        .context(format!("Failed to read version manifest at {:?}", path))?;

    parse_manifest(&content, &path.display().to_string())
}

/// Resolve a target manifest against its base, loading the base from
/// `<manifest_dir>/<inheritsFrom>.json`.
pub async fn resolve_version_chain(
    target: VersionManifest,
    manifest_dir: &Path,
) -> Result<ResolvedManifest> {
    let Some(base_id) = target.inherits_from.clone() else {
        log::info!(
            "Manifest {} does not inherit from another version",
            target.id.as_deref().unwrap_or("<unknown>")
        );
        return ResolvedManifest::standalone(target);
    };

    let base_path = manifest_dir.join(format!("{}.json", base_id));
    let base = parse_version_json(&base_path)
        .await
        .with_context(|| format!("Failed to load base manifest '{}'", base_id))?;

    merge_manifests(target, base)
}

#[derive(Clone, Copy)]
enum LegacyPlacement {
    Prepend,
    Append,
}

/// Fold legacy `minecraftArguments` into `arguments.game`
fn convert_legacy_arguments(manifest: &mut VersionManifest, placement: LegacyPlacement) {
    let Some(legacy) = manifest.minecraft_arguments.take() else {
        return;
    };
    let converted: Vec<Argument> = split_preserving_quotes(&legacy)
        .into_iter()
        .map(Argument::Simple)
        .collect();
    if converted.is_empty() {
        return;
    }

    let args = manifest.arguments.get_or_insert_with(Arguments::default);
    match placement {
        LegacyPlacement::Prepend => {
            let mut game = converted;
            game.append(&mut args.game);
            args.game = game;
        }
        LegacyPlacement::Append => args.game.extend(converted),
    }
}

/// Merge a target manifest with the base it inherits from.
///
/// Libraries are keyed by name with the target winning; argument lists are
/// concatenated base first; scalars prefer the target; `downloads` always comes
/// from the base.
pub fn merge_manifests(target: VersionManifest, base: VersionManifest) -> Result<ResolvedManifest> {
    let target_id = target
        .id
        .clone()
        .ok_or_else(|| LaunchError::MissingIdentity("target manifest".into()))?;
    let base_id = base.id.clone().ok_or_else(|| {
        LaunchError::MissingIdentity(format!(
            "base manifest '{}'",
            target.inherits_from.as_deref().unwrap_or("<unknown>")
        ))
    })?;
    log::info!("Merging manifests: {} inheriting from {}", target_id, base_id);

    let mut target = target;
    let mut base = base;
    convert_legacy_arguments(&mut base, LegacyPlacement::Prepend);
    convert_legacy_arguments(&mut target, LegacyPlacement::Append);

    let mut libraries: Vec<Library> = Vec::with_capacity(base.libraries.len() + target.libraries.len());
    let mut index: HashMap<String, usize> = HashMap::new();
    for lib in base.libraries.into_iter().chain(target.libraries) {
        match index.get(&lib.name) {
            Some(&slot) => libraries[slot] = lib,
            None => {
                index.insert(lib.name.clone(), libraries.len());
                libraries.push(lib);
            }
        }
    }

    let base_args = base.arguments.unwrap_or_default();
    let target_args = target.arguments.unwrap_or_default();
    let arguments = Arguments {
        game: base_args.game.into_iter().chain(target_args.game).collect(),
        jvm: base_args.jvm.into_iter().chain(target_args.jvm).collect(),
    };

    let merged = VersionManifest {
        id: Some(target_id.clone()),
        inherits_from: None,
        main_class: target.main_class.or(base.main_class),
        arguments: Some(arguments),
        minecraft_arguments: None,
        libraries,
        asset_index: target.asset_index.or(base.asset_index),
        assets: target.assets.or(base.assets),
        downloads: base.downloads,
        java_version: target.java_version.or(base.java_version),
        logging: target.logging.or(base.logging),
        version_type: target.version_type,
        time: target.time,
        release_time: target.release_time,
        compliance_level: target.compliance_level.or(base.compliance_level),
        minimum_launcher_version: target
            .minimum_launcher_version
            .or(base.minimum_launcher_version),
    };

    Ok(ResolvedManifest {
        id: target_id,
        manifest: merged,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn manifest(value: serde_json::Value) -> VersionManifest {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn parses_all_argument_shapes() {
        let m = manifest(json!({
            "id": "1.21",
            "arguments": {
                "game": [
                    "--username",
                    {"rules": [{"action": "allow", "features": {"is_demo_user": true}}], "value": "--demo"},
                    {"rules": [], "value": ["--width", "${resolution_width}"]}
                ]
            }
        }));
        let game = &m.arguments.unwrap().game;
        assert_eq!(game[0], Argument::Simple("--username".into()));
        assert!(matches!(&game[1], Argument::Conditional { value: ArgumentValue::Single(v), .. } if v == "--demo"));
        assert!(matches!(&game[2], Argument::Conditional { value: ArgumentValue::Multiple(v), .. } if v.len() == 2));
    }

    #[test]
    fn unexpected_argument_shape_is_malformed() {
        let err = parse_manifest(r#"{"id":"x","arguments":{"jvm":[42]}}"#, "x.json").unwrap_err();
        assert!(matches!(
            err.downcast_ref::<LaunchError>(),
            Some(LaunchError::MalformedManifest(_))
        ));
    }

    #[test]
    fn unknown_rule_action_still_parses() {
        let m = manifest(json!({
            "id": "x",
            "libraries": [{"name": "a:b:1", "rules": [{"action": "maybe"}]}]
        }));
        let rules = m.libraries[0].rules.as_ref().unwrap();
        assert_eq!(rules[0].action, Some(RuleAction::Unknown));
    }

    #[test]
    fn scalars_fall_back_to_base_and_downloads_come_from_base() {
        let target = manifest(json!({
            "id": "child",
            "inheritsFrom": "base",
            "type": "release",
            "downloads": {"client": {"url": "https://child", "sha1": "c"}}
        }));
        let base = manifest(json!({
            "id": "base",
            "mainClass": "net.minecraft.client.main.Main",
            "assets": "17",
            "javaVersion": {"component": "java-runtime-delta", "majorVersion": 21},
            "time": "2024-01-01",
            "downloads": {"client": {"url": "https://base", "sha1": "b"}}
        }));

        let resolved = merge_manifests(target, base).unwrap();
        assert_eq!(resolved.id(), "child");
        assert_eq!(resolved.main_class().unwrap(), "net.minecraft.client.main.Main");
        assert_eq!(resolved.assets.as_deref(), Some("17"));
        assert_eq!(resolved.java_major(), Some(21));
        assert_eq!(
            resolved.downloads.as_ref().unwrap()["client"].url.as_deref(),
            Some("https://base")
        );
        // type/time are never inherited
        assert_eq!(resolved.version_type, Some("release".into()));
        assert_eq!(resolved.time, None);
        assert!(resolved.inherits_from.is_none());
    }

    #[test]
    fn arguments_concatenate_base_first() {
        let target = manifest(json!({"id": "t", "arguments": {"jvm": ["-Dt"], "game": ["--t"]}}));
        let base = manifest(json!({"id": "b", "arguments": {"jvm": ["-Db"], "game": ["--b"]}}));

        let resolved = merge_manifests(target, base).unwrap();
        assert_eq!(
            resolved.jvm_arguments(),
            &[Argument::Simple("-Db".into()), Argument::Simple("-Dt".into())]
        );
        assert_eq!(
            resolved.game_arguments(),
            &[Argument::Simple("--b".into()), Argument::Simple("--t".into())]
        );
    }

    #[test]
    fn legacy_arguments_are_folded_into_game_list() {
        let target = manifest(json!({"id": "t", "arguments": {"game": ["--extra"]}}));
        let base = manifest(json!({
            "id": "b",
            "minecraftArguments": "--username ${auth_player_name} --title \"My Game\""
        }));

        let resolved = merge_manifests(target, base).unwrap();
        let game: Vec<_> = resolved
            .game_arguments()
            .iter()
            .map(|a| match a {
                Argument::Simple(s) => s.as_str(),
                _ => "",
            })
            .collect();
        assert_eq!(
            game,
            ["--username", "${auth_player_name}", "--title", "My Game", "--extra"]
        );
    }

    #[test]
    fn missing_ids_are_rejected() {
        let err = merge_manifests(manifest(json!({})), manifest(json!({"id": "b"}))).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<LaunchError>(),
            Some(LaunchError::MissingIdentity(_))
        ));

        let err = merge_manifests(manifest(json!({"id": "t"})), manifest(json!({}))).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<LaunchError>(),
            Some(LaunchError::MissingIdentity(_))
        ));
    }

    #[test]
    fn missing_main_class_is_missing_entry_point() {
        let resolved = ResolvedManifest::standalone(manifest(json!({"id": "x"}))).unwrap();
        let err = resolved.main_class().unwrap_err();
        assert!(matches!(
            err.downcast_ref::<LaunchError>(),
            Some(LaunchError::MissingEntryPoint(_))
        ));
    }

    #[tokio::test]
    async fn standalone_target_is_used_verbatim() {
        let dir = tempfile::tempdir().unwrap();
        let target = manifest(json!({
            "id": "solo",
            "mainClass": "Main",
            "type": "snapshot",
            "libraries": [{"name": "a:b:1"}]
        }));

        let resolved = resolve_version_chain(target, dir.path()).await.unwrap();
        assert_eq!(resolved.id(), "solo");
        assert_eq!(resolved.version_type(), "snapshot");
        assert_eq!(resolved.libraries.len(), 1);
    }

    #[tokio::test]
    async fn base_is_loaded_from_manifest_dir() {
        let dir = tempfile::tempdir().unwrap();
        tokio::fs::write(
            dir.path().join("1.21.1.json"),
            json!({"id": "1.21.1", "mainClass": "Base"}).to_string(),
        )
        .await
        .unwrap();
        let target = manifest(json!({"id": "neoforge-21.1.162", "inheritsFrom": "1.21.1"}));

        let resolved = resolve_version_chain(target, dir.path()).await.unwrap();
        assert_eq!(resolved.main_class().unwrap(), "Base");
    }
}
