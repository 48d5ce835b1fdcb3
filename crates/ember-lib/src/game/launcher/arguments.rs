//! Placeholder substitution and launch command compilation

use crate::game::installer::config::{LAUNCHER_NAME, LAUNCHER_VERSION};
use crate::game::installer::types::{GameDirs, PlatformIdentity};
use crate::game::launcher::rules::RuleContext;
use crate::game::launcher::types::{Account, LaunchPlan, Resolution};
use crate::game::launcher::version_parser::{Argument, ResolvedManifest};
use anyhow::Result;
use dunce::canonicalize;
use std::collections::HashMap;
use std::path::Path;

/// Token values for `${name}` placeholders. Built once per run.
#[derive(Debug, Clone, Default)]
pub struct Bindings {
    values: HashMap<String, String>,
}

impl Bindings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: &str, value: impl Into<String>) {
        self.values.insert(key.to_string(), value.into());
    }

    pub fn with(mut self, key: &str, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    /// Bind every token a vanilla or modded manifest refers to
    pub fn for_launch(
        resolved: &ResolvedManifest,
        dirs: &GameDirs,
        platform: &PlatformIdentity,
        classpath: &str,
        account: &Account,
        resolution: Resolution,
    ) -> Self {
        let asset_index = resolved
            .asset_index
            .as_ref()
            .and_then(|a| a.id.clone())
            .or_else(|| resolved.assets.clone())
            .unwrap_or_default();

        Self::new()
            .with("natives_directory", display_path(&dirs.natives_dir(resolved.id())))
            .with("library_directory", display_path(&dirs.libraries_dir()))
            .with("classpath_separator", platform.os.classpath_separator())
            .with("launcher_name", LAUNCHER_NAME)
            .with("launcher_version", LAUNCHER_VERSION)
            .with("classpath", classpath)
            .with("auth_player_name", account.player_name.as_str())
            .with("version_name", resolved.id())
            .with("game_directory", display_path(dirs.root()))
            .with("assets_root", display_path(&dirs.assets_dir()))
            .with("assets_index_name", asset_index)
            .with("auth_uuid", account.uuid.as_str())
            .with("auth_access_token", account.access_token.as_str())
            .with("clientid", "N/A")
            .with("auth_xuid", account.xuid.as_str())
            .with("user_type", account.user_type.as_str())
            .with("version_type", resolved.version_type())
            .with("resolution_width", resolution.width.to_string())
            .with("resolution_height", resolution.height.to_string())
    }
}

fn display_path(path: &Path) -> String {
    canonicalize(path)
        .unwrap_or_else(|_| path.to_path_buf())
        .to_string_lossy()
        .into_owned()
}

/// Replace every bound `${token}` in `template`.
///
/// Single left-to-right pass: substituted values are not scanned again, and
/// unknown tokens are kept verbatim.
pub fn substitute(template: &str, bindings: &Bindings) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        match after.find('}') {
            Some(end) => {
                let key = &after[..end];
                match bindings.get(key) {
                    Some(value) => out.push_str(value),
                    None => {
                        out.push_str("${");
                        out.push_str(key);
                        out.push('}');
                    }
                }
                rest = &after[end + 1..];
            }
            None => {
                out.push_str(&rest[start..]);
                rest = "";
            }
        }
    }

    out.push_str(rest);
    out
}

/// Quote the value of a `-Dkey=value` flag when it contains whitespace
pub fn quote_system_property(arg: String) -> String {
    if !arg.starts_with("-D") {
        return arg;
    }
    let Some((key, value)) = arg.split_once('=') else {
        return arg;
    };
    let already_quoted = value.len() >= 2 && value.starts_with('"') && value.ends_with('"');
    if value.chars().any(char::is_whitespace) && !already_quoted {
        return format!("{}=\"{}\"", key, value);
    }
    arg
}

/// Expand one argument list, dropping conditional entries whose rules refuse
fn expand_arguments(arguments: &[Argument], ctx: &RuleContext, bindings: &Bindings) -> Vec<String> {
    let mut out = Vec::with_capacity(arguments.len());
    for arg in arguments {
        match arg {
            Argument::Simple(s) => out.push(substitute(s, bindings)),
            Argument::Conditional { rules, value } => {
                if !ctx.permits_all(Some(rules)) {
                    log::debug!("Skipping argument {:?} due to rules", value);
                    continue;
                }
                out.extend(value.values().iter().map(|v| substitute(v, bindings)));
            }
        }
    }
    out
}

/// JVM flags for manifests that only carry a legacy `minecraftArguments` string
const LEGACY_JVM_ARGUMENTS: [&str; 3] = [
    "-Djava.library.path=${natives_directory}",
    "-cp",
    "${classpath}",
];

/// Compile the resolved manifest into a launch plan.
///
/// A manifest without any JVM arguments gets the native library path and the
/// classpath supplied, since older versions never declared them.
pub fn compile(
    resolved: &ResolvedManifest,
    ctx: &RuleContext,
    bindings: &Bindings,
) -> Result<LaunchPlan> {
    let main_class = resolved.main_class()?.to_string();

    let mut jvm_args = expand_arguments(resolved.jvm_arguments(), ctx, bindings);
    if resolved.jvm_arguments().is_empty() {
        log::debug!("{} declares no JVM arguments, using legacy defaults", resolved.id());
        jvm_args.extend(LEGACY_JVM_ARGUMENTS.iter().map(|a| substitute(a, bindings)));
    }
    let jvm_args = jvm_args.into_iter().map(quote_system_property).collect();
    let game_args = expand_arguments(resolved.game_arguments(), ctx, bindings);

    Ok(LaunchPlan {
        jvm_args,
        main_class,
        game_args,
    })
}

/// Splits a string into whitespace-separated tokens while respecting
/// single and double quotes. Quotes are removed from returned tokens.
pub(crate) fn split_preserving_quotes(s: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut buf = String::new();
    let mut in_double = false;
    let mut in_single = false;

    for c in s.chars() {
        match c {
            '"' if !in_single => in_double = !in_double,
            '\'' if !in_double => in_single = !in_single,
            c if c.is_whitespace() && !in_double && !in_single => {
                if !buf.is_empty() {
                    out.push(std::mem::take(&mut buf));
                }
            }
            c => buf.push(c),
        }
    }

    if !buf.is_empty() {
        out.push(buf);
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LaunchError;
    use crate::game::installer::types::{Arch, OsType};
    use crate::game::launcher::rules::FeatureSet;
    use crate::game::launcher::version_parser::{merge_manifests, VersionManifest};
    use serde_json::json;

    fn resolved(value: serde_json::Value) -> ResolvedManifest {
        let m: VersionManifest = serde_json::from_value(value).unwrap();
        ResolvedManifest::standalone(m).unwrap()
    }

    fn linux(features: FeatureSet) -> RuleContext {
        RuleContext::new(PlatformIdentity::new(OsType::Linux, Arch::X64), features)
    }

    #[test]
    fn substitutes_every_occurrence_and_keeps_unknown_tokens() {
        let b = Bindings::new().with("a", "1").with("b", "two");
        assert_eq!(substitute("${a}-${b}-${a}", &b), "1-two-1");
        assert_eq!(substitute("${missing}/${a}", &b), "${missing}/1");
        assert_eq!(substitute("plain", &b), "plain");
        assert_eq!(substitute("dangling ${a", &b), "dangling ${a");
    }

    #[test]
    fn substituted_values_are_not_rescanned() {
        let b = Bindings::new().with("a", "${b}").with("b", "x");
        assert_eq!(substitute("${a}", &b), "${b}");
    }

    #[test]
    fn substitution_of_all_tokens_is_complete_and_idempotent() {
        let dirs = GameDirs::new("/games/mc");
        let platform = PlatformIdentity::new(OsType::Linux, Arch::X64);
        let r = resolved(json!({"id": "1.21", "assetIndex": {"id": "17"}, "type": "release"}));
        let b = Bindings::for_launch(
            &r,
            &dirs,
            &platform,
            "/a.jar:/b.jar",
            &Account::default(),
            Resolution::default(),
        );

        let template: String = b.keys().map(|k| format!("[${{{}}}]", k)).collect();
        let once = substitute(&template, &b);
        for key in b.keys() {
            assert!(!once.contains(&format!("${{{}}}", key)), "{} left behind", key);
        }
        assert_eq!(substitute(&once, &b), once);
    }

    #[test]
    fn bindings_cover_launch_tokens() {
        let dirs = GameDirs::new("/games/mc");
        let platform = PlatformIdentity::new(OsType::Windows, Arch::X64);
        let r = resolved(json!({"id": "1.21", "assets": "legacy"}));
        let b = Bindings::for_launch(
            &r,
            &dirs,
            &platform,
            "cp",
            &Account::default(),
            Resolution { width: 1920, height: 1080 },
        );

        assert_eq!(b.get("classpath_separator"), Some(";"));
        assert_eq!(b.get("assets_index_name"), Some("legacy"));
        assert_eq!(b.get("version_type"), Some("release"));
        assert_eq!(b.get("resolution_width"), Some("1920"));
        assert_eq!(b.get("auth_player_name"), Some("Player"));
        assert_eq!(b.get("launcher_name"), Some(LAUNCHER_NAME));
    }

    #[test]
    fn system_properties_with_spaces_are_quoted() {
        assert_eq!(
            quote_system_property("-Dos.name=Windows 10".into()),
            "-Dos.name=\"Windows 10\""
        );
        assert_eq!(
            quote_system_property("-Dos.name=\"Windows 10\"".into()),
            "-Dos.name=\"Windows 10\""
        );
        assert_eq!(quote_system_property("-Dfoo=bar".into()), "-Dfoo=bar");
        assert_eq!(quote_system_property("--title=My Game".into()), "--title=My Game");
        assert_eq!(quote_system_property("-Dflag".into()), "-Dflag");
    }

    #[test]
    fn compile_drops_refused_entries_with_all_values() {
        let r = resolved(json!({
            "id": "1.21",
            "mainClass": "net.minecraft.client.main.Main",
            "arguments": {
                "jvm": [
                    {"rules": [{"action": "allow", "os": {"name": "osx"}}], "value": ["-XstartOnFirstThread", "-Dx=1"]},
                    "-Djava.library.path=${natives_directory}",
                    "-Dname=${launcher_name} build"
                ],
                "game": [
                    "--username", "${auth_player_name}",
                    {"rules": [{"action": "allow", "features": {"is_demo_user": true}}], "value": "--demo"},
                    {"rules": [{"action": "allow", "features": {"has_custom_resolution": true}}],
                     "value": ["--width", "${resolution_width}", "--height", "${resolution_height}"]}
                ]
            }
        }));
        let b = Bindings::new()
            .with("natives_directory", "/n")
            .with("launcher_name", "Ember")
            .with("auth_player_name", "Steve")
            .with("resolution_width", "854")
            .with("resolution_height", "480");
        let ctx = linux(FeatureSet::new().with("has_custom_resolution", true));

        let plan = compile(&r, &ctx, &b).unwrap();
        assert_eq!(plan.main_class, "net.minecraft.client.main.Main");
        assert_eq!(
            plan.jvm_args,
            ["-Djava.library.path=/n", "-Dname=\"Ember build\""]
        );
        assert_eq!(
            plan.game_args,
            ["--username", "Steve", "--width", "854", "--height", "480"]
        );
    }

    #[test]
    fn game_arguments_are_not_quoted() {
        let r = resolved(json!({
            "id": "x",
            "mainClass": "Main",
            "arguments": {"game": ["-Dlooks=like a property"]}
        }));
        let plan = compile(&r, &linux(FeatureSet::new()), &Bindings::new()).unwrap();
        assert_eq!(plan.game_args, ["-Dlooks=like a property"]);
    }

    #[test]
    fn legacy_manifest_gets_library_path_and_classpath() {
        let r = resolved(json!({
            "id": "1.12.2",
            "mainClass": "net.minecraft.client.main.Main",
            "minecraftArguments": "--username ${auth_player_name} --version ${version_name}"
        }));
        let b = Bindings::new()
            .with("natives_directory", "/games/versions/1.12.2/1.12.2-natives")
            .with("classpath", "/l/a.jar:/v/1.12.2.jar")
            .with("auth_player_name", "Steve")
            .with("version_name", "1.12.2");

        let plan = compile(&r, &linux(FeatureSet::new()), &b).unwrap();
        assert_eq!(
            plan.jvm_args,
            [
                "-Djava.library.path=/games/versions/1.12.2/1.12.2-natives",
                "-cp",
                "/l/a.jar:/v/1.12.2.jar"
            ]
        );
        assert_eq!(plan.game_args, ["--username", "Steve", "--version", "1.12.2"]);
    }

    #[test]
    fn compile_without_main_class_fails() {
        let r = resolved(json!({"id": "x", "arguments": {"game": ["--a"]}}));
        let err = compile(&r, &linux(FeatureSet::new()), &Bindings::new()).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<LaunchError>(),
            Some(LaunchError::MissingEntryPoint(_))
        ));
    }

    #[test]
    fn compile_keeps_inherited_flag_order() {
        let target: VersionManifest =
            serde_json::from_value(json!({"id": "t", "arguments": {"jvm": ["-Dt=1"]}})).unwrap();
        let base: VersionManifest = serde_json::from_value(
            json!({"id": "b", "mainClass": "M", "arguments": {"jvm": ["-Db=1"]}}),
        )
        .unwrap();
        let r = merge_manifests(target, base).unwrap();
        let plan = compile(&r, &linux(FeatureSet::new()), &Bindings::new()).unwrap();
        assert_eq!(plan.jvm_args, ["-Db=1", "-Dt=1"]);
    }

    #[test]
    fn split_respects_quotes() {
        assert_eq!(
            split_preserving_quotes(r#"--a "b c" 'd e'  f"#),
            ["--a", "b c", "d e", "f"]
        );
        assert!(split_preserving_quotes("   ").is_empty());
    }
}
