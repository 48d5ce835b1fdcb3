//! Manifest resolution and launch command compilation

pub mod arguments;
pub mod classifier;
pub mod classpath;
pub mod natives;
pub mod process;
pub mod rules;
pub mod types;
pub mod version_parser;

// Re-export commonly used types
pub use arguments::{compile, quote_system_property, substitute, Bindings};
pub use classpath::build_classpath;
pub use natives::{extract_all, NativeArchive};
pub use process::launch_game;
pub use rules::{FeatureSet, RuleContext};
pub use types::{Account, LaunchPlan, Resolution};
pub use version_parser::{
    merge_manifests, parse_manifest, parse_version_json, resolve_version_chain, Argument,
    Arguments, Library, ResolvedManifest, VersionManifest,
};
