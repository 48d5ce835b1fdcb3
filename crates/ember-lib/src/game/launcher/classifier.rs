use crate::game::installer::types::PlatformIdentity;
use crate::game::launcher::version_parser::{Artifact, Library};

/// Candidate classifier keys for a library on the given platform, in lookup order.
///
/// A legacy `natives[os]` template, when present, is the only candidate considered
/// from that source; the conventional `natives-{os}-{arch}` and `natives-{os}` keys follow.
pub(crate) fn classifier_candidates(lib: &Library, platform: &PlatformIdentity) -> Vec<String> {
    let os = platform.os.as_str();
    let mut candidates = Vec::with_capacity(3);

    if let Some(template) = lib.natives.as_ref().and_then(|n| n.get(os)) {
        candidates.push(template.replace("${arch}", platform.arch.bits_placeholder()));
    }

    candidates.push(format!("natives-{}-{}", os, platform.arch.as_str()));
    candidates.push(format!("natives-{}", os));
    candidates
}

/// Resolve the native classifier artifact for a library, if it has one for this platform.
/// At most one native is selected per library.
pub(crate) fn resolve_native<'a>(
    lib: &'a Library,
    platform: &PlatformIdentity,
) -> Option<(String, &'a Artifact)> {
    let classifiers = lib.downloads.as_ref()?.classifiers.as_ref()?;

    classifier_candidates(lib, platform)
        .into_iter()
        .find_map(|key| classifiers.get(&key).map(|artifact| (key, artifact)))
}
