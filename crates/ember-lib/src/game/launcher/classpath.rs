use crate::game::installer::types::OsType;
use std::path::PathBuf;

/// Join classpath entries with the host separator, preserving order
pub fn build_classpath(entries: &[PathBuf], os: OsType) -> String {
    entries
        .iter()
        .map(|p| p.to_string_lossy())
        .collect::<Vec<_>>()
        .join(os.classpath_separator())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn separator_follows_os() {
        let entries = vec![PathBuf::from("a.jar"), PathBuf::from("b.jar")];
        assert_eq!(build_classpath(&entries, OsType::Linux), "a.jar:b.jar");
        assert_eq!(build_classpath(&entries, OsType::Windows), "a.jar;b.jar");
        assert_eq!(build_classpath(&[], OsType::MacOS), "");
    }
}
