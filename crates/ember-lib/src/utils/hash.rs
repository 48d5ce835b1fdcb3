use anyhow::Result;
use sha1::{Digest, Sha1};
use std::path::Path;
use tokio::io::AsyncReadExt;

const READ_CHUNK_SIZE: usize = 8192;

/// SHA1 of a file's contents as lowercase hex
pub async fn calculate_sha1(path: &Path) -> Result<String> {
    let mut file = tokio::fs::File::open(path).await?;
    let mut hasher = Sha1::new();
    let mut buffer = vec![0u8; READ_CHUNK_SIZE];

    loop {
        let n = file.read(&mut buffer).await?;
        if n == 0 {
            break;
        }
        hasher.update(&buffer[..n]);
    }

    Ok(format!("{:x}", hasher.finalize()))
}

/// Case-insensitive comparison of hex digests
pub fn sha1_matches(actual: &str, expected: &str) -> bool {
    actual.eq_ignore_ascii_case(expected.trim())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[tokio::test]
    async fn test_sha1() -> Result<()> {
        let mut file = NamedTempFile::new()?;
        file.write_all(b"hello world")?;
        let hash = calculate_sha1(file.path()).await?;
        assert_eq!(hash, "2aae6c35c94fcfb415dbe95f408b9ce91ee846ed");
        Ok(())
    }

    #[test]
    fn digest_comparison_ignores_case() {
        assert!(sha1_matches("2aae6c", "2AAE6C"));
        assert!(!sha1_matches("2aae6c", "2aae6d"));
    }
}
