//! Artifact checksum verification against repository sidecar files.

use md5::Md5;
use reqwest::Client;
use sha1::Sha1;
use sha2::Sha256;
use terrabuild_util::errors::TerraError;
use terrabuild_util::hash::hex_digest;

use crate::download;
use crate::repository::MavenRepository;

/// Sidecar algorithms in order of preference.
const ALGORITHMS: [Algorithm; 3] = [Algorithm::Sha256, Algorithm::Sha1, Algorithm::Md5];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Algorithm {
    Sha256,
    Sha1,
    Md5,
}

impl Algorithm {
    fn extension(self) -> &'static str {
        match self {
            Self::Sha256 => "sha256",
            Self::Sha1 => "sha1",
            Self::Md5 => "md5",
        }
    }

    fn name(self) -> &'static str {
        match self {
            Self::Sha256 => "SHA-256",
            Self::Sha1 => "SHA-1",
            Self::Md5 => "MD5",
        }
    }

    /// Lower-case hex digest of `data`.
    pub fn digest(self, data: &[u8]) -> String {
        match self {
            Self::Sha256 => hex_digest::<Sha256>(data),
            Self::Sha1 => hex_digest::<Sha1>(data),
            Self::Md5 => hex_digest::<Md5>(data),
        }
    }
}

/// Verify `data`, read from `relative` in `repo`, against the first
/// available checksum sidecar.
///
/// A mismatch is a [`TerraError::DependencyFetch`] for `coordinate`. A
/// missing sidecar only logs a warning.
pub async fn verify(
    client: &Client,
    repo: &MavenRepository,
    relative: &str,
    data: &[u8],
    coordinate: &str,
) -> miette::Result<()> {
    for algo in ALGORITHMS {
        let sidecar = format!("{relative}.{}", algo.extension());
        let Some(content) = download::fetch_text(client, repo, &sidecar).await? else {
            continue;
        };
        let expected = extract_hash(&content);
        let actual = algo.digest(data);
        if actual.eq_ignore_ascii_case(expected) {
            tracing::debug!("{} ok for {}", algo.name(), repo.describe(relative));
            return Ok(());
        }
        return Err(TerraError::DependencyFetch {
            coordinate: coordinate.to_string(),
            message: format!(
                "{} mismatch for {}: expected {expected}, got {actual}",
                algo.name(),
                repo.describe(relative)
            ),
        }
        .into());
    }

    tracing::warn!("No checksum sidecar found for {}", repo.describe(relative));
    Ok(())
}

/// Maven checksum files hold either just the hash or `hash  filename`.
fn extract_hash(content: &str) -> &str {
    content.split_whitespace().next().unwrap_or("")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn extract_hash_variants() {
        assert_eq!(extract_hash("abc123\n"), "abc123");
        assert_eq!(extract_hash("abc123  my-lib-1.0.jar\n"), "abc123");
        assert_eq!(extract_hash(""), "");
    }

    #[test]
    fn digests() {
        assert_eq!(
            Algorithm::Sha256.digest(b"hello world"),
            "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9"
        );
        assert_eq!(
            Algorithm::Sha1.digest(b"hello world"),
            "2aae6c35c94fcfb415dbe95f408b9ce91ee846ed"
        );
        assert_eq!(
            Algorithm::Md5.digest(b"hello world"),
            "5eb63bbbe01eeed093cb22bb8f5acdc3"
        );
    }

    fn local_repo(dir: &Path) -> MavenRepository {
        MavenRepository::from_url("local", dir.to_str().unwrap(), Path::new("/"))
    }

    #[tokio::test]
    async fn sha1_sidecar_is_checked() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.jar"), b"hello world").unwrap();
        std::fs::write(
            dir.path().join("a.jar.sha1"),
            "2aae6c35c94fcfb415dbe95f408b9ce91ee846ed  a.jar\n",
        )
        .unwrap();
        let client = download::build_client().unwrap();
        verify(&client, &local_repo(dir.path()), "a.jar", b"hello world", "g:a:1")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn mismatch_names_coordinate() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.jar.md5"), "00000000000000000000000000000000").unwrap();
        let client = download::build_client().unwrap();
        let err = verify(&client, &local_repo(dir.path()), "a.jar", b"hello world", "g:a:1")
            .await
            .unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("g:a:1"), "{msg}");
        assert!(msg.contains("MD5 mismatch"), "{msg}");
    }

    #[tokio::test]
    async fn missing_sidecar_is_accepted() {
        let dir = tempfile::tempdir().unwrap();
        let client = download::build_client().unwrap();
        verify(&client, &local_repo(dir.path()), "a.jar", b"data", "g:a:1")
            .await
            .unwrap();
    }
}
