//! Content digests used as blob addresses
//!
//! The wire format is `sha256:<64 lowercase hex chars>`, and the server
//! verifies uploaded bytes against it, so the algorithm here and the prefix
//! must always agree.

use crate::error::{ClientError, ClientResult};
use sha2::{Digest, Sha256};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use tokio::io::AsyncReadExt;

/// Algorithm prefix carried by every digest string
pub const DIGEST_PREFIX: &str = "sha256:";

const HEX_LEN: usize = 64;

/// Content address of a blob, e.g. `sha256:2c26b46b...`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlobDigest(String);

impl BlobDigest {
    /// Digest an in-memory buffer
    pub fn from_bytes(bytes: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(bytes);
        Self::from_hasher(hasher)
    }

    fn from_hasher(hasher: Sha256) -> Self {
        Self(format!("{}{:x}", DIGEST_PREFIX, hasher.finalize()))
    }

    /// Full digest string including the `sha256:` prefix
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Lowercase hex portion without the prefix
    pub fn hex(&self) -> &str {
        &self.0[DIGEST_PREFIX.len()..]
    }
}

impl fmt::Display for BlobDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for BlobDigest {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex = s
            .strip_prefix(DIGEST_PREFIX)
            .ok_or_else(|| ClientError::InvalidDigest(format!("missing '{DIGEST_PREFIX}' prefix: {s}")))?;

        if hex.len() != HEX_LEN {
            return Err(ClientError::InvalidDigest(format!(
                "expected {} hex characters, got {}",
                HEX_LEN,
                hex.len()
            )));
        }
        if !hex.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f')) {
            return Err(ClientError::InvalidDigest(format!(
                "not lowercase hex: {hex}"
            )));
        }

        Ok(Self(s.to_string()))
    }
}

/// Digest a file on disk, reading it in `chunk_size` pieces
pub async fn digest_file(path: &Path, chunk_size: usize) -> ClientResult<BlobDigest> {
    digest_file_sized(path, chunk_size)
        .await
        .map(|(digest, _)| digest)
}

/// Digest a file and report how many bytes went into the hash
pub async fn digest_file_sized(path: &Path, chunk_size: usize) -> ClientResult<(BlobDigest, u64)> {
    let mut file = tokio::fs::File::open(path)
        .await
        .map_err(|e| ClientError::io(path, e))?;

    let mut hasher = Sha256::new();
    let mut hashed = 0u64;
    let mut buf = vec![0u8; chunk_size.max(1)];
    loop {
        let read = file
            .read(&mut buf)
            .await
            .map_err(|e| ClientError::io(path, e))?;
        if read == 0 {
            break;
        }
        hasher.update(&buf[..read]);
        hashed += read as u64;
    }

    Ok((BlobDigest::from_hasher(hasher), hashed))
}

#[cfg(test)]
mod tests {
    use super::*;

    // sha256("hello world")
    const HELLO: &str = "sha256:b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9";

    #[test]
    fn test_known_digest() {
        let digest = BlobDigest::from_bytes(b"hello world");
        assert_eq!(digest.as_str(), HELLO);
        assert_eq!(digest.hex().len(), 64);
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(
            BlobDigest::from_bytes(b"").to_string(),
            "sha256:e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn test_parse_valid() {
        let digest: BlobDigest = HELLO.parse().unwrap();
        assert_eq!(digest, BlobDigest::from_bytes(b"hello world"));
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert!("b94d27b9".parse::<BlobDigest>().is_err());
        assert!("sha256:abcd".parse::<BlobDigest>().is_err());
        assert!(HELLO.to_uppercase().replace("SHA256", "sha256").parse::<BlobDigest>().is_err());
        assert!("sha512:b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9"
            .parse::<BlobDigest>()
            .is_err());
    }

    #[tokio::test]
    async fn test_digest_file_matches_bytes() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("weights.bin");
        let content: Vec<u8> = (0..10_000u32).map(|i| (i % 251) as u8).collect();
        std::fs::write(&path, &content).unwrap();

        // Small chunks exercise the multi-read path
        let from_file = digest_file(&path, 7).await.unwrap();
        assert_eq!(from_file, BlobDigest::from_bytes(&content));
    }

    #[tokio::test]
    async fn test_digest_missing_file() {
        let err = digest_file(Path::new("/nonexistent/weights.bin"), 1024)
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Io { .. }));
    }
}
