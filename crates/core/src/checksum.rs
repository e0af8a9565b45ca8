//! Checksum parsing and artifact verification.
//!
//! Lockfiles pin artifact digests in two wire formats: Subresource
//! Integrity strings (`sha512-<base64>`, used by npm and yarn) and
//! `<algorithm>:<hex>` pairs (used by pip `--hash` pins). Both normalize
//! into a [`Checksum`] holding the algorithm and a lowercase hex digest.

use crate::error::{Error, Result};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use sha2::{Digest, Sha256, Sha512};
use std::path::Path;

/// Digest algorithms accepted for artifact verification.
///
/// Weaker algorithms (sha1, md5) are deliberately not supported. A
/// lockfile that pins only a weak digest fails with
/// [`Error::InvalidChecksum`] rather than skipping verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Algorithm {
    /// SHA-256, 32 byte digests.
    Sha256,
    /// SHA-512, 64 byte digests.
    Sha512,
}

impl Algorithm {
    /// The algorithm name as it appears in lockfiles.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Sha256 => "sha256",
            Self::Sha512 => "sha512",
        }
    }

    /// Expected digest length in bytes.
    #[must_use]
    pub fn digest_len(self) -> usize {
        match self {
            Self::Sha256 => 32,
            Self::Sha512 => 64,
        }
    }

    /// Compute the hex digest of a file with this algorithm, streaming so
    /// large artifacts are never held in memory.
    pub fn hash_file(self, path: &Path) -> Result<String> {
        let mut file = std::fs::File::open(path)
            .map_err(|source| Error::io_with_path(source, path, "reading artifact"))?;
        let digest = match self {
            Self::Sha256 => {
                let mut hasher = Sha256::new();
                std::io::copy(&mut file, &mut hasher)
                    .map_err(|source| Error::io_with_path(source, path, "hashing artifact"))?;
                format!("{:x}", hasher.finalize())
            }
            Self::Sha512 => {
                let mut hasher = Sha512::new();
                std::io::copy(&mut file, &mut hasher)
                    .map_err(|source| Error::io_with_path(source, path, "hashing artifact"))?;
                format!("{:x}", hasher.finalize())
            }
        };
        Ok(digest)
    }
}

impl std::str::FromStr for Algorithm {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "sha256" => Ok(Self::Sha256),
            "sha512" => Ok(Self::Sha512),
            other => Err(Error::InvalidChecksum {
                value: other.to_string(),
                message: "unsupported digest algorithm".to_string(),
            }),
        }
    }
}

impl std::fmt::Display for Algorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A parsed checksum: algorithm plus lowercase hex digest.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Checksum {
    algorithm: Algorithm,
    digest: String,
}

impl Checksum {
    /// Build a checksum from an algorithm and a hex digest, validating the
    /// digest is well formed for that algorithm.
    pub fn from_hex(algorithm: Algorithm, digest: &str) -> Result<Self> {
        let decoded = hex::decode(digest).map_err(|e| Error::InvalidChecksum {
            value: digest.to_string(),
            message: format!("invalid hex digest: {e}"),
        })?;
        if decoded.len() != algorithm.digest_len() {
            return Err(Error::InvalidChecksum {
                value: digest.to_string(),
                message: format!(
                    "{} digests must be {} bytes, got {}",
                    algorithm,
                    algorithm.digest_len(),
                    decoded.len()
                ),
            });
        }
        Ok(Self {
            algorithm,
            digest: digest.to_ascii_lowercase(),
        })
    }

    /// Parse an `<algorithm>:<hex>` pair, the format pip pins in
    /// requirements files.
    pub fn parse(value: &str) -> Result<Self> {
        let (algorithm, digest) = value.split_once(':').ok_or_else(|| Error::InvalidChecksum {
            value: value.to_string(),
            message: "expected '<algorithm>:<hex digest>'".to_string(),
        })?;
        Self::from_hex(algorithm.parse()?, digest)
    }

    /// Parse a Subresource Integrity string.
    ///
    /// SRI values may carry several whitespace-separated hashes; the
    /// strongest supported one wins. A value with no supported hash is an
    /// error, never silently unverified.
    pub fn parse_sri(value: &str) -> Result<Self> {
        let mut strongest: Option<Self> = None;
        for entry in value.split_whitespace() {
            let Some((algorithm, encoded)) = entry.split_once('-') else {
                continue;
            };
            let Ok(algorithm) = algorithm.parse::<Algorithm>() else {
                continue;
            };
            let decoded = BASE64.decode(encoded).map_err(|e| Error::InvalidChecksum {
                value: entry.to_string(),
                message: format!("invalid base64 digest: {e}"),
            })?;
            if decoded.len() != algorithm.digest_len() {
                return Err(Error::InvalidChecksum {
                    value: entry.to_string(),
                    message: format!(
                        "{} digests must be {} bytes, got {}",
                        algorithm,
                        algorithm.digest_len(),
                        decoded.len()
                    ),
                });
            }
            let parsed = Self {
                algorithm,
                digest: hex::encode(decoded),
            };
            match &strongest {
                Some(current) if current.algorithm >= parsed.algorithm => {}
                _ => strongest = Some(parsed),
            }
        }
        strongest.ok_or_else(|| Error::InvalidChecksum {
            value: value.to_string(),
            message: "no supported digest algorithm in integrity value".to_string(),
        })
    }

    /// The digest algorithm.
    #[must_use]
    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    /// The lowercase hex digest.
    #[must_use]
    pub fn digest(&self) -> &str {
        &self.digest
    }

    /// Verify that the file at `path` matches this checksum.
    ///
    /// On mismatch returns [`Error::Integrity`] naming `package`, the
    /// error build logs are grepped for.
    pub fn verify_file(&self, path: &Path, package: &str) -> Result<()> {
        let actual = self.algorithm.hash_file(path)?;
        if actual == self.digest {
            Ok(())
        } else {
            Err(Error::integrity(
                package,
                self.to_string(),
                format!("{}:{}", self.algorithm, actual),
            ))
        }
    }
}

impl std::fmt::Display for Checksum {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.algorithm, self.digest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn sri_for(algorithm: Algorithm, content: &[u8]) -> String {
        let raw = match algorithm {
            Algorithm::Sha256 => Sha256::digest(content).to_vec(),
            Algorithm::Sha512 => Sha512::digest(content).to_vec(),
        };
        format!("{}-{}", algorithm, BASE64.encode(raw))
    }

    #[test]
    fn test_parse_sri_sha512() {
        let sri = sri_for(Algorithm::Sha512, b"hello world");
        let checksum = Checksum::parse_sri(&sri).unwrap();

        assert_eq!(checksum.algorithm(), Algorithm::Sha512);
        assert_eq!(
            checksum.digest(),
            format!("{:x}", Sha512::digest(b"hello world"))
        );
    }

    #[test]
    fn test_parse_sri_prefers_strongest() {
        let sri = format!(
            "{} {}",
            sri_for(Algorithm::Sha256, b"data"),
            sri_for(Algorithm::Sha512, b"data")
        );
        let checksum = Checksum::parse_sri(&sri).unwrap();
        assert_eq!(checksum.algorithm(), Algorithm::Sha512);
    }

    #[test]
    fn test_parse_sri_skips_unsupported_entries() {
        let sri = format!("sha1-2jmj7l5rSw0yVb/vlWAYkK/YBwk= {}", sri_for(Algorithm::Sha256, b"x"));
        let checksum = Checksum::parse_sri(&sri).unwrap();
        assert_eq!(checksum.algorithm(), Algorithm::Sha256);
    }

    #[test]
    fn test_parse_sri_rejects_weak_only() {
        let result = Checksum::parse_sri("sha1-2jmj7l5rSw0yVb/vlWAYkK/YBwk=");
        assert!(matches!(result, Err(Error::InvalidChecksum { .. })));
    }

    #[test]
    fn test_parse_sri_rejects_bad_base64() {
        let result = Checksum::parse_sri("sha256-!!!not-base64!!!");
        assert!(matches!(result, Err(Error::InvalidChecksum { .. })));
    }

    #[test]
    fn test_parse_sri_rejects_wrong_digest_length() {
        // Valid base64, but only four bytes of digest.
        let result = Checksum::parse_sri("sha256-AAAABQ==");
        assert!(matches!(result, Err(Error::InvalidChecksum { .. })));
    }

    #[test]
    fn test_parse_hex_pair() {
        let digest = format!("{:x}", Sha256::digest(b"requirements"));
        let checksum = Checksum::parse(&format!("sha256:{digest}")).unwrap();

        assert_eq!(checksum.algorithm(), Algorithm::Sha256);
        assert_eq!(checksum.digest(), digest);
    }

    #[test]
    fn test_parse_rejects_unknown_algorithm() {
        let result = Checksum::parse("md5:d41d8cd98f00b204e9800998ecf8427e");
        assert!(matches!(result, Err(Error::InvalidChecksum { .. })));
    }

    #[test]
    fn test_parse_rejects_missing_separator() {
        let result = Checksum::parse("sha256");
        assert!(matches!(result, Err(Error::InvalidChecksum { .. })));
    }

    #[test]
    fn test_from_hex_normalizes_case() {
        let digest = format!("{:X}", Sha256::digest(b"abc"));
        let checksum = Checksum::from_hex(Algorithm::Sha256, &digest).unwrap();
        assert_eq!(checksum.digest(), digest.to_ascii_lowercase());
    }

    #[test]
    fn test_verify_file_matches() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"artifact bytes").unwrap();

        let digest = format!("{:x}", Sha256::digest(b"artifact bytes"));
        let checksum = Checksum::from_hex(Algorithm::Sha256, &digest).unwrap();

        assert!(checksum.verify_file(file.path(), "my-package").is_ok());
    }

    #[test]
    fn test_verify_file_mismatch_names_package() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"tampered bytes").unwrap();

        let digest = format!("{:x}", Sha256::digest(b"original bytes"));
        let checksum = Checksum::from_hex(Algorithm::Sha256, &digest).unwrap();

        let err = checksum.verify_file(file.path(), "chai").unwrap_err();
        assert!(err.to_string().contains("Integrity check failed for \"chai\""));
    }

    #[test]
    fn test_hash_file_streams_large_content() {
        let mut file = NamedTempFile::new().unwrap();
        let content = vec![0xabu8; 64 * 1024];
        file.write_all(&content).unwrap();

        let expected = format!("{:x}", Sha512::digest(&content));
        let actual = Algorithm::Sha512.hash_file(file.path()).unwrap();
        assert_eq!(actual, expected);
    }

    #[test]
    fn test_display_round_trips_through_parse() {
        let digest = format!("{:x}", Sha256::digest(b"display"));
        let checksum = Checksum::from_hex(Algorithm::Sha256, &digest).unwrap();
        let reparsed = Checksum::parse(&checksum.to_string()).unwrap();
        assert_eq!(checksum, reparsed);
    }
}
