//! Named-algorithm content digests.
//!
//! A [`Digest`] pairs an algorithm with its raw bytes and round-trips
//! through the textual form `<ALGORITHM>:<hex>`. Descriptors carry these
//! strings to pin the content of downloaded binaries; the resolver
//! verifies them against the materialized file.

use std::fmt;
use std::io::Read;
use std::path::Path;

use md5::Md5;
use sha1::Sha1;
use sha2::{Sha224, Sha256, Sha384, Sha512};

use protok_util::errors::{ProtokError, ProtokResult};

/// Supported digest algorithms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DigestAlgorithm {
    Md5,
    Sha1,
    Sha224,
    Sha256,
    Sha384,
    Sha512,
}

impl DigestAlgorithm {
    /// Parse an algorithm name, accepting `sha1`, `SHA-1`, `Sha_1`, etc.
    pub fn parse(name: &str) -> Option<Self> {
        let normalized: String = name
            .chars()
            .filter(|c| !matches!(c, '-' | '_'))
            .collect::<String>()
            .to_ascii_lowercase();
        match normalized.as_str() {
            "md5" => Some(Self::Md5),
            "sha1" => Some(Self::Sha1),
            "sha224" => Some(Self::Sha224),
            "sha256" => Some(Self::Sha256),
            "sha384" => Some(Self::Sha384),
            "sha512" => Some(Self::Sha512),
            _ => None,
        }
    }

    /// The canonical spelling used in the textual form.
    pub fn canonical_name(&self) -> &'static str {
        match self {
            Self::Md5 => "MD5",
            Self::Sha1 => "SHA-1",
            Self::Sha224 => "SHA-224",
            Self::Sha256 => "SHA-256",
            Self::Sha384 => "SHA-384",
            Self::Sha512 => "SHA-512",
        }
    }

    /// Digest length in bytes.
    pub fn digest_len(&self) -> usize {
        match self {
            Self::Md5 => 16,
            Self::Sha1 => 20,
            Self::Sha224 => 28,
            Self::Sha256 => 32,
            Self::Sha384 => 48,
            Self::Sha512 => 64,
        }
    }
}

impl fmt::Display for DigestAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.canonical_name())
    }
}

/// A computed or declared digest: algorithm plus raw bytes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Digest {
    algorithm: DigestAlgorithm,
    bytes: Vec<u8>,
}

impl Digest {
    /// The algorithm this digest was computed with.
    pub fn algorithm(&self) -> DigestAlgorithm {
        self.algorithm
    }

    /// The raw digest bytes.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Compute the digest of an in-memory byte slice.
    pub fn compute_bytes(algorithm: DigestAlgorithm, data: &[u8]) -> Self {
        let mut cursor = data;
        // Reading from a slice cannot fail.
        Self::compute_reader(algorithm, &mut cursor).expect("in-memory read")
    }

    /// Compute the digest of a UTF-8 string.
    pub fn compute_str(algorithm: DigestAlgorithm, data: &str) -> Self {
        Self::compute_bytes(algorithm, data.as_bytes())
    }

    /// Compute the digest of a stream without loading it into memory.
    pub fn compute_reader(
        algorithm: DigestAlgorithm,
        reader: &mut dyn Read,
    ) -> std::io::Result<Self> {
        let bytes = match algorithm {
            DigestAlgorithm::Md5 => stream_hash::<Md5>(reader)?,
            DigestAlgorithm::Sha1 => stream_hash::<Sha1>(reader)?,
            DigestAlgorithm::Sha224 => stream_hash::<Sha224>(reader)?,
            DigestAlgorithm::Sha256 => stream_hash::<Sha256>(reader)?,
            DigestAlgorithm::Sha384 => stream_hash::<Sha384>(reader)?,
            DigestAlgorithm::Sha512 => stream_hash::<Sha512>(reader)?,
        };
        Ok(Self { algorithm, bytes })
    }

    /// Compute the digest of a file's contents.
    pub fn compute_file(algorithm: DigestAlgorithm, path: &Path) -> miette::Result<Self> {
        let mut file = std::fs::File::open(path).map_err(ProtokError::Io)?;
        let mut reader = std::io::BufReader::with_capacity(64 * 1024, &mut file);
        Self::compute_reader(algorithm, &mut reader)
            .map_err(|e| ProtokError::Io(e).into())
    }

    /// Verify a stream against this digest. A mismatch is an `Integrity`
    /// error carrying both the expected and the actual value.
    pub fn verify_reader(&self, reader: &mut dyn Read) -> ProtokResult<()> {
        let actual = Self::compute_reader(self.algorithm, reader).map_err(ProtokError::Io)?;
        if actual == *self {
            tracing::debug!("{} digest ok", self.algorithm);
            Ok(())
        } else {
            Err(ProtokError::Integrity {
                message: format!("expected {self}, got {actual}"),
            }
            .into())
        }
    }

    /// Verify a file on disk against this digest.
    pub fn verify_file(&self, path: &Path) -> ProtokResult<()> {
        let file = std::fs::File::open(path).map_err(ProtokError::Io)?;
        let mut reader = std::io::BufReader::with_capacity(64 * 1024, file);
        self.verify_reader(&mut reader).map_err(|e| {
            tracing::error!("integrity failure for {}", path.display());
            e
        })
    }

    /// Lowercase hex encoding of the digest bytes.
    pub fn to_hex(&self) -> String {
        hex::encode(&self.bytes)
    }

    /// Parse `<algorithm>:<hex>`. Whitespace anywhere in the input is
    /// ignored; the hex part must have even length, valid digits, and the
    /// exact length the algorithm produces.
    pub fn parse(input: &str) -> ProtokResult<Self> {
        let compact: String = input.chars().filter(|c| !c.is_whitespace()).collect();
        let (alg_part, hex_part) = compact.split_once(':').ok_or_else(|| {
            ProtokError::Configuration {
                message: format!("digest `{input}` is not of the form <algorithm>:<hex>"),
            }
        })?;
        let algorithm =
            DigestAlgorithm::parse(alg_part).ok_or_else(|| ProtokError::Configuration {
                message: format!("unknown digest algorithm `{alg_part}`"),
            })?;
        let bytes = hex::decode(hex_part).map_err(|e| ProtokError::Configuration {
            message: format!("invalid hex in digest `{input}`: {e}"),
        })?;
        if bytes.len() != algorithm.digest_len() {
            return Err(ProtokError::Configuration {
                message: format!(
                    "{algorithm} digest must be {} bytes, got {}",
                    algorithm.digest_len(),
                    bytes.len()
                ),
            }
            .into());
        }
        Ok(Self { algorithm, bytes })
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.algorithm, self.to_hex())
    }
}

impl std::str::FromStr for Digest {
    type Err = miette::Report;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

fn stream_hash<D: sha2::Digest>(reader: &mut dyn Read) -> std::io::Result<Vec<u8>> {
    let mut hasher = D::new();
    let mut buf = [0u8; 64 * 1024];
    loop {
        let n = reader.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hasher.finalize().to_vec())
}
