//! Pluggable hash functions
//!
//! Digests are carried as lowercase hex strings. Internal tree nodes hash the
//! concatenation of their children's hex strings, so a digest's text form is
//! also its preimage form.

use serde::{Deserialize, Serialize};
use sha2::Digest as _;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Lowercase hex digest produced by a [`HashFn`]
///
/// Deserializing goes through [`Digest::parse`], so a digest read off the wire
/// or from storage is always normalized hex.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Digest(String);

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DigestParseError {
    #[error("digest is empty")]
    Empty,
    #[error("digest is not hex: {0}")]
    NotHex(String),
}

impl Digest {
    /// Wrap raw digest bytes as lowercase hex
    pub fn from_bytes(bytes: impl AsRef<[u8]>) -> Self {
        Digest(hex::encode(bytes))
    }

    /// Parse a hex digest, normalizing surrounding whitespace and case
    pub fn parse(s: &str) -> Result<Self, DigestParseError> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(DigestParseError::Empty);
        }
        if !trimmed.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(DigestParseError::NotHex(trimmed.to_string()));
        }
        Ok(Digest(trimmed.to_ascii_lowercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }

    /// Short prefix for log lines
    pub fn short(&self) -> &str {
        self.0.get(..16).unwrap_or(&self.0)
    }
}

impl TryFrom<String> for Digest {
    type Error = DigestParseError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Digest::parse(&s)
    }
}

impl From<Digest> for String {
    fn from(digest: Digest) -> Self {
        digest.0
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Digest {
    type Err = DigestParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Digest::parse(s)
    }
}

/// Hash function injected into tree building, proof generation and verification.
///
/// Any `Fn(&[u8]) -> Digest` closure is a `HashFn`.
pub trait HashFn: Send + Sync {
    fn hash(&self, data: &[u8]) -> Digest;

    /// Hash of `left ++ right`
    fn combine(&self, left: &Digest, right: &Digest) -> Digest {
        let mut buf = Vec::with_capacity(left.as_bytes().len() + right.as_bytes().len());
        buf.extend_from_slice(left.as_bytes());
        buf.extend_from_slice(right.as_bytes());
        self.hash(&buf)
    }
}

impl<F> HashFn for F
where
    F: Fn(&[u8]) -> Digest + Send + Sync,
{
    fn hash(&self, data: &[u8]) -> Digest {
        self(data)
    }
}

/// Built-in hash algorithms selectable from configuration
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum HashAlgorithm {
    #[default]
    #[serde(rename = "sha256")]
    Sha256,
    #[serde(rename = "sha512_256")]
    Sha512_256,
}

impl HashAlgorithm {
    pub fn as_str(&self) -> &'static str {
        match self {
            HashAlgorithm::Sha256 => "sha256",
            HashAlgorithm::Sha512_256 => "sha512_256",
        }
    }
}

impl FromStr for HashAlgorithm {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "sha256" | "sha-256" => Ok(HashAlgorithm::Sha256),
            "sha512_256" | "sha512-256" | "sha-512/256" => Ok(HashAlgorithm::Sha512_256),
            _ => Err(format!("unknown hash algorithm: {}", s)),
        }
    }
}

impl HashFn for HashAlgorithm {
    fn hash(&self, data: &[u8]) -> Digest {
        match self {
            HashAlgorithm::Sha256 => Digest::from_bytes(sha2::Sha256::digest(data)),
            HashAlgorithm::Sha512_256 => Digest::from_bytes(sha2::Sha512_256::digest(data)),
        }
    }
}

/// SHA-256 as lowercase hex
pub fn sha256(data: &[u8]) -> Digest {
    HashAlgorithm::Sha256.hash(data)
}
