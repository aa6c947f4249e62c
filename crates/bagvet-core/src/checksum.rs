//! # Checksum Engine
//!
//! The manifest hash algorithms and streaming file digestion. BagIt
//! manifests name their algorithm in the manifest filename; the engine
//! supports the four algorithms in common preservation use and reports
//! anything else as an explicit unsupported-algorithm condition rather
//! than silently skipping it.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use std::str::FromStr;

use md5::Md5;
use serde::{Deserialize, Serialize};
use sha1::Sha1;
use sha2::{Digest, Sha256, Sha512};

use crate::error::BagvetError;

/// Read buffer size for streaming digestion.
const CHUNK_SIZE: usize = 64 * 1024;

/// A manifest checksum algorithm.
///
/// `Sha256` and `Sha512` are the strong algorithms; `Md5` and `Sha1`
/// are carried because legacy manifests still declare them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChecksumAlgorithm {
    /// MD5, legacy manifests only.
    Md5,
    /// SHA-1, legacy manifests only.
    Sha1,
    /// SHA-256.
    Sha256,
    /// SHA-512.
    Sha512,
}

impl ChecksumAlgorithm {
    /// All supported algorithms, in manifest-preference order.
    pub const ALL: [ChecksumAlgorithm; 4] = [Self::Md5, Self::Sha1, Self::Sha256, Self::Sha512];

    /// Returns the algorithm identifier as it appears in manifest filenames.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Md5 => "md5",
            Self::Sha1 => "sha1",
            Self::Sha256 => "sha256",
            Self::Sha512 => "sha512",
        }
    }

    /// Digest a byte slice to a lowercase hex string.
    pub fn hash_bytes(&self, data: &[u8]) -> String {
        match self {
            Self::Md5 => hex::encode(Md5::digest(data)),
            Self::Sha1 => hex::encode(Sha1::digest(data)),
            Self::Sha256 => hex::encode(Sha256::digest(data)),
            Self::Sha512 => hex::encode(Sha512::digest(data)),
        }
    }

    /// Digest a file to a lowercase hex string, streaming in chunks.
    ///
    /// # Errors
    ///
    /// Returns `BagvetError::Io` if the file cannot be opened or read.
    pub fn hash_file(&self, path: &Path) -> Result<String, BagvetError> {
        let file = File::open(path).map_err(|e| BagvetError::io(path, e))?;
        let mut reader = BufReader::new(file);

        match self {
            Self::Md5 => stream_digest::<Md5, _>(&mut reader, path),
            Self::Sha1 => stream_digest::<Sha1, _>(&mut reader, path),
            Self::Sha256 => stream_digest::<Sha256, _>(&mut reader, path),
            Self::Sha512 => stream_digest::<Sha512, _>(&mut reader, path),
        }
    }
}

impl FromStr for ChecksumAlgorithm {
    type Err = BagvetError;

    /// Parse a manifest algorithm name. Case-insensitive; the common
    /// dashed spellings (`sha-256`) are accepted.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('-', "").as_str() {
            "md5" => Ok(Self::Md5),
            "sha1" => Ok(Self::Sha1),
            "sha256" => Ok(Self::Sha256),
            "sha512" => Ok(Self::Sha512),
            other => Err(BagvetError::configuration(format!(
                "unsupported checksum algorithm '{other}' (supported: md5, sha1, sha256, sha512)"
            ))),
        }
    }
}

impl std::fmt::Display for ChecksumAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

fn stream_digest<D: Digest, R: Read>(
    reader: &mut R,
    path: &Path,
) -> Result<String, BagvetError> {
    let mut hasher = D::new();
    let mut buf = [0u8; CHUNK_SIZE];
    loop {
        let read = reader
            .read(&mut buf)
            .map_err(|e| BagvetError::io(path, e))?;
        if read == 0 {
            break;
        }
        hasher.update(&buf[..read]);
    }
    Ok(hex::encode(hasher.finalize()))
}
