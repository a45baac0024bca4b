// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Content compression and hashing.
//!
//! Every revision of a tracked file is stored as a __blob__, i.e., a zlib
//! compressed copy of the raw file content. Blobs are keyed by the SHA-256
//! digest of the _raw_ content, never the compressed bytes. Thus, tuning the
//! compression level or swapping out the compression backend can never change
//! the identity of a revision that was already recorded somewhere else.

use flate2::{read::ZlibDecoder, write::ZlibEncoder, Compression};
use sha2::{Digest, Sha256};
use std::io::{Read, Write};

/// Length of a hex encoded content hash.
pub const HASH_LEN: usize = 64;

/// Compressed file content alongside the hash of its raw form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Compressed {
    /// Zlib compressed bytes.
    pub bytes: Vec<u8>,

    /// Hex encoded SHA-256 digest of the uncompressed bytes.
    pub hash: String,
}

/// Compress raw content and compute its content hash.
///
/// # Errors
///
/// - Return [`CodecError::Compress`] if the zlib encoder fails.
pub fn compress(raw: impl AsRef<[u8]>) -> Result<Compressed> {
    let raw = raw.as_ref();
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::best());
    encoder.write_all(raw).map_err(CodecError::Compress)?;
    let bytes = encoder.finish().map_err(CodecError::Compress)?;

    Ok(Compressed {
        bytes,
        hash: hash(raw),
    })
}

/// Decompress a blob back into raw content.
///
/// # Errors
///
/// - Return [`CodecError::Decompress`] if input is not a valid zlib stream.
pub fn decompress(compressed: impl AsRef<[u8]>) -> Result<Vec<u8>> {
    // INVARIANT: A valid zlib stream always carries a header, even for empty content.
    if compressed.as_ref().is_empty() {
        return Err(CodecError::Decompress(std::io::Error::new(
            std::io::ErrorKind::UnexpectedEof,
            "empty zlib stream",
        )));
    }

    let mut decoder = ZlibDecoder::new(compressed.as_ref());
    let mut raw = Vec::new();
    decoder
        .read_to_end(&mut raw)
        .map_err(CodecError::Decompress)?;

    Ok(raw)
}

/// Hex encoded SHA-256 digest of raw content.
pub fn hash(raw: impl AsRef<[u8]>) -> String {
    let mut hasher = Sha256::new();
    hasher.update(raw.as_ref());
    hex::encode(hasher.finalize())
}

/// Check that a string has the shape of a content hash.
pub fn is_valid_hash(hash: &str) -> bool {
    hash.len() == HASH_LEN
        && hash
            .bytes()
            .all(|byte| byte.is_ascii_digit() || (b'a'..=b'f').contains(&byte))
}

/// Content codec error types.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// Zlib encoder failed.
    #[error("failed to compress content")]
    Compress(#[source] std::io::Error),

    /// Input is not valid zlib compressed data.
    #[error("failed to decompress content, data is corrupt or not compressed")]
    Decompress(#[source] std::io::Error),
}

/// Friendly result alias :3
type Result<T, E = CodecError> = std::result::Result<T, E>;
