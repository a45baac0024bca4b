// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Storage capability for tracked files.
//!
//! Versioning operations never touch the file system or the network
//! directly. Instead, they go through a [`Storer`], which owns the tracking
//! data of exactly one tracked file, and knows how to read and write its
//! working copy and revisions. The local file system and a remote replica
//! are the two backends, see [`LocalStore`](crate::store::LocalStore) and
//! [`RemoteStore`](crate::remote::RemoteStore).
//!
//! # Close Contract
//!
//! Mutating methods only stage changes to the tracking data in memory.
//! Nothing is persisted until [`Storer::close`] is called, which every top
//! level operation does exactly once after it succeeded. A failing operation
//! therefore leaves previously persisted state untouched.

use crate::file::tracking::{Commit, TrackingData, TrackingError};

use std::path::PathBuf;

/// Layer of indirection for tracked file storage.
pub trait Storer {
    /// Tracking data currently loaded.
    fn tracking_data(&self) -> &TrackingData;

    /// Check if a commit with hash exists for the tracked file.
    fn has_commit(&self, hash: &str) -> Result<bool>;

    /// Read current content of the working copy.
    fn get_contents(&self) -> Result<Vec<u8>>;

    /// Read compressed revision at hash.
    fn get_revision(&self, hash: &str) -> Result<Vec<u8>>;

    /// Store compressed revision, append commit, and point revision at it.
    fn save_commit(&mut self, compressed: &[u8], commit: Commit) -> Result<()>;

    /// Overwrite working copy with raw content, and point revision at hash.
    fn revert(&mut self, raw: &[u8], hash: &str) -> Result<()>;

    /// Persist tracking data.
    fn close(&mut self) -> Result<()>;
}

/// Storage error types.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Working copy cannot be read.
    #[error("failed to read working copy at {:?}", path.display())]
    ReadContents {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },

    /// Working copy cannot be written.
    #[error("failed to write working copy at {:?}", path.display())]
    WriteContents {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },

    /// Revision cannot be read.
    #[error("failed to read revision {hash:?} at {:?}", path.display())]
    ReadRevision {
        #[source]
        source: std::io::Error,
        hash: String,
        path: PathBuf,
    },

    /// Revision cannot be written.
    #[error("failed to write revision {hash:?} at {:?}", path.display())]
    WriteRevision {
        #[source]
        source: std::io::Error,
        hash: String,
        path: PathBuf,
    },

    /// Tracking data cannot be read or written.
    #[error("failed to access tracking data at {:?}", path.display())]
    TrackingFile {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },

    /// Tracking data is not valid JSON, or violates commit log invariants.
    #[error("malformed tracking data at {:?}", path.display())]
    MalformedTracking {
        #[source]
        source: serde_json::Error,
        path: PathBuf,
    },

    /// Tracking data of an alias does not exist.
    #[error("file {alias:?} is not tracked")]
    Untracked { alias: String },

    /// Revision does not exist in storage.
    #[error("revision {hash:?} does not exist")]
    MissingRevision { hash: String },

    /// Commit log invariant violated.
    #[error(transparent)]
    Tracking(#[from] TrackingError),

    /// Communication with remote replica failed.
    #[error(transparent)]
    Transport(#[from] crate::remote::TransportError),

    /// Stored revision cannot be decoded.
    #[error(transparent)]
    Codec(#[from] crate::codec::CodecError),
}

/// Friendly result alias :3
pub type Result<T, E = StorageError> = std::result::Result<T, E>;
