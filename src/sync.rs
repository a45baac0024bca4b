// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Replica synchronization.
//!
//! Synchronizing a tracked file means reconciling the commit log of the
//! local replica with the commit log of the remote replica through
//! [`merge`], and then moving only the revisions the other side is missing.
//!
//! - [`push`] sends local commits the remote lacks. The local replica is
//!   never modified.
//! - [`pull`] fetches remote commits the local replica lacks, and checks out
//!   the newest merged revision into the working copy.
//!
//! Nothing local is persisted until every remote call succeeded. So a failed
//! synchronization can simply be retried.

use crate::{
    codec,
    file::{self, merge::merge, tracking::TrackingData},
    remote::{Revision, Transport},
    store::LocalStore,
    storer::Storer,
};

use std::path::PathBuf;
use tracing::{info, instrument, warn};

/// Push local commits of tracked file to remote replica.
///
/// Returns the number of revisions the remote was missing.
///
/// # Errors
///
/// - Return [`SyncError::Untracked`] if the local replica has no commits.
/// - Return [`SyncError::Merge`] if either history is corrupt.
/// - Return [`SyncError::Storage`] if a local revision cannot be read.
/// - Return [`SyncError::Transport`] if the remote cannot be reached.
#[instrument(skip(local, transport), fields(alias = %local.alias()), level = "debug")]
pub fn push(local: &LocalStore, transport: &impl Transport) -> Result<usize> {
    let local_data = local.tracking_data();
    if local_data.is_empty() {
        return Err(SyncError::Untracked {
            alias: local.alias().into(),
        });
    }

    let remote_data = transport
        .fetch_tracking_data(local.alias())?
        .unwrap_or_default();
    let (merged, missing) = merge(&remote_data, local_data)?;

    if missing.is_empty() && merged == remote_data {
        info!("remote {:?} is already up to date", local.alias());
        return Ok(0);
    }

    let mut revisions = Vec::with_capacity(missing.len());
    for hash in &missing {
        revisions.push(Revision::new(hash.clone(), local.get_revision(hash)?));
    }

    info!("pushing {} revisions of {:?}", revisions.len(), merged.path());
    transport.upload(local.alias(), &merged, &revisions)?;

    Ok(revisions.len())
}

/// Pull remote commits of tracked file into local replica.
///
/// Returns the number of revisions the local replica was missing. Closes
/// storage unless the local replica was already up to date.
///
/// # Errors
///
/// - Return [`SyncError::RemoteNotFound`] if the remote does not track alias.
/// - Return [`SyncError::PathConflict`] if a file other than the local
///   working copy already exists at the merged path.
/// - Return [`SyncError::CorruptRevision`] if a fetched revision does not
///   match its hash.
/// - Return [`SyncError::Merge`] if either history is corrupt.
/// - Return [`SyncError::File`] if the merged path is malformed, or the
///   merged revision cannot be checked out.
/// - Return [`SyncError::Transport`] if the remote cannot be reached.
#[instrument(skip(local, transport), fields(alias = %local.alias()), level = "debug")]
pub fn pull(local: &mut LocalStore, transport: &impl Transport) -> Result<usize> {
    let remote_data = transport
        .fetch_tracking_data(local.alias())?
        .filter(|data| !data.is_empty())
        .ok_or_else(|| SyncError::RemoteNotFound {
            alias: local.alias().into(),
        })?;
    let (merged, missing) = merge(local.tracking_data(), &remote_data)?;

    file::check_path(merged.path())?;

    // INVARIANT: Never overwrite a file the local replica does not know about.
    let path = local.resolve(merged.path());
    let is_working_copy = local.has_file() && local.working_copy().as_ref() == Some(&path);
    if !is_working_copy && path.exists() {
        return Err(SyncError::PathConflict { path });
    }

    if local.has_file() && missing.is_empty() && merged == *local.tracking_data() {
        info!("{:?} is already up to date", local.alias());
        return Ok(0);
    }

    info!("pulling {} new revisions for {:?}", missing.len(), merged.path());
    let revisions = transport.fetch_revisions(local.alias(), &missing)?;
    for hash in &missing {
        let revision = revisions
            .iter()
            .find(|revision| &revision.hash == hash)
            .ok_or_else(|| SyncError::CorruptRevision { hash: hash.clone() })?;
        verify_revision(revision)?;
        local.write_revision(&revision.hash, &revision.bytes)?;
    }

    let revision = merged.revision().to_string();
    warn_on_moved_path(local.tracking_data(), &merged);
    local.replace_tracking_data(merged);
    file::checkout(local, &revision)?;

    Ok(missing.len())
}

/// Check that fetched revision decompresses to content matching its hash.
fn verify_revision(revision: &Revision) -> Result<()> {
    let raw = codec::decompress(&revision.bytes)?;
    if codec::hash(raw) != revision.hash {
        return Err(SyncError::CorruptRevision {
            hash: revision.hash.clone(),
        });
    }

    Ok(())
}

fn warn_on_moved_path(old: &TrackingData, new: &TrackingData) {
    if !old.path().is_empty() && old.path() != new.path() {
        warn!("working copy moves from {:?} to {:?}", old.path(), new.path());
    }
}

/// Synchronization error types.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// Pull would overwrite a file that is not tracked locally.
    #[error(
        "{:?} already exists and is not tracked, remove it or track it before pulling",
        path.display()
    )]
    PathConflict { path: PathBuf },

    /// Remote replica does not track alias.
    #[error("remote does not track {alias:?}")]
    RemoteNotFound { alias: String },

    /// Local replica does not track alias.
    #[error("{alias:?} is not tracked, initialize it before pushing")]
    Untracked { alias: String },

    /// Fetched revision is missing or does not match its hash.
    #[error("revision {hash:?} from remote is missing or corrupt")]
    CorruptRevision { hash: String },

    /// Commit histories cannot be merged.
    #[error(transparent)]
    Merge(#[from] crate::file::merge::MergeError),

    /// Versioning operation failed.
    #[error(transparent)]
    File(#[from] crate::file::FileError),

    /// Local storage failed.
    #[error(transparent)]
    Storage(#[from] crate::storer::StorageError),

    /// Remote replica cannot be reached.
    #[error(transparent)]
    Transport(#[from] crate::remote::TransportError),

    /// Fetched revision cannot be decompressed.
    #[error(transparent)]
    Codec(#[from] crate::codec::CodecError),
}

/// Friendly result alias :3
pub type Result<T, E = SyncError> = std::result::Result<T, E>;
