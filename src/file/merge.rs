// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Commit log reconciliation.
//!
//! Two replicas of the same tracked file can record commits independently of
//! each other. Since there are no branches, reconciling them does not build a
//! commit graph with multiple heads. Instead, both logs are treated as sets
//! of immutable commits uniquely identified by their content hash, and merged
//! into a single log ordered by time.
//!
//! # Ordering
//!
//! The merged log is the union of both logs sorted by timestamp, breaking ties
//! by hash so the outcome never depends on which side happened to be read
//! first. A replica whose clock went backwards therefore gets its commits
//! reordered by the merge.
//!
//! # Direction
//!
//! The merge is symmetric in what ends up in the merged log, but the list of
//! missing hashes is directional: it names what the destination lacks from
//! the source. Push merges the local log into the remote one, and pull merges
//! the remote log into the local one.

use crate::{
    codec,
    file::tracking::{Commit, TrackingData},
};

use std::collections::HashSet;
use tracing::{debug, instrument, warn};

/// Merge source commit log into destination commit log.
///
/// Returns the merged log, and the hashes that are present in the source but
/// absent from the destination in merged order.
///
/// # Merge Rules
///
/// - Commits present in both logs appear once. The copy seen first wins,
///   with the destination seen before the source.
/// - Commits are sorted by timestamp, then by hash.
/// - Path of the source wins, unless the source has no path.
/// - Revision moves to the newest merged commit if the destination gained any
///   commits. Otherwise the destination keeps its revision.
///
/// # Errors
///
/// - Return [`MergeError::CorruptHistory`] if any commit hash is not a well
///   formed content hash.
#[instrument(skip(dest, src), level = "debug")]
pub fn merge(dest: &TrackingData, src: &TrackingData) -> Result<(TrackingData, Vec<String>)> {
    for commit in dest.commits().iter().chain(src.commits()) {
        if !codec::is_valid_hash(&commit.hash) {
            return Err(MergeError::CorruptHistory {
                hash: commit.hash.clone(),
                reason: "not a valid content hash".into(),
            });
        }
    }

    let path = if src.path().is_empty() {
        dest.path()
    } else {
        if !dest.path().is_empty() && dest.path() != src.path() {
            warn!(
                "tracked paths differ, using {:?} over {:?}",
                src.path(),
                dest.path()
            );
        }
        src.path()
    };

    let mut merged = TrackingData::new(path);
    for commit in union_by_time(dest.commits(), src.commits()) {
        merged
            .push(commit.clone())
            .map_err(|err| MergeError::CorruptHistory {
                hash: commit.hash.clone(),
                reason: err.to_string(),
            })?;
    }

    let missing = merged
        .hashes()
        .filter(|hash| !dest.contains(hash) && src.contains(hash))
        .map(ToString::to_string)
        .collect::<Vec<_>>();

    let revision = if merged.len() > dest.len() || dest.revision().is_empty() {
        merged.last().map(|commit| commit.hash.clone())
    } else {
        Some(dest.revision().to_string())
    };

    if let Some(revision) = revision {
        merged
            .set_revision(&revision)
            .map_err(|err| MergeError::CorruptHistory {
                hash: revision.clone(),
                reason: err.to_string(),
            })?;
    }

    debug!(
        "merged {} and {} commits into {}, {} missing from destination",
        dest.len(),
        src.len(),
        merged.len(),
        missing.len()
    );

    Ok((merged, missing))
}

/// Union of both logs sorted by `(timestamp, hash)`, first seen copy wins.
fn union_by_time<'a>(dest: &'a [Commit], src: &'a [Commit]) -> Vec<&'a Commit> {
    let mut seen = HashSet::new();
    let mut union = dest
        .iter()
        .chain(src)
        .filter(|commit| seen.insert(commit.hash.as_str()))
        .collect::<Vec<_>>();
    union.sort_by(|a, b| (a.timestamp, &a.hash).cmp(&(b.timestamp, &b.hash)));

    union
}

/// Merge error types.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MergeError {
    /// Commit history violates content addressing guarantees.
    #[error("corrupt history at commit {hash:?}: {reason}")]
    CorruptHistory { hash: String, reason: String },
}

/// Friendly result alias :3
type Result<T, E = MergeError> = std::result::Result<T, E>;
