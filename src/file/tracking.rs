// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Commit log model.
//!
//! Each tracked file owns exactly one __commit log__ called its tracking
//! data. The tracking data records where the working copy lives, which commit
//! is currently materialized into that working copy, and every commit ever
//! recorded for the file in creation order.
//!
//! # Arena Layout
//!
//! Commits are immutable and uniquely identified by their content hash. So
//! the log is kept as a flat arena of commits in insertion order, alongside
//! an index that maps each hash to its slot in the arena. No commit ever
//! points at another commit, which means there is no parent chain to walk or
//! keep consistent. Ordering is simply the position in the arena.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Default message of the very first commit of a tracked file.
pub const INITIAL_COMMIT_MESSAGE: &str = "Initial commit";

/// Immutable record of one saved state of a tracked file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Commit {
    /// Content hash of the raw file content at this commit.
    pub hash: String,

    /// Free text description of the commit.
    pub message: String,

    /// Seconds since Unix epoch at time of creation.
    pub timestamp: i64,
}

impl Commit {
    /// Construct new commit.
    pub fn new(hash: impl Into<String>, message: impl Into<String>, timestamp: i64) -> Self {
        Self {
            hash: hash.into(),
            message: message.into(),
            timestamp,
        }
    }
}

/// Commit log of one tracked file.
///
/// # Invariant
///
/// - No two commits share a hash.
/// - Revision is either empty, or names a commit in the log.
#[derive(Debug, Default, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(try_from = "TrackingRecord", into = "TrackingRecord")]
pub struct TrackingData {
    path: String,
    revision: String,
    commits: Vec<Commit>,
    index: HashMap<String, usize>,
}

impl TrackingData {
    /// Construct new empty commit log for working copy at path.
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Default::default()
        }
    }

    /// Path to working copy as recorded, i.e., home directory unexpanded.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Change recorded path to working copy.
    pub fn set_path(&mut self, path: impl Into<String>) {
        self.path = path.into();
    }

    /// Hash of the commit currently materialized in the working copy.
    ///
    /// Empty if no commit has been recorded yet.
    pub fn revision(&self) -> &str {
        &self.revision
    }

    /// Point revision at an existing commit.
    ///
    /// # Errors
    ///
    /// - Return [`TrackingError::UnknownRevision`] if no commit has given hash.
    pub fn set_revision(&mut self, hash: impl AsRef<str>) -> Result<()> {
        let hash = hash.as_ref();
        if !self.contains(hash) {
            return Err(TrackingError::UnknownRevision { hash: hash.into() });
        }

        self.revision = hash.into();
        Ok(())
    }

    /// Append commit to end of log.
    ///
    /// Does not move the revision pointer.
    ///
    /// # Errors
    ///
    /// - Return [`TrackingError::DuplicateCommit`] if a commit with the same
    ///   hash is already recorded.
    pub fn push(&mut self, commit: Commit) -> Result<()> {
        if self.contains(&commit.hash) {
            return Err(TrackingError::DuplicateCommit { hash: commit.hash });
        }

        self.index.insert(commit.hash.clone(), self.commits.len());
        self.commits.push(commit);
        Ok(())
    }

    /// Check if log has a commit with given hash.
    pub fn contains(&self, hash: impl AsRef<str>) -> bool {
        self.index.contains_key(hash.as_ref())
    }

    /// Lookup commit by hash.
    pub fn get(&self, hash: impl AsRef<str>) -> Option<&Commit> {
        self.index
            .get(hash.as_ref())
            .map(|slot| &self.commits[*slot])
    }

    /// All commits in log order.
    pub fn commits(&self) -> &[Commit] {
        &self.commits
    }

    /// Iterate over commit hashes in log order.
    pub fn hashes(&self) -> impl Iterator<Item = &str> {
        self.commits.iter().map(|commit| commit.hash.as_str())
    }

    /// Most recently appended commit.
    pub fn last(&self) -> Option<&Commit> {
        self.commits.last()
    }

    pub fn len(&self) -> usize {
        self.commits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commits.is_empty()
    }
}

/// Persisted layout of [`TrackingData`].
#[derive(Debug, Clone, Deserialize, Serialize)]
struct TrackingRecord {
    path: String,
    #[serde(default)]
    revision: String,
    #[serde(default)]
    commits: Vec<Commit>,
}

impl TryFrom<TrackingRecord> for TrackingData {
    type Error = TrackingError;

    fn try_from(record: TrackingRecord) -> Result<Self, Self::Error> {
        let mut data = TrackingData::new(record.path);
        for commit in record.commits {
            data.push(commit)?;
        }

        // INVARIANT: Persisted revision must point into the log unless the log is fresh.
        if !record.revision.is_empty() {
            data.set_revision(record.revision)?;
        }

        Ok(data)
    }
}

impl From<TrackingData> for TrackingRecord {
    fn from(data: TrackingData) -> Self {
        Self {
            path: data.path,
            revision: data.revision,
            commits: data.commits,
        }
    }
}

/// Commit log error types.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TrackingError {
    /// Commit with same hash is already recorded.
    #[error("commit {hash:?} already exists")]
    DuplicateCommit { hash: String },

    /// Revision does not name any recorded commit.
    #[error("revision {hash:?} is not recorded in commit log")]
    UnknownRevision { hash: String },
}

/// Friendly result alias :3
type Result<T, E = TrackingError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;
    use pretty_assertions::assert_eq;

    #[test]
    fn push_rejects_duplicate_hash() -> anyhow::Result<()> {
        let mut data = TrackingData::new("~/.bashrc");
        data.push(Commit::new("aaa", "first", 1))?;

        let result = data.push(Commit::new("aaa", "again", 2));
        assert_eq!(
            result,
            Err(TrackingError::DuplicateCommit { hash: "aaa".into() })
        );
        assert_eq!(data.len(), 1);
        assert_eq!(data.get("aaa").map(|c| c.message.as_str()), Some("first"));

        Ok(())
    }

    #[test]
    fn set_revision_requires_known_commit() -> anyhow::Result<()> {
        let mut data = TrackingData::new("~/.bashrc");
        assert!(data.set_revision("nope").is_err());

        data.push(Commit::new("aaa", "first", 1))?;
        data.set_revision("aaa")?;
        assert_eq!(data.revision(), "aaa");

        Ok(())
    }

    #[test]
    fn deserialize_tracking_data() -> anyhow::Result<()> {
        let json = indoc! {r#"
            {
              "path": "~/.vimrc",
              "revision": "bbb",
              "commits": [
                { "hash": "aaa", "message": "Initial commit", "timestamp": 1558896245 },
                { "hash": "bbb", "message": "add bindings", "timestamp": 1558896290 }
              ]
            }
        "#};

        let data: TrackingData = serde_json::from_str(json)?;
        assert_eq!(data.path(), "~/.vimrc");
        assert_eq!(data.revision(), "bbb");
        assert_eq!(data.hashes().collect::<Vec<_>>(), vec!["aaa", "bbb"]);
        assert_eq!(data.get("bbb").map(|c| c.timestamp), Some(1558896290));

        Ok(())
    }

    #[test]
    fn serialize_tracking_data() -> anyhow::Result<()> {
        let mut data = TrackingData::new("~/.vimrc");
        data.push(Commit::new("aaa", INITIAL_COMMIT_MESSAGE, 7))?;
        data.set_revision("aaa")?;

        let result = serde_json::to_string_pretty(&data)?;
        let expect = indoc! {r#"
            {
              "path": "~/.vimrc",
              "revision": "aaa",
              "commits": [
                {
                  "hash": "aaa",
                  "message": "Initial commit",
                  "timestamp": 7
                }
              ]
            }"#};
        assert_eq!(result, expect);

        Ok(())
    }

    #[test]
    fn corrupt_records_fail_to_load() {
        let duplicated = r#"{
            "path": "~/.vimrc",
            "revision": "aaa",
            "commits": [
                { "hash": "aaa", "message": "one", "timestamp": 1 },
                { "hash": "aaa", "message": "two", "timestamp": 2 }
            ]
        }"#;
        assert!(serde_json::from_str::<TrackingData>(duplicated).is_err());

        let dangling = r#"{ "path": "~/.vimrc", "revision": "zzz", "commits": [] }"#;
        assert!(serde_json::from_str::<TrackingData>(dangling).is_err());
    }
}
