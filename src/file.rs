// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Tracked file versioning.
//!
//! A __tracked file__ is a single file on disk, called the working copy,
//! whose history is recorded as a linear log of commits. Each commit stores
//! the full content of the working copy at the time, compressed and keyed by
//! the hash of that content. There are no branches. The only thing that
//! moves is the revision pointer, which always names the commit whose content
//! is currently materialized into the working copy.
//!
//! # Operations
//!
//! - [`init`] starts tracking a file by recording its first commit.
//! - [`new_commit`] records the current state of the working copy.
//! - [`checkout`] materializes a recorded commit into the working copy.
//! - [`diff`] compares two commits, or a commit against the working copy.
//!
//! Every operation works against a [`Storer`], and calls [`Storer::close`]
//! exactly once when it succeeds so the tracking data gets persisted.
//!
//! # See Also
//!
//! 1. [`merge`] for reconciling two replicas of the same tracked file.

pub mod diff;
pub mod merge;
pub mod tracking;

use crate::{
    codec,
    file::{
        diff::{Diff, Operation},
        tracking::{Commit, INITIAL_COMMIT_MESSAGE},
    },
    storer::Storer,
};

use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, info, instrument};

/// Longest alias that can be tracked.
pub const MAX_ALIAS_LEN: usize = 64;

/// Start tracking a file.
///
/// Validates both path and alias, then records the current content of the
/// working copy as the initial commit. The storer must already point at the
/// working copy through its tracking data. Closes storage.
///
/// # Errors
///
/// - Return [`FileError::InvalidInput`] if path or alias is malformed, if
///   the storer does not point at path, or if the storer already holds
///   commits for the file.
/// - Return [`FileError::Storage`] if working copy cannot be read or the
///   commit cannot be stored.
#[instrument(skip(storer), level = "debug")]
pub fn init(storer: &mut impl Storer, path: &str, alias: &str) -> Result<Commit> {
    check_path(path)?;
    check_alias(alias)?;

    if !storer.tracking_data().is_empty() {
        return Err(FileError::InvalidInput(format!(
            "{alias:?} is already tracked"
        )));
    }

    if storer.tracking_data().path() != path {
        return Err(FileError::InvalidInput(format!(
            "storage of {alias:?} points at {:?}, not {path:?}",
            storer.tracking_data().path()
        )));
    }

    info!("track {path:?} as {alias:?}");
    new_commit(storer, INITIAL_COMMIT_MESSAGE)
}

/// Record the current state of the working copy as a new commit.
///
/// Points the revision at the new commit. Closes storage.
///
/// # Errors
///
/// - Return [`FileError::DuplicateCommit`] if a commit with identical content
///   already exists. Nothing is changed in that case.
/// - Return [`FileError::Codec`] if content cannot be compressed.
/// - Return [`FileError::Clock`] if system time is before the Unix epoch.
/// - Return [`FileError::Storage`] if working copy cannot be read or the
///   commit cannot be stored.
#[instrument(skip(storer), level = "debug")]
pub fn new_commit(storer: &mut impl Storer, message: &str) -> Result<Commit> {
    let contents = storer.get_contents()?;
    let compressed = codec::compress(&contents)?;

    if storer.has_commit(&compressed.hash)? {
        return Err(FileError::DuplicateCommit {
            hash: compressed.hash,
        });
    }

    let commit = Commit::new(compressed.hash, message, timestamp(SystemTime::now())?);
    debug!("save commit {:?}", commit.hash);
    storer.save_commit(&compressed.bytes, commit.clone())?;
    storer.close()?;

    Ok(commit)
}

/// Revert working copy to its state at a recorded commit.
///
/// Closes storage.
///
/// # Errors
///
/// - Return [`FileError::CommitNotFound`] if hash is not recorded.
/// - Return [`FileError::Codec`] if stored revision is corrupt.
/// - Return [`FileError::Storage`] if revision cannot be read, or the working
///   copy cannot be written.
#[instrument(skip(storer), level = "debug")]
pub fn checkout(storer: &mut impl Storer, hash: &str) -> Result<()> {
    if !storer.has_commit(hash)? {
        return Err(FileError::CommitNotFound { hash: hash.into() });
    }

    let raw = uncompress_revision(storer, hash)?;
    storer.revert(&raw, hash)?;
    storer.close()?;
    info!("checked out {hash:?}");

    Ok(())
}

/// Diff revision at first hash against revision at second hash.
///
/// If the second hash is empty, then the current content of the working copy
/// is used instead.
///
/// # Errors
///
/// - Return [`FileError::NoChanges`] if both sides are identical.
/// - Return [`FileError::Codec`] if a stored revision is corrupt.
/// - Return [`FileError::Storage`] if a revision or the working copy cannot
///   be read.
#[instrument(skip(storer), level = "debug")]
pub fn diff(storer: &impl Storer, hash_a: &str, hash_b: &str) -> Result<Vec<Diff>> {
    let text_a = String::from_utf8_lossy(&uncompress_revision(storer, hash_a)?).into_owned();
    let text_b = if hash_b.is_empty() {
        String::from_utf8_lossy(&storer.get_contents()?).into_owned()
    } else {
        String::from_utf8_lossy(&uncompress_revision(storer, hash_b)?).into_owned()
    };

    let diffs = diff::cleanup_semantic(diff::diff_lines(&text_a, &text_b));
    if !diffs
        .iter()
        .any(|diff| diff.operation != Operation::Equal)
    {
        return Err(FileError::NoChanges);
    }

    Ok(diffs)
}

/// Read and decompress revision at hash.
///
/// # Errors
///
/// - Return [`FileError::Codec`] if stored revision is corrupt.
/// - Return [`FileError::Storage`] if revision cannot be read.
pub fn uncompress_revision(storer: &impl Storer, hash: &str) -> Result<Vec<u8>> {
    let compressed = storer.get_revision(hash)?;
    Ok(codec::decompress(compressed)?)
}

/// Validate working copy path.
///
/// Paths must be absolute, or relative to home through `~`, and name a file
/// rather than a directory.
///
/// # Errors
///
/// - Return [`FileError::InvalidInput`] if path is malformed.
pub fn check_path(path: &str) -> Result<()> {
    if path.is_empty() {
        return Err(FileError::InvalidInput("path cannot be empty".into()));
    }

    if !(path.starts_with('/') || path == "~" || path.starts_with("~/")) {
        return Err(FileError::InvalidInput(format!(
            "path {path:?} must be absolute or start with '~/'"
        )));
    }

    if path.ends_with('/') || path == "~" {
        return Err(FileError::InvalidInput(format!(
            "path {path:?} must name a file"
        )));
    }

    if path.contains(['\0', '\n', '\r']) {
        return Err(FileError::InvalidInput(format!(
            "path {path:?} contains disallowed characters"
        )));
    }

    Ok(())
}

/// Validate alias.
///
/// Aliases double as file names inside the storage directory. So, they are
/// restricted to ASCII alphanumerics, '.', '_', and '-', and they may not
/// start with '.' or '-'.
///
/// # Errors
///
/// - Return [`FileError::InvalidInput`] if alias is malformed.
pub fn check_alias(alias: &str) -> Result<()> {
    if alias.is_empty() {
        return Err(FileError::InvalidInput("alias cannot be empty".into()));
    }

    if alias.len() > MAX_ALIAS_LEN {
        return Err(FileError::InvalidInput(format!(
            "alias {alias:?} is longer than {MAX_ALIAS_LEN} characters"
        )));
    }

    if alias.starts_with(['.', '-']) {
        return Err(FileError::InvalidInput(format!(
            "alias {alias:?} cannot start with '.' or '-'"
        )));
    }

    if !alias
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
    {
        return Err(FileError::InvalidInput(format!(
            "alias {alias:?} may only contain letters, digits, '.', '_', and '-'"
        )));
    }

    Ok(())
}

/// Seconds since the Unix epoch at given time.
fn timestamp(time: SystemTime) -> Result<i64> {
    let elapsed = time
        .duration_since(UNIX_EPOCH)
        .map_err(|err| FileError::Clock(err.to_string()))?;
    i64::try_from(elapsed.as_secs())
        .map_err(|_| FileError::Clock(format!("{} seconds past the epoch", elapsed.as_secs())))
}

/// Tracked file versioning error types.
#[derive(Debug, thiserror::Error)]
pub enum FileError {
    /// Path, alias, or message is malformed.
    #[error("{0}")]
    InvalidInput(String),

    /// System clock cannot produce a commit timestamp.
    #[error("system clock is unusable: {0}")]
    Clock(String),

    /// Content is already recorded, i.e., nothing to commit.
    #[error("no changes to commit, revision {hash:?} already exists")]
    DuplicateCommit { hash: String },

    /// Requested revision is not recorded.
    #[error("revision {hash:?} not found")]
    CommitNotFound { hash: String },

    /// Diff found no differences.
    #[error("no changes")]
    NoChanges,

    /// Stored revision is corrupt.
    #[error(transparent)]
    Codec(#[from] crate::codec::CodecError),

    /// Storage backend failed.
    #[error(transparent)]
    Storage(#[from] crate::storer::StorageError),
}

/// Friendly result alias :3
pub type Result<T, E = FileError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{file::tracking::TrackingData, storer::StorageError};
    use simple_test_case::test_case;
    use std::collections::HashMap;

    /// In-memory storer to exercise versioning operations in isolation.
    #[derive(Debug, Default)]
    struct MemoryStorer {
        data: TrackingData,
        contents: Vec<u8>,
        revisions: HashMap<String, Vec<u8>>,
        closed: usize,
    }

    impl MemoryStorer {
        fn new(contents: &str) -> Self {
            Self {
                data: TrackingData::new("/tmp/x"),
                contents: contents.into(),
                ..Default::default()
            }
        }
    }

    impl Storer for MemoryStorer {
        fn tracking_data(&self) -> &TrackingData {
            &self.data
        }

        fn has_commit(&self, hash: &str) -> crate::storer::Result<bool> {
            Ok(self.data.contains(hash))
        }

        fn get_contents(&self) -> crate::storer::Result<Vec<u8>> {
            Ok(self.contents.clone())
        }

        fn get_revision(&self, hash: &str) -> crate::storer::Result<Vec<u8>> {
            self.revisions
                .get(hash)
                .cloned()
                .ok_or_else(|| StorageError::MissingRevision { hash: hash.into() })
        }

        fn save_commit(&mut self, compressed: &[u8], commit: Commit) -> crate::storer::Result<()> {
            self.revisions.insert(commit.hash.clone(), compressed.to_vec());
            let hash = commit.hash.clone();
            self.data.push(commit)?;
            self.data.set_revision(hash)?;
            Ok(())
        }

        fn revert(&mut self, raw: &[u8], hash: &str) -> crate::storer::Result<()> {
            self.contents = raw.to_vec();
            self.data.set_revision(hash)?;
            Ok(())
        }

        fn close(&mut self) -> crate::storer::Result<()> {
            self.closed += 1;
            Ok(())
        }
    }

    #[test]
    fn init_records_initial_commit() -> anyhow::Result<()> {
        let mut storer = MemoryStorer::new("hello");
        let commit = init(&mut storer, "/tmp/x", "x")?;

        assert_eq!(commit.hash, codec::hash("hello"));
        assert_eq!(commit.message, INITIAL_COMMIT_MESSAGE);
        assert_eq!(storer.data.len(), 1);
        assert_eq!(storer.data.revision(), commit.hash);
        assert_eq!(storer.closed, 1);

        Ok(())
    }

    #[test]
    fn init_rejects_path_storage_does_not_track() {
        let mut storer = MemoryStorer::new("hello");

        let result = init(&mut storer, "/tmp/y", "x");
        assert!(matches!(result, Err(FileError::InvalidInput(_))));
        assert!(storer.data.is_empty());
        assert_eq!(storer.closed, 0);
    }

    #[test]
    fn timestamp_rejects_clock_before_epoch() -> anyhow::Result<()> {
        use std::time::Duration;

        assert_eq!(timestamp(UNIX_EPOCH + Duration::from_secs(42))?, 42);

        let result = timestamp(UNIX_EPOCH - Duration::from_secs(1));
        assert!(matches!(result, Err(FileError::Clock(_))));

        Ok(())
    }

    #[test]
    fn init_rejects_already_tracked_file() -> anyhow::Result<()> {
        let mut storer = MemoryStorer::new("hello");
        init(&mut storer, "/tmp/x", "x")?;
        storer.contents = "changed".into();

        let result = init(&mut storer, "/tmp/x", "x");
        assert!(matches!(result, Err(FileError::InvalidInput(_))));
        assert_eq!(storer.data.len(), 1);

        Ok(())
    }

    #[test]
    fn new_commit_with_unchanged_content_is_duplicate() -> anyhow::Result<()> {
        let mut storer = MemoryStorer::new("hello");
        new_commit(&mut storer, "first")?;

        let result = new_commit(&mut storer, "second");
        assert!(matches!(result, Err(FileError::DuplicateCommit { .. })));
        assert_eq!(storer.data.len(), 1);
        assert_eq!(storer.closed, 1);

        Ok(())
    }

    #[test]
    fn checkout_restores_every_recorded_state() -> anyhow::Result<()> {
        let mut storer = MemoryStorer::new("one");
        let mut recorded = Vec::new();
        for content in ["one", "two", "three"] {
            storer.contents = content.into();
            recorded.push((new_commit(&mut storer, content)?.hash, content));
        }

        for (hash, content) in recorded {
            checkout(&mut storer, &hash)?;
            assert_eq!(storer.get_contents()?, content.as_bytes());
            assert_eq!(storer.data.revision(), hash);
            assert_eq!(storer.data.len(), 3);
        }

        Ok(())
    }

    #[test]
    fn checkout_unknown_hash_fails() {
        let mut storer = MemoryStorer::new("hello");
        let result = checkout(&mut storer, "deadbeef");
        assert!(matches!(result, Err(FileError::CommitNotFound { hash }) if hash == "deadbeef"));
        assert_eq!(storer.closed, 0);
    }

    #[test]
    fn diff_against_itself_has_no_changes() -> anyhow::Result<()> {
        let mut storer = MemoryStorer::new("hello\nworld\n");
        let commit = new_commit(&mut storer, "first")?;

        assert!(matches!(
            diff(&storer, &commit.hash, &commit.hash),
            Err(FileError::NoChanges)
        ));
        assert!(matches!(diff(&storer, &commit.hash, ""), Err(FileError::NoChanges)));

        Ok(())
    }

    #[test]
    fn diff_against_working_copy() -> anyhow::Result<()> {
        let mut storer = MemoryStorer::new("hello\nworld\n");
        let commit = new_commit(&mut storer, "first")?;
        storer.contents = "hello\nthere\n".into();

        let result = diff(&storer, &commit.hash, "")?;
        let expect = vec![
            Diff::new(Operation::Equal, "hello\n"),
            Diff::new(Operation::Delete, "world\n"),
            Diff::new(Operation::Insert, "there\n"),
        ];
        assert_eq!(result, expect);

        Ok(())
    }

    #[test_case("/tmp/x"; "absolute")]
    #[test_case("~/.bashrc"; "home relative")]
    #[test_case("~/.config/nvim/init.lua"; "nested")]
    #[test]
    fn valid_paths_pass(path: &str) {
        assert!(check_path(path).is_ok());
    }

    #[test_case(""; "empty")]
    #[test_case(".bashrc"; "relative")]
    #[test_case("~"; "home itself")]
    #[test_case("/etc/"; "directory")]
    #[test_case("/tmp/a\nb"; "newline")]
    #[test]
    fn invalid_paths_fail(path: &str) {
        assert!(matches!(check_path(path), Err(FileError::InvalidInput(_))));
    }

    #[test_case("bashrc"; "plain")]
    #[test_case("init.lua"; "dotted")]
    #[test_case("nvim_init-2"; "mixed")]
    #[test]
    fn valid_aliases_pass(alias: &str) {
        assert!(check_alias(alias).is_ok());
    }

    #[test_case(""; "empty")]
    #[test_case(".bashrc"; "leading dot")]
    #[test_case("-x"; "leading dash")]
    #[test_case("a/b"; "slash")]
    #[test_case("a b"; "space")]
    #[test_case(&"a".repeat(MAX_ALIAS_LEN + 1); "too long")]
    #[test]
    fn invalid_aliases_fail(alias: &str) {
        assert!(matches!(check_alias(alias), Err(FileError::InvalidInput(_))));
    }
}
