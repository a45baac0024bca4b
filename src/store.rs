// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Local tracked file storage.
//!
//! Dotsync keeps everything it knows about tracked files in one place called
//! the __storage directory__. The storage directory can generally be placed
//! anywhere on the user's file system. However, the default location is
//! `$XDG_DATA_HOME/dotsync`.
//!
//! # Storage Directory Layout
//!
//! Each tracked file is known by its alias. For every alias, the storage
//! directory holds one JSON file with the tracking data, and one directory
//! holding every revision of the tracked file named after its hash. So, if
//! `~/.config/nvim/init.lua` is tracked as "nvim", then the storage directory
//! would contain:
//!
//! ```text
//! $XDG_DATA_HOME/dotsync/nvim.json
//! $XDG_DATA_HOME/dotsync/nvim/8f94c7720a648af9cf9dab33e7f297d28b8bf7cd...
//! ```
//!
//! With the JSON file looking something like this:
//!
//! ```json
//! {
//!   "path": "~/.config/nvim/init.lua",
//!   "revision": "8f94c7720a648af9cf9dab33e7f297d28b8bf7cd...",
//!   "commits": [
//!     {
//!       "hash": "8f94c7720a648af9cf9dab33e7f297d28b8bf7cd...",
//!       "message": "Initial commit",
//!       "timestamp": 1558896290
//!     }
//!   ]
//! }
//! ```
//!
//! Recorded paths keep `~` unexpanded, so the same storage directory can be
//! synchronized between machines with different home directories.

use crate::{
    file::tracking::{Commit, TrackingData},
    path::resolve_home,
    storer::{Result, StorageError, Storer},
};

use std::{
    fs::{copy, create_dir_all, read, read_dir, remove_file, rename, write},
    path::{Path, PathBuf},
};
use tracing::{debug, info, instrument, warn};

/// Tracked file storage on the local file system.
#[derive(Debug, Clone)]
pub struct LocalStore {
    home: PathBuf,
    dir: PathBuf,
    alias: String,
    data: TrackingData,
    has_file: bool,
}

impl LocalStore {
    /// Open storage of alias inside storage directory.
    ///
    /// Loads tracking data of alias if it exists. Otherwise, starts with
    /// empty tracking data that is only written out once storage is closed.
    /// The home directory is used to resolve recorded `~` paths. Creates the
    /// storage directory if it does not exist yet.
    ///
    /// # Errors
    ///
    /// - Return [`StorageError::TrackingFile`] if storage directory cannot be
    ///   created, or tracking data cannot be read.
    /// - Return [`StorageError::MalformedTracking`] if tracking data is
    ///   invalid.
    #[instrument(skip(dir, home), level = "debug")]
    pub fn open(
        dir: impl Into<PathBuf>,
        home: impl Into<PathBuf>,
        alias: impl Into<String> + std::fmt::Debug,
    ) -> Result<Self> {
        let dir = dir.into();
        let alias = alias.into();

        // INVARIANT: Create storage directory if needed.
        create_dir_all(&dir).map_err(|err| StorageError::TrackingFile {
            source: err,
            path: dir.clone(),
        })?;

        let mut store = Self {
            home: home.into(),
            dir,
            alias,
            data: TrackingData::default(),
            has_file: false,
        };

        let tracking_path = store.tracking_path();
        if tracking_path.exists() {
            debug!("load tracking data from {:?}", tracking_path.display());
            let content = read(&tracking_path).map_err(|err| StorageError::TrackingFile {
                source: err,
                path: tracking_path.clone(),
            })?;
            store.data = serde_json::from_slice(&content).map_err(|err| {
                StorageError::MalformedTracking {
                    source: err,
                    path: tracking_path.clone(),
                }
            })?;
            store.has_file = true;
        }

        Ok(store)
    }

    /// Alias of tracked file.
    pub fn alias(&self) -> &str {
        &self.alias
    }

    /// Check if tracking data of alias was persisted before.
    pub fn has_file(&self) -> bool {
        self.has_file
    }

    /// Path to JSON file holding tracking data.
    pub fn tracking_path(&self) -> PathBuf {
        self.dir.join(format!("{}.json", self.alias))
    }

    /// Path to directory holding revisions.
    pub fn revision_dir(&self) -> PathBuf {
        self.dir.join(&self.alias)
    }

    /// Absolute path to working copy.
    ///
    /// Returns [`None`] if no path was recorded yet.
    pub fn working_copy(&self) -> Option<PathBuf> {
        if self.data.path().is_empty() {
            return None;
        }

        Some(self.resolve(self.data.path()))
    }

    /// Resolve recorded path against home directory of this replica.
    pub fn resolve(&self, path: impl AsRef<str>) -> PathBuf {
        resolve_home(path, &self.home)
    }

    /// Record path to working copy of a file that has no commits yet.
    ///
    /// Has no effect on files that already have commits. Use
    /// [`LocalStore::move_to`] for those.
    pub fn track(&mut self, path: impl Into<String>) {
        if self.data.is_empty() {
            self.data.set_path(path);
        }
    }

    /// Replace loaded tracking data, e.g., with the result of a merge.
    ///
    /// Nothing is persisted until storage is closed.
    pub fn replace_tracking_data(&mut self, data: TrackingData) {
        self.data = data;
    }

    /// Write compressed revision into revision directory.
    ///
    /// # Errors
    ///
    /// - Return [`StorageError::WriteRevision`] if revision cannot be written.
    pub fn write_revision(&self, hash: &str, compressed: &[u8]) -> Result<()> {
        let revision_dir = self.revision_dir();
        let path = revision_dir.join(hash);
        create_dir_all(&revision_dir)
            .and_then(|_| write(&path, compressed))
            .map_err(|err| StorageError::WriteRevision {
                source: err,
                hash: hash.into(),
                path,
            })
    }

    /// Move working copy to a new path, and record the new path.
    ///
    /// The new path may use `~` notation. Missing parent directories are only
    /// created when asked to. Closes storage.
    ///
    /// # Errors
    ///
    /// - Return [`StorageError::Untracked`] if alias has no working copy.
    /// - Return [`StorageError::WriteContents`] if working copy cannot be
    ///   moved.
    /// - Return [`StorageError::TrackingFile`] if tracking data cannot be
    ///   written.
    #[instrument(skip(self), fields(alias = %self.alias), level = "debug")]
    pub fn move_to(&mut self, new_path: &str, create_dirs: bool) -> Result<()> {
        let old = self.working_copy().ok_or_else(|| StorageError::Untracked {
            alias: self.alias.clone(),
        })?;
        let new = resolve_home(new_path, &self.home);

        if create_dirs {
            if let Some(parent) = new.parent() {
                create_dir_all(parent).map_err(|err| StorageError::WriteContents {
                    source: err,
                    path: parent.into(),
                })?;
            }
        }

        info!("move {:?} to {:?}", old.display(), new.display());
        move_file(&old, &new)?;
        self.data.set_path(new_path);
        self.close()
    }

    /// List aliases of all tracked files in storage directory.
    ///
    /// # Errors
    ///
    /// - Return [`StorageError::TrackingFile`] if storage directory cannot be
    ///   read.
    pub fn list_aliases(dir: impl AsRef<Path>) -> Result<Vec<String>> {
        let dir = dir.as_ref();
        if !dir.exists() {
            return Ok(Vec::new());
        }

        let entries = read_dir(dir).map_err(|err| StorageError::TrackingFile {
            source: err,
            path: dir.into(),
        })?;

        let mut aliases = entries
            .filter_map(|entry| entry.ok().map(|entry| entry.path()))
            .filter(|path| path.is_file() && path.extension().is_some_and(|ext| ext == "json"))
            .filter_map(|path| {
                path.file_stem()
                    .map(|stem| stem.to_string_lossy().into_owned())
            })
            .collect::<Vec<_>>();
        aliases.sort();

        Ok(aliases)
    }

    fn require_working_copy(&self) -> Result<PathBuf> {
        self.working_copy().ok_or_else(|| StorageError::Untracked {
            alias: self.alias.clone(),
        })
    }
}

impl Storer for LocalStore {
    fn tracking_data(&self) -> &TrackingData {
        &self.data
    }

    fn has_commit(&self, hash: &str) -> Result<bool> {
        Ok(self.data.contains(hash))
    }

    fn get_contents(&self) -> Result<Vec<u8>> {
        let path = self.require_working_copy()?;
        read(&path).map_err(|err| StorageError::ReadContents { source: err, path })
    }

    fn get_revision(&self, hash: &str) -> Result<Vec<u8>> {
        let path = self.revision_dir().join(hash);
        read(&path).map_err(|err| StorageError::ReadRevision {
            source: err,
            hash: hash.into(),
            path,
        })
    }

    fn save_commit(&mut self, compressed: &[u8], commit: Commit) -> Result<()> {
        let hash = commit.hash.clone();
        self.data.push(commit)?;
        self.write_revision(&hash, compressed)?;
        self.data.set_revision(&hash)?;

        Ok(())
    }

    fn revert(&mut self, raw: &[u8], hash: &str) -> Result<()> {
        let path = self.require_working_copy()?;

        // INVARIANT: Working copy may live in a directory that does not exist on this machine yet.
        if let Some(parent) = path.parent() {
            create_dir_all(parent).map_err(|err| StorageError::WriteContents {
                source: err,
                path: parent.into(),
            })?;
        }

        write(&path, raw).map_err(|err| StorageError::WriteContents { source: err, path })?;
        self.data.set_revision(hash)?;

        Ok(())
    }

    #[instrument(skip(self), fields(alias = %self.alias), level = "debug")]
    fn close(&mut self) -> Result<()> {
        let path = self.tracking_path();
        let json = serde_json::to_vec_pretty(&self.data).map_err(|err| {
            StorageError::MalformedTracking {
                source: err,
                path: path.clone(),
            }
        })?;

        debug!("save tracking data to {:?}", path.display());
        write(&path, json).map_err(|err| StorageError::TrackingFile { source: err, path })?;
        self.has_file = true;

        Ok(())
    }
}

/// Move file, falling back to copy and remove across file systems.
fn move_file(from: &Path, to: &Path) -> Result<()> {
    if rename(from, to).is_ok() {
        return Ok(());
    }

    warn!("cannot rename {:?}, copying instead", from.display());
    copy(from, to).map_err(|err| StorageError::WriteContents {
        source: err,
        path: to.into(),
    })?;
    remove_file(from).map_err(|err| StorageError::WriteContents {
        source: err,
        path: from.into(),
    })
}
