// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Revision tracking and synchronization for individual dotfiles.
//!
//! Dotsync records the history of single files as a log of content addressed
//! commits, and keeps that log in sync with a remote replica. See [`file`]
//! for the versioning model, [`file::merge`] for how diverged histories are
//! reconciled, and [`sync`] for push and pull.

pub mod codec;
pub mod config;
pub mod file;
pub mod path;
pub mod remote;
pub mod storer;
pub mod store;
pub mod sync;
