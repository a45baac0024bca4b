// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Path resolution utilities.
//!
//! Determine relevent path information for external files that need to be
//! interacted with, or managed in some way.

use std::path::{Path, PathBuf};

/// Determine absolute path to user's home directory.
///
/// Does not check if the path returned actually exists.
///
/// # Errors
///
/// - Return [`NoWayHome`] if home directory path cannot be determined.
pub fn home_dir() -> Result<PathBuf> {
    dirs::home_dir().ok_or(NoWayHome)
}

/// Determine default absolute path to storage directory.
///
/// Uses XDG Base Directory path `$XDG_DATA_HOME/dotsync` as the default
/// absolute path for tracking data and revisions. Does not check if the path
/// returned actually exists.
///
/// # Errors
///
/// - Return [`NoWayHome`] if home directory path cannot be determined.
///
/// # See Also
///
/// - [XDG Base Directory](https://wiki.archlinux.org/title/XDG_Base_Directory)
pub fn default_storage_dir() -> Result<PathBuf> {
    dirs::data_dir()
        .map(|path| path.join("dotsync"))
        .ok_or(NoWayHome)
}

/// Determine default absolute path to user configuration file.
///
/// Uses `$XDG_CONFIG_HOME/dotsync/config.toml`.
///
/// # Errors
///
/// - Return [`NoWayHome`] if home directory path cannot be determined.
pub fn default_config_path() -> Result<PathBuf> {
    dirs::config_dir()
        .map(|path| path.join("dotsync").join("config.toml"))
        .ok_or(NoWayHome)
}

/// Resolve recorded working copy path against a home directory.
///
/// Only a leading `~` is replaced. Recorded paths keep the shorthand so that
/// the same tracking data stays valid on machines with different home
/// directories.
pub fn resolve_home(path: impl AsRef<str>, home: impl AsRef<Path>) -> PathBuf {
    let path = path.as_ref();
    match path.strip_prefix('~') {
        Some(rest) => home.as_ref().join(rest.trim_start_matches('/')),
        None => PathBuf::from(path),
    }
}

/// Shorten an absolute path into `~` notation when it lives under home.
pub fn abbreviate_home(path: impl AsRef<Path>, home: impl AsRef<Path>) -> String {
    match path.as_ref().strip_prefix(home.as_ref()) {
        Ok(rest) if rest.as_os_str().is_empty() => "~".into(),
        Ok(rest) => format!("~/{}", rest.display()),
        Err(_) => path.as_ref().display().to_string(),
    }
}

/// No way to determine user's home directory.
///
/// # See Also
///
/// - [`dirs::home_dir`](https://docs.rs/dirs/latest/dirs/fn.home_dir.html)
#[derive(Clone, Debug, thiserror::Error)]
#[error("cannot determine absolute path to user's home directory")]
pub struct NoWayHome;

/// Friendly result alias :3
pub type Result<T, E = NoWayHome> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;
    use simple_test_case::test_case;

    #[test_case("~/.bashrc", "/home/blah/.bashrc"; "tilde prefix")]
    #[test_case("~", "/home/blah"; "bare tilde")]
    #[test_case("/etc/hosts", "/etc/hosts"; "absolute path")]
    #[test]
    fn resolve_home_expands_leading_tilde(input: &str, expect: &str) {
        assert_eq!(resolve_home(input, "/home/blah"), PathBuf::from(expect));
    }

    #[test_case("/home/blah/.config/nvim/init.lua", "~/.config/nvim/init.lua"; "under home")]
    #[test_case("/home/blah", "~"; "home itself")]
    #[test_case("/etc/hosts", "/etc/hosts"; "outside home")]
    #[test]
    fn abbreviate_home_shortens_paths_under_home(input: &str, expect: &str) {
        assert_eq!(abbreviate_home(input, "/home/blah"), expect);
    }
}
