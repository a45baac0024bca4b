// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Configuration layout.
//!
//! Specify the layout for the user configuration file that dotsync uses to
//! locate its storage directory and the remote replica to synchronize with.
//! Nothing in here is consulted implicitly by the versioning engine. The
//! binary loads the configuration once, and passes the relevant pieces into
//! each operation.

use serde::{Deserialize, Serialize};
use std::{
    fmt::{Display, Error as FmtError, Formatter, Result as FmtResult},
    fs::read_to_string,
    path::{Path, PathBuf},
    str::FromStr,
};
use tracing::debug;

/// User configuration layout.
///
/// # General Layout
///
/// ```toml
/// storage_dir = "$XDG_DATA_HOME/dotsync"
///
/// [remote]
/// url = "https://dotfilehub.com"
/// username = "blah"
/// token = "secret"
/// ```
///
/// Both the storage directory and the remote section are optional. Without a
/// remote section, push and pull are unavailable.
#[derive(Default, Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
pub struct UserConfig {
    /// Directory to place tracking data and revisions in.
    pub storage_dir: Option<PathBuf>,

    /// Remote replica to synchronize with.
    pub remote: Option<RemoteSettings>,
}

impl UserConfig {
    /// Load user configuration from file.
    ///
    /// A missing configuration file is not an error, default configuration is
    /// used instead.
    ///
    /// # Errors
    ///
    /// - Return [`ConfigError::Read`] if file exists but cannot be read.
    /// - Return [`ConfigError::Deserialize`] if file content is invalid.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            debug!("no user configuration at {:?}, using defaults", path.display());
            return Ok(Self::default());
        }

        read_to_string(path)
            .map_err(|err| ConfigError::Read {
                source: err,
                path: path.into(),
            })?
            .parse()
    }
}

impl FromStr for UserConfig {
    type Err = ConfigError;

    fn from_str(data: &str) -> Result<Self, Self::Err> {
        let mut config: UserConfig = toml::de::from_str(data).map_err(ConfigError::Deserialize)?;

        // INVARIANT: Perform shell expansion on storage directory field.
        if let Some(storage_dir) = config.storage_dir.take() {
            config.storage_dir = Some(PathBuf::from(
                shellexpand::full(storage_dir.to_string_lossy().as_ref())
                    .map_err(ConfigError::ShellExpansion)?
                    .into_owned(),
            ));
        }

        Ok(config)
    }
}

impl Display for UserConfig {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        fmt.write_str(
            toml::ser::to_string_pretty(self)
                .map_err(ConfigError::Serialize)?
                .as_str(),
        )
    }
}

/// Remote replica settings.
#[derive(Default, Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
pub struct RemoteSettings {
    /// Base URL of the remote service.
    pub url: String,

    /// Name of the account owning the remote tracking data.
    pub username: String,

    /// Access token used to authenticate as username.
    pub token: String,
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read configuration file.
    #[error("failed to read configuration file at {:?}", path.display())]
    Read {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },

    /// Failed to deserialize configuration.
    #[error(transparent)]
    Deserialize(#[from] toml::de::Error),

    /// Failed to serialize configuration.
    #[error(transparent)]
    Serialize(#[from] toml::ser::Error),

    /// Failed to perform shell expansion on configuration.
    #[error(transparent)]
    ShellExpansion(#[from] shellexpand::LookupError<std::env::VarError>),
}

impl From<ConfigError> for FmtError {
    fn from(_: ConfigError) -> Self {
        FmtError
    }
}

/// Friendly result alias :3
type Result<T, E = ConfigError> = std::result::Result<T, E>;
