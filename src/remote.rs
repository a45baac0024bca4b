// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Remote replica access.
//!
//! A remote replica keeps its own copy of the tracking data and revisions of
//! each tracked file, scoped to one user account. It is reached through
//! plain request/response calls abstracted by [`Transport`]. Every call
//! blocks until the response arrives. Retries and timeouts are left to the
//! transport itself.
//!
//! # HTTP Layout
//!
//! [`HttpTransport`] talks to a dotfile hub style service:
//!
//! - `GET {url}/api/v1/user/{username}/{alias}` returns tracking data as
//!   JSON, or 404 if the user does not track the alias.
//! - `GET {url}/api/v1/user/{username}/{alias}/{hash}` returns the
//!   compressed revision at hash.
//! - `POST {url}/api/v1/user/{username}/{alias}` uploads a multipart form
//!   with a `json` part holding the tracking data, and one part per revision
//!   named after its hash.

use crate::{
    codec,
    config::RemoteSettings,
    file::tracking::{Commit, TrackingData},
    storer::{Result as StorerResult, StorageError, Storer},
};

use reqwest::{
    blocking::{
        multipart::{Form, Part},
        Client,
    },
    StatusCode,
};
use std::{collections::BTreeMap, time::Duration};
use tracing::{debug, info, instrument, warn};

/// Compressed revision of a tracked file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Revision {
    /// Content hash of the uncompressed revision.
    pub hash: String,

    /// Compressed revision bytes.
    pub bytes: Vec<u8>,
}

impl Revision {
    /// Construct new revision.
    pub fn new(hash: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            hash: hash.into(),
            bytes: bytes.into(),
        }
    }
}

/// Request/response access to a remote replica.
pub trait Transport {
    /// Fetch tracking data of alias, if the remote tracks it.
    fn fetch_tracking_data(&self, alias: &str) -> Result<Option<TrackingData>>;

    /// Fetch compressed revisions of alias by hash.
    fn fetch_revisions(&self, alias: &str, hashes: &[String]) -> Result<Vec<Revision>>;

    /// Upload revisions along with updated tracking data of alias.
    fn upload(&self, alias: &str, data: &TrackingData, revisions: &[Revision]) -> Result<()>;
}

/// Remote access over HTTP.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    settings: RemoteSettings,
}

impl HttpTransport {
    /// Request timeout for every call.
    pub const TIMEOUT: Duration = Duration::from_secs(30);

    /// Construct new HTTP transport for remote settings.
    ///
    /// # Errors
    ///
    /// - Return [`TransportError::Http`] if client cannot be built.
    pub fn new(settings: RemoteSettings) -> Result<Self> {
        let client = Client::builder().timeout(Self::TIMEOUT).build()?;
        Ok(Self { client, settings })
    }

    fn file_url(&self, alias: &str) -> String {
        format!(
            "{}/api/v1/user/{}/{}",
            self.settings.url.trim_end_matches('/'),
            self.settings.username,
            alias
        )
    }
}

impl Transport for HttpTransport {
    #[instrument(skip(self), level = "debug")]
    fn fetch_tracking_data(&self, alias: &str) -> Result<Option<TrackingData>> {
        let url = self.file_url(alias);
        debug!("fetch tracking data from {url}");
        let response = self
            .client
            .get(&url)
            .basic_auth(&self.settings.username, Some(&self.settings.token))
            .send()?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let response = check_status(response, &url)?;
        Ok(Some(response.json::<TrackingData>()?))
    }

    #[instrument(skip(self, hashes), level = "debug")]
    fn fetch_revisions(&self, alias: &str, hashes: &[String]) -> Result<Vec<Revision>> {
        let mut revisions = Vec::with_capacity(hashes.len());
        for hash in hashes {
            let url = format!("{}/{hash}", self.file_url(alias));
            debug!("fetch revision from {url}");
            let response = self
                .client
                .get(&url)
                .basic_auth(&self.settings.username, Some(&self.settings.token))
                .send()?;
            let bytes = check_status(response, &url)?.bytes()?;
            revisions.push(Revision::new(hash.clone(), bytes.to_vec()));
        }

        Ok(revisions)
    }

    #[instrument(skip(self, data, revisions), level = "debug")]
    fn upload(&self, alias: &str, data: &TrackingData, revisions: &[Revision]) -> Result<()> {
        let url = self.file_url(alias);
        let mut form = Form::new().text("json", serde_json::to_string(data)?);
        for revision in revisions {
            form = form.part(
                revision.hash.clone(),
                Part::bytes(revision.bytes.clone()).file_name(revision.hash.clone()),
            );
        }

        debug!("upload {} revisions to {url}", revisions.len());
        let response = self
            .client
            .post(&url)
            .basic_auth(&self.settings.username, Some(&self.settings.token))
            .multipart(form)
            .send()?;
        check_status(response, &url)?;

        Ok(())
    }
}

fn check_status(
    response: reqwest::blocking::Response,
    url: &str,
) -> Result<reqwest::blocking::Response> {
    let status = response.status();
    if !status.is_success() {
        return Err(status_error(status, url, response.text()));
    }

    Ok(response)
}

fn status_error(
    status: StatusCode,
    url: &str,
    body: std::result::Result<String, impl std::fmt::Display>,
) -> TransportError {
    let body = body.unwrap_or_else(|err| {
        warn!("cannot read response body from {url}: {err}");
        format!("<unreadable body: {err}>")
    });

    TransportError::Status {
        status,
        url: url.into(),
        body,
    }
}

/// Tracked file storage backed by a remote replica.
///
/// The working copy of a remote replica is the content at its current
/// revision. Commits and reverts are staged in memory, and sent to the
/// remote in one upload when storage is closed.
#[derive(Debug)]
pub struct RemoteStore<T>
where
    T: Transport,
{
    transport: T,
    alias: String,
    data: TrackingData,
    staged: BTreeMap<String, Vec<u8>>,
}

impl<T> RemoteStore<T>
where
    T: Transport,
{
    /// Open remote tracking data of alias.
    ///
    /// # Errors
    ///
    /// - Return [`StorageError::Untracked`] if remote does not track alias.
    /// - Return [`StorageError::Transport`] if remote cannot be reached.
    pub fn open(transport: T, alias: impl Into<String>) -> StorerResult<Self> {
        let alias = alias.into();
        let data = transport
            .fetch_tracking_data(&alias)?
            .ok_or_else(|| StorageError::Untracked {
                alias: alias.clone(),
            })?;

        Ok(Self {
            transport,
            alias,
            data,
            staged: BTreeMap::new(),
        })
    }

    /// Alias of tracked file.
    pub fn alias(&self) -> &str {
        &self.alias
    }
}

impl<T> Storer for RemoteStore<T>
where
    T: Transport,
{
    fn tracking_data(&self) -> &TrackingData {
        &self.data
    }

    fn has_commit(&self, hash: &str) -> StorerResult<bool> {
        Ok(self.data.contains(hash))
    }

    fn get_contents(&self) -> StorerResult<Vec<u8>> {
        let revision = self.data.revision();
        if revision.is_empty() {
            return Err(StorageError::MissingRevision {
                hash: revision.into(),
            });
        }

        Ok(codec::decompress(self.get_revision(revision)?)?)
    }

    fn get_revision(&self, hash: &str) -> StorerResult<Vec<u8>> {
        if let Some(bytes) = self.staged.get(hash) {
            return Ok(bytes.clone());
        }

        self.transport
            .fetch_revisions(&self.alias, &[hash.to_string()])?
            .into_iter()
            .find(|revision| revision.hash == hash)
            .map(|revision| revision.bytes)
            .ok_or_else(|| StorageError::MissingRevision { hash: hash.into() })
    }

    fn save_commit(&mut self, compressed: &[u8], commit: Commit) -> StorerResult<()> {
        let hash = commit.hash.clone();
        self.data.push(commit)?;
        self.data.set_revision(&hash)?;
        self.staged.insert(hash, compressed.to_vec());

        Ok(())
    }

    fn revert(&mut self, _raw: &[u8], hash: &str) -> StorerResult<()> {
        self.data.set_revision(hash)?;
        Ok(())
    }

    #[instrument(skip(self), fields(alias = %self.alias), level = "debug")]
    fn close(&mut self) -> StorerResult<()> {
        let revisions = std::mem::take(&mut self.staged)
            .into_iter()
            .map(|(hash, bytes)| Revision::new(hash, bytes))
            .collect::<Vec<_>>();

        info!("update remote {:?} with {} new revisions", self.alias, revisions.len());
        self.transport.upload(&self.alias, &self.data, &revisions)?;

        Ok(())
    }
}

/// Remote transport error types.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// HTTP request could not be completed.
    #[error(transparent)]
    Http(#[from] reqwest::Error),

    /// Remote answered with a failure status.
    #[error("remote answered {status} for {url}: {body}")]
    Status {
        status: StatusCode,
        url: String,
        body: String,
    },

    /// Tracking data cannot be encoded for upload.
    #[error(transparent)]
    Encode(#[from] serde_json::Error),
}

/// Friendly result alias :3
pub type Result<T, E = TransportError> = std::result::Result<T, E>;
