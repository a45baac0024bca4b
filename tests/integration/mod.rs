// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

use crate::{MemoryRemote, ReplicaFixture};

use anyhow::Result;
use dotsync::{
    codec,
    file::{self, diff, FileError},
    storer::Storer,
    sync::{self, SyncError},
};
use pretty_assertions::assert_eq;

#[test]
fn track_commit_and_checkout_single_file() -> Result<()> {
    let replica = ReplicaFixture::new()?;
    replica.write("x", "hello")?;
    let path = replica.home_path("x").display().to_string();

    let mut store = replica.open("x")?;
    store.track(&path);
    let initial = file::init(&mut store, &path, "x")?;
    let h0 = codec::hash("hello");
    assert_eq!(initial.hash, h0);
    assert_eq!(store.tracking_data().hashes().collect::<Vec<_>>(), vec![h0.as_str()]);
    assert_eq!(store.tracking_data().revision(), h0);

    replica.write("x", "hello world")?;
    file::new_commit(&mut store, "update")?;
    let h1 = codec::hash("hello world");
    assert_eq!(
        store.tracking_data().hashes().collect::<Vec<_>>(),
        vec![h0.as_str(), h1.as_str()]
    );
    assert_eq!(store.tracking_data().revision(), h1);

    let rendered = diff::render(&file::diff(&store, &h0, &h1)?);
    assert_eq!(rendered, "-hello\n+hello world\n");

    file::checkout(&mut store, &h0)?;
    assert_eq!(replica.read("x")?, "hello");

    let reopened = replica.open("x")?;
    assert_eq!(reopened.tracking_data().revision(), h0);
    assert_eq!(reopened.tracking_data().len(), 2);

    Ok(())
}

#[test]
fn commit_without_changes_is_rejected() -> Result<()> {
    let replica = ReplicaFixture::new()?;
    replica.write(".vimrc", "set number\n")?;

    let mut store = replica.open("vimrc")?;
    store.track("~/.vimrc");
    file::init(&mut store, "~/.vimrc", "vimrc")?;

    let result = file::new_commit(&mut store, "nothing");
    assert!(matches!(result, Err(FileError::DuplicateCommit { .. })));
    assert_eq!(replica.open("vimrc")?.tracking_data().len(), 1);

    Ok(())
}

#[test]
fn push_then_pull_into_fresh_replica() -> Result<()> {
    let remote = MemoryRemote::default();
    let laptop = ReplicaFixture::new()?;
    let desktop = ReplicaFixture::new()?;

    laptop.write(".bashrc", "alias ll='ls -la'\n")?;
    let mut local = laptop.open("bashrc")?;
    local.track("~/.bashrc");
    let initial = file::init(&mut local, "~/.bashrc", "bashrc")?;

    assert_eq!(sync::push(&local, &&remote)?, 1);
    assert!(remote.has_revision(&initial.hash));
    assert_eq!(remote.tracking_data("bashrc").as_ref(), Some(local.tracking_data()));

    let mut fresh = desktop.open("bashrc")?;
    assert_eq!(sync::pull(&mut fresh, &&remote)?, 1);
    assert!(fresh.has_file());
    assert_eq!(desktop.read(".bashrc")?, "alias ll='ls -la'\n");
    assert_eq!(desktop.open("bashrc")?.tracking_data(), local.tracking_data());

    Ok(())
}

#[test]
fn push_skips_upload_when_remote_is_up_to_date() -> Result<()> {
    let remote = MemoryRemote::default();
    let replica = ReplicaFixture::new()?;
    replica.write(".zshrc", "bindkey -v\n")?;

    let mut local = replica.open("zshrc")?;
    local.track("~/.zshrc");
    file::init(&mut local, "~/.zshrc", "zshrc")?;

    assert_eq!(sync::push(&local, &&remote)?, 1);
    assert_eq!(sync::push(&local, &&remote)?, 0);
    assert_eq!(remote.uploads(), 1);

    Ok(())
}

#[test]
fn diverged_replicas_converge() -> Result<()> {
    let remote = MemoryRemote::default();
    remote.seed("bashrc", "~/.bashrc", &[("base\n", 10)])?;

    let replica = ReplicaFixture::new()?;
    let mut local = replica.open("bashrc")?;
    assert_eq!(sync::pull(&mut local, &&remote)?, 1);
    assert_eq!(replica.read(".bashrc")?, "base\n");

    // Remote gains a commit while the local replica commits on its own.
    remote.seed("bashrc", "~/.bashrc", &[("base\n", 10), ("remote\n", 20)])?;
    replica.write(".bashrc", "local\n")?;
    file::new_commit(&mut local, "local edit")?;

    assert_eq!(sync::pull(&mut local, &&remote)?, 1);
    let expected = [
        codec::hash("base\n"),
        codec::hash("remote\n"),
        codec::hash("local\n"),
    ];
    assert_eq!(
        local.tracking_data().hashes().collect::<Vec<_>>(),
        expected.iter().map(String::as_str).collect::<Vec<_>>()
    );
    assert_eq!(local.tracking_data().revision(), expected[2]);
    assert_eq!(replica.read(".bashrc")?, "local\n");

    assert_eq!(sync::push(&local, &&remote)?, 1);
    assert_eq!(remote.tracking_data("bashrc").as_ref(), Some(local.tracking_data()));

    Ok(())
}

#[test]
fn pull_follows_path_moved_on_other_replica() -> Result<()> {
    let remote = MemoryRemote::default();
    let laptop = ReplicaFixture::new()?;
    let desktop = ReplicaFixture::new()?;

    laptop.write(".bashrc", "set -o vi\n")?;
    let mut first = laptop.open("bashrc")?;
    first.track("~/.bashrc");
    file::init(&mut first, "~/.bashrc", "bashrc")?;
    sync::push(&first, &&remote)?;

    let mut second = desktop.open("bashrc")?;
    sync::pull(&mut second, &&remote)?;
    second.move_to("~/.config/bash/bashrc", true)?;
    assert_eq!(sync::push(&second, &&remote)?, 0);
    assert_eq!(remote.uploads(), 2);

    sync::pull(&mut first, &&remote)?;
    assert_eq!(first.tracking_data().path(), "~/.config/bash/bashrc");
    assert_eq!(laptop.read(".config/bash/bashrc")?, "set -o vi\n");

    Ok(())
}

#[test]
fn pull_leaves_up_to_date_working_copy_alone() -> Result<()> {
    let remote = MemoryRemote::default();
    remote.seed("gitconfig", "~/.gitconfig", &[("[user]\n", 1)])?;

    let replica = ReplicaFixture::new()?;
    let mut local = replica.open("gitconfig")?;
    sync::pull(&mut local, &&remote)?;

    replica.write(".gitconfig", "[user]\n\tname = dirty\n")?;
    assert_eq!(sync::pull(&mut local, &&remote)?, 0);
    assert_eq!(replica.read(".gitconfig")?, "[user]\n\tname = dirty\n");

    Ok(())
}

#[test]
fn pull_refuses_to_overwrite_untracked_file() -> Result<()> {
    let remote = MemoryRemote::default();
    remote.seed("bashrc", "~/.bashrc", &[("remote\n", 1)])?;

    let replica = ReplicaFixture::new()?;
    replica.write(".bashrc", "mine\n")?;

    let mut local = replica.open("bashrc")?;
    let result = sync::pull(&mut local, &&remote);
    assert!(matches!(result, Err(SyncError::PathConflict { path }) if path == replica.home_path(".bashrc")));
    assert_eq!(replica.read(".bashrc")?, "mine\n");
    assert!(!local.has_file());
    assert!(!local.tracking_path().exists());

    Ok(())
}

#[test]
fn pull_refuses_to_move_onto_untracked_file() -> Result<()> {
    let remote = MemoryRemote::default();
    let replica = ReplicaFixture::new()?;
    replica.write(".bashrc", "one\n")?;

    let mut local = replica.open("bashrc")?;
    local.track("~/.bashrc");
    file::init(&mut local, "~/.bashrc", "bashrc")?;
    sync::push(&local, &&remote)?;

    remote.relocate("bashrc", "~/.profile");
    replica.write(".profile", "precious untracked\n")?;

    let result = sync::pull(&mut local, &&remote);
    assert!(matches!(result, Err(SyncError::PathConflict { path }) if path == replica.home_path(".profile")));
    assert_eq!(replica.read(".profile")?, "precious untracked\n");
    assert_eq!(replica.open("bashrc")?.tracking_data().path(), "~/.bashrc");

    Ok(())
}

#[test]
fn pull_rejects_relative_remote_path() -> Result<()> {
    let remote = MemoryRemote::default();
    remote.seed("bashrc", "relative-bashrc", &[("two\n", 1)])?;

    let replica = ReplicaFixture::new()?;
    let mut local = replica.open("bashrc")?;
    let result = sync::pull(&mut local, &&remote);
    assert!(matches!(result, Err(SyncError::File(FileError::InvalidInput(_)))));
    assert!(!std::path::Path::new("relative-bashrc").exists());
    assert!(!local.has_file());

    Ok(())
}

#[test]
fn pull_unknown_alias_fails() -> Result<()> {
    let remote = MemoryRemote::default();
    let replica = ReplicaFixture::new()?;

    let mut local = replica.open("tmux")?;
    let result = sync::pull(&mut local, &&remote);
    assert!(matches!(result, Err(SyncError::RemoteNotFound { alias }) if alias == "tmux"));

    Ok(())
}

#[test]
fn push_untracked_alias_fails() -> Result<()> {
    let remote = MemoryRemote::default();
    let replica = ReplicaFixture::new()?;

    let local = replica.open("tmux")?;
    let result = sync::push(&local, &&remote);
    assert!(matches!(result, Err(SyncError::Untracked { alias }) if alias == "tmux"));
    assert_eq!(remote.uploads(), 0);

    Ok(())
}

#[test]
fn pull_rejects_revision_not_matching_its_hash() -> Result<()> {
    let remote = MemoryRemote::default();
    remote.seed("bashrc", "~/.bashrc", &[("one\n", 1), ("two\n", 2)])?;
    let tampered = codec::hash("two\n");
    remote.tamper(&tampered, "evil\n")?;

    let replica = ReplicaFixture::new()?;
    let mut local = replica.open("bashrc")?;
    let result = sync::pull(&mut local, &&remote);
    assert!(matches!(result, Err(SyncError::CorruptRevision { hash }) if hash == tampered));
    assert!(!replica.home_path(".bashrc").exists());
    assert!(!local.has_file());

    Ok(())
}
