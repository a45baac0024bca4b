// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

use dotsync::{
    config::{RemoteSettings, UserConfig},
    file::{self, diff::render, FileError},
    path::{abbreviate_home, default_config_path, default_storage_dir, home_dir},
    remote::{HttpTransport, RemoteStore},
    store::LocalStore,
    storer::Storer,
    sync,
};

use anyhow::{anyhow, bail, Result};
use clap::{Parser, Subcommand};
use std::{
    io::{stdout, Write},
    path::{Path, PathBuf},
    process::exit,
};
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Debug, Clone, Parser)]
#[command(
    about,
    override_usage = "\n  dotsync [options] <dotsync-command>",
    subcommand_help_heading = "Commands",
    version
)]
struct Cli {
    /// Path to user configuration file.
    #[arg(short, long, global = true, value_name = "path")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    fn run(self) -> Result<()> {
        let ctx = Context::load(self.config)?;
        match self.command {
            Command::Init(opts) => run_init(&ctx, opts),
            Command::Commit(opts) => run_commit(&ctx, opts),
            Command::Checkout(opts) => run_checkout(&ctx, opts),
            Command::Diff(opts) => run_diff(&ctx, opts),
            Command::Log(opts) => run_log(&ctx, opts),
            Command::Show(opts) => run_show(&ctx, opts),
            Command::Mv(opts) => run_mv(&ctx, opts),
            Command::List => run_list(&ctx),
            Command::Push(opts) => run_push(&ctx, opts),
            Command::Pull(opts) => run_pull(&ctx, opts),
        }
    }
}

#[derive(Debug, Clone, Subcommand)]
enum Command {
    /// Start tracking a file.
    #[command(override_usage = "dotsync init [options] <path> [alias]")]
    Init(InitOptions),

    /// Record current state of a tracked file.
    #[command(override_usage = "dotsync commit [options] <alias> [message]")]
    Commit(CommitOptions),

    /// Revert a tracked file to a recorded revision.
    #[command(override_usage = "dotsync checkout [options] <alias> <hash>")]
    Checkout(CheckoutOptions),

    /// Compare revisions of a tracked file.
    #[command(override_usage = "dotsync diff [options] <alias> [hash] [hash]")]
    Diff(DiffOptions),

    /// List recorded revisions of a tracked file.
    #[command(override_usage = "dotsync log [options] <alias>")]
    Log(AliasOptions),

    /// Print content of a tracked file at a revision.
    #[command(override_usage = "dotsync show [options] <alias> <hash>")]
    Show(ShowOptions),

    /// Move working copy of a tracked file.
    #[command(override_usage = "dotsync mv [options] <alias> <path>")]
    Mv(MoveOptions),

    /// List tracked files.
    #[command(override_usage = "dotsync list")]
    List,

    /// Send local revisions of a tracked file to the remote.
    #[command(override_usage = "dotsync push [options] <alias>")]
    Push(AliasOptions),

    /// Fetch remote revisions of a tracked file.
    #[command(override_usage = "dotsync pull [options] <alias>")]
    Pull(AliasOptions),
}

#[derive(Parser, Clone, Debug)]
#[command(author, about, long_about)]
struct InitOptions {
    /// Path to file to track.
    #[arg(value_name = "path")]
    pub path: PathBuf,

    /// Name to track file under, defaults to file name without leading dot.
    #[arg(value_name = "alias")]
    pub alias: Option<String>,
}

#[derive(Parser, Clone, Debug)]
#[command(author, about, long_about)]
struct CommitOptions {
    /// Alias of tracked file.
    #[arg(value_name = "alias")]
    pub alias: String,

    /// Description of the commit.
    #[arg(value_name = "message")]
    pub message: Option<String>,
}

#[derive(Parser, Clone, Debug)]
#[command(author, about, long_about)]
struct CheckoutOptions {
    /// Alias of tracked file.
    #[arg(value_name = "alias")]
    pub alias: String,

    /// Hash, or unique hash prefix, of revision to check out.
    #[arg(value_name = "hash")]
    pub hash: String,

    /// Move the revision of the remote replica instead.
    #[arg(short, long)]
    pub remote: bool,
}

#[derive(Parser, Clone, Debug)]
#[command(author, about, long_about)]
struct DiffOptions {
    /// Alias of tracked file.
    #[arg(value_name = "alias")]
    pub alias: String,

    /// Revision to compare from, defaults to current revision.
    #[arg(value_name = "hash")]
    pub from: Option<String>,

    /// Revision to compare to, defaults to working copy.
    #[arg(value_name = "hash")]
    pub to: Option<String>,
}

#[derive(Parser, Clone, Debug)]
#[command(author, about, long_about)]
struct ShowOptions {
    /// Alias of tracked file.
    #[arg(value_name = "alias")]
    pub alias: String,

    /// Hash, or unique hash prefix, of revision to print.
    #[arg(value_name = "hash")]
    pub hash: String,
}

#[derive(Parser, Clone, Debug)]
#[command(author, about, long_about)]
struct MoveOptions {
    /// Alias of tracked file.
    #[arg(value_name = "alias")]
    pub alias: String,

    /// New path of working copy.
    #[arg(value_name = "path")]
    pub path: PathBuf,

    /// Create parent directories that do not exist.
    #[arg(short, long)]
    pub create_dirs: bool,
}

#[derive(Parser, Clone, Debug)]
#[command(author, about, long_about)]
struct AliasOptions {
    /// Alias of tracked file.
    #[arg(value_name = "alias")]
    pub alias: String,
}

/// Explicit environment every command runs in.
struct Context {
    home: PathBuf,
    storage_dir: PathBuf,
    remote: Option<RemoteSettings>,
}

impl Context {
    fn load(config_path: Option<PathBuf>) -> Result<Self> {
        let config_path = match config_path {
            Some(path) => path,
            None => default_config_path()?,
        };
        let config = UserConfig::load(config_path)?;

        Ok(Self {
            home: home_dir()?,
            storage_dir: match config.storage_dir {
                Some(dir) => dir,
                None => default_storage_dir()?,
            },
            remote: config.remote,
        })
    }

    fn open(&self, alias: &str) -> Result<LocalStore> {
        Ok(LocalStore::open(&self.storage_dir, &self.home, alias)?)
    }

    fn open_tracked(&self, alias: &str) -> Result<LocalStore> {
        let store = self.open(alias)?;
        if !store.has_file() {
            bail!("{alias:?} is not tracked, use 'dotsync init <path>' first");
        }

        Ok(store)
    }

    fn transport(&self) -> Result<HttpTransport> {
        let remote = self
            .remote
            .clone()
            .ok_or_else(|| anyhow!("no [remote] section in user configuration"))?;
        Ok(HttpTransport::new(remote)?)
    }

    fn recorded_path(&self, path: &Path) -> Result<String> {
        Ok(abbreviate_home(std::path::absolute(path)?, &self.home))
    }
}

fn main() {
    let layer = fmt::layer()
        .compact()
        .with_target(false)
        .without_time();
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(layer)
        .with(filter)
        .init();

    if let Err(error) = run() {
        error!("{error:?}");
        exit(1);
    }

    exit(0)
}

fn run() -> Result<()> {
    Cli::parse().run()
}

fn run_init(ctx: &Context, opts: InitOptions) -> Result<()> {
    let path = ctx.recorded_path(&opts.path)?;
    let alias = match opts.alias {
        Some(alias) => alias,
        None => opts
            .path
            .file_name()
            .map(|name| name.to_string_lossy().trim_start_matches('.').to_string())
            .ok_or_else(|| anyhow!("cannot derive alias from {:?}", opts.path.display()))?,
    };
    file::check_alias(&alias)?;

    let mut store = ctx.open(&alias)?;
    if store.has_file() {
        bail!("{alias:?} is already tracked");
    }
    store.track(&path);
    file::init(&mut store, &path, &alias)?;

    Ok(())
}

fn run_commit(ctx: &Context, opts: CommitOptions) -> Result<()> {
    let mut store = ctx.open_tracked(&opts.alias)?;
    let message = opts.message.unwrap_or_default();
    match file::new_commit(&mut store, &message) {
        Ok(commit) => info!("committed {}", short(&commit.hash)),
        Err(FileError::DuplicateCommit { .. }) => warn!("no changes to commit"),
        Err(error) => return Err(error.into()),
    }

    Ok(())
}

fn run_checkout(ctx: &Context, opts: CheckoutOptions) -> Result<()> {
    if opts.remote {
        let mut store = RemoteStore::open(ctx.transport()?, &opts.alias)?;
        let hash = resolve_hash(&store, &opts.hash)?;
        file::checkout(&mut store, &hash)?;
    } else {
        let mut store = ctx.open_tracked(&opts.alias)?;
        let hash = resolve_hash(&store, &opts.hash)?;
        file::checkout(&mut store, &hash)?;
    }

    Ok(())
}

fn run_diff(ctx: &Context, opts: DiffOptions) -> Result<()> {
    let store = ctx.open_tracked(&opts.alias)?;
    let from = match opts.from {
        Some(hash) => resolve_hash(&store, &hash)?,
        None => store.tracking_data().revision().to_string(),
    };
    let to = match opts.to {
        Some(hash) => resolve_hash(&store, &hash)?,
        None => String::new(),
    };

    match file::diff(&store, &from, &to) {
        Ok(diffs) => print!("{}", render(&diffs)),
        Err(FileError::NoChanges) => info!("no changes"),
        Err(error) => return Err(error.into()),
    }

    Ok(())
}

fn run_log(ctx: &Context, opts: AliasOptions) -> Result<()> {
    let store = ctx.open_tracked(&opts.alias)?;
    let data = store.tracking_data();
    for commit in data.commits().iter().rev() {
        let marker = if commit.hash == data.revision() { "*" } else { " " };
        println!(
            "{marker} {}  {}  {}",
            short(&commit.hash),
            commit.timestamp,
            commit.message
        );
    }

    Ok(())
}

fn run_show(ctx: &Context, opts: ShowOptions) -> Result<()> {
    let store = ctx.open_tracked(&opts.alias)?;
    let hash = resolve_hash(&store, &opts.hash)?;
    let raw = file::uncompress_revision(&store, &hash)?;
    stdout().write_all(&raw)?;

    Ok(())
}

fn run_mv(ctx: &Context, opts: MoveOptions) -> Result<()> {
    let path = ctx.recorded_path(&opts.path)?;
    file::check_path(&path)?;
    let mut store = ctx.open_tracked(&opts.alias)?;
    store.move_to(&path, opts.create_dirs)?;

    Ok(())
}

fn run_list(ctx: &Context) -> Result<()> {
    for alias in LocalStore::list_aliases(&ctx.storage_dir)? {
        let store = ctx.open(&alias)?;
        println!("{alias:<20} {}", store.tracking_data().path());
    }

    Ok(())
}

fn run_push(ctx: &Context, opts: AliasOptions) -> Result<()> {
    let store = ctx.open_tracked(&opts.alias)?;
    let count = sync::push(&store, &ctx.transport()?)?;
    info!("pushed {count} new revisions of {:?}", opts.alias);

    Ok(())
}

fn run_pull(ctx: &Context, opts: AliasOptions) -> Result<()> {
    file::check_alias(&opts.alias)?;
    let mut store = ctx.open(&opts.alias)?;
    let count = sync::pull(&mut store, &ctx.transport()?)?;
    info!("pulled {count} new revisions of {:?}", opts.alias);

    Ok(())
}

/// Resolve full hash from a unique prefix.
fn resolve_hash(store: &impl Storer, prefix: &str) -> Result<String> {
    let mut matches = store
        .tracking_data()
        .hashes()
        .filter(|hash| hash.starts_with(prefix));

    match (matches.next(), matches.next()) {
        (Some(hash), None) if !prefix.is_empty() => Ok(hash.to_string()),
        (Some(_), Some(_)) => bail!("revision prefix {prefix:?} is ambiguous"),
        _ => Err(FileError::CommitNotFound {
            hash: prefix.into(),
        }
        .into()),
    }
}

fn short(hash: &str) -> &str {
    &hash[..hash.len().min(10)]
}
