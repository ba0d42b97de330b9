//! Subcommands of the `swift-fs` binary.
//!
//! Paths are written `container/dir/...`. Every handler opens a
//! [`SwiftFs`](crate::services::swift_fs::SwiftFs) on the shared client and
//! writes its report to `out`.

pub mod listing_handlers;
pub mod object_handlers;

use crate::{client::ObjectClient, config::FsOptions, services::path::parse_path};
use anyhow::{Result, bail};
use clap::Subcommand;
use std::{io::Write, sync::Arc};

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// List one directory level (or a single object)
    Ls { path: String },

    /// List containers with their size and object count
    Lsd,

    /// List every object below a path
    Lsr { path: String },

    /// Upload a local file
    Put { local: String, path: String },

    /// Print an object's content
    Cat {
        path: String,
        /// Start reading at this byte
        #[arg(long)]
        offset: Option<u64>,
        /// Read at most this many bytes
        #[arg(long)]
        count: Option<u64>,
    },

    /// Delete an object and any segments it owns
    Rm { path: String },

    /// Print an object's metadata as JSON
    Stat { path: String },

    /// Set an object's modification time, creating it empty if absent
    Touch {
        path: String,
        /// RFC 3339 timestamp; defaults to now
        #[arg(long)]
        time: Option<String>,
    },

    /// Server-side copy of an object
    Copy { src: String, dst: String },

    /// Create a container
    Mkdir { path: String },

    /// Delete an empty container
    Rmdir { path: String },

    /// Delete everything below a path
    Purge { path: String },
}

/// Dispatch `command` against `client`.
pub async fn run(
    command: Command,
    client: Arc<dyn ObjectClient>,
    opts: FsOptions,
    out: &mut dyn Write,
) -> Result<()> {
    match command {
        Command::Ls { path } => listing_handlers::ls(client, opts, &path, out).await,
        Command::Lsd => listing_handlers::lsd(client, opts, out).await,
        Command::Lsr { path } => listing_handlers::lsr(client, opts, &path, out).await,
        Command::Mkdir { path } => listing_handlers::mkdir(client, opts, &path, out).await,
        Command::Rmdir { path } => listing_handlers::rmdir(client, opts, &path, out).await,
        Command::Purge { path } => listing_handlers::purge(client, opts, &path, out).await,
        Command::Put { local, path } => {
            object_handlers::put(client, opts, &local, &path, out).await
        }
        Command::Cat {
            path,
            offset,
            count,
        } => object_handlers::cat(client, opts, &path, offset, count, out).await,
        Command::Rm { path } => object_handlers::rm(client, opts, &path, out).await,
        Command::Stat { path } => object_handlers::stat(client, opts, &path, out).await,
        Command::Touch { path, time } => {
            object_handlers::touch(client, opts, &path, time.as_deref(), out).await
        }
        Command::Copy { src, dst } => object_handlers::copy(client, opts, &src, &dst, out).await,
    }
}

/// Split `container/dir/name` into the adapter root `container/dir` and
/// the object name.
pub(crate) fn split_object_path(path: &str) -> Result<(String, String)> {
    let (container, key) = parse_path(path);
    if container.is_empty() || key.is_empty() {
        bail!("`{}` does not name an object (expected container/name)", path);
    }
    Ok(match key.rsplit_once('/') {
        Some((dir, name)) => (format!("{container}/{dir}"), name.to_string()),
        None => (container, key),
    })
}
