use crate::handlers::Command;
use anyhow::{Context, Result, bail};
use clap::Parser;
use std::env;

/// Uploads larger than this are split into segments.
pub const DEFAULT_CHUNK_SIZE: u64 = 5 * 1024 * 1024 * 1024;

/// Number of concurrent deletions during a purge.
pub const DEFAULT_TRANSFERS: usize = 4;

/// Options of one [`SwiftFs`](crate::services::swift_fs::SwiftFs).
#[derive(Debug, Clone)]
pub struct FsOptions {
    /// Objects strictly larger than this many bytes are uploaded in
    /// segments of this size.
    pub chunk_size: u64,

    /// Create the container without probing for it first.
    pub no_check_container: bool,

    /// Parallelism of bulk deletion (queue capacity and worker count).
    pub transfers: usize,
}

impl Default for FsOptions {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            no_check_container: false,
            transfers: DEFAULT_TRANSFERS,
        }
    }
}

/// Centralized application configuration.
/// Combines environment variables and CLI arguments.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub storage_dir: String,
    pub database_url: String,
    pub fs: FsOptions,
}

/// Command-line + environment configuration.
#[derive(Parser, Debug)]
#[command(author, version, about = "Hierarchical file access to a Swift-style object store")]
pub struct Args {
    /// Directory where object payloads are stored (overrides SWIFTFS_STORAGE_DIR)
    #[arg(long)]
    pub storage_dir: Option<String>,

    /// Database URL (overrides SWIFTFS_DATABASE_URL)
    #[arg(long)]
    pub database_url: Option<String>,

    /// Files above this size are uploaded in segments, e.g. `5G`, `512M` (overrides SWIFTFS_CHUNK_SIZE)
    #[arg(long)]
    pub chunk_size: Option<String>,

    /// Concurrent deletions during purge (overrides SWIFTFS_TRANSFERS)
    #[arg(long)]
    pub transfers: Option<usize>,

    /// Don't probe the container before creating it
    #[arg(long)]
    pub no_check_container: bool,

    #[command(subcommand)]
    pub command: Command,
}

impl AppConfig {
    /// Parse environment variables + CLI args into AppConfig and the command to run.
    pub fn from_env_and_args() -> Result<(Self, Command)> {
        let args = Args::parse();

        // --- Environment fallback ---
        let env_storage =
            env::var("SWIFTFS_STORAGE_DIR").unwrap_or_else(|_| "./data/objects".into());
        let env_db = env::var("SWIFTFS_DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://./data/meta/swift_fs.db".into());
        let chunk_size = match args.chunk_size {
            Some(value) => parse_size(&value)
                .with_context(|| format!("parsing --chunk-size value `{}`", value))?,
            None => match env::var("SWIFTFS_CHUNK_SIZE") {
                Ok(value) => parse_size(&value)
                    .with_context(|| format!("parsing SWIFTFS_CHUNK_SIZE value `{}`", value))?,
                Err(env::VarError::NotPresent) => DEFAULT_CHUNK_SIZE,
                Err(err) => return Err(err).context("reading SWIFTFS_CHUNK_SIZE"),
            },
        };
        let transfers = match args.transfers {
            Some(n) => n,
            None => match env::var("SWIFTFS_TRANSFERS") {
                Ok(value) => value
                    .parse::<usize>()
                    .with_context(|| format!("parsing SWIFTFS_TRANSFERS value `{}`", value))?,
                Err(env::VarError::NotPresent) => DEFAULT_TRANSFERS,
                Err(err) => return Err(err).context("reading SWIFTFS_TRANSFERS"),
            },
        };
        let no_check_container = args.no_check_container
            || env::var("SWIFTFS_NO_CHECK_CONTAINER")
                .map(|v| matches!(v.as_str(), "1" | "true" | "yes"))
                .unwrap_or(false);

        if chunk_size == 0 {
            bail!("chunk size must be greater than zero");
        }

        // --- Merge ---
        let cfg = Self {
            storage_dir: args.storage_dir.unwrap_or(env_storage),
            database_url: args.database_url.unwrap_or(env_db),
            fs: FsOptions {
                chunk_size,
                no_check_container,
                transfers: transfers.max(1),
            },
        };

        Ok((cfg, args.command))
    }
}

/// Parse a byte count with an optional binary suffix: `1024`, `64k`,
/// `512M`, `5G`, `1T`. A trailing `B`/`iB` is accepted.
pub fn parse_size(value: &str) -> Result<u64> {
    let trimmed = value.trim();
    let lower = trimmed.to_ascii_lowercase();
    let lower = lower
        .strip_suffix("ib")
        .or_else(|| lower.strip_suffix('b'))
        .unwrap_or(&lower);
    let (digits, shift) = match lower.chars().last() {
        Some('k') => (&lower[..lower.len() - 1], 10),
        Some('m') => (&lower[..lower.len() - 1], 20),
        Some('g') => (&lower[..lower.len() - 1], 30),
        Some('t') => (&lower[..lower.len() - 1], 40),
        Some(_) => (lower, 0),
        None => bail!("empty size"),
    };
    let n: u64 = digits
        .trim()
        .parse()
        .with_context(|| format!("invalid size `{}`", trimmed))?;
    n.checked_mul(1u64 << shift)
        .with_context(|| format!("size `{}` overflows", trimmed))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_size() {
        assert_eq!(parse_size("1024").unwrap(), 1024);
        assert_eq!(parse_size("64k").unwrap(), 64 * 1024);
        assert_eq!(parse_size("512M").unwrap(), 512 * 1024 * 1024);
        assert_eq!(parse_size("5G").unwrap(), DEFAULT_CHUNK_SIZE);
        assert_eq!(parse_size("5GiB").unwrap(), DEFAULT_CHUNK_SIZE);
        assert_eq!(parse_size("1t").unwrap(), 1 << 40);
        assert!(parse_size("").is_err());
        assert!(parse_size("five").is_err());
        assert!(parse_size("99999999999T").is_err());
    }

    #[test]
    fn test_default_options() {
        let opts = FsOptions::default();
        assert_eq!(opts.chunk_size, 5 * 1024 * 1024 * 1024);
        assert!(!opts.no_check_container);
        assert_eq!(opts.transfers, DEFAULT_TRANSFERS);
    }
}
