//! Directory-level subcommands: listings and container management.

use crate::{
    client::ObjectClient,
    config::FsOptions,
    errors::Error,
    models::entry::DirEntry,
    services::swift_fs::SwiftFs,
};
use anyhow::{Context, Result};
use std::{io::Write, sync::Arc};

fn write_entry(out: &mut dyn Write, entry: &DirEntry) -> std::io::Result<()> {
    match entry {
        DirEntry::File(object) => writeln!(out, "{:>9} {}", object.size(), object.remote()),
        DirEntry::Directory(dir) => writeln!(out, "{:>9} {}/", dir.bytes, dir.name),
    }
}

/// `ls <path>`: one directory level, or the object itself if `path`
/// names one.
pub async fn ls(
    client: Arc<dyn ObjectClient>,
    opts: FsOptions,
    path: &str,
    out: &mut dyn Write,
) -> Result<()> {
    let fs = SwiftFs::new(client, path, opts).await?;
    if fs.root_is_file() {
        let name = path.trim_end_matches('/').rsplit('/').next().unwrap_or(path);
        let object = fs.new_object(name).await?;
        writeln!(out, "{:>9} {}", object.size(), object.remote())?;
        return Ok(());
    }
    let entries = fs
        .list("")
        .await
        .with_context(|| format!("listing `{}`", path))?;
    for entry in &entries {
        write_entry(out, entry)?;
    }
    Ok(())
}

/// `lsd`: containers with size and object count.
pub async fn lsd(client: Arc<dyn ObjectClient>, opts: FsOptions, out: &mut dyn Write) -> Result<()> {
    let fs = SwiftFs::new(client, "", opts).await?;
    for entry in fs.list("").await? {
        if let DirEntry::Directory(dir) = entry {
            writeln!(
                out,
                "{:>12} {:>9} {}",
                dir.bytes,
                dir.items.unwrap_or(0),
                dir.name
            )?;
        }
    }
    Ok(())
}

/// `lsr <path>`: every object below `path`, as pages arrive.
pub async fn lsr(
    client: Arc<dyn ObjectClient>,
    opts: FsOptions,
    path: &str,
    out: &mut dyn Write,
) -> Result<()> {
    let fs = SwiftFs::new(client, path, opts).await?;
    fs.list_r("", |entry| {
        write_entry(out, &entry).map_err(|err| Error::Fatal(format!("writing listing: {err}")))
    })
    .await
    .with_context(|| format!("listing `{}` recursively", path))?;
    Ok(())
}

pub async fn mkdir(
    client: Arc<dyn ObjectClient>,
    opts: FsOptions,
    path: &str,
    out: &mut dyn Write,
) -> Result<()> {
    let fs = SwiftFs::new(client, path, opts).await?;
    fs.mkdir("").await?;
    writeln!(out, "created {}", fs.container())?;
    Ok(())
}

pub async fn rmdir(
    client: Arc<dyn ObjectClient>,
    opts: FsOptions,
    path: &str,
    out: &mut dyn Write,
) -> Result<()> {
    let fs = SwiftFs::new(client, path, opts).await?;
    fs.rmdir("")
        .await
        .with_context(|| format!("removing `{}`", path))?;
    writeln!(out, "removed {}", path)?;
    Ok(())
}

/// `purge <path>`: delete everything below `path`, and the container when
/// `path` is one.
pub async fn purge(
    client: Arc<dyn ObjectClient>,
    opts: FsOptions,
    path: &str,
    out: &mut dyn Write,
) -> Result<()> {
    let fs = SwiftFs::new(client, path, opts).await?;
    fs.purge()
        .await
        .with_context(|| format!("purging `{}`", path))?;
    writeln!(out, "purged {}", path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{backends::memory::MemoryClient, models::metadata::Headers};

    fn seeded() -> Arc<MemoryClient> {
        let client = Arc::new(MemoryClient::new());
        for key in ["a/b", "a/c/d", "top"] {
            client.seed_object("photos", key, b"1234", "text/plain", Headers::new());
        }
        client
    }

    fn text(out: Vec<u8>) -> String {
        String::from_utf8(out).unwrap()
    }

    #[tokio::test]
    async fn test_ls_directory_and_file() {
        let client = seeded();
        let mut out = Vec::new();
        ls(client.clone(), FsOptions::default(), "photos/a", &mut out)
            .await
            .unwrap();
        assert_eq!(text(out), "        4 b\n        4 c/\n");

        let mut out = Vec::new();
        ls(client, FsOptions::default(), "photos/top", &mut out)
            .await
            .unwrap();
        assert_eq!(text(out), "        4 top\n");
    }

    #[tokio::test]
    async fn test_lsd_and_lsr() {
        let client = seeded();
        let mut out = Vec::new();
        lsd(client.clone(), FsOptions::default(), &mut out).await.unwrap();
        assert_eq!(text(out), "          12         3 photos\n");

        let mut out = Vec::new();
        lsr(client, FsOptions::default(), "photos", &mut out)
            .await
            .unwrap();
        assert_eq!(text(out), "        4 a/b\n        4 a/c/d\n        4 top\n");
    }

    #[tokio::test]
    async fn test_mkdir_purge_rmdir() {
        let client = seeded();
        let mut out = Vec::new();
        mkdir(client.clone(), FsOptions::default(), "fresh", &mut out)
            .await
            .unwrap();
        assert!(client.has_container("fresh"));

        assert!(
            rmdir(client.clone(), FsOptions::default(), "photos", &mut out)
                .await
                .is_err()
        );
        purge(client.clone(), FsOptions::default(), "photos", &mut out)
            .await
            .unwrap();
        assert!(!client.has_container("photos"));

        rmdir(client.clone(), FsOptions::default(), "fresh", &mut out)
            .await
            .unwrap();
        assert!(!client.has_container("fresh"));
    }
}
