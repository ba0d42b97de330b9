//! Object-level subcommands.
//! Uploads stream from the local file and downloads stream to `out`, so
//! payloads are never buffered whole.

use super::split_object_path;
use crate::{
    client::ObjectClient,
    config::FsOptions,
    services::{
        object_handle::ObjectSource,
        swift_fs::{HashType, SwiftFs},
    },
};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use futures::TryStreamExt;
use serde::Serialize;
use std::{io::Write, sync::Arc};

/// What `stat` reports about an object.
#[derive(Debug, Serialize)]
struct ObjectStat<'a> {
    path: &'a str,
    size: u64,
    content_type: &'a str,
    md5: String,
    mod_time: DateTime<Utc>,
    large_object: bool,
}

/// Open the adapter on the directory holding `path`; returns it with the
/// object's name.
async fn open_parent(
    client: Arc<dyn ObjectClient>,
    opts: FsOptions,
    path: &str,
) -> Result<(SwiftFs, String)> {
    let (root, name) = split_object_path(path)?;
    let fs = SwiftFs::new(client, &root, opts).await?;
    Ok((fs, name))
}

/// `put <local> <path>`
pub async fn put(
    client: Arc<dyn ObjectClient>,
    opts: FsOptions,
    local: &str,
    path: &str,
    out: &mut dyn Write,
) -> Result<()> {
    let file = tokio::fs::File::open(local)
        .await
        .with_context(|| format!("opening `{}`", local))?;
    let meta = file.metadata().await?;
    let mod_time = meta
        .modified()
        .map(DateTime::<Utc>::from)
        .unwrap_or_else(|_| Utc::now());

    let (fs, name) = open_parent(client, opts, path).await?;
    let src = ObjectSource {
        remote: name,
        size: meta.len(),
        mod_time,
        content_type: None,
    };
    let object = fs
        .put(file, &src)
        .await
        .with_context(|| format!("uploading `{}` to `{}`", local, path))?;
    writeln!(out, "uploaded {} ({} bytes)", path, object.size())?;
    Ok(())
}

/// `cat <path> [--offset N] [--count N]`
pub async fn cat(
    client: Arc<dyn ObjectClient>,
    opts: FsOptions,
    path: &str,
    offset: Option<u64>,
    count: Option<u64>,
    out: &mut dyn Write,
) -> Result<()> {
    let (fs, name) = open_parent(client, opts, path).await?;
    let object = fs.new_object(&name).await?;
    let range = match (offset, count) {
        (None, None) => None,
        (offset, count) => {
            let start = offset.unwrap_or(0);
            let end = match count {
                Some(count) => start.saturating_add(count),
                None => object.size(),
            };
            Some(start..end)
        }
    };

    let mut stream = object.open(range).await?;
    while let Some(chunk) = stream.try_next().await? {
        out.write_all(&chunk)?;
    }
    out.flush()?;
    Ok(())
}

/// `rm <path>`
pub async fn rm(
    client: Arc<dyn ObjectClient>,
    opts: FsOptions,
    path: &str,
    out: &mut dyn Write,
) -> Result<()> {
    let (fs, name) = open_parent(client, opts, path).await?;
    let mut object = fs.new_object(&name).await?;
    object
        .remove()
        .await
        .with_context(|| format!("removing `{}`", path))?;
    writeln!(out, "deleted {}", path)?;
    Ok(())
}

/// `stat <path>`: metadata as pretty JSON.
pub async fn stat(
    client: Arc<dyn ObjectClient>,
    opts: FsOptions,
    path: &str,
    out: &mut dyn Write,
) -> Result<()> {
    let (fs, name) = open_parent(client, opts, path).await?;
    let mut object = fs.new_object(&name).await?;
    let md5 = object.hash(HashType::Md5).await?;
    let large_object = object.is_large_object().await?;
    let mod_time = object.mod_time().await;

    let stat = ObjectStat {
        path,
        size: object.size(),
        content_type: object.mime_type(),
        md5,
        mod_time,
        large_object,
    };
    serde_json::to_writer_pretty(&mut *out, &stat)?;
    writeln!(out)?;
    Ok(())
}

/// `touch <path> [--time RFC3339]`
pub async fn touch(
    client: Arc<dyn ObjectClient>,
    opts: FsOptions,
    path: &str,
    time: Option<&str>,
    out: &mut dyn Write,
) -> Result<()> {
    let t = match time {
        Some(value) => DateTime::parse_from_rfc3339(value)
            .with_context(|| format!("parsing time `{}`", value))?
            .with_timezone(&Utc),
        None => Utc::now(),
    };
    let (fs, name) = open_parent(client, opts, path).await?;
    match fs.new_object(&name).await {
        Ok(mut object) => object.set_mod_time(t).await?,
        Err(err) if err.is_not_found() => {
            let src = ObjectSource {
                remote: name.clone(),
                size: 0,
                mod_time: t,
                content_type: None,
            };
            fs.put(tokio::io::empty(), &src).await?;
        }
        Err(err) => return Err(err.into()),
    }
    writeln!(out, "touched {} at {}", path, t.to_rfc3339())?;
    Ok(())
}

/// `copy <src> <dst>`: server-side copy within the store.
pub async fn copy(
    client: Arc<dyn ObjectClient>,
    opts: FsOptions,
    src: &str,
    dst: &str,
    out: &mut dyn Write,
) -> Result<()> {
    let (src_fs, src_name) = open_parent(client.clone(), opts.clone(), src).await?;
    let (dst_fs, dst_name) = open_parent(client, opts, dst).await?;
    let object = src_fs.new_object(&src_name).await?;
    let copied = dst_fs
        .copy(&object, &dst_name)
        .await
        .with_context(|| format!("copying `{}` to `{}`", src, dst))?;
    writeln!(out, "copied {} to {} ({} bytes)", src, dst, copied.size())?;
    Ok(())
}
