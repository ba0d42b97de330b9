//! LocalStore: an object store backed by SQLite for metadata and the local
//! disk for payloads.
//!
//! Payloads are sharded beneath `base_path/{container}/{aa}/{bb}/{digest}`
//! where `digest` is the MD5 of `container/key`, so keys containing `/` or
//! ending in `/` (directory markers) never collide with directory names.
//! Large objects are resolved the way a Swift proxy does it: a `HEAD`/`GET`
//! on a key carrying `X-Object-Manifest` concatenates the referenced
//! segments in key order.

use super::{PageBuilder, list_start, slice_stream};
use crate::{
    client::{Body, ByteStream, ClientError, ClientResult, ListOpts, ObjectClient},
    models::{
        container::ContainerInfo,
        metadata::{Headers, OBJECT_MANIFEST_HEADER},
        object::ObjectInfo,
    },
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::{StreamExt, TryStreamExt};
use md5::Context;
use percent_encoding::percent_decode_str;
use sqlx::{
    FromRow, SqlitePool,
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
};
use std::{
    io::{self, ErrorKind},
    ops::Range,
    path::{Path, PathBuf},
    str::FromStr,
    sync::Arc,
};
use tokio::{
    fs::{self, File},
    io::{AsyncReadExt, AsyncWriteExt},
};
use tokio_util::io::{ReaderStream, StreamReader};
use tracing::debug;
use uuid::Uuid;

const MIGRATION: &str = include_str!("../../migrations/0001_init.sql");
const MAX_OBJECT_KEY_LEN: usize = 1024;
const MAX_CONTAINER_NAME_LEN: usize = 256;
const COPY_BUFFER_LEN: usize = 64 * 1024;

#[derive(FromRow, Debug)]
struct ObjectRow {
    key: String,
    size_bytes: i64,
    content_type: String,
    etag: String,
    last_modified: DateTime<Utc>,
    headers: String,
}

impl ObjectRow {
    fn headers(&self) -> ClientResult<Headers> {
        Ok(serde_json::from_str(&self.headers)?)
    }

    fn into_info(self) -> ObjectInfo {
        ObjectInfo {
            name: self.key,
            bytes: self.size_bytes.max(0) as u64,
            content_type: self.content_type,
            hash: self.etag,
            last_modified: self.last_modified,
            count: None,
        }
    }
}

#[derive(FromRow)]
struct ContainerRow {
    name: String,
    count: i64,
    bytes: i64,
}

impl From<ContainerRow> for ContainerInfo {
    fn from(row: ContainerRow) -> Self {
        Self {
            name: row.name,
            bytes: row.bytes.max(0) as u64,
            count: row.count.max(0) as u64,
        }
    }
}

/// Object store persisted under a local directory.
#[derive(Clone)]
pub struct LocalStore {
    /// Shared SQLite connection pool used for metadata operations.
    pub db: Arc<SqlitePool>,

    /// Base directory on disk where object payloads are stored.
    pub base_path: PathBuf,
}

impl LocalStore {
    pub fn new(db: Arc<SqlitePool>, base_path: impl Into<PathBuf>) -> Self {
        Self {
            db,
            base_path: base_path.into(),
        }
    }

    /// Connect to `database_url` (created if missing), make sure the payload
    /// directory exists and apply the schema.
    pub async fn connect(database_url: &str, base_path: impl Into<PathBuf>) -> ClientResult<Self> {
        let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;
        Self::open(pool, base_path).await
    }

    /// Wrap an existing pool, creating the payload directory and schema.
    pub async fn open(pool: SqlitePool, base_path: impl Into<PathBuf>) -> ClientResult<Self> {
        let store = Self::new(Arc::new(pool), base_path);
        fs::create_dir_all(&store.base_path).await?;
        store.run_migrations().await?;
        Ok(store)
    }

    /// Apply the embedded schema statement by statement.
    pub async fn run_migrations(&self) -> ClientResult<()> {
        let statements = MIGRATION
            .split(';')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>();
        debug!("running {} migration statements", statements.len());
        for stmt in statements {
            sqlx::query(stmt).execute(&*self.db).await?;
        }
        Ok(())
    }

    /// Reject empty, oversized or control-character keys.
    fn ensure_key_safe(&self, key: &str) -> ClientResult<()> {
        let reason = if key.is_empty() {
            Some("must not be empty")
        } else if key.len() > MAX_OBJECT_KEY_LEN {
            Some("must be at most 1024 bytes")
        } else if key.bytes().any(|b| b.is_ascii_control()) {
            Some("must not contain control characters")
        } else {
            None
        };
        match reason {
            Some(reason) => Err(ClientError::InvalidName {
                name: key.to_string(),
                reason: reason.into(),
            }),
            None => Ok(()),
        }
    }

    /// Container names become directory names, so they must be a single
    /// path component.
    fn ensure_container_name_safe(&self, name: &str) -> ClientResult<()> {
        let reason = if name.is_empty() {
            Some("must not be empty")
        } else if name.len() > MAX_CONTAINER_NAME_LEN {
            Some("must be at most 256 bytes")
        } else if name.contains('/') || name.contains('\\') {
            Some("must not contain path separators")
        } else if name == "." || name == ".." {
            Some("must not be a relative path component")
        } else if name.bytes().any(|b| b.is_ascii_control()) {
            Some("must not contain control characters")
        } else {
            None
        };
        match reason {
            Some(reason) => Err(ClientError::InvalidName {
                name: name.to_string(),
                reason: reason.into(),
            }),
            None => Ok(()),
        }
    }

    fn container_root(&self, container: &str) -> PathBuf {
        self.base_path.join(container)
    }

    /// Payload path: `base_path/{container}/{aa}/{bb}/{md5(container/key)}`.
    fn object_path(&self, container: &str, key: &str) -> PathBuf {
        let digest = format!("{:x}", md5::compute(format!("{container}/{key}")));
        let mut path = self.container_root(container);
        path.push(&digest[0..2]);
        path.push(&digest[2..4]);
        path.push(&digest);
        path
    }

    async fn fetch_container(&self, container: &str) -> ClientResult<()> {
        self.ensure_container_name_safe(container)?;
        sqlx::query_scalar::<_, String>("SELECT name FROM containers WHERE name = ?")
            .bind(container)
            .fetch_optional(&*self.db)
            .await?
            .map(|_| ())
            .ok_or(ClientError::ContainerNotFound)
    }

    async fn fetch_row(&self, container: &str, key: &str) -> ClientResult<ObjectRow> {
        sqlx::query_as::<_, ObjectRow>(
            "SELECT key, size_bytes, content_type, etag, last_modified, headers
             FROM objects WHERE container = ? AND key = ?",
        )
        .bind(container)
        .bind(key)
        .fetch_optional(&*self.db)
        .await?
        .ok_or(ClientError::ObjectNotFound)
    }

    /// Rows referenced by a manifest header value, in key order.
    async fn segment_rows(&self, manifest: &str) -> ClientResult<(String, Vec<ObjectRow>)> {
        let decoded = percent_decode_str(manifest).decode_utf8_lossy();
        let Some((container, prefix)) = decoded.split_once('/') else {
            return Ok((decoded.to_string(), Vec::new()));
        };
        let rows = sqlx::query_as::<_, ObjectRow>(
            "SELECT key, size_bytes, content_type, etag, last_modified, headers
             FROM objects WHERE container = ? AND substr(key, 1, ?) = ?
             ORDER BY key ASC",
        )
        .bind(container)
        .bind(prefix.chars().count() as i64)
        .bind(prefix)
        .fetch_all(&*self.db)
        .await?;
        Ok((container.to_string(), rows))
    }

    /// Write `body` into place at `path` through a temporary file, returning
    /// the byte count and MD5 etag. The existing payload is left untouched if
    /// the body length differs from `expected`.
    async fn write_payload(
        &self,
        path: &Path,
        body: Body<'_>,
        expected: Option<u64>,
    ) -> ClientResult<(u64, String)> {
        let parent = path.parent().map(Path::to_path_buf).ok_or_else(|| {
            ClientError::Io(io::Error::new(
                ErrorKind::Other,
                "object path missing parent directory",
            ))
        })?;
        fs::create_dir_all(&parent).await?;
        let tmp_path = parent.join(format!(".tmp-{}", Uuid::new_v4()));

        let (written, etag) = match Self::stream_to_file(&tmp_path, body).await {
            Ok(written) => written,
            Err(err) => {
                let _ = fs::remove_file(&tmp_path).await;
                return Err(ClientError::Io(err));
            }
        };
        if let Some(expected) = expected {
            if written != expected {
                let _ = fs::remove_file(&tmp_path).await;
                return Err(ClientError::LengthMismatch {
                    expected,
                    actual: written,
                });
            }
        }

        if let Err(err) = fs::rename(&tmp_path, path).await {
            if err.kind() == ErrorKind::AlreadyExists {
                fs::remove_file(path).await?;
                fs::rename(&tmp_path, path).await?;
            } else {
                let _ = fs::remove_file(&tmp_path).await;
                return Err(ClientError::Io(err));
            }
        }
        Ok((written, etag))
    }

    async fn stream_to_file(tmp_path: &Path, body: Body<'_>) -> io::Result<(u64, String)> {
        let mut file = File::create(tmp_path).await?;
        let mut digest = Context::new();
        let mut buf = vec![0u8; COPY_BUFFER_LEN];
        let mut size_bytes = 0u64;
        loop {
            let n = body.read(&mut buf).await?;
            if n == 0 {
                break;
            }
            digest.consume(&buf[..n]);
            file.write_all(&buf[..n]).await?;
            size_bytes += n as u64;
        }
        file.flush().await?;
        file.sync_all().await?;
        Ok((size_bytes, format!("{:x}", digest.compute())))
    }

    /// Insert or overwrite a metadata row (Swift overwrite semantics).
    async fn upsert_object(
        &self,
        container: &str,
        key: &str,
        size_bytes: u64,
        content_type: &str,
        etag: &str,
        headers: &Headers,
    ) -> ClientResult<()> {
        sqlx::query(
            r#"
            INSERT INTO objects (
                container, key, size_bytes, content_type, etag, last_modified, headers
            ) VALUES (?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(container, key) DO UPDATE SET
                size_bytes = excluded.size_bytes,
                content_type = excluded.content_type,
                etag = excluded.etag,
                last_modified = excluded.last_modified,
                headers = excluded.headers
            "#,
        )
        .bind(container)
        .bind(key)
        .bind(size_bytes as i64)
        .bind(content_type)
        .bind(etag)
        .bind(Utc::now())
        .bind(serde_json::to_string(headers)?)
        .execute(&*self.db)
        .await?;
        Ok(())
    }

    /// Recursively remove empty directories up to the container root.
    async fn prune_empty_dirs(&self, start: &Path, stop: &Path) {
        let mut current = start.to_path_buf();
        while current.starts_with(stop) && current != stop {
            match fs::remove_dir(&current).await {
                Ok(_) => {
                    if let Some(parent) = current.parent() {
                        current = parent.to_path_buf();
                    } else {
                        break;
                    }
                }
                Err(err) if err.kind() == ErrorKind::NotFound => break,
                Err(err) if err.kind() == ErrorKind::DirectoryNotEmpty => break,
                Err(err) => {
                    debug!("failed to prune directory {}: {}", current.display(), err);
                    break;
                }
            }
        }
    }
}

/// Return true if SQLx error indicates a unique constraint violation.
fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(
        err,
        sqlx::Error::Database(db_err) if db_err.message().to_ascii_lowercase().contains("unique")
    )
}

#[async_trait]
impl ObjectClient for LocalStore {
    async fn list_containers(&self) -> ClientResult<Vec<ContainerInfo>> {
        let rows = sqlx::query_as::<_, ContainerRow>(
            "SELECT c.name AS name, COUNT(o.key) AS count, COALESCE(SUM(o.size_bytes), 0) AS bytes
             FROM containers c LEFT JOIN objects o ON o.container = c.name
             GROUP BY c.name ORDER BY c.name ASC",
        )
        .fetch_all(&*self.db)
        .await?;
        Ok(rows.into_iter().map(ContainerInfo::from).collect())
    }

    async fn container_info(&self, container: &str) -> ClientResult<ContainerInfo> {
        self.fetch_container(container).await?;
        let row = sqlx::query_as::<_, ContainerRow>(
            "SELECT ? AS name, COUNT(key) AS count, COALESCE(SUM(size_bytes), 0) AS bytes
             FROM objects WHERE container = ?",
        )
        .bind(container)
        .bind(container)
        .fetch_one(&*self.db)
        .await?;
        Ok(row.into())
    }

    async fn create_container(&self, container: &str) -> ClientResult<()> {
        self.ensure_container_name_safe(container)?;
        fs::create_dir_all(self.container_root(container)).await?;
        match sqlx::query("INSERT INTO containers (name, created_at) VALUES (?, ?)")
            .bind(container)
            .bind(Utc::now())
            .execute(&*self.db)
            .await
        {
            Ok(_) => Ok(()),
            Err(err) if is_unique_violation(&err) => Err(ClientError::ContainerExists),
            Err(err) => Err(ClientError::Sqlx(err)),
        }
    }

    async fn delete_container(&self, container: &str) -> ClientResult<()> {
        self.fetch_container(container).await?;
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM objects WHERE container = ?")
            .bind(container)
            .fetch_one(&*self.db)
            .await?;
        if count > 0 {
            return Err(ClientError::ContainerNotEmpty);
        }

        let result = sqlx::query("DELETE FROM containers WHERE name = ?")
            .bind(container)
            .execute(&*self.db)
            .await?;
        if result.rows_affected() == 0 {
            return Err(ClientError::ContainerNotFound);
        }

        let root = self.container_root(container);
        if let Err(err) = fs::remove_dir_all(&root).await {
            if err.kind() != ErrorKind::NotFound {
                debug!(
                    "failed to remove container directory {} after delete: {}",
                    root.display(),
                    err
                );
            }
        }
        Ok(())
    }

    async fn list(&self, container: &str, opts: &ListOpts) -> ClientResult<Vec<ObjectInfo>> {
        self.fetch_container(container).await?;
        let start = list_start(opts).max(opts.prefix.as_str());
        let mut builder = PageBuilder::new(opts);
        let mut rows = sqlx::query_as::<_, ObjectRow>(
            "SELECT key, size_bytes, content_type, etag, last_modified, headers
             FROM objects
             WHERE container = ? AND key >= ? AND substr(key, 1, ?) = ?
             ORDER BY key ASC",
        )
        .bind(container)
        .bind(start)
        .bind(opts.prefix.chars().count() as i64)
        .bind(&opts.prefix)
        .fetch(&*self.db);

        while let Some(row) = rows.try_next().await? {
            if opts.marker.as_deref() == Some(row.key.as_str()) {
                continue;
            }
            if !builder.push(row.into_info()) {
                break;
            }
        }
        Ok(builder.finish())
    }

    async fn head(&self, container: &str, key: &str) -> ClientResult<(ObjectInfo, Headers)> {
        self.fetch_container(container).await?;
        let row = self.fetch_row(container, key).await?;
        let headers = row.headers()?;
        let mut info = row.into_info();
        if let Some(manifest) = headers.get(OBJECT_MANIFEST_HEADER) {
            let (_, segments) = self.segment_rows(manifest).await?;
            let mut etags = String::new();
            info.bytes = 0;
            for segment in &segments {
                info.bytes += segment.size_bytes.max(0) as u64;
                etags.push_str(&segment.etag);
            }
            info.hash = format!("{:x}", md5::compute(etags));
        }
        Ok((info, headers))
    }

    async fn get(
        &self,
        container: &str,
        key: &str,
        range: Option<Range<u64>>,
    ) -> ClientResult<ByteStream> {
        self.fetch_container(container).await?;
        let row = self.fetch_row(container, key).await?;
        let headers = row.headers()?;

        let stream: ByteStream = match headers.get(OBJECT_MANIFEST_HEADER) {
            Some(manifest) => {
                let (segment_container, segments) = self.segment_rows(manifest).await?;
                let paths: Vec<PathBuf> = segments
                    .iter()
                    .map(|segment| self.object_path(&segment_container, &segment.key))
                    .collect();
                Box::pin(
                    futures::stream::iter(paths)
                        .then(|path| async move { File::open(path).await.map(ReaderStream::new) })
                        .try_flatten(),
                )
            }
            None => {
                let file_path = self.object_path(container, key);
                let file = File::open(&file_path).await.map_err(|err| {
                    if err.kind() == ErrorKind::NotFound {
                        ClientError::ObjectNotFound
                    } else {
                        ClientError::Io(err)
                    }
                })?;
                Box::pin(ReaderStream::new(file))
            }
        };

        Ok(match range {
            Some(range) => slice_stream(stream, range),
            None => stream,
        })
    }

    async fn put(
        &self,
        container: &str,
        key: &str,
        body: Body<'_>,
        size: u64,
        content_type: Option<&str>,
        headers: &Headers,
    ) -> ClientResult<String> {
        self.ensure_key_safe(key)?;
        self.fetch_container(container).await?;

        let file_path = self.object_path(container, key);
        let (written, etag) = self.write_payload(&file_path, body, Some(size)).await?;

        let content_type = content_type.unwrap_or("application/octet-stream");
        if let Err(err) = self
            .upsert_object(container, key, written, content_type, &etag, headers)
            .await
        {
            let _ = fs::remove_file(&file_path).await;
            return Err(err);
        }
        debug!("stored {}/{} ({} bytes)", container, key, written);
        Ok(etag)
    }

    async fn post(&self, container: &str, key: &str, headers: &Headers) -> ClientResult<()> {
        self.fetch_container(container).await?;
        let result = sqlx::query("UPDATE objects SET headers = ? WHERE container = ? AND key = ?")
            .bind(serde_json::to_string(headers)?)
            .bind(container)
            .bind(key)
            .execute(&*self.db)
            .await?;
        if result.rows_affected() == 0 {
            return Err(ClientError::ObjectNotFound);
        }
        Ok(())
    }

    async fn delete(&self, container: &str, key: &str) -> ClientResult<()> {
        self.fetch_container(container).await?;
        let result = sqlx::query("DELETE FROM objects WHERE container = ? AND key = ?")
            .bind(container)
            .bind(key)
            .execute(&*self.db)
            .await?;
        if result.rows_affected() == 0 {
            return Err(ClientError::ObjectNotFound);
        }

        let file_path = self.object_path(container, key);
        match fs::remove_file(&file_path).await {
            Ok(_) => debug!("removed physical file {}", file_path.display()),
            Err(err) if err.kind() == ErrorKind::NotFound => {
                debug!("file {} already missing", file_path.display());
            }
            Err(err) => return Err(ClientError::Io(err)),
        }

        if let Some(parent) = file_path.parent() {
            let root = self.container_root(container);
            self.prune_empty_dirs(parent, &root).await;
        }
        Ok(())
    }

    async fn copy(
        &self,
        src_container: &str,
        src_key: &str,
        dst_container: &str,
        dst_key: &str,
    ) -> ClientResult<()> {
        self.ensure_key_safe(dst_key)?;
        self.fetch_container(dst_container).await?;
        let src = self.fetch_row(src_container, src_key).await?;
        let mut headers = src.headers()?;
        // The copy materializes a large object's content.
        headers.remove(OBJECT_MANIFEST_HEADER);

        let mut reader = StreamReader::new(self.get(src_container, src_key, None).await?);
        let file_path = self.object_path(dst_container, dst_key);
        let (written, etag) = self.write_payload(&file_path, &mut reader, None).await?;
        if let Err(err) = self
            .upsert_object(dst_container, dst_key, written, &src.content_type, &etag, &headers)
            .await
        {
            let _ = fs::remove_file(&file_path).await;
            return Err(err);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::metadata::MTIME_HEADER;
    use bytes::Bytes;

    async fn store(dir: &tempfile::TempDir) -> LocalStore {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        LocalStore::open(pool, dir.path().join("objects")).await.unwrap()
    }

    async fn put(store: &LocalStore, container: &str, key: &str, data: &[u8], headers: &Headers) {
        let mut body = data;
        store
            .put(container, key, &mut body, data.len() as u64, Some("text/plain"), headers)
            .await
            .unwrap();
    }

    async fn read_all(store: &LocalStore, container: &str, key: &str, range: Option<Range<u64>>) -> Vec<u8> {
        let chunks: Vec<Bytes> = store
            .get(container, key, range)
            .await
            .unwrap()
            .try_collect()
            .await
            .unwrap();
        chunks.concat()
    }

    #[tokio::test]
    async fn test_put_head_get_delete() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(&dir).await;
        store.create_container("photos").await.unwrap();

        let mut headers = Headers::new();
        headers.insert(MTIME_HEADER, "1600000000.5");
        put(&store, "photos", "2025/img.jpg", b"hello world", &headers).await;

        let (info, got_headers) = store.head("photos", "2025/img.jpg").await.unwrap();
        assert_eq!(info.bytes, 11);
        assert_eq!(info.hash, format!("{:x}", md5::compute(b"hello world")));
        assert_eq!(got_headers.get(MTIME_HEADER), Some("1600000000.5"));

        assert_eq!(read_all(&store, "photos", "2025/img.jpg", None).await, b"hello world");
        assert_eq!(read_all(&store, "photos", "2025/img.jpg", Some(6..11)).await, b"world");

        store.delete("photos", "2025/img.jpg").await.unwrap();
        assert!(matches!(
            store.head("photos", "2025/img.jpg").await,
            Err(ClientError::ObjectNotFound)
        ));
        assert!(matches!(
            store.delete("photos", "2025/img.jpg").await,
            Err(ClientError::ObjectNotFound)
        ));
    }

    #[tokio::test]
    async fn test_create_container_twice() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(&dir).await;
        store.create_container("c").await.unwrap();
        assert!(matches!(
            store.create_container("c").await,
            Err(ClientError::ContainerExists)
        ));
        assert!(matches!(
            store.create_container("a/b").await,
            Err(ClientError::InvalidName { .. })
        ));
    }

    #[tokio::test]
    async fn test_list_with_delimiter_and_marker() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(&dir).await;
        store.create_container("c").await.unwrap();
        for key in ["a/b", "a/c", "a/d/e", "a/d/f", "z"] {
            put(&store, "c", key, b"12", &Headers::new()).await;
        }

        let opts = ListOpts {
            prefix: "a/".into(),
            delimiter: Some('/'),
            limit: 1000,
            marker: None,
        };
        let page = store.list("c", &opts).await.unwrap();
        let names: Vec<_> = page.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, vec!["a/b", "a/c", "a/d/"]);
        assert_eq!(page[2].bytes, 4);
        assert_eq!(page[2].count, Some(2));

        let opts = ListOpts {
            prefix: String::new(),
            delimiter: None,
            limit: 2,
            marker: Some("a/c".into()),
        };
        let page = store.list("c", &opts).await.unwrap();
        let names: Vec<_> = page.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, vec!["a/d/e", "a/d/f"]);

        assert!(matches!(
            store.list("missing", &opts).await,
            Err(ClientError::ContainerNotFound)
        ));
    }

    #[tokio::test]
    async fn test_manifest_concatenates_segments() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(&dir).await;
        store.create_container("c").await.unwrap();
        store.create_container("c_segments").await.unwrap();
        put(&store, "c_segments", "big/1/6/00000000", b"abc", &Headers::new()).await;
        put(&store, "c_segments", "big/1/6/00000001", b"def", &Headers::new()).await;
        let mut manifest = Headers::new();
        manifest.insert(OBJECT_MANIFEST_HEADER, "c%5Fsegments/big/1/6");
        put(&store, "c", "big", b"", &manifest).await;

        let (info, _) = store.head("c", "big").await.unwrap();
        assert_eq!(info.bytes, 6);
        let listed = store
            .list("c", &ListOpts { limit: 10, ..Default::default() })
            .await
            .unwrap();
        assert_eq!(listed[0].bytes, 0);
        assert_eq!(read_all(&store, "c", "big", None).await, b"abcdef");
        assert_eq!(read_all(&store, "c", "big", Some(2..4)).await, b"cd");

        store.copy("c", "big", "c", "copy").await.unwrap();
        let (info, headers) = store.head("c", "copy").await.unwrap();
        assert_eq!(info.bytes, 6);
        assert!(!headers.contains(OBJECT_MANIFEST_HEADER));
    }

    #[tokio::test]
    async fn test_put_length_mismatch_and_container_rules() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(&dir).await;
        store.create_container("c").await.unwrap();

        let mut body: &[u8] = b"abc";
        let err = store
            .put("c", "k", &mut body, 10, None, &Headers::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::LengthMismatch { expected: 10, actual: 3 }));
        assert!(matches!(store.head("c", "k").await, Err(ClientError::ObjectNotFound)));

        put(&store, "c", "k", b"abc", &Headers::new()).await;
        assert!(matches!(
            store.delete_container("c").await,
            Err(ClientError::ContainerNotEmpty)
        ));
        let info = store.container_info("c").await.unwrap();
        assert_eq!((info.count, info.bytes), (1, 3));

        store.delete("c", "k").await.unwrap();
        store.delete_container("c").await.unwrap();
        assert!(store.list_containers().await.unwrap().is_empty());
    }
}
