//! Removal of large-object segments.

use super::{listing::PrefixWalker, swift_fs::SwiftFs};
use crate::{
    errors::Result,
    models::segment::{is_own_segment, segments_root},
};
use tracing::debug;

/// Delete the segments of `key` except those whose path below the key's
/// segment root starts with `except`, then drop the segments container if
/// it ended up empty. Segments of nested keys (`key/child`) share the root
/// and are left alone.
pub(crate) async fn reap_stale(fs: &SwiftFs, key: &str, except: &str) -> Result<()> {
    let client = fs.client();
    let container = fs.segments_container();
    let root = segments_root(key);
    let mut walker = PrefixWalker::new(client.clone(), container, &root, "", true);
    while let Some(page) = walker.next_page().await? {
        for segment in page {
            if !is_own_segment(&segment.remote) {
                continue;
            }
            if !except.is_empty() && segment.remote.starts_with(except) {
                continue;
            }
            debug!("removing segment {:?} in {:?}", segment.info.name, container);
            client.delete(container, &segment.info.name).await?;
        }
    }

    if client.delete_container(container).await.is_ok() {
        debug!("removed empty container {:?}", container);
    }
    Ok(())
}

/// Delete every segment of `key`.
pub(crate) async fn reap_all(fs: &SwiftFs, key: &str) -> Result<()> {
    reap_stale(fs, key, "").await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        backends::memory::MemoryClient,
        config::FsOptions,
        models::metadata::{Headers, OBJECT_MANIFEST_HEADER},
        services::object_handle::ObjectSource,
    };
    use chrono::Utc;
    use futures::TryStreamExt;
    use std::sync::Arc;

    async fn chunked_fs(client: &Arc<MemoryClient>) -> SwiftFs {
        let opts = FsOptions {
            chunk_size: 4,
            ..Default::default()
        };
        SwiftFs::new(client.clone(), "c", opts).await.unwrap()
    }

    fn source(remote: &str, size: u64) -> ObjectSource {
        ObjectSource {
            remote: remote.into(),
            size,
            mod_time: Utc::now(),
            content_type: None,
        }
    }

    #[tokio::test]
    async fn test_reap_stale_spares_current_prefix() {
        let client = Arc::new(MemoryClient::new());
        client.seed_container("c_segments");
        for key in ["k/1.5/1/00000000", "k/2.5/1/00000000", "k/2.5/1/00000001", "kk/1.5/1/00000000"] {
            client.seed_object("c_segments", key, b"x", "text/plain", Headers::new());
        }
        let fs = chunked_fs(&client).await;

        reap_stale(&fs, "k", "2.5/1/").await.unwrap();
        assert_eq!(
            client.keys("c_segments"),
            vec!["k/2.5/1/00000000", "k/2.5/1/00000001", "kk/1.5/1/00000000"]
        );

        reap_all(&fs, "k").await.unwrap();
        assert_eq!(client.keys("c_segments"), vec!["kk/1.5/1/00000000"]);
        assert!(client.has_container("c_segments"));

        reap_all(&fs, "kk").await.unwrap();
        assert!(!client.has_container("c_segments"));
    }

    #[tokio::test]
    async fn test_missing_segments_container_is_an_error() {
        let client = Arc::new(MemoryClient::new());
        let fs = chunked_fs(&client).await;
        assert!(reap_all(&fs, "k").await.is_err());
    }

    #[tokio::test]
    async fn test_reupload_replaces_old_segments() {
        let client = Arc::new(MemoryClient::new());
        let fs = chunked_fs(&client).await;

        let mut object = fs.put(&b"0123456789"[..], &source("k", 10)).await.unwrap();
        assert_eq!(client.keys("c_segments").len(), 3);
        let (_, first) = client.raw_object("c", "k").unwrap();

        object.update(&b"abcdef"[..], &source("k", 6)).await.unwrap();
        let (_, second) = client.raw_object("c", "k").unwrap();
        assert_ne!(first.get(OBJECT_MANIFEST_HEADER), second.get(OBJECT_MANIFEST_HEADER));
        let keys = client.keys("c_segments");
        assert_eq!(keys.len(), 2);
        assert!(keys.iter().all(|key| key.contains("/6/")), "{keys:?}");
        assert_eq!(object.size(), 6);

        object.update(&b"ab"[..], &source("k", 2)).await.unwrap();
        assert!(!client.has_container("c_segments"));
        assert_eq!(object.size(), 2);
        assert!(!object.is_large_object().await.unwrap());
    }

    #[tokio::test]
    async fn test_reaper_failure_does_not_fail_update() {
        let client = Arc::new(MemoryClient::new());
        let fs = chunked_fs(&client).await;
        let mut object = fs.put(&b"0123456789"[..], &source("k", 10)).await.unwrap();

        client.fail_deletes_in("c_segments");
        object.update(&b"ab"[..], &source("k", 2)).await.unwrap();
        assert_eq!(object.size(), 2);
        assert_eq!(client.keys("c_segments").len(), 3);
    }

    #[tokio::test]
    async fn test_overwrite_keeps_segments_of_nested_key() {
        let client = Arc::new(MemoryClient::new());
        let fs = chunked_fs(&client).await;
        let mut parent = fs.put(&b"0123456789"[..], &source("a", 10)).await.unwrap();
        fs.put(&b"abcdefghij"[..], &source("a/b", 10)).await.unwrap();
        assert_eq!(client.keys("c_segments").len(), 6);

        parent.update(&b"xy"[..], &source("a", 2)).await.unwrap();
        let keys = client.keys("c_segments");
        assert_eq!(keys.len(), 3);
        assert!(keys.iter().all(|key| key.starts_with("a/b/")), "{keys:?}");

        let child = fs.new_object("a/b").await.unwrap();
        assert_eq!(child.size(), 10);
        let chunks: Vec<bytes::Bytes> = child.open(None).await.unwrap().try_collect().await.unwrap();
        assert_eq!(chunks.concat(), b"abcdefghij");

        parent.remove().await.unwrap();
        assert_eq!(client.keys("c_segments").len(), 3);
        assert!(fs.new_object("a/b").await.is_ok());
    }

    #[tokio::test]
    async fn test_failed_container_delete_is_ignored() {
        let client = Arc::new(MemoryClient::new());
        client.seed_object("c_segments", "k/1.5/1/00000000", b"x", "text/plain", Headers::new());
        client.fail_delete_container("c_segments");
        let fs = chunked_fs(&client).await;

        reap_all(&fs, "k").await.unwrap();
        assert!(client.keys("c_segments").is_empty());
        assert!(client.has_container("c_segments"));
    }

    #[tokio::test]
    async fn test_remove_deletes_manifest_then_segments() {
        let client = Arc::new(MemoryClient::new());
        let fs = chunked_fs(&client).await;
        let mut object = fs.put(&b"0123456789"[..], &source("k", 10)).await.unwrap();
        client.clear_calls();

        object.remove().await.unwrap();
        assert!(client.keys("c").is_empty());
        assert!(!client.has_container("c_segments"));

        let deletes: Vec<_> = client
            .calls()
            .into_iter()
            .filter_map(|c| match c {
                crate::backends::memory::Call::Delete { container, .. } => Some(container),
                _ => None,
            })
            .collect();
        assert_eq!(deletes.first().map(String::as_str), Some("c"));
        assert_eq!(deletes.len(), 4);
    }
}
