//! Chunked upload of objects above the chunk size.

use super::{container::create_container, swift_fs::SwiftFs};
use crate::{
    errors::Result,
    models::{
        metadata::{Headers, OBJECT_MANIFEST_HEADER},
        segment::{UniquePrefix, manifest_value, segment_key, segments_path},
    },
};
use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::debug;

/// Upload `size` bytes from `reader` to `key` as a dynamic large object.
///
/// Segments of at most `chunk_size` bytes go to the segments container,
/// followed by a zero-byte manifest at `key`. Returns the unique prefix of
/// this attempt with its trailing `/`. Segments already written stay behind
/// if a later step fails.
pub(crate) async fn upload_chunks<R>(
    fs: &SwiftFs,
    key: &str,
    reader: &mut R,
    headers: &Headers,
    size: u64,
    content_type: &str,
) -> Result<String>
where
    R: AsyncRead + Send + Unpin,
{
    let client = fs.client();
    create_container(client.as_ref(), fs.segments_container()).await?;

    let chunk_size = fs.options().chunk_size;
    let prefix = UniquePrefix::new(size);
    let path = segments_path(key, &prefix);

    let mut left = size;
    let mut index = 0;
    while left > 0 {
        let n = left.min(chunk_size);
        let segment = segment_key(&path, index);
        debug!("uploading segment {} ({} bytes)", segment, n);
        let mut chunk = (&mut *reader).take(n);
        client
            .put(
                fs.segments_container(),
                &segment,
                &mut chunk,
                n,
                Some(content_type),
                headers,
            )
            .await?;
        left -= n;
        index += 1;
    }

    let mut manifest_headers = headers.clone();
    manifest_headers.insert(
        OBJECT_MANIFEST_HEADER,
        manifest_value(fs.segments_container(), &path),
    );
    client
        .put(
            fs.container(),
            key,
            &mut tokio::io::empty(),
            0,
            Some(content_type),
            &manifest_headers,
        )
        .await?;
    debug!("wrote manifest for {} with {} segments", key, index);

    Ok(prefix.with_delimiter())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        backends::memory::{Call, MemoryClient},
        config::FsOptions,
        errors::Error,
        services::object_handle::ObjectSource,
    };
    use chrono::Utc;
    use std::sync::Arc;

    const MIB: u64 = 1024 * 1024;

    async fn small_chunk_fs(client: &Arc<MemoryClient>, chunk_size: u64) -> SwiftFs {
        let opts = FsOptions {
            chunk_size,
            ..Default::default()
        };
        SwiftFs::new(client.clone(), "c/dir", opts).await.unwrap()
    }

    fn segment_puts(client: &MemoryClient) -> Vec<(String, u64)> {
        client
            .calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Put {
                    container,
                    key,
                    size,
                } if container == "c_segments" => Some((key, size)),
                _ => None,
            })
            .collect()
    }

    fn payload(len: u64) -> Vec<u8> {
        (0..len).map(|i| (i % 251) as u8).collect()
    }

    #[tokio::test]
    async fn test_large_upload_is_split_into_segments() {
        let client = Arc::new(MemoryClient::new());
        let fs = small_chunk_fs(&client, 5 * MIB).await;
        let data = payload(12 * MIB);
        let src = ObjectSource {
            remote: "big.bin".into(),
            size: data.len() as u64,
            mod_time: Utc::now(),
            content_type: None,
        };
        let mut object = fs.put(&data[..], &src).await.unwrap();

        let puts = segment_puts(&client);
        let sizes: Vec<u64> = puts.iter().map(|(_, size)| *size).collect();
        assert_eq!(sizes, vec![5 * MIB, 5 * MIB, 2 * MIB]);
        for (i, (key, _)) in puts.iter().enumerate() {
            assert!(key.starts_with("dir/big.bin/"), "{key}");
            assert!(key.ends_with(&format!("/{i:08}")), "{key}");
        }

        let (manifest_data, headers) = client.raw_object("c", "dir/big.bin").unwrap();
        assert!(manifest_data.is_empty());
        let manifest = headers.get(OBJECT_MANIFEST_HEADER).unwrap();
        assert!(manifest.starts_with("c%5Fsegments/dir/big.bin/"));
        assert!(manifest.ends_with(&format!("/{}", 12 * MIB)));

        assert_eq!(object.size(), 12 * MIB);
        assert!(object.is_dynamic_large_object().await.unwrap());
        let content: Vec<bytes::Bytes> =
            futures::TryStreamExt::try_collect(object.open(None).await.unwrap())
                .await
                .unwrap();
        assert_eq!(content.concat(), data);
    }

    #[tokio::test]
    async fn test_exact_multiple_has_no_empty_segment() {
        let client = Arc::new(MemoryClient::new());
        client.seed_container("c");
        let fs = small_chunk_fs(&client, 4).await;
        let mut reader = &b"abcdefgh"[..];
        let prefix = upload_chunks(&fs, "dir/k", &mut reader, &Headers::new(), 8, "text/plain")
            .await
            .unwrap();
        assert!(prefix.ends_with("/8/"));
        assert_eq!(segment_puts(&client).len(), 2);
    }

    #[tokio::test]
    async fn test_at_threshold_is_a_single_put() {
        let client = Arc::new(MemoryClient::new());
        let fs = small_chunk_fs(&client, 4).await;
        let src = ObjectSource {
            remote: "k".into(),
            size: 4,
            mod_time: Utc::now(),
            content_type: None,
        };
        fs.put(&b"abcd"[..], &src).await.unwrap();
        assert!(segment_puts(&client).is_empty());
        assert!(!client.has_container("c_segments"));
    }

    #[tokio::test]
    async fn test_failed_segment_aborts_and_keeps_earlier_ones() {
        let client = Arc::new(MemoryClient::new());
        client.seed_container("c_segments");
        client.fail_puts_after("c_segments", 2);
        let fs = small_chunk_fs(&client, 4).await;
        let src = ObjectSource {
            remote: "k".into(),
            size: 12,
            mod_time: Utc::now(),
            content_type: None,
        };
        let err = fs.put(&b"0123456789ab"[..], &src).await.unwrap_err();
        assert!(matches!(err, Error::Client(_)));

        assert_eq!(client.keys("c_segments").len(), 2);
        assert!(client.raw_object("c", "dir/k").is_none());
    }

    #[tokio::test]
    async fn test_segment_container_failure_aborts_before_segments() {
        let client = Arc::new(MemoryClient::new());
        client.fail_create_container("c_segments");
        let fs = small_chunk_fs(&client, 4).await;
        let mut reader = &b"0123456789"[..];
        assert!(
            upload_chunks(&fs, "dir/k", &mut reader, &Headers::new(), 10, "text/plain")
                .await
                .is_err()
        );
        assert!(segment_puts(&client).is_empty());
    }
}
