//! Tests for filesystem storage backend.

use clonebox_core::ContentDigest;
use clonebox_error::CloneboxErrorKind;
use clonebox_storage::{ContentStore, Disposition, FileSystemStorage, StorageErrorKind};
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;
use tempfile::TempDir;
use tokio::io::{AsyncRead, AsyncReadExt, ReadBuf};

async fn read_all(storage: &FileSystemStorage, handle: &str) -> Vec<u8> {
    let mut reader = storage.open(handle).await.unwrap();
    let mut out = Vec::new();
    reader.read_to_end(&mut out).await.unwrap();
    out
}

fn count_files(dir: &std::path::Path) -> usize {
    let mut count = 0;
    for entry in std::fs::read_dir(dir).unwrap() {
        let entry = entry.unwrap();
        if entry.file_type().unwrap().is_dir() {
            count += count_files(&entry.path());
        } else {
            count += 1;
        }
    }
    count
}

/// Yields its data in small chunks and panics if polled after EOF, so a
/// second pass over the source would fail the test.
struct ReadOnce {
    data: Vec<u8>,
    pos: usize,
    finished: bool,
}

impl ReadOnce {
    fn new(data: Vec<u8>) -> Self {
        Self {
            data,
            pos: 0,
            finished: false,
        }
    }
}

impl AsyncRead for ReadOnce {
    fn poll_read(
        mut self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<std::io::Result<()>> {
        assert!(!self.finished, "source stream read after EOF");
        let remaining = self.data.len() - self.pos;
        if remaining == 0 {
            self.finished = true;
            return Poll::Ready(Ok(()));
        }
        let n = remaining.min(1000).min(buf.remaining());
        let start = self.pos;
        buf.put_slice(&self.data[start..start + n]);
        self.pos += n;
        Poll::Ready(Ok(()))
    }
}

struct FailingReader;

impl AsyncRead for FailingReader {
    fn poll_read(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        _buf: &mut ReadBuf<'_>,
    ) -> Poll<std::io::Result<()>> {
        Poll::Ready(Err(std::io::Error::new(
            std::io::ErrorKind::ConnectionReset,
            "client went away",
        )))
    }
}

/// Hands over a few bytes, then never produces more.
struct StallingReader {
    head: &'static [u8],
}

impl AsyncRead for StallingReader {
    fn poll_read(
        mut self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<std::io::Result<()>> {
        if self.head.is_empty() {
            return Poll::Pending;
        }
        let n = self.head.len().min(buf.remaining());
        buf.put_slice(&self.head[..n]);
        self.head = &self.head[n..];
        Poll::Ready(Ok(()))
    }
}

#[tokio::test]
async fn test_stage_promote_and_read() {
    let temp_dir = TempDir::new().unwrap();
    let storage = FileSystemStorage::new(temp_dir.path()).unwrap();

    let mut data: &[u8] = b"Hello, world!";
    let staged = storage.begin_write(&mut data).await.unwrap();

    assert_eq!(staged.size, 13);
    assert_eq!(staged.digest, ContentDigest::of(b"Hello, world!"));
    assert!(temp_dir.path().join("staging").join(&staged.handle).exists());

    // Staged blobs are not readable yet
    assert!(storage.open(&staged.handle).await.is_err());

    let handle = storage.promote(&staged.handle).await.unwrap();
    assert_eq!(handle, staged.handle);
    assert!(!temp_dir.path().join("staging").join(&handle).exists());
    assert_eq!(read_all(&storage, &handle).await, b"Hello, world!");
}

#[tokio::test]
async fn test_single_pass_digest_matches_independent_hash() {
    let temp_dir = TempDir::new().unwrap();
    let storage = FileSystemStorage::new(temp_dir.path()).unwrap();

    let payload: Vec<u8> = (0..200_000u32).map(|i| (i % 251) as u8).collect();
    let mut source = ReadOnce::new(payload.clone());

    let staged = storage.begin_write(&mut source).await.unwrap();
    assert_eq!(staged.digest, ContentDigest::of(&payload));
    assert_eq!(staged.size, payload.len() as u64);

    let handle = storage.promote(&staged.handle).await.unwrap();
    assert_eq!(read_all(&storage, &handle).await, payload);
}

#[tokio::test]
async fn test_concurrent_writes_get_distinct_handles() {
    let temp_dir = TempDir::new().unwrap();
    let storage = FileSystemStorage::new(temp_dir.path()).unwrap();

    let mut a: &[u8] = b"same bytes";
    let mut b: &[u8] = b"same bytes";
    let (first, second) = tokio::join!(storage.begin_write(&mut a), storage.begin_write(&mut b));
    let (first, second) = (first.unwrap(), second.unwrap());

    assert_ne!(first.handle, second.handle);
    assert_eq!(first.digest, second.digest);
    assert_eq!(count_files(&temp_dir.path().join("staging")), 2);
}

#[tokio::test]
async fn test_discard_removes_staged_blob() {
    let temp_dir = TempDir::new().unwrap();
    let storage = FileSystemStorage::new(temp_dir.path()).unwrap();

    let mut data: &[u8] = b"Delete me";
    let staged = storage.begin_write(&mut data).await.unwrap();
    assert!(storage.exists(&staged.handle).await.unwrap());

    storage.discard(&staged.handle).await.unwrap();
    assert!(!storage.exists(&staged.handle).await.unwrap());

    // Discarding twice is fine
    storage.discard(&staged.handle).await.unwrap();
}

#[tokio::test]
async fn test_failed_read_leaves_no_staging_file() {
    let temp_dir = TempDir::new().unwrap();
    let storage = FileSystemStorage::new(temp_dir.path()).unwrap();

    let err = storage.begin_write(&mut FailingReader).await.unwrap_err();
    assert!(err.is_io_failure());
    match err.kind() {
        CloneboxErrorKind::Storage(e) => {
            assert!(matches!(e.kind, StorageErrorKind::StreamRead(_)))
        }
        other => panic!("unexpected error: {:?}", other),
    }
    assert_eq!(count_files(&temp_dir.path().join("staging")), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_abandoned_write_leaves_no_staging_file() {
    let temp_dir = TempDir::new().unwrap();
    let storage = FileSystemStorage::new(temp_dir.path()).unwrap();

    let mut source = StallingReader { head: b"partial" };
    let attempt =
        tokio::time::timeout(Duration::from_millis(100), storage.begin_write(&mut source)).await;
    assert!(attempt.is_err(), "write should still be waiting on the source");

    assert_eq!(count_files(&temp_dir.path().join("staging")), 0);
}

#[tokio::test]
async fn test_open_unknown_handle_is_not_found() {
    let temp_dir = TempDir::new().unwrap();
    let storage = FileSystemStorage::new(temp_dir.path()).unwrap();

    let err = storage
        .open("00000000-0000-4000-8000-000000000000")
        .await
        .err()
        .unwrap();
    match err.kind() {
        CloneboxErrorKind::Storage(e) => {
            assert!(matches!(e.kind, StorageErrorKind::NotFound(_)))
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn test_rejects_path_like_handles() {
    let temp_dir = TempDir::new().unwrap();
    let storage = FileSystemStorage::new(temp_dir.path()).unwrap();

    assert!(storage.open("../../etc/passwd").await.is_err());
    assert!(storage.discard("../staging").await.is_err());
}

#[tokio::test]
async fn test_sweep_only_touches_staging() {
    let temp_dir = TempDir::new().unwrap();
    let storage = FileSystemStorage::new(temp_dir.path()).unwrap();

    let mut kept: &[u8] = b"canonical";
    let kept = storage.begin_write(&mut kept).await.unwrap();
    storage.promote(&kept.handle).await.unwrap();

    let mut leaked: &[u8] = b"leaked";
    let leaked = storage.begin_write(&mut leaked).await.unwrap();

    // Nothing is old enough yet
    assert_eq!(
        storage.sweep_staging(Duration::from_secs(3600)).await.unwrap(),
        0
    );

    assert_eq!(storage.sweep_staging(Duration::ZERO).await.unwrap(), 1);
    assert!(!storage.exists(&leaked.handle).await.unwrap());
    assert!(storage.exists(&kept.handle).await.unwrap());
}

#[tokio::test]
async fn test_settle_blocking() {
    let temp_dir = TempDir::new().unwrap();
    let storage = FileSystemStorage::new(temp_dir.path()).unwrap();

    let mut a: &[u8] = b"promote me";
    let a = storage.begin_write(&mut a).await.unwrap();
    let mut b: &[u8] = b"drop me";
    let b = storage.begin_write(&mut b).await.unwrap();

    storage
        .settle_blocking(&a.handle, Disposition::Promote)
        .unwrap();
    storage
        .settle_blocking(&b.handle, Disposition::Discard)
        .unwrap();

    assert_eq!(read_all(&storage, &a.handle).await, b"promote me");
    assert!(!storage.exists(&b.handle).await.unwrap());
}

#[tokio::test]
async fn test_blob_layout_is_sharded() {
    let temp_dir = TempDir::new().unwrap();
    let storage = FileSystemStorage::new(temp_dir.path()).unwrap();

    let mut data: &[u8] = b"Test structure";
    let staged = storage.begin_write(&mut data).await.unwrap();
    let handle = storage.promote(&staged.handle).await.unwrap();

    let expected = temp_dir
        .path()
        .join("blobs")
        .join(&handle[0..2])
        .join(&handle);
    assert!(expected.exists());
    assert_eq!(storage.location(), temp_dir.path().to_string_lossy());
}
