//! Single-pass copy with digest.

use clonebox_core::ContentDigest;
use clonebox_error::{StorageError, StorageErrorKind};
use sha2::{Digest, Sha256};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

const CHUNK_SIZE: usize = 64 * 1024;

/// Copy `source` to `sink` until EOF, feeding each chunk to SHA-256 as it is
/// written. Returns the digest and byte count.
pub(crate) async fn copy_hashing<R, W>(
    source: &mut R,
    sink: &mut W,
) -> Result<(ContentDigest, u64), StorageError>
where
    R: AsyncRead + Unpin + ?Sized,
    W: AsyncWrite + Unpin + ?Sized,
{
    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; CHUNK_SIZE];
    let mut total: u64 = 0;

    loop {
        let n = source
            .read(&mut buf)
            .await
            .map_err(|e| StorageError::new(StorageErrorKind::StreamRead(e.to_string())))?;
        if n == 0 {
            break;
        }

        hasher.update(&buf[..n]);
        sink.write_all(&buf[..n])
            .await
            .map_err(|e| StorageError::new(StorageErrorKind::FileWrite(e.to_string())))?;
        total += n as u64;
    }

    sink.flush()
        .await
        .map_err(|e| StorageError::new(StorageErrorKind::FileWrite(e.to_string())))?;

    Ok((ContentDigest::new(format!("{:x}", hasher.finalize())), total))
}
