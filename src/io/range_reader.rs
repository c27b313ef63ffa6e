use async_trait::async_trait;
use bytes::Bytes;

use crate::error::IoError;

/// Random-access reads over an immutable, usually remote, resource.
///
/// The directory parser and the tile decoder consume every byte through this
/// trait, so both work the same against HTTP, memory, or the chunk cache
/// layered on top of either.
#[async_trait]
pub trait RangeReader: Send + Sync {
    /// Read up to `len` bytes starting at `offset`.
    ///
    /// Implementations return fewer than `len` bytes only when the end of the
    /// resource is reached; a read starting at or past the end returns an
    /// empty buffer.
    async fn read_at(&self, offset: u64, len: usize) -> Result<Bytes, IoError>;

    /// Read exactly `len` bytes starting at `offset`.
    ///
    /// Fails with [`IoError::ShortRead`] when the resource ends early.
    async fn read_exact_at(&self, offset: u64, len: usize) -> Result<Bytes, IoError> {
        let bytes = self.read_at(offset, len).await?;
        if bytes.len() < len {
            return Err(IoError::ShortRead {
                offset,
                requested: len as u64,
                received: bytes.len() as u64,
            });
        }
        Ok(bytes.slice(..len))
    }

    /// Probe the total size of the resource in bytes.
    ///
    /// For remote sources this is a metadata-only request; it doubles as an
    /// existence check.
    async fn size(&self) -> Result<u64, IoError>;

    /// Get a unique identifier for this resource (for logging).
    fn identifier(&self) -> &str;
}
