use std::collections::HashMap;
use std::fmt;
use std::io::SeekFrom;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use tokio::sync::RwLock;
use tracing::{debug, trace};

use super::RangeReader;
use crate::error::IoError;

/// Default chunk size: 4000 bytes.
///
/// Small enough that header and IFD reads stay cheap, large enough that a
/// typical COG directory fits in a handful of fetches.
pub const DEFAULT_CHUNK_SIZE: usize = 4000;

/// Upper bound on the buffer reserved up front for a multi-chunk read.
const MAX_RESERVE: u64 = 1 << 20;

/// Aligned chunk cache that wraps any RangeReader.
///
/// Sparse, unaligned reads are turned into fetches of fixed-size chunks whose
/// start offsets are multiples of the chunk size. Each miss requests
/// `chunk_size + 1` bytes from the inner reader, which maps to the inclusive
/// HTTP range `bytes=key-(key + chunk_size)`.
///
/// Features:
/// - Chunks are kept for the lifetime of the cache; nothing is evicted
/// - Chunk table behind an async RwLock so a cache can be shared via `Arc`
/// - No in-flight de-duplication: concurrent misses on one chunk may fetch twice
/// - Cursor-based `read` and `seek` on top of random access
pub struct RangeCache<R> {
    /// The underlying reader
    inner: Arc<R>,
    /// Chunk size in bytes
    chunk_size: usize,
    /// Cached chunks keyed by aligned start offset
    chunks: RwLock<HashMap<u64, Bytes>>,
    /// Number of fetches issued to the inner reader
    fetches: AtomicUsize,
    /// Position used by `read` and `seek`
    cursor: u64,
}

impl<R: RangeReader + 'static> RangeCache<R> {
    /// Create a new RangeCache with the default 4000-byte chunk size.
    pub fn new(inner: R) -> Self {
        Self::with_chunk_size(inner, DEFAULT_CHUNK_SIZE)
    }

    /// Create a new RangeCache with a custom chunk size.
    ///
    /// A chunk size of zero is treated as one byte.
    pub fn with_chunk_size(inner: R, chunk_size: usize) -> Self {
        Self::from_arc(Arc::new(inner), chunk_size)
    }

    /// Create a RangeCache over a reader that is already shared.
    pub fn from_arc(inner: Arc<R>, chunk_size: usize) -> Self {
        Self {
            inner,
            chunk_size: chunk_size.max(1),
            chunks: RwLock::new(HashMap::new()),
            fetches: AtomicUsize::new(0),
            cursor: 0,
        }
    }

    /// Get the wrapped reader.
    pub fn inner(&self) -> &R {
        &self.inner
    }

    /// Chunk size in bytes.
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Number of fetches issued to the inner reader so far.
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    /// Number of chunks currently held.
    pub async fn cached_chunks(&self) -> usize {
        self.chunks.read().await.len()
    }

    /// Current cursor position.
    pub fn position(&self) -> u64 {
        self.cursor
    }

    /// Read into `buf` from the cursor and advance it by the bytes returned.
    ///
    /// Returns fewer than `buf.len()` bytes only at the end of the resource.
    pub async fn read(&mut self, buf: &mut [u8]) -> Result<usize, IoError> {
        let bytes = self.read_at(self.cursor, buf.len()).await?;
        buf[..bytes.len()].copy_from_slice(&bytes);
        self.cursor += bytes.len() as u64;
        Ok(bytes.len())
    }

    /// Move the cursor and return its new position.
    ///
    /// A position before the start of the resource is rejected and leaves the
    /// cursor where it was. Seeking from the end probes the size first.
    pub async fn seek(&mut self, pos: SeekFrom) -> Result<u64, IoError> {
        let (base, delta) = match pos {
            SeekFrom::Start(offset) => {
                self.cursor = offset;
                return Ok(offset);
            }
            SeekFrom::Current(delta) => (self.cursor, delta),
            SeekFrom::End(delta) => (self.inner.size().await?, delta),
        };

        let target = i128::from(base) + i128::from(delta);
        if target < 0 {
            return Err(IoError::InvalidSeek(format!(
                "position {} is before the start of {}",
                target,
                self.inner.identifier()
            )));
        }
        let target = u64::try_from(target).map_err(|_| {
            IoError::InvalidSeek(format!("position {} overflows", target))
        })?;

        self.cursor = target;
        Ok(target)
    }

    /// Get a chunk from the table or fetch it from the underlying reader.
    async fn chunk(&self, key: u64) -> Result<Bytes, IoError> {
        {
            let chunks = self.chunks.read().await;
            if let Some(data) = chunks.get(&key) {
                trace!(key, "chunk cache hit");
                return Ok(data.clone());
            }
        }

        self.fetches.fetch_add(1, Ordering::SeqCst);
        let data = self.inner.read_at(key, self.chunk_size + 1).await?;
        debug!(
            source = self.inner.identifier(),
            key,
            len = data.len(),
            "fetched chunk"
        );

        let mut chunks = self.chunks.write().await;
        Ok(chunks.entry(key).or_insert(data).clone())
    }

    /// Aligned start offset of the chunk containing `offset`.
    #[inline]
    fn chunk_key(&self, offset: u64) -> u64 {
        let size = self.chunk_size as u64;
        size * (offset / size)
    }
}

impl<R: RangeReader> fmt::Debug for RangeCache<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RangeCache")
            .field("source", &self.inner.identifier())
            .field("chunk_size", &self.chunk_size)
            .field("fetches", &self.fetches.load(Ordering::SeqCst))
            .field("cursor", &self.cursor)
            .finish()
    }
}

#[async_trait]
impl<R: RangeReader + 'static> RangeReader for RangeCache<R> {
    async fn read_at(&self, offset: u64, len: usize) -> Result<Bytes, IoError> {
        if len == 0 {
            return Ok(Bytes::new());
        }

        let end = offset + len as u64;
        let first = self.chunk_key(offset);
        let last = self.chunk_key(end - 1);

        if first == last {
            // Single chunk read (common case)
            let chunk = self.chunk(first).await?;
            let start = (offset - first) as usize;
            if start >= chunk.len() {
                return Ok(Bytes::new());
            }
            let stop = (start + len).min(chunk.len());
            return Ok(chunk.slice(start..stop));
        }

        // `len` can come from an untrusted tag count; the reservation stays bounded.
        let spanned = ((last - first) / self.chunk_size as u64 + 1) * self.chunk_size as u64;
        let mut result = BytesMut::with_capacity(len.min(spanned.min(MAX_RESERVE) as usize));
        let mut key = first;
        while key <= last {
            let chunk = self.chunk(key).await?;
            let from = (offset.max(key) - key) as usize;
            let to = (end.min(key + self.chunk_size as u64) - key) as usize;
            let available = to.min(chunk.len());
            if from >= available {
                break;
            }
            result.extend_from_slice(&chunk[from..available]);
            if available < to {
                // End of resource.
                break;
            }
            key += self.chunk_size as u64;
        }

        Ok(result.freeze())
    }

    async fn size(&self) -> Result<u64, IoError> {
        self.inner.size().await
    }

    fn identifier(&self) -> &str {
        self.inner.identifier()
    }
}
