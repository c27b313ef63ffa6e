use async_trait::async_trait;
use bytes::Bytes;

use super::RangeReader;
use crate::error::IoError;

/// A [`RangeReader`] over bytes already held in memory.
///
/// Useful when the whole file has been downloaded or generated locally.
#[derive(Debug, Clone)]
pub struct MemoryReader {
    data: Bytes,
    identifier: String,
}

impl MemoryReader {
    /// Wrap the given bytes.
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self {
            data: data.into(),
            identifier: "memory://".to_string(),
        }
    }

    /// Attach an identifier used in logs.
    pub fn with_identifier(mut self, identifier: impl Into<String>) -> Self {
        self.identifier = identifier.into();
        self
    }
}

#[async_trait]
impl RangeReader for MemoryReader {
    async fn read_at(&self, offset: u64, len: usize) -> Result<Bytes, IoError> {
        let size = self.data.len() as u64;
        if offset >= size {
            return Ok(Bytes::new());
        }
        let start = offset as usize;
        let end = start.saturating_add(len).min(self.data.len());
        Ok(self.data.slice(start..end))
    }

    async fn size(&self) -> Result<u64, IoError> {
        Ok(self.data.len() as u64)
    }

    fn identifier(&self) -> &str {
        &self.identifier
    }
}
