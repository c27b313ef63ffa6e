//! TIFF tag value reading.
//!
//! Values are either inline in the IFD entry or stored elsewhere in the file
//! (see [`TagValue`]). Resolving an out-of-line value is a single explicit
//! fetch of the whole array; everything after that is pure decoding of the
//! returned bytes in the file's byte order.
//!
//! Each typed reader also checks the field type and count that the tag
//! allows, so a malformed entry fails with an error naming the tag.

use bytes::Bytes;

use crate::error::TiffError;
use crate::io::RangeReader;

use super::parser::{ByteOrder, IfdEntry, TagValue};
use super::tags::{FieldType, TiffTag};

// =============================================================================
// Entry checks
// =============================================================================

/// Check that an entry uses one of the allowed field types.
pub fn check_type(
    entry: &IfdEntry,
    tag: TiffTag,
    allowed: &[FieldType],
) -> Result<FieldType, TiffError> {
    match entry.field_type {
        Some(ft) if allowed.contains(&ft) => Ok(ft),
        Some(ft) => Err(TiffError::InvalidTagValue {
            tag: tag.name(),
            message: format!("unexpected field type {:?}, expected one of {:?}", ft, allowed),
        }),
        None => Err(TiffError::UnknownFieldType {
            tag: tag.name(),
            field_type: entry.field_type_raw,
        }),
    }
}

/// Check that an entry holds exactly `count` values.
pub fn check_count(entry: &IfdEntry, tag: TiffTag, count: u32) -> Result<(), TiffError> {
    if entry.count != count {
        return Err(TiffError::InvalidTagValue {
            tag: tag.name(),
            message: format!("expected count {}, got {}", count, entry.count),
        });
    }
    Ok(())
}

/// Check that an entry holds at least `count` values.
pub fn check_min_count(entry: &IfdEntry, tag: TiffTag, count: u32) -> Result<(), TiffError> {
    if entry.count < count {
        return Err(TiffError::InvalidTagValue {
            tag: tag.name(),
            message: format!("expected at least {} values, got {}", count, entry.count),
        });
    }
    Ok(())
}

// =============================================================================
// Pure decoders
// =============================================================================

/// Decode `count` u16 values.
pub fn decode_u16s(bytes: &[u8], count: usize, byte_order: ByteOrder) -> Vec<u16> {
    bytes
        .chunks_exact(2)
        .take(count)
        .map(|b| byte_order.read_u16(b))
        .collect()
}

/// Decode `count` u32 values.
pub fn decode_u32s(bytes: &[u8], count: usize, byte_order: ByteOrder) -> Vec<u32> {
    bytes
        .chunks_exact(4)
        .take(count)
        .map(|b| byte_order.read_u32(b))
        .collect()
}

/// Decode `count` f64 values.
pub fn decode_f64s(bytes: &[u8], count: usize, byte_order: ByteOrder) -> Vec<f64> {
    bytes
        .chunks_exact(8)
        .take(count)
        .map(|b| byte_order.read_f64(b))
        .collect()
}

/// Decode an ASCII value, dropping trailing NUL terminators.
pub fn decode_ascii(bytes: &[u8]) -> String {
    let end = bytes
        .iter()
        .rposition(|&b| b != 0)
        .map(|i| i + 1)
        .unwrap_or(0);
    String::from_utf8_lossy(&bytes[..end]).into_owned()
}

// =============================================================================
// ValueReader
// =============================================================================

/// Reads tag values from a TIFF file.
///
/// Combines a RangeReader with the file's byte order.
pub struct ValueReader<'a, R: RangeReader + ?Sized> {
    reader: &'a R,
    byte_order: ByteOrder,
}

impl<'a, R: RangeReader + ?Sized> ValueReader<'a, R> {
    /// Create a new ValueReader.
    pub fn new(reader: &'a R, byte_order: ByteOrder) -> Self {
        Self { reader, byte_order }
    }

    /// Get the byte order of the file.
    #[inline]
    pub fn byte_order(&self) -> ByteOrder {
        self.byte_order
    }

    /// Get the raw bytes of an entry's value.
    ///
    /// Inline values are returned as-is; out-of-line values are fetched in
    /// one read of exactly their length.
    pub async fn resolve(&self, entry: &IfdEntry) -> Result<Bytes, TiffError> {
        match &entry.value {
            TagValue::Inline(bytes) => Ok(bytes.clone()),
            TagValue::OutOfLine { offset, length } => {
                Ok(self.reader.read_exact_at(*offset, *length).await?)
            }
        }
    }

    /// Read a single SHORT value (count must be 1).
    pub async fn read_short(&self, entry: &IfdEntry, tag: TiffTag) -> Result<u16, TiffError> {
        check_type(entry, tag, &[FieldType::Short])?;
        check_count(entry, tag, 1)?;
        let bytes = self.resolve(entry).await?;
        Ok(self.byte_order.read_u16(&bytes))
    }

    /// Read a single LONG value (count must be 1).
    pub async fn read_long(&self, entry: &IfdEntry, tag: TiffTag) -> Result<u32, TiffError> {
        check_type(entry, tag, &[FieldType::Long])?;
        check_count(entry, tag, 1)?;
        let bytes = self.resolve(entry).await?;
        Ok(self.byte_order.read_u32(&bytes))
    }

    /// Read a single SHORT or LONG value (count must be 1).
    ///
    /// Used for image and tile dimensions.
    pub async fn read_dimension(&self, entry: &IfdEntry, tag: TiffTag) -> Result<u32, TiffError> {
        let field_type = check_type(entry, tag, &[FieldType::Short, FieldType::Long])?;
        check_count(entry, tag, 1)?;
        let bytes = self.resolve(entry).await?;
        Ok(match field_type {
            FieldType::Short => self.byte_order.read_u16(&bytes) as u32,
            _ => self.byte_order.read_u32(&bytes),
        })
    }

    /// Read the first value of a SHORT array.
    ///
    /// Per-sample tags such as BitsPerSample repeat the value for each
    /// sample; only the first one is used.
    pub async fn read_first_short(
        &self,
        entry: &IfdEntry,
        tag: TiffTag,
    ) -> Result<u16, TiffError> {
        check_type(entry, tag, &[FieldType::Short])?;
        check_min_count(entry, tag, 1)?;
        let bytes = self.resolve(entry).await?;
        Ok(self.byte_order.read_u16(&bytes))
    }

    /// Read an array of SHORT values.
    pub async fn read_shorts(&self, entry: &IfdEntry, tag: TiffTag) -> Result<Vec<u16>, TiffError> {
        check_type(entry, tag, &[FieldType::Short])?;
        let bytes = self.resolve(entry).await?;
        Ok(decode_u16s(&bytes, entry.count as usize, self.byte_order))
    }

    /// Read an array of LONG values.
    ///
    /// This is the method for TileOffsets and TileByteCounts; the entire
    /// array is fetched in a single range request.
    pub async fn read_longs(&self, entry: &IfdEntry, tag: TiffTag) -> Result<Vec<u32>, TiffError> {
        check_type(entry, tag, &[FieldType::Long])?;
        let bytes = self.resolve(entry).await?;
        Ok(decode_u32s(&bytes, entry.count as usize, self.byte_order))
    }

    /// Read an array of DOUBLE values.
    pub async fn read_doubles(&self, entry: &IfdEntry, tag: TiffTag) -> Result<Vec<f64>, TiffError> {
        check_type(entry, tag, &[FieldType::Double])?;
        let bytes = self.resolve(entry).await?;
        Ok(decode_f64s(&bytes, entry.count as usize, self.byte_order))
    }

    /// Read an ASCII value with trailing NULs removed.
    pub async fn read_ascii(&self, entry: &IfdEntry, tag: TiffTag) -> Result<String, TiffError> {
        check_type(entry, tag, &[FieldType::Ascii])?;
        let bytes = self.resolve(entry).await?;
        Ok(decode_ascii(&bytes))
    }
}

// =============================================================================
// Tests
// =============================================================================
