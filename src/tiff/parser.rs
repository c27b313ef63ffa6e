//! TIFF header and directory entry parsing.
//!
//! Only classic 32-bit TIFF is accepted. Every COG this crate reads starts
//! with the 8-byte header below and stores each IFD entry in 12 bytes.
//!
//! # TIFF Header Structure
//!
//! ```text
//! Bytes 0-1: Byte order (0x4949 = little-endian "II", 0x4D4D = big-endian "MM")
//! Bytes 2-3: Version (42 = 0x002A)
//! Bytes 4-7: Offset to first IFD (4 bytes)
//! ```
//!
//! # IFD Entry Structure
//!
//! ```text
//! Bytes 0-1:  Tag id
//! Bytes 2-3:  Field type
//! Bytes 4-7:  Value count
//! Bytes 8-11: Value (if it fits in 4 bytes) or offset to the value
//! ```

use bytes::Bytes;

use super::tags::FieldType;
use crate::error::TiffError;

// =============================================================================
// Constants
// =============================================================================

/// Magic bytes indicating little-endian byte order ("II" for Intel)
const BYTE_ORDER_LITTLE_ENDIAN: u16 = 0x4949;

/// Magic bytes indicating big-endian byte order ("MM" for Motorola)
const BYTE_ORDER_BIG_ENDIAN: u16 = 0x4D4D;

/// Version number for classic TIFF
const VERSION_TIFF: u16 = 42;

/// Size of the classic TIFF header in bytes
pub const TIFF_HEADER_SIZE: usize = 8;

/// Size of one IFD entry in bytes
pub const IFD_ENTRY_SIZE: usize = 12;

/// Size of the value/offset field of an IFD entry
pub const VALUE_FIELD_SIZE: usize = 4;

// =============================================================================
// ByteOrder
// =============================================================================

/// Byte order (endianness) of a TIFF file.
///
/// TIFF files declare their byte order in the first two bytes of the header.
/// All multi-byte values in the file must be read respecting this order,
/// including 16-bit pixel samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteOrder {
    /// Little-endian ("II" = Intel)
    LittleEndian,
    /// Big-endian ("MM" = Motorola)
    BigEndian,
}

impl ByteOrder {
    /// Read a u16 from the first 2 bytes of a slice.
    ///
    /// # Panics
    /// Panics if the slice is shorter than 2 bytes.
    #[inline]
    pub fn read_u16(self, bytes: &[u8]) -> u16 {
        let raw = [bytes[0], bytes[1]];
        match self {
            ByteOrder::LittleEndian => u16::from_le_bytes(raw),
            ByteOrder::BigEndian => u16::from_be_bytes(raw),
        }
    }

    /// Read a u32 from the first 4 bytes of a slice.
    ///
    /// # Panics
    /// Panics if the slice is shorter than 4 bytes.
    #[inline]
    pub fn read_u32(self, bytes: &[u8]) -> u32 {
        let raw = [bytes[0], bytes[1], bytes[2], bytes[3]];
        match self {
            ByteOrder::LittleEndian => u32::from_le_bytes(raw),
            ByteOrder::BigEndian => u32::from_be_bytes(raw),
        }
    }

    /// Read a u64 from the first 8 bytes of a slice.
    ///
    /// # Panics
    /// Panics if the slice is shorter than 8 bytes.
    #[inline]
    pub fn read_u64(self, bytes: &[u8]) -> u64 {
        let mut raw = [0u8; 8];
        raw.copy_from_slice(&bytes[..8]);
        match self {
            ByteOrder::LittleEndian => u64::from_le_bytes(raw),
            ByteOrder::BigEndian => u64::from_be_bytes(raw),
        }
    }

    /// Read an IEEE-754 double from the first 8 bytes of a slice.
    #[inline]
    pub fn read_f64(self, bytes: &[u8]) -> f64 {
        f64::from_bits(self.read_u64(bytes))
    }

    /// Encode a u16 in this byte order.
    #[inline]
    pub fn u16_bytes(self, value: u16) -> [u8; 2] {
        match self {
            ByteOrder::LittleEndian => value.to_le_bytes(),
            ByteOrder::BigEndian => value.to_be_bytes(),
        }
    }
}

// =============================================================================
// TiffHeader
// =============================================================================

/// Parsed TIFF file header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TiffHeader {
    /// Byte order for all multi-byte values in the file
    pub byte_order: ByteOrder,

    /// Offset to the first IFD in the file
    pub first_ifd_offset: u64,
}

impl TiffHeader {
    /// Parse a TIFF header from the first 8 bytes of a file.
    ///
    /// # Errors
    /// - `InvalidMagic` if byte order bytes are not II or MM
    /// - `InvalidVersion` if version is not 42 (BigTIFF's 43 included)
    /// - `InvalidTagValue` if fewer than 8 bytes are given
    /// - `InvalidIfdOffset` if the first IFD offset is zero
    pub fn parse(bytes: &[u8]) -> Result<Self, TiffError> {
        if bytes.len() < TIFF_HEADER_SIZE {
            return Err(TiffError::InvalidTagValue {
                tag: "header",
                message: format!(
                    "need {} bytes, got {}",
                    TIFF_HEADER_SIZE,
                    bytes.len()
                ),
            });
        }

        // Checked as raw byte patterns, independent of order
        let magic = u16::from_le_bytes([bytes[0], bytes[1]]);
        let byte_order = match magic {
            BYTE_ORDER_LITTLE_ENDIAN => ByteOrder::LittleEndian,
            BYTE_ORDER_BIG_ENDIAN => ByteOrder::BigEndian,
            _ => return Err(TiffError::InvalidMagic(magic)),
        };

        let version = byte_order.read_u16(&bytes[2..4]);
        if version != VERSION_TIFF {
            return Err(TiffError::InvalidVersion(version));
        }

        let first_ifd_offset = byte_order.read_u32(&bytes[4..8]) as u64;
        if first_ifd_offset == 0 {
            return Err(TiffError::InvalidIfdOffset(0));
        }

        Ok(TiffHeader {
            byte_order,
            first_ifd_offset,
        })
    }
}

// =============================================================================
// IfdEntry
// =============================================================================

/// Where the bytes of a tag value live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TagValue {
    /// The value fits in the entry's 4-byte field; holds exactly its bytes
    Inline(Bytes),
    /// The value is stored elsewhere in the file
    OutOfLine { offset: u64, length: usize },
}

/// One 12-byte IFD entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IfdEntry {
    /// Raw tag id
    pub tag: u16,

    /// Field type, or `None` if the type code is unknown
    pub field_type: Option<FieldType>,

    /// Raw field type code
    pub field_type_raw: u16,

    /// Number of values (not bytes)
    pub count: u32,

    /// Location of the value bytes
    pub value: TagValue,
}

impl IfdEntry {
    /// Parse one entry from exactly 12 bytes.
    ///
    /// Entries with an unknown field type parse successfully (so the tag can
    /// be skipped) with an empty inline value.
    pub fn parse(bytes: &[u8], byte_order: ByteOrder) -> Self {
        let tag = byte_order.read_u16(&bytes[0..2]);
        let field_type_raw = byte_order.read_u16(&bytes[2..4]);
        let count = byte_order.read_u32(&bytes[4..8]);
        let field = &bytes[8..IFD_ENTRY_SIZE];
        let field_type = FieldType::from_u16(field_type_raw);

        let value = match field_type {
            Some(ft) => {
                let length = ft.size_in_bytes() as u64 * count as u64;
                if length <= VALUE_FIELD_SIZE as u64 {
                    TagValue::Inline(Bytes::copy_from_slice(&field[..length as usize]))
                } else {
                    TagValue::OutOfLine {
                        offset: byte_order.read_u32(field) as u64,
                        length: length as usize,
                    }
                }
            }
            None => TagValue::Inline(Bytes::new()),
        };

        IfdEntry {
            tag,
            field_type,
            field_type_raw,
            count,
            value,
        }
    }

    /// Whether the value is stored inline.
    #[inline]
    pub fn is_inline(&self) -> bool {
        matches!(self.value, TagValue::Inline(_))
    }
}

// =============================================================================
// Tests
// =============================================================================
