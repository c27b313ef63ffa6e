//! TIFF/GeoTIFF directory parsing.
//!
//! # Key Concepts
//!
//! - **Byte order**: TIFF files declare their endianness (II = little-endian, MM = big-endian)
//!   in the header. All multi-byte values must be read respecting this order.
//!
//! - **Classic TIFF only**: 32-bit offsets and 12-byte IFD entries. BigTIFF is rejected.
//!
//! - **IFD (Image File Directory)**: one per resolution level in a COG, linked
//!   by next-IFD offsets.
//!
//! - **Inline vs offset values**: Values of at most 4 bytes are stored inline in the IFD
//!   entry, larger values are stored at an offset pointed to by the entry.

mod directory;
mod parser;
mod tags;
mod values;

pub use directory::{Document, RasterLevel};
pub use parser::{ByteOrder, IfdEntry, TagValue, TiffHeader, IFD_ENTRY_SIZE, TIFF_HEADER_SIZE};
pub use tags::{Compression, FieldType, Photometric, Predictor, SampleFormat, TiffTag};
pub use values::{decode_ascii, ValueReader};
