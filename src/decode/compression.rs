//! Tile decompression.

use std::io::Read;

use bytes::Bytes;
use flate2::read::ZlibDecoder;
use weezl::decode::Decoder as LzwDecoder;
use weezl::BitOrder;

use crate::error::DecodeError;
use crate::tiff::Compression;

/// Decompress one tile.
///
/// `expected_len` is the size of a full decoded tile and is only used as a
/// capacity hint; a shorter result is reported later as insufficient data.
pub fn decompress(
    compression: Compression,
    data: Bytes,
    expected_len: usize,
) -> Result<Bytes, DecodeError> {
    match compression {
        Compression::None => Ok(data),
        Compression::Lzw => decode_lzw(&data, expected_len).map(Bytes::from),
        Compression::Deflate => decode_deflate(&data, expected_len).map(Bytes::from),
        Compression::PackBits => decode_packbits(&data, expected_len).map(Bytes::from),
    }
}

/// TIFF-flavoured LZW: MSB-first codes, 8-bit literals, early code-size switch.
fn decode_lzw(data: &[u8], expected_len: usize) -> Result<Vec<u8>, DecodeError> {
    let mut out = Vec::with_capacity(expected_len);
    let mut decoder = LzwDecoder::with_tiff_size_switch(BitOrder::Msb, 8);
    let result = decoder.into_vec(&mut out).decode_all(data);

    // A missing end code is tolerated; the length check happens on unpack
    result.status.map_err(|e| DecodeError::Decompression {
        compression: Compression::Lzw.name(),
        message: e.to_string(),
    })?;

    Ok(out)
}

fn decode_deflate(data: &[u8], expected_len: usize) -> Result<Vec<u8>, DecodeError> {
    let mut out = Vec::with_capacity(expected_len);
    ZlibDecoder::new(data)
        .read_to_end(&mut out)
        .map_err(|e| DecodeError::Decompression {
            compression: Compression::Deflate.name(),
            message: e.to_string(),
        })?;
    Ok(out)
}

/// Apple PackBits run-length decoding.
///
/// Header byte `h` (as i8): `0..=127` copies the next `h + 1` bytes,
/// `-127..=-1` repeats the next byte `1 - h` times, `-128` is a no-op.
fn decode_packbits(data: &[u8], expected_len: usize) -> Result<Vec<u8>, DecodeError> {
    let mut out = Vec::with_capacity(expected_len);
    let mut pos = 0;

    while pos < data.len() {
        let h = data[pos] as i8;
        pos += 1;

        if h >= 0 {
            let count = h as usize + 1;
            let literal = data.get(pos..pos + count).ok_or_else(|| truncated_packbits(pos))?;
            out.extend_from_slice(literal);
            pos += count;
        } else if h != -128 {
            let value = *data.get(pos).ok_or_else(|| truncated_packbits(pos))?;
            let count = (1 - h as isize) as usize;
            out.resize(out.len() + count, value);
            pos += 1;
        }
    }

    Ok(out)
}

fn truncated_packbits(pos: usize) -> DecodeError {
    DecodeError::Decompression {
        compression: Compression::PackBits.name(),
        message: format!("run truncated at byte {}", pos),
    }
}
