//! Horizontal predictor reversal.
//!
//! With predictor 2 each sample after the first in a row is stored as the
//! difference from its left neighbour. Reversal is a running sum per row with
//! wrapping arithmetic at the sample's width.

use crate::error::DecodeError;
use crate::tiff::ByteOrder;

/// Undo differencing on one row of 8-bit samples.
pub fn unpredict_row_u8(row: &mut [u8]) {
    for i in 1..row.len() {
        row[i] = row[i].wrapping_add(row[i - 1]);
    }
}

/// Undo differencing on one row of 16-bit samples stored in `byte_order`.
///
/// A trailing odd byte is left untouched.
pub fn unpredict_row_u16(row: &mut [u8], byte_order: ByteOrder) {
    let samples = row.len() / 2;
    if samples < 2 {
        return;
    }

    let mut prev = byte_order.read_u16(&row[0..2]);
    for i in 1..samples {
        let at = i * 2;
        let value = byte_order.read_u16(&row[at..at + 2]).wrapping_add(prev);
        row[at..at + 2].copy_from_slice(&byte_order.u16_bytes(value));
        prev = value;
    }
}

/// Undo differencing on every complete row of a decoded tile.
///
/// `row_len` is the tile width in samples. A trailing partial row is left as
/// is; it can only come from a short tile, which the unpack step rejects.
pub fn unpredict_horizontal(
    data: &mut [u8],
    row_len: usize,
    bits_per_sample: u16,
    byte_order: ByteOrder,
) -> Result<(), DecodeError> {
    match bits_per_sample {
        8 => {
            for row in data.chunks_exact_mut(row_len) {
                unpredict_row_u8(row);
            }
        }
        16 => {
            for row in data.chunks_exact_mut(row_len * 2) {
                unpredict_row_u16(row, byte_order);
            }
        }
        other => {
            return Err(DecodeError::Unsupported(format!(
                "horizontal predictor with {} bits per sample",
                other
            )))
        }
    }
    Ok(())
}
