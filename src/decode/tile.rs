//! Window decoding over the tile grid of one level.
//!
//! Tiles are stored full size even on the right and bottom edges, so the
//! row stride inside every decoded tile is the full tile width. Only pixels
//! inside both the image and the requested window are written.

use bytes::Bytes;
use tracing::{debug, trace};

use super::compression::decompress;
use super::predictor::unpredict_horizontal;
use super::raster::{GrayBuffer, Raster, Rect, Sample, SampleType};
use crate::error::DecodeError;
use crate::io::RangeReader;
use crate::tiff::{ByteOrder, Compression, Document, Photometric, Predictor, RasterLevel};

/// A level checked for decodability, with its request-independent facts.
struct DecodePlan<'a> {
    level: &'a RasterLevel,
    tiles_across: u32,
    sample_type: SampleType,
    compression: Compression,
}

/// Decode the part of `level` that overlaps `window`.
///
/// The returned raster covers the intersection of the window and the image,
/// in level pixel coordinates.
pub async fn decode_window<R: RangeReader + ?Sized>(
    reader: &R,
    document: &Document,
    level: usize,
    window: Rect,
) -> Result<Raster, DecodeError> {
    let levels = document.levels.len();
    let desc = document
        .level(level)
        .ok_or(DecodeError::LevelOutOfRange { level, levels })?;

    let image = Rect::from_size(desc.width, desc.height);
    let plan = check_level(desc, &image, &window)?;
    let area = image.intersect(&window);

    let tw = desc.tile_width;
    let th = desc.tile_height;
    let first_col = area.min_x / tw;
    let last_col = (area.max_x - 1) / tw;
    let first_row = area.min_y / th;
    let last_row = (area.max_y - 1) / th;

    debug!(
        level,
        window = %area,
        tiles = (last_col - first_col + 1) * (last_row - first_row + 1),
        sample_type = %plan.sample_type,
        compression = plan.compression.name(),
        "decoding window"
    );

    let mut raster = Raster::new(plan.sample_type, area, document.nodata);

    for row in first_row..=last_row {
        for col in first_col..=last_col {
            let index = (row * plan.tiles_across + col) as usize;
            let tile_rect = Rect::new(
                col * tw,
                row * th,
                col.saturating_mul(tw).saturating_add(tw),
                row.saturating_mul(th).saturating_add(th),
            );
            let overlap = tile_rect.intersect(&area);

            let data = fetch_tile(reader, &plan, index, document.byte_order).await?;
            write_tile(&mut raster, &data, &tile_rect, &overlap, tw, document.byte_order, index)?;
        }
    }

    Ok(raster)
}

/// Validate a level against a window, in a fixed order so the reported
/// error is deterministic.
fn check_level<'a>(
    level: &'a RasterLevel,
    image: &Rect,
    window: &Rect,
) -> Result<DecodePlan<'a>, DecodeError> {
    if image.is_empty() {
        return Err(DecodeError::Format(format!(
            "level {} has size {}x{}",
            level.index, level.width, level.height
        )));
    }

    if level.tile_width == 0 {
        return Err(DecodeError::Unsupported(
            "strip-organized images (no TileWidth)".to_string(),
        ));
    }
    let (tiles_across, tiles_down) = level.tile_grid().ok_or_else(|| {
        DecodeError::Format(format!("level {} has TileWidth but no TileLength", level.index))
    })?;

    let tiles = tiles_across as usize * tiles_down as usize;
    if level.tile_offsets.len() < tiles || level.tile_byte_counts.len() < tiles {
        return Err(DecodeError::Format(format!(
            "inconsistent header: {} tiles in grid, {} offsets, {} byte counts",
            tiles,
            level.tile_offsets.len(),
            level.tile_byte_counts.len()
        )));
    }

    match level.bits_per_sample {
        0 => return Err(DecodeError::Format("BitsPerSample is 0".to_string())),
        8 | 16 => {}
        bits => {
            return Err(DecodeError::Unsupported(format!("{} bits per sample", bits)));
        }
    }

    if level.samples_per_pixel != 1 {
        return Err(DecodeError::Unsupported(format!(
            "{} samples per pixel",
            level.samples_per_pixel
        )));
    }

    if image.intersect(window).is_empty() {
        return Err(DecodeError::EmptyWindow {
            requested: window.to_string(),
            image: image.to_string(),
        });
    }

    let photometric = Photometric::from_u16(level.photometric);
    if photometric != Photometric::BlackIsZero {
        return Err(DecodeError::Unsupported(format!(
            "photometric interpretation {:?}",
            photometric
        )));
    }

    let sample_type = SampleType::from_format(level.sample_format, level.bits_per_sample)?;

    let compression = Compression::from_u16(level.compression).ok_or_else(|| {
        DecodeError::Unsupported(format!("compression {}", level.compression))
    })?;

    Ok(DecodePlan {
        level,
        tiles_across,
        sample_type,
        compression,
    })
}

/// Fetch, decompress and unpredict one tile.
async fn fetch_tile<R: RangeReader + ?Sized>(
    reader: &R,
    plan: &DecodePlan<'_>,
    index: usize,
    byte_order: ByteOrder,
) -> Result<Bytes, DecodeError> {
    let level = plan.level;
    let offset = level.tile_offsets[index] as u64;
    let length = level.tile_byte_counts[index] as usize;
    trace!(tile = index, offset, length, "fetching tile");

    let raw = reader.read_exact_at(offset, length).await?;
    let full_len = level.tile_width as usize
        * level.tile_height as usize
        * plan.sample_type.bytes_per_sample();
    let data = decompress(plan.compression, raw, full_len)?;

    match level.predictor {
        Predictor::None => Ok(data),
        Predictor::Horizontal => {
            let mut owned = data.to_vec();
            unpredict_horizontal(
                &mut owned,
                level.tile_width as usize,
                level.bits_per_sample,
                byte_order,
            )?;
            Ok(Bytes::from(owned))
        }
    }
}

fn write_tile(
    raster: &mut Raster,
    data: &[u8],
    tile: &Rect,
    overlap: &Rect,
    tile_width: u32,
    byte_order: ByteOrder,
    index: usize,
) -> Result<(), DecodeError> {
    match raster {
        Raster::GrayU8(buf) => unpack(buf, data, tile, overlap, tile_width, byte_order, index),
        Raster::GrayU16(buf) => unpack(buf, data, tile, overlap, tile_width, byte_order, index),
        Raster::GrayI8(buf) => unpack(buf, data, tile, overlap, tile_width, byte_order, index),
        Raster::GrayI16(buf) => unpack(buf, data, tile, overlap, tile_width, byte_order, index),
    }
}

/// Copy the overlap of one tile into the buffer, one row span at a time.
fn unpack<T: Sample>(
    buf: &mut GrayBuffer<T>,
    data: &[u8],
    tile: &Rect,
    overlap: &Rect,
    tile_width: u32,
    byte_order: ByteOrder,
    index: usize,
) -> Result<(), DecodeError> {
    let bps = T::BYTES;
    let span = overlap.width() as usize * bps;

    for y in overlap.min_y..overlap.max_y {
        let start = ((y - tile.min_y) as usize * tile_width as usize
            + (overlap.min_x - tile.min_x) as usize)
            * bps;
        let end = start + span;
        if end > data.len() {
            return Err(DecodeError::InsufficientData {
                tile: index,
                needed: end,
                available: data.len(),
            });
        }

        let dst = buf.row_span_mut(y, overlap.min_x, overlap.max_x);
        for (pixel, bytes) in dst.iter_mut().zip(data[start..end].chunks_exact(bps)) {
            *pixel = T::from_bytes(bytes, byte_order);
        }
    }

    Ok(())
}
