//! End-to-end pixel decoding tests.
//!
//! Tests verify:
//! - Every codec and the horizontal predictor produce the source pixels
//! - Windows spanning several tiles fetch only those tiles
//! - Non-square tiles and partial edge tiles are laid out correctly
//! - Overview levels and level selection
//! - Unsupported features fail before any tile is fetched

use cog_stream::{cog, Cog, DecodeError, ErrorKind, MemoryReader, Photometric, Raster, Rect, SampleType};

use super::test_utils::{
    deflate_encode, difference_u16, difference_u8, image_u16, image_u8, lzw_encode,
    packbits_encode, split_tiles, Endian, IfdSpec, TiffBuilder, TrackingMockReader, Value,
};

fn gradient(x: u32, y: u32) -> u8 {
    ((x * 3 + y * 7) % 251) as u8
}

fn assert_u8_matches(raster: &Raster, f: impl Fn(u32, u32) -> u8) {
    let buffer = raster.as_u8().expect("8-bit raster");
    let bounds = buffer.bounds();
    for y in bounds.min_y..bounds.max_y {
        for x in bounds.min_x..bounds.max_x {
            assert_eq!(buffer.get(x, y), Some(f(x, y)), "pixel ({}, {})", x, y);
        }
    }
}

/// Single-level 8-bit file with the given codec.
fn u8_file(width: u32, height: u32, tile: (u32, u32), compression: u16, predictor: bool) -> Vec<u8> {
    let image = image_u8(width, height, gradient);
    let tiles = split_tiles(&image, width, height, tile.0, tile.1, 1)
        .into_iter()
        .map(|mut t| {
            if predictor {
                difference_u8(&mut t, tile.0 as usize);
            }
            match compression {
                5 => lzw_encode(&t),
                8 => deflate_encode(&t),
                32773 => packbits_encode(&t),
                _ => t,
            }
        })
        .collect();

    let mut ifd = IfdSpec::tiled(width, height, tile.0, tile.1, 8, compression, tiles);
    if predictor {
        ifd.predictor();
    }
    TiffBuilder::new(Endian::Little).ifd(ifd).build()
}

// =============================================================================
// Codecs
// =============================================================================

#[tokio::test]
async fn test_single_uncompressed_tile() {
    let file = u8_file(256, 256, (256, 256), 1, false);
    let raster = cog::decode(&MemoryReader::new(file)).await.unwrap();

    assert_eq!(raster.sample_type(), SampleType::UInt8);
    assert_eq!(raster.bounds(), Rect::from_size(256, 256));
    assert_u8_matches(&raster, gradient);

    let buffer = raster.as_u8().unwrap();
    assert_eq!((buffer.min(), buffer.max()), (0, 255));
}

#[tokio::test]
async fn test_every_codec_round_trips() {
    for compression in [1u16, 5, 8, 32773] {
        let file = u8_file(80, 48, (32, 32), compression, false);
        let raster = cog::decode(&MemoryReader::new(file)).await.unwrap();
        assert_eq!(raster.bounds(), Rect::from_size(80, 48), "compression {}", compression);
        assert_u8_matches(&raster, gradient);
    }
}

#[tokio::test]
async fn test_lzw_with_horizontal_predictor() {
    let file = u8_file(64, 64, (32, 32), 5, true);
    let raster = cog::decode(&MemoryReader::new(file)).await.unwrap();
    assert_u8_matches(&raster, gradient);
}

#[tokio::test]
async fn test_signed_16bit_deflate_predictor_both_byte_orders() {
    let value = |x: u32, y: u32| (x as i32 * 300 - y as i32 * 250) as i16;

    for endian in [Endian::Little, Endian::Big] {
        let image = image_u16(40, 24, endian, |x, y| value(x, y) as u16);
        let tiles = split_tiles(&image, 40, 24, 16, 16, 2)
            .into_iter()
            .map(|mut t| {
                difference_u16(&mut t, 16, endian);
                deflate_encode(&t)
            })
            .collect();
        let mut ifd = IfdSpec::tiled(40, 24, 16, 16, 16, 8, tiles);
        ifd.signed().predictor();
        let file = TiffBuilder::new(endian).ifd(ifd).build();

        let raster = cog::decode(&MemoryReader::new(file)).await.unwrap();
        let buffer = raster.as_i16().expect("signed 16-bit raster");
        assert_eq!((buffer.min(), buffer.max()), (i16::MIN, i16::MAX));
        for y in 0..24 {
            for x in 0..40 {
                assert_eq!(buffer.get(x, y), Some(value(x, y)), "{:?} ({}, {})", endian, x, y);
            }
        }
    }
}

#[tokio::test]
async fn test_unsigned_16bit_packbits_big_endian() {
    let image = image_u16(20, 20, Endian::Big, |x, y| (x * 1000 + y) as u16);
    let tiles = split_tiles(&image, 20, 20, 16, 16, 2)
        .iter()
        .map(|t| packbits_encode(t))
        .collect();
    let file = TiffBuilder::new(Endian::Big)
        .ifd(IfdSpec::tiled(20, 20, 16, 16, 16, 32773, tiles))
        .build();

    let raster = cog::decode(&MemoryReader::new(file)).await.unwrap();
    let buffer = raster.as_u16().unwrap();
    assert_eq!(buffer.get(19, 3), Some(19003));
    assert_eq!(buffer.get(0, 19), Some(19));
}

// =============================================================================
// Tile Grid
// =============================================================================

#[tokio::test]
async fn test_window_straddling_four_tiles_fetches_four_tiles() {
    let file = u8_file(64, 64, (32, 32), 1, false);
    let cog = Cog::open(TrackingMockReader::new(file)).await.unwrap();
    let after_parse = cog.reader().request_count();

    let window = Rect::new(20, 20, 44, 44);
    let raster = cog.decode_level_window(0, window).await.unwrap();

    assert_eq!(raster.bounds(), window);
    assert_eq!(raster.width(), 24);
    assert_u8_matches(&raster, gradient);
    assert_eq!(cog.reader().request_count() - after_parse, 4);
}

#[tokio::test]
async fn test_window_inside_one_tile_fetches_one_tile() {
    let file = u8_file(64, 64, (32, 32), 1, false);
    let cog = Cog::open(TrackingMockReader::new(file)).await.unwrap();
    let after_parse = cog.reader().request_count();

    let raster = cog.decode_level_window(0, Rect::new(33, 1, 40, 8)).await.unwrap();
    assert_u8_matches(&raster, gradient);

    let requests = cog.reader().get_requests().await;
    assert_eq!(requests.len() - after_parse, 1);
    let level = &cog.document().levels[0];
    assert_eq!(requests.last().unwrap().0, level.tile_offsets[1] as u64);
}

#[tokio::test]
async fn test_window_is_clipped_to_image() {
    let file = u8_file(50, 30, (32, 32), 1, false);
    let raster = cog::decode_level_window(&MemoryReader::new(file), 0, Rect::new(40, 10, 500, 500))
        .await
        .unwrap();

    assert_eq!(raster.bounds(), Rect::new(40, 10, 50, 30));
    assert_u8_matches(&raster, gradient);
}

#[tokio::test]
async fn test_non_square_tiles() {
    // Two tiles across, three down; a row loop driven by tile width would
    // stop after row one and leave the bottom band empty.
    let file = u8_file(48, 40, (32, 16), 8, false);
    let raster = cog::decode(&MemoryReader::new(file)).await.unwrap();

    assert_eq!(raster.bounds(), Rect::from_size(48, 40));
    assert_u8_matches(&raster, gradient);
    assert_eq!(raster.value(47, 39), Some(gradient(47, 39) as f64));
}

#[tokio::test]
async fn test_empty_window_rejected() {
    let file = u8_file(32, 32, (32, 32), 1, false);
    let err = cog::decode_level_window(&MemoryReader::new(file), 0, Rect::new(40, 40, 50, 50))
        .await
        .unwrap_err();
    assert!(matches!(err, DecodeError::EmptyWindow { .. }));
    assert_eq!(err.kind(), ErrorKind::InvalidRequest);
}

// =============================================================================
// Levels
// =============================================================================

fn pyramid() -> Vec<u8> {
    let mut builder = TiffBuilder::new(Endian::Little);
    for size in [64u32, 32, 16] {
        let image = image_u8(size, size, |x, y| (x + y + size) as u8);
        let tiles = split_tiles(&image, size, size, 16, 16, 1);
        let mut ifd = IfdSpec::tiled(size, size, 16, 16, 8, 1, tiles);
        if size != 64 {
            ifd.set(254, Value::Long(vec![1]));
        }
        builder = builder.ifd(ifd);
    }
    builder.build()
}

#[tokio::test]
async fn test_overview_levels() {
    let reader = MemoryReader::new(pyramid());

    let raster = cog::decode_level(&reader, 2).await.unwrap();
    assert_eq!(raster.bounds(), Rect::from_size(16, 16));
    assert_u8_matches(&raster, |x, y| (x + y + 16) as u8);

    let config = cog::decode_config_level(&reader, 1).await.unwrap();
    assert_eq!((config.width, config.height), (32, 32));
    assert_eq!(config.sample_type, SampleType::UInt8);
    assert_eq!(config.photometric, Photometric::BlackIsZero);

    let base = cog::decode_config(&reader).await.unwrap();
    assert_eq!((base.width, base.height), (64, 64));
}

#[tokio::test]
async fn test_level_out_of_range() {
    let reader = MemoryReader::new(pyramid());

    let err = cog::decode_level(&reader, 3).await.unwrap_err();
    assert!(matches!(err, DecodeError::LevelOutOfRange { level: 3, levels: 3 }));

    let err = cog::decode_config_level(&reader, 7).await.unwrap_err();
    assert!(matches!(err, DecodeError::LevelOutOfRange { level: 7, .. }));
}

// =============================================================================
// Failures
// =============================================================================

#[tokio::test]
async fn test_unknown_compression_fails_before_fetching_tiles() {
    let file = u8_file(32, 32, (32, 32), 99, false);
    let cog = Cog::open(TrackingMockReader::new(file)).await.unwrap();
    let after_parse = cog.reader().request_count();

    let err = cog.decode().await.unwrap_err();
    assert!(matches!(err, DecodeError::Unsupported(_)));
    assert_eq!(err.kind(), ErrorKind::Unsupported);
    assert_eq!(cog.reader().request_count(), after_parse);
}

#[tokio::test]
async fn test_short_tile_is_insufficient_data() {
    let file = TiffBuilder::new(Endian::Little)
        .ifd(IfdSpec::tiled(4, 3, 4, 3, 8, 1, vec![vec![7u8; 10]]))
        .build();

    let err = cog::decode(&MemoryReader::new(file)).await.unwrap_err();
    assert!(matches!(
        err,
        DecodeError::InsufficientData { tile: 0, available: 10, .. }
    ));
    assert_eq!(err.kind(), ErrorKind::InsufficientData);
}

#[tokio::test]
async fn test_unsupported_layouts() {
    let mut rgb = IfdSpec::tiled(16, 16, 16, 16, 8, 1, vec![vec![0; 256]]);
    rgb.set(262, Value::Short(vec![2]));

    let mut float = IfdSpec::tiled(16, 16, 16, 16, 16, 1, vec![vec![0; 512]]);
    float.set(339, Value::Short(vec![3]));

    let mut strips = IfdSpec::tiled(16, 16, 16, 16, 8, 1, vec![vec![0; 256]]);
    strips.remove(322).remove(323);

    let thirty_two = IfdSpec::tiled(16, 16, 16, 16, 32, 1, vec![vec![0; 1024]]);

    for ifd in [rgb, float, strips, thirty_two] {
        let file = TiffBuilder::new(Endian::Little).ifd(ifd).build();
        let err = cog::decode(&MemoryReader::new(file)).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unsupported, "{}", err);
    }
}

#[tokio::test]
async fn test_inconsistent_tile_count() {
    // Grid of four tiles but only one offset
    let file = TiffBuilder::new(Endian::Little)
        .ifd(IfdSpec::tiled(32, 32, 16, 16, 8, 1, vec![vec![0; 256]]))
        .build();

    let err = cog::decode(&MemoryReader::new(file)).await.unwrap_err();
    assert!(matches!(err, DecodeError::Format(ref m) if m.contains("inconsistent header")));
}
