//! IFD chain walking.
//!
//! Every IFD in a COG is one resolution level: the first is the full
//! resolution image and each following one is an overview. The walk follows
//! next-IFD offsets until a zero offset, turning each directory into a
//! [`RasterLevel`]. Georeferencing and GDAL tags are taken from the first
//! directory only and stored on the [`Document`].

use std::collections::HashSet;

use tracing::{debug, trace, warn};

use crate::error::TiffError;
use crate::geo::{parse_geokey_directory, GeoKeyEntry, GeoTransform};
use crate::io::RangeReader;

use super::parser::{ByteOrder, IfdEntry, TiffHeader, IFD_ENTRY_SIZE, TIFF_HEADER_SIZE};
use super::tags::{Predictor, TiffTag};
use super::values::{check_count, check_min_count, ValueReader};

// =============================================================================
// RasterLevel
// =============================================================================

/// One resolution level, as described by one IFD.
///
/// Defaults follow the TIFF baseline for absent tags. Values that can only be
/// judged against a decode request (bit depth, sample format, tiling) are kept
/// raw and checked by the tile decoder.
#[derive(Debug, Clone, PartialEq)]
pub struct RasterLevel {
    /// Index of the IFD in the chain (0 = full resolution)
    pub index: usize,

    /// NewSubfileType flags (1 = reduced resolution)
    pub subfile_type: u32,

    /// Image width in pixels
    pub width: u32,

    /// Image height in pixels
    pub height: u32,

    /// Tile width in pixels (0 when the level is not tiled)
    pub tile_width: u32,

    /// Tile height in pixels
    pub tile_height: u32,

    /// Raw compression code
    pub compression: u16,

    /// Predictor applied before compression
    pub predictor: Predictor,

    /// Raw photometric interpretation code
    pub photometric: u16,

    /// Components per pixel
    pub samples_per_pixel: u16,

    /// Bits per sample (first value of the array)
    pub bits_per_sample: u16,

    /// Raw sample format code (first value of the array)
    pub sample_format: u16,

    /// Byte offset of each tile, row-major
    pub tile_offsets: Vec<u32>,

    /// Byte count of each tile, row-major
    pub tile_byte_counts: Vec<u32>,

    /// Tag ids present in the IFD but not consumed
    pub unrecognized_tags: Vec<u16>,
}

impl RasterLevel {
    fn new(index: usize) -> Self {
        Self {
            index,
            subfile_type: 0,
            width: 0,
            height: 0,
            tile_width: 0,
            tile_height: 0,
            compression: 1,
            predictor: Predictor::None,
            photometric: 1,
            samples_per_pixel: 1,
            bits_per_sample: 1,
            sample_format: 1,
            tile_offsets: Vec::new(),
            tile_byte_counts: Vec::new(),
            unrecognized_tags: Vec::new(),
        }
    }

    /// Number of tiles across and down, or `None` if the level is not tiled.
    pub fn tile_grid(&self) -> Option<(u32, u32)> {
        if self.tile_width == 0 || self.tile_height == 0 {
            return None;
        }
        Some((
            self.width.div_ceil(self.tile_width),
            self.height.div_ceil(self.tile_height),
        ))
    }

    /// Pixel dimensions as `[width, height]`.
    pub fn size(&self) -> [u32; 2] {
        [self.width, self.height]
    }
}

// =============================================================================
// Document
// =============================================================================

/// A whole parsed GeoTIFF.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    /// Byte order of the file
    pub byte_order: ByteOrder,

    /// Resolution levels in chain order
    pub levels: Vec<RasterLevel>,

    /// Level-0 geotransform
    pub geotransform: GeoTransform,

    /// GDAL nodata value (0 when absent or unparseable)
    pub nodata: f64,

    /// GDAL XML metadata, verbatim
    pub metadata: Option<String>,

    /// GeoDoubleParams array
    pub geo_double_params: Option<Vec<f64>>,

    /// GeoAsciiParams string
    pub geo_ascii_params: Option<String>,

    /// Unresolved GeoKey records
    pub geo_keys: Vec<GeoKeyEntry>,
}

/// Geo and GDAL tag values collected from the first IFD.
#[derive(Default)]
struct GeoTags {
    pixel_scale: Option<Vec<f64>>,
    tiepoint: Option<Vec<f64>>,
    nodata: Option<f64>,
    metadata: Option<String>,
    double_params: Option<Vec<f64>>,
    ascii_params: Option<String>,
    keys: Vec<GeoKeyEntry>,
}

impl Document {
    /// Parse the header and every IFD reachable from it.
    ///
    /// # Errors
    /// - Header errors (`InvalidMagic`, `InvalidVersion`)
    /// - `InvalidTagValue` naming the tag when an entry has the wrong type or count
    /// - `Unsupported` for planar, predictor and ModelTransformation features
    /// - `DirectoryLoop` / `TooManyDirectories` for a malformed chain
    /// - `Io` when a read fails
    pub async fn parse<R: RangeReader + ?Sized>(
        reader: &R,
        max_directories: usize,
    ) -> Result<Self, TiffError> {
        let header_bytes = reader.read_exact_at(0, TIFF_HEADER_SIZE).await?;
        let header = TiffHeader::parse(&header_bytes)?;
        let byte_order = header.byte_order;
        let values = ValueReader::new(reader, byte_order);

        let mut levels = Vec::new();
        let mut geo = GeoTags::default();
        let mut visited = HashSet::new();
        let mut offset = header.first_ifd_offset;

        while offset != 0 {
            if !visited.insert(offset) {
                return Err(TiffError::DirectoryLoop(offset));
            }
            if levels.len() >= max_directories {
                return Err(TiffError::TooManyDirectories(max_directories));
            }

            let (entries, next) = read_ifd(reader, byte_order, offset).await?;
            let index = levels.len();
            let mut level = RasterLevel::new(index);

            for entry in &entries {
                apply_entry(&values, entry, &mut level, &mut geo).await?;
            }

            debug!(
                ifd = index,
                offset,
                width = level.width,
                height = level.height,
                tile_width = level.tile_width,
                tile_height = level.tile_height,
                tiles = level.tile_offsets.len(),
                "parsed IFD"
            );
            if !level.unrecognized_tags.is_empty() {
                debug!(ifd = index, tags = ?level.unrecognized_tags, "unrecognized tags");
            }

            levels.push(level);
            offset = next;
        }

        Ok(Document {
            byte_order,
            levels,
            geotransform: GeoTransform::from_tags(
                geo.pixel_scale.as_deref(),
                geo.tiepoint.as_deref(),
            ),
            nodata: geo.nodata.unwrap_or(0.0),
            metadata: geo.metadata,
            geo_double_params: geo.double_params,
            geo_ascii_params: geo.ascii_params,
            geo_keys: geo.keys,
        })
    }

    /// Get a level, or `None` if out of range.
    pub fn level(&self, level: usize) -> Option<&RasterLevel> {
        self.levels.get(level)
    }
}

/// Read one IFD's entries and its next-IFD offset.
async fn read_ifd<R: RangeReader + ?Sized>(
    reader: &R,
    byte_order: ByteOrder,
    offset: u64,
) -> Result<(Vec<IfdEntry>, u64), TiffError> {
    let count_bytes = reader.read_exact_at(offset, 2).await?;
    let entry_count = byte_order.read_u16(&count_bytes) as usize;

    // Entries plus the 4-byte next offset in one read
    let body_len = entry_count * IFD_ENTRY_SIZE + 4;
    let body = reader.read_exact_at(offset + 2, body_len).await?;

    let entries = body[..entry_count * IFD_ENTRY_SIZE]
        .chunks_exact(IFD_ENTRY_SIZE)
        .map(|raw| IfdEntry::parse(raw, byte_order))
        .collect();
    let next = byte_order.read_u32(&body[entry_count * IFD_ENTRY_SIZE..]) as u64;

    Ok((entries, next))
}

/// Fold one entry into the level (and, for the first IFD, the geo tags).
async fn apply_entry<R: RangeReader + ?Sized>(
    values: &ValueReader<'_, R>,
    entry: &IfdEntry,
    level: &mut RasterLevel,
    geo: &mut GeoTags,
) -> Result<(), TiffError> {
    let Some(tag) = TiffTag::from_u16(entry.tag) else {
        level.unrecognized_tags.push(entry.tag);
        return Ok(());
    };

    match tag {
        TiffTag::NewSubfileType => level.subfile_type = values.read_long(entry, tag).await?,
        TiffTag::ImageWidth => level.width = values.read_dimension(entry, tag).await?,
        TiffTag::ImageLength => level.height = values.read_dimension(entry, tag).await?,
        TiffTag::TileWidth => level.tile_width = values.read_dimension(entry, tag).await?,
        TiffTag::TileLength => level.tile_height = values.read_dimension(entry, tag).await?,
        TiffTag::BitsPerSample => level.bits_per_sample = values.read_first_short(entry, tag).await?,
        TiffTag::Compression => level.compression = values.read_short(entry, tag).await?,
        TiffTag::PhotometricInterpretation => {
            level.photometric = values.read_short(entry, tag).await?
        }
        TiffTag::SamplesPerPixel => level.samples_per_pixel = values.read_short(entry, tag).await?,
        TiffTag::SampleFormat => level.sample_format = values.read_first_short(entry, tag).await?,
        TiffTag::PlanarConfiguration => {
            let planar = values.read_first_short(entry, tag).await?;
            if planar != 1 {
                return Err(TiffError::Unsupported(format!(
                    "planar configuration {} (only chunky is supported)",
                    planar
                )));
            }
        }
        TiffTag::Predictor => {
            let code = values.read_first_short(entry, tag).await?;
            level.predictor = Predictor::from_u16(code)
                .ok_or_else(|| TiffError::Unsupported(format!("predictor {}", code)))?;
        }
        TiffTag::TileOffsets => level.tile_offsets = values.read_longs(entry, tag).await?,
        TiffTag::TileByteCounts => level.tile_byte_counts = values.read_longs(entry, tag).await?,
        TiffTag::ModelTransformation => {
            return Err(TiffError::Unsupported(
                "ModelTransformation georeferencing".to_string(),
            ));
        }
        _ if level.index > 0 => {
            trace!(ifd = level.index, tag = entry.tag, "geo tag outside first IFD skipped");
        }
        TiffTag::ModelPixelScale => {
            check_count(entry, tag, 3)?;
            geo.pixel_scale = Some(values.read_doubles(entry, tag).await?);
        }
        TiffTag::ModelTiepoint => {
            check_min_count(entry, tag, 6)?;
            geo.tiepoint = Some(values.read_doubles(entry, tag).await?);
        }
        TiffTag::GeoKeyDirectory => {
            let shorts = values.read_shorts(entry, tag).await?;
            geo.keys = parse_geokey_directory(&shorts)?;
        }
        TiffTag::GeoDoubleParams => geo.double_params = Some(values.read_doubles(entry, tag).await?),
        TiffTag::GeoAsciiParams => geo.ascii_params = Some(values.read_ascii(entry, tag).await?),
        TiffTag::GdalMetadata => geo.metadata = Some(values.read_ascii(entry, tag).await?),
        TiffTag::GdalNoData => {
            let raw = values.read_ascii(entry, tag).await?;
            geo.nodata = Some(match raw.trim().parse::<f64>() {
                Ok(value) => value,
                Err(e) => {
                    warn!(value = %raw, error = %e, "unparseable GDAL nodata, using 0");
                    0.0
                }
            });
        }
    }

    Ok(())
}
