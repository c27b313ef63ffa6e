//! Entry points for decoding a Cloud-Optimized GeoTIFF.
//!
//! The free functions take any [`RangeReader`] and parse the directory
//! structure on every call. [`Cog`] parses once and keeps the [`Document`]
//! for repeated window reads against the same file.
//!
//! ```text
//!   reader ──► Document::parse ──► decode_window ──► Raster
//!                    │
//!                    └──────────► geotransform / CRS ──► GeoInfo
//! ```
//!
//! # Example
//!
//! ```rust,no_run
//! use cog_stream::{Cog, Rect, ReaderConfig};
//!
//! # async fn run() -> Result<(), cog_stream::DecodeError> {
//! let cog = Cog::open_url("https://example.com/dem.tif", &ReaderConfig::default()).await?;
//! let raster = cog.decode_level_window(0, Rect::new(0, 0, 512, 512)).await?;
//! println!("{} x {} {}", raster.width(), raster.height(), raster.sample_type());
//! # Ok(())
//! # }
//! ```

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::{ReaderConfig, DEFAULT_MAX_DIRECTORIES};
use crate::decode::{decode_window, Raster, Rect, SampleType};
use crate::error::{DecodeError, GeoError};
use crate::geo::{geotransform_for, resolve_crs, CrsInterpreter, EpsgInterpreter, GeoTransform};
use crate::io::{HttpRangeReader, RangeCache, RangeReader};
use crate::tiff::{Document, Photometric};

// =============================================================================
// Summaries
// =============================================================================

/// Dimensions and pixel layout of one level, without any pixel data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RasterConfig {
    pub width: u32,
    pub height: u32,
    pub sample_type: SampleType,
    pub photometric: Photometric,
}

/// Size of one resolution level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Overview {
    pub size: [u32; 2],
}

/// Georeferencing summary of a file.
///
/// `overviews` lists every level, full resolution included.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoInfo {
    #[serde(rename = "type")]
    pub sample_type: SampleType,
    pub size: [u32; 2],
    #[serde(rename = "geoTransform")]
    pub geotransform: GeoTransform,
    pub crs: String,
    #[serde(rename = "noDataValue")]
    pub nodata: f64,
    pub overviews: Vec<Overview>,
}

impl GeoInfo {
    /// Geotransform of `level`, scaled from the full-resolution transform.
    pub fn geotransform(&self, level: usize) -> Result<GeoTransform, GeoError> {
        let levels = self.overviews.len();
        let overview = self
            .overviews
            .get(level)
            .ok_or(GeoError::LevelOutOfRange { level, levels })?;

        if level == 0 {
            return Ok(self.geotransform);
        }
        Ok(self.geotransform.for_overview(self.size, overview.size))
    }
}

// =============================================================================
// Cog
// =============================================================================

/// A byte source together with its parsed directory structure.
pub struct Cog<R> {
    reader: R,
    document: Document,
}

impl<R: RangeReader> Cog<R> {
    /// Parse the file behind `reader` with the default directory limit.
    pub async fn open(reader: R) -> Result<Self, DecodeError> {
        Self::open_with_limit(reader, DEFAULT_MAX_DIRECTORIES).await
    }

    /// Parse the file, failing if the IFD chain is longer than `max_directories`.
    pub async fn open_with_limit(reader: R, max_directories: usize) -> Result<Self, DecodeError> {
        let document = Document::parse(&reader, max_directories).await?;
        Ok(Self { reader, document })
    }

    pub fn reader(&self) -> &R {
        &self.reader
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn into_reader(self) -> R {
        self.reader
    }

    /// Number of resolution levels.
    pub fn level_count(&self) -> usize {
        self.document.levels.len()
    }

    /// Decode the full-resolution image.
    pub async fn decode(&self) -> Result<Raster, DecodeError> {
        self.decode_level(0).await
    }

    /// Decode every pixel of `level`.
    pub async fn decode_level(&self, level: usize) -> Result<Raster, DecodeError> {
        let window = full_window(&self.document, level)?;
        decode_window(&self.reader, &self.document, level, window).await
    }

    /// Decode the part of `level` overlapping `window`.
    pub async fn decode_level_window(
        &self,
        level: usize,
        window: Rect,
    ) -> Result<Raster, DecodeError> {
        decode_window(&self.reader, &self.document, level, window).await
    }

    pub fn config_level(&self, level: usize) -> Result<RasterConfig, DecodeError> {
        raster_config(&self.document, level)
    }

    /// Geotransform of `level`.
    pub fn geotransform(&self, level: usize) -> Result<GeoTransform, GeoError> {
        geotransform_for(&self.document, level)
    }

    /// Georeferencing summary using the default EPSG interpreter.
    pub fn geo_info(&self) -> Result<GeoInfo, DecodeError> {
        geo_info(&self.document, &EpsgInterpreter)
    }

    /// Georeferencing summary using a caller-supplied CRS interpreter.
    pub fn geo_info_with(&self, interpreter: &dyn CrsInterpreter) -> Result<GeoInfo, DecodeError> {
        geo_info(&self.document, interpreter)
    }
}

impl Cog<RangeCache<HttpRangeReader>> {
    /// Open a remote file through a chunk cache, honouring every setting in `config`.
    pub async fn open_url(url: &str, config: &ReaderConfig) -> Result<Self, DecodeError> {
        let reader = open_url(url, config)?;
        Self::open_with_limit(reader, config.max_directories).await
    }
}

// =============================================================================
// One-shot entry points
// =============================================================================

/// Build a cached HTTP reader for `url`.
///
/// No request is sent; the first read fetches the chunk holding the header.
pub fn open_url(
    url: &str,
    config: &ReaderConfig,
) -> Result<RangeCache<HttpRangeReader>, DecodeError> {
    config.validate().map_err(DecodeError::InvalidConfig)?;
    let reader = HttpRangeReader::with_config(url, config)?;
    debug!(url, chunk_size = config.chunk_size, "opened remote COG");
    Ok(RangeCache::with_chunk_size(reader, config.chunk_size))
}

/// Decode the full-resolution image.
pub async fn decode<R: RangeReader + ?Sized>(reader: &R) -> Result<Raster, DecodeError> {
    decode_level(reader, 0).await
}

/// Decode every pixel of `level`.
pub async fn decode_level<R: RangeReader + ?Sized>(
    reader: &R,
    level: usize,
) -> Result<Raster, DecodeError> {
    let document = Document::parse(reader, DEFAULT_MAX_DIRECTORIES).await?;
    let window = full_window(&document, level)?;
    decode_window(reader, &document, level, window).await
}

/// Decode the part of `level` overlapping `window`.
pub async fn decode_level_window<R: RangeReader + ?Sized>(
    reader: &R,
    level: usize,
    window: Rect,
) -> Result<Raster, DecodeError> {
    let document = Document::parse(reader, DEFAULT_MAX_DIRECTORIES).await?;
    decode_window(reader, &document, level, window).await
}

/// Dimensions and pixel layout of the full-resolution image.
pub async fn decode_config<R: RangeReader + ?Sized>(
    reader: &R,
) -> Result<RasterConfig, DecodeError> {
    decode_config_level(reader, 0).await
}

/// Dimensions and pixel layout of `level`.
pub async fn decode_config_level<R: RangeReader + ?Sized>(
    reader: &R,
    level: usize,
) -> Result<RasterConfig, DecodeError> {
    let document = Document::parse(reader, DEFAULT_MAX_DIRECTORIES).await?;
    raster_config(&document, level)
}

/// Georeferencing summary, resolving the CRS with [`EpsgInterpreter`].
pub async fn decode_geo_info<R: RangeReader + ?Sized>(reader: &R) -> Result<GeoInfo, DecodeError> {
    let document = Document::parse(reader, DEFAULT_MAX_DIRECTORIES).await?;
    geo_info(&document, &EpsgInterpreter)
}

// =============================================================================
// Helpers
// =============================================================================

fn full_window(document: &Document, level: usize) -> Result<Rect, DecodeError> {
    let levels = document.levels.len();
    let desc = document
        .level(level)
        .ok_or(DecodeError::LevelOutOfRange { level, levels })?;
    Ok(Rect::from_size(desc.width, desc.height))
}

fn raster_config(document: &Document, level: usize) -> Result<RasterConfig, DecodeError> {
    let levels = document.levels.len();
    let desc = document
        .level(level)
        .ok_or(DecodeError::LevelOutOfRange { level, levels })?;

    Ok(RasterConfig {
        width: desc.width,
        height: desc.height,
        sample_type: SampleType::from_format(desc.sample_format, desc.bits_per_sample)?,
        photometric: Photometric::from_u16(desc.photometric),
    })
}

fn geo_info(document: &Document, interpreter: &dyn CrsInterpreter) -> Result<GeoInfo, DecodeError> {
    let base = document
        .level(0)
        .ok_or(DecodeError::LevelOutOfRange { level: 0, levels: 0 })?;
    let sample_type = SampleType::from_format(base.sample_format, base.bits_per_sample)?;
    let crs = resolve_crs(document, interpreter)?;

    Ok(GeoInfo {
        sample_type,
        size: base.size(),
        geotransform: document.geotransform,
        crs,
        nodata: document.nodata,
        overviews: document
            .levels
            .iter()
            .map(|level| Overview { size: level.size() })
            .collect(),
    })
}
