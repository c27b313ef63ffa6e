//! # COG Stream
//!
//! Decode Cloud-Optimized GeoTIFFs (COGs) over HTTP range requests.
//!
//! Only the bytes needed for the directory structure and the tiles covering
//! a requested window are fetched, so a small window out of a multi-gigabyte
//! elevation model costs a handful of requests.
//!
//! ## Features
//!
//! - **Range-based streaming**: aligned chunk cache over any async byte source
//! - **Classic TIFF**: little- and big-endian files, tiled layout, any number of overview levels
//! - **Codecs**: uncompressed, LZW, deflate and PackBits tiles, horizontal predictor
//! - **Georeferencing**: geotransform per level, nodata, GeoKey-based CRS resolution
//!
//! ## Architecture
//!
//! - [`io`] - `RangeReader` trait, HTTP and in-memory sources, chunk cache
//! - [`tiff`] - header, IFD chain and tag value decoding into a [`Document`]
//! - [`geo`] - geotransforms and CRS interpretation
//! - [`decode`] - tile grid traversal, decompression and typed rasters
//! - [`cog`] - one-call entry points tying the layers together
//! - [`config`] - reader settings
//!
//! ## Example
//!
//! ```rust,no_run
//! use cog_stream::{cog, Rect, ReaderConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let reader = cog::open_url("https://example.com/dem.tif", &ReaderConfig::default())?;
//!
//!     let info = cog::decode_geo_info(&reader).await?;
//!     println!("{}", serde_json::to_string_pretty(&info)?);
//!
//!     let raster = cog::decode_level_window(&reader, 1, Rect::new(0, 0, 256, 256)).await?;
//!     println!("{:?}", raster.value(10, 10));
//!     Ok(())
//! }
//! ```

pub mod cog;
pub mod config;
pub mod decode;
pub mod error;
pub mod geo;
pub mod io;
pub mod tiff;

// Re-export commonly used types
pub use cog::{
    decode, decode_config, decode_config_level, decode_geo_info, decode_level,
    decode_level_window, open_url, Cog, GeoInfo, Overview, RasterConfig,
};
pub use config::ReaderConfig;
pub use decode::{GrayBuffer, Raster, Rect, SampleType};
pub use error::{DecodeError, ErrorKind, GeoError, IoError, TiffError};
pub use geo::{CrsInterpreter, EpsgInterpreter, GeoKeyEntry, GeoTransform};
pub use io::{HttpRangeReader, MemoryReader, RangeCache, RangeReader};
pub use tiff::{ByteOrder, Compression, Document, Photometric, RasterLevel};
