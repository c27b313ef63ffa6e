//! Tile decoding: grid selection, decompression, predictor reversal and
//! sample unpacking into typed rasters.

mod compression;
mod predictor;
mod raster;
mod tile;

pub use compression::decompress;
pub use predictor::{unpredict_horizontal, unpredict_row_u16, unpredict_row_u8};
pub use raster::{GrayBuffer, Raster, Rect, Sample, SampleType};
pub use tile::decode_window;
