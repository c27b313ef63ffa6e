use serde::{Deserialize, Serialize};

use crate::error::GeoError;
use crate::tiff::Document;

/// Affine pixel to world mapping in GDAL order.
///
/// `[origin_x, pixel_width, 0, origin_y, 0, pixel_height]`; rotation terms
/// are always zero and `pixel_height` is negative for north-up rasters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GeoTransform(pub [f64; 6]);

impl Default for GeoTransform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl GeoTransform {
    /// Transform used when the file has no georeferencing tags.
    pub const IDENTITY: GeoTransform = GeoTransform([0.0, 1.0, 0.0, 0.0, 0.0, 1.0]);

    /// Build the level-0 transform from ModelPixelScale and ModelTiepoint.
    ///
    /// The tiepoint anchors raster point `(i, j)` at model point `(x, y)`, so
    /// the origin is moved back by `i` and `j` pixels.
    pub fn from_tags(pixel_scale: Option<&[f64]>, tiepoint: Option<&[f64]>) -> Self {
        let mut gt = Self::IDENTITY.0;

        if let Some(scale) = pixel_scale {
            gt[1] = scale[0];
            gt[5] = -scale[1];
        }
        if let Some(tp) = tiepoint {
            gt[0] = tp[3] - tp[0] * gt[1];
            gt[3] = tp[4] - tp[1] * gt[5];
        }

        GeoTransform(gt)
    }

    pub fn origin_x(&self) -> f64 {
        self.0[0]
    }

    pub fn pixel_width(&self) -> f64 {
        self.0[1]
    }

    pub fn origin_y(&self) -> f64 {
        self.0[3]
    }

    pub fn pixel_height(&self) -> f64 {
        self.0[5]
    }

    /// Same origin, pixel sizes multiplied by the given factors.
    pub fn scaled(&self, factor_x: f64, factor_y: f64) -> Self {
        let gt = self.0;
        GeoTransform([
            gt[0],
            gt[1] * factor_x,
            0.0,
            gt[3],
            0.0,
            gt[5] * factor_y,
        ])
    }

    /// World coordinates of the top-left corner of pixel `(col, row)`.
    pub fn pixel_to_world(&self, col: f64, row: f64) -> (f64, f64) {
        (
            self.origin_x() + col * self.pixel_width(),
            self.origin_y() + row * self.pixel_height(),
        )
    }

    /// Transform for an overview given the full-resolution and overview sizes.
    ///
    /// The scale is the integer ratio of the sizes, so overviews are assumed
    /// to divide the base raster exactly.
    pub fn for_overview(&self, base: [u32; 2], overview: [u32; 2]) -> Self {
        let ratio_x = base[0].checked_div(overview[0]).unwrap_or(1);
        let ratio_y = base[1].checked_div(overview[1]).unwrap_or(1);
        self.scaled(ratio_x as f64, ratio_y as f64)
    }
}

/// Geotransform of one resolution level of a parsed document.
pub fn geotransform_for(document: &Document, level: usize) -> Result<GeoTransform, GeoError> {
    let levels = document.levels.len();
    let target = document
        .levels
        .get(level)
        .ok_or(GeoError::LevelOutOfRange { level, levels })?;

    if level == 0 {
        return Ok(document.geotransform);
    }

    let base = &document.levels[0];
    Ok(document.geotransform.for_overview(
        [base.width, base.height],
        [target.width, target.height],
    ))
}
