//! Decoded pixel containers.
//!
//! A [`Raster`] is a grayscale buffer of one of four sample types. Each
//! buffer covers a rectangle of the level's pixel grid in level coordinates,
//! so pixel `(x, y)` of a window starting at `(100, 50)` is addressed as
//! `(100 + dx, 50 + dy)`.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::DecodeError;
use crate::tiff::{ByteOrder, SampleFormat};

// =============================================================================
// Rect
// =============================================================================

/// Half-open pixel rectangle `[min_x, max_x) x [min_y, max_y)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Rect {
    pub min_x: u32,
    pub min_y: u32,
    pub max_x: u32,
    pub max_y: u32,
}

impl Rect {
    pub const fn new(min_x: u32, min_y: u32, max_x: u32, max_y: u32) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    /// Rectangle anchored at the origin.
    pub const fn from_size(width: u32, height: u32) -> Self {
        Self::new(0, 0, width, height)
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.max_x.saturating_sub(self.min_x)
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.max_y.saturating_sub(self.min_y)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.width() == 0 || self.height() == 0
    }

    /// Largest rectangle contained in both; empty rectangles collapse to zero.
    pub fn intersect(&self, other: &Rect) -> Rect {
        let r = Rect::new(
            self.min_x.max(other.min_x),
            self.min_y.max(other.min_y),
            self.max_x.min(other.max_x),
            self.max_y.min(other.max_y),
        );
        if r.is_empty() {
            Rect::default()
        } else {
            r
        }
    }

    #[inline]
    pub fn contains(&self, x: u32, y: u32) -> bool {
        x >= self.min_x && x < self.max_x && y >= self.min_y && y < self.max_y
    }
}

impl fmt::Display for Rect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({},{})-({},{})",
            self.min_x, self.min_y, self.max_x, self.max_y
        )
    }
}

// =============================================================================
// Samples
// =============================================================================

/// A pixel sample type that can be unpacked from file bytes.
pub trait Sample: Copy + Default + PartialEq + fmt::Debug + Send + Sync + 'static {
    /// Bytes per sample in the file
    const BYTES: usize;
    /// Smallest representable value, used as display minimum
    const MIN: Self;
    /// Largest representable value, used as display maximum
    const MAX: Self;

    /// Decode one sample from exactly `Self::BYTES` bytes.
    fn from_bytes(bytes: &[u8], byte_order: ByteOrder) -> Self;

    fn to_f64(self) -> f64;
}

impl Sample for u8 {
    const BYTES: usize = 1;
    const MIN: Self = u8::MIN;
    const MAX: Self = u8::MAX;

    #[inline]
    fn from_bytes(bytes: &[u8], _byte_order: ByteOrder) -> Self {
        bytes[0]
    }

    fn to_f64(self) -> f64 {
        self as f64
    }
}

impl Sample for i8 {
    const BYTES: usize = 1;
    const MIN: Self = i8::MIN;
    const MAX: Self = i8::MAX;

    #[inline]
    fn from_bytes(bytes: &[u8], _byte_order: ByteOrder) -> Self {
        bytes[0] as i8
    }

    fn to_f64(self) -> f64 {
        self as f64
    }
}

impl Sample for u16 {
    const BYTES: usize = 2;
    const MIN: Self = u16::MIN;
    const MAX: Self = u16::MAX;

    #[inline]
    fn from_bytes(bytes: &[u8], byte_order: ByteOrder) -> Self {
        byte_order.read_u16(bytes)
    }

    fn to_f64(self) -> f64 {
        self as f64
    }
}

impl Sample for i16 {
    const BYTES: usize = 2;
    const MIN: Self = i16::MIN;
    const MAX: Self = i16::MAX;

    #[inline]
    fn from_bytes(bytes: &[u8], byte_order: ByteOrder) -> Self {
        byte_order.read_u16(bytes) as i16
    }

    fn to_f64(self) -> f64 {
        self as f64
    }
}

/// Data type of a level's samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SampleType {
    UInt8,
    UInt16,
    Int8,
    Int16,
}

impl SampleType {
    /// Derive the type from SampleFormat and BitsPerSample codes.
    pub fn from_format(sample_format: u16, bits_per_sample: u16) -> Result<Self, DecodeError> {
        match (SampleFormat::from_u16(sample_format), bits_per_sample) {
            (Some(SampleFormat::Unsigned), 8) => Ok(SampleType::UInt8),
            (Some(SampleFormat::Unsigned), 16) => Ok(SampleType::UInt16),
            (Some(SampleFormat::Signed), 8) => Ok(SampleType::Int8),
            (Some(SampleFormat::Signed), 16) => Ok(SampleType::Int16),
            _ => Err(DecodeError::Unsupported(format!(
                "sample format {} with {} bits per sample",
                sample_format, bits_per_sample
            ))),
        }
    }

    /// Name as used in GDAL-style summaries.
    pub const fn name(self) -> &'static str {
        match self {
            SampleType::UInt8 => "UInt8",
            SampleType::UInt16 => "UInt16",
            SampleType::Int8 => "Int8",
            SampleType::Int16 => "Int16",
        }
    }

    pub const fn bytes_per_sample(self) -> usize {
        match self {
            SampleType::UInt8 | SampleType::Int8 => 1,
            SampleType::UInt16 | SampleType::Int16 => 2,
        }
    }
}

impl fmt::Display for SampleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// =============================================================================
// GrayBuffer
// =============================================================================

/// Single-band pixel buffer with display range and nodata metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct GrayBuffer<T> {
    bounds: Rect,
    min: T,
    max: T,
    nodata: f64,
    pixels: Vec<T>,
}

impl<T: Sample> GrayBuffer<T> {
    /// Zero-filled buffer covering `bounds`.
    pub fn new(bounds: Rect, nodata: f64) -> Self {
        let len = bounds.width() as usize * bounds.height() as usize;
        Self {
            bounds,
            min: T::MIN,
            max: T::MAX,
            nodata,
            pixels: vec![T::default(); len],
        }
    }

    pub fn bounds(&self) -> Rect {
        self.bounds
    }

    pub fn min(&self) -> T {
        self.min
    }

    pub fn max(&self) -> T {
        self.max
    }

    pub fn nodata(&self) -> f64 {
        self.nodata
    }

    /// Row-major pixels of the whole buffer.
    pub fn pixels(&self) -> &[T] {
        &self.pixels
    }

    pub fn into_pixels(self) -> Vec<T> {
        self.pixels
    }

    /// Pixel at level coordinates, or `None` outside the bounds.
    pub fn get(&self, x: u32, y: u32) -> Option<T> {
        if !self.bounds.contains(x, y) {
            return None;
        }
        self.pixels.get(self.index(x, y)).copied()
    }

    /// Pixels `[min_x, max_x)` of row `y`, in level coordinates.
    ///
    /// The span must lie within the bounds.
    pub(crate) fn row_span_mut(&mut self, y: u32, min_x: u32, max_x: u32) -> &mut [T] {
        let start = self.index(min_x, y);
        let end = start + (max_x - min_x) as usize;
        &mut self.pixels[start..end]
    }

    #[inline]
    fn index(&self, x: u32, y: u32) -> usize {
        (y - self.bounds.min_y) as usize * self.bounds.width() as usize
            + (x - self.bounds.min_x) as usize
    }
}

// =============================================================================
// Raster
// =============================================================================

/// Decoded pixels of one level window.
#[derive(Debug, Clone, PartialEq)]
pub enum Raster {
    GrayU8(GrayBuffer<u8>),
    GrayU16(GrayBuffer<u16>),
    GrayI8(GrayBuffer<i8>),
    GrayI16(GrayBuffer<i16>),
}

impl Raster {
    /// Zero-filled raster of the given type.
    pub fn new(sample_type: SampleType, bounds: Rect, nodata: f64) -> Self {
        match sample_type {
            SampleType::UInt8 => Raster::GrayU8(GrayBuffer::new(bounds, nodata)),
            SampleType::UInt16 => Raster::GrayU16(GrayBuffer::new(bounds, nodata)),
            SampleType::Int8 => Raster::GrayI8(GrayBuffer::new(bounds, nodata)),
            SampleType::Int16 => Raster::GrayI16(GrayBuffer::new(bounds, nodata)),
        }
    }

    pub fn sample_type(&self) -> SampleType {
        match self {
            Raster::GrayU8(_) => SampleType::UInt8,
            Raster::GrayU16(_) => SampleType::UInt16,
            Raster::GrayI8(_) => SampleType::Int8,
            Raster::GrayI16(_) => SampleType::Int16,
        }
    }

    pub fn bounds(&self) -> Rect {
        match self {
            Raster::GrayU8(b) => b.bounds(),
            Raster::GrayU16(b) => b.bounds(),
            Raster::GrayI8(b) => b.bounds(),
            Raster::GrayI16(b) => b.bounds(),
        }
    }

    pub fn width(&self) -> u32 {
        self.bounds().width()
    }

    pub fn height(&self) -> u32 {
        self.bounds().height()
    }

    pub fn nodata(&self) -> f64 {
        match self {
            Raster::GrayU8(b) => b.nodata(),
            Raster::GrayU16(b) => b.nodata(),
            Raster::GrayI8(b) => b.nodata(),
            Raster::GrayI16(b) => b.nodata(),
        }
    }

    /// Pixel value widened to f64, or `None` outside the bounds.
    pub fn value(&self, x: u32, y: u32) -> Option<f64> {
        match self {
            Raster::GrayU8(b) => b.get(x, y).map(Sample::to_f64),
            Raster::GrayU16(b) => b.get(x, y).map(Sample::to_f64),
            Raster::GrayI8(b) => b.get(x, y).map(Sample::to_f64),
            Raster::GrayI16(b) => b.get(x, y).map(Sample::to_f64),
        }
    }

    pub fn as_u8(&self) -> Option<&GrayBuffer<u8>> {
        match self {
            Raster::GrayU8(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_u16(&self) -> Option<&GrayBuffer<u16>> {
        match self {
            Raster::GrayU16(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_i8(&self) -> Option<&GrayBuffer<i8>> {
        match self {
            Raster::GrayI8(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_i16(&self) -> Option<&GrayBuffer<i16>> {
        match self {
            Raster::GrayI16(b) => Some(b),
            _ => None,
        }
    }
}
