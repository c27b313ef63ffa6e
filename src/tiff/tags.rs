//! TIFF tag and field type definitions.
//!
//! This module defines the vocabulary for directory parsing:
//! - Field types that determine how values are encoded
//! - Tag IDs for the baseline, GeoTIFF and GDAL fields that are consumed
//! - Code values for compression, predictor, sample format and photometric

// =============================================================================
// TIFF Field Types
// =============================================================================

/// TIFF field types that determine how values are encoded.
///
/// All twelve classic TIFF 6.0 types are defined so that the inline/out-of-line
/// decision is correct even for tags that are only skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum FieldType {
    /// Unsigned 8-bit integer
    Byte = 1,
    /// 8-bit ASCII character, NUL terminated
    Ascii = 2,
    /// Unsigned 16-bit integer
    Short = 3,
    /// Unsigned 32-bit integer
    Long = 4,
    /// Two Longs: numerator and denominator
    Rational = 5,
    /// Signed 8-bit integer
    SByte = 6,
    /// Opaque byte
    Undefined = 7,
    /// Signed 16-bit integer
    SShort = 8,
    /// Signed 32-bit integer
    SLong = 9,
    /// Two SLongs: numerator and denominator
    SRational = 10,
    /// IEEE single precision float
    Float = 11,
    /// IEEE double precision float
    Double = 12,
}

impl FieldType {
    /// Size of a single value of this type in bytes.
    #[inline]
    pub const fn size_in_bytes(self) -> usize {
        match self {
            FieldType::Byte | FieldType::Ascii | FieldType::SByte | FieldType::Undefined => 1,
            FieldType::Short | FieldType::SShort => 2,
            FieldType::Long | FieldType::SLong | FieldType::Float => 4,
            FieldType::Rational | FieldType::SRational | FieldType::Double => 8,
        }
    }

    /// Create a FieldType from its numeric value.
    ///
    /// Returns `None` for unknown type values.
    pub fn from_u16(value: u16) -> Option<Self> {
        match value {
            1 => Some(FieldType::Byte),
            2 => Some(FieldType::Ascii),
            3 => Some(FieldType::Short),
            4 => Some(FieldType::Long),
            5 => Some(FieldType::Rational),
            6 => Some(FieldType::SByte),
            7 => Some(FieldType::Undefined),
            8 => Some(FieldType::SShort),
            9 => Some(FieldType::SLong),
            10 => Some(FieldType::SRational),
            11 => Some(FieldType::Float),
            12 => Some(FieldType::Double),
            _ => None,
        }
    }
}

// =============================================================================
// TIFF Tags
// =============================================================================

/// Tag IDs consumed while walking a GeoTIFF directory.
///
/// Tags not listed here are recorded on the level as unrecognized and
/// otherwise skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum TiffTag {
    // -------------------------------------------------------------------------
    // Baseline
    // -------------------------------------------------------------------------
    /// Kind of image in this IFD (full resolution, reduced, mask)
    NewSubfileType = 254,
    /// Image width in pixels
    ImageWidth = 256,
    /// Image height (length) in pixels
    ImageLength = 257,
    /// Bits per sample
    BitsPerSample = 258,
    /// Compression scheme used
    Compression = 259,
    /// Photometric interpretation
    PhotometricInterpretation = 262,
    /// Number of components per pixel
    SamplesPerPixel = 277,
    /// How components are organized (chunky vs planar)
    PlanarConfiguration = 284,
    /// Differencing applied before compression
    Predictor = 317,

    // -------------------------------------------------------------------------
    // Tile Organization
    // -------------------------------------------------------------------------
    /// Width of each tile in pixels
    TileWidth = 322,
    /// Height (length) of each tile in pixels
    TileLength = 323,
    /// Byte offsets of each tile in the file
    TileOffsets = 324,
    /// Byte counts of each tile
    TileByteCounts = 325,
    /// Unsigned, signed or floating point samples
    SampleFormat = 339,

    // -------------------------------------------------------------------------
    // GeoTIFF
    // -------------------------------------------------------------------------
    /// Pixel size in model units (x, y, z)
    ModelPixelScale = 33550,
    /// Raster to model tiepoints (i, j, k, x, y, z)
    ModelTiepoint = 33922,
    /// Full 4x4 affine model transformation (unsupported)
    ModelTransformation = 34264,
    /// GeoKey directory header and entries
    GeoKeyDirectory = 34735,
    /// Double-valued GeoKey parameters
    GeoDoubleParams = 34736,
    /// ASCII GeoKey parameters
    GeoAsciiParams = 34737,

    // -------------------------------------------------------------------------
    // GDAL
    // -------------------------------------------------------------------------
    /// GDAL XML metadata
    GdalMetadata = 42112,
    /// GDAL nodata value as ASCII
    GdalNoData = 42113,
}

impl TiffTag {
    /// Create a TiffTag from its numeric value.
    ///
    /// Returns `None` for unrecognized tags.
    pub fn from_u16(value: u16) -> Option<Self> {
        match value {
            254 => Some(TiffTag::NewSubfileType),
            256 => Some(TiffTag::ImageWidth),
            257 => Some(TiffTag::ImageLength),
            258 => Some(TiffTag::BitsPerSample),
            259 => Some(TiffTag::Compression),
            262 => Some(TiffTag::PhotometricInterpretation),
            277 => Some(TiffTag::SamplesPerPixel),
            284 => Some(TiffTag::PlanarConfiguration),
            317 => Some(TiffTag::Predictor),
            322 => Some(TiffTag::TileWidth),
            323 => Some(TiffTag::TileLength),
            324 => Some(TiffTag::TileOffsets),
            325 => Some(TiffTag::TileByteCounts),
            339 => Some(TiffTag::SampleFormat),
            33550 => Some(TiffTag::ModelPixelScale),
            33922 => Some(TiffTag::ModelTiepoint),
            34264 => Some(TiffTag::ModelTransformation),
            34735 => Some(TiffTag::GeoKeyDirectory),
            34736 => Some(TiffTag::GeoDoubleParams),
            34737 => Some(TiffTag::GeoAsciiParams),
            42112 => Some(TiffTag::GdalMetadata),
            42113 => Some(TiffTag::GdalNoData),
            _ => None,
        }
    }

    /// Get the numeric tag ID.
    #[inline]
    pub const fn as_u16(self) -> u16 {
        self as u16
    }

    /// Name used in error messages.
    pub const fn name(self) -> &'static str {
        match self {
            TiffTag::NewSubfileType => "NewSubfileType",
            TiffTag::ImageWidth => "ImageWidth",
            TiffTag::ImageLength => "ImageLength",
            TiffTag::BitsPerSample => "BitsPerSample",
            TiffTag::Compression => "Compression",
            TiffTag::PhotometricInterpretation => "PhotometricInterpretation",
            TiffTag::SamplesPerPixel => "SamplesPerPixel",
            TiffTag::PlanarConfiguration => "PlanarConfiguration",
            TiffTag::Predictor => "Predictor",
            TiffTag::TileWidth => "TileWidth",
            TiffTag::TileLength => "TileLength",
            TiffTag::TileOffsets => "TileOffsets",
            TiffTag::TileByteCounts => "TileByteCounts",
            TiffTag::SampleFormat => "SampleFormat",
            TiffTag::ModelPixelScale => "ModelPixelScale",
            TiffTag::ModelTiepoint => "ModelTiepoint",
            TiffTag::ModelTransformation => "ModelTransformation",
            TiffTag::GeoKeyDirectory => "GeoKeyDirectory",
            TiffTag::GeoDoubleParams => "GeoDoubleParams",
            TiffTag::GeoAsciiParams => "GeoAsciiParams",
            TiffTag::GdalMetadata => "GDALMetadata",
            TiffTag::GdalNoData => "GDALNoData",
        }
    }
}

// =============================================================================
// Compression Values
// =============================================================================

/// TIFF compression schemes this decoder can reverse.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    /// No compression (codes 0 and 1)
    None,
    /// TIFF-variant LZW (code 5)
    Lzw,
    /// zlib/deflate (codes 8 and 32946)
    Deflate,
    /// PackBits run-length (code 32773)
    PackBits,
}

impl Compression {
    /// Create a Compression from its numeric value.
    ///
    /// Returns `None` for codes this decoder does not implement.
    pub fn from_u16(value: u16) -> Option<Self> {
        match value {
            0 | 1 => Some(Compression::None),
            5 => Some(Compression::Lzw),
            8 | 32946 => Some(Compression::Deflate),
            32773 => Some(Compression::PackBits),
            _ => None,
        }
    }

    /// Get a human-readable name for the compression scheme.
    pub const fn name(self) -> &'static str {
        match self {
            Compression::None => "None",
            Compression::Lzw => "LZW",
            Compression::Deflate => "Deflate",
            Compression::PackBits => "PackBits",
        }
    }
}

// =============================================================================
// Predictor, SampleFormat, Photometric
// =============================================================================

/// Differencing predictor applied to tile rows before compression.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Predictor {
    /// No prediction (1)
    None,
    /// Horizontal differencing (2)
    Horizontal,
}

impl Predictor {
    /// Returns `None` for predictors other than 1 and 2.
    pub fn from_u16(value: u16) -> Option<Self> {
        match value {
            1 => Some(Predictor::None),
            2 => Some(Predictor::Horizontal),
            _ => None,
        }
    }
}

/// Interpretation of sample bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleFormat {
    /// Unsigned integer (1)
    Unsigned,
    /// Two's complement signed integer (2)
    Signed,
}

impl SampleFormat {
    /// Returns `None` for float and undefined formats.
    pub fn from_u16(value: u16) -> Option<Self> {
        match value {
            1 => Some(SampleFormat::Unsigned),
            2 => Some(SampleFormat::Signed),
            _ => None,
        }
    }
}

/// Photometric interpretation codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Photometric {
    /// 0 is white
    WhiteIsZero,
    /// 0 is black; the only interpretation that is decoded
    BlackIsZero,
    /// Red, green, blue
    Rgb,
    /// Indexed color
    Palette,
    /// Transparency mask
    Mask,
    /// Separated (CMYK)
    Separated,
    /// YCbCr
    YCbCr,
    /// Any other code
    Other(u16),
}

impl Photometric {
    /// Create a Photometric from its numeric value.
    ///
    /// Unlisted codes are kept as `Other`.
    pub fn from_u16(value: u16) -> Self {
        match value {
            0 => Photometric::WhiteIsZero,
            1 => Photometric::BlackIsZero,
            2 => Photometric::Rgb,
            3 => Photometric::Palette,
            4 => Photometric::Mask,
            5 => Photometric::Separated,
            6 => Photometric::YCbCr,
            other => Photometric::Other(other),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
