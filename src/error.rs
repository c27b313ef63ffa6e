use thiserror::Error;

/// Broad classification of every error produced by this crate.
///
/// Lets callers special-case, say, unsupported files without matching on
/// individual variants or error strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed or inconsistent binary structure
    Format,
    /// Valid file using a feature this decoder does not implement
    Unsupported,
    /// Failure fetching bytes from the byte source
    Transport,
    /// A decoded tile is shorter than the window it must fill
    InsufficientData,
    /// The caller asked for something the file cannot provide (bad level, empty window)
    InvalidRequest,
}

/// I/O errors that can occur when reading from the byte source
#[derive(Debug, Clone, Error)]
pub enum IoError {
    /// Error reported by the HTTP client
    #[error("HTTP error: {0}")]
    Http(String),

    /// Server answered with an unexpected status code
    #[error("Unexpected HTTP status {status} for {url}")]
    Status { status: u16, url: String },

    /// Network or connection error
    #[error("Connection error: {0}")]
    Connection(String),

    /// Request did not complete within the configured timeout
    #[error("Request timed out: {0}")]
    Timeout(String),

    /// Resource does not exist
    #[error("Object not found: {0}")]
    NotFound(String),

    /// Fewer bytes were available than requested
    #[error("Short read at offset {offset}: requested {requested} bytes, got {received} (end of file reached?)")]
    ShortRead {
        offset: u64,
        requested: u64,
        received: u64,
    },

    /// Seek would move the cursor before the start of the resource
    #[error("Invalid seek: {0}")]
    InvalidSeek(String),

    /// Location could not be parsed as a URL
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

/// Errors that can occur when parsing the TIFF/GeoTIFF directory structure
#[derive(Debug, Clone, Error)]
pub enum TiffError {
    /// I/O error while reading the file
    #[error("I/O error: {0}")]
    Io(#[from] IoError),

    /// Invalid TIFF magic bytes (not II or MM)
    #[error("Invalid TIFF magic bytes: expected 0x4949 (II) or 0x4D4D (MM), got 0x{0:04X}")]
    InvalidMagic(u16),

    /// Invalid TIFF version number
    #[error("Invalid TIFF version: expected 42, got {0}")]
    InvalidVersion(u16),

    /// Invalid IFD offset (zero where a directory is required)
    #[error("Invalid IFD offset: {0}")]
    InvalidIfdOffset(u64),

    /// The next-IFD chain points back at a directory already visited
    #[error("IFD chain loops back to offset {0}")]
    DirectoryLoop(u64),

    /// The IFD chain is longer than the configured safety limit
    #[error("IFD chain exceeds {0} directories")]
    TooManyDirectories(usize),

    /// Tag has unexpected type or count
    #[error("Invalid tag value for {tag}: {message}")]
    InvalidTagValue { tag: &'static str, message: String },

    /// A consumed tag uses a field type code outside classic TIFF
    #[error("Unknown field type {field_type} for {tag}")]
    UnknownFieldType { tag: &'static str, field_type: u16 },

    /// Valid TIFF feature that this decoder does not implement
    #[error("Unsupported feature: {0}")]
    Unsupported(String),
}

impl TiffError {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            TiffError::Io(_) => ErrorKind::Transport,
            TiffError::Unsupported(_) => ErrorKind::Unsupported,
            _ => ErrorKind::Format,
        }
    }
}

/// Errors raised while deriving georeferencing information
#[derive(Debug, Clone, Error)]
pub enum GeoError {
    /// Requested resolution level does not exist
    #[error("Level {level} not in this GeoTIFF ({levels} levels)")]
    LevelOutOfRange { level: usize, levels: usize },

    /// The file carries no GeoDoubleParams/GeoAsciiParams to resolve a CRS from
    #[error("Cannot process CRS data: {0}")]
    MissingCrs(&'static str),

    /// The GeoKey interpreter could not produce a CRS
    #[error("GeoKey interpretation failed: {0}")]
    Interpreter(String),
}

impl GeoError {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            GeoError::LevelOutOfRange { .. } => ErrorKind::InvalidRequest,
            GeoError::MissingCrs(_) | GeoError::Interpreter(_) => ErrorKind::Format,
        }
    }
}

/// Errors that can occur when decoding pixels
#[derive(Debug, Clone, Error)]
pub enum DecodeError {
    /// I/O error while fetching tile bytes
    #[error("I/O error: {0}")]
    Io(#[from] IoError),

    /// Error parsing the directory structure
    #[error("TIFF error: {0}")]
    Tiff(#[from] TiffError),

    /// Error deriving georeferencing
    #[error("Georeferencing error: {0}")]
    Geo(#[from] GeoError),

    /// Requested resolution level does not exist
    #[error("Level {level} not in this GeoTIFF ({levels} levels)")]
    LevelOutOfRange { level: usize, levels: usize },

    /// Reader settings failed validation
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Requested window does not intersect the image
    #[error("The rectangle {requested} does not intersect the image bounds {image}")]
    EmptyWindow { requested: String, image: String },

    /// Inconsistent level structure discovered at decode time
    #[error("Invalid format: {0}")]
    Format(String),

    /// Valid feature this decoder does not implement
    #[error("Unsupported feature: {0}")]
    Unsupported(String),

    /// Compressed tile data could not be decompressed
    #[error("{compression} decompression failed: {message}")]
    Decompression {
        compression: &'static str,
        message: String,
    },

    /// Decoded tile is too short for the region it must fill
    #[error("Not enough pixel data in tile {tile}: need {needed} bytes, have {available}")]
    InsufficientData {
        tile: usize,
        needed: usize,
        available: usize,
    },
}

impl DecodeError {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            DecodeError::Io(_) => ErrorKind::Transport,
            DecodeError::Tiff(e) => e.kind(),
            DecodeError::Geo(e) => e.kind(),
            DecodeError::LevelOutOfRange { .. }
            | DecodeError::EmptyWindow { .. }
            | DecodeError::InvalidConfig(_) => ErrorKind::InvalidRequest,
            DecodeError::Format(_) | DecodeError::Decompression { .. } => ErrorKind::Format,
            DecodeError::Unsupported(_) => ErrorKind::Unsupported,
            DecodeError::InsufficientData { .. } => ErrorKind::InsufficientData,
        }
    }
}
