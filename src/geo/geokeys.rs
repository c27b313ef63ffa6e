//! GeoKey directory records and CRS resolution.
//!
//! The GeoKeyDirectory tag is a SHORT array: a 4-value header
//! (version, revision, minor revision, key count) followed by one 4-value
//! record per key. Records are kept unresolved until a CRS is requested;
//! turning them into a CRS string is delegated to a [`CrsInterpreter`].

use tracing::debug;

use crate::error::{GeoError, TiffError};
use crate::tiff::Document;

/// GeoKeyDirectory version this parser understands.
pub const KEY_DIRECTORY_VERSION: u16 = 1;

/// GTModelTypeGeoKey
pub const KEY_MODEL_TYPE: u16 = 1024;

/// GeographicTypeGeoKey
pub const KEY_GEOGRAPHIC_TYPE: u16 = 2048;

/// ProjectedCSTypeGeoKey
pub const KEY_PROJECTED_CS_TYPE: u16 = 3072;

/// Code marking a user-defined (non-EPSG) definition.
pub const USER_DEFINED: u16 = 32767;

/// One raw GeoKey record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GeoKeyEntry {
    /// GeoKey id
    pub key_id: u16,
    /// 0 when the value is `value_offset` itself, else the tag holding it
    pub tag_location: u16,
    /// Number of values
    pub count: u16,
    /// The value, or an index into the referenced tag's array
    pub value_offset: u16,
}

impl GeoKeyEntry {
    /// The key's value when it is stored directly in the record.
    pub fn inline_value(&self) -> Option<u16> {
        (self.tag_location == 0).then_some(self.value_offset)
    }
}

/// Parse the SHORT values of a GeoKeyDirectory tag.
pub fn parse_geokey_directory(values: &[u16]) -> Result<Vec<GeoKeyEntry>, TiffError> {
    if values.len() < 4 {
        return Err(TiffError::InvalidTagValue {
            tag: "GeoKeyDirectory",
            message: format!("header needs 4 values, got {}", values.len()),
        });
    }

    let version = values[0];
    if version != KEY_DIRECTORY_VERSION {
        return Err(TiffError::InvalidTagValue {
            tag: "GeoKeyDirectory",
            message: format!("unsupported key directory version {}", version),
        });
    }

    let num_keys = values[3] as usize;
    if values.len() < 4 + 4 * num_keys {
        return Err(TiffError::InvalidTagValue {
            tag: "GeoKeyDirectory",
            message: format!(
                "{} keys declared but only {} values present",
                num_keys,
                values.len()
            ),
        });
    }

    debug!(
        version,
        revision = values[1],
        minor = values[2],
        keys = num_keys,
        "GeoKey directory"
    );

    Ok(values[4..4 + 4 * num_keys]
        .chunks_exact(4)
        .map(|k| GeoKeyEntry {
            key_id: k[0],
            tag_location: k[1],
            count: k[2],
            value_offset: k[3],
        })
        .collect())
}

// =============================================================================
// CRS interpretation
// =============================================================================

/// Turns GeoKeys plus their parameter arrays into a CRS descriptor string.
pub trait CrsInterpreter {
    fn interpret(
        &self,
        keys: &[GeoKeyEntry],
        double_params: &[f64],
        ascii_params: &str,
    ) -> Result<String, GeoError>;
}

/// Resolves EPSG-coded CRSs to `EPSG:<code>` strings.
///
/// A projected CRS code takes precedence over a geographic one. User-defined
/// definitions are not interpreted.
#[derive(Debug, Clone, Copy, Default)]
pub struct EpsgInterpreter;

impl CrsInterpreter for EpsgInterpreter {
    fn interpret(
        &self,
        keys: &[GeoKeyEntry],
        _double_params: &[f64],
        _ascii_params: &str,
    ) -> Result<String, GeoError> {
        let find = |id: u16| keys.iter().find(|k| k.key_id == id);

        let entry = find(KEY_PROJECTED_CS_TYPE)
            .or_else(|| find(KEY_GEOGRAPHIC_TYPE))
            .ok_or_else(|| GeoError::Interpreter("no CRS type GeoKey present".to_string()))?;

        match entry.inline_value() {
            Some(USER_DEFINED) => Err(GeoError::Interpreter(format!(
                "user-defined CRS in GeoKey {} is not supported",
                entry.key_id
            ))),
            Some(0) | None => Err(GeoError::Interpreter(format!(
                "GeoKey {} carries no EPSG code",
                entry.key_id
            ))),
            Some(code) => Ok(format!("EPSG:{}", code)),
        }
    }
}

/// Resolve the document's CRS with the given interpreter.
///
/// Fails with [`GeoError::MissingCrs`] when the file never populated
/// GeoDoubleParams or GeoAsciiParams.
pub fn resolve_crs(
    document: &Document,
    interpreter: &dyn CrsInterpreter,
) -> Result<String, GeoError> {
    let doubles = document
        .geo_double_params
        .as_deref()
        .ok_or(GeoError::MissingCrs("GeoDoubleParams not present"))?;
    let ascii = match document.geo_ascii_params.as_deref() {
        Some(ascii) if !ascii.is_empty() => ascii,
        _ => return Err(GeoError::MissingCrs("GeoAsciiParams not present")),
    };

    interpreter.interpret(&document.geo_keys, doubles, ascii)
}
