//! Georeferencing: geotransforms per resolution level and CRS resolution.

mod geokeys;
mod geotransform;

pub use geokeys::{
    parse_geokey_directory, resolve_crs, CrsInterpreter, EpsgInterpreter, GeoKeyEntry,
    KEY_GEOGRAPHIC_TYPE, KEY_MODEL_TYPE, KEY_PROJECTED_CS_TYPE, USER_DEFINED,
};
pub use geotransform::{geotransform_for, GeoTransform};
