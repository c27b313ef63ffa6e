//! Configuration for remote COG access.
//!
//! All settings have defaults suitable for reading public COGs over HTTP.
//! The struct derives serde traits so it can be embedded in an application's
//! own configuration file.
//!
//! # Example
//!
//! ```
//! use cog_stream::ReaderConfig;
//!
//! let config: ReaderConfig =
//!     serde_json::from_str(r#"{ "chunk_size": 16384, "request_timeout_secs": 5 }"#).unwrap();
//! assert_eq!(config.chunk_size, 16384);
//! assert!(config.validate().is_ok());
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::io::DEFAULT_CHUNK_SIZE;

// =============================================================================
// Default Values
// =============================================================================

/// Default timeout for a single HTTP request, in seconds.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Default timeout for establishing a connection, in seconds.
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

/// Default upper bound on the number of IFDs walked in one file.
pub const DEFAULT_MAX_DIRECTORIES: usize = 64;

fn default_user_agent() -> String {
    format!("cog-stream/{}", env!("CARGO_PKG_VERSION"))
}

// =============================================================================
// ReaderConfig
// =============================================================================

/// Settings for the HTTP transport, the chunk cache and the directory parser.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReaderConfig {
    /// Size in bytes of each aligned chunk fetched by the range cache.
    pub chunk_size: usize,

    /// Timeout for a whole HTTP request, in seconds.
    pub request_timeout_secs: u64,

    /// Timeout for connecting to the server, in seconds.
    pub connect_timeout_secs: u64,

    /// User-Agent header sent with every request.
    pub user_agent: String,

    /// Maximum number of IFDs to follow before giving up on the chain.
    pub max_directories: usize,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            connect_timeout_secs: DEFAULT_CONNECT_TIMEOUT_SECS,
            user_agent: default_user_agent(),
            max_directories: DEFAULT_MAX_DIRECTORIES,
        }
    }
}

impl ReaderConfig {
    /// Validate the configuration and return an error message if invalid.
    pub fn validate(&self) -> Result<(), String> {
        if self.chunk_size == 0 {
            return Err("chunk_size must be greater than 0".to_string());
        }
        if self.request_timeout_secs == 0 {
            return Err("request_timeout_secs must be greater than 0".to_string());
        }
        if self.connect_timeout_secs == 0 {
            return Err("connect_timeout_secs must be greater than 0".to_string());
        }
        if self.max_directories == 0 {
            return Err("max_directories must be greater than 0".to_string());
        }
        Ok(())
    }

    /// Request timeout as a [`Duration`].
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Connect timeout as a [`Duration`].
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}
