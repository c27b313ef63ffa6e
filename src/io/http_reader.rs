use async_trait::async_trait;
use bytes::Bytes;
use http::header::{CONTENT_LENGTH, RANGE};
use http::StatusCode;
use tokio::sync::OnceCell;
use tracing::debug;
use url::Url;

use super::RangeReader;
use crate::config::ReaderConfig;
use crate::error::IoError;

/// HTTP-backed implementation of RangeReader.
///
/// Each read is one GET with a `Range` header; the size probe is a HEAD
/// request whose result is remembered after the first success.
#[derive(Debug)]
pub struct HttpRangeReader {
    client: reqwest::Client,
    url: Url,
    identifier: String,
    size: OnceCell<u64>,
}

impl HttpRangeReader {
    /// Create a reader for `url` using default settings.
    pub fn new(url: &str) -> Result<Self, IoError> {
        Self::with_config(url, &ReaderConfig::default())
    }

    /// Create a reader for `url` with explicit timeouts and user agent.
    ///
    /// No request is issued here; the resource is first touched by a read
    /// or a size probe.
    pub fn with_config(url: &str, config: &ReaderConfig) -> Result<Self, IoError> {
        let url = Url::parse(url).map_err(|e| IoError::InvalidUrl(format!("{}: {}", url, e)))?;

        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .connect_timeout(config.connect_timeout())
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| IoError::Http(e.to_string()))?;

        Ok(Self::with_client(client, url))
    }

    /// Create a reader sharing an existing client.
    pub fn with_client(client: reqwest::Client, url: Url) -> Self {
        Self {
            client,
            identifier: url.to_string(),
            url,
            size: OnceCell::new(),
        }
    }

    /// Get the URL being read.
    pub fn url(&self) -> &Url {
        &self.url
    }

    async fn probe_size(&self) -> Result<u64, IoError> {
        debug!(url = %self.url, "probing size");
        let response = self
            .client
            .head(self.url.clone())
            .send()
            .await
            .map_err(|e| map_reqwest_error(e, &self.identifier))?;

        match response.status() {
            StatusCode::NOT_FOUND => return Err(IoError::NotFound(self.identifier.clone())),
            status if !status.is_success() => {
                return Err(IoError::Status {
                    status: status.as_u16(),
                    url: self.identifier.clone(),
                })
            }
            _ => {}
        }

        response
            .headers()
            .get(CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok())
            .ok_or_else(|| {
                IoError::Http(format!(
                    "missing or invalid Content-Length for {}",
                    self.identifier
                ))
            })
    }
}

#[async_trait]
impl RangeReader for HttpRangeReader {
    async fn read_at(&self, offset: u64, len: usize) -> Result<Bytes, IoError> {
        if len == 0 {
            return Ok(Bytes::new());
        }

        let range = range_header(offset, len);
        debug!(url = %self.url, %range, "fetching range");

        let response = self
            .client
            .get(self.url.clone())
            .header(RANGE, range)
            .send()
            .await
            .map_err(|e| map_reqwest_error(e, &self.identifier))?;

        let status = response.status();
        match status {
            StatusCode::PARTIAL_CONTENT => {
                let body = response
                    .bytes()
                    .await
                    .map_err(|e| map_reqwest_error(e, &self.identifier))?;
                Ok(body.slice(..body.len().min(len)))
            }
            StatusCode::OK => {
                // Server ignored the range and sent the whole resource.
                let body = response
                    .bytes()
                    .await
                    .map_err(|e| map_reqwest_error(e, &self.identifier))?;
                let start = (offset.min(body.len() as u64)) as usize;
                let end = start.saturating_add(len).min(body.len());
                Ok(body.slice(start..end))
            }
            StatusCode::RANGE_NOT_SATISFIABLE => Ok(Bytes::new()),
            StatusCode::NOT_FOUND => Err(IoError::NotFound(self.identifier.clone())),
            _ => Err(IoError::Status {
                status: status.as_u16(),
                url: self.identifier.clone(),
            }),
        }
    }

    async fn size(&self) -> Result<u64, IoError> {
        self.size
            .get_or_try_init(|| self.probe_size())
            .await
            .copied()
    }

    fn identifier(&self) -> &str {
        &self.identifier
    }
}

/// Build the `Range` header value covering `len` bytes from `offset`.
///
/// Both ends are inclusive.
pub fn range_header(offset: u64, len: usize) -> String {
    format!("bytes={}-{}", offset, offset + len as u64 - 1)
}

fn map_reqwest_error(error: reqwest::Error, identifier: &str) -> IoError {
    if error.is_timeout() {
        IoError::Timeout(format!("{}: {}", identifier, error))
    } else if error.is_connect() {
        IoError::Connection(format!("{}: {}", identifier, error))
    } else {
        IoError::Http(format!("{}: {}", identifier, error))
    }
}
