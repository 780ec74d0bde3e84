//! HTTP gateway chunk store.
//!
//! Chunks are fetched with `GET {url}/{path_prefix}/{cid}`, forwarding a
//! `Range` header when only part of a chunk is needed.

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::header::{CONTENT_RANGE, RANGE};
use reqwest::Response;
use reqwest::{Client, StatusCode};
use sc_core::config::GatewayConfig;
use sc_core::plan::ChunkRange;
use sc_core::{Error, Result};

use crate::fetcher::{ChunkBody, ChunkFetcher};

pub struct GatewayFetcher {
    client: Client,
    base_url: String,
    path_prefix: String,
}

impl GatewayFetcher {
    pub fn new(config: &GatewayConfig) -> Self {
        let mut builder = Client::builder().connect_timeout(config.connect_timeout());
        if let Some(timeout) = config.request_timeout() {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().unwrap_or_else(|e| {
            tracing::warn!("Failed to build gateway HTTP client with timeouts: {}", e);
            Client::new()
        });

        Self {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
            path_prefix: config.path_prefix.trim_matches('/').to_string(),
        }
    }

    /// URL of the chunk `cid`.
    ///
    /// Identifiers come from stored job records; one that would change the
    /// URL's shape means the record is corrupt.
    pub fn chunk_url(&self, cid: &str) -> Result<String> {
        let malformed = cid.is_empty()
            || cid
                .chars()
                .any(|c| matches!(c, '/' | '?' | '#' | '%') || c.is_whitespace() || c.is_control());
        if malformed {
            return Err(Error::data_consistency(format!(
                "chunk identifier {cid:?} is not a valid content id"
            )));
        }

        Ok(if self.path_prefix.is_empty() {
            format!("{}/{}", self.base_url, cid)
        } else {
            format!("{}/{}/{}", self.base_url, self.path_prefix, cid)
        })
    }
}

#[async_trait]
impl ChunkFetcher for GatewayFetcher {
    async fn fetch(&self, cid: &str, range: Option<ChunkRange>) -> Result<ChunkBody> {
        let url = self.chunk_url(cid)?;

        let mut request = self.client.get(&url);
        if let Some(r) = range {
            request = request.header(RANGE, r.header_value());
        }

        tracing::debug!(cid, url = %url, range = ?range, "Fetching chunk from gateway");

        let response = request
            .send()
            .await
            .map_err(|e| Error::upstream(cid, format!("request failed: {e}")))?;

        let ranged = match response.status() {
            StatusCode::PARTIAL_CONTENT => {
                if let Some(r) = range {
                    check_content_range(cid, &response, r)?;
                }
                true
            }
            StatusCode::OK => {
                if range.is_some() {
                    tracing::debug!(cid, "Gateway ignored sub-range; slicing locally");
                }
                false
            }
            status => {
                return Err(Error::upstream(cid, format!("gateway returned {status}")));
            }
        };

        let owned_cid = cid.to_string();
        let stream = response
            .bytes_stream()
            .map(move |piece| {
                piece.map_err(|e| Error::upstream(owned_cid.clone(), format!("body read failed: {e}")))
            })
            .boxed();

        Ok(ChunkBody { ranged, stream })
    }
}

/// A 206 must describe exactly the bytes that were asked for.
fn check_content_range(cid: &str, response: &Response, requested: ChunkRange) -> Result<()> {
    let value = response
        .headers()
        .get(CONTENT_RANGE)
        .ok_or_else(|| Error::upstream(cid, "partial response without Content-Range"))?
        .to_str()
        .map_err(|_| Error::upstream(cid, "Content-Range is not valid text"))?;

    let served = parse_content_range(value)
        .ok_or_else(|| Error::upstream(cid, format!("malformed Content-Range {value:?}")))?;
    if served != (requested.start, requested.end) {
        return Err(Error::upstream(
            cid,
            format!("asked for {} but gateway sent {value:?}", requested.header_value()),
        ));
    }
    Ok(())
}

/// `bytes <first>-<last>/<complete or *>` into `(first, last)`.
fn parse_content_range(value: &str) -> Option<(u64, u64)> {
    let (span, _complete) = value.trim().strip_prefix("bytes ")?.split_once('/')?;
    let (first, last) = span.split_once('-')?;
    Some((first.trim().parse().ok()?, last.trim().parse().ok()?))
}
