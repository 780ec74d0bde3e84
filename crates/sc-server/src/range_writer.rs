//! Status line, headers, and body for a download response.
//!
//! The response shape is decided once from the resolved ranges
//! ([`ResponseMode::choose`]) and each mode drives one header strategy:
//! the whole file (200), one range (206 with `Content-Range`), or several
//! ranges (206 `multipart/byteranges`).

use std::sync::Arc;

use axum::body::Body;
use axum::http::header::{ACCEPT_RANGES, CONTENT_LENGTH, CONTENT_RANGE, CONTENT_TYPE};
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use futures::TryStreamExt;
use sc_core::plan::plan_interval;
use sc_core::range::ResolvedInterval;
use sc_core::{Error, JobAssembly, JobId, Result};
use sc_stream::{multipart, ChunkFetcher, RangeBody};
use tokio_util::sync::CancellationToken;

/// Value of `Accept-Ranges` on every download response.
pub const ACCEPTED_UNITS: &str = "bytes, rawchunk";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseMode {
    /// No effective restriction: the whole file with 200.
    Unset,
    SingleRange(ResolvedInterval),
    MultiRange(Vec<ResolvedInterval>),
}

impl ResponseMode {
    /// Pick the mode for `intervals` against a file of `total_size` bytes.
    ///
    /// A single range that is the whole file from byte 0 is served as if no
    /// range had been sent.
    pub fn choose(mut intervals: Vec<ResolvedInterval>, total_size: u64) -> Self {
        match intervals.len() {
            0 => ResponseMode::Unset,
            1 if intervals[0].covers(total_size) => ResponseMode::Unset,
            1 => ResponseMode::SingleRange(intervals.remove(0)),
            _ => ResponseMode::MultiRange(intervals),
        }
    }
}

pub struct RangeResponseWriter {
    job_id: JobId,
    assembly: Arc<JobAssembly>,
    content_type: &'static str,
    fetcher: Arc<dyn ChunkFetcher>,
    window: usize,
    cancel: CancellationToken,
}

impl RangeResponseWriter {
    pub fn new(
        job_id: JobId,
        assembly: Arc<JobAssembly>,
        content_type: &'static str,
        fetcher: Arc<dyn ChunkFetcher>,
        window: usize,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            job_id,
            assembly,
            content_type,
            fetcher,
            window,
            cancel,
        }
    }

    pub fn assembly(&self) -> &JobAssembly {
        &self.assembly
    }

    /// Headers of the whole-file response, with no body.
    pub fn head(&self) -> Response {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(self.content_type));
        headers.insert(CONTENT_LENGTH, HeaderValue::from(self.assembly.total_size()));
        headers.insert(ACCEPT_RANGES, HeaderValue::from_static(ACCEPTED_UNITS));
        (StatusCode::OK, headers, Body::empty()).into_response()
    }

    /// Plan every interval, wait for the first chunk, then return the
    /// streaming response.
    ///
    /// Any error returned here happened before a byte was produced. Errors
    /// after that end the body early, which aborts the connection.
    pub async fn write(self, mode: ResponseMode) -> Result<Response> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT_RANGES, HeaderValue::from_static(ACCEPTED_UNITS));

        let body = RangeBody::new(
            self.assembly.clone(),
            self.fetcher.clone(),
            self.window,
            self.cancel.clone(),
        );

        let (status, body) = match mode {
            ResponseMode::Unset => {
                headers.insert(CONTENT_TYPE, HeaderValue::from_static(self.content_type));
                match ResolvedInterval::whole(&self.assembly) {
                    Some(whole) => {
                        let plan = plan_interval(whole.bytes, &self.assembly)?;
                        (StatusCode::OK, body.part(None, plan))
                    }
                    None => {
                        headers.insert(CONTENT_LENGTH, HeaderValue::from(0u64));
                        return Ok((StatusCode::OK, headers, Body::empty()).into_response());
                    }
                }
            }
            ResponseMode::SingleRange(interval) => {
                let plan = plan_interval(interval.bytes, &self.assembly)?;
                headers.insert(CONTENT_TYPE, HeaderValue::from_static(self.content_type));
                headers.insert(CONTENT_RANGE, header_value(&interval.content_range())?);
                (StatusCode::PARTIAL_CONTENT, body.part(None, plan))
            }
            ResponseMode::MultiRange(intervals) => {
                let boundary = multipart::generate_boundary();
                let mut body = body;
                for (i, interval) in intervals.iter().enumerate() {
                    let plan = plan_interval(interval.bytes, &self.assembly)?;
                    let part_header = multipart::part_header(
                        &boundary,
                        i == 0,
                        self.content_type,
                        &interval.content_range(),
                    );
                    body = body.part(Some(part_header), plan);
                }
                headers.insert(
                    CONTENT_TYPE,
                    header_value(&multipart::content_type(&boundary))?,
                );
                (
                    StatusCode::PARTIAL_CONTENT,
                    body.trailer(multipart::closing_delimiter(&boundary)),
                )
            }
        };

        let content_length = body.content_length();
        headers.insert(CONTENT_LENGTH, HeaderValue::from(content_length));

        let stream = body.open().await?;

        let job_id = self.job_id;
        let stream = stream.inspect_err(move |e| {
            tracing::warn!(job_id = %job_id, error = %e, "Download aborted mid-stream");
        });

        tracing::debug!(job_id = %self.job_id, status = %status, content_length, "Streaming download");
        Ok((status, headers, Body::from_stream(stream)).into_response())
    }
}

fn header_value(value: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(value).map_err(|e| Error::Internal(format!("bad header value {value:?}: {e}")))
}
