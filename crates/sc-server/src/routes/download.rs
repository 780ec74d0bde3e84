//! Download route handlers: the assembled output of a finished job, with
//! `Range` support in `bytes` and `rawchunk` units.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::header::RANGE;
use axum::http::HeaderMap;
use axum::response::Response;
use axum::Extension;
use sc_core::codec::content_type_for_codec;
use sc_core::range::RangeRequest;
use sc_core::{Error, JobAssembly, JobId, Result};

use crate::context::AppContext;
use crate::error::AppError;
use crate::middleware::request_id::RequestId;
use crate::range_writer::{RangeResponseWriter, ResponseMode};

/// GET /download/{id}
pub async fn download(
    State(ctx): State<AppContext>,
    Path(id): Path<String>,
    Extension(RequestId(request_id)): Extension<RequestId>,
    headers: HeaderMap,
) -> std::result::Result<Response, AppError> {
    serve(&ctx, &id, &headers)
        .await
        .map_err(|e| attach_request_id(e, request_id))
}

/// HEAD /download/{id}
pub async fn download_head(
    State(ctx): State<AppContext>,
    Path(id): Path<String>,
    Extension(RequestId(request_id)): Extension<RequestId>,
) -> std::result::Result<Response, AppError> {
    let writer = writer_for(&ctx, &id)
        .map_err(|e| attach_request_id(e, request_id))?;
    Ok(writer.head())
}

/// GET /download without an id.
pub async fn missing_id(Extension(RequestId(request_id)): Extension<RequestId>) -> AppError {
    attach_request_id(Error::Validation("missing job id".into()), request_id)
}

async fn serve(ctx: &AppContext, id: &str, headers: &HeaderMap) -> Result<Response> {
    let writer = writer_for(ctx, id)?;

    let mode = match headers.get(RANGE) {
        None => ResponseMode::Unset,
        Some(value) => {
            let value = value
                .to_str()
                .map_err(|_| Error::Validation("Range header is not valid text".into()))?;
            let request = RangeRequest::parse(value, ctx.config.streaming.max_ranges)?;
            let intervals = request.resolve(writer.assembly())?;
            ResponseMode::choose(intervals, writer.assembly().total_size())
        }
    };

    writer.write(mode).await
}

/// Look up a finished job and build the writer for it.
fn writer_for(ctx: &AppContext, id: &str) -> Result<RangeResponseWriter> {
    let job_id: JobId = id
        .parse()
        .map_err(|e| Error::Validation(format!("invalid job id {id:?}: {e}")))?;

    let conn = sc_db::pool::get_conn(&ctx.db)?;
    let job = sc_db::queries::jobs::get_job(&conn, job_id)?
        .ok_or_else(|| Error::not_found("job", job_id))?;
    let assembly: JobAssembly = job.assembly(ctx.config.streaming.chunk_size)?;

    tracing::debug!(
        job_id = %job_id,
        codec = %job.codec,
        size = assembly.total_size(),
        chunks = assembly.chunk_count(),
        "Resolved download"
    );

    Ok(RangeResponseWriter::new(
        job_id,
        Arc::new(assembly),
        content_type_for_codec(&job.codec),
        ctx.fetcher.clone(),
        ctx.config.streaming.prefetch_window,
        ctx.shutdown.child_token(),
    ))
}

fn attach_request_id(e: Error, request_id: String) -> AppError {
    AppError::new(e).with_request_id(request_id)
}
