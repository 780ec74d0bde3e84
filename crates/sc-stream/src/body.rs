//! Response bodies assembled from chunk plans.
//!
//! A [`RangeBody`] is an ordered list of literal byte segments (multipart
//! headers, trailers) and chunk plans. Opening it starts one prefetch
//! pipeline across every planned chunk, so fetching for the next part
//! overlaps with writing the current one.

use std::sync::Arc;

use async_stream::stream;
use bytes::Bytes;
use futures::stream::BoxStream;
use futures::{FutureExt, StreamExt};
use sc_core::plan::ChunkPlan;
use sc_core::{Error, JobAssembly, Result};
use tokio_util::sync::CancellationToken;

use crate::fetcher::{read_chunk, ChunkFetcher};
use crate::pipeline::{FetchTask, PrefetchPipeline};

/// A response body: bytes in order, or the error that cut it short.
pub type ByteStream = BoxStream<'static, Result<Bytes>>;

enum Segment {
    Literal(Bytes),
    Chunks(ChunkPlan),
}

enum Step {
    Literal(Bytes),
    Chunk,
}

pub struct RangeBody {
    assembly: Arc<JobAssembly>,
    fetcher: Arc<dyn ChunkFetcher>,
    window: usize,
    cancel: CancellationToken,
    segments: Vec<Segment>,
}

impl RangeBody {
    /// Start an empty body.
    ///
    /// Fetches observe `cancel`; the token is also cancelled when the
    /// opened stream is dropped.
    pub fn new(
        assembly: Arc<JobAssembly>,
        fetcher: Arc<dyn ChunkFetcher>,
        window: usize,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            assembly,
            fetcher,
            window,
            cancel,
            segments: Vec::new(),
        }
    }

    /// Append a part: an optional header followed by the plan's bytes.
    pub fn part(mut self, header: Option<Bytes>, plan: ChunkPlan) -> Self {
        if let Some(h) = header {
            self.segments.push(Segment::Literal(h));
        }
        self.segments.push(Segment::Chunks(plan));
        self
    }

    /// Append literal bytes after the last part.
    pub fn trailer(mut self, bytes: Bytes) -> Self {
        self.segments.push(Segment::Literal(bytes));
        self
    }

    /// Exact number of bytes the opened stream yields on success.
    pub fn content_length(&self) -> u64 {
        self.segments
            .iter()
            .map(|s| match s {
                Segment::Literal(b) => b.len() as u64,
                Segment::Chunks(plan) => plan.byte_len(),
            })
            .sum()
    }

    /// Start fetching and wait for the first chunk.
    ///
    /// An error here means no byte has been produced yet, so the caller can
    /// still answer with an error status. Errors after this point arrive
    /// through the stream.
    pub async fn open(self) -> Result<ByteStream> {
        let content_length = self.content_length();
        let mut steps = Vec::new();
        let mut tasks: Vec<FetchTask<Bytes>> = Vec::new();

        for segment in self.segments {
            match segment {
                Segment::Literal(b) => steps.push(Step::Literal(b)),
                Segment::Chunks(plan) => {
                    for request in plan.requests {
                        let cid = self
                            .assembly
                            .cid(request.index)
                            .ok_or_else(|| {
                                Error::data_consistency(format!(
                                    "no identifier for chunk {}",
                                    request.index
                                ))
                            })?
                            .to_string();
                        let fetcher = self.fetcher.clone();
                        tasks.push(Box::new(move || {
                            async move { read_chunk(fetcher.as_ref(), &cid, request).await }.boxed()
                        }));
                        steps.push(Step::Chunk);
                    }
                }
            }
        }

        tracing::debug!(
            chunks = tasks.len(),
            window = self.window,
            content_length,
            "Opening range body"
        );

        let mut pipeline = PrefetchPipeline::new(tasks, self.window, &self.cancel);
        let mut primed = match pipeline.next().await {
            Some(first) => Some(first?),
            None => None,
        };

        let guard = self.cancel.drop_guard();
        let stream = stream! {
            let _guard = guard;
            for step in steps {
                match step {
                    Step::Literal(b) => {
                        yield Ok(b);
                    }
                    Step::Chunk => {
                        let next = match primed.take() {
                            Some(b) => Ok(b),
                            None => match pipeline.next().await {
                                Some(r) => r,
                                None => Err(Error::Internal("chunk pipeline ended early".into())),
                            },
                        };
                        let failed = next.is_err();
                        yield next;
                        if failed {
                            break;
                        }
                    }
                }
            }
        };
        Ok(stream.boxed())
    }
}
