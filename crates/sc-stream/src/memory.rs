//! In-process chunk store.
//!
//! Holds chunks in memory and serves them through [`ChunkFetcher`]. Used by
//! tests and the `plan` tooling; it can inject latency and failures per
//! chunk and records how many fetches ran at once.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream;
use futures::StreamExt;
use sc_core::plan::ChunkRange;
use sc_core::{Error, Result};

use crate::fetcher::{ChunkBody, ChunkFetcher};

/// Piece size used when a test does not pick one.
const DEFAULT_PIECE_SIZE: usize = 16 * 1024;

pub struct MemoryChunkStore {
    chunks: HashMap<String, Bytes>,
    delays: HashMap<String, Duration>,
    failures: HashSet<String>,
    honour_ranges: bool,
    piece_size: usize,
    fetches: AtomicUsize,
    active: AtomicUsize,
    peak: AtomicUsize,
}

impl Default for MemoryChunkStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryChunkStore {
    pub fn new() -> Self {
        Self {
            chunks: HashMap::new(),
            delays: HashMap::new(),
            failures: HashSet::new(),
            honour_ranges: true,
            piece_size: DEFAULT_PIECE_SIZE,
            fetches: AtomicUsize::new(0),
            active: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        }
    }

    /// Split `file` into `chunk_size` chunks named `chunk-{index}`.
    ///
    /// Returns the store and the chunk identifiers in file order.
    pub fn from_file(file: &[u8], chunk_size: usize) -> (Self, Vec<String>) {
        let mut store = Self::new();
        let mut ids = Vec::new();
        for (index, piece) in file.chunks(chunk_size.max(1)).enumerate() {
            let cid = format!("chunk-{index}");
            store.chunks.insert(cid.clone(), Bytes::copy_from_slice(piece));
            ids.push(cid);
        }
        (store, ids)
    }

    pub fn with_chunk(mut self, cid: impl Into<String>, data: impl Into<Bytes>) -> Self {
        self.chunks.insert(cid.into(), data.into());
        self
    }

    /// Delay every fetch of `cid` before its body is returned.
    pub fn with_delay(mut self, cid: impl Into<String>, delay: Duration) -> Self {
        self.delays.insert(cid.into(), delay);
        self
    }

    /// Make every fetch of `cid` fail as an upstream error.
    pub fn with_failure(mut self, cid: impl Into<String>) -> Self {
        self.failures.insert(cid.into());
        self
    }

    /// Size of the pieces a chunk body is streamed in.
    pub fn with_chunk_piece_size(mut self, piece_size: usize) -> Self {
        self.piece_size = piece_size.max(1);
        self
    }

    /// When `false`, sub-range requests get the whole chunk back.
    pub fn honour_ranges(mut self, honour: bool) -> Self {
        self.honour_ranges = honour;
        self
    }

    /// Total fetches started so far.
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    /// Highest number of fetches that were waiting at the same time.
    pub fn peak_concurrency(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    fn body_for(&self, cid: &str, range: Option<ChunkRange>) -> Result<ChunkBody> {
        if self.failures.contains(cid) {
            return Err(Error::upstream(cid, "injected failure"));
        }
        let data = self
            .chunks
            .get(cid)
            .ok_or_else(|| Error::upstream(cid, "chunk not in store"))?;

        let (data, ranged) = match range {
            Some(r) if self.honour_ranges => {
                let len = data.len() as u64;
                if r.start >= len {
                    return Err(Error::upstream(
                        cid,
                        format!("range {}-{} past chunk of {len} bytes", r.start, r.end),
                    ));
                }
                let end = r.end.min(len - 1);
                (data.slice(r.start as usize..=end as usize), true)
            }
            _ => (data.clone(), false),
        };

        let piece_size = self.piece_size;
        let pieces: Vec<Result<Bytes>> = (0..data.len())
            .step_by(piece_size)
            .map(|at| Ok(data.slice(at..(at + piece_size).min(data.len()))))
            .collect();

        Ok(ChunkBody {
            ranged,
            stream: stream::iter(pieces).boxed(),
        })
    }
}

#[async_trait]
impl ChunkFetcher for MemoryChunkStore {
    async fn fetch(&self, cid: &str, range: Option<ChunkRange>) -> Result<ChunkBody> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);

        if let Some(delay) = self.delays.get(cid) {
            tokio::time::sleep(*delay).await;
        }
        let body = self.body_for(cid, range);

        self.active.fetch_sub(1, Ordering::SeqCst);
        body
    }
}
