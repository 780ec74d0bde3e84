//! Mapping byte intervals onto chunk fetches.
//!
//! A job's file is stored as fixed-size chunks, so any byte interval touches
//! a contiguous run of them. Every chunk in the run is fetched whole except
//! possibly the first and last, which carry the intra-chunk sub-range the
//! interval actually needs. Concatenating the fetched bytes in plan order
//! yields exactly the interval.

use crate::assembly::JobAssembly;
use crate::error::Result;
use crate::range::ByteInterval;
use crate::Error;

/// Inclusive byte range within a single chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkRange {
    pub start: u64,
    pub end: u64,
}

impl ChunkRange {
    pub fn len(&self) -> u64 {
        self.end - self.start + 1
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    /// Value for a `Range` header asking for exactly these bytes.
    pub fn header_value(&self) -> String {
        format!("bytes={}-{}", self.start, self.end)
    }
}

/// One chunk fetch in a plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkRequest {
    /// Position of the chunk in the job's chunk list.
    pub index: u64,
    /// Sub-range to fetch, or `None` for the whole chunk.
    pub range: Option<ChunkRange>,
    /// Number of bytes this entry contributes.
    pub len: u64,
}

/// Ordered chunk fetches covering one byte interval.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkPlan {
    pub interval: ByteInterval,
    pub requests: Vec<ChunkRequest>,
}

impl ChunkPlan {
    /// Total bytes the plan produces.
    pub fn byte_len(&self) -> u64 {
        self.requests.iter().map(|r| r.len).sum()
    }
}

/// Plan the chunk fetches for `interval`.
///
/// Fails with [`Error::DataConsistency`] if the interval reaches a chunk the
/// job has no identifier for; a shortened plan would silently truncate the
/// response.
pub fn plan_interval(interval: ByteInterval, assembly: &JobAssembly) -> Result<ChunkPlan> {
    let chunk_size = assembly.chunk_size();
    if chunk_size == 0 {
        return Err(Error::Validation("chunk size must be > 0".into()));
    }

    let first_chunk = interval.start / chunk_size;
    let last_chunk = interval.end / chunk_size;
    let first_offset = interval.start % chunk_size;
    let last_offset = interval.end % chunk_size;

    let head_partial = first_offset != 0;
    let tail_partial = last_offset != chunk_size - 1;

    let span = (last_chunk - first_chunk + 1).min(assembly.chunk_count());
    let mut requests = Vec::with_capacity(span as usize);
    let mut dropped = 0u64;

    for index in first_chunk..=last_chunk {
        if index >= assembly.chunk_count() {
            dropped += 1;
            continue;
        }

        let is_first = index == first_chunk;
        let is_last = index == last_chunk;

        let range = match (is_first && head_partial, is_last && tail_partial) {
            (false, false) => None,
            (true, false) => Some(ChunkRange {
                start: first_offset,
                end: chunk_size - 1,
            }),
            (false, true) => Some(ChunkRange {
                start: 0,
                end: last_offset,
            }),
            (true, true) => Some(ChunkRange {
                start: first_offset,
                end: last_offset,
            }),
        };

        let len = match range {
            Some(r) => r.len(),
            None => assembly.chunk_len(index),
        };

        requests.push(ChunkRequest { index, range, len });
    }

    if dropped > 0 {
        tracing::warn!(
            start = interval.start,
            end = interval.end,
            dropped,
            chunk_count = assembly.chunk_count(),
            "Byte interval reaches past the recorded chunk list"
        );
        return Err(Error::data_consistency(format!(
            "bytes {}-{} need chunk {} but only {} chunks are recorded",
            interval.start,
            interval.end,
            last_chunk,
            assembly.chunk_count()
        )));
    }

    let plan = ChunkPlan { interval, requests };
    debug_assert_eq!(plan.byte_len(), interval.len());
    Ok(plan)
}
