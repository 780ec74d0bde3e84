//! The chunk store seam.
//!
//! A [`ChunkFetcher`] retrieves one chunk, or a byte sub-range of it, by
//! content identifier. [`read_chunk`] drives a fetch to completion for one
//! planned entry and guarantees the result is exactly the bytes the entry
//! contributes, slicing locally when the store ignored the sub-range.

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use futures::stream::BoxStream;
use futures::StreamExt;
use sc_core::plan::{ChunkRange, ChunkRequest};
use sc_core::{Error, Result};

/// Bytes of a chunk as they arrive from the store.
pub type ChunkStream = BoxStream<'static, Result<Bytes>>;

/// An in-progress chunk download.
///
/// The stream ending is the completion signal; an `Err` item means the
/// transfer failed part way.
pub struct ChunkBody {
    /// `true` when the store answered with only the requested sub-range.
    pub ranged: bool,
    pub stream: ChunkStream,
}

/// Retrieves chunk bytes from a content-addressable store.
#[async_trait]
pub trait ChunkFetcher: Send + Sync {
    /// Start downloading the chunk `cid`, optionally only `range` of it.
    ///
    /// Stores may ignore `range` and return the whole chunk, in which case
    /// [`ChunkBody::ranged`] is `false`.
    async fn fetch(&self, cid: &str, range: Option<ChunkRange>) -> Result<ChunkBody>;
}

/// Fetch the bytes for one planned chunk entry.
///
/// Fails with [`Error::Upstream`] if the store delivers a different number
/// of bytes than the entry covers.
pub async fn read_chunk(fetcher: &dyn ChunkFetcher, cid: &str, request: ChunkRequest) -> Result<Bytes> {
    let body = fetcher.fetch(cid, request.range).await?;

    // Sliced locally when the store sent the whole chunk for a ranged entry.
    let local_slice = match request.range {
        Some(r) if !body.ranged => Some(r),
        _ => None,
    };
    let needed = match local_slice {
        Some(r) => r.end + 1,
        None => request.len,
    };

    let mut buf = BytesMut::with_capacity(needed as usize);
    let mut stream = body.stream;
    while let Some(piece) = stream.next().await {
        buf.extend_from_slice(&piece?);
        if buf.len() as u64 >= needed && local_slice.is_some() {
            // The rest of the chunk is not needed; dropping the stream ends the transfer.
            break;
        }
        if buf.len() as u64 > needed {
            return Err(Error::upstream(
                cid,
                format!("chunk {} sent more than {needed} bytes", request.index),
            ));
        }
    }

    let mut bytes = buf.freeze();
    if let Some(r) = local_slice {
        if (bytes.len() as u64) < needed {
            return Err(Error::upstream(
                cid,
                format!(
                    "chunk {} ended at {} bytes, before requested offset {}",
                    request.index,
                    bytes.len(),
                    r.end
                ),
            ));
        }
        bytes = bytes.slice(r.start as usize..=r.end as usize);
    }

    if bytes.len() as u64 != request.len {
        return Err(Error::upstream(
            cid,
            format!(
                "chunk {} delivered {} bytes, expected {}",
                request.index,
                bytes.len(),
                request.len
            ),
        ));
    }

    tracing::trace!(cid, index = request.index, len = bytes.len(), "Chunk read");
    Ok(bytes)
}
