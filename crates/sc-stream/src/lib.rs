//! sc-stream: chunk fetching and ordered range streaming.
//!
//! Given the chunk plans produced by `sc_core::plan`, this crate fetches the
//! chunks from a content-addressable store and streams their bytes back in
//! plan order:
//!
//! - [`fetcher`]: the [`ChunkFetcher`] seam and exact-length chunk reads
//! - [`gateway`]: HTTP gateway implementation of the seam
//! - [`memory`]: in-process implementation for tests and local tooling
//! - [`pipeline`]: bounded-window prefetching with in-order delivery
//! - [`multipart`]: `multipart/byteranges` framing
//! - [`body`]: a response body stream over one or more planned intervals

pub mod body;
pub mod fetcher;
pub mod gateway;
pub mod memory;
pub mod multipart;
pub mod pipeline;

pub use body::{ByteStream, RangeBody};
pub use fetcher::{read_chunk, ChunkBody, ChunkFetcher};
pub use gateway::GatewayFetcher;
pub use memory::MemoryChunkStore;
pub use pipeline::{FetchTask, PrefetchPipeline};
