//! sc-core: shared types, errors, configuration, and the range/chunk model.
//!
//! This crate is the foundational dependency for all other sc-* crates. It
//! owns the pure half of the streaming engine: resolving a client `Range`
//! request into byte intervals ([`range`]), mapping an interval onto the
//! chunks that hold it ([`plan`]), and the [`JobAssembly`] record both are
//! computed against.

pub mod assembly;
pub mod codec;
pub mod config;
pub mod error;
pub mod ids;
pub mod plan;
pub mod range;

// Re-export the most commonly used items at the crate root.
pub use assembly::{AssembledData, JobAssembly};
pub use error::{Error, Result};
pub use ids::JobId;
