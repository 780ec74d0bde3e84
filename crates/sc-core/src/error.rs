//! Unified error type for shardcast.
//!
//! All crates funnel their failures into [`Error`], which carries enough context
//! for HTTP handlers to derive a status code via [`Error::http_status`].
//!
//! The request-facing variants follow the download path's failure classes:
//! malformed requests ([`Error::Validation`], [`Error::RangeNotSatisfiable`])
//! are rejected before any upstream I/O, missing jobs are [`Error::NotFound`],
//! chunk-store failures are [`Error::Upstream`], and records whose chunk list
//! cannot back the advertised size are [`Error::DataConsistency`].

use std::fmt;

/// Unified error type covering all failure modes in shardcast.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The requested entity could not be found.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// The kind of entity (e.g. "job", "assembled data").
        entity: String,
        /// The identifier that was looked up.
        id: String,
    },

    /// Request data failed validation.
    #[error("Validation error: {0}")]
    Validation(String),

    /// A range lies outside the addressable size of the resource, or is empty.
    #[error("Range not satisfiable: {range} (size {size})")]
    RangeNotSatisfiable {
        /// The offending range as the client sent it.
        range: String,
        /// Addressable size in the range's unit.
        size: u64,
    },

    /// The chunk-store gateway failed to deliver a chunk.
    #[error("Upstream error [{cid}]: {message}")]
    Upstream {
        /// Content identifier of the chunk being fetched.
        cid: String,
        /// Human-readable error description.
        message: String,
    },

    /// A job's assembled record cannot back the bytes it claims to hold.
    #[error("Data consistency error: {0}")]
    DataConsistency(String),

    /// A database operation failed.
    #[error("Database error: {source}")]
    Database {
        /// The underlying database error.
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// An I/O operation failed.
    #[error("IO error: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// The work was abandoned because its request went away.
    #[error("Cancelled")]
    Cancelled,

    /// Catch-all for unexpected internal errors.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Map this error to an appropriate HTTP status code.
    pub fn http_status(&self) -> u16 {
        match self {
            Error::NotFound { .. } => 404,
            Error::Validation(_) => 400,
            Error::RangeNotSatisfiable { .. } => 400,
            Error::Upstream { .. } => 502,
            Error::DataConsistency(_) => 500,
            Error::Database { .. } => 500,
            Error::Io { .. } => 500,
            Error::Cancelled => 500,
            Error::Internal(_) => 500,
        }
    }

    /// Short machine-readable name for the error kind.
    pub fn code(&self) -> &'static str {
        match self {
            Error::NotFound { .. } => "not_found",
            Error::Validation(_) => "validation_error",
            Error::RangeNotSatisfiable { .. } => "range_not_satisfiable",
            Error::Upstream { .. } => "upstream_error",
            Error::DataConsistency(_) => "data_consistency_error",
            Error::Database { .. } => "database_error",
            Error::Io { .. } => "io_error",
            Error::Cancelled => "cancelled",
            Error::Internal(_) => "internal_error",
        }
    }

    /// Convenience constructor for [`Error::NotFound`].
    pub fn not_found(entity: impl Into<String>, id: impl fmt::Display) -> Self {
        Error::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }

    /// Convenience constructor for [`Error::Database`].
    pub fn database(source: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Error::Database {
            source: source.into(),
        }
    }

    /// Convenience constructor for [`Error::Upstream`].
    pub fn upstream(cid: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Upstream {
            cid: cid.into(),
            message: message.into(),
        }
    }

    /// Convenience constructor for [`Error::RangeNotSatisfiable`].
    pub fn unsatisfiable(range: impl Into<String>, size: u64) -> Self {
        Error::RangeNotSatisfiable {
            range: range.into(),
            size,
        }
    }

    /// Convenience constructor for [`Error::DataConsistency`].
    pub fn data_consistency(message: impl Into<String>) -> Self {
        Error::DataConsistency(message.into())
    }
}

/// Result alias using the crate-level [`Error`].
pub type Result<T> = std::result::Result<T, Error>;
