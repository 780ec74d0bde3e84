//! Finished-job assembly records.
//!
//! Once every chunk of a job has been transcoded and uploaded, the
//! bookkeeping store records the logical file as an [`AssembledData`] blob:
//! its total size plus the ordered content identifiers of its chunks. The
//! streaming engine turns that into a [`JobAssembly`], which also carries the
//! fixed chunk size the file was cut with.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::Error;

/// Serialized assembly record as stored by the job bookkeeping layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssembledData {
    /// Total size of the assembled file in bytes.
    pub size: u64,
    /// Content identifiers of the chunks, in file order.
    pub chunk: Vec<String>,
}

impl AssembledData {
    /// Parse the stored text form.
    ///
    /// A record that does not parse means the bookkeeping data is corrupt,
    /// so this reports a [`Error::DataConsistency`] rather than a request error.
    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text)
            .map_err(|e| Error::data_consistency(format!("malformed assembled data: {e}")))
    }

    /// Serialize to the stored text form.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self)
            .map_err(|e| Error::Internal(format!("failed to serialize assembled data: {e}")))
    }
}

/// Everything the streaming engine needs to know about a finished job's output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobAssembly {
    total_size: u64,
    chunk_size: u64,
    chunk_ids: Vec<String>,
}

impl JobAssembly {
    /// Build an assembly without checking that the chunk list covers the size.
    ///
    /// Use [`JobAssembly::validate`] (or [`JobAssembly::from_record`]) before
    /// serving bytes from it.
    pub fn new(total_size: u64, chunk_size: u64, chunk_ids: Vec<String>) -> Self {
        Self {
            total_size,
            chunk_size,
            chunk_ids,
        }
    }

    /// Build and validate an assembly from a stored record.
    pub fn from_record(data: AssembledData, chunk_size: u64) -> Result<Self> {
        let assembly = Self::new(data.size, chunk_size, data.chunk);
        assembly.validate()?;
        Ok(assembly)
    }

    /// Parse a stored record's text form and validate it.
    pub fn from_json(text: &str, chunk_size: u64) -> Result<Self> {
        Self::from_record(AssembledData::from_json(text)?, chunk_size)
    }

    pub fn total_size(&self) -> u64 {
        self.total_size
    }

    pub fn chunk_size(&self) -> u64 {
        self.chunk_size
    }

    pub fn chunk_ids(&self) -> &[String] {
        &self.chunk_ids
    }

    /// Number of chunk identifiers on record.
    pub fn chunk_count(&self) -> u64 {
        self.chunk_ids.len() as u64
    }

    /// Number of chunks the total size requires at this chunk size.
    pub fn chunks_required(&self) -> u64 {
        if self.chunk_size == 0 {
            return 0;
        }
        self.total_size.div_ceil(self.chunk_size)
    }

    /// Content identifier of the chunk at `index`.
    pub fn cid(&self, index: u64) -> Option<&str> {
        usize::try_from(index)
            .ok()
            .and_then(|i| self.chunk_ids.get(i))
            .map(String::as_str)
    }

    /// Byte length of the chunk at `index`; the last chunk may be short.
    pub fn chunk_len(&self, index: u64) -> u64 {
        let start = index.saturating_mul(self.chunk_size);
        self.total_size.saturating_sub(start).min(self.chunk_size)
    }

    /// Check that the chunk list can back every byte of the file.
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(Error::Validation("chunk size must be > 0".into()));
        }

        let required = self.chunks_required();
        if self.chunk_count() < required {
            return Err(Error::data_consistency(format!(
                "{} bytes at chunk size {} need {} chunks, but only {} are recorded",
                self.total_size,
                self.chunk_size,
                required,
                self.chunk_count()
            )));
        }

        if let Some(pos) = self.chunk_ids.iter().position(|cid| cid.trim().is_empty()) {
            return Err(Error::data_consistency(format!(
                "chunk {pos} has an empty content identifier"
            )));
        }

        Ok(())
    }
}
