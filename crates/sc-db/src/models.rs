//! Typed rows returned by query modules.

use sc_core::{Error, JobAssembly, JobId, Result};

#[derive(Debug, Clone)]
pub struct Job {
    pub id: JobId,
    pub source_id: Option<i64>,
    pub width: Option<i64>,
    pub height: Option<i64>,
    pub framerate: Option<f64>,
    pub bitrate: Option<i64>,
    pub codec: String,
    pub codec_settings: Option<String>,
    pub chunks: Option<i64>,
    pub finished: bool,
    pub assembled_data: Option<String>,
    pub created_at: String,
}

impl Job {
    /// Build from a row selected as all columns in table order.
    pub fn from_row(row: &rusqlite::Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: JobId::new(row.get(0)?),
            source_id: row.get(1)?,
            width: row.get(2)?,
            height: row.get(3)?,
            framerate: row.get(4)?,
            bitrate: row.get(5)?,
            codec: row.get(6)?,
            codec_settings: row.get(7)?,
            chunks: row.get(8)?,
            finished: row.get::<_, i64>(9)? != 0,
            assembled_data: row.get(10)?,
            created_at: row.get(11)?,
        })
    }

    /// The assembled output of a finished job.
    ///
    /// Unfinished jobs and finished jobs without a stored record are
    /// reported as [`Error::NotFound`]; a stored record that is corrupt or
    /// does not cover its size is an [`Error::DataConsistency`].
    pub fn assembly(&self, chunk_size: u64) -> Result<JobAssembly> {
        if !self.finished {
            return Err(Error::not_found("finished job", self.id));
        }
        let data = self
            .assembled_data
            .as_deref()
            .ok_or_else(|| Error::not_found("assembled data for job", self.id))?;
        JobAssembly::from_json(data, chunk_size)
    }
}
