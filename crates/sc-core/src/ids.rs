//! Typed identifier for transcoding jobs.
//!
//! Jobs are keyed by the bookkeeping store's integer primary key. Wrapping it
//! keeps raw row ids from leaking into APIs that expect a job.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::num::ParseIntError;
use std::str::FromStr;

/// Unique identifier for a transcoding job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(i64);

impl JobId {
    /// Wrap a raw row id.
    #[must_use]
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    /// Return the inner row id.
    #[must_use]
    pub fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Failure to parse a [`JobId`] from a path segment.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseJobIdError {
    #[error("job id is empty")]
    Empty,
    #[error("job id must not be negative")]
    Negative,
    #[error("job id is not an integer: {0}")]
    NotAnInteger(#[from] ParseIntError),
}

impl FromStr for JobId {
    type Err = ParseJobIdError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(ParseJobIdError::Empty);
        }
        let id: i64 = s.parse()?;
        if id < 0 {
            return Err(ParseJobIdError::Negative);
        }
        Ok(Self(id))
    }
}

impl From<i64> for JobId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

impl From<JobId> for i64 {
    fn from(id: JobId) -> Self {
        id.0
    }
}
