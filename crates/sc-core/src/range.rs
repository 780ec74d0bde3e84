//! HTTP `Range` request parsing and resolution.
//!
//! A request names one or more ranges in either plain bytes or whole chunks
//! (`rawchunk`). Each range is resolved independently against the resource's
//! addressable size into a [`ResolvedInterval`], which keeps the range in the
//! client's unit for response headers and carries the equivalent byte
//! interval for the chunk planner.
//!
//! Supported forms:
//! - `bytes=0-499`
//! - `bytes=500-` (to the end)
//! - `bytes=-500` (last 500 bytes)
//! - `bytes=0-9,100-109` (several ranges, served in the order given)
//! - `rawchunk=2-3`, `rawchunk=1-`, `rawchunk=-1`

use std::fmt;
use std::str::FromStr;

use crate::assembly::JobAssembly;
use crate::error::Result;
use crate::Error;

/// Unit a range is expressed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RangeUnit {
    /// Byte offsets into the assembled file.
    Bytes,
    /// Whole-chunk indices into the job's chunk list.
    RawChunk,
}

impl RangeUnit {
    pub fn as_str(self) -> &'static str {
        match self {
            RangeUnit::Bytes => "bytes",
            RangeUnit::RawChunk => "rawchunk",
        }
    }

    /// Addressable size of a job in this unit.
    pub fn max_size(self, assembly: &JobAssembly) -> u64 {
        match self {
            RangeUnit::Bytes => assembly.total_size(),
            RangeUnit::RawChunk => assembly.chunk_count(),
        }
    }
}

impl fmt::Display for RangeUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RangeUnit {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "bytes" => Ok(RangeUnit::Bytes),
            "rawchunk" => Ok(RangeUnit::RawChunk),
            other => Err(Error::Validation(format!("unsupported range unit: {other}"))),
        }
    }
}

/// A single range as the client wrote it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeSpec {
    /// `first-last` or `first-`; both ends inclusive.
    Span { first: u64, last: Option<u64> },
    /// `-len`: the final `len` units.
    Suffix { len: u64 },
}

impl fmt::Display for RangeSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RangeSpec::Span {
                first,
                last: Some(last),
            } => write!(f, "{first}-{last}"),
            RangeSpec::Span { first, last: None } => write!(f, "{first}-"),
            RangeSpec::Suffix { len } => write!(f, "-{len}"),
        }
    }
}

impl FromStr for RangeSpec {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || Error::Validation(format!("invalid range: {s}"));

        let (start, end) = s.trim().split_once('-').ok_or_else(invalid)?;
        let (start, end) = (start.trim(), end.trim());

        match (start.is_empty(), end.is_empty()) {
            (true, false) => {
                let len = end.parse().map_err(|_| invalid())?;
                Ok(RangeSpec::Suffix { len })
            }
            (false, true) => {
                let first = start.parse().map_err(|_| invalid())?;
                Ok(RangeSpec::Span { first, last: None })
            }
            (false, false) => {
                let first: u64 = start.parse().map_err(|_| invalid())?;
                let last: u64 = end.parse().map_err(|_| invalid())?;
                if first > last {
                    return Err(Error::Validation(format!(
                        "range start exceeds end: {s}"
                    )));
                }
                Ok(RangeSpec::Span {
                    first,
                    last: Some(last),
                })
            }
            (true, true) => Err(invalid()),
        }
    }
}

/// A parsed `Range` header: one unit, one or more ranges.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RangeRequest {
    pub unit: RangeUnit,
    pub specs: Vec<RangeSpec>,
}

impl RangeRequest {
    /// Parse a `Range` header value, accepting at most `max_ranges` ranges.
    pub fn parse(value: &str, max_ranges: usize) -> Result<Self> {
        let (unit, set) = value
            .split_once('=')
            .ok_or_else(|| Error::Validation(format!("invalid Range header: {value}")))?;
        let unit: RangeUnit = unit.parse()?;

        let specs = set
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::parse)
            .collect::<Result<Vec<RangeSpec>>>()?;

        if specs.is_empty() {
            return Err(Error::Validation(format!("Range header has no ranges: {value}")));
        }
        if specs.len() > max_ranges {
            return Err(Error::Validation(format!(
                "too many ranges: {} (limit {max_ranges})",
                specs.len()
            )));
        }

        Ok(Self { unit, specs })
    }

    /// Resolve every range against the job, in request order.
    pub fn resolve(&self, assembly: &JobAssembly) -> Result<Vec<ResolvedInterval>> {
        self.specs
            .iter()
            .map(|spec| resolve_spec(self.unit, *spec, assembly))
            .collect()
    }
}

/// Inclusive byte interval within the assembled file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteInterval {
    pub start: u64,
    pub end: u64,
}

impl ByteInterval {
    pub fn new(start: u64, end: u64) -> Self {
        debug_assert!(start <= end);
        Self { start, end }
    }

    pub fn len(&self) -> u64 {
        self.end - self.start + 1
    }

    /// Never true: an interval always holds at least one byte.
    pub fn is_empty(&self) -> bool {
        false
    }
}

/// A range clamped against the resource, in the client's unit and in bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedInterval {
    pub unit: RangeUnit,
    /// First unit index served, inclusive.
    pub block_start: u64,
    /// Last unit index served, inclusive.
    pub block_end: u64,
    /// Addressable size in `unit`.
    pub max_size: u64,
    /// The same span expressed in bytes.
    pub bytes: ByteInterval,
}

impl ResolvedInterval {
    /// The whole file as a byte interval, or `None` for an empty file.
    pub fn whole(assembly: &JobAssembly) -> Option<Self> {
        let size = assembly.total_size();
        (size > 0).then(|| Self {
            unit: RangeUnit::Bytes,
            block_start: 0,
            block_end: size - 1,
            max_size: size,
            bytes: ByteInterval::new(0, size - 1),
        })
    }

    /// Number of bytes in the interval.
    pub fn byte_len(&self) -> u64 {
        self.bytes.len()
    }

    /// Value for a `Content-Range` header.
    pub fn content_range(&self) -> String {
        format!(
            "{} {}-{}/{}",
            self.unit, self.block_start, self.block_end, self.max_size
        )
    }

    /// Whether this interval is the entire file starting at byte 0.
    pub fn covers(&self, total_size: u64) -> bool {
        total_size > 0 && self.bytes.start == 0 && self.bytes.end == total_size - 1
    }
}

/// Resolve one range against the job's addressable size.
///
/// Out-of-bounds starts and empty suffixes are rejected with
/// [`Error::RangeNotSatisfiable`]; ends past the resource are clamped.
pub fn resolve_spec(
    unit: RangeUnit,
    spec: RangeSpec,
    assembly: &JobAssembly,
) -> Result<ResolvedInterval> {
    let max_size = unit.max_size(assembly);
    let unsatisfiable = || Error::unsatisfiable(format!("{unit}={spec}"), max_size);

    if max_size == 0 {
        return Err(unsatisfiable());
    }

    let (block_start, block_end) = match spec {
        RangeSpec::Suffix { len } => {
            if len == 0 {
                return Err(unsatisfiable());
            }
            (max_size.saturating_sub(len), max_size - 1)
        }
        RangeSpec::Span { first, last } => {
            let block_start = first.min(max_size);
            if block_start == max_size {
                return Err(unsatisfiable());
            }
            let block_end = last.unwrap_or(max_size - 1).min(max_size - 1);
            (block_start, block_end)
        }
    };

    let bytes = match unit {
        RangeUnit::Bytes => ByteInterval::new(block_start, block_end),
        RangeUnit::RawChunk => {
            let chunk_size = assembly.chunk_size();
            let total = assembly.total_size();
            let start = block_start.saturating_mul(chunk_size);
            let end = block_end
                .saturating_add(1)
                .saturating_mul(chunk_size)
                .min(total);
            if start >= end {
                return Err(unsatisfiable());
            }
            ByteInterval::new(start, end - 1)
        }
    };

    Ok(ResolvedInterval {
        unit,
        block_start,
        block_end,
        max_size,
        bytes,
    })
}
