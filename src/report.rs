//! CSV tables written to the report stream.
//!
//! Each stage writes one table: a header line followed by one line per row.
//! Rows are flushed as soon as they are written so partial results stay
//! visible when a later stage fails.

use std::io::Write;
use std::time::Duration;

use serde::{Serialize, Serializer};

use crate::error::Result;

/// Header of the environment table.
pub const INFO_HEADER: [&str; 2] = ["Component", "Version"];
/// Header of the batch timing table.
pub const BATCH_HEADER: [&str; 2] = ["Batch conversion", "Time (ns)"];
/// Header of the per-file timing table.
pub const FILES_HEADER: [&str; 4] = ["File", "Tool", "Time (ns)", "Size (Bytes)"];
/// Header of the quality metric table.
pub const METRICS_HEADER: [&str; 6] = ["File", "Tool", "FLIP (Mean)", "PSNR", "RMSE (%)", "SSIM"];

/// Incremental CSV table writer.
pub struct TableWriter<W: Write> {
    inner: csv::Writer<W>,
}

impl<W: Write> TableWriter<W> {
    /// Start a table by writing its header.
    pub fn new(writer: W, header: &[&str]) -> Result<Self> {
        let mut inner = csv::WriterBuilder::new()
            .has_headers(false)
            .terminator(csv::Terminator::Any(b'\n'))
            .from_writer(writer);
        inner.write_record(header)?;
        inner.flush()?;
        Ok(Self { inner })
    }

    /// Write and flush one row.
    pub fn write_row<S: Serialize>(&mut self, row: &S) -> Result<()> {
        self.inner.serialize(row)?;
        self.inner.flush()?;
        Ok(())
    }
}

/// `Component,Version` row.
#[derive(Debug, Clone, Serialize)]
pub struct InfoRow {
    pub component: String,
    pub version: String,
}

/// `Batch conversion,Time (ns)` row.
#[derive(Debug, Clone, Serialize)]
pub struct BatchRow {
    pub tool: &'static str,
    #[serde(serialize_with = "nanos")]
    pub elapsed: Duration,
}

/// `File,Tool,Time (ns),Size (Bytes)` row.
#[derive(Debug, Clone, Serialize)]
pub struct FileRow {
    pub file: String,
    pub tool: &'static str,
    #[serde(serialize_with = "nanos")]
    pub elapsed: Duration,
    pub size: u64,
}

fn nanos<S: Serializer>(
    duration: &Duration,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    u64::try_from(duration.as_nanos())
        .unwrap_or(u64::MAX)
        .serialize(serializer)
}
