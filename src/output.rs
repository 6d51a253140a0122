//! Report artifacts: the per-issue CSV table and the hotspot summary.

use crate::activity::HotspotMaps;
use crate::error::ReportError;
use crate::report::{ReportRow, COLUMNS};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Number of entries per hotspot map written to the log at the end of a run.
const TOP_HOTSPOTS: usize = 5;

/// Receives the complete row set each time it grows.
pub trait RowSink {
    fn write_rows(&mut self, rows: &[ReportRow]) -> Result<(), ReportError>;
}

/// Writes a header row and then every row, in order.
///
/// The header is written even when there are no rows.
pub fn write_csv<W: io::Write>(writer: W, rows: &[ReportRow]) -> Result<(), ReportError> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(writer);
    writer.write_record(COLUMNS)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

/// Rewrites a CSV file with the full row set on every call.
#[derive(Debug, Clone)]
pub struct CsvFileSink {
    path: PathBuf,
}

impl CsvFileSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl RowSink for CsvFileSink {
    fn write_rows(&mut self, rows: &[ReportRow]) -> Result<(), ReportError> {
        let file = fs::File::create(&self.path)?;
        write_csv(io::BufWriter::new(file), rows)?;
        tracing::debug!(path = %self.path.display(), rows = rows.len(), "Wrote report");
        Ok(())
    }
}

/// Renders the hotspot maps as pretty JSON, optionally saving a copy to `path`.
pub fn emit_summary(hotspots: &HotspotMaps, path: Option<&Path>) -> Result<String, ReportError> {
    for (name, tally) in [
        ("commits", &hotspots.commits),
        ("file", &hotspots.churn),
        ("components", &hotspots.components),
    ] {
        for (key, count) in HotspotMaps::top(tally, TOP_HOTSPOTS) {
            tracing::info!(map = name, key = key, count = count, "Top hotspot");
        }
    }

    let summary = serde_json::to_string_pretty(hotspots)?;
    if let Some(path) = path {
        fs::write(path, &summary)?;
        tracing::info!(path = %path.display(), "Wrote hotspot summary");
    }
    Ok(summary)
}
