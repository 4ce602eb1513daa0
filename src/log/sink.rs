//! Output targets consuming full [`LogRow`] objects.

use std::any::type_name;
use std::fs::{File, OpenOptions};
use std::io::{self, Result as IoResult, Stdout, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex as ParkingMutex;

use super::{COLUMNS, LogRow};
use crate::telemetry::{PlainFormatter, RowFormatter};

/// Abstraction over an output target that consumes full log rows.
///
/// Sinks decide how to serialise and where to write; implementations may
/// perform blocking I/O since the event log already serialises callers.
pub trait RowSink: Send + Sync {
    /// Handle one structured row.
    fn handle(&mut self, row: &LogRow) -> IoResult<()>;

    /// Flush buffered output, if any.
    fn flush(&mut self) -> IoResult<()> {
        Ok(())
    }

    /// Flush and release the target. Must be idempotent.
    fn close(&mut self) -> IoResult<()> {
        self.flush()
    }

    /// A stable, human-friendly identifier for this sink instance.
    fn name(&self) -> String {
        type_name::<Self>().to_string()
    }
}

/// Buffered CSV file sink: one row per event, fixed columns, header on first
/// write.
///
/// The writer buffers up to the configured byte budget; `close` flushes and
/// drops the file handle and is safe to call repeatedly.
pub struct CsvSink {
    writer: Option<csv::Writer<File>>,
    path: PathBuf,
}

impl CsvSink {
    /// Default buffer budget: 1 MiB.
    pub const DEFAULT_BUFFER_CAPACITY: usize = 1_048_576;

    /// Open (or append to) a CSV file at `path`, writing the header row when
    /// the file is empty.
    pub fn create(path: impl AsRef<Path>, buffer_capacity: usize) -> IoResult<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        let fresh = file.metadata()?.len() == 0;
        let mut writer = csv::WriterBuilder::new()
            .buffer_capacity(buffer_capacity.max(1))
            .from_writer(file);
        if fresh {
            writer.write_record(COLUMNS).map_err(io::Error::other)?;
        }
        Ok(Self {
            writer: Some(writer),
            path,
        })
    }

    fn record(row: &LogRow) -> IoResult<[String; 7]> {
        let values = serde_json::to_string(&row.values).map_err(io::Error::other)?;
        let pdv = match &row.pdv {
            Some(container) => serde_json::to_string(container).map_err(io::Error::other)?,
            None => String::new(),
        };
        let addition = match &row.addition {
            Some(more) => serde_json::to_string(more).map_err(io::Error::other)?,
            None => String::new(),
        };
        Ok([
            row.time.to_string(),
            row.component_id.clone(),
            row.component_type.clone(),
            row.action.clone(),
            values,
            pdv,
            addition,
        ])
    }
}

impl RowSink for CsvSink {
    fn handle(&mut self, row: &LogRow) -> IoResult<()> {
        let Some(writer) = self.writer.as_mut() else {
            return Err(io::Error::other("csv sink already closed"));
        };
        let record = Self::record(row)?;
        writer.write_record(&record).map_err(io::Error::other)
    }

    fn flush(&mut self) -> IoResult<()> {
        match self.writer.as_mut() {
            Some(writer) => writer.flush(),
            None => Ok(()),
        }
    }

    fn close(&mut self) -> IoResult<()> {
        if let Some(mut writer) = self.writer.take() {
            writer.flush()?;
        }
        Ok(())
    }

    fn name(&self) -> String {
        format!("CsvSink({})", self.path.display())
    }
}

impl Drop for CsvSink {
    fn drop(&mut self) {
        let _ = self.close();
    }
}

/// In-memory sink for testing and snapshots.
#[derive(Clone, Default)]
pub struct MemorySink {
    entries: Arc<ParkingMutex<Vec<LogRow>>>,
}

impl MemorySink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all captured rows. Clones the internal buffer so callers
    /// can inspect state without holding the mutex.
    #[must_use]
    pub fn snapshot(&self) -> Vec<LogRow> {
        self.entries.lock().clone()
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }
}

impl RowSink for MemorySink {
    fn handle(&mut self, row: &LogRow) -> IoResult<()> {
        self.entries.lock().push(row.clone());
        Ok(())
    }
}

/// Stdout sink with pluggable formatting, for demos and debugging.
pub struct StdOutSink<F: RowFormatter = PlainFormatter> {
    handle: Stdout,
    formatter: F,
}

impl Default for StdOutSink {
    fn default() -> Self {
        Self {
            handle: io::stdout(),
            formatter: PlainFormatter,
        }
    }
}

impl<F: RowFormatter> StdOutSink<F> {
    pub fn with_formatter(formatter: F) -> Self {
        Self {
            handle: io::stdout(),
            formatter,
        }
    }
}

impl<F: RowFormatter> RowSink for StdOutSink<F> {
    fn handle(&mut self, row: &LogRow) -> IoResult<()> {
        let rendered = self.formatter.render_row(row);
        self.handle.write_all(rendered.as_bytes())?;
        self.handle.flush()
    }
}
