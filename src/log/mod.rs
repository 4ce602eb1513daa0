//! Structured event logging.
//!
//! Components report their actions as fixed-column [`LogRow`]s through a
//! shared [`EventLog`]. The log is an append-only front over a set of
//! pluggable [`RowSink`]s: a buffered CSV file for persisted runs, an
//! in-memory capture for tests, stdout for demos.
//!
//! ```text
//! Components
//!     │ log_event()
//!     ▼
//! EventLog (mutex-serialised)
//!     ├────────┬──────────┐
//!     ▼        ▼          ▼
//!  CsvSink  MemorySink  StdOutSink
//! ```
//!
//! The log is the only part of the engine that may be touched from outside
//! the scheduler thread (a shutdown handler, for instance); writes are
//! serialised by an internal mutex. Sink I/O failures are caught, reported
//! on the diagnostic channel, and never interrupt the simulation.

mod sink;

pub use sink::{CsvSink, MemorySink, RowSink, StdOutSink};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::payload::GenContainer;
use crate::scheduler::VirtualTime;

/// The fixed column set of every log row.
pub const COLUMNS: [&str; 7] = [
    "time",
    "component_id",
    "component_type",
    "action",
    "values",
    "PDV",
    "addition",
];

/// One structured log row.
///
/// `values` and `addition` are open key/value maps; `pdv` is the token
/// container at the moment of logging (the process data view).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LogRow {
    pub time: VirtualTime,
    pub component_id: String,
    pub component_type: String,
    pub action: String,
    pub values: Value,
    #[serde(rename = "PDV")]
    pub pdv: Option<GenContainer>,
    pub addition: Option<Value>,
}

/// Thread-safe append-only front over the configured sinks.
pub struct EventLog {
    sinks: Mutex<Vec<Box<dyn RowSink>>>,
}

impl Default for EventLog {
    fn default() -> Self {
        Self::with_sinks(Vec::new())
    }
}

impl EventLog {
    pub fn with_sink<T: RowSink + 'static>(sink: T) -> Self {
        Self::with_sinks(vec![Box::new(sink)])
    }

    pub fn with_sinks(sinks: Vec<Box<dyn RowSink>>) -> Self {
        Self {
            sinks: Mutex::new(sinks),
        }
    }

    pub fn add_sink<T: RowSink + 'static>(&self, sink: T) {
        self.add_boxed_sink(Box::new(sink));
    }

    pub fn add_boxed_sink(&self, sink: Box<dyn RowSink>) {
        self.sinks.lock().push(sink);
    }

    /// Append one row to every sink.
    ///
    /// Sink failures are reported via `tracing` and swallowed: a broken
    /// output must not abort the simulation.
    pub fn log_event(&self, row: &LogRow) {
        let mut sinks = self.sinks.lock();
        for sink in sinks.iter_mut() {
            if let Err(err) = sink.handle(row) {
                tracing::error!(
                    target: "simflow::log",
                    sink = %sink.name(),
                    error = %err,
                    "log sink write failed"
                );
            }
        }
    }

    /// Flush buffered output on every sink.
    pub fn flush(&self) {
        let mut sinks = self.sinks.lock();
        for sink in sinks.iter_mut() {
            if let Err(err) = sink.flush() {
                tracing::error!(
                    target: "simflow::log",
                    sink = %sink.name(),
                    error = %err,
                    "log sink flush failed"
                );
            }
        }
    }

    /// Flush and close every sink. Idempotent; also runs at drop.
    pub fn close(&self) {
        let mut sinks = self.sinks.lock();
        for sink in sinks.iter_mut() {
            if let Err(err) = sink.close() {
                tracing::error!(
                    target: "simflow::log",
                    sink = %sink.name(),
                    error = %err,
                    "log sink close failed"
                );
            }
        }
    }
}

impl Drop for EventLog {
    fn drop(&mut self) {
        self.close();
    }
}
