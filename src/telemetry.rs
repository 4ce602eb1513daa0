//! Diagnostics wiring and row rendering for human-facing sinks.

use tracing_subscriber::EnvFilter;

use crate::log::LogRow;

pub const TIME_COLOR: &str = "\x1b[32m"; // green
pub const LINE_COLOR: &str = "\x1b[35m"; // magenta
pub const RESET_COLOR: &str = "\x1b[0m";

/// Install the default `tracing` subscriber for demos and host programs.
///
/// Respects `RUST_LOG`; repeated calls are harmless.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init();
}

/// Renders a log row into text a human-facing sink can write.
pub trait RowFormatter: Send + Sync {
    fn render_row(&self, row: &LogRow) -> String;
}

/// Single-line rendering: `[t=3] comp-id GENERATE {..}`.
pub struct PlainFormatter;

impl RowFormatter for PlainFormatter {
    fn render_row(&self, row: &LogRow) -> String {
        let pdv = match &row.pdv {
            Some(container) => format!(" pdv#{}", container.container_id),
            None => String::new(),
        };
        format!(
            "{TIME_COLOR}[t={}]{RESET_COLOR} {LINE_COLOR}{} {} {}{pdv}{RESET_COLOR}\n",
            row.time, row.component_id, row.action, row.values
        )
    }
}
