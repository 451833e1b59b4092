//! Offline renderer: JSON-lines request records in, access-log lines out.

use anyhow::Context;
use std::io::{self, BufRead, Write};
use tollgate_core::{FormattingError, LogRecord};
use tollgate_observability::{AccessFileWriter, LogFormatter};
use tracing::{debug, error};

/// Destination for formatted lines.
pub trait LineSink {
    fn write_line(&mut self, line: &[u8]) -> io::Result<()>;
    fn flush(&mut self) -> io::Result<()>;
}

/// Any byte stream (stdout, a buffer, ...).
pub struct StreamSink<W: Write>(pub W);

impl<W: Write> LineSink for StreamSink<W> {
    fn write_line(&mut self, line: &[u8]) -> io::Result<()> {
        self.0.write_all(line)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.0.flush()
    }
}

impl LineSink for AccessFileWriter {
    fn write_line(&mut self, line: &[u8]) -> io::Result<()> {
        AccessFileWriter::write_line(self, line)
    }

    fn flush(&mut self) -> io::Result<()> {
        AccessFileWriter::flush(self)
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RenderSummary {
    pub rendered: usize,
    pub skipped: usize,
}

/// Format every record in `input` and hand the lines to `sink`.
///
/// Blank lines are ignored. A record that cannot be formatted (including one
/// that is not valid UTF-8) is reported with its line number and left out
/// entirely; I/O errors abort the run.
pub fn render_lines<R: BufRead, S: LineSink + ?Sized>(
    mut input: R,
    formatter: &dyn LogFormatter,
    sink: &mut S,
) -> anyhow::Result<RenderSummary> {
    let mut summary = RenderSummary::default();
    let mut raw = Vec::with_capacity(512);
    let mut line_no = 0usize;

    loop {
        raw.clear();
        let read = input
            .read_until(b'\n', &mut raw)
            .with_context(|| format!("Failed to read input line {}", line_no + 1))?;
        if read == 0 {
            break;
        }
        line_no += 1;

        let formatted = match render_record(&raw, formatter) {
            Ok(Some(bytes)) => bytes,
            Ok(None) => continue,
            Err(e) => {
                error!(line = line_no, error = %e, "Skipping record");
                summary.skipped += 1;
                continue;
            }
        };

        sink.write_line(&formatted)
            .with_context(|| format!("Failed to write access log line for input line {line_no}"))?;
        summary.rendered += 1;
    }

    sink.flush().context("Failed to flush access log")?;
    debug!(rendered = summary.rendered, skipped = summary.skipped, "Render finished");
    Ok(summary)
}

/// Formatted line for one raw input line, `None` when the line is blank.
fn render_record(
    raw: &[u8],
    formatter: &dyn LogFormatter,
) -> Result<Option<Vec<u8>>, FormattingError> {
    let line = std::str::from_utf8(raw)
        .map_err(|e| FormattingError::MalformedRecord(format!("invalid UTF-8: {e}")))?;
    if line.trim().is_empty() {
        return Ok(None);
    }
    let record = LogRecord::from_json_line(line)?;
    formatter.format(&record).map(Some)
}
