//! Common log format with gateway routing fields.
//!
//! ```text
//! <client> - <subject> [<time>] "<method> <path> <proto>" <status> <size> <referer> <ua> <count> <frontend> <backend> <elapsed>ms
//! ```

use crate::formatter::LogFormatter;
use crate::jwt_subject::extract_subject;
use std::borrow::Cow;
use tollgate_core::{FormattingError, LogRecord, LogValue};

/// Placeholder for a missing value.
pub const DEFAULT_VALUE: &str = "-";

/// Placeholder for a missing value in a normally quoted slot.
pub const QUOTED_DEFAULT_VALUE: &str = "\"-\"";

/// `10/Jun/2024:13:45:02 +0000`
pub const TIMESTAMP_FORMAT: &str = "%d/%b/%Y:%H:%M:%S %z";

/// Renders records as one common-log-format line each.
#[derive(Debug, Clone, Copy, Default)]
pub struct CommonLogFormatter;

impl CommonLogFormatter {
    pub fn new() -> Self {
        Self
    }

    /// Render `record` into a fresh buffer.
    pub fn render(&self, record: &LogRecord) -> Vec<u8> {
        let mut buf = Vec::with_capacity(256);
        self.render_into(&mut buf, record);
        buf
    }

    /// Render `record` into `buf`, replacing its contents.
    pub fn render_into(&self, buf: &mut Vec<u8>, record: &LogRecord) {
        buf.clear();
        push_raw(buf, record.client_host.as_deref());
        buf.extend_from_slice(b" - ");
        let subject = extract_subject(record.authorization.as_deref(), DEFAULT_VALUE);
        buf.extend_from_slice(subject.as_bytes());
        buf.extend_from_slice(b" [");
        buf.extend_from_slice(record.start_utc.format(TIMESTAMP_FORMAT).to_string().as_bytes());
        buf.extend_from_slice(b"] \"");
        push_raw(buf, record.request_method.as_deref());
        buf.push(b' ');
        push_raw(buf, record.request_path.as_deref());
        buf.push(b' ');
        push_raw(buf, record.request_protocol.as_deref());
        buf.extend_from_slice(b"\" ");

        let slots = [
            (record.origin_status(), DEFAULT_VALUE),
            (record.origin_content_size(), DEFAULT_VALUE),
            (record.request_referer(), QUOTED_DEFAULT_VALUE),
            (record.request_user_agent(), QUOTED_DEFAULT_VALUE),
            (record.request_count(), DEFAULT_VALUE),
            (record.frontend_name(), DEFAULT_VALUE),
            (record.backend_url(), DEFAULT_VALUE),
        ];
        for (value, default) in slots {
            buf.extend_from_slice(to_log(value, default).as_bytes());
            buf.push(b' ');
        }

        let mut itoa_buf = itoa::Buffer::new();
        buf.extend_from_slice(itoa_buf.format(record.elapsed_millis()).as_bytes());
        buf.extend_from_slice(b"ms\n");
    }
}

impl LogFormatter for CommonLogFormatter {
    fn format(&self, record: &LogRecord) -> Result<Vec<u8>, FormattingError> {
        Ok(self.render(record))
    }
}

/// Render one optional field.
///
/// Integers print as-is, text is double-quoted, and absent or empty
/// values collapse to `default`.
pub fn to_log<'a>(value: LogValue<'a>, default: &'a str) -> Cow<'a, str> {
    match value {
        LogValue::Absent => Cow::Borrowed(default),
        LogValue::Integer(n) => Cow::Owned(itoa::Buffer::new().format(n).to_owned()),
        LogValue::Text("") => Cow::Borrowed(default),
        LogValue::Text(s) => Cow::Owned(format!("\"{s}\"")),
    }
}

/// Verbatim value, `-` when absent.
fn push_raw(buf: &mut Vec<u8>, value: Option<&str>) {
    buf.extend_from_slice(value.unwrap_or(DEFAULT_VALUE).as_bytes());
}
