use crate::common_log::CommonLogFormatter;
use crate::json_log::JsonLogFormatter;
use serde_json::{Map, Value};
use tollgate_core::{FormattingError, LogFormat, LogRecord};

/// Turns one finished request into one newline-terminated access-log line.
///
/// Implementations are stateless and safe to share across request workers.
pub trait LogFormatter: Send + Sync {
    fn format(&self, record: &LogRecord) -> Result<Vec<u8>, FormattingError>;

    /// Format the collector's key/value shape.
    ///
    /// Fails when `StartUTC` or `Duration` is missing or mistyped.
    fn format_fields(&self, fields: &Map<String, Value>) -> Result<Vec<u8>, FormattingError> {
        let record = LogRecord::from_fields(fields)?;
        self.format(&record)
    }
}

/// Formatter for the configured output format.
pub fn formatter_for(format: LogFormat) -> Box<dyn LogFormatter> {
    match format {
        LogFormat::Common => Box::new(CommonLogFormatter::new()),
        LogFormat::Json => Box::new(JsonLogFormatter::new()),
    }
}
