pub mod config;
pub mod error;
pub mod fields;
pub mod record;

pub use config::{AccessLogConfig, LogFormat, TollgateConfig};
pub use error::FormattingError;
pub use record::{LogRecord, LogValue};
