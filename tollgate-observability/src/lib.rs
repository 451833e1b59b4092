pub mod access_file_writer;
pub mod common_log;
pub mod formatter;
pub mod json_log;
pub mod jwt_subject;

pub use access_file_writer::{AccessFileConfig, AccessFileWriter};
pub use common_log::CommonLogFormatter;
pub use formatter::{LogFormatter, formatter_for};
pub use json_log::JsonLogFormatter;
