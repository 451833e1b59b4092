use thiserror::Error;

/// Internal formatting failure.
///
/// Raised only when the collector handed over a record whose required
/// fields (`StartUTC`, `Duration`) are missing or mistyped, or when an
/// output encoder fails. Optional-field problems never surface here; they
/// render as default tokens instead.
#[derive(Error, Debug)]
pub enum FormattingError {
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Invalid field {field}: {reason}")]
    InvalidField { field: &'static str, reason: String },

    #[error("Malformed record: {0}")]
    MalformedRecord(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl FormattingError {
    /// Name of the offending field, when the error is tied to one.
    pub fn field(&self) -> Option<&'static str> {
        match self {
            FormattingError::MissingField(field) => Some(field),
            FormattingError::InvalidField { field, .. } => Some(field),
            FormattingError::MalformedRecord(_) | FormattingError::Serialization(_) => None,
        }
    }
}
