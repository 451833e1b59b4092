//! One JSON object per line, keyed by the collector's field names.

use crate::formatter::LogFormatter;
use crate::jwt_subject::parse_subject;
use chrono::SecondsFormat;
use serde::Serialize;
use tollgate_core::{FormattingError, LogRecord};

#[derive(Debug, Clone, Copy, Default)]
pub struct JsonLogFormatter;

/// Serialized shape. The raw authorization header is deliberately absent.
#[derive(Debug, Serialize)]
struct JsonEntry<'a> {
    #[serde(rename = "ClientHost", skip_serializing_if = "Option::is_none")]
    client_host: Option<&'a str>,
    #[serde(rename = "StartUTC")]
    start_utc: String,
    /// Nanoseconds.
    #[serde(rename = "Duration")]
    duration: u128,
    #[serde(rename = "RequestMethod", skip_serializing_if = "Option::is_none")]
    request_method: Option<&'a str>,
    #[serde(rename = "RequestPath", skip_serializing_if = "Option::is_none")]
    request_path: Option<&'a str>,
    #[serde(rename = "RequestProtocol", skip_serializing_if = "Option::is_none")]
    request_protocol: Option<&'a str>,
    #[serde(rename = "OriginStatus", skip_serializing_if = "Option::is_none")]
    origin_status: Option<u16>,
    #[serde(rename = "OriginContentSize", skip_serializing_if = "Option::is_none")]
    origin_content_size: Option<u64>,
    #[serde(rename = "request_Referer", skip_serializing_if = "Option::is_none")]
    request_referer: Option<&'a str>,
    #[serde(rename = "request_User-Agent", skip_serializing_if = "Option::is_none")]
    request_user_agent: Option<&'a str>,
    #[serde(rename = "RequestCount", skip_serializing_if = "Option::is_none")]
    request_count: Option<u64>,
    #[serde(rename = "FrontendName", skip_serializing_if = "Option::is_none")]
    frontend_name: Option<&'a str>,
    #[serde(rename = "BackendURL", skip_serializing_if = "Option::is_none")]
    backend_url: Option<&'a str>,
    #[serde(rename = "RequestSubject", skip_serializing_if = "Option::is_none")]
    request_subject: Option<String>,
}

impl JsonLogFormatter {
    pub fn new() -> Self {
        Self
    }
}

impl LogFormatter for JsonLogFormatter {
    fn format(&self, record: &LogRecord) -> Result<Vec<u8>, FormattingError> {
        let request_subject = record
            .authorization
            .as_deref()
            .map(parse_subject)
            .filter(|s| !s.is_empty());

        let entry = JsonEntry {
            client_host: record.client_host.as_deref(),
            start_utc: record.start_utc.to_rfc3339_opts(SecondsFormat::AutoSi, true),
            duration: record.duration.as_nanos(),
            request_method: record.request_method.as_deref(),
            request_path: record.request_path.as_deref(),
            request_protocol: record.request_protocol.as_deref(),
            origin_status: record.origin_status,
            origin_content_size: record.origin_content_size,
            request_referer: record.request_referer.as_deref(),
            request_user_agent: record.request_user_agent.as_deref(),
            request_count: record.request_count,
            frontend_name: record.frontend_name.as_deref(),
            backend_url: record.backend_url.as_deref(),
            request_subject,
        };

        let mut buf = serde_json::to_vec(&entry)?;
        buf.push(b'\n');
        Ok(buf)
    }
}
