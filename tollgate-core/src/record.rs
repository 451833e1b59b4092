use crate::error::FormattingError;
use crate::fields;
use chrono::{DateTime, FixedOffset};
use serde_json::{Map, Value};
use std::time::Duration;

/// One completed request/response exchange, as handed over by the collector.
///
/// `start_utc` and `duration` are always present. Every other field may be
/// missing and renders as a default token in the access log.
#[derive(Debug, Clone, PartialEq)]
pub struct LogRecord {
    pub start_utc: DateTime<FixedOffset>,
    pub duration: Duration,
    pub client_host: Option<String>,
    pub request_method: Option<String>,
    pub request_path: Option<String>,
    pub request_protocol: Option<String>,
    pub origin_status: Option<u16>,
    pub origin_content_size: Option<u64>,
    pub request_referer: Option<String>,
    pub request_user_agent: Option<String>,
    pub request_count: Option<u64>,
    pub frontend_name: Option<String>,
    pub backend_url: Option<String>,
    /// Raw `Authorization` header value.
    pub authorization: Option<String>,
}

/// Render-time value of an optional access-log field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogValue<'a> {
    Integer(u64),
    Text(&'a str),
    Absent,
}

impl<'a> LogValue<'a> {
    pub fn text(value: Option<&'a str>) -> Self {
        value.map_or(LogValue::Absent, LogValue::Text)
    }

    pub fn integer(value: Option<u64>) -> Self {
        value.map_or(LogValue::Absent, LogValue::Integer)
    }
}

impl LogRecord {
    /// Record with only the required fields set.
    pub fn new(start_utc: DateTime<FixedOffset>, duration: Duration) -> Self {
        Self {
            start_utc,
            duration,
            client_host: None,
            request_method: None,
            request_path: None,
            request_protocol: None,
            origin_status: None,
            origin_content_size: None,
            request_referer: None,
            request_user_agent: None,
            request_count: None,
            frontend_name: None,
            backend_url: None,
            authorization: None,
        }
    }

    /// Whole milliseconds elapsed, truncated toward zero.
    pub fn elapsed_millis(&self) -> u128 {
        self.duration.as_nanos() / 1_000_000
    }

    pub fn origin_status(&self) -> LogValue<'_> {
        LogValue::integer(self.origin_status.map(u64::from))
    }

    pub fn origin_content_size(&self) -> LogValue<'_> {
        LogValue::integer(self.origin_content_size)
    }

    pub fn request_referer(&self) -> LogValue<'_> {
        LogValue::text(self.request_referer.as_deref())
    }

    pub fn request_user_agent(&self) -> LogValue<'_> {
        LogValue::text(self.request_user_agent.as_deref())
    }

    pub fn request_count(&self) -> LogValue<'_> {
        LogValue::integer(self.request_count)
    }

    pub fn frontend_name(&self) -> LogValue<'_> {
        LogValue::text(self.frontend_name.as_deref())
    }

    pub fn backend_url(&self) -> LogValue<'_> {
        LogValue::text(self.backend_url.as_deref())
    }

    /// Build a record from the collector's key/value shape.
    ///
    /// Missing or mistyped `StartUTC` / `Duration` is a collector bug and is
    /// reported. Optional fields with an unexpected JSON type are dropped.
    pub fn from_fields(map: &Map<String, Value>) -> Result<Self, FormattingError> {
        let start_utc = match map.get(fields::START_UTC) {
            None | Some(Value::Null) => return Err(FormattingError::MissingField(fields::START_UTC)),
            Some(Value::String(s)) => {
                DateTime::parse_from_rfc3339(s).map_err(|e| FormattingError::InvalidField {
                    field: fields::START_UTC,
                    reason: e.to_string(),
                })?
            }
            Some(other) => {
                return Err(FormattingError::InvalidField {
                    field: fields::START_UTC,
                    reason: format!("expected RFC 3339 string, got {}", json_type(other)),
                });
            }
        };

        let duration = match map.get(fields::DURATION) {
            None | Some(Value::Null) => return Err(FormattingError::MissingField(fields::DURATION)),
            Some(value) => value.as_u64().map(Duration::from_nanos).ok_or_else(|| {
                FormattingError::InvalidField {
                    field: fields::DURATION,
                    reason: format!(
                        "expected non-negative integer nanoseconds, got {}",
                        json_type(value)
                    ),
                }
            })?,
        };

        let text = |key: &str| map.get(key).and_then(Value::as_str).map(str::to_owned);
        let integer = |key: &str| map.get(key).and_then(Value::as_u64);

        Ok(Self {
            start_utc,
            duration,
            client_host: text(fields::CLIENT_HOST),
            request_method: text(fields::REQUEST_METHOD),
            request_path: text(fields::REQUEST_PATH),
            request_protocol: text(fields::REQUEST_PROTOCOL),
            origin_status: integer(fields::ORIGIN_STATUS).and_then(|n| u16::try_from(n).ok()),
            origin_content_size: integer(fields::ORIGIN_CONTENT_SIZE),
            request_referer: text(fields::REQUEST_REFERER),
            request_user_agent: text(fields::REQUEST_USER_AGENT),
            request_count: integer(fields::REQUEST_COUNT),
            frontend_name: text(fields::FRONTEND_NAME),
            backend_url: text(fields::BACKEND_URL),
            authorization: text(fields::REQUEST_AUTHORIZATION),
        })
    }

    /// Parse one JSON-lines entry.
    pub fn from_json_line(line: &str) -> Result<Self, FormattingError> {
        match serde_json::from_str::<Value>(line) {
            Ok(Value::Object(map)) => Self::from_fields(&map),
            Ok(other) => Err(FormattingError::MalformedRecord(format!(
                "expected a JSON object, got {}",
                json_type(&other)
            ))),
            Err(e) => Err(FormattingError::MalformedRecord(e.to_string())),
        }
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn object(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn elapsed_millis_truncates() {
        let start = DateTime::parse_from_rfc3339("2024-06-10T13:45:02+00:00").unwrap();
        let record = LogRecord::new(start, Duration::from_nanos(1_999_999));
        assert_eq!(record.elapsed_millis(), 1);
    }

    #[test]
    fn from_fields_reads_all_known_keys() {
        let map = object(json!({
            "ClientHost": "10.0.0.1",
            "StartUTC": "2024-06-10T13:45:02Z",
            "Duration": 250_000_000u64,
            "RequestMethod": "GET",
            "RequestPath": "/health",
            "RequestProtocol": "HTTP/1.1",
            "OriginStatus": 200,
            "OriginContentSize": 12,
            "request_Referer": "https://example.com/",
            "request_User-Agent": "curl/8.0",
            "RequestCount": 7,
            "FrontendName": "web",
            "BackendURL": "http://10.0.0.2:80",
            "request_Authorization": "JWT a.b.c",
        }));

        let record = LogRecord::from_fields(&map).unwrap();
        assert_eq!(record.client_host.as_deref(), Some("10.0.0.1"));
        assert_eq!(record.duration, Duration::from_millis(250));
        assert_eq!(record.request_method.as_deref(), Some("GET"));
        assert_eq!(record.origin_status, Some(200));
        assert_eq!(record.origin_content_size, Some(12));
        assert_eq!(record.request_user_agent.as_deref(), Some("curl/8.0"));
        assert_eq!(record.request_count, Some(7));
        assert_eq!(record.backend_url.as_deref(), Some("http://10.0.0.2:80"));
        assert_eq!(record.authorization.as_deref(), Some("JWT a.b.c"));
    }

    #[test]
    fn from_fields_missing_start_is_error() {
        let map = object(json!({ "Duration": 1 }));
        let err = LogRecord::from_fields(&map).unwrap_err();
        assert!(matches!(err, FormattingError::MissingField("StartUTC")));
    }

    #[test]
    fn from_fields_missing_duration_is_error() {
        let map = object(json!({ "StartUTC": "2024-06-10T13:45:02Z", "Duration": null }));
        let err = LogRecord::from_fields(&map).unwrap_err();
        assert_eq!(err.field(), Some("Duration"));
    }

    #[test]
    fn from_fields_mistyped_required_is_error() {
        let map = object(json!({ "StartUTC": 1718027102, "Duration": 1 }));
        let err = LogRecord::from_fields(&map).unwrap_err();
        assert!(matches!(err, FormattingError::InvalidField { field: "StartUTC", .. }));

        let map = object(json!({ "StartUTC": "yesterday", "Duration": 1 }));
        assert!(LogRecord::from_fields(&map).is_err());

        let map = object(json!({ "StartUTC": "2024-06-10T13:45:02Z", "Duration": -5 }));
        let err = LogRecord::from_fields(&map).unwrap_err();
        assert!(matches!(err, FormattingError::InvalidField { field: "Duration", .. }));
    }

    #[test]
    fn from_fields_drops_mistyped_optionals() {
        let map = object(json!({
            "StartUTC": "2024-06-10T13:45:02Z",
            "Duration": 1,
            "OriginStatus": "200",
            "OriginContentSize": -1,
            "FrontendName": 42,
            "RequestCount": 70000.5,
        }));
        let record = LogRecord::from_fields(&map).unwrap();
        assert_eq!(record.origin_status, None);
        assert_eq!(record.origin_content_size, None);
        assert_eq!(record.frontend_name, None);
        assert_eq!(record.request_count, None);
    }

    #[test]
    fn from_fields_drops_out_of_range_status() {
        let map = object(json!({
            "StartUTC": "2024-06-10T13:45:02Z",
            "Duration": 1,
            "OriginStatus": 70000,
        }));
        assert_eq!(LogRecord::from_fields(&map).unwrap().origin_status, None);
    }

    #[test]
    fn from_json_line_rejects_non_objects() {
        assert!(matches!(
            LogRecord::from_json_line("[1,2]"),
            Err(FormattingError::MalformedRecord(_))
        ));
        assert!(matches!(
            LogRecord::from_json_line("{not json"),
            Err(FormattingError::MalformedRecord(_))
        ));
    }

    #[test]
    fn log_value_constructors() {
        assert_eq!(LogValue::text(None), LogValue::Absent);
        assert_eq!(LogValue::text(Some("x")), LogValue::Text("x"));
        assert_eq!(LogValue::integer(Some(3)), LogValue::Integer(3));
        assert_eq!(LogValue::integer(None), LogValue::Absent);
    }
}
