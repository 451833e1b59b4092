//! Well-known access-log field names used by the request collector.
//!
//! Header-derived fields carry the `request_` prefix followed by the
//! canonical header name.

pub const CLIENT_HOST: &str = "ClientHost";
pub const START_UTC: &str = "StartUTC";
pub const DURATION: &str = "Duration";
pub const REQUEST_METHOD: &str = "RequestMethod";
pub const REQUEST_PATH: &str = "RequestPath";
pub const REQUEST_PROTOCOL: &str = "RequestProtocol";
pub const ORIGIN_STATUS: &str = "OriginStatus";
pub const ORIGIN_CONTENT_SIZE: &str = "OriginContentSize";
pub const REQUEST_REFERER: &str = "request_Referer";
pub const REQUEST_USER_AGENT: &str = "request_User-Agent";
pub const REQUEST_COUNT: &str = "RequestCount";
pub const FRONTEND_NAME: &str = "FrontendName";
pub const BACKEND_URL: &str = "BackendURL";
pub const REQUEST_AUTHORIZATION: &str = "request_Authorization";
