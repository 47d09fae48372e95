use std::collections::BTreeMap;

use chrono::{NaiveDateTime, Utc};
use serde_json::{Value, json};

use crate::timefmt::truncate_to_micros;

/// Snapshot of the inbound HTTP request, supplied by the integrating
/// application. All fields are optional; canonical URL construction falls
/// back to sane defaults when proxy or server fields are missing.
#[derive(Debug, Clone, Default)]
pub struct RequestInfo {
    pub remote_addr: Option<String>,
    pub user_agent: Option<String>,
    pub referer: Option<String>,
    pub scheme: Option<String>,
    pub host: Option<String>,
    pub server_name: Option<String>,
    pub request_uri: Option<String>,
    pub headers: BTreeMap<String, String>,
    /// When the request was received. Defaults to the current time.
    pub time: Option<NaiveDateTime>,
}

impl RequestInfo {
    /// scheme + host + path for the current request.
    pub fn canonical_url(&self) -> String {
        let scheme = self.scheme.as_deref().unwrap_or("http");
        let host = self
            .host
            .as_deref()
            .or(self.server_name.as_deref())
            .unwrap_or("localhost");
        let uri = self.request_uri.as_deref().unwrap_or("/");
        format!("{scheme}://{host}{uri}")
    }

    /// Request time truncated to microsecond precision, so the in-memory
    /// instant round-trips exactly through the session-store text format.
    pub(crate) fn timestamp(&self) -> NaiveDateTime {
        truncate_to_micros(self.time.unwrap_or_else(|| Utc::now().naive_utc()))
    }

    /// Header map as stored in the session. The scoring server requires a
    /// non-empty value, so an empty map is sent as `[""]`.
    pub(crate) fn headers_value(&self) -> Value {
        if self.headers.is_empty() {
            json!([""])
        } else {
            json!(self.headers)
        }
    }
}
