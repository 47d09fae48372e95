use chrono::NaiveDateTime;
use serde_json::{Value, json};
use tracing::debug;

use crate::request::RequestInfo;
use crate::session::{SessionStore, prefixed};
use crate::timefmt::{date_diff, format_timestamp, parse_timestamp};

/// Repeat referral-based requests within this many seconds are considered
/// duplicates of the previous page view.
pub const DEFAULT_REFERRAL_REPEAT: f64 = 15.0;

/// The page view resolved for the current request: its position in the
/// session's sequence and the instant it was recorded.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Visit {
    pub index: usize,
    pub time: NaiveDateTime,
}

/// Records the ordered, session-scoped history of page visits.
#[derive(Debug, Clone)]
pub struct SequenceTracker {
    repeat_window: f64,
}

impl Default for SequenceTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl SequenceTracker {
    pub fn new() -> Self {
        Self {
            repeat_window: DEFAULT_REFERRAL_REPEAT,
        }
    }

    /// Overrides the duplicate-referral collapse window.
    pub fn with_repeat_window(seconds: f64) -> Self {
        Self {
            repeat_window: seconds,
        }
    }

    /// Records a page view and returns the visit to associate with this
    /// request.
    ///
    /// With `use_referral` set (instrumenting a non-page resource such as a
    /// script or image), the referring page is tracked instead of the
    /// resource itself, and a repeat request for the same referrer within
    /// the collapse window reuses the previous record rather than inflating
    /// the sequence. Session metadata (ip, user agent, headers, referral,
    /// landing) is populated first-write-wins as a side effect.
    pub fn record_visit(
        &self,
        session: &mut dyn SessionStore,
        prefix: &str,
        request: &RequestInfo,
        use_referral: bool,
    ) -> Visit {
        let now = request.timestamp();

        store_meta(session, prefix, request, use_referral);

        let key = prefixed(prefix, "sequence");
        // Sequence starts with a null sentinel so all real ids are positive.
        let mut list = match session.get(&key, json!([null])) {
            Value::Array(entries) if !entries.is_empty() => entries,
            _ => vec![Value::Null],
        };

        if use_referral {
            if let Some(last) = last_matching_referral(&list, request) {
                if date_diff(now, last) < self.repeat_window {
                    debug!(
                        index = list.len() - 1,
                        "repeat referral request, reusing previous visit"
                    );
                    return Visit {
                        index: list.len() - 1,
                        time: last,
                    };
                }
            }
        }

        let url = if use_referral {
            // Track the referring page when instructed and available.
            request
                .referer
                .clone()
                .unwrap_or_else(|| request.canonical_url())
        } else {
            request.canonical_url()
        };

        let index = list.len();
        list.push(json!({
            "time": format_timestamp(now),
            "url": url,
        }));
        session.put(&key, Value::Array(list));

        debug!(index, "recorded page visit");
        Visit { index, time: now }
    }
}

/// Timestamp of the last sequence record, if it is well formed and its URL
/// matches the current request's referrer.
fn last_matching_referral(list: &[Value], request: &RequestInfo) -> Option<NaiveDateTime> {
    let referer = request.referer.as_deref()?;
    let last = list.last()?;
    if last.get("url")?.as_str()? != referer {
        return None;
    }
    parse_timestamp(last.get("time")?.as_str()?)
}

fn store_meta(session: &mut dyn SessionStore, prefix: &str, request: &RequestInfo, use_referral: bool) {
    let put_once = |session: &mut dyn SessionStore, field: &str, value: Value| {
        let key = prefixed(prefix, field);
        if !session.exists(&key) {
            session.put(&key, value);
        }
    };

    put_once(session, "ip_address", json_opt(&request.remote_addr));
    put_once(session, "user_agent", json_opt(&request.user_agent));
    put_once(session, "http_headers", request.headers_value());

    if use_referral {
        // The true first page failed to log; track the landing page as best
        // we can from the referrer.
        put_once(session, "referral", Value::Null);
        put_once(session, "landing", json_opt(&request.referer));
    } else {
        put_once(session, "referral", json_opt(&request.referer));
        put_once(session, "landing", Value::String(request.canonical_url()));
    }
}

fn json_opt(value: &Option<String>) -> Value {
    match value {
        Some(text) => Value::String(text.clone()),
        None => Value::Null,
    }
}
