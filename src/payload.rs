use serde::Serialize;
use serde_json::{Map, Value, json};

use crate::session::{SessionStore, prefixed};
use crate::validate::SubmissionVerdict;

/// Client credentials for the scoring service.
#[derive(Debug, Clone, Serialize)]
pub struct Auth {
    pub id: String,
    pub secret: String,
}

/// Hard cap on how many sequence records are forwarded with a submission.
const MAX_DETAILS: usize = 999;

/// Builds the outbound submission report.
///
/// The honeypot and sequence-id fields are internal signals and are stripped
/// from the forwarded field map. Sequence details are filtered to well-formed
/// records (both `time` and `url` present), so the sentinel placeholder never
/// leaks into the report.
pub fn build_report(
    auth: &Auth,
    session: &dyn SessionStore,
    prefix: &str,
    verdict: &SubmissionVerdict,
    website: &str,
    form_title: &str,
    fields: &Map<String, Value>,
    honeypot_field: &str,
    sequence_field: &str,
) -> Value {
    let mut cleaned = fields.clone();
    cleaned.remove(honeypot_field);
    cleaned.remove(sequence_field);

    let get = |field: &str| session.get(&prefixed(prefix, field), Value::Null);

    let details: Vec<Value> = session
        .get(&prefixed(prefix, "sequence"), json!([null]))
        .as_array()
        .map(|entries| {
            entries
                .iter()
                .filter(|entry| is_well_formed(entry))
                .take(MAX_DETAILS)
                .cloned()
                .collect()
        })
        .unwrap_or_default();

    json!({
        "auth": auth,
        "fields": Value::Object(cleaned),
        "meta": {
            "ip_address": get("ip_address"),
            "user_agent": get("user_agent"),
            "http_headers": get("http_headers"),
            "honeypot": verdict.honeypot_failed,
            "duration": verdict.duration_seconds,
        },
        "source": {
            "website": website,
            "title": form_title,
        },
        "links": {
            "referral": get("referral"),
            "landing": get("landing"),
            "submit": verdict.submit_source,
            "details": details,
        },
    })
}

fn is_well_formed(entry: &Value) -> bool {
    entry.get("time").is_some() && entry.get("url").is_some()
}
