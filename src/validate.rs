use chrono::NaiveDateTime;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::challenge::challenge_for;
use crate::timefmt::{date_diff, parse_timestamp};
use crate::track::Visit;

/// Trust signals computed for one form submission. Never cached; every
/// submission is evaluated fresh against current session state.
#[derive(Debug, Clone, PartialEq)]
pub struct SubmissionVerdict {
    pub duration_seconds: f64,
    pub honeypot_failed: bool,
    pub submit_source: Option<String>,
}

/// Reconciles a submission against the recorded visit sequence.
///
/// The record named by the echoed sequence-id field is preferred; when it is
/// missing or unparsable the page immediately prior to the current visit is
/// used instead. If neither resolves to a timestamp the verdict is a
/// guaranteed failure (`duration = -1.0`, honeypot failed) rather than an
/// error, so omitting the sequence id never becomes a bypass.
pub fn evaluate_submission(
    fields: &Map<String, Value>,
    sequence: &[Value],
    honeypot_field: &str,
    sequence_field: &str,
    current: Visit,
    submit_source: Option<&str>,
) -> SubmissionVerdict {
    let claimed = fields.get(sequence_field).and_then(value_as_index);

    let then = claimed
        .and_then(|id| entry_time(sequence, id))
        .or_else(|| {
            debug!(?claimed, "sequence id did not resolve, trying prior visit");
            current
                .index
                .checked_sub(1)
                .and_then(|prior| entry_time(sequence, prior))
        });

    let Some(then) = then else {
        warn!("no resolvable visit record for submission, forcing failed verdict");
        return SubmissionVerdict {
            duration_seconds: -1.0,
            honeypot_failed: true,
            submit_source: submit_source.map(str::to_string),
        };
    };

    let duration_seconds = date_diff(current.time, then);

    // The field must be present and hold the exact decimal string of the
    // expected sum. No numeric coercion: "010" or "10 " count as failures.
    let (first, second) = challenge_for(then);
    let expected = (first + second).to_string();
    let honeypot_failed = match fields.get(honeypot_field) {
        Some(Value::String(answer)) => *answer != expected,
        _ => true,
    };

    SubmissionVerdict {
        duration_seconds,
        honeypot_failed,
        submit_source: submit_source.map(str::to_string),
    }
}

/// Timestamp of the sequence record at `index`, if the record is well
/// formed. The null sentinel at index 0 never resolves.
fn entry_time(sequence: &[Value], index: usize) -> Option<NaiveDateTime> {
    parse_timestamp(sequence.get(index)?.get("time")?.as_str()?)
}

fn value_as_index(value: &Value) -> Option<usize> {
    match value {
        Value::Number(n) => n.as_u64().map(|n| n as usize),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use serde_json::json;

    fn at(s: u32, micro: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_micro_opt(0, 0, s, micro)
            .unwrap()
    }

    fn sequence_with_visit() -> Vec<Value> {
        vec![
            Value::Null,
            json!({"time": "2024-01-01 00:00:10.000010", "url": "http://example.com/form"}),
        ]
    }

    fn fields(entries: &[(&str, Value)]) -> Map<String, Value> {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn exact_answer_passes() {
        // Visit at 00:00:10.000010 yields challenge (10, 0), sum "10".
        let submitted = fields(&[
            ("age", json!("10")),
            ("form_sequence", json!("1")),
            ("email", json!("a@example.com")),
        ]);
        let verdict = evaluate_submission(
            &submitted,
            &sequence_with_visit(),
            "age",
            "form_sequence",
            Visit {
                index: 2,
                time: at(25, 0),
            },
            Some("http://example.com/form"),
        );
        assert!(!verdict.honeypot_failed);
        assert!((verdict.duration_seconds - 14.99999).abs() < 1e-6);
        assert_eq!(
            verdict.submit_source.as_deref(),
            Some("http://example.com/form")
        );
    }

    #[test]
    fn missing_honeypot_field_fails_with_normal_duration() {
        let submitted = fields(&[("form_sequence", json!("1"))]);
        let verdict = evaluate_submission(
            &submitted,
            &sequence_with_visit(),
            "age",
            "form_sequence",
            Visit {
                index: 2,
                time: at(25, 10),
            },
            None,
        );
        assert!(verdict.honeypot_failed);
        assert!((verdict.duration_seconds - 15.0).abs() < 1e-9);
    }

    #[test]
    fn inexact_strings_fail() {
        for answer in ["010", "10 ", " 10", "ten", "", "10.0"] {
            let submitted = fields(&[
                ("age", json!(answer)),
                ("form_sequence", json!("1")),
            ]);
            let verdict = evaluate_submission(
                &submitted,
                &sequence_with_visit(),
                "age",
                "form_sequence",
                Visit {
                    index: 2,
                    time: at(25, 0),
                },
                None,
            );
            assert!(verdict.honeypot_failed, "answer {answer:?} should fail");
        }
    }

    #[test]
    fn non_string_honeypot_value_fails() {
        let submitted = fields(&[("age", json!(10)), ("form_sequence", json!("1"))]);
        let verdict = evaluate_submission(
            &submitted,
            &sequence_with_visit(),
            "age",
            "form_sequence",
            Visit {
                index: 2,
                time: at(25, 0),
            },
            None,
        );
        assert!(verdict.honeypot_failed);
    }

    #[test]
    fn bad_sequence_id_falls_back_to_prior_visit() {
        let submitted = fields(&[("age", json!("10")), ("form_sequence", json!("999"))]);
        let verdict = evaluate_submission(
            &submitted,
            &sequence_with_visit(),
            "age",
            "form_sequence",
            Visit {
                index: 2,
                time: at(25, 0),
            },
            None,
        );
        // Record 1 is the visit prior to index 2, so validation still works.
        assert!(!verdict.honeypot_failed);
    }

    #[test]
    fn missing_sequence_id_uses_prior_visit() {
        let submitted = fields(&[("age", json!("10"))]);
        let verdict = evaluate_submission(
            &submitted,
            &sequence_with_visit(),
            "age",
            "form_sequence",
            Visit {
                index: 2,
                time: at(25, 0),
            },
            None,
        );
        assert!(!verdict.honeypot_failed);
    }

    #[test]
    fn unresolvable_lookup_hard_fails() {
        // Sequence id points nowhere and the prior index is the sentinel.
        let submitted = fields(&[("age", json!("10")), ("form_sequence", json!("42"))]);
        let verdict = evaluate_submission(
            &submitted,
            &[Value::Null],
            "age",
            "form_sequence",
            Visit {
                index: 1,
                time: at(25, 0),
            },
            None,
        );
        assert_eq!(verdict.duration_seconds, -1.0);
        assert!(verdict.honeypot_failed);
    }

    #[test]
    fn sentinel_is_never_a_valid_lookup() {
        let submitted = fields(&[("age", json!("10")), ("form_sequence", json!("0"))]);
        let verdict = evaluate_submission(
            &submitted,
            &[Value::Null],
            "age",
            "form_sequence",
            Visit {
                index: 1,
                time: at(25, 0),
            },
            None,
        );
        assert_eq!(verdict.duration_seconds, -1.0);
        assert!(verdict.honeypot_failed);
    }
}
