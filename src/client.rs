use std::time::Duration;

use serde_json::Value;
use tracing::{debug, info};
use url::Url;

use crate::error::FormGuardError;

const SUBMIT_TIMEOUT_SECS: u64 = 10;

/// Blocking client for the remote scoring service. One POST per submission,
/// no redirects, no retries; retry policy belongs to the caller.
#[derive(Debug, Clone)]
pub struct ScoringClient {
    endpoint: String,
}

impl ScoringClient {
    pub fn new(endpoint: impl Into<String>) -> Result<Self, FormGuardError> {
        let endpoint = endpoint.into();
        Url::parse(&endpoint)
            .map_err(|err| FormGuardError::Config(format!("invalid server url {endpoint:?}: {err}")))?;
        Ok(Self { endpoint })
    }

    /// Delivers one submission report. Success means the response body is
    /// JSON containing a `success` key; anything else is an error.
    pub fn submit(&self, report: &Value) -> Result<(), FormGuardError> {
        let agent = ureq::AgentBuilder::new()
            .timeout_connect(Duration::from_secs(SUBMIT_TIMEOUT_SECS))
            .timeout_read(Duration::from_secs(SUBMIT_TIMEOUT_SECS))
            .timeout_write(Duration::from_secs(SUBMIT_TIMEOUT_SECS))
            .redirects(0)
            .build();

        let response = agent
            .post(&self.endpoint)
            .set("x-requested-with", "XMLHttpRequest")
            .send_json(report.clone());

        match response {
            Ok(resp) => {
                let body: Value = resp
                    .into_json()
                    .map_err(|err| FormGuardError::transport_caused("unreadable response body", err))?;
                debug!(%body, "scoring service response");
                interpret_response(&body)
            }
            Err(ureq::Error::Status(code, resp)) => {
                let text = resp.into_string().unwrap_or_default();
                info!(code, "scoring service returned error status");
                Err(FormGuardError::transport(format!("status {code}: {text}")))
            }
            Err(err) => Err(FormGuardError::transport_caused("request failed", err)),
        }
    }
}

/// A response is accepted only when it carries a `success` key; otherwise
/// the service's `errors` messages (or a placeholder) become the rejection.
pub(crate) fn interpret_response(body: &Value) -> Result<(), FormGuardError> {
    if body.get("success").is_some() {
        return Ok(());
    }

    let messages = body
        .get("errors")
        .and_then(Value::as_array)
        .map(|errors| {
            errors
                .iter()
                .map(|e| e.as_str().map(str::to_string).unwrap_or_else(|| e.to_string()))
                .collect::<Vec<_>>()
                .join("\n")
        })
        .filter(|joined| !joined.is_empty())
        .unwrap_or_else(|| "unsuccessful, but no errors specified".to_string());

    Err(FormGuardError::Rejected(messages))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn rejects_bad_endpoint_at_setup() {
        assert!(matches!(
            ScoringClient::new("not a url"),
            Err(FormGuardError::Config(_))
        ));
        assert!(ScoringClient::new("https://score.example/api").is_ok());
    }

    #[test]
    fn success_key_is_accepted_regardless_of_value() {
        assert!(interpret_response(&json!({"success": true})).is_ok());
        assert!(interpret_response(&json!({"success": false})).is_ok());
        assert!(interpret_response(&json!({"success": null})).is_ok());
    }

    #[test]
    fn missing_success_key_is_rejected_with_messages() {
        let err = interpret_response(&json!({"errors": ["bad auth", "unknown site"]}));
        match err {
            Err(FormGuardError::Rejected(messages)) => {
                assert_eq!(messages, "bad auth\nunknown site");
            }
            other => panic!("expected rejection, got {other:?}"),
        }
    }

    #[test]
    fn missing_success_and_errors_gets_placeholder() {
        let err = interpret_response(&json!({}));
        match err {
            Err(FormGuardError::Rejected(messages)) => {
                assert_eq!(messages, "unsuccessful, but no errors specified");
            }
            other => panic!("expected rejection, got {other:?}"),
        }
    }
}
