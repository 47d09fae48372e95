use serde_json::{Map, Value, json};
use tracing::info;

use crate::client::ScoringClient;
use crate::error::FormGuardError;
use crate::payload::{Auth, build_report};
use crate::render::{HoneypotStatus, challenge_script, honeypot_html};
use crate::request::RequestInfo;
use crate::session::{MemorySessionBag, SessionStore, prefixed};
use crate::track::{SequenceTracker, Visit};
use crate::validate::{SubmissionVerdict, evaluate_submission};

const DEFAULT_PREFIX: &str = "formguard_";
const DEFAULT_HONEYPOT: &str = "age";
const DEFAULT_SEQUENCE: &str = "form_sequence";
const DEFAULT_SCRIPT_SRC: &str = "/fg-pn.js";
const DEFAULT_SCRIPT_CLASS: &str = "fg-pn";

/// Per-request instrumentation instance tying the pieces together: the
/// session-backed visit tracker, challenge rendering, submission validation
/// and delivery to the scoring service.
///
/// Typical flow: construct once per request, call [`track_source`] while
/// handling the page view, render with [`generate_honeypot`], and on POST
/// call [`submit_form`].
///
/// [`track_source`]: FormGuard::track_source
/// [`generate_honeypot`]: FormGuard::generate_honeypot
/// [`submit_form`]: FormGuard::submit_form
pub struct FormGuard {
    client: ScoringClient,
    auth: Auth,
    session: Box<dyn SessionStore>,
    prefix: String,
    honeypot: String,
    sequence: String,
    script_src: String,
    script_class: String,
    tracker: SequenceTracker,
    /// Visit resolved for this request by `track_source`.
    current: Option<Visit>,
    /// Makes each rendered form instance use unique element ids.
    instance: u32,
}

impl FormGuard {
    pub fn new(
        server_url: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Result<Self, FormGuardError> {
        Ok(Self {
            client: ScoringClient::new(server_url)?,
            auth: Auth {
                id: client_id.into(),
                secret: client_secret.into(),
            },
            session: Box::new(MemorySessionBag::new()),
            prefix: DEFAULT_PREFIX.to_string(),
            honeypot: DEFAULT_HONEYPOT.to_string(),
            sequence: DEFAULT_SEQUENCE.to_string(),
            script_src: DEFAULT_SCRIPT_SRC.to_string(),
            script_class: DEFAULT_SCRIPT_CLASS.to_string(),
            tracker: SequenceTracker::new(),
            current: None,
            instance: 1,
        })
    }

    /// Swaps in the application's session store. Pass `None` for the prefix
    /// to keep the default; an empty string disables prefixing.
    pub fn set_session(&mut self, session: Box<dyn SessionStore>, prefix: Option<&str>) {
        self.session = session;
        self.prefix = prefix.unwrap_or(DEFAULT_PREFIX).to_string();
    }

    /// Overrides widget naming. `None` keeps each default. The honeypot and
    /// sequence names must be unique among the form's field names.
    pub fn set_honeypot(
        &mut self,
        honeypot: Option<&str>,
        sequence: Option<&str>,
        script_src: Option<&str>,
        script_class: Option<&str>,
    ) {
        self.honeypot = honeypot.unwrap_or(DEFAULT_HONEYPOT).to_string();
        self.sequence = sequence.unwrap_or(DEFAULT_SEQUENCE).to_string();
        self.script_src = script_src.unwrap_or(DEFAULT_SCRIPT_SRC).to_string();
        self.script_class = script_class.unwrap_or(DEFAULT_SCRIPT_CLASS).to_string();
    }

    /// Overrides the duplicate-referral collapse window.
    pub fn set_repeat_window(&mut self, seconds: f64) {
        self.tracker = SequenceTracker::with_repeat_window(seconds);
    }

    /// Records this request as a page visit. Call once per request; set
    /// `use_referral` when serving a non-page resource (script or image) so
    /// the referring page is tracked instead.
    pub fn track_source(&mut self, request: &RequestInfo, use_referral: bool) {
        let visit =
            self.tracker
                .record_visit(self.session.as_mut(), &self.prefix, request, use_referral);
        self.current = Some(visit);
    }

    /// Plain values for custom honeypot markup. Increments the per-render
    /// instance counter unless told otherwise.
    pub fn status(&mut self, increment: bool) -> HoneypotStatus {
        let visit = self.current_visit();
        let index = self.instance;
        if increment {
            self.instance += 1;
        }

        HoneypotStatus {
            honeypot: self.honeypot.clone(),
            instance: index,
            math: crate::challenge::challenge_for(visit.time),
            script_class: self.script_class.clone(),
            script_src: self.script_src.clone(),
            sequence: self.sequence.clone(),
            seq_id: visit.index,
        }
    }

    /// HTML chunk to insert into a form, once per form. Set `skip_script`
    /// when the challenge script is already included at the page bottom.
    pub fn generate_honeypot(&mut self, skip_script: bool) -> String {
        let status = self.status(true);
        honeypot_html(&status, skip_script)
    }

    /// JavaScript body to serve from the configured `script_src` location.
    pub fn generate_script(&self) -> String {
        challenge_script(&self.script_class)
    }

    /// Computes the verdict for a submission, builds the report, and
    /// delivers it to the scoring service.
    pub fn submit_form(
        &mut self,
        website: &str,
        form_title: &str,
        fields: &Map<String, Value>,
        request: &RequestInfo,
    ) -> Result<(), FormGuardError> {
        let (report, verdict) = self.build_submission(website, form_title, fields, request);

        info!(
            website,
            form_title,
            duration = verdict.duration_seconds,
            honeypot_failed = verdict.honeypot_failed,
            "submitting form report"
        );

        self.client.submit(&report)?;
        info!("scoring service accepted submission");
        Ok(())
    }

    /// Verdict plus assembled report, without the outbound call.
    pub(crate) fn build_submission(
        &self,
        website: &str,
        form_title: &str,
        fields: &Map<String, Value>,
        request: &RequestInfo,
    ) -> (Value, SubmissionVerdict) {
        let sequence_key = prefixed(&self.prefix, "sequence");
        let sequence = match self.session.get(&sequence_key, json!([null])) {
            Value::Array(entries) => entries,
            _ => vec![Value::Null],
        };

        let current = self.current.unwrap_or(Visit {
            index: 0,
            time: request.timestamp(),
        });

        let verdict = evaluate_submission(
            fields,
            &sequence,
            &self.honeypot,
            &self.sequence,
            current,
            request.referer.as_deref(),
        );

        let report = build_report(
            &self.auth,
            self.session.as_ref(),
            &self.prefix,
            &verdict,
            website,
            form_title,
            fields,
            &self.honeypot,
            &self.sequence,
        );

        (report, verdict)
    }

    fn current_visit(&self) -> Visit {
        self.current.unwrap_or(Visit {
            index: 0,
            time: crate::timefmt::truncate_to_micros(chrono::Utc::now().naive_utc()),
        })
    }
}
