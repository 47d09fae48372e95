//! Honeypot and page-sequence instrumentation for HTML forms.
//!
//! Tracks a visitor's page views in their session, embeds a disguised
//! arithmetic challenge into each form, and on submission computes trust
//! signals (fill duration, honeypot pass/fail, referral chain) that are
//! reported to a remote scoring service. The service decides what counts as
//! spam; this crate only measures and reports.
//!
//! ```no_run
//! use formguard::{FormGuard, RequestInfo};
//! use serde_json::Map;
//!
//! let mut kit = FormGuard::new("https://score.example/api", "client-id", "client-secret")?;
//!
//! // On every page view:
//! let request = RequestInfo {
//!     host: Some("example.com".into()),
//!     request_uri: Some("/contact".into()),
//!     ..Default::default()
//! };
//! kit.track_source(&request, false);
//!
//! // When rendering a form:
//! let snippet = kit.generate_honeypot(false);
//!
//! // On POST:
//! let fields: Map<String, serde_json::Value> = Map::new();
//! kit.submit_form("example.com", "Contact", &fields, &request)?;
//! # Ok::<(), formguard::FormGuardError>(())
//! ```

mod challenge;
mod client;
mod error;
mod kit;
mod payload;
mod render;
mod request;
mod session;
mod timefmt;
mod track;
mod validate;

pub use challenge::challenge_for;
pub use client::ScoringClient;
pub use error::FormGuardError;
pub use kit::FormGuard;
pub use payload::{Auth, build_report};
pub use render::HoneypotStatus;
pub use request::RequestInfo;
pub use session::{MemorySessionBag, SessionStore};
pub use track::{DEFAULT_REFERRAL_REPEAT, SequenceTracker, Visit};
pub use validate::{SubmissionVerdict, evaluate_submission};
