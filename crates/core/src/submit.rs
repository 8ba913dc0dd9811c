//! Submission collaborators and session submit status.
//!
//! The wizard core never talks to a transport directly. Whatever accepts a
//! finalised payload (a REST backend, a record directory, a test double)
//! implements [`CreateOperation`]; the session's submission pipeline calls it
//! exactly once per attempt and interprets its result.

use crate::constants::GENERIC_SUBMISSION_FAILURE;
use serde::{Deserialize, Serialize};
use std::future::Future;

/// Runtime submission status of a form session.
///
/// Drives control enablement in presentation layers: while `Submitting`,
/// every mutation and navigation operation is refused, which is what keeps a
/// double-submit (or an edit racing an in-flight submit) impossible.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitState {
    /// No submission attempted, or the last attempt was acknowledged.
    Idle,
    /// A create call is outstanding.
    Submitting,
    /// The last attempt succeeded; the draft has been cleared.
    Succeeded,
    /// The last attempt failed with the given message; the draft survives.
    Failed(String),
}

impl SubmitState {
    pub fn is_submitting(&self) -> bool {
        matches!(self, SubmitState::Submitting)
    }
}

/// Reference to a record accepted by a create operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatedRecord {
    /// Identifier assigned by the collaborator.
    pub id: String,
}

/// Rejection returned by a create operation.
///
/// Collaborators should carry a human-readable message; when they cannot,
/// the display falls back to a generic one so that callers always have
/// something to show.
#[derive(Debug)]
pub struct CreateError {
    message: Option<String>,
}

impl CreateError {
    /// A rejection carrying the collaborator's own message.
    pub fn with_message(message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
        }
    }

    /// A rejection without a usable message.
    pub fn without_message() -> Self {
        Self { message: None }
    }
}

impl std::fmt::Display for CreateError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.message {
            Some(message) => write!(f, "{message}"),
            None => write!(f, "{GENERIC_SUBMISSION_FAILURE}"),
        }
    }
}

impl std::error::Error for CreateError {}

/// An external create operation accepting a finalised intake payload.
///
/// Called exactly once per submission attempt, asynchronously; the session is
/// suspended only here. Implementations own their transport, retries and
/// timeouts — the pipeline performs none of those.
pub trait CreateOperation {
    fn create(
        &self,
        payload: serde_json::Value,
    ) -> impl Future<Output = Result<CreatedRecord, CreateError>> + Send;
}
