//! In-progress form drafts and the persistence seam they are stored behind.
//!
//! A draft is the not-yet-submitted state of one multi-section form: the
//! accumulated field data plus the section the user was last on. Exactly one
//! draft exists per key; it is created on first interaction, overwritten on
//! every edit and section change, and deleted on successful submission or an
//! explicit reset.

use chrono::{DateTime, Utc};
use intake_types::DraftKey;
use serde::{Deserialize, Serialize};

/// A persisted in-progress form.
///
/// Serialised with camelCase field names (`sectionIndex`, `savedAt`) so that
/// stored drafts match the wire shape the rest of the product uses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormDraft {
    /// The key this draft is stored under.
    pub key: DraftKey,
    /// The section the user was last on. Always within the owning schema's
    /// section range while a session is live; clamped on resume otherwise.
    pub section_index: usize,
    /// The accumulated field data. Always a JSON object.
    pub data: serde_json::Value,
    /// When this draft was last written.
    pub saved_at: DateTime<Utc>,
}

impl FormDraft {
    /// Creates a draft stamped with the current time.
    pub fn new(key: DraftKey, section_index: usize, data: serde_json::Value) -> Self {
        Self {
            key,
            section_index,
            data,
            saved_at: Utc::now(),
        }
    }
}

/// Key/value persistence of one [`FormDraft`] per key.
///
/// The store is the sole persistence authority for drafts and is deliberately
/// infallible at this boundary: absence is an expected state (first visit),
/// malformed stored data is treated as absent, and backend write failures
/// degrade the implementation rather than propagating. A session owns the
/// draft for its key while active; concurrent writers to the same key are
/// last-write-wins with no merge.
pub trait DraftStore {
    /// Loads the draft stored under `key`, or `None` if absent or unreadable.
    fn load(&self, key: &DraftKey) -> Option<FormDraft>;

    /// Overwrites the draft stored under `key`. Persists immediately; there
    /// is no batching, so an observer reading the store straight after this
    /// call sees the new value.
    fn save(&mut self, key: &DraftKey, draft: &FormDraft);

    /// Removes the draft stored under `key`, if any.
    fn clear(&mut self, key: &DraftKey);
}
