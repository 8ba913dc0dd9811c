use crate::draft::{DraftStore, FormDraft};
use intake_types::DraftKey;
use std::collections::HashMap;

/// An in-memory draft store.
///
/// Drafts live for the lifetime of the store and are lost when it is
/// dropped. Used as a test double and as the fallback target when the
/// file-backed store degrades.
#[derive(Debug, Default, Clone)]
pub struct MemoryDraftStore {
    drafts: HashMap<DraftKey, FormDraft>,
}

impl MemoryDraftStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DraftStore for MemoryDraftStore {
    fn load(&self, key: &DraftKey) -> Option<FormDraft> {
        self.drafts.get(key).cloned()
    }

    fn save(&mut self, key: &DraftKey, draft: &FormDraft) {
        self.drafts.insert(key.clone(), draft.clone());
    }

    fn clear(&mut self, key: &DraftKey) {
        self.drafts.remove(key);
    }
}
