//! File-backed draft persistence.
//!
//! ## Storage layout
//!
//! One JSON document per key under the drafts directory:
//!
//! ```text
//! drafts/
//!   <hex(sha256(key))>.json
//! ```
//!
//! Hashing the key gives a deterministic, filesystem-safe filename without
//! restricting what callers may put in a key beyond [`DraftKey`]'s own rules.
//!
//! ## Failure semantics
//!
//! This store is infallible at its public boundary. Reads treat missing or
//! malformed documents as absent. The first failed write flips the store
//! into an in-memory fallback for the remainder of the session: the edit
//! that triggered the failure is kept in memory, subsequent operations stay
//! in memory, and the condition is logged rather than surfaced. A fresh
//! store over the same broken backend starts empty, which is the documented
//! cost of the degradation.

use crate::config::CoreConfig;
use crate::draft::{DraftStore, FormDraft};
use intake_types::DraftKey;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

/// Draft store persisting one JSON file per key.
#[derive(Debug)]
pub struct FileDraftStore {
    drafts_dir: PathBuf,
    fallback: HashMap<DraftKey, FormDraft>,
    degraded: bool,
}

impl FileDraftStore {
    /// Creates a store rooted at the configured drafts directory.
    ///
    /// No I/O happens here; the directory is created lazily on first write.
    pub fn new(cfg: &CoreConfig) -> Self {
        Self::with_dir(cfg.drafts_dir())
    }

    /// Creates a store rooted at an explicit directory.
    pub fn with_dir(drafts_dir: PathBuf) -> Self {
        Self {
            drafts_dir,
            fallback: HashMap::new(),
            degraded: false,
        }
    }

    /// True once the store has fallen back to in-memory-only operation.
    pub fn is_degraded(&self) -> bool {
        self.degraded
    }

    fn draft_path(&self, key: &DraftKey) -> PathBuf {
        let digest = hex::encode(Sha256::digest(key.as_str().as_bytes()));
        self.drafts_dir.join(format!("{digest}.json"))
    }

    fn write_draft(&self, key: &DraftKey, draft: &FormDraft) -> std::io::Result<()> {
        fs::create_dir_all(&self.drafts_dir)?;
        let json = serde_json::to_string_pretty(draft)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;
        fs::write(self.draft_path(key), json)
    }
}

impl DraftStore for FileDraftStore {
    fn load(&self, key: &DraftKey) -> Option<FormDraft> {
        if self.degraded {
            return self.fallback.get(key).cloned();
        }

        let path = self.draft_path(key);
        let contents = fs::read_to_string(&path).ok()?;
        let draft: FormDraft = match serde_json::from_str(&contents) {
            Ok(draft) => draft,
            Err(e) => {
                tracing::warn!(
                    "discarding malformed draft {}: {}",
                    path.display(),
                    e
                );
                return None;
            }
        };
        if !draft.data.is_object() {
            tracing::warn!(
                "discarding draft with non-object data: {}",
                path.display()
            );
            return None;
        }

        Some(draft)
    }

    fn save(&mut self, key: &DraftKey, draft: &FormDraft) {
        if !self.degraded {
            match self.write_draft(key, draft) {
                Ok(()) => return,
                Err(e) => {
                    tracing::warn!(
                        "draft persistence failed for key '{}', continuing in memory only: {}",
                        key,
                        e
                    );
                    self.degraded = true;
                }
            }
        }

        self.fallback.insert(key.clone(), draft.clone());
    }

    fn clear(&mut self, key: &DraftKey) {
        self.fallback.remove(key);
        if self.degraded {
            return;
        }

        let path = self.draft_path(key);
        match fs::remove_file(&path) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                tracing::warn!(
                    "failed to clear draft for key '{}', continuing in memory only: {}",
                    key,
                    e
                );
                self.degraded = true;
            }
        }
    }
}
