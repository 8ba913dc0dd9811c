//! The stateful wizard controller for one multi-section form.
//!
//! A [`FormSession`] wraps one draft store entry and exposes everything a
//! presentation layer needs: the current section, the accumulated data,
//! field updates by dotted path, gated forward navigation, free backward
//! navigation, progress, and the submission pipeline. Every mutation is
//! persisted before the call returns, so an observer reading the store
//! straight after any session call sees the latest state.
//!
//! Sessions are single-mutator by construction (`&mut self` on every
//! mutation). The only suspension point is the awaited create call inside
//! [`submit`](FormSession::submit); a dropped submit future mutates nothing,
//! which is what makes late responses after navigation safe to ignore.

use crate::draft::{DraftStore, FormDraft};
use crate::fields::{get_field, set_field};
use crate::normalise::{normalise_list, normalise_payload};
use crate::schema::{FormSchema, SectionDescriptor};
use crate::submit::{CreateOperation, CreatedRecord, SubmitState};
use crate::validate::{validate_section, ValidationOutcome};
use crate::{IntakeError, IntakeResult};
use intake_types::{DraftKey, FieldPath};
use serde_json::Value;
use std::sync::Arc;

/// The wizard controller for one form key.
pub struct FormSession<S: DraftStore> {
    key: DraftKey,
    schema: Arc<FormSchema>,
    store: S,
    data: Value,
    section_index: usize,
    submit_state: SubmitState,
}

impl<S: DraftStore> FormSession<S> {
    /// Opens a session for `key`, resuming in place from a persisted draft
    /// when one exists, or starting at section 0 with the schema defaults.
    ///
    /// A persisted section index beyond the schema's range (the schema
    /// shrank since the draft was saved) is clamped rather than discarded;
    /// the user's data is worth more than their position.
    pub fn new(store: S, schema: Arc<FormSchema>, key: DraftKey) -> Self {
        match store.load(&key) {
            Some(draft) => {
                let section_index = draft.section_index.min(schema.last_index());
                if section_index != draft.section_index {
                    tracing::warn!(
                        "clamping persisted section index {} to {} for key '{}'",
                        draft.section_index,
                        section_index,
                        key
                    );
                }
                tracing::debug!("resuming draft for key '{}' at section {}", key, section_index);
                Self {
                    key,
                    schema,
                    store,
                    data: draft.data,
                    section_index,
                    submit_state: SubmitState::Idle,
                }
            }
            None => {
                let data = schema.defaults();
                Self {
                    key,
                    schema,
                    store,
                    data,
                    section_index: 0,
                    submit_state: SubmitState::Idle,
                }
            }
        }
    }

    pub fn key(&self) -> &DraftKey {
        &self.key
    }

    pub fn schema(&self) -> &FormSchema {
        &self.schema
    }

    /// The draft store backing this session. Intended for observers; the
    /// session itself remains the only writer for its key.
    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn section_index(&self) -> usize {
        self.section_index
    }

    /// The descriptor of the section the user is currently on.
    pub fn current_section(&self) -> &SectionDescriptor {
        // The section index is clamped at construction and only ever moved
        // within range, so this lookup cannot miss.
        &self.schema.sections()[self.section_index]
    }

    /// The accumulated form data.
    pub fn data(&self) -> &Value {
        &self.data
    }

    /// Convenience read of a single field by path.
    pub fn field(&self, path: &FieldPath) -> Option<&Value> {
        get_field(&self.data, path)
    }

    pub fn submit_state(&self) -> &SubmitState {
        &self.submit_state
    }

    pub fn is_first_section(&self) -> bool {
        self.section_index == 0
    }

    pub fn is_last_section(&self) -> bool {
        self.section_index == self.schema.last_index()
    }

    /// Completion percentage for progress indicators: section position over
    /// section count, rounded. Purely derived, never stored; reaches 100
    /// exactly on the last section.
    pub fn progress(&self) -> u8 {
        let count = self.schema.section_count();
        (((self.section_index + 1) * 100) as f64 / count as f64).round() as u8
    }

    /// Validates the section the user is currently on.
    pub fn validate_current(&self) -> ValidationOutcome {
        validate_section(self.current_section(), &self.data)
    }

    /// Merges a single field update into the draft and persists it.
    ///
    /// Declared list fields are normalised at commit time, so raw
    /// comma-text never reaches the stored draft.
    ///
    /// # Errors
    ///
    /// Returns `SubmitInFlight` while a submission is outstanding,
    /// `PathConflict` when the path runs into a scalar where an object was
    /// expected, and `InvalidInput` for un-normalisable list values.
    pub fn update_field(&mut self, path: &FieldPath, value: Value) -> IntakeResult<()> {
        self.ensure_not_submitting()?;

        let value = if self.schema.is_list_field(path) {
            normalise_list(&value)?
        } else {
            value
        };
        set_field(&mut self.data, path, value)?;
        self.persist();
        Ok(())
    }

    /// Attempts to advance to the next section.
    ///
    /// Advances by exactly one when the current section validates and a next
    /// section exists; otherwise the state is unchanged. The returned
    /// outcome carries the validation messages either way, so callers can
    /// render them without a second validation pass.
    pub fn next(&mut self) -> IntakeResult<ValidationOutcome> {
        self.ensure_not_submitting()?;

        let outcome = self.validate_current();
        if outcome.ok() && self.section_index < self.schema.last_index() {
            self.section_index += 1;
            tracing::debug!(
                "key '{}' advanced to section {}",
                self.key,
                self.section_index
            );
            self.persist();
        }
        Ok(outcome)
    }

    /// Moves back one section. Always allowed; floors at the first section.
    pub fn previous(&mut self) -> IntakeResult<()> {
        self.ensure_not_submitting()?;

        if self.section_index > 0 {
            self.section_index -= 1;
            self.persist();
        }
        Ok(())
    }

    /// Jumps directly to `index`.
    ///
    /// Backward jumps (and staying put) are always allowed. A forward jump
    /// is only allowed to the immediately next section, and only when the
    /// current section validates — skipping unvalidated sections is refused.
    pub fn jump_to(&mut self, index: usize) -> IntakeResult<ValidationOutcome> {
        self.ensure_not_submitting()?;

        if index >= self.schema.section_count() {
            return Err(IntakeError::InvalidInput(format!(
                "section index {index} is out of range (0..{})",
                self.schema.section_count()
            )));
        }

        if index <= self.section_index {
            if index != self.section_index {
                self.section_index = index;
                self.persist();
            }
            return Ok(ValidationOutcome::valid());
        }

        if index == self.section_index + 1 {
            let outcome = self.validate_current();
            if outcome.ok() {
                self.section_index = index;
                self.persist();
            }
            return Ok(outcome);
        }

        Err(IntakeError::InvalidInput(format!(
            "cannot skip ahead to section {index} from section {}",
            self.section_index
        )))
    }

    /// Clears the persisted draft and reinitialises the session: schema
    /// defaults, section 0, `Idle`. Also the recovery path for a session
    /// whose submit future was abandoned mid-flight.
    pub fn reset(&mut self) {
        self.store.clear(&self.key);
        self.data = self.schema.defaults();
        self.section_index = 0;
        self.submit_state = SubmitState::Idle;
    }

    /// Runs the submission pipeline: final-section validation, payload
    /// normalisation, exactly one create call, draft clearance on success.
    ///
    /// On failure the collaborator's message is surfaced verbatim as
    /// [`IntakeError::Submission`] and the draft survives untouched, so the
    /// user can retry without re-entering anything. The pipeline never
    /// retries by itself.
    pub async fn submit<C: CreateOperation>(&mut self, op: &C) -> IntakeResult<CreatedRecord> {
        self.ensure_not_submitting()?;

        let last = self.schema.last_index();
        let outcome = match self.schema.section(last) {
            Some(section) => validate_section(section, &self.data),
            None => ValidationOutcome::valid(),
        };
        if !outcome.ok() {
            return Err(IntakeError::SectionIncomplete {
                section: last,
                outcome,
            });
        }

        let payload = normalise_payload(&self.data, &self.schema)?;

        self.submit_state = SubmitState::Submitting;
        match op.create(payload).await {
            Ok(record) => {
                self.store.clear(&self.key);
                self.submit_state = SubmitState::Succeeded;
                tracing::debug!(
                    "submission for key '{}' accepted as record {}",
                    self.key,
                    record.id
                );
                Ok(record)
            }
            Err(e) => {
                let message = e.to_string();
                tracing::debug!("submission for key '{}' failed: {}", self.key, message);
                self.submit_state = SubmitState::Failed(message.clone());
                Err(IntakeError::Submission(message))
            }
        }
    }

    fn ensure_not_submitting(&self) -> IntakeResult<()> {
        if self.submit_state.is_submitting() {
            return Err(IntakeError::SubmitInFlight);
        }
        Ok(())
    }

    fn persist(&mut self) {
        let draft = FormDraft::new(self.key.clone(), self.section_index, self.data.clone());
        self.store.save(&self.key, &draft);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::SectionDescriptor;
    use crate::store::MemoryDraftStore;
    use crate::submit::CreateError;
    use serde_json::json;

    fn field(s: &str) -> FieldPath {
        FieldPath::new(s).expect("test path should be valid")
    }

    fn key(s: &str) -> DraftKey {
        DraftKey::new(s).expect("test key should be valid")
    }

    /// Two-section schema: section 0 requires firstName, section 1 is free.
    fn two_section_schema() -> Arc<FormSchema> {
        Arc::new(
            FormSchema::new(
                "patient-intake",
                vec![
                    SectionDescriptor::new(0, "Demographics", vec![field("firstName")]),
                    SectionDescriptor::new(1, "Review", vec![]),
                ],
                json!({ "firstName": "", "allergies": [] }),
                vec![field("allergies")],
            )
            .expect("schema should build"),
        )
    }

    fn new_session(schema: Arc<FormSchema>, k: &str) -> FormSession<MemoryDraftStore> {
        FormSession::new(MemoryDraftStore::new(), schema, key(k))
    }

    struct RejectingCreate(&'static str);

    impl CreateOperation for RejectingCreate {
        fn create(
            &self,
            _payload: Value,
        ) -> impl std::future::Future<Output = Result<CreatedRecord, CreateError>> + Send {
            async move { Err(CreateError::with_message(self.0)) }
        }
    }

    struct AcceptingCreate {
        seen: std::sync::Mutex<Vec<Value>>,
    }

    impl AcceptingCreate {
        fn new() -> Self {
            Self {
                seen: std::sync::Mutex::new(Vec::new()),
            }
        }
    }

    impl CreateOperation for AcceptingCreate {
        fn create(
            &self,
            payload: Value,
        ) -> impl std::future::Future<Output = Result<CreatedRecord, CreateError>> + Send {
            async move {
                self.seen.lock().expect("lock should not be poisoned").push(payload);
                Ok(CreatedRecord { id: "r1".into() })
            }
        }
    }

    #[test]
    fn test_fresh_session_starts_at_section_zero_with_defaults() {
        let session = new_session(two_section_schema(), "f1");
        assert_eq!(session.section_index(), 0);
        assert!(session.is_first_section());
        assert!(!session.is_last_section());
        assert_eq!(session.data(), &json!({ "firstName": "", "allergies": [] }));
        assert_eq!(session.submit_state(), &SubmitState::Idle);
        // No draft exists until the first interaction.
        assert_eq!(session.store().load(&key("f1")), None);
    }

    #[test]
    fn test_gated_navigation_scenario() {
        // Section 0 requires firstName; an empty value blocks next().
        let mut session = new_session(two_section_schema(), "f1");

        let outcome = session.next().expect("next should not error");
        assert!(!outcome.ok());
        assert_eq!(outcome.errors(), ["First name is required"]);
        assert_eq!(session.section_index(), 0, "blocked next must not move");

        session
            .update_field(&field("firstName"), json!("Ann"))
            .expect("update should succeed");

        let outcome = session.next().expect("next should not error");
        assert!(outcome.ok());
        assert_eq!(session.section_index(), 1);
        assert!(session.is_last_section());
        assert_eq!(session.progress(), 100);
    }

    #[test]
    fn test_next_is_terminal_on_last_section() {
        let mut session = new_session(two_section_schema(), "f1");
        session
            .update_field(&field("firstName"), json!("Ann"))
            .expect("update should succeed");
        session.next().expect("next should not error");
        assert_eq!(session.section_index(), 1);

        let outcome = session.next().expect("next should not error");
        assert!(outcome.ok());
        assert_eq!(session.section_index(), 1, "last section is terminal");
    }

    #[test]
    fn test_previous_is_always_allowed_and_floors_at_zero() {
        let mut session = new_session(two_section_schema(), "f1");
        session.previous().expect("previous should not error");
        assert_eq!(session.section_index(), 0);

        session
            .update_field(&field("firstName"), json!("Ann"))
            .expect("update should succeed");
        session.next().expect("next should not error");
        session.previous().expect("previous should not error");
        assert_eq!(session.section_index(), 0);
    }

    #[test]
    fn test_progress_is_monotonic_and_reaches_100() {
        let schema = Arc::new(
            FormSchema::new(
                "three-step",
                vec![
                    SectionDescriptor::new(0, "One", vec![]),
                    SectionDescriptor::new(1, "Two", vec![]),
                    SectionDescriptor::new(2, "Three", vec![]),
                ],
                json!({}),
                vec![],
            )
            .expect("schema should build"),
        );
        let mut session = new_session(schema, "f1");

        let mut last = 0;
        loop {
            let progress = session.progress();
            assert!(progress >= last, "progress must be non-decreasing");
            last = progress;
            if session.is_last_section() {
                break;
            }
            session.next().expect("next should not error");
        }
        assert_eq!(session.progress(), 100, "terminal progress is 100");
    }

    #[test]
    fn test_every_mutation_is_immediately_observable_in_the_store() {
        let mut session = new_session(two_section_schema(), "f1");
        let k = key("f1");

        session
            .update_field(&field("firstName"), json!("Ann"))
            .expect("update should succeed");
        let persisted = session.store().load(&k).expect("draft should be persisted");
        assert_eq!(persisted.data["firstName"], "Ann");
        assert_eq!(persisted.section_index, 0);

        session.next().expect("next should not error");
        let persisted = session.store().load(&k).expect("draft should be persisted");
        assert_eq!(persisted.section_index, 1);
    }

    #[test]
    fn test_resume_in_place_from_persisted_draft() {
        let schema = two_section_schema();
        let k = key("f1");

        let mut store = MemoryDraftStore::new();
        store.save(
            &k,
            &FormDraft::new(k.clone(), 1, json!({ "firstName": "Ann", "allergies": [] })),
        );

        let session = FormSession::new(store, schema, k);
        assert_eq!(session.section_index(), 1, "session should resume in place");
        assert_eq!(session.data()["firstName"], "Ann");
    }

    #[test]
    fn test_resume_clamps_out_of_range_section_index() {
        let schema = two_section_schema();
        let k = key("f1");

        let mut store = MemoryDraftStore::new();
        store.save(
            &k,
            &FormDraft::new(k.clone(), 7, json!({ "firstName": "Ann", "allergies": [] })),
        );

        let session = FormSession::new(store, schema, k);
        assert_eq!(session.section_index(), 1, "index should clamp to last section");
        assert_eq!(session.data()["firstName"], "Ann", "data should survive");
    }

    #[test]
    fn test_update_field_normalises_declared_list_fields_on_commit() {
        let mut session = new_session(two_section_schema(), "f1");
        session
            .update_field(&field("allergies"), json!("Penicillin, , Latex ,"))
            .expect("update should succeed");

        assert_eq!(
            session.data()["allergies"],
            json!(["Penicillin", "Latex"]),
            "raw comma-text must not reach the draft"
        );
        let persisted = session.store().load(&key("f1")).expect("draft should exist");
        assert_eq!(persisted.data["allergies"], json!(["Penicillin", "Latex"]));
    }

    #[test]
    fn test_update_field_creates_nested_records() {
        let mut session = new_session(two_section_schema(), "f1");
        session
            .update_field(&field("emergencyContact.phone"), json!("0123"))
            .expect("update should succeed");
        assert_eq!(session.data()["emergencyContact"]["phone"], "0123");
    }

    #[test]
    fn test_jump_to_rules() {
        let schema = Arc::new(
            FormSchema::new(
                "three-step",
                vec![
                    SectionDescriptor::new(0, "One", vec![]),
                    SectionDescriptor::new(1, "Two", vec![field("confirmed")]),
                    SectionDescriptor::new(2, "Three", vec![]),
                ],
                json!({ "confirmed": "" }),
                vec![],
            )
            .expect("schema should build"),
        );
        let mut session = new_session(schema, "f1");

        // Forward by more than one is refused outright.
        let err = session.jump_to(2).expect_err("skipping ahead should fail");
        assert!(matches!(err, IntakeError::InvalidInput(_)));

        // Forward by one is gated on the current section.
        let outcome = session.jump_to(1).expect("jump should not error");
        assert!(outcome.ok());
        assert_eq!(session.section_index(), 1);

        // Section 1 does not validate, so jumping on to 2 is blocked.
        let outcome = session.jump_to(2).expect("jump should not error");
        assert!(!outcome.ok());
        assert_eq!(session.section_index(), 1);

        // Backward jumps are always free.
        let outcome = session.jump_to(0).expect("jump should not error");
        assert!(outcome.ok());
        assert_eq!(session.section_index(), 0);

        // Out of range is refused.
        let err = session.jump_to(9).expect_err("out of range should fail");
        assert!(matches!(err, IntakeError::InvalidInput(_)));
    }

    #[test]
    fn test_reset_clears_draft_and_reinitialises() {
        let mut session = new_session(two_section_schema(), "f1");
        session
            .update_field(&field("firstName"), json!("Ann"))
            .expect("update should succeed");
        session.next().expect("next should not error");

        session.reset();
        assert_eq!(session.section_index(), 0);
        assert_eq!(session.data(), &json!({ "firstName": "", "allergies": [] }));
        assert_eq!(session.submit_state(), &SubmitState::Idle);
        assert_eq!(session.store().load(&key("f1")), None, "draft should be cleared");
    }

    #[tokio::test]
    async fn test_submit_is_gated_on_final_section_validation() {
        let schema = Arc::new(
            FormSchema::new(
                "patient-intake",
                vec![
                    SectionDescriptor::new(0, "Demographics", vec![]),
                    SectionDescriptor::new(1, "Review", vec![field("signature")]),
                ],
                json!({ "signature": "" }),
                vec![],
            )
            .expect("schema should build"),
        );
        let mut session = new_session(schema, "f1");
        let op = AcceptingCreate::new();

        let err = session.submit(&op).await.expect_err("submit should be blocked");
        match err {
            IntakeError::SectionIncomplete { section, outcome } => {
                assert_eq!(section, 1);
                assert_eq!(outcome.errors(), ["Signature is required"]);
            }
            other => panic!("expected SectionIncomplete, got {other:?}"),
        }
        assert!(
            op.seen.lock().unwrap().is_empty(),
            "create must not be called when the gate fails"
        );
    }

    #[tokio::test]
    async fn test_failed_submit_preserves_draft_and_surfaces_message() {
        let mut session = new_session(two_section_schema(), "f1");
        session
            .update_field(&field("firstName"), json!("Ann"))
            .expect("update should succeed");
        session.next().expect("next should not error");

        let op = RejectingCreate("Email already exists");
        let err = session.submit(&op).await.expect_err("submit should fail");

        match err {
            IntakeError::Submission(message) => assert_eq!(message, "Email already exists"),
            other => panic!("expected Submission, got {other:?}"),
        }
        assert_eq!(
            session.submit_state(),
            &SubmitState::Failed("Email already exists".into())
        );
        assert_eq!(session.section_index(), 1, "session state is unchanged");
        let persisted = session.store().load(&key("f1")).expect("draft must survive");
        assert_eq!(persisted.data["firstName"], "Ann");
    }

    #[tokio::test]
    async fn test_failed_submit_can_be_retried() {
        let mut session = new_session(two_section_schema(), "f1");
        session
            .update_field(&field("firstName"), json!("Ann"))
            .expect("update should succeed");
        session.next().expect("next should not error");

        let rejecting = RejectingCreate("Email already exists");
        session
            .submit(&rejecting)
            .await
            .expect_err("first attempt should fail");

        let accepting = AcceptingCreate::new();
        let record = session
            .submit(&accepting)
            .await
            .expect("retry should succeed");
        assert_eq!(record.id, "r1");
        assert_eq!(session.submit_state(), &SubmitState::Succeeded);
    }

    #[tokio::test]
    async fn test_successful_submit_clears_draft_and_normalises_payload() {
        let mut session = new_session(two_section_schema(), "f1");
        session
            .update_field(&field("firstName"), json!("Ann"))
            .expect("update should succeed");
        session
            .update_field(&field("allergies"), json!("Penicillin, , Latex ,"))
            .expect("update should succeed");
        session.next().expect("next should not error");

        let op = AcceptingCreate::new();
        let record = session.submit(&op).await.expect("submit should succeed");
        assert_eq!(record.id, "r1");
        assert_eq!(session.submit_state(), &SubmitState::Succeeded);
        assert_eq!(
            session.store().load(&key("f1")),
            None,
            "draft should be cleared on success"
        );

        let seen = op.seen.lock().expect("lock should not be poisoned");
        assert_eq!(seen.len(), 1, "create is called exactly once");
        assert_eq!(seen[0]["allergies"], json!(["Penicillin", "Latex"]));
        assert_eq!(seen[0]["firstName"], "Ann");
    }
}
