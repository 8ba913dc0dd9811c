//! # Intake Core
//!
//! Core business logic for the Intake multi-step form system.
//!
//! This crate contains the schema-agnostic wizard machinery used by every
//! multi-section form in the product:
//! - Draft persistence with a key/value [`DraftStore`] (in-memory and
//!   file-backed implementations)
//! - The stateful [`FormSession`] wizard controller (field updates by dotted
//!   path, gated section navigation, progress reporting)
//! - Per-section required-field validation
//! - The submission pipeline (final validation, list-field normalisation,
//!   one external create call, draft clearance on success)
//! - Accepted-record storage for submitted forms
//!
//! **No API concerns**: HTTP servers, service interfaces and authentication
//! belong in the `intake-run` binary.

pub mod config;
pub mod constants;
pub mod draft;
pub mod error;
pub mod fields;
pub mod intake;
pub mod normalise;
pub mod records;
pub mod schema;
pub mod session;
pub mod store;
pub mod submit;
pub mod validate;

pub use config::CoreConfig;
pub use draft::{DraftStore, FormDraft};
pub use error::{IntakeError, IntakeResult};
pub use records::{IntakeRecord, RecordService};
pub use schema::{FormSchema, SectionDescriptor};
pub use session::FormSession;
pub use store::{FileDraftStore, MemoryDraftStore};
pub use submit::{CreateError, CreateOperation, CreatedRecord, SubmitState};
pub use validate::ValidationOutcome;

// Re-export the shared validated types so downstream crates only need one
// dependency for the common case.
pub use intake_types::{DraftKey, FieldPath};
