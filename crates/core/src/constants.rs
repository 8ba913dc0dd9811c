//! Shared constants for the intake core.

/// Directory under the data dir holding persisted form drafts.
pub const DRAFTS_DIR_NAME: &str = "drafts";

/// Directory under the data dir holding accepted intake records.
pub const RECORDS_DIR_NAME: &str = "records";

/// Filename of a submitted intake record within its record directory.
pub const RECORD_FILE_NAME: &str = "record.yaml";

/// Default data directory when none is configured.
pub const DEFAULT_DATA_DIR: &str = "/intake_data";

/// Fallback message surfaced when a create operation rejects a submission
/// without providing one of its own.
pub const GENERIC_SUBMISSION_FAILURE: &str = "submission failed";
