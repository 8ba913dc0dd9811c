//! Submitted-record persistence.
//!
//! ## Storage layout
//!
//! One YAML document per accepted submission, sharded by identifier to keep
//! directory fan-out bounded:
//!
//! ```text
//! records/
//!   <id[0..2]>/
//!     <id[2..4]>/
//!       <id>/
//!         record.yaml
//! ```
//!
//! [`RecordService`] is the in-process implementation of
//! [`CreateOperation`]: it assigns an identifier, stamps the submission
//! time, and writes the record before acknowledging.

use crate::config::CoreConfig;
use crate::constants::RECORD_FILE_NAME;
use crate::submit::{CreateError, CreateOperation, CreatedRecord};
use crate::{IntakeError, IntakeResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::future::Future;
use std::path::PathBuf;
use uuid::Uuid;

/// A submitted intake record at rest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntakeRecord {
    /// Identifier assigned at acceptance.
    pub id: String,
    /// Slug of the schema the submission was collected under.
    pub schema: String,
    /// Acceptance timestamp.
    pub submitted_at: DateTime<Utc>,
    /// The finalised, normalised payload.
    pub data: serde_json::Value,
}

/// Writes accepted submissions under the configured records directory.
#[derive(Debug, Clone)]
pub struct RecordService {
    records_dir: PathBuf,
    schema_slug: String,
}

impl RecordService {
    pub fn new(cfg: &CoreConfig, schema_slug: impl Into<String>) -> Self {
        Self {
            records_dir: cfg.records_dir(),
            schema_slug: schema_slug.into(),
        }
    }

    /// Directory holding one record's files.
    fn record_dir(&self, id: &str) -> PathBuf {
        self.records_dir.join(&id[..2]).join(&id[2..4]).join(id)
    }

    fn write_record(&self, record: &IntakeRecord) -> IntakeResult<()> {
        let dir = self.record_dir(&record.id);
        fs::create_dir_all(&dir).map_err(IntakeError::RecordDirCreation)?;
        let yaml = serde_yaml::to_string(record).map_err(IntakeError::RecordSerialisation)?;
        fs::write(dir.join(RECORD_FILE_NAME), yaml).map_err(IntakeError::RecordWrite)?;
        Ok(())
    }

    /// Loads a single record by identifier.
    ///
    /// # Errors
    ///
    /// Returns `RecordRead` when the record does not exist or cannot be
    /// read, and `RecordDeserialisation` when its document does not parse.
    pub fn load_record(&self, id: &str) -> IntakeResult<IntakeRecord> {
        // Identifiers are ASCII alphanumeric by construction; anything else
        // would also break the byte-indexed sharding in `record_dir`.
        if id.len() < 4 || !id.bytes().all(|b| b.is_ascii_alphanumeric()) {
            return Err(IntakeError::InvalidInput(format!(
                "'{id}' is not a record identifier"
            )));
        }
        let path = self.record_dir(id).join(RECORD_FILE_NAME);
        let contents = fs::read_to_string(&path).map_err(IntakeError::RecordRead)?;
        serde_yaml::from_str(&contents).map_err(IntakeError::RecordDeserialisation)
    }

    /// Lists every stored record, newest first.
    ///
    /// Unreadable or malformed entries are logged and skipped rather than
    /// failing the whole listing; an absent records directory is an empty
    /// list.
    pub fn list_records(&self) -> IntakeResult<Vec<IntakeRecord>> {
        let mut records = Vec::new();
        if !self.records_dir.exists() {
            return Ok(records);
        }

        for shard1 in read_dirs(&self.records_dir)? {
            for shard2 in read_dirs(&shard1)? {
                for record_dir in read_dirs(&shard2)? {
                    let path = record_dir.join(RECORD_FILE_NAME);
                    let contents = match fs::read_to_string(&path) {
                        Ok(contents) => contents,
                        Err(e) => {
                            tracing::warn!("skipping unreadable record {}: {}", path.display(), e);
                            continue;
                        }
                    };
                    match serde_yaml::from_str::<IntakeRecord>(&contents) {
                        Ok(record) => records.push(record),
                        Err(e) => {
                            tracing::warn!("skipping malformed record {}: {}", path.display(), e);
                        }
                    }
                }
            }
        }

        records.sort_by(|a, b| b.submitted_at.cmp(&a.submitted_at));
        Ok(records)
    }
}

fn read_dirs(dir: &std::path::Path) -> IntakeResult<Vec<PathBuf>> {
    let mut dirs = Vec::new();
    for entry in fs::read_dir(dir).map_err(IntakeError::RecordRead)? {
        let entry = entry.map_err(IntakeError::RecordRead)?;
        if entry.path().is_dir() {
            dirs.push(entry.path());
        }
    }
    Ok(dirs)
}

impl CreateOperation for RecordService {
    fn create(
        &self,
        payload: serde_json::Value,
    ) -> impl Future<Output = Result<CreatedRecord, CreateError>> + Send {
        let record = IntakeRecord {
            id: Uuid::new_v4().simple().to_string(),
            schema: self.schema_slug.clone(),
            submitted_at: Utc::now(),
            data: payload,
        };
        let result = match self.write_record(&record) {
            Ok(()) => Ok(CreatedRecord { id: record.id }),
            Err(e) => Err(CreateError::with_message(e.to_string())),
        };
        async move { result }
    }
}
