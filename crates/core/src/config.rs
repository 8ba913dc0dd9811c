//! Core runtime configuration.
//!
//! This module defines configuration that should be resolved once at process
//! startup and then passed into core services. The intent is to avoid reading
//! process-wide environment variables during request handling, which can lead
//! to inconsistent behaviour in multi-threaded runtimes and test harnesses.

use crate::constants::{DRAFTS_DIR_NAME, RECORDS_DIR_NAME};
use crate::{IntakeError, IntakeResult};
use std::path::{Path, PathBuf};

/// Core configuration resolved at startup.
#[derive(Clone, Debug)]
pub struct CoreConfig {
    data_dir: PathBuf,
}

impl CoreConfig {
    /// Create a new `CoreConfig`.
    pub fn new(data_dir: PathBuf) -> IntakeResult<Self> {
        if data_dir.as_os_str().is_empty() {
            return Err(IntakeError::InvalidInput("data_dir cannot be empty".into()));
        }

        Ok(Self { data_dir })
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn drafts_dir(&self) -> PathBuf {
        self.data_dir.join(DRAFTS_DIR_NAME)
    }

    pub fn records_dir(&self) -> PathBuf {
        self.data_dir.join(RECORDS_DIR_NAME)
    }
}
