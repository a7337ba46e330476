//! Runtime job descriptor shared between the harness and an engine.
//!
//! The harness builds a [`Job`] from a [`JobSpec`], hands it to the engine's
//! `setup`, and afterwards advances the file position as units complete.

use crate::config::{JobSpec, RwMode};
use crate::error::{ConfigError, EngineError};
use crate::io_unit::IoUnit;

/// Per-file harness state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileState {
    /// Target string as configured.
    pub name: String,
    /// Size the engine reports for the target after setup.
    pub real_file_size: u64,
    /// Position right after the last completed unit.
    pub last_completed_pos: u64,
}

impl FileState {
    /// Creates state for a target that has not transferred anything yet.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            real_file_size: 0,
            last_completed_pos: 0,
        }
    }
}

/// A diagnostic recorded on the job (message plus OS error code).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorRecord {
    /// Human-readable message.
    pub message: String,
    /// Raw OS error code, when one applies.
    pub os_code: Option<i32>,
}

/// One harness-driven unit of work.
#[derive(Debug, Clone)]
pub struct Job {
    /// Job name.
    pub name: String,
    /// Configured I/O mode.
    pub rw: RwMode,
    /// Configured total size.
    pub total_file_size: u64,
    /// Bytes this job will move, set by the engine at setup.
    pub io_size: u64,
    /// Total bytes across all files, set by the engine at setup.
    pub total_io_size: u64,
    /// Bytes per I/O unit.
    pub block_size: usize,
    /// Targets; network jobs accept exactly one.
    pub files: Vec<FileState>,
    last_error: Option<ErrorRecord>,
}

impl Job {
    /// Creates a single-target job.
    #[must_use]
    pub fn new(name: impl Into<String>, rw: RwMode, target: impl Into<String>, size: u64) -> Self {
        Self {
            name: name.into(),
            rw,
            total_file_size: size,
            io_size: 0,
            total_io_size: 0,
            block_size: crate::config::DEFAULT_BLOCK_SIZE as usize,
            files: vec![FileState::new(target)],
            last_error: None,
        }
    }

    /// Builds the runtime descriptor for a job spec.
    ///
    /// # Errors
    /// `ConfigError::InvalidSize` if the block size is zero or does not fit
    /// in memory.
    pub fn from_spec(spec: &JobSpec) -> Result<Self, ConfigError> {
        let block_size = usize::try_from(spec.bs.0)
            .ok()
            .filter(|bs| *bs > 0)
            .ok_or_else(|| ConfigError::InvalidSize {
                value: spec.bs.0.to_string(),
            })?;

        Ok(Self {
            name: spec.name.clone(),
            rw: spec.rw,
            total_file_size: spec.size.0,
            io_size: 0,
            total_io_size: 0,
            block_size,
            files: spec.targets().map(FileState::new).collect(),
            last_error: None,
        })
    }

    /// Returns true if the job mixes reads and writes.
    #[must_use]
    pub const fn is_mixed(&self) -> bool {
        self.rw.is_mixed()
    }

    /// Number of configured targets.
    #[must_use]
    pub fn nr_files(&self) -> usize {
        self.files.len()
    }

    /// The first (and for network jobs, only) target.
    #[must_use]
    pub fn file(&self) -> Option<&FileState> {
        self.files.first()
    }

    /// Mutable access to the first target.
    pub fn file_mut(&mut self) -> Option<&mut FileState> {
        self.files.first_mut()
    }

    /// Bytes still to move before the job's budget is exhausted.
    #[must_use]
    pub fn remaining(&self) -> u64 {
        let done = self.file().map_or(0, |f| f.last_completed_pos);
        self.io_size.saturating_sub(done)
    }

    /// Advances the file position past a unit that completed in full.
    pub fn mark_completed(&mut self, unit: &IoUnit) {
        if let Some(file) = self.file_mut() {
            file.last_completed_pos = unit.end_offset();
        }
    }

    /// Records a diagnostic for the harness's own reporting.
    pub fn record_error(&mut self, err: &EngineError) {
        self.last_error = Some(ErrorRecord {
            message: err.to_string(),
            os_code: err.os_code(),
        });
    }

    /// The most recent diagnostic, if any.
    #[must_use]
    pub fn last_error(&self) -> Option<&ErrorRecord> {
        self.last_error.as_ref()
    }
}
