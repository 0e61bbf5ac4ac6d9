//! Jobs, per-job results, and result persistence.

use crate::error::Result;
use docparse_tonic_core::OptionSet;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::path::{Path, PathBuf};

/// One document-parsing unit of work.
///
/// The document bytes are read at submission time, not here: an
/// unreadable file must become a failed result for that job, never an
/// error that aborts the batch.
#[derive(Debug, Clone)]
pub struct Job {
    pub path: PathBuf,
    pub options: OptionSet,
}

impl Job {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            options: OptionSet::default(),
        }
    }
}

/// The outcome recorded for one job. A batch's result set has exactly
/// one entry per submitted job; ordering does not follow submission
/// order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum JobResult {
    Succeeded {
        file_path: String,
        output_dir: String,
    },
    Failed {
        file_path: String,
        error: String,
    },
}

impl JobResult {
    pub fn succeeded(file_path: impl Into<String>, output_dir: impl Into<String>) -> Self {
        Self::Succeeded {
            file_path: file_path.into(),
            output_dir: output_dir.into(),
        }
    }

    pub fn failed(file_path: impl Into<String>, error: impl Into<String>) -> Self {
        Self::Failed {
            file_path: file_path.into(),
            error: error.into(),
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }

    pub fn file_path(&self) -> &str {
        match self {
            Self::Succeeded { file_path, .. } | Self::Failed { file_path, .. } => file_path,
        }
    }
}

/// Writes the aggregated result set to
/// `<save_dir>/<prefix>_results.json` and returns the path.
pub fn persist_results(results: &[JobResult], save_dir: &Path, prefix: &str) -> Result<PathBuf> {
    fs::create_dir_all(save_dir)?;
    let path = save_dir.join(format!("{prefix}_results.json"));
    serde_json::to_writer_pretty(File::create(&path)?, results)?;
    Ok(path)
}
