use std::fs::{self, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::GuardResult;
use crate::{AnalysisResult, PostInput};

/// One traceability record per analysis. Input and output are kept as the
/// verbatim JSON text they serialized to, not as structured fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditRecord {
    pub created_at: DateTime<Utc>,
    pub platform: String,
    pub input_json: String,
    pub output_json: String,
}

impl AuditRecord {
    pub fn new(post: &PostInput, result: &AnalysisResult) -> GuardResult<Self> {
        Ok(Self {
            created_at: Utc::now(),
            platform: post.platform.clone(),
            input_json: serde_json::to_string(post)?,
            output_json: serde_json::to_string(result)?,
        })
    }

    pub fn input(&self) -> GuardResult<PostInput> {
        Ok(serde_json::from_str(&self.input_json)?)
    }

    pub fn output(&self) -> GuardResult<AnalysisResult> {
        Ok(serde_json::from_str(&self.output_json)?)
    }
}

/// Append-only JSONL file of [`AuditRecord`]s.
#[derive(Debug, Clone)]
pub struct AuditLog {
    path: PathBuf,
}

impl AuditLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn append(&self, record: &AuditRecord) -> GuardResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        let line = serde_json::to_string(record)?;
        writeln!(file, "{line}")?;
        Ok(())
    }

    /// Every record in file order. A missing file reads as empty.
    pub fn read_all(&self) -> GuardResult<Vec<AuditRecord>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let reader = BufReader::new(fs::File::open(&self.path)?);
        let mut records = Vec::new();
        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            records.push(serde_json::from_str(&line)?);
        }
        Ok(records)
    }
}
