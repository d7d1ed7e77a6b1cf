//! JSONL audit log, one line per acquisition.
//!
//! Append-only, rotated by size: `audit.jsonl` becomes `audit.jsonl.1`,
//! older files shift up, at most `MAX_ROTATIONS` are kept.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::types::{AcquisitionResult, SourceTier};

/// Rotate once the log reaches 10 MB.
pub const MAX_LOG_SIZE: u64 = 10 * 1024 * 1024;

pub const MAX_ROTATIONS: u32 = 5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AcquisitionAuditEvent {
    pub timestamp: String,
    pub company: String,
    pub tier: SourceTier,
    pub slug: Option<String>,
    pub duration_ms: u64,
    pub error_count: usize,
    pub content_chars: usize,
}

impl AcquisitionAuditEvent {
    pub fn from_result(result: &AcquisitionResult) -> Self {
        Self {
            timestamp: Utc::now().to_rfc3339(),
            company: result.company_name.clone(),
            tier: result.source_tier,
            slug: result.resolved_slug.clone(),
            duration_ms: result.duration_ms,
            error_count: result.errors.len(),
            content_chars: result.content.raw_text_length,
        }
    }
}

pub struct AuditLogger {
    file: File,
    path: PathBuf,
    max_size: u64,
    /// Approximate; reset on rotation.
    current_size: u64,
}

impl AuditLogger {
    /// Open or create the log, creating parent directories.
    pub fn open(path: &Path) -> Result<Self> {
        Self::open_with_limit(path, MAX_LOG_SIZE)
    }

    pub fn open_with_limit(path: &Path, max_size: u64) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = open_append(path)?;
        let current_size = file.metadata().map(|m| m.len()).unwrap_or(0);
        Ok(Self {
            file,
            path: path.to_path_buf(),
            max_size,
            current_size,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn log(&mut self, event: &AcquisitionAuditEvent) -> Result<()> {
        if self.current_size >= self.max_size {
            self.rotate()?;
        }
        let json = serde_json::to_string(event)?;
        writeln!(self.file, "{json}").context("failed to write audit event")?;
        self.current_size += json.len() as u64 + 1;
        Ok(())
    }

    pub fn log_result(&mut self, result: &AcquisitionResult) -> Result<()> {
        self.log(&AcquisitionAuditEvent::from_result(result))
    }

    fn rotate(&mut self) -> Result<()> {
        self.file.flush()?;

        for i in (1..MAX_ROTATIONS).rev() {
            let from = rotation_path(&self.path, i);
            if from.exists() {
                let _ = std::fs::rename(&from, rotation_path(&self.path, i + 1));
            }
        }
        let _ = std::fs::rename(&self.path, rotation_path(&self.path, 1));

        self.file = open_append(&self.path).context("failed to reopen audit log after rotation")?;
        self.current_size = 0;
        Ok(())
    }
}

fn open_append(path: &Path) -> Result<File> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("failed to open audit log: {}", path.display()))
}

/// `audit.jsonl` -> `audit.jsonl.{index}`.
fn rotation_path(base: &Path, index: u32) -> PathBuf {
    let name = format!(
        "{}.{index}",
        base.file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("audit.jsonl")
    );
    base.with_file_name(name)
}

/// Read every event in a log file, skipping unparseable lines.
pub fn read_events(path: &Path) -> Result<Vec<AcquisitionAuditEvent>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read audit log: {}", path.display()))?;
    Ok(raw
        .lines()
        .filter_map(|line| serde_json::from_str(line).ok())
        .collect())
}
