//! Execution log sink appending JSONL records under `logs/`.
use super::WorkspacePaths;
use crate::ports::{LogLevel, LogSink, UnitStatus};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use tracing::warn;

/// One line of a unit's `.jsonl` log.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum LogRecord {
    Open { unit: String },
    Line { unit: String, level: LogLevel, line: String },
    Close { unit: String, status: UnitStatus },
}

impl LogRecord {
    fn unit(&self) -> &str {
        match self {
            LogRecord::Open { unit }
            | LogRecord::Line { unit, .. }
            | LogRecord::Close { unit, .. } => unit,
        }
    }
}

#[derive(Debug, Clone)]
pub struct JsonlLog {
    paths: WorkspacePaths,
}

impl JsonlLog {
    pub fn new(paths: WorkspacePaths) -> Self {
        Self { paths }
    }

    fn write(&self, record: &LogRecord) -> Result<()> {
        let path = self.paths.log_path(record.unit());
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).context("create logs dir")?;
        }
        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("open {}", path.display()))?;
        let line = serde_json::to_string(record).context("serialize log record")?;
        file.write_all(line.as_bytes())
            .with_context(|| format!("write {}", path.display()))?;
        file.write_all(b"\n")
            .with_context(|| format!("write {}", path.display()))?;
        Ok(())
    }

    fn record(&self, record: LogRecord) {
        if let Err(err) = self.write(&record) {
            warn!(unit = record.unit(), error = %format!("{err:#}"), "execution log write failed");
        }
    }
}

impl LogSink for JsonlLog {
    fn open_stream(&self, unit: &str) {
        self.record(LogRecord::Open {
            unit: unit.to_string(),
        });
    }

    fn append(&self, unit: &str, line: &str, level: LogLevel) {
        self.record(LogRecord::Line {
            unit: unit.to_string(),
            level,
            line: line.to_string(),
        });
    }

    fn close(&self, unit: &str, status: UnitStatus) {
        self.record(LogRecord::Close {
            unit: unit.to_string(),
            status,
        });
    }
}
