//! Publishing collaborators: CSV outputs, README summary, git push
//!
//! The scheduler only talks to the [`Publisher`] trait so cycles are
//! testable with a recording mock; `FilePublisher` is the production
//! implementation writing into a git checkout.

pub mod git;
pub mod readme;

use crate::retry::RetryPolicy;
use crate::sources::{NationalSummary, OutputTable};
use async_trait::async_trait;
use std::fs;
use std::path::PathBuf;

#[derive(Debug)]
pub enum PublishError {
    Io(std::io::Error),
    Csv(csv::Error),
    Serialize(serde_json::Error),
    Git(String),
    /// Push retries exhausted; fatal for the process
    PushExhausted,
}

impl std::fmt::Display for PublishError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PublishError::Io(e) => write!(f, "output write failed: {}", e),
            PublishError::Csv(e) => write!(f, "CSV write failed: {}", e),
            PublishError::Serialize(e) => write!(f, "summary serialization failed: {}", e),
            PublishError::Git(msg) => write!(f, "git error: {}", msg),
            PublishError::PushExhausted => write!(f, "max retries exceeded pushing outputs"),
        }
    }
}

impl std::error::Error for PublishError {}

impl From<std::io::Error> for PublishError {
    fn from(e: std::io::Error) -> Self {
        PublishError::Io(e)
    }
}

impl From<csv::Error> for PublishError {
    fn from(e: csv::Error) -> Self {
        PublishError::Csv(e)
    }
}

/// Downstream reporting seam
#[async_trait]
pub trait Publisher: Send + Sync {
    /// Write the output tables of one processed source
    async fn publish_tables(&self, tables: &[OutputTable]) -> Result<(), PublishError>;

    /// Re-render the README from the national summary
    async fn publish_summary(&self, summary: &NationalSummary) -> Result<(), PublishError>;

    /// Called once per cycle after at least one source changed
    async fn commit_and_push(&self) -> Result<(), PublishError>;
}

/// Filesystem + git publisher
pub struct FilePublisher {
    output_dir: PathBuf,
    git_enabled: bool,
    push_policy: RetryPolicy,
}

impl FilePublisher {
    pub fn new(output_dir: impl Into<PathBuf>, git_enabled: bool, push_policy: RetryPolicy) -> Self {
        Self {
            output_dir: output_dir.into(),
            git_enabled,
            push_policy,
        }
    }

    fn write_table(&self, table: &OutputTable) -> Result<(), PublishError> {
        let path = self.output_dir.join(&table.rel_path);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut writer = csv::Writer::from_path(&path)?;

        let mut header = vec!["date".to_string()];
        header.extend(table.value_headers.iter().cloned());
        writer.write_record(&header)?;

        for (i, date) in table.dates.iter().enumerate() {
            let mut record = vec![date.format("%Y-%m-%d").to_string()];
            for column in &table.columns {
                record.push(column[i].to_string());
            }
            writer.write_record(&record)?;
        }

        writer.flush().map_err(PublishError::Io)?;
        log::info!("💾 Wrote '{}'", path.display());
        Ok(())
    }
}

#[async_trait]
impl Publisher for FilePublisher {
    async fn publish_tables(&self, tables: &[OutputTable]) -> Result<(), PublishError> {
        for table in tables {
            self.write_table(table)?;
        }
        Ok(())
    }

    async fn publish_summary(&self, summary: &NationalSummary) -> Result<(), PublishError> {
        let path = self.output_dir.join("README.md");
        let rendered = readme::render(summary, chrono::Local::now());
        fs::write(&path, rendered)?;
        log::info!("💾 Wrote '{}'", path.display());

        // Machine-readable snapshot for downstream reporting
        let json_path = self.output_dir.join("summary.json");
        let json = serde_json::to_string_pretty(summary).map_err(PublishError::Serialize)?;
        fs::write(&json_path, json)?;
        log::debug!("Wrote '{}'", json_path.display());
        Ok(())
    }

    async fn commit_and_push(&self) -> Result<(), PublishError> {
        if !self.git_enabled {
            log::info!("Git publishing disabled, outputs left uncommitted");
            return Ok(());
        }
        git::commit_and_push(&self.output_dir, self.push_policy).await
    }
}
