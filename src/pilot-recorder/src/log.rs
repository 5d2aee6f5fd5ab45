//! The step log.
//!
//! [`StepLog`] is the ordered record of what the user has done so far. Order
//! is temporal order is replay order; the log is only ever appended to during
//! capture and shortened from the end during undo.

use crate::error::RecorderResult;
use crate::step::Step;
use chrono::{DateTime, Utc};
use pilot_core::Size;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tokio::fs;
use uuid::Uuid;

/// Ordered sequence of recorded steps.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StepLog {
    steps: Vec<Step>,
}

impl StepLog {
    /// Creates an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a step.
    pub fn push(&mut self, step: Step) {
        tracing::debug!(index = self.steps.len(), step = %step, "Recorded step");
        self.steps.push(step);
    }

    /// Removes and returns the most recent step.
    pub fn pop(&mut self) -> Option<Step> {
        self.steps.pop()
    }

    /// Keeps only the first `len` steps.
    pub fn truncate(&mut self, len: usize) {
        self.steps.truncate(len);
    }

    /// Number of steps.
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Returns true if nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// The steps in order.
    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    /// Iterates over the steps in order.
    pub fn iter(&self) -> std::slice::Iter<'_, Step> {
        self.steps.iter()
    }

    /// The most recent step.
    pub fn last(&self) -> Option<&Step> {
        self.steps.last()
    }

    /// Removes every step.
    pub fn clear(&mut self) {
        self.steps.clear();
    }

    /// Serializes the steps as a JSON array.
    pub fn to_json(&self) -> RecorderResult<String> {
        Ok(serde_json::to_string_pretty(&self.steps)?)
    }

    /// Parses a JSON array of steps.
    pub fn from_json(json: &str) -> RecorderResult<Self> {
        let steps: Vec<Step> = serde_json::from_str(json)?;
        Ok(Self { steps })
    }

    /// Writes the log with session metadata to `path`.
    pub async fn export(
        &self,
        path: impl AsRef<Path>,
        session_id: Uuid,
        terminal_size: Size,
    ) -> RecorderResult<()> {
        StepLogFile::new(session_id, terminal_size, self)
            .write(path)
            .await
    }

    /// Reads a log written by [`Self::export`].
    pub async fn import(path: impl AsRef<Path>) -> RecorderResult<Self> {
        Ok(StepLogFile::read(path).await?.into_log())
    }
}

impl From<Vec<Step>> for StepLog {
    fn from(steps: Vec<Step>) -> Self {
        Self { steps }
    }
}

impl<'a> IntoIterator for &'a StepLog {
    type Item = &'a Step;
    type IntoIter = std::slice::Iter<'a, Step>;

    fn into_iter(self) -> Self::IntoIter {
        self.steps.iter()
    }
}

/// On-disk form of an exported step log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepLogFile {
    /// Session the steps were recorded in.
    pub session_id: Uuid,
    /// When the file was written.
    pub recorded_at: DateTime<Utc>,
    /// Terminal size of the recorded application.
    pub terminal_size: Size,
    /// The recorded steps.
    pub steps: Vec<Step>,
}

impl StepLogFile {
    /// Captures the current contents of a log.
    pub fn new(session_id: Uuid, terminal_size: Size, log: &StepLog) -> Self {
        Self {
            session_id,
            recorded_at: Utc::now(),
            terminal_size,
            steps: log.steps.clone(),
        }
    }

    /// The steps as a log.
    pub fn into_log(self) -> StepLog {
        StepLog::from(self.steps)
    }

    /// Writes the file, creating parent directories as needed.
    /// Pretty-printed JSON for this file.
    pub fn to_json(&self) -> RecorderResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub async fn write(&self, path: impl AsRef<Path>) -> RecorderResult<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).await?;
        }

        fs::write(path, self.to_json()?).await?;

        tracing::info!(
            path = %path.display(),
            steps = self.steps.len(),
            "Exported step log"
        );
        Ok(())
    }

    /// Reads a file written by [`Self::write`].
    pub async fn read(path: impl AsRef<Path>) -> RecorderResult<Self> {
        let content = fs::read_to_string(path).await?;
        Ok(serde_json::from_str(&content)?)
    }
}
