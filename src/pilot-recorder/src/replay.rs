//! Replay engine.
//!
//! Drives an application through a recorded step sequence using nothing but
//! the [`Driver`] interface. Steps are lowered to [`ReplayAction`]s and
//! interpreted one at a time, settling the application after each.

use crate::config::ReplayConfig;
use crate::error::RecorderResult;
use crate::step::{ReplayAction, Step};
use pilot_core::Driver;
use std::time::Duration;

/// Summary of a completed replay.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplayReport {
    /// Steps that produced driver actions.
    pub executed: usize,
    /// Steps with no replay action (pointer moves and releases).
    pub skipped: usize,
}

impl ReplayReport {
    /// Total number of steps visited.
    pub fn total(&self) -> usize {
        self.executed + self.skipped
    }
}

/// Replays step sequences through a driver.
#[derive(Debug, Clone, Default)]
pub struct ReplayEngine {
    step_delay: Option<Duration>,
}

impl ReplayEngine {
    /// Creates an engine with no delay between steps.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an engine paced by `config`.
    pub fn from_config(config: &ReplayConfig) -> Self {
        Self {
            step_delay: config.step_delay(),
        }
    }

    /// Builder: wait a fixed time after each step.
    pub fn with_step_delay(mut self, delay: Duration) -> Self {
        self.step_delay = Some(delay);
        self
    }

    /// Replays `steps` in order, stopping at the first driver failure.
    pub async fn replay(
        &self,
        steps: &[Step],
        driver: &mut dyn Driver,
    ) -> RecorderResult<ReplayReport> {
        let mut report = ReplayReport::default();

        for (position, step) in steps.iter().enumerate() {
            let Some(action) = step.action() else {
                tracing::trace!(position, step = %step, "No replay action");
                report.skipped += 1;
                continue;
            };

            tracing::debug!(position, step = %step, "Replaying step");
            self.perform(&action, driver).await?;
            driver.pause(self.step_delay).await?;
            report.executed += 1;
        }

        tracing::debug!(
            executed = report.executed,
            skipped = report.skipped,
            "Replay complete"
        );
        Ok(report)
    }

    async fn perform(&self, action: &ReplayAction, driver: &mut dyn Driver) -> RecorderResult<()> {
        match action {
            ReplayAction::ClickSelector {
                selector,
                offset,
                modifiers,
            } => {
                driver.click(Some(selector), *offset, *modifiers).await?;
            }
            ReplayAction::ClickNth {
                selector,
                index,
                offset,
                modifiers,
            } => {
                driver
                    .click_by_index(selector, *index, *offset, *modifiers)
                    .await?;
            }
            ReplayAction::Press { key } => {
                driver.press(key).await?;
            }
        }
        Ok(())
    }
}
