//! History snapshot job.

use super::scheduler::{Job, JobFrequency};
use crate::error::PipelineError;
use crate::services::HistorySnapshotter;

pub struct UpdateHistoryJob {
    snapshotter: HistorySnapshotter,
    minutes: u64,
}

impl UpdateHistoryJob {
    pub fn new(snapshotter: HistorySnapshotter, minutes: u64) -> Self {
        Self {
            snapshotter,
            minutes,
        }
    }
}

#[async_trait::async_trait]
impl Job for UpdateHistoryJob {
    fn name(&self) -> &'static str {
        "update_history"
    }

    fn frequency(&self) -> JobFrequency {
        if self.minutes == 60 {
            JobFrequency::Hourly
        } else {
            JobFrequency::Minutes(self.minutes)
        }
    }

    async fn execute(&self) -> Result<(), PipelineError> {
        self.snapshotter.update_history().await?;
        Ok(())
    }
}
