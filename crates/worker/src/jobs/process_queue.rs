//! Drain job: one cycle-driver invocation per tick.

use tracing::info;

use super::scheduler::{Job, JobFrequency};
use crate::error::PipelineError;
use crate::services::QueueProcessor;

pub struct ProcessQueueJob {
    processor: QueueProcessor,
    minutes: u64,
}

impl ProcessQueueJob {
    pub fn new(processor: QueueProcessor, minutes: u64) -> Self {
        Self { processor, minutes }
    }
}

#[async_trait::async_trait]
impl Job for ProcessQueueJob {
    fn name(&self) -> &'static str {
        "process_queue"
    }

    fn frequency(&self) -> JobFrequency {
        JobFrequency::Minutes(self.minutes)
    }

    async fn execute(&self) -> Result<(), PipelineError> {
        let report = self.processor.process_queue().await?;

        if !report.waiting_for_reset {
            info!(
                enumerated = report.enumerated,
                folded_full = report.folded_full,
                remaining = report.remaining,
                finalized = report.finalized,
                "Drain invocation done"
            );
        }
        Ok(())
    }
}
