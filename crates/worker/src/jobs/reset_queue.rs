//! Daily queue reset.

use tracing::debug;

use super::scheduler::{Job, JobFrequency};
use crate::error::PipelineError;
use crate::services::QueueProcessor;

pub struct ResetQueueJob {
    processor: QueueProcessor,
}

impl ResetQueueJob {
    pub fn new(processor: QueueProcessor) -> Self {
        Self { processor }
    }
}

#[async_trait::async_trait]
impl Job for ResetQueueJob {
    fn name(&self) -> &'static str {
        "reset_queue"
    }

    fn frequency(&self) -> JobFrequency {
        JobFrequency::Daily
    }

    async fn execute(&self) -> Result<(), PipelineError> {
        let outcome = self.processor.reset_queue().await?;
        debug!(?outcome, "Reset finished");
        Ok(())
    }
}
