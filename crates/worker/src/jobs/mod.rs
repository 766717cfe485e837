//! Background job scheduler and job implementations.

mod process_queue;
mod purge_expired;
mod reset_queue;
mod scheduler;
mod update_history;

pub use process_queue::ProcessQueueJob;
pub use purge_expired::PurgeExpiredJob;
pub use reset_queue::ResetQueueJob;
pub use scheduler::{run_job, Job, JobFrequency, JobScheduler};
pub use update_history::UpdateHistoryJob;
