//! Pipeline services and HTTP collaborators.

pub mod allow_lists;
pub mod documents;
pub mod history;
pub mod queue_processor;
pub mod rebuild_hook;

pub use allow_lists::HttpAllowListSource;
pub use history::{HistoryReport, HistorySnapshotter};
pub use queue_processor::{DrainReport, PipelineSettings, QueueProcessor, ResetOutcome};
pub use rebuild_hook::HttpRebuildTrigger;
