//! Domain models for the telemetry analytics pipeline.

pub mod accumulator;
pub mod allow_list;
pub mod analytics;
pub mod keys;
pub mod metadata;
pub mod queue;
pub mod record;

pub use accumulator::{
    Accumulator, AddonTally, CustomIntegrationTally, EnergyTally, InstallationTypeCounts,
    OperatingSystemTally, SupervisorTally,
};
pub use allow_list::{AllowLists, Classifier};
pub use analytics::{AnalyticsSnapshot, CurrentAnalytics, HistoryPoint, ANALYTICS_SCHEMA_VERSION};
pub use metadata::{InstallationTypeCode, MetadataExtra, RecordMetadata};
pub use queue::{QueuePhase, QueueState, QUEUE_SCHEMA_VERSION};
pub use record::{
    AddonUsage, CustomIntegrationUsage, EnergyInfo, InstallationType, OperatingSystemInfo,
    RecorderInfo, SupervisorInfo, TelemetryRecord,
};
