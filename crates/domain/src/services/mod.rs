//! Domain services for the analytics pipeline.
//!
//! Pure folding and finalization logic plus the seams to storage and
//! external collaborators.

pub mod collaborators;
pub mod combine;
pub mod finalize;
pub mod migration;
pub mod record_store;

pub use collaborators::{
    AllowListError, AllowListSource, MockRebuildTrigger, NoopRebuildTrigger, RebuildHookError,
    RebuildTrigger, StaticAllowLists,
};

pub use combine::{combine_metadata, combine_record, LOCAL_ADDON_PREFIX};
pub use finalize::{build_current, history_point, period_start, refresh_current};
pub use migration::{migrate_analytics, needs_migration, MigrationError};

pub use record_store::{
    InMemoryRecordStore, ListKey, ListPage, PutOptions, RecordStore, StoreError, StoredValue,
    Versioned,
};
