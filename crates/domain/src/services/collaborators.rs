//! External collaborators of the pipeline: the allow-list source and the
//! site rebuild hook.

use crate::models::AllowLists;
use std::sync::atomic::{AtomicUsize, Ordering};
use thiserror::Error;

/// Errors fetching allow-lists.
#[derive(Debug, Error)]
pub enum AllowListError {
    #[error("Allow-list request failed: {0}")]
    Request(String),

    #[error("Allow-list endpoint returned status {0}")]
    Status(u16),

    #[error("Allow-list response malformed: {0}")]
    Malformed(String),
}

/// Errors triggering the rebuild hook.
#[derive(Debug, Error)]
pub enum RebuildHookError {
    #[error("Rebuild hook request failed: {0}")]
    Request(String),

    #[error("Rebuild hook returned status {0}")]
    Status(u16),
}

/// Source of the custom integration and OS board allow-lists.
#[async_trait::async_trait]
pub trait AllowListSource: Send + Sync {
    async fn fetch(&self) -> Result<AllowLists, AllowListError>;
}

/// Notifies the downstream site that fresh aggregates are available.
#[async_trait::async_trait]
pub trait RebuildTrigger: Send + Sync {
    async fn trigger(&self) -> Result<(), RebuildHookError>;
}

/// Allow-list source serving fixed lists.
#[derive(Debug, Clone, Default)]
pub struct StaticAllowLists {
    lists: AllowLists,
    /// Whether to simulate an unreachable endpoint.
    pub simulate_failure: bool,
}

impl StaticAllowLists {
    pub fn new(lists: AllowLists) -> Self {
        Self {
            lists,
            simulate_failure: false,
        }
    }

    /// Create a source that always fails.
    pub fn failing() -> Self {
        Self {
            lists: AllowLists::default(),
            simulate_failure: true,
        }
    }
}

#[async_trait::async_trait]
impl AllowListSource for StaticAllowLists {
    async fn fetch(&self) -> Result<AllowLists, AllowListError> {
        if self.simulate_failure {
            tracing::warn!("Static allow-list source simulating failure");
            return Err(AllowListError::Request("Simulated failure".to_string()));
        }
        Ok(self.lists.clone())
    }
}

/// Rebuild trigger that records calls instead of sending them.
#[derive(Debug, Default)]
pub struct MockRebuildTrigger {
    /// Whether to simulate a failing hook.
    pub simulate_failure: bool,
    calls: AtomicUsize,
}

impl MockRebuildTrigger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            simulate_failure: true,
            calls: AtomicUsize::new(0),
        }
    }

    /// Number of trigger attempts so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl RebuildTrigger for MockRebuildTrigger {
    async fn trigger(&self) -> Result<(), RebuildHookError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.simulate_failure {
            tracing::warn!("Mock rebuild hook simulating failure");
            return Err(RebuildHookError::Status(500));
        }
        tracing::info!("Mock: Would trigger site rebuild");
        Ok(())
    }
}

/// Rebuild trigger for deployments without a hook.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopRebuildTrigger;

#[async_trait::async_trait]
impl RebuildTrigger for NoopRebuildTrigger {
    async fn trigger(&self) -> Result<(), RebuildHookError> {
        tracing::debug!("No rebuild hook configured, skipping");
        Ok(())
    }
}
