//! Shared utilities for the telemetry analytics pipeline.
//!
//! This crate provides pure helpers used across all other crates:
//! - Monotonic counter bump and merge
//! - Median of numeric samples
//! - Release grouping of version distributions
//! - Opaque listing cursors

pub mod counters;
pub mod pagination;
pub mod stats;
pub mod versions;
