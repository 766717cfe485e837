//! Domain layer for the analytics worker.
//!
//! This crate contains:
//! - Domain models (telemetry records, metadata, queue, aggregate documents)
//! - Folding, finalization and schema migration logic
//! - The record store and collaborator traits

pub mod models;
pub mod services;
