//! Persistence layer for the analytics worker.
//!
//! This crate contains:
//! - Database connection management
//! - Entity definitions (database row mappings)
//! - The PostgreSQL record store

pub mod db;
pub mod entities;
pub mod metrics;
pub mod repositories;
