//! Persistence layer for the invite tracker.
//!
//! This crate contains:
//! - Database connection management
//! - Entity definitions (database row mappings)
//! - Repository implementations for the invite code registry, member
//!   ledger, join log, rank ladder, and audit sink

pub mod db;
pub mod entities;
pub mod metrics;
pub mod repositories;
