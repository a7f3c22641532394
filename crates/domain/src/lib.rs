//! Domain layer for the invite tracker.
//!
//! This crate contains:
//! - Domain models (InviteCode, Member, Rank, RolePlan)
//! - Pure business logic services (attribution, scoring, reconciliation)
//! - Audit event builders

pub mod models;
pub mod services;
pub mod snowflake;
