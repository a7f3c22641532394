//! Background jobs.

pub mod invite_sync;
pub mod pool_metrics;
pub mod scheduler;

pub use invite_sync::InviteSyncJob;
pub use pool_metrics::PoolMetricsJob;
pub use scheduler::{Job, JobFrequency, JobScheduler};
