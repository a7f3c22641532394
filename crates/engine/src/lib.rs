pub mod config;
pub mod error;
pub mod gateway;
pub mod jobs;
pub mod logging;
pub mod services;
