pub mod analysis;
pub mod config;
pub mod error;
pub mod providers;
pub mod telemetry;
