/// Configuration management for the dispatcher.
pub mod config;
/// Telemetry setup for logging and metrics.
pub mod telemetry;
