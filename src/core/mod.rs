pub mod alerts;
pub mod orchestrator;
pub mod rate_limiter;
pub mod scheduler;
pub mod timeseries;
