mod failure_policy;
mod log_level;

pub use failure_policy::FailurePolicy;
pub use log_level::LogLevel;
