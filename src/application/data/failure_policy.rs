use clap::ValueEnum;

/// What the scheduler does when a whole pass fails, e.g. because the source
/// root became unreadable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Default)]
pub enum FailurePolicy {
    /// Log the failure and try again after the regular interval
    #[default]
    Skip,
    /// Stop the scheduler and exit with the error
    Abort,
}
