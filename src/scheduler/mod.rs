mod scheduler;
mod stop;

pub use scheduler::{RunSummary, Scheduler, SchedulerCreationError, SchedulerError};
pub use stop::{StopHandle, StopToken, stop_channel};
