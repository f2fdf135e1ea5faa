use std::sync::Arc;

use compio::runtime::spawn;
use snafu::Snafu;
use snafu::prelude::*;
use tracing::{debug, info};

use crate::application::{ConfigError, RuntimeConfig};
use crate::cli::Cli;
use crate::control;
use crate::logging::{self, LogGuard, LoggingSetupError};
use crate::scheduler::{Scheduler, SchedulerCreationError, SchedulerError, stop_channel};

pub struct Application;

impl Application {
    /// Validates the arguments, then installs logging. An invalid configuration
    /// leaves the log directory untouched.
    pub fn prepare(cli_args: Cli) -> Result<(RuntimeConfig, LogGuard), ApplicationError> {
        let log_dir = cli_args.log_dir.clone();
        let log_level = cli_args.log_level.clone();

        let app_config = RuntimeConfig::from(cli_args);
        app_config.validate().context(InvalidConfigSnafu)?;

        let log_guard = logging::setup_tracing(&log_dir, &log_level).context(LoggingSnafu)?;
        debug!("Runtime config: {:?}", app_config);

        Ok((app_config, log_guard))
    }

    /// Runs the scheduler until the control activity requests a stop.
    pub async fn run(app_config: RuntimeConfig) -> Result<(), ApplicationError> {
        let scheduler = Scheduler::new(Arc::new(app_config)).context(SchedulerCreationSnafu)?;
        let (stop_handle, stop_token) = stop_channel();

        spawn(async move {
            let reason = control::wait_for_stop_request().await;
            info!(
                "Stop requested ({}). Finishing the current pass and interval",
                reason
            );
            stop_handle.request_stop();
        })
        .detach();

        let summary = scheduler.run(stop_token).await.context(SchedulingSnafu)?;
        info!("Exiting after {}", summary);

        Ok(())
    }
}

#[derive(Debug, Snafu)]
pub enum ApplicationError {
    #[snafu(display("Invalid configuration"))]
    InvalidConfigError { source: ConfigError },
    #[snafu(display("Critical failure encountered while setting up logging"))]
    LoggingError { source: LoggingSetupError },
    #[snafu(display("Critical failure encountered during scheduler creation"))]
    SchedulerCreationError { source: SchedulerCreationError },
    #[snafu(display("Critical failure encountered while synchronizing"))]
    SchedulingError { source: SchedulerError },
}
