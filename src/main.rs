#![allow(clippy::enum_variant_names)]

use clap::Parser as _;
use tracing::debug;

use crate::{
    application::{Application, ApplicationError},
    cli::Cli,
};

mod application;
mod cli;
mod control;
mod ext;
mod logging;
mod reconciler;
mod scheduler;

#[compio::main]
#[snafu::report]
async fn main() -> Result<(), ApplicationError> {
    let cli_args = Cli::parse();
    let (app_config, _log_guard) = Application::prepare(cli_args.clone())?;
    debug!("Parsed CLI arguments: {cli_args:?}");

    Application::run(app_config).await?;

    Ok(())
}
