use std::path::PathBuf;
use std::time::Duration;

use snafu::{Snafu, ensure};

use crate::application::data::FailurePolicy;
use crate::cli::Cli;
use crate::ext::BestEffortPathExt;

#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub source_root: PathBuf,
    pub replica_root: PathBuf,
    pub interval: Duration,
    pub failure_policy: FailurePolicy,
}

impl RuntimeConfig {
    /// Rejects roots that contain each other, since a pass would then walk
    /// into its own output.
    pub fn validate(&self) -> Result<(), ConfigError> {
        ensure!(
            !self.source_root.overlaps_with(&self.replica_root),
            OverlappingRootsSnafu {
                source_root: self.source_root.best_effort_path_display(),
                replica_root: self.replica_root.best_effort_path_display(),
            }
        );
        Ok(())
    }
}

impl From<Cli> for RuntimeConfig {
    fn from(cli: Cli) -> Self {
        Self {
            source_root: cli.source,
            replica_root: cli.replica,
            interval: Duration::from_secs(cli.interval.get()),
            failure_policy: cli.on_error,
        }
    }
}

#[derive(Debug, Snafu)]
pub enum ConfigError {
    #[snafu(display(
        "Source {} and replica {} must not contain each other",
        source_root,
        replica_root
    ))]
    OverlappingRootsError {
        source_root: String,
        replica_root: String,
    },
}
