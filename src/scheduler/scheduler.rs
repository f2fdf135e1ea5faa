use std::num::NonZeroUsize;
use std::sync::Arc;

use compio::dispatcher::{Dispatcher, DispatcherBuilder};
use compio::time::sleep;
use derive_more::Display;
use snafu::{Report, ResultExt, Snafu};
use tracing::{debug, error, info, warn};

use crate::application::RuntimeConfig;
use crate::application::data::FailurePolicy;
use crate::ext::BestEffortPathExt;
use crate::reconciler::{PassSummary, ReconcileError, Reconciler};
use crate::scheduler::StopToken;

/// Passes never overlap, so a single worker is all the dispatcher needs
const PASS_WORKER_THREADS: NonZeroUsize = NonZeroUsize::MIN;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Display)]
#[display("{completed_passes} passes completed, {failed_passes} passes failed")]
pub struct RunSummary {
    pub completed_passes: usize,
    pub failed_passes: usize,
}

/// Runs reconciliation passes back to back, separated by the configured
/// interval, until a stop is requested.
pub struct Scheduler {
    dispatcher: Dispatcher,
    config: Arc<RuntimeConfig>,
}

impl Scheduler {
    pub fn new(config: Arc<RuntimeConfig>) -> Result<Self, SchedulerCreationError> {
        let dispatcher = DispatcherBuilder::new()
            .worker_threads(PASS_WORKER_THREADS)
            .build()
            .context(DispatcherSnafu)?;

        Ok(Self { dispatcher, config })
    }

    /// Main loop. The stop token is only sampled before a pass, so a pass that
    /// started always finishes, followed by its sleep.
    pub async fn run(&self, mut stop_token: StopToken) -> Result<RunSummary, SchedulerError> {
        info!(
            "Syncing {} to {} every {} seconds",
            self.config.source_root.best_effort_path_display(),
            self.config.replica_root.best_effort_path_display(),
            self.config.interval.as_secs_f64()
        );

        let mut summary = RunSummary::default();

        while !stop_token.is_stop_requested() {
            let pass_number = summary.completed_passes + summary.failed_passes + 1;
            debug!("Starting synchronization pass {}", pass_number);

            match self.run_pass().await {
                Ok(pass) if pass.is_clean() => {
                    summary.completed_passes += 1;
                    info!("Pass {} finished: {}", pass_number, pass);
                }
                Ok(pass) => {
                    summary.completed_passes += 1;
                    warn!("Pass {} finished with failures: {}", pass_number, pass);
                }
                Err(err) => {
                    summary.failed_passes += 1;
                    match self.config.failure_policy {
                        FailurePolicy::Skip => {
                            error!(
                                "Pass {} failed, the next attempt follows the regular interval: {}",
                                pass_number,
                                Report::from_error(&err)
                            );
                        }
                        FailurePolicy::Abort => return Err(err),
                    }
                }
            }

            sleep(self.config.interval).await;
        }

        info!("Stop requested. Scheduler finished: {}", summary);
        Ok(summary)
    }

    /// Runs one pass on the dispatcher thread and waits for its outcome.
    async fn run_pass(&self) -> Result<PassSummary, SchedulerError> {
        let reconciler = Reconciler::new(&self.config.source_root, &self.config.replica_root);

        let receiver = self
            .dispatcher
            .dispatch(move || async move { reconciler.reconcile() })
            .map_err(|e| SchedulerError::PassDispatchError {
                error: e.to_string(),
            })?;

        receiver
            .await
            .context(PassCanceledSnafu)?
            .context(PassFailedSnafu)
    }
}

#[derive(Debug, Snafu)]
pub enum SchedulerCreationError {
    #[snafu(display("Failed to create the pass dispatcher"))]
    DispatcherError { source: std::io::Error },
}

#[derive(Debug, Snafu)]
pub enum SchedulerError {
    #[snafu(display("Failed to dispatch a synchronization pass: {}", error))]
    PassDispatchError { error: String },
    #[snafu(display("Synchronization pass got cancelled"))]
    PassCanceledError {
        source: futures_channel::oneshot::Canceled,
    },
    #[snafu(display("Synchronization pass failed"))]
    PassFailedError { source: ReconcileError },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::Path;
    use std::time::Duration;
    use tempfile::TempDir;

    use crate::scheduler::stop_channel;

    const TEST_INTERVAL: Duration = Duration::from_millis(10);

    fn config(root: &Path, failure_policy: FailurePolicy) -> Arc<RuntimeConfig> {
        Arc::new(RuntimeConfig {
            source_root: root.join("source"),
            replica_root: root.join("replica"),
            interval: TEST_INTERVAL,
            failure_policy,
        })
    }

    fn source_with_file(root: &Path) {
        fs::create_dir_all(root.join("source/sub")).expect("Failed to create source");
        fs::write(root.join("source/sub/file.txt"), "content").expect("Failed to write file");
    }

    #[compio::test]
    async fn test_no_pass_runs_when_stop_was_requested_up_front() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        source_with_file(temp_dir.path());
        let scheduler = Scheduler::new(config(temp_dir.path(), FailurePolicy::Skip))
            .expect("Failed to create scheduler");
        let (handle, token) = stop_channel();
        handle.request_stop();

        let summary = scheduler.run(token).await.expect("Scheduler failed");

        assert_eq!(summary, RunSummary::default());
        assert!(!temp_dir.path().join("replica").exists());
    }

    #[compio::test]
    async fn test_dropped_stop_handle_ends_the_loop() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        source_with_file(temp_dir.path());
        let scheduler = Scheduler::new(config(temp_dir.path(), FailurePolicy::Skip))
            .expect("Failed to create scheduler");
        let (handle, token) = stop_channel();
        drop(handle);

        let summary = scheduler.run(token).await.expect("Scheduler failed");

        assert_eq!(summary.completed_passes, 0);
    }

    #[compio::test]
    async fn test_passes_run_until_stop_is_requested() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        source_with_file(temp_dir.path());
        let scheduler = Scheduler::new(config(temp_dir.path(), FailurePolicy::Skip))
            .expect("Failed to create scheduler");
        let (handle, token) = stop_channel();

        let (result, ()) = futures::join!(scheduler.run(token), async move {
            sleep(Duration::from_millis(100)).await;
            handle.request_stop();
        });

        let summary = result.expect("Scheduler failed");
        assert!(summary.completed_passes >= 1);
        assert_eq!(summary.failed_passes, 0);
        assert_eq!(
            fs::read_to_string(temp_dir.path().join("replica/sub/file.txt"))
                .expect("Replica file missing"),
            "content"
        );
    }

    #[compio::test]
    async fn test_skip_policy_survives_a_missing_source() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let scheduler = Scheduler::new(config(temp_dir.path(), FailurePolicy::Skip))
            .expect("Failed to create scheduler");
        let (handle, token) = stop_channel();

        let (result, ()) = futures::join!(scheduler.run(token), async move {
            sleep(Duration::from_millis(50)).await;
            handle.request_stop();
        });

        let summary = result.expect("Skip policy should not fail the scheduler");
        assert_eq!(summary.completed_passes, 0);
        assert!(summary.failed_passes >= 1);
    }

    #[compio::test]
    async fn test_abort_policy_propagates_a_failed_pass() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let scheduler = Scheduler::new(config(temp_dir.path(), FailurePolicy::Abort))
            .expect("Failed to create scheduler");
        let (_handle, token) = stop_channel();

        let result = scheduler.run(token).await;

        assert!(matches!(
            result,
            Err(SchedulerError::PassFailedError {
                source: ReconcileError::SourceRootError { .. }
            })
        ));
    }

    #[compio::test]
    async fn test_source_changes_reach_the_replica_on_a_later_pass() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        source_with_file(temp_dir.path());
        let scheduler = Scheduler::new(config(temp_dir.path(), FailurePolicy::Skip))
            .expect("Failed to create scheduler");
        let (handle, token) = stop_channel();
        let source_file = temp_dir.path().join("source/sub/file.txt");

        let (result, ()) = futures::join!(scheduler.run(token), async move {
            sleep(Duration::from_millis(100)).await;
            fs::remove_file(&source_file).expect("Failed to remove source file");
            sleep(Duration::from_millis(100)).await;
            handle.request_stop();
        });

        let summary = result.expect("Scheduler failed");
        assert!(summary.completed_passes >= 2);
        assert!(!temp_dir.path().join("replica/sub/file.txt").exists());
        assert!(temp_dir.path().join("replica/sub").is_dir());
    }
}
