//! Sources of a stop request.
//!
//! The scheduler only sees a [`StopHandle`](crate::scheduler::StopHandle) being
//! fired; whether the request came from the console or from an interrupt is
//! decided here.

mod console;

use std::io;
use std::pin::pin;
use std::thread;

use derive_more::Display;
use futures::future::{self, Either};
use futures_channel::oneshot;
use supports_color::Stream;
use tracing::{debug, info, warn};

use console::{ConsoleOutcome, EXIT_COMMAND, read_until_exit};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum StopReason {
    #[display("\"{}\" entered on the console", EXIT_COMMAND)]
    ExitCommand,
    #[display("interrupt signal")]
    Interrupt,
}

/// Waits until either the console exit command or Ctrl-C arrives.
pub async fn wait_for_stop_request() -> StopReason {
    if supports_color::on(Stream::Stdout).is_none() {
        colored::control::set_override(false);
    }

    first_stop_request(console_stop_request(), interrupt_stop_request()).await
}

/// Resolves with whichever source asks to stop first.
async fn first_stop_request(
    console: impl Future<Output = StopReason>,
    interrupt: impl Future<Output = StopReason>,
) -> StopReason {
    let console = pin!(console);
    let interrupt = pin!(interrupt);

    match future::select(console, interrupt).await {
        Either::Left((reason, _)) | Either::Right((reason, _)) => reason,
    }
}

/// Reads stdin on a plain thread, a blocked read must not keep the process
/// alive once the scheduler is done.
async fn console_stop_request() -> StopReason {
    let (sender, receiver) = oneshot::channel();

    let spawned = thread::Builder::new()
        .name("console-control".into())
        .spawn(move || {
            let outcome = read_until_exit(io::stdin().lock(), io::stdout());
            if sender.send(outcome).is_err() {
                debug!("Console outcome arrived after the stop request was handled");
            }
        });
    if let Err(e) = spawned {
        warn!("Failed to start console control thread: {}", e);
        return future::pending().await;
    }

    stop_reason_from_console(receiver).await
}

/// Only the exit command stops; a closed console leaves Ctrl-C as the sole source.
async fn stop_reason_from_console(receiver: oneshot::Receiver<ConsoleOutcome>) -> StopReason {
    match receiver.await {
        Ok(ConsoleOutcome::Exit) => StopReason::ExitCommand,
        Ok(ConsoleOutcome::Closed) | Err(_) => {
            info!("Console input closed. Use Ctrl-C to stop the program");
            future::pending().await
        }
    }
}

async fn interrupt_stop_request() -> StopReason {
    match compio::signal::ctrl_c().await {
        Ok(()) => StopReason::Interrupt,
        Err(e) => {
            warn!("Failed to listen for the interrupt signal: {}", e);
            future::pending().await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::FutureExt as _;

    #[compio::test]
    async fn test_console_request_wins_over_pending_interrupt() {
        let reason = first_stop_request(
            future::ready(StopReason::ExitCommand),
            future::pending::<StopReason>(),
        )
        .await;

        assert_eq!(reason, StopReason::ExitCommand);
    }

    #[compio::test]
    async fn test_interrupt_wins_over_pending_console() {
        let reason = first_stop_request(
            future::pending::<StopReason>(),
            future::ready(StopReason::Interrupt),
        )
        .await;

        assert_eq!(reason, StopReason::Interrupt);
    }

    #[test]
    fn test_no_stop_request_while_both_sources_wait() {
        let request = first_stop_request(
            future::pending::<StopReason>(),
            future::pending::<StopReason>(),
        );

        assert_eq!(request.now_or_never(), None);
    }

    #[test]
    fn test_exit_outcome_becomes_exit_command() {
        let (sender, receiver) = oneshot::channel();
        sender
            .send(ConsoleOutcome::Exit)
            .expect("Receiver should still be alive");

        let reason = stop_reason_from_console(receiver).now_or_never();

        assert_eq!(reason, Some(StopReason::ExitCommand));
    }

    #[test]
    fn test_closed_console_never_stops() {
        let (sender, receiver) = oneshot::channel();
        sender
            .send(ConsoleOutcome::Closed)
            .expect("Receiver should still be alive");

        assert_eq!(stop_reason_from_console(receiver).now_or_never(), None);
    }

    #[test]
    fn test_vanished_console_thread_never_stops() {
        let (sender, receiver) = oneshot::channel::<ConsoleOutcome>();
        drop(sender);

        assert_eq!(stop_reason_from_console(receiver).now_or_never(), None);
    }
}
