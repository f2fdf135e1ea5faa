use futures_channel::oneshot::{self, Receiver, Sender};
use tracing::debug;

/// Creates a connected pair: the handle requests a stop, the token observes it.
pub fn stop_channel() -> (StopHandle, StopToken) {
    let (sender, receiver) = oneshot::channel();
    (
        StopHandle { sender },
        StopToken {
            receiver,
            stop_requested: false,
        },
    )
}

/// Write side of the stop signal. Consumed on use, so a stop is requested at
/// most once.
#[derive(Debug)]
pub struct StopHandle {
    sender: Sender<()>,
}

impl StopHandle {
    pub fn request_stop(self) {
        if self.sender.send(()).is_err() {
            debug!("Stop requested after the scheduler was already gone");
        }
    }
}

/// Read side of the stop signal, owned by the scheduler.
///
/// A dropped [`StopHandle`] counts as a stop request, since nothing could ever
/// stop the loop afterwards.
#[derive(Debug)]
pub struct StopToken {
    receiver: Receiver<()>,
    stop_requested: bool,
}

impl StopToken {
    /// Samples the signal without waiting.
    pub fn is_stop_requested(&mut self) -> bool {
        if !self.stop_requested {
            self.stop_requested = match self.receiver.try_recv() {
                Ok(Some(())) => true,
                Ok(None) => false,
                Err(_canceled) => true,
            };
        }
        self.stop_requested
    }
}
