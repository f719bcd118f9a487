use std::sync::mpsc::{channel, sync_channel, Receiver, RecvTimeoutError, Sender, TrySendError};
use std::thread::JoinHandle;
use std::time::Duration;

/// A cancellable periodic tick source backing the live watch displays.
///
/// Owning the `Ticker` is owning the schedule: [`Ticker::stop`] (or drop)
/// wakes and joins the background thread, so no timer outlives the state
/// it was sampling, whichever exit path is taken. The worker waits on a
/// stop channel rather than sleeping, so cancellation is prompt even
/// with a long period.
pub struct Ticker {
    stop: Option<Sender<()>>,
    ticks: Receiver<()>,
    handle: Option<JoinHandle<()>>,
}

impl Ticker {
    pub fn new(period: Duration) -> Self {
        let (stop, stop_rx) = channel();
        let (tx, ticks) = sync_channel(1);

        let handle = std::thread::spawn(move || loop {
            match stop_rx.recv_timeout(period) {
                Err(RecvTimeoutError::Timeout) => match tx.try_send(()) {
                    Ok(()) => {}
                    // A slow consumer just misses a tick.
                    Err(TrySendError::Full(())) => {}
                    Err(TrySendError::Disconnected(())) => break,
                },
                // Stop requested, or the handle is gone.
                Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
            }
        });

        Self {
            stop: Some(stop),
            ticks,
            handle: Some(handle),
        }
    }

    /// Block until the next tick. Returns false once the ticker has
    /// been stopped.
    pub fn wait(&self) -> bool {
        self.ticks.recv().is_ok()
    }

    pub fn stop(&mut self) {
        // Dropping the sender disconnects the stop channel, which wakes
        // the worker out of its timed wait.
        self.stop.take();

        if let Some(handle) = self.handle.take() {
            handle.join().ok();
        }
    }
}

impl Drop for Ticker {
    fn drop(&mut self) {
        self.stop();
    }
}
