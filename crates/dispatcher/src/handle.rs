//! IntervalHandle - owns the periodic flush task

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, instrument};

/// Handle to a running interval flush task
pub struct IntervalHandle {
    /// Dropping the sender tells the worker to stop
    stop_tx: mpsc::Sender<()>,
    worker: JoinHandle<()>,
}

impl IntervalHandle {
    pub(crate) fn new(stop_tx: mpsc::Sender<()>, worker: JoinHandle<()>) -> Self {
        Self { stop_tx, worker }
    }

    /// Stop ticking and wait for an in-flight cycle to finish.
    ///
    /// Does not flush what is still pending; callers that want a final drain
    /// do it after this returns.
    #[instrument(name = "interval_handle_shutdown", skip(self))]
    pub async fn shutdown(self) {
        drop(self.stop_tx);
        if let Err(e) = self.worker.await {
            error!(error = ?e, "Interval task panicked");
        }
        debug!("Interval handle shutdown complete");
    }
}
