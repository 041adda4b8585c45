//! Control handle for long-lived background loops.

use std::future::Future;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

use frunch_core::{Error, Result};

/// Handle for controlling a running loop.
///
/// Dropping the handle closes the shutdown channel, which the loop treats
/// the same as an explicit shutdown.
pub struct LoopHandle {
    name: &'static str,
    shutdown_tx: mpsc::Sender<()>,
    task: JoinHandle<()>,
}

impl LoopHandle {
    /// Spawn `body`, handing it the receiving end of the shutdown channel.
    pub(crate) fn spawn<F, Fut>(name: &'static str, body: F) -> Self
    where
        F: FnOnce(mpsc::Receiver<()>) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);
        let task = tokio::spawn(body(shutdown_rx));
        debug!(loop_name = name, "Loop spawned");
        Self {
            name,
            shutdown_tx,
            task,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Signal the loop to stop at its next suspension point.
    pub async fn shutdown(&self) -> Result<()> {
        self.shutdown_tx
            .send(())
            .await
            .map_err(|_| Error::Internal(format!("{} loop is no longer running", self.name)))?;
        Ok(())
    }

    /// Signal the loop and wait for it to exit.
    pub async fn stop(self) -> Result<()> {
        // A closed channel means the loop already exited.
        let _ = self.shutdown_tx.send(()).await;
        self.task
            .await
            .map_err(|e| Error::Internal(format!("{} loop panicked: {}", self.name, e)))
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}
