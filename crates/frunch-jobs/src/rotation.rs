//! The rotation loop: one published picture per tick.
//!
//! Each tick races the selection against the display interval and waits for
//! both, bounded by the outer timeout. A selection still running when the
//! timeout fires keeps running in its own task, but its result is dropped
//! and nothing is published for that tick.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::mpsc;
use tokio::time::{sleep, timeout};
use tracing::{debug, error, info, warn};

use crate::handle::LoopHandle;
use crate::scheduler::PictureScheduler;

/// What happened during one rotation tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// A picture was published; holds its id.
    Published(String),
    /// Nothing eligible to show.
    Empty,
    /// Selection failed; the error was logged.
    Failed,
    /// Selection did not finish before the outer timeout.
    TimedOut,
}

/// Run one tick: select, wait at least `dwell`, publish.
pub async fn tick(scheduler: &Arc<PictureScheduler>, dwell: Duration, limit: Duration) -> TickOutcome {
    let start = Instant::now();
    let selector = Arc::clone(scheduler);
    let selection = tokio::spawn(async move { selector.next_picture().await });

    let both = async move {
        let (picked, _) = tokio::join!(selection, sleep(dwell));
        picked
    };

    match timeout(limit, both).await {
        Err(_) => {
            warn!(
                timeout_secs = limit.as_secs(),
                "Picture selection timed out, skipping tick"
            );
            TickOutcome::TimedOut
        }
        Ok(Err(join_error)) => {
            error!(error = %join_error, "Picture selection task failed");
            TickOutcome::Failed
        }
        Ok(Ok(Err(e))) if e.is_not_found() => {
            debug!("No eligible picture, skipping tick");
            TickOutcome::Empty
        }
        Ok(Ok(Err(e))) => {
            warn!(error = %e, transient = e.is_transient(), "Picture selection failed");
            TickOutcome::Failed
        }
        Ok(Ok(Ok(picture))) => {
            let id = picture.id.clone();
            scheduler.set_picture(picture).await;
            debug!(
                picture_id = %id,
                duration_ms = start.elapsed().as_millis() as u64,
                "Picture published"
            );
            TickOutcome::Published(id)
        }
    }
}

/// Start the rotation loop. The first picture is published immediately.
pub fn start_rotation(scheduler: Arc<PictureScheduler>) -> LoopHandle {
    LoopHandle::spawn("rotation", move |mut shutdown_rx| async move {
        run(scheduler, &mut shutdown_rx).await;
    })
}

async fn run(scheduler: Arc<PictureScheduler>, shutdown_rx: &mut mpsc::Receiver<()>) {
    let interval = scheduler.config().interval;
    let limit = scheduler.config().timeout;
    info!(
        interval_secs = interval.as_secs(),
        timeout_secs = limit.as_secs(),
        "Rotation loop started"
    );

    let mut dwell = Duration::ZERO;
    loop {
        tokio::select! {
            _ = shutdown_rx.recv() => break,
            _ = tick(&scheduler, dwell, limit) => {}
        }
        dwell = interval;
    }

    info!("Rotation loop stopped");
}
