//! Background ticker that drives the matching loop at a fixed interval.
//!
//! The worker sleeps on a channel rather than the clock, so `stop()` wakes
//! it immediately and joins it; no tick runs after `stop()` returns.

use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use tracing::{debug, warn};

use crate::engine::MatchEngine;

/// Handle to a running ticker thread. Dropping it stops the ticker.
pub struct TickHandle {
    stop_tx: Sender<()>,
    join: Option<JoinHandle<()>>,
}

impl TickHandle {
    /// Stops the ticker and waits for the worker to exit.
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        // Send fails only if the worker already exited.
        let _ = self.stop_tx.send(());
        if let Some(join) = self.join.take() {
            if join.join().is_err() {
                warn!("ticker thread panicked");
            }
        }
    }
}

impl Drop for TickHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Spawns the ticker thread. Tick failures are logged and the loop keeps
/// going; the next interval retries naturally.
pub fn spawn_ticker(engine: Arc<MatchEngine>, interval: Duration) -> TickHandle {
    let (stop_tx, stop_rx) = mpsc::channel::<()>();
    let builder = std::thread::Builder::new().name("dispatch-ticker".into());
    let join = match builder.spawn(move || loop {
        match stop_rx.recv_timeout(interval) {
            Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
            Err(RecvTimeoutError::Timeout) => match engine.tick() {
                Ok(outcome) => debug!(?outcome, "tick"),
                Err(err) => warn!(error = %err, "tick failed"),
            },
        }
    }) {
        Ok(join) => Some(join),
        Err(err) => {
            warn!(error = %err, "failed to spawn ticker thread");
            None
        }
    };
    TickHandle { stop_tx, join }
}
