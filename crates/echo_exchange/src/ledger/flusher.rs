//! Background persistence for the ledger.
//!
//! One dedicated thread wakes every interval and flushes the store if it
//! is dirty. Stopping the flusher (explicitly or by dropping it) joins the
//! thread and then performs a final flush regardless of the dirty flag.

use crossbeam_channel::{bounded, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use super::LedgerStore;

/// Periodic flush task owned by the composition root.
#[derive(Debug)]
pub struct LedgerFlusher {
    store: Arc<LedgerStore>,
    shutdown_tx: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl LedgerFlusher {
    /// Spawns the flush thread.
    #[must_use]
    pub fn start(store: Arc<LedgerStore>, interval: Duration) -> Self {
        let (shutdown_tx, shutdown_rx) = bounded::<()>(1);
        let worker_store = Arc::clone(&store);

        let handle = thread::Builder::new()
            .name("echo-ledger-flush".to_string())
            .spawn(move || loop {
                match shutdown_rx.recv_timeout(interval) {
                    Err(RecvTimeoutError::Timeout) => {
                        if let Err(e) = worker_store.flush_if_dirty() {
                            tracing::error!("Failed to save ledger: {}", e);
                        }
                    }
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                }
            });

        let handle = match handle {
            Ok(handle) => Some(handle),
            Err(e) => {
                tracing::error!(
                    "Could not spawn ledger flush thread, saving on shutdown only: {}",
                    e
                );
                None
            }
        };

        tracing::info!("Ledger flusher started, interval {:?}", interval);
        Self {
            store,
            shutdown_tx: Some(shutdown_tx),
            handle,
        }
    }

    /// Returns true while the flush thread is running.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.handle
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Stops the thread and writes the ledger one last time.
    pub fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        let Some(shutdown_tx) = self.shutdown_tx.take() else {
            return;
        };
        let _ = shutdown_tx.send(());
        drop(shutdown_tx);

        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                tracing::error!("Ledger flush thread panicked");
            }
        }

        match self.store.flush() {
            Ok(()) => tracing::info!("Ledger flushed on shutdown"),
            Err(e) => tracing::error!("Final ledger save failed: {}", e),
        }
    }
}

impl Drop for LedgerFlusher {
    fn drop(&mut self) {
        self.stop();
    }
}
