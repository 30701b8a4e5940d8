use std::sync::Arc;

use tokio::sync::mpsc;

use super::{ApplicationOutcome, OutcomeStore};

/// Handle for recording outcomes from the orchestrator.
///
/// Cheap to clone. Outcomes travel through a bounded channel to the
/// [`OutcomeWriter`], so recording never waits on disk I/O beyond channel
/// back-pressure.
#[derive(Clone)]
pub struct OutcomeHandle {
    tx: mpsc::Sender<ApplicationOutcome>,
}

impl OutcomeHandle {
    pub fn new(tx: mpsc::Sender<ApplicationOutcome>) -> Self {
        Self { tx }
    }

    /// Record an outcome. A closed channel is logged, not propagated.
    pub async fn record(&self, outcome: ApplicationOutcome) {
        if let Err(e) = self.tx.send(outcome).await {
            tracing::error!("Failed to record outcome: {}", e);
        }
    }
}

/// Background task draining the outcome channel into a store.
pub struct OutcomeWriter {
    rx: mpsc::Receiver<ApplicationOutcome>,
    store: Arc<dyn OutcomeStore>,
}

impl OutcomeWriter {
    pub fn new(rx: mpsc::Receiver<ApplicationOutcome>, store: Arc<dyn OutcomeStore>) -> Self {
        Self { rx, store }
    }

    /// Consume outcomes until every handle has been dropped.
    ///
    /// Spawn with `tokio::spawn(writer.run())` and await the join handle
    /// after the run to be sure everything reached the store.
    pub async fn run(mut self) -> usize {
        tracing::debug!("Outcome writer started");
        let mut written = 0;

        while let Some(outcome) = self.rx.recv().await {
            match self.store.insert(&outcome) {
                Ok(_) => written += 1,
                Err(e) => tracing::error!(
                    listing_id = %outcome.listing_id,
                    "Failed to write outcome: {}",
                    e
                ),
            }
        }

        tracing::debug!(written, "Outcome writer shutting down");
        written
    }
}

/// Create a connected handle/writer pair.
pub fn create_outcome_log(
    store: Arc<dyn OutcomeStore>,
    buffer_size: usize,
) -> (OutcomeHandle, OutcomeWriter) {
    let (tx, rx) = mpsc::channel(buffer_size);
    (OutcomeHandle::new(tx), OutcomeWriter::new(rx, store))
}
