//! Session Sweeper - retention at the boundary.
//!
//! The core never expires sessions on its own; this sweeper is the policy
//! holder. It enumerates sessions past the staleness cutoff and deletes
//! them, one eviction event per session.

use std::sync::Arc;

use chrono::Duration;

use crate::ports::{SessionStore, SessionStoreError, TraceEvent, TraceSink};

pub struct SessionSweeper {
    store: Arc<dyn SessionStore>,
    trace: Arc<dyn TraceSink>,
    staleness: Duration,
}

impl SessionSweeper {
    pub fn new(store: Arc<dyn SessionStore>, trace: Arc<dyn TraceSink>, staleness: Duration) -> Self {
        Self {
            store,
            trace,
            staleness,
        }
    }

    /// Evicts every stale session, returning how many were removed.
    pub async fn sweep(&self) -> Result<usize, SessionStoreError> {
        let stale = self.store.stale_sessions(self.staleness).await?;
        let mut evicted = 0;

        for id in stale {
            match self.store.delete(id).await {
                Ok(()) => {
                    self.trace.emit(TraceEvent::SessionEvicted { session: id });
                    evicted += 1;
                }
                Err(e) => {
                    // One stuck record must not stop the rest of the sweep.
                    tracing::warn!(session = %id, error = %e, "failed to evict session");
                }
            }
        }

        Ok(evicted)
    }

    /// Runs `sweep` forever on a fixed interval.
    pub async fn run(&self, every: std::time::Duration) {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            match self.sweep().await {
                Ok(0) => {}
                Ok(n) => tracing::info!(evicted = n, "session sweep finished"),
                Err(e) => tracing::warn!(error = %e, "session sweep failed"),
            }
        }
    }
}
