//! Single-flight coordination of token refresh
//!
//! Any number of requests can observe a 401 at the same time; only one
//! refresh call may reach the service. The coordinator holds a two-state
//! machine behind a tokio Mutex:
//!
//! - `Idle`: no cycle running. The next caller becomes the leader,
//!   installs a fresh watch channel, and spawns the executor on a
//!   detached task.
//! - `Refreshing`: a cycle is in flight. Callers subscribe to the current
//!   channel and wait.
//!
//! The detached task delivers the outcome and resets the state to `Idle`
//! under the same lock, so a late caller either joins the live cycle or
//! starts a new one, never something in between. Because the executor runs
//! on its own task, a caller that goes away (timeout, dropped future)
//! cannot abort the refresh the remaining waiters depend on.
//!
//! A failed cycle is not retried here. Each call to `await_refresh` after
//! the cycle resolves starts over from `Idle`.

use std::sync::Arc;

use tokio::sync::{Mutex, watch};
use tracing::{debug, warn};

use crate::refresh::{RefreshExecutor, RefreshOutcome};

enum CycleState {
    Idle,
    Refreshing(watch::Receiver<Option<RefreshOutcome>>),
}

/// Serializes refresh cycles and fans the outcome out to every waiter.
pub struct RefreshCoordinator {
    executor: Arc<RefreshExecutor>,
    state: Arc<Mutex<CycleState>>,
}

impl RefreshCoordinator {
    pub fn new(executor: RefreshExecutor) -> Self {
        Self {
            executor: Arc::new(executor),
            state: Arc::new(Mutex::new(CycleState::Idle)),
        }
    }

    /// Join the running refresh cycle, or start one, and wait for its
    /// outcome.
    ///
    /// Every caller that waits on the same cycle receives a clone of the
    /// same outcome. Wakeup order between waiters is not specified.
    pub async fn await_refresh(&self) -> RefreshOutcome {
        let mut rx = {
            let mut state = self.state.lock().await;
            match &*state {
                CycleState::Refreshing(rx) => {
                    debug!("joining refresh cycle in flight");
                    rx.clone()
                }
                CycleState::Idle => {
                    let (tx, rx) = watch::channel(None);
                    *state = CycleState::Refreshing(rx.clone());
                    debug!("starting refresh cycle");

                    let executor = self.executor.clone();
                    let cycle_state = self.state.clone();
                    tokio::spawn(async move {
                        let outcome = executor.refresh().await;
                        metrics::counter!(
                            "auth_refresh_cycles_total",
                            "outcome" => outcome.label()
                        )
                        .increment(1);

                        // Deliver and go Idle under one lock so the cycle
                        // boundary is atomic for joiners.
                        let mut state = cycle_state.lock().await;
                        let _ = tx.send(Some(outcome));
                        *state = CycleState::Idle;
                    });

                    rx
                }
            }
        };

        let outcome = match rx.wait_for(Option::is_some).await {
            Ok(value) => value.clone(),
            Err(_) => {
                // Sender dropped without delivering (refresh task died).
                warn!("refresh cycle ended without an outcome");
                None
            }
        };

        outcome.unwrap_or(RefreshOutcome::Failure)
    }
}
