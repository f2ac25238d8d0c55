//! Latest-request-wins gate for list fetches.

use futures::future::{abortable, AbortHandle, Aborted};
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};

/// Result of a gated fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Latest<T> {
    /// No newer fetch of the same kind started; the result is current.
    Current(T),
    /// A newer fetch started (or the gate was cancelled); drop the result.
    Superseded,
}

impl<T> Latest<T> {
    pub fn is_current(&self) -> bool {
        matches!(self, Latest::Current(_))
    }

    pub fn into_current(self) -> Option<T> {
        match self {
            Latest::Current(value) => Some(value),
            Latest::Superseded => None,
        }
    }
}

#[derive(Debug, Default)]
struct GateState {
    ticket: u64,
    running: Option<AbortHandle>,
}

/// Runs fetches of one kind so that starting a new one aborts the previous
/// one. Only the newest fetch reports [`Latest::Current`].
#[derive(Debug, Clone, Default)]
pub struct LatestOnly {
    state: Arc<Mutex<GateState>>,
}

impl LatestOnly {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn run<F, T>(&self, fetch: F) -> Latest<T>
    where
        F: Future<Output = T>,
    {
        let (fetch, handle) = abortable(fetch);
        let ticket = {
            let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            if let Some(previous) = state.running.replace(handle) {
                previous.abort();
            }
            state.ticket += 1;
            state.ticket
        };

        let outcome = fetch.await;

        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if state.ticket != ticket {
            tracing::debug!(ticket, newest = state.ticket, "superseded fetch dropped");
            return Latest::Superseded;
        }
        state.running = None;
        match outcome {
            Ok(value) => Latest::Current(value),
            Err(Aborted) => Latest::Superseded,
        }
    }

    /// Abort the running fetch, if any.
    pub fn cancel(&self) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.ticket += 1;
        if let Some(running) = state.running.take() {
            running.abort();
        }
    }
}
