//! Reconnect scheduler.
//!
//! Listens for `TIMED_OUT`, waits a fixed delay and re-invokes
//! [`Client::establish`]. A failing retry re-fires `TIMED_OUT`, forming a
//! loop that runs until establishment succeeds or the client is torn down.
//! There is no attempt cap and no backoff growth; the delay is constant.
//!
//! The scheduled task handle is kept on the client so [`Client::teardown`]
//! can cancel a pending reconnect instead of letting it resurrect the
//! session after shutdown.

use std::sync::atomic::Ordering;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::task::JoinHandle;

use super::Client;
use crate::events::{Priority, Signal, SignalKind};

/// Default delay between reconnect attempts.
pub const DEFAULT_RECONNECT_DELAY_MS: u64 = 2_000;

/// Cancellable handle of the one pending reconnect task.
#[derive(Default)]
pub(crate) struct PendingReconnect {
    task: Mutex<Option<JoinHandle<()>>>,
}

impl PendingReconnect {
    fn replace(&self, handle: JoinHandle<()>) {
        let previous = self
            .task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(handle);
        if let Some(previous) = previous {
            // Attempts are serialized, so a lingering handle has finished.
            previous.abort();
        }
    }

    pub(crate) fn cancel(&self) {
        if let Some(task) = self
            .task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            task.abort();
        }
    }
}

impl Client {
    /// Enable auto-reconnect with a fixed delay in milliseconds.
    ///
    /// Registers a `TIMED_OUT` handler that emits a `DISCONNECT` signal
    /// naming the delay, increments the attempt counter and schedules a
    /// one-shot re-invocation of [`establish`](Client::establish). The
    /// counter resets to zero once a connection is made.
    pub fn enable_auto_reconnect(&self, delay_ms: u64) -> &Self {
        let weak = Arc::downgrade(&self.inner);
        self.inner
            .events
            .on(SignalKind::TimedOut, Priority::Normal, move |_signal| {
                let Some(inner) = weak.upgrade() else {
                    return;
                };
                if inner.closing.load(Ordering::SeqCst) {
                    return;
                }

                inner.events.emit(Signal::disconnect(format!(
                    "disconnected, attempting reconnect in {delay_ms}ms"
                )));
                let attempt = inner.attempts.fetch_add(1, Ordering::SeqCst) + 1;
                tracing::warn!("connection lost, scheduling attempt {attempt} in {delay_ms}ms");

                let client = Client {
                    inner: Arc::clone(&inner),
                };
                let handle = tokio::spawn(async move {
                    tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                    if client.inner.closing.load(Ordering::SeqCst) {
                        return;
                    }
                    if let Err(err) = client.establish().await {
                        // The failed attempt fired TIMED_OUT again; the
                        // next reconnect is already on its way.
                        tracing::debug!("reconnect attempt failed: {err}");
                    }
                });
                inner.reconnect.replace(handle);
            });
        self
    }
}
