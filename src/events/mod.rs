//! Event signal bridge.
//!
//! Lifecycle transitions are broadcast as [`Signal`]s and consumed by
//! registered handlers. Handlers are registered through a single contract,
//! signal kind plus priority plus callback, and run asynchronously with
//! respect to the emitter: emission pushes onto a bounded queue consumed by
//! a configurable number of worker tasks (default 1, sequential delivery).
//!
//! For a given signal, handlers run in priority order, high before low, and
//! in registration order within one priority. No ordering is guaranteed
//! across distinct signals once more than one worker is configured.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::handshake::HandshakeFailure;

/// Default number of worker tasks delivering signals.
pub const DEFAULT_WORKERS: usize = 1;

/// Default bound of the pending-signal queue.
pub const DEFAULT_QUEUE_CAPACITY: usize = 64;

/// Kinds of signals the connection core produces and consumes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SignalKind {
    /// A session was established
    Connect,
    /// The connection was lost or closed, payload carries the reason
    Disconnect,
    /// A handshake attempt failed, payload and failure carry the reason
    TimedOut,
    /// Application-defined channel event
    Channel(String),
}

/// Handler priority at dispatch time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Priority {
    /// Runs last
    Low,
    /// Default
    Normal,
    /// Runs first
    High,
}

/// One broadcast signal.
#[derive(Debug, Clone)]
pub struct Signal {
    /// What happened
    pub kind: SignalKind,
    /// Optional human-readable payload
    pub payload: Option<String>,
    /// Structured failure for `TimedOut` signals
    pub failure: Option<HandshakeFailure>,
}

impl Signal {
    /// A session was established.
    pub fn connect() -> Self {
        Self {
            kind: SignalKind::Connect,
            payload: None,
            failure: None,
        }
    }

    /// The connection was lost or closed.
    pub fn disconnect(reason: impl Into<String>) -> Self {
        Self {
            kind: SignalKind::Disconnect,
            payload: Some(reason.into()),
            failure: None,
        }
    }

    /// A handshake attempt failed. The payload defaults to the failure text.
    pub fn timed_out(failure: HandshakeFailure) -> Self {
        Self {
            kind: SignalKind::TimedOut,
            payload: Some(failure.to_string()),
            failure: Some(failure),
        }
    }

    /// A `TimedOut` signal with custom payload text.
    pub fn timed_out_with(failure: HandshakeFailure, payload: impl Into<String>) -> Self {
        Self {
            kind: SignalKind::TimedOut,
            payload: Some(payload.into()),
            failure: Some(failure),
        }
    }

    /// Application-defined channel event.
    pub fn channel(name: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            kind: SignalKind::Channel(name.into()),
            payload: Some(body.into()),
            failure: None,
        }
    }
}

type Handler = Arc<dyn Fn(&Signal) + Send + Sync>;

struct Registration {
    priority: Priority,
    seq: u64,
    handler: Handler,
}

type HandlerMap = HashMap<SignalKind, Vec<Registration>>;

/// Priority-ordered signal bus backed by a worker pool.
///
/// Must be created inside a Tokio runtime; the workers are spawned tasks.
pub struct EventBus {
    handlers: Arc<RwLock<HandlerMap>>,
    queue: mpsc::Sender<Signal>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    seq: AtomicU64,
}

impl EventBus {
    /// Create a bus with `workers` delivery tasks and a queue bound of
    /// `capacity` pending signals.
    pub fn new(workers: usize, capacity: usize) -> Self {
        let handlers: Arc<RwLock<HandlerMap>> = Arc::new(RwLock::new(HashMap::new()));
        let (queue, rx) = mpsc::channel::<Signal>(capacity.max(1));
        let rx = Arc::new(tokio::sync::Mutex::new(rx));

        let mut pool = Vec::with_capacity(workers.max(1));
        for _ in 0..workers.max(1) {
            let rx = Arc::clone(&rx);
            let handlers = Arc::clone(&handlers);
            pool.push(tokio::spawn(async move {
                loop {
                    let signal = rx.lock().await.recv().await;
                    match signal {
                        Some(signal) => dispatch(&handlers, &signal),
                        None => break,
                    }
                }
            }));
        }

        Self {
            handlers,
            queue,
            workers: Mutex::new(pool),
            seq: AtomicU64::new(0),
        }
    }

    /// Register a handler for a signal kind at the given priority.
    pub fn on<F>(&self, kind: SignalKind, priority: Priority, handler: F)
    where
        F: Fn(&Signal) + Send + Sync + 'static,
    {
        let seq = self.seq.fetch_add(1, Ordering::Relaxed);
        let mut map = self
            .handlers
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let slot = map.entry(kind).or_default();
        slot.push(Registration {
            priority,
            seq,
            handler: Arc::new(handler),
        });
        // High before low, then registration order.
        slot.sort_by(|a, b| b.priority.cmp(&a.priority).then(a.seq.cmp(&b.seq)));
    }

    /// Broadcast a signal to the workers.
    ///
    /// Non-blocking: when the queue is full or the bus was shut down the
    /// signal is dropped with a warning.
    pub fn emit(&self, signal: Signal) {
        if let Err(err) = self.queue.try_send(signal) {
            tracing::warn!("dropping signal, event queue unavailable: {err}");
        }
    }

    /// Stop the worker pool. Pending signals are discarded.
    pub fn shutdown(&self) {
        let mut pool = self
            .workers
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        for worker in pool.drain(..) {
            worker.abort();
        }
    }
}

impl Drop for EventBus {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn dispatch(handlers: &RwLock<HandlerMap>, signal: &Signal) {
    let to_run: Vec<Handler> = {
        let map = handlers.read().unwrap_or_else(PoisonError::into_inner);
        match map.get(&signal.kind) {
            Some(registrations) => registrations.iter().map(|r| Arc::clone(&r.handler)).collect(),
            None => return,
        }
    };
    for handler in to_run {
        handler(signal);
    }
}
