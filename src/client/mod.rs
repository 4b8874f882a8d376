//! Connection lifecycle controller.
//!
//! [`Client`] owns one logical session identity across reconnects and drives
//! negotiation: invoke the handshake transport, classify the outcome, follow
//! redirects, build the framed session on success or raise a `TIMED_OUT`
//! signal on failure.
//!
//! ```text
//!             establish()
//!   [Idle] ───────────────> [Negotiating] ──redirect──┐
//!                                │    ^               │
//!                                │    └───────────────┘
//!                     ┌──────────┴──────────┐
//!                     v                     v
//!               [Established]           [Failed] ──TIMED_OUT──> reconnect
//! ```
//!
//! Negotiations for one client are serialized: a per-client permit
//! guarantees at most one handshake in flight, so a caller-thread
//! `establish()` can never race a scheduler-driven reconnect for the
//! host/port/session fields.
//!
//! Redirect chains are followed iteratively with a hop limit and a visited
//! target set; exhaustion surfaces as
//! [`HandshakeFailure::RedirectExhausted`].

mod reconnect;

pub use reconnect::DEFAULT_RECONNECT_DELAY_MS;

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use uuid::Uuid;

use crate::config::ClientConfig;
use crate::error::{FlarelinkError, Result};
use crate::events::{EventBus, Priority, Signal, SignalKind, DEFAULT_QUEUE_CAPACITY, DEFAULT_WORKERS};
use crate::handshake::{
    check_compatibility, classify, HandshakeFailure, HandshakeOutcome, VersionInfo,
};
use crate::transport::{
    FramedSession, HandshakeRequest, HandshakeTransport, HttpHandshake, SessionBinding,
    SessionFactory, TcpSessionFactory,
};

/// Default bound on redirect chain length for one `establish()` call.
pub const DEFAULT_MAX_REDIRECTS: usize = 8;

/// Lifecycle states of one connection attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No negotiation has run yet (or the client was torn down)
    Idle,
    /// A handshake is in flight
    Negotiating,
    /// A framed session is live
    Established,
    /// The last attempt failed
    Failed,
}

/// Mutable session identity, guarded by one lock.
pub(crate) struct SessionCore {
    host: String,
    port: u16,
    assigned_id: Option<Uuid>,
    arguments: HashMap<String, String>,
    meta: HashMap<String, serde_json::Value>,
    session: Option<Arc<dyn FramedSession>>,
    state: ConnectionState,
}

pub(crate) struct ClientInner {
    core: Mutex<SessionCore>,
    /// Serializes `establish()` calls; held across the handshake.
    negotiation: tokio::sync::Mutex<()>,
    pub(crate) events: EventBus,
    transport: Arc<dyn HandshakeTransport>,
    sessions: Arc<dyn SessionFactory>,
    pub(crate) attempts: Arc<AtomicU32>,
    pub(crate) reconnect: reconnect::PendingReconnect,
    max_redirects: usize,
    pub(crate) closing: AtomicBool,
}

impl ClientInner {
    pub(crate) fn core(&self) -> MutexGuard<'_, SessionCore> {
        self.core.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Flarelink connection client.
///
/// Cheap to clone; clones share the same session identity and event bus.
/// Must be created inside a Tokio runtime.
#[derive(Clone)]
pub struct Client {
    pub(crate) inner: Arc<ClientInner>,
}

/// Builder for [`Client`] instances with non-default collaborators.
pub struct ClientBuilder {
    host: String,
    port: u16,
    transport: Option<Arc<dyn HandshakeTransport>>,
    sessions: Option<Arc<dyn SessionFactory>>,
    workers: usize,
    queue_capacity: usize,
    max_redirects: usize,
}

impl ClientBuilder {
    fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            transport: None,
            sessions: None,
            workers: DEFAULT_WORKERS,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            max_redirects: DEFAULT_MAX_REDIRECTS,
        }
    }

    /// Replace the handshake transport (default: [`HttpHandshake`]).
    pub fn handshake_transport(mut self, transport: Arc<dyn HandshakeTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Replace the framed-session factory (default: [`TcpSessionFactory`]).
    pub fn session_factory(mut self, sessions: Arc<dyn SessionFactory>) -> Self {
        self.sessions = Some(sessions);
        self
    }

    /// Number of signal-delivery workers. Default 1, sequential delivery.
    pub fn event_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    /// Bound of the pending-signal queue.
    pub fn event_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    /// Maximum redirect hops per `establish()` call.
    pub fn max_redirects(mut self, max_redirects: usize) -> Self {
        self.max_redirects = max_redirects;
        self
    }

    /// Build the client and wire up its lifecycle handlers.
    pub fn build(self) -> Client {
        let inner = Arc::new(ClientInner {
            core: Mutex::new(SessionCore {
                host: self.host,
                port: self.port,
                assigned_id: None,
                arguments: HashMap::new(),
                meta: HashMap::new(),
                session: None,
                state: ConnectionState::Idle,
            }),
            negotiation: tokio::sync::Mutex::new(()),
            events: EventBus::new(self.workers, self.queue_capacity),
            transport: self
                .transport
                .unwrap_or_else(|| Arc::new(HttpHandshake::new())),
            sessions: self.sessions.unwrap_or_else(|| Arc::new(TcpSessionFactory)),
            attempts: Arc::new(AtomicU32::new(0)),
            reconnect: reconnect::PendingReconnect::default(),
            max_redirects: self.max_redirects,
            closing: AtomicBool::new(false),
        });

        // Every successful establishment resets the attempt counter.
        let attempts = Arc::clone(&inner.attempts);
        inner.events.on(SignalKind::Connect, Priority::High, move |_| {
            attempts.store(0, Ordering::SeqCst);
        });

        Client { inner }
    }
}

impl Client {
    /// Create a client with the default HTTP handshake and TCP sessions.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self::builder(host, port).build()
    }

    /// Start building a client with custom collaborators.
    pub fn builder(host: impl Into<String>, port: u16) -> ClientBuilder {
        ClientBuilder::new(host, port)
    }

    /// Create a client from a loaded [`ClientConfig`].
    pub fn from_config(config: &ClientConfig) -> Self {
        let client = Self::builder(config.host.clone(), config.port)
            .handshake_transport(Arc::new(HttpHandshake::with_timeout(
                config.handshake.timeout(),
            )))
            .event_workers(config.events.workers)
            .event_queue_capacity(config.events.queue_capacity)
            .max_redirects(config.redirect.max_hops)
            .build();
        if config.reconnect.enabled {
            client.enable_auto_reconnect(config.reconnect.delay_ms);
        }
        client
    }

    /// Negotiate a session with the configured server.
    ///
    /// Idempotent re-entry: any existing framed session is closed before a
    /// new negotiation starts, so no two sessions coexist for one client.
    /// The handshake transport is invoked once per attempt (plus once per
    /// redirect hop); failures are not retried here. On failure a
    /// `TIMED_OUT` signal fires and, when auto-reconnect is enabled, the
    /// scheduler takes over.
    pub async fn establish(&self) -> Result<()> {
        let _permit = self.inner.negotiation.lock().await;

        if self.inner.closing.load(Ordering::SeqCst) {
            return Err(FlarelinkError::Session("client is torn down".to_string()));
        }

        let previous = {
            let mut core = self.inner.core();
            core.state = ConnectionState::Negotiating;
            core.session.take()
        };
        if let Some(previous) = previous {
            tracing::debug!("closing previous framed session before renegotiating");
            previous.close().await;
        }

        let mut visited: HashSet<(String, u16)> = HashSet::new();
        let mut hops = 0usize;

        loop {
            let request = {
                let core = self.inner.core();
                HandshakeRequest {
                    host: core.host.clone(),
                    port: core.port,
                    arguments: core.arguments.clone(),
                    meta: core.meta.clone(),
                }
            };
            let _ = visited.insert((request.host.clone(), request.port));

            tracing::debug!("negotiating with {}:{}", request.host, request.port);
            let response = self.inner.transport.negotiate(request).await;

            match classify(response.as_deref()) {
                HandshakeOutcome::Redirect { host, port } => {
                    hops += 1;
                    if hops > self.inner.max_redirects {
                        return Err(self.fail(HandshakeFailure::RedirectExhausted(format!(
                            "gave up after {} hops",
                            self.inner.max_redirects
                        ))));
                    }
                    if visited.contains(&(host.clone(), port)) {
                        return Err(self.fail(HandshakeFailure::RedirectExhausted(format!(
                            "redirect cycle via {host}:{port}"
                        ))));
                    }
                    tracing::info!("load balancer redirected negotiation to {host}:{port}");
                    // Identity mutation happens before any session for the
                    // old target could be built.
                    let mut core = self.inner.core();
                    core.host = host;
                    core.port = port;
                },
                HandshakeOutcome::Failed(failure) => {
                    return Err(self.fail(failure));
                },
                HandshakeOutcome::Established {
                    assigned_id,
                    version,
                } => {
                    if let Some(remote) = version {
                        for advisory in check_compatibility(&remote, &VersionInfo::local()) {
                            tracing::warn!("version advisory: {advisory}");
                        }
                    }

                    let binding = {
                        let core = self.inner.core();
                        SessionBinding {
                            host: core.host.clone(),
                            port: core.port,
                            assigned_id,
                            arguments: core.arguments.clone(),
                            meta: core.meta.clone(),
                        }
                    };

                    let session = match self.inner.sessions.open(binding).await {
                        Ok(session) => session,
                        Err(err) => {
                            self.inner.core().state = ConnectionState::Failed;
                            self.inner.events.emit(Signal::timed_out_with(
                                HandshakeFailure::Transport,
                                format!("failed to open framed session: {err}"),
                            ));
                            return Err(err);
                        },
                    };

                    {
                        let mut core = self.inner.core();
                        core.assigned_id = Some(assigned_id);
                        core.session = Some(session);
                        core.state = ConnectionState::Established;
                    }
                    tracing::info!("session established as {assigned_id}");
                    self.inner.events.emit(Signal::connect());
                    return Ok(());
                },
            }
        }
    }

    /// Register a signal handler.
    pub fn on<F>(&self, kind: SignalKind, priority: Priority, handler: F) -> &Self
    where
        F: Fn(&Signal) + Send + Sync + 'static,
    {
        self.inner.events.on(kind, priority, handler);
        self
    }

    /// Set a connection argument sent with every handshake attempt.
    ///
    /// The server can read arguments before the handshake finishes, so this
    /// doubles as a lightweight identification mechanism.
    pub fn set_argument(&self, key: impl Into<String>, value: impl Into<String>) -> &Self {
        let _ = self
            .inner
            .core()
            .arguments
            .insert(key.into(), value.into());
        self
    }

    /// Set a connection metadata entry sent with every handshake attempt.
    pub fn set_meta(&self, key: impl Into<String>, value: serde_json::Value) -> &Self {
        let _ = self.inner.core().meta.insert(key.into(), value);
        self
    }

    /// Set the password used to authenticate the handshake.
    pub fn set_password(&self, secret: impl Into<String>) -> &Self {
        self.set_argument("password", secret)
    }

    /// Send a text body over a named channel of the established session.
    pub async fn send(&self, channel: &str, body: &str) -> Result<()> {
        let session = self
            .inner
            .core()
            .session
            .clone()
            .ok_or(FlarelinkError::SessionNotEstablished)?;
        session.send_text(channel, body).await
    }

    /// Close the session and stop all background work.
    ///
    /// Cancels any pending reconnect task so a delayed attempt cannot
    /// resurrect the session after shutdown.
    pub async fn teardown(&self) {
        self.inner.closing.store(true, Ordering::SeqCst);
        self.inner.reconnect.cancel();

        let session = {
            let mut core = self.inner.core();
            core.state = ConnectionState::Idle;
            core.assigned_id = None;
            core.session.take()
        };
        if let Some(session) = session {
            session.close().await;
        }

        self.inner.events.shutdown();
        tracing::info!("client torn down");
    }

    /// Current negotiation target host.
    pub fn host(&self) -> String {
        self.inner.core().host.clone()
    }

    /// Current negotiation target port.
    pub fn port(&self) -> u16 {
        self.inner.core().port
    }

    /// Session identifier of the established session, if any.
    pub fn assigned_id(&self) -> Option<Uuid> {
        self.inner.core().assigned_id
    }

    /// Reconnect attempts since the last successful establishment.
    pub fn attempt_count(&self) -> u32 {
        self.inner.attempts.load(Ordering::SeqCst)
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ConnectionState {
        self.inner.core().state
    }

    /// Record a failed attempt: state, log, signal, error.
    fn fail(&self, failure: HandshakeFailure) -> FlarelinkError {
        self.inner.core().state = ConnectionState::Failed;
        tracing::warn!("negotiation failed: {failure}");
        self.inner.events.emit(Signal::timed_out(failure.clone()));
        FlarelinkError::Handshake(failure)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::future::Future;
    use std::pin::Pin;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    /// Handshake transport replaying a fixed script of responses.
    pub(crate) struct ScriptedHandshake {
        responses: Mutex<VecDeque<Option<String>>>,
        pub(crate) seen: Mutex<Vec<(String, u16)>>,
    }

    impl ScriptedHandshake {
        pub(crate) fn new<I>(responses: I) -> Arc<Self>
        where
            I: IntoIterator<Item = Option<&'static str>>,
        {
            Arc::new(Self {
                responses: Mutex::new(
                    responses
                        .into_iter()
                        .map(|r| r.map(str::to_string))
                        .collect(),
                ),
                seen: Mutex::new(Vec::new()),
            })
        }
    }

    impl HandshakeTransport for ScriptedHandshake {
        fn negotiate(
            &self,
            request: HandshakeRequest,
        ) -> Pin<Box<dyn Future<Output = Option<String>> + Send + '_>> {
            self.seen
                .lock()
                .unwrap()
                .push((request.host.clone(), request.port));
            let next = self.responses.lock().unwrap().pop_front().flatten();
            Box::pin(async move { next })
        }
    }

    /// Session factory recording opens and closes.
    #[derive(Default)]
    pub(crate) struct RecordingFactory {
        pub(crate) opened: AtomicUsize,
        pub(crate) closed: Arc<AtomicUsize>,
        pub(crate) last_binding: Mutex<Option<SessionBinding>>,
    }

    struct RecordingSession {
        binding: SessionBinding,
        closed: Arc<AtomicUsize>,
    }

    impl FramedSession for RecordingSession {
        fn binding(&self) -> &SessionBinding {
            &self.binding
        }

        fn send_text(
            &self,
            _channel: &str,
            _body: &str,
        ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
            Box::pin(async { Ok(()) })
        }

        fn close(&self) -> Pin<Box<dyn Future<Output = ()> + Send + '_>> {
            let closed = Arc::clone(&self.closed);
            Box::pin(async move {
                let _ = closed.fetch_add(1, Ordering::SeqCst);
            })
        }
    }

    impl SessionFactory for RecordingFactory {
        fn open(
            &self,
            binding: SessionBinding,
        ) -> Pin<Box<dyn Future<Output = Result<Arc<dyn FramedSession>>> + Send + '_>> {
            let _ = self.opened.fetch_add(1, Ordering::SeqCst);
            *self.last_binding.lock().unwrap() = Some(binding.clone());
            let session = RecordingSession {
                binding,
                closed: Arc::clone(&self.closed),
            };
            Box::pin(async move { Ok(Arc::new(session) as Arc<dyn FramedSession>) })
        }
    }

    pub(crate) const VALID_ID: &str = "c47ac10b-58cc-4372-a567-0e02b2c3d479";

    pub(crate) fn client_with(
        transport: Arc<ScriptedHandshake>,
        factory: Arc<RecordingFactory>,
    ) -> Client {
        Client::builder("host1", 8000)
            .handshake_transport(transport)
            .session_factory(factory)
            .build()
    }

    #[tokio::test]
    async fn test_establish_success_legacy_response() {
        let transport = ScriptedHandshake::new([Some(VALID_ID)]);
        let factory = Arc::new(RecordingFactory::default());
        let client = client_with(Arc::clone(&transport), Arc::clone(&factory));

        client.establish().await.unwrap();

        assert_eq!(client.state(), ConnectionState::Established);
        assert_eq!(
            client.assigned_id(),
            Some(Uuid::parse_str(VALID_ID).unwrap())
        );
        assert_eq!(factory.opened.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_redirect_mutates_identity_before_session_build() {
        let transport = ScriptedHandshake::new([Some("redirect=host2:9000"), Some(VALID_ID)]);
        let factory = Arc::new(RecordingFactory::default());
        let client = client_with(Arc::clone(&transport), Arc::clone(&factory));

        client.establish().await.unwrap();

        assert_eq!(client.host(), "host2");
        assert_eq!(client.port(), 9000);
        let seen = transport.seen.lock().unwrap().clone();
        assert_eq!(
            seen,
            vec![("host1".to_string(), 8000), ("host2".to_string(), 9000)]
        );
        let binding = factory.last_binding.lock().unwrap().clone().unwrap();
        assert_eq!(binding.host, "host2");
        assert_eq!(binding.port, 9000);
    }

    #[tokio::test]
    async fn test_redirect_cycle_exhausts() {
        let transport = ScriptedHandshake::new([
            Some("redirect=host2:9000"),
            Some("redirect=host1:8000"),
        ]);
        let factory = Arc::new(RecordingFactory::default());
        let client = client_with(transport, Arc::clone(&factory));

        let err = client.establish().await.unwrap_err();
        assert!(matches!(
            err,
            FlarelinkError::Handshake(HandshakeFailure::RedirectExhausted(_))
        ));
        assert_eq!(client.state(), ConnectionState::Failed);
        assert_eq!(factory.opened.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_redirect_hop_limit() {
        let transport = ScriptedHandshake::new([
            Some("redirect=hop1:1"),
            Some("redirect=hop2:2"),
            Some("redirect=hop3:3"),
        ]);
        let client = Client::builder("host1", 8000)
            .handshake_transport(transport)
            .session_factory(Arc::new(RecordingFactory::default()))
            .max_redirects(2)
            .build();

        let err = client.establish().await.unwrap_err();
        assert!(matches!(
            err,
            FlarelinkError::Handshake(HandshakeFailure::RedirectExhausted(_))
        ));
    }

    #[tokio::test]
    async fn test_failure_kinds_emit_timed_out() {
        for (raw, expected) in [
            (None, HandshakeFailure::Transport),
            (Some("ratelimit"), HandshakeFailure::RateLimited),
            (Some("fail-auth"), HandshakeFailure::AuthRejected),
        ] {
            let transport = ScriptedHandshake::new([raw]);
            let factory = Arc::new(RecordingFactory::default());
            let client = client_with(transport, factory);

            let seen = Arc::new(Mutex::new(None));
            let sink = Arc::clone(&seen);
            let _ = client.on(SignalKind::TimedOut, Priority::Normal, move |signal| {
                *sink.lock().unwrap() = signal.failure.clone();
            });

            let err = client.establish().await.unwrap_err();
            assert!(matches!(err, FlarelinkError::Handshake(ref f) if *f == expected));
            assert_eq!(client.state(), ConnectionState::Failed);

            tokio::time::sleep(Duration::from_millis(50)).await;
            assert_eq!(seen.lock().unwrap().clone(), Some(expected));
        }
    }

    #[tokio::test]
    async fn test_establish_is_idempotent() {
        let transport = ScriptedHandshake::new([Some(VALID_ID), Some(VALID_ID)]);
        let factory = Arc::new(RecordingFactory::default());
        let client = client_with(transport, Arc::clone(&factory));

        client.establish().await.unwrap();
        client.establish().await.unwrap();

        // The first session was torn down before the second negotiation.
        assert_eq!(factory.opened.load(Ordering::SeqCst), 2);
        assert_eq!(factory.closed.load(Ordering::SeqCst), 1);
        assert_eq!(client.state(), ConnectionState::Established);
    }

    #[tokio::test]
    async fn test_versioned_response_is_advisory_only() {
        // Remote speaks a newer protocol; establishment must still succeed.
        let transport =
            ScriptedHandshake::new([Some("c47ac10b-58cc-4372-a567-0e02b2c3d479INFO:release:3:99")]);
        let factory = Arc::new(RecordingFactory::default());
        let client = client_with(transport, Arc::clone(&factory));

        client.establish().await.unwrap();
        assert_eq!(client.state(), ConnectionState::Established);
        assert_eq!(factory.opened.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_establish_after_teardown_is_rejected() {
        let transport = ScriptedHandshake::new([Some(VALID_ID)]);
        let factory = Arc::new(RecordingFactory::default());
        let client = client_with(transport, Arc::clone(&factory));

        client.teardown().await;
        let err = client.establish().await.unwrap_err();
        assert!(matches!(err, FlarelinkError::Session(_)));
        assert_eq!(factory.opened.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_send_requires_established_session() {
        let transport = ScriptedHandshake::new([None]);
        let factory = Arc::new(RecordingFactory::default());
        let client = client_with(transport, factory);

        let err = client.send("chat", "hello").await.unwrap_err();
        assert!(matches!(err, FlarelinkError::SessionNotEstablished));
    }

    #[tokio::test]
    async fn test_chained_setters() {
        let transport = ScriptedHandshake::new([Some(VALID_ID)]);
        let factory = Arc::new(RecordingFactory::default());
        let client = client_with(transport, Arc::clone(&factory));

        let _ = client
            .set_argument("tag", "worker-7")
            .set_password("hunter2")
            .set_meta("region", serde_json::json!("eu-west"));

        client.establish().await.unwrap();

        let binding = factory.last_binding.lock().unwrap().clone().unwrap();
        assert_eq!(binding.arguments.get("tag").map(String::as_str), Some("worker-7"));
        assert_eq!(
            binding.arguments.get("password").map(String::as_str),
            Some("hunter2")
        );
        assert_eq!(binding.meta.get("region"), Some(&serde_json::json!("eu-west")));
    }
}
