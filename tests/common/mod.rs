//! Shared test doubles for the lifecycle integration tests.

use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use flarelink::{
    FramedSession, HandshakeRequest, HandshakeTransport, Result, SessionBinding, SessionFactory,
};

/// Handshake transport replaying a fixed script of responses.
pub struct ScriptedHandshake {
    responses: Mutex<VecDeque<Option<String>>>,
    pub seen: Mutex<Vec<(String, u16)>>,
}

impl ScriptedHandshake {
    pub fn new<I>(responses: I) -> Arc<Self>
    where
        I: IntoIterator<Item = Option<String>>,
    {
        Arc::new(Self {
            responses: Mutex::new(responses.into_iter().collect()),
            seen: Mutex::new(Vec::new()),
        })
    }

    pub fn attempts(&self) -> usize {
        self.seen.lock().unwrap().len()
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

/// In-memory framed session recording sent messages.
pub struct MemorySession {
    binding: SessionBinding,
    pub sent: Arc<Mutex<Vec<(String, String)>>>,
    closed: Arc<AtomicUsize>,
}

impl FramedSession for MemorySession {
    fn binding(&self) -> &SessionBinding {
        &self.binding
    }

    fn send_text(
        &self,
        channel: &str,
        body: &str,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        self.sent
            .lock()
            .unwrap()
            .push((channel.to_string(), body.to_string()));
        Box::pin(async { Ok(()) })
    }

    fn close(&self) -> Pin<Box<dyn Future<Output = ()> + Send + '_>> {
        let closed = Arc::clone(&self.closed);
        Box::pin(async move {
            let _ = closed.fetch_add(1, Ordering::SeqCst);
        })
    }
}

/// Session factory handing out [`MemorySession`]s.
#[derive(Default)]
pub struct MemoryFactory {
    pub opened: AtomicUsize,
    pub closed: Arc<AtomicUsize>,
    pub sent: Arc<Mutex<Vec<(String, String)>>>,
    pub last_binding: Mutex<Option<SessionBinding>>,
}

impl SessionFactory for MemoryFactory {
    fn open(
        &self,
        binding: SessionBinding,
    ) -> Pin<Box<dyn Future<Output = Result<Arc<dyn FramedSession>>> + Send + '_>> {
        let _ = self.opened.fetch_add(1, Ordering::SeqCst);
        *self.last_binding.lock().unwrap() = Some(binding.clone());
        let session = MemorySession {
            binding,
            sent: Arc::clone(&self.sent),
            closed: Arc::clone(&self.closed),
        };
        Box::pin(async move { Ok(Arc::new(session) as Arc<dyn FramedSession>) })
    }
}

pub const VALID_ID: &str = "c47ac10b-58cc-4372-a567-0e02b2c3d479";

pub fn script<const N: usize>(responses: [Option<&str>; N]) -> Arc<ScriptedHandshake> {
    ScriptedHandshake::new(responses.into_iter().map(|r| r.map(str::to_string)))
}
