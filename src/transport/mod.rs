//! Transport boundary of the connection core.
//!
//! Two collaborators live behind traits here:
//!
//! - [`HandshakeTransport`]: performs one handshake request per negotiation
//!   attempt and hands back the raw response string for classification.
//! - [`SessionFactory`] / [`FramedSession`]: builds and owns the framed
//!   byte-stream session once a handshake succeeds.
//!
//! The lifecycle controller only depends on these traits; the bundled
//! implementations ([`HttpHandshake`], [`TcpSessionFactory`]) are thin
//! defaults that a host application can swap out.

mod http;
mod tcp;

pub use http::{HttpHandshake, DEFAULT_HANDSHAKE_TIMEOUT_SECS};
pub use tcp::{TcpFramedSession, TcpSessionFactory};

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use uuid::Uuid;

use crate::error::Result;

/// Everything a handshake transport needs for one attempt.
#[derive(Debug, Clone)]
pub struct HandshakeRequest {
    /// Target host
    pub host: String,
    /// Target port
    pub port: u16,
    /// Caller-supplied connection arguments, sent with every attempt
    pub arguments: HashMap<String, String>,
    /// Caller-supplied connection metadata, sent with every attempt
    pub meta: HashMap<String, serde_json::Value>,
}

/// Identity a framed session is bound to. Fixed once the session exists.
#[derive(Debug, Clone)]
pub struct SessionBinding {
    /// Host the session was negotiated against
    pub host: String,
    /// Port the session was negotiated against
    pub port: u16,
    /// Server-assigned session identifier
    pub assigned_id: Uuid,
    /// Connection arguments at establishment time
    pub arguments: HashMap<String, String>,
    /// Connection metadata at establishment time
    pub meta: HashMap<String, serde_json::Value>,
}

/// One handshake request/response exchange.
///
/// `None` means the transport produced no response (network failure,
/// timeout, non-success status); the classifier turns that into a
/// transport failure outcome.
pub trait HandshakeTransport: Send + Sync {
    /// Perform one handshake attempt against the request's target.
    fn negotiate(
        &self,
        request: HandshakeRequest,
    ) -> Pin<Box<dyn Future<Output = Option<String>> + Send + '_>>;
}

/// An established framed byte-stream session.
///
/// Frame encoding internals live in the transport layer; the connection
/// core only opens, hands off and closes sessions.
pub trait FramedSession: Send + Sync {
    /// Identity this session is bound to.
    fn binding(&self) -> &SessionBinding;

    /// Send a text body over a named channel.
    fn send_text(
        &self,
        channel: &str,
        body: &str,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;

    /// Close the underlying stream. Idempotent.
    fn close(&self) -> Pin<Box<dyn Future<Output = ()> + Send + '_>>;
}

/// Builds framed sessions for freshly negotiated bindings.
pub trait SessionFactory: Send + Sync {
    /// Open a framed session bound to `binding`.
    fn open(
        &self,
        binding: SessionBinding,
    ) -> Pin<Box<dyn Future<Output = Result<Arc<dyn FramedSession>>> + Send + '_>>;
}
