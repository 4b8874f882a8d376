//! # Flarelink - Client Connection Core
//!
//! Client-side connection layer of the Flarelink bidirectional messaging
//! protocol: a long-lived client negotiates a session with a server (or a
//! load balancer that redirects it), survives transient failures through an
//! auto-reconnect loop and hands established connections to a framed
//! transport layer.
//!
//! ## Features
//!
//! - **Handshake classification**: one raw response string per attempt,
//!   classified into success, redirect, rate limit, auth failure or
//!   malformed
//! - **Redirect following**: iterative chain with a hop limit and cycle
//!   detection
//! - **Advisory version checks**: skew between peers is reported to the
//!   operator, never enforced
//! - **Auto-reconnect**: fixed-delay retry loop driven by `TIMED_OUT`
//!   signals, cancellable on teardown
//! - **Priority event bus**: lifecycle transitions broadcast to handlers on
//!   a bounded queue with a configurable worker pool
//!
//! ## Connection Flow
//!
//! ```text
//! Client                    Load balancer / Server
//!    |                              |
//!    |-------- handshake --------->|
//!    |<--- redirect=host2:9000 ----|   follow, renegotiate
//!    |-------- handshake --------->|
//!    |<-------- <uuid>INFO:... ----|   session assigned
//!    |                              |
//!    |===== framed byte stream ====|   handed to transport layer
//! ```
//!
//! ### Lifecycle State Machine
//!
//! | State         | Meaning                        | Transitions              |
//! |---------------|--------------------------------|--------------------------|
//! | `Idle`        | No negotiation yet / torn down | → Negotiating            |
//! | `Negotiating` | Handshake in flight            | → Established, Failed    |
//! | `Established` | Framed session live            | → Negotiating (re-entry) |
//! | `Failed`      | Attempt failed, signal raised  | → Negotiating (reconnect)|
//!
//! ### Handshake Response Grammar
//!
//! | Form                               | Meaning                        |
//! |------------------------------------|--------------------------------|
//! | `redirect=<host>:<port>[INFO:...]` | load-balancer redirect         |
//! | `ratelimit`                        | request throttled              |
//! | `fail-auth`                        | authentication rejected        |
//! | exactly 36 chars                   | legacy: bare session UUID      |
//! | `<uuid>INFO:<descriptor>`          | session UUID plus version info |
//! | absent                             | transport-level failure        |
//!
//! ### Frame Tags
//!
//! `SINGLE=1, START=2, CONTINUE=3, FINISH=4, CONFIRM_PACKET=5,
//! PING_PACKET=6, UNKNOWN=-1`. Multi-frame reassembly in the transport
//! layer depends on these discriminators; unassigned tags decode to
//! `UNKNOWN` for forward compatibility.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use flarelink::{Client, Priority, SignalKind};
//!
//! let client = Client::new("relay.example.net", 6090);
//! client
//!     .set_password("hunter2")
//!     .set_argument("tag", "worker-7")
//!     .enable_auto_reconnect(2_000)
//!     .on(SignalKind::Connect, Priority::Normal, |_| {
//!         println!("connected");
//!     });
//!
//! client.establish().await?;
//! client.send("chat", "hello").await?;
//! ```
//!
//! ## Modules
//!
//! - [`client`]: connection lifecycle controller and reconnect scheduler
//! - [`handshake`]: response grammar, outcome parser, version checks
//! - [`events`]: priority-ordered signal bus
//! - [`frame`]: wire frame discriminators
//! - [`transport`]: handshake transport and framed-session boundary
//! - [`config`]: configuration management
//! - [`error`]: error types and result alias

pub mod client;
pub mod config;
pub mod error;
pub mod events;
pub mod frame;
pub mod handshake;
pub mod transport;

// Re-exports for convenience
pub use client::{Client, ClientBuilder, ConnectionState};
pub use config::ClientConfig;
pub use error::{FlarelinkError, Result};
pub use events::{EventBus, Priority, Signal, SignalKind};
pub use frame::FrameType;
pub use handshake::{
    check_compatibility, classify, Advisory, HandshakeFailure, HandshakeOutcome, VersionInfo,
};
pub use transport::{
    FramedSession, HandshakeRequest, HandshakeTransport, HttpHandshake, SessionBinding,
    SessionFactory, TcpSessionFactory,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
