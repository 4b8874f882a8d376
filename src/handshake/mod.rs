//! Handshake response grammar and version checks.
//!
//! One handshake attempt yields one raw response string (or nothing at all)
//! from the handshake transport. This module classifies that response into a
//! single [`HandshakeOutcome`]:
//!
//! | Response form                       | Outcome                         |
//! |-------------------------------------|---------------------------------|
//! | absent                              | `Failed(Transport)`             |
//! | `redirect=<host>:<port>[INFO:...]`  | `Redirect { host, port }`       |
//! | `ratelimit`                         | `Failed(RateLimited)`           |
//! | `fail-auth`                         | `Failed(AuthRejected)`          |
//! | exactly 36 chars                    | `Established` (bare UUID, no version info) |
//! | `<uuid>INFO:<descriptor>`           | `Established` with version info |
//! | anything else                       | `Failed(Malformed)`             |
//!
//! The length-based branch keeps the grammar backward compatible: an older
//! server emits a bare 36-character session identifier, a newer one appends
//! its version descriptor after the `INFO:` marker, and the client
//! interoperates with both without an extra negotiation round-trip.
//!
//! Version skew between peers is advisory only. [`check_compatibility`]
//! produces diagnostics for the operator; it never blocks establishment.

mod outcome;
mod version;

pub use outcome::{classify, HandshakeFailure, HandshakeOutcome};
pub use version::{check_compatibility, Advisory, VersionInfo};

/// Marker separating a payload from appended server info.
pub const INFO_MARKER: &str = "INFO:";

/// Prefix of a load-balancer redirect response.
pub const REDIRECT_PREFIX: &str = "redirect=";

/// Literal response for a throttled handshake attempt.
pub const RATELIMIT_RESPONSE: &str = "ratelimit";

/// Literal response for rejected credentials.
pub const AUTH_FAILED_RESPONSE: &str = "fail-auth";

/// Length of a session identifier in canonical UUID text form.
pub const SESSION_ID_TEXT_LEN: usize = 36;

/// Client core version, reported advisories compare against this.
pub const CORE_VERSION: u32 = 3;

/// Wire protocol version spoken by this client.
pub const PROTOCOL_VERSION: u32 = 5;
