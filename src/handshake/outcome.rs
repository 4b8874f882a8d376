//! Handshake response classification.
//!
//! [`classify`] turns the raw response of one handshake attempt into exactly
//! one [`HandshakeOutcome`]. The rules run in a fixed precedence order; see
//! the module docs of [`crate::handshake`] for the full grammar table.

use thiserror::Error;
use uuid::Uuid;

use super::version::VersionInfo;
use super::{
    AUTH_FAILED_RESPONSE, INFO_MARKER, RATELIMIT_RESPONSE, REDIRECT_PREFIX, SESSION_ID_TEXT_LEN,
};

/// Failure kinds a handshake attempt can end in.
///
/// All four wire-level kinds surface through the same `TIMED_OUT` signal;
/// carrying them as a tagged enum lets handlers branch on the kind instead
/// of parsing the human-readable text.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HandshakeFailure {
    /// The handshake transport returned no response at all.
    #[error("no response from handshake transport")]
    Transport,

    /// Server-side throttling rejected the attempt.
    #[error("connection blocked by rate limiter")]
    RateLimited,

    /// Credentials were rejected.
    #[error("failed to authenticate, check the configured password")]
    AuthRejected,

    /// Malformed response, redirect target or session identifier.
    #[error("malformed handshake response: {0}")]
    Malformed(String),

    /// The redirect chain hit the hop limit or revisited a target.
    #[error("redirect chain exhausted: {0}")]
    RedirectExhausted(String),
}

/// Result of classifying one handshake response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandshakeOutcome {
    /// The server accepted the client and assigned a session identifier.
    Established {
        /// Server-assigned session identifier
        assigned_id: Uuid,
        /// Remote version info, absent for legacy servers
        version: Option<VersionInfo>,
    },
    /// A load balancer pointed the client at another server.
    Redirect {
        /// New host to negotiate against
        host: String,
        /// New port to negotiate against
        port: u16,
    },
    /// The attempt failed; negotiation for this call is over.
    Failed(HandshakeFailure),
}

/// Classify a raw handshake response.
///
/// `None` means the transport produced no response. Rules are evaluated in
/// precedence order: transport failure, redirect, rate limit, auth failure,
/// bare session id (exactly 36 chars), id plus version info (over 36 chars),
/// then malformed.
pub fn classify(response: Option<&str>) -> HandshakeOutcome {
    let Some(raw) = response else {
        return HandshakeOutcome::Failed(HandshakeFailure::Transport);
    };

    if let Some(rest) = raw.strip_prefix(REDIRECT_PREFIX) {
        // Anything after an INFO: marker on a redirect is server chatter
        // the client does not interpret.
        let target = rest.split(INFO_MARKER).next().unwrap_or_default();
        return match parse_redirect_target(target) {
            Some((host, port)) => HandshakeOutcome::Redirect { host, port },
            None => HandshakeOutcome::Failed(HandshakeFailure::Malformed(format!(
                "invalid redirect target `{target}`"
            ))),
        };
    }

    if raw == RATELIMIT_RESPONSE {
        return HandshakeOutcome::Failed(HandshakeFailure::RateLimited);
    }

    if raw == AUTH_FAILED_RESPONSE {
        return HandshakeOutcome::Failed(HandshakeFailure::AuthRejected);
    }

    match raw.len().cmp(&SESSION_ID_TEXT_LEN) {
        std::cmp::Ordering::Equal => match Uuid::parse_str(raw) {
            // Legacy path: the server reports no version info.
            Ok(assigned_id) => HandshakeOutcome::Established {
                assigned_id,
                version: None,
            },
            Err(_) => HandshakeOutcome::Failed(HandshakeFailure::Malformed(
                "failed to parse session identifier".to_string(),
            )),
        },
        std::cmp::Ordering::Greater => classify_versioned(raw),
        std::cmp::Ordering::Less => HandshakeOutcome::Failed(HandshakeFailure::Malformed(
            format!("unrecognized handshake response `{raw}`"),
        )),
    }
}

/// Classify a versioned success response: `<uuid>INFO:<descriptor>`.
fn classify_versioned(raw: &str) -> HandshakeOutcome {
    let Some((id_text, descriptor)) = raw.split_once(INFO_MARKER) else {
        return HandshakeOutcome::Failed(HandshakeFailure::Malformed(
            "oversized response without version marker".to_string(),
        ));
    };

    let Ok(assigned_id) = Uuid::parse_str(id_text) else {
        return HandshakeOutcome::Failed(HandshakeFailure::Malformed(
            "failed to parse session identifier".to_string(),
        ));
    };

    match VersionInfo::parse(descriptor) {
        Some(version) => HandshakeOutcome::Established {
            assigned_id,
            version: Some(version),
        },
        None => HandshakeOutcome::Failed(HandshakeFailure::Malformed(format!(
            "invalid version descriptor `{descriptor}`"
        ))),
    }
}

fn parse_redirect_target(target: &str) -> Option<(String, u16)> {
    let (host, port) = target.split_once(':')?;
    if host.is_empty() {
        return None;
    }
    let port = port.parse().ok()?;
    Some((host.to_string(), port))
}
