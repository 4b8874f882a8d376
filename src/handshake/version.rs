//! Version descriptors and the compatibility checker.
//!
//! A server that speaks the versioned handshake appends a descriptor after
//! the `INFO:` marker. The descriptor wire form is three colon-separated
//! fields: `release:<core>:<protocol>` (or `prerelease:...` for
//! non-release builds).

use super::{CORE_VERSION, PROTOCOL_VERSION};

/// Version descriptor of one protocol peer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VersionInfo {
    /// Whether the peer runs a release build
    pub is_release: bool,
    /// Core (implementation) version
    pub core_version: u32,
    /// Wire protocol version
    pub protocol_version: u32,
}

impl VersionInfo {
    /// Version info of this client build.
    pub const fn local() -> Self {
        Self {
            is_release: true,
            core_version: CORE_VERSION,
            protocol_version: PROTOCOL_VERSION,
        }
    }

    /// Parse a descriptor of the form `release:<core>:<protocol>`.
    pub fn parse(descriptor: &str) -> Option<Self> {
        let mut parts = descriptor.split(':');
        let is_release = match parts.next()? {
            "release" => true,
            "prerelease" => false,
            _ => return None,
        };
        let core_version = parts.next()?.parse().ok()?;
        let protocol_version = parts.next()?.parse().ok()?;
        if parts.next().is_some() {
            return None;
        }
        Some(Self {
            is_release,
            core_version,
            protocol_version,
        })
    }

    /// Encode this version info in descriptor wire form.
    pub fn descriptor(&self) -> String {
        format!(
            "{}:{}:{}",
            if self.is_release { "release" } else { "prerelease" },
            self.core_version,
            self.protocol_version
        )
    }
}

impl Default for VersionInfo {
    fn default() -> Self {
        Self::local()
    }
}

/// Advisory produced by comparing a remote version against the local one.
///
/// Advisories are diagnostics for an operator. They never abort negotiation;
/// protocol-version skew is reported, not enforced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advisory {
    /// Remote peer runs a pre-release build
    PreRelease,
    /// Remote core version is newer than ours
    ClientOutdated {
        /// Remote core version
        remote: u32,
        /// Local core version
        local: u32,
    },
    /// Remote core version is older than ours
    ServerOutdated {
        /// Remote core version
        remote: u32,
        /// Local core version
        local: u32,
    },
    /// Remote speaks a newer protocol revision
    ProtocolServerNewer {
        /// Remote protocol version
        remote: u32,
        /// Local protocol version
        local: u32,
    },
    /// Remote speaks an older protocol revision
    ProtocolClientNewer {
        /// Remote protocol version
        remote: u32,
        /// Local protocol version
        local: u32,
    },
}

impl std::fmt::Display for Advisory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::PreRelease => write!(f, "server is running a pre-release build"),
            Self::ClientOutdated { remote, local } => write!(
                f,
                "this client is outdated: server core {} vs client core {}",
                remote, local
            ),
            Self::ServerOutdated { remote, local } => write!(
                f,
                "the server is outdated: server core {} vs client core {}",
                remote, local
            ),
            Self::ProtocolServerNewer { remote, local } => write!(
                f,
                "protocol mismatch: server speaks {} but client speaks {}, update the client",
                remote, local
            ),
            Self::ProtocolClientNewer { remote, local } => write!(
                f,
                "protocol mismatch: client speaks {} but server speaks {}, update the server",
                local, remote
            ),
        }
    }
}

/// Compare a remote version descriptor against the local one.
///
/// Each rule is evaluated independently, so one comparison can yield several
/// advisories. The returned list is empty when the peers match exactly.
pub fn check_compatibility(remote: &VersionInfo, local: &VersionInfo) -> Vec<Advisory> {
    let mut advisories = Vec::new();
    if !remote.is_release {
        advisories.push(Advisory::PreRelease);
    }
    if remote.core_version > local.core_version {
        advisories.push(Advisory::ClientOutdated {
            remote: remote.core_version,
            local: local.core_version,
        });
    }
    if remote.core_version < local.core_version {
        advisories.push(Advisory::ServerOutdated {
            remote: remote.core_version,
            local: local.core_version,
        });
    }
    if remote.protocol_version > local.protocol_version {
        advisories.push(Advisory::ProtocolServerNewer {
            remote: remote.protocol_version,
            local: local.protocol_version,
        });
    }
    if remote.protocol_version < local.protocol_version {
        advisories.push(Advisory::ProtocolClientNewer {
            remote: remote.protocol_version,
            local: local.protocol_version,
        });
    }
    advisories
}
