//! Host, identity, and run identifier types.
//!
//! A relayed session is identified by the (host, identity) pair. Hosts are
//! network addresses as reported by the relay tool; identities are
//! domain-qualified usernames. Both are kept as validated newtypes so the
//! store and cache cannot mix them up.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Network address of a relayed host.
///
/// Stored verbatim as reported by the session source (IPv4 dotted quad in
/// practice, but hostnames are accepted). Whitespace is the only thing we
/// reject: addresses are used as tokens in the completion log format.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HostAddr(pub String);

impl HostAddr {
    /// Parse a host token. Returns `None` for empty or whitespace-bearing input.
    pub fn parse(s: &str) -> Option<Self> {
        let trimmed = s.trim();
        if trimmed.is_empty() || trimmed.chars().any(|c| c.is_whitespace()) {
            return None;
        }
        Some(HostAddr(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for HostAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Domain-qualified username associated with a relayed session.
///
/// Format: `DOMAIN/user` (as emitted by the relay tool). The domain part
/// is optional in degraded captures; `domain()` returns `None` then.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Identity(pub String);

impl Identity {
    /// Parse an identity token. Rejects empty or whitespace-bearing input.
    pub fn parse(s: &str) -> Option<Self> {
        let trimmed = s.trim();
        if trimmed.is_empty() || trimmed.chars().any(|c| c.is_whitespace()) {
            return None;
        }
        Some(Identity(trimmed.to_string()))
    }

    /// The domain portion, if the identity is domain-qualified.
    pub fn domain(&self) -> Option<&str> {
        self.0.split_once('/').map(|(d, _)| d)
    }

    /// The bare username portion.
    pub fn user(&self) -> &str {
        self.0.split_once('/').map(|(_, u)| u).unwrap_or(&self.0)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Name of a catalog action, as recorded in the completion log.
///
/// Action names appear verbatim in `Action: <name> on <host>` log lines,
/// so they may contain spaces but never the ` on ` separator ambiguity:
/// the log parser splits on the last ` on `.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActionName(pub String);

impl ActionName {
    pub fn new(s: impl Into<String>) -> Self {
        ActionName(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ActionName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ActionName {
    fn from(s: &str) -> Self {
        ActionName(s.to_string())
    }
}

/// Run ID for correlating log output from one invocation.
///
/// Format: `rt-YYYYMMDD-HHMMSS-XXXX`
/// Example: `rt-20260825-143022-a7xq`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(pub String);

impl RunId {
    /// Generate a new run ID.
    pub fn new() -> Self {
        let now = chrono::Utc::now();
        let suffix = generate_base32_suffix();
        RunId(format!(
            "rt-{}-{}-{}",
            now.format("%Y%m%d"),
            now.format("%H%M%S"),
            suffix
        ))
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

fn generate_base32_suffix() -> String {
    let uuid = uuid::Uuid::new_v4();
    let bytes = uuid.as_bytes();
    let mut value = ((bytes[0] as u32) << 16) | ((bytes[1] as u32) << 8) | (bytes[2] as u32);
    value &= 0x000F_FFFF;
    let alphabet = b"abcdefghijklmnopqrstuvwxyz234567";
    let mut out = String::with_capacity(4);
    for shift in [15_u32, 10, 5, 0] {
        let idx = ((value >> shift) & 0x1F) as usize;
        out.push(alphabet[idx] as char);
    }
    out
}
