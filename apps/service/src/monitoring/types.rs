use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// What a stored name denotes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EndpointKind {
    /// `<host>:<port>` pair, only ever echo-probed
    Hostname,
    /// Bare domain, registration-checked before it is echo-probed
    Domain,
}

impl EndpointKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EndpointKind::Hostname => "hostname",
            EndpointKind::Domain => "domain",
        }
    }
}

impl fmt::Display for EndpointKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown endpoint kind: {0}")]
pub struct UnknownKind(pub String);

impl FromStr for EndpointKind {
    type Err = UnknownKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "hostname" => Ok(EndpointKind::Hostname),
            "domain" => Ok(EndpointKind::Domain),
            other => Err(UnknownKind(other.to_string())),
        }
    }
}

/// Result of a single echo probe
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Reachability {
    Up { latency_ms: f64 },
    Down,
}

impl Reachability {
    pub fn is_up(&self) -> bool {
        matches!(self, Reachability::Up { .. })
    }

    pub fn latency_ms(&self) -> Option<f64> {
        match self {
            Reachability::Up { latency_ms } => Some(*latency_ms),
            Reachability::Down => None,
        }
    }
}

/// Values computed for one endpoint in one cycle.
///
/// Only constructible through [`ProbeOutcome::unregistered`] and
/// [`ProbeOutcome::checked`], so `latency_ms` is set exactly when `up` is and
/// an unregistered domain is always down.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProbeOutcome {
    up: bool,
    registered: Option<bool>,
    latency_ms: Option<f64>,
}

impl ProbeOutcome {
    /// Domain with no owner record; the echo probe was skipped
    pub fn unregistered() -> Self {
        Self { up: false, registered: Some(false), latency_ms: None }
    }

    /// Registration is `Some(true)` for a registered domain or `None` for a hostname.
    /// `Some(false)` discards `reachability` and gives [`ProbeOutcome::unregistered`].
    pub fn checked(registered: Option<bool>, reachability: Reachability) -> Self {
        if registered == Some(false) {
            return Self::unregistered();
        }
        Self {
            up: reachability.is_up(),
            registered,
            latency_ms: reachability.latency_ms(),
        }
    }

    pub fn up(&self) -> bool {
        self.up
    }

    pub fn registered(&self) -> Option<bool> {
        self.registered
    }

    pub fn latency_ms(&self) -> Option<f64> {
        self.latency_ms
    }
}
