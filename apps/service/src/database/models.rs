use serde::{Deserialize, Serialize};

use crate::monitoring::classifier::Classification;
use crate::monitoring::types::{EndpointKind, ProbeOutcome};

/// Endpoint model - a monitored host-port pair or domain
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Endpoint {
    pub id: i64,
    pub name: String,
    pub kind: EndpointKind,
    /// `None` until the first cycle has probed it
    pub up: Option<bool>,
    /// Always `None` for hostnames
    pub registered: Option<bool>,
    /// Round trip of the last echo, only set while up
    pub latency_ms: Option<f64>,
}

impl Endpoint {
    /// Target of the echo probe: the name without its `:port` suffix for hostnames
    pub fn host(&self) -> &str {
        match self.kind {
            EndpointKind::Hostname => {
                self.name.rsplit_once(':').map_or(self.name.as_str(), |(host, _)| host)
            }
            EndpointKind::Domain => &self.name,
        }
    }

    /// Overwrite the probed fields with this cycle's outcome
    pub fn apply(&mut self, outcome: ProbeOutcome) {
        self.up = Some(outcome.up());
        self.registered = outcome.registered();
        self.latency_ms = outcome.latency_ms();
    }
}

/// Endpoint that has not been stored yet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewEndpoint {
    pub name: String,
    pub kind: EndpointKind,
}

impl From<Classification> for NewEndpoint {
    fn from(classification: Classification) -> Self {
        Self { name: classification.name, kind: classification.kind }
    }
}
