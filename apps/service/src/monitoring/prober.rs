use async_trait::async_trait;
use tracing::{debug, warn};

use super::checker::{PingChecker, WhoisChecker};
use super::types::{EndpointKind, Reachability};
use crate::config::MonitoringConfig;
use crate::database::Endpoint;

/// Checks run against one endpoint.
///
/// Both checks are infallible: every failure is folded into a negative
/// result here, so callers never see an error.
#[async_trait]
pub trait Prober: Send + Sync {
    /// `Some(true)` if the domain has an owner record, `Some(false)` if it has
    /// none or the lookup failed, `None` for hostnames.
    async fn check_registration(&self, endpoint: &Endpoint) -> Option<bool>;

    /// One echo probe against the endpoint's host
    async fn check_reachability(&self, endpoint: &Endpoint) -> Reachability;
}

/// Prober that talks to the network
pub struct NetworkProber {
    whois: WhoisChecker,
    ping: PingChecker,
}

impl NetworkProber {
    pub fn new(config: &MonitoringConfig) -> Self {
        Self {
            whois: WhoisChecker::new(
                config.whois_server.clone(),
                config.whois_port,
                config.probe_timeout_seconds,
            ),
            ping: PingChecker::new(config.ping_program.clone(), config.probe_timeout_seconds),
        }
    }
}

#[async_trait]
impl Prober for NetworkProber {
    async fn check_registration(&self, endpoint: &Endpoint) -> Option<bool> {
        if endpoint.kind == EndpointKind::Hostname {
            return None;
        }

        match self.whois.is_registered(&endpoint.name).await {
            Ok(registered) => Some(registered),
            Err(e) => {
                debug!(endpoint = %endpoint.name, "registration lookup failed: {}", e);
                Some(false)
            }
        }
    }

    async fn check_reachability(&self, endpoint: &Endpoint) -> Reachability {
        match self.ping.ping(endpoint.host()).await {
            Ok(latency_ms) => Reachability::Up { latency_ms },
            Err(e) => {
                warn!(endpoint = %endpoint.name, "echo probe failed: {}", e);
                Reachability::Down
            }
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> MonitoringConfig {
        MonitoringConfig {
            // Nothing listens here, so any lookup fails fast
            whois_server: "127.0.0.1".to_string(),
            whois_port: 9,
            probe_timeout_seconds: 1,
            ping_program: "/nonexistent/ping".to_string(),
            ..MonitoringConfig::default()
        }
    }

    fn endpoint(name: &str, kind: EndpointKind) -> Endpoint {
        Endpoint { id: 1, name: name.to_string(), kind, up: None, registered: None, latency_ms: None }
    }

    #[tokio::test]
    async fn test_registration_not_applicable_to_hostnames() {
        let prober = NetworkProber::new(&config());
        let hostname = endpoint("127.0.0.1:80", EndpointKind::Hostname);
        assert_eq!(prober.check_registration(&hostname).await, None);
    }

    #[tokio::test]
    async fn test_failed_lookup_means_unregistered() {
        let prober = NetworkProber::new(&config());
        let domain = endpoint("example.com", EndpointKind::Domain);
        assert_eq!(prober.check_registration(&domain).await, Some(false));
    }

    #[tokio::test]
    async fn test_probe_tool_error_means_down() {
        let prober = NetworkProber::new(&config());
        let hostname = endpoint("127.0.0.1:80", EndpointKind::Hostname);
        assert_eq!(prober.check_reachability(&hostname).await, Reachability::Down);
    }
}
