//! Classification of user input into monitored endpoints.
//!
//! Input comes straight from the add form: a name and a port that may be
//! empty. Nothing here touches the network.
//!
//! There is no rejection path. Anything that is not a numeric host or
//! `localhost` with an all-digit port is accepted as a domain, malformed
//! input included; a bad domain simply fails its registration check on the
//! next cycle.

use super::types::EndpointKind;

/// A classified endpoint, ready to be stored
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub kind: EndpointKind,
    /// `<host>:<port>` for hostnames, the name unchanged for domains
    pub name: String,
}

/// Decide whether `name`/`port` denote a host-port pair or a domain
pub fn classify(name: &str, port: &str) -> Classification {
    if is_port(port) && is_host(name) {
        Classification { kind: EndpointKind::Hostname, name: format!("{name}:{port}") }
    } else {
        Classification { kind: EndpointKind::Domain, name: name.to_string() }
    }
}

fn is_port(port: &str) -> bool {
    is_all_digits(port)
}

/// Numeric last label (IPv4 style) or the literal `localhost`
fn is_host(name: &str) -> bool {
    name == "localhost" || name.rsplit('.').next().is_some_and(is_all_digits)
}

fn is_all_digits(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}
