use std::fmt;

use serde::{Deserialize, Serialize};

use crate::resolver;

/// A network service, identified by a (port, transport protocol) pair and a
/// canonical name.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[cfg_attr(test, derive(Eq, PartialEq))]
pub struct Service {
    name: String,
    port: u16,
    proto: String,
    aliases: Vec<String>,
}

impl Service {
    pub fn new(
        name: impl Into<String>,
        port: u16,
        proto: impl Into<String>,
        aliases: Vec<String>,
    ) -> Self {
        Self {
            name: name.into(),
            port,
            proto: proto.into(),
            aliases,
        }
    }

    /// The official IANA name of this service.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The TCP or UDP port of this service.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// The transport protocol token, usually `tcp` or `udp`.
    pub fn proto(&self) -> &str {
        &self.proto
    }

    /// Alternate names this service is also known as. May be empty.
    pub fn aliases(&self) -> &[String] {
        &self.aliases
    }

    /// Whether `name` is the canonical name or one of the aliases.
    pub(crate) fn answers_to(&self, name: &str) -> bool {
        self.name == name || self.aliases.iter().any(|alias| alias == name)
    }

    /// Looks up a service by name and transport protocol, using the
    /// process-wide resolver. A `proto` of `None` matches any transport
    /// protocol.
    pub fn by_name(name: &str, proto: Option<&str>) -> Option<Service> {
        resolver::global().service_by_name(name, proto)
    }

    /// Looks up a service by port and transport protocol, using the
    /// process-wide resolver. A `proto` of `None` matches any transport
    /// protocol.
    pub fn by_port(port: u16, proto: Option<&str>) -> Option<Service> {
        resolver::global().service_by_port(port, proto)
    }

    /// All services known to the process-wide resolver.
    pub fn all() -> Vec<Service> {
        resolver::global().services()
    }
}

impl fmt::Display for Service {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} {}/{}", self.name, self.port, self.proto)?;

        for alias in &self.aliases {
            write!(f, " {alias}")?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_answers_to() {
        let biff = Service::new("biff", 512, "udp", vec!["comsat".to_string()]);

        assert!(biff.answers_to("biff"));
        assert!(biff.answers_to("comsat"));
        assert!(!biff.answers_to("exec"));
    }

    #[test]
    fn test_display() {
        let biff = Service::new("biff", 512, "udp", vec!["comsat".to_string()]);
        assert_eq!(biff.to_string(), "biff 512/udp comsat");
    }
}
