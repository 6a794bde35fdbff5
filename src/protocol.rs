use std::fmt;

use serde::{Deserialize, Serialize};

use crate::resolver;

/// An IP-level protocol, identified by a small number and a canonical name.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[cfg_attr(test, derive(Eq, PartialEq))]
pub struct Protocol {
    name: String,
    number: i32,
    aliases: Vec<String>,
}

impl Protocol {
    pub fn new(name: impl Into<String>, number: i32, aliases: Vec<String>) -> Self {
        Self {
            name: name.into(),
            number,
            aliases,
        }
    }

    /// The official IANA name of this protocol.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The protocol number (e.g. 6 for tcp). Not range-checked.
    pub fn number(&self) -> i32 {
        self.number
    }

    /// Alternate names this protocol is also known as. May be empty.
    pub fn aliases(&self) -> &[String] {
        &self.aliases
    }

    /// Whether `name` is the canonical name or one of the aliases.
    pub(crate) fn answers_to(&self, name: &str) -> bool {
        self.name == name || self.aliases.iter().any(|alias| alias == name)
    }

    /// Looks up a protocol by its official name or an alias, using the
    /// process-wide resolver.
    pub fn by_name(name: &str) -> Option<Protocol> {
        resolver::global().protocol_by_name(name)
    }

    /// Looks up a protocol by number, using the process-wide resolver.
    pub fn by_number(number: i32) -> Option<Protocol> {
        resolver::global().protocol_by_number(number)
    }

    /// All protocols known to the process-wide resolver.
    pub fn all() -> Vec<Protocol> {
        resolver::global().protocols()
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} {}", self.name, self.number)?;

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
        let ip = Protocol::new("ip", 0, vec!["IP".to_string()]);

        assert!(ip.answers_to("ip"));
        assert!(ip.answers_to("IP"));
        assert!(!ip.answers_to("Ip"));
        assert!(!ip.answers_to("tcp"));
    }

    #[test]
    fn test_display() {
        let tcp = Protocol::new("tcp", 6, vec!["TCP".to_string()]);
        assert_eq!(tcp.to_string(), "tcp 6 TCP");

        let bare = Protocol::new("ggp", 3, Vec::new());
        assert_eq!(bare.to_string(), "ggp 3");
    }
}
