//! The terminal fallback: compiled-in IANA tables.
//!
//! The tables are embedded as data files in the same format as the system
//! databases and run through the same parser, so this backend can never fail
//! to construct. Rows whose key collides with an earlier row overwrite it.

use std::collections::HashMap;
use std::sync::OnceLock;

use crate::parse::NetDbParser;
use crate::protocol::Protocol;
use crate::resolver::{ProtocolsDb, ServicesDb};
use crate::service::Service;

const PROTOCOLS_TABLE: &str = include_str!("../../resources/protocols");
const SERVICES_TABLE: &str = include_str!("../../resources/services");

/// Compiled-in protocol table.
#[derive(Debug)]
pub struct BuiltinProtocolsDb {
    protocols: Vec<Protocol>,
    by_name: HashMap<String, usize>,
    by_number: HashMap<i32, usize>,
}

impl BuiltinProtocolsDb {
    pub fn get() -> &'static Self {
        static DB: OnceLock<BuiltinProtocolsDb> = OnceLock::new();

        DB.get_or_init(Self::build)
    }

    fn build() -> Self {
        log::trace!("building the built-in protocols table");

        let mut protocols = Vec::new();
        let mut by_name = HashMap::new();
        let mut by_number = HashMap::new();

        for entry in NetDbParser::new(PROTOCOLS_TABLE.as_bytes()) {
            let number = match entry.data.parse::<i32>() {
                Ok(number) => number,
                Err(_) => continue,
            };

            let index = protocols.len();

            by_name.insert(entry.name.clone(), index);
            for alias in &entry.aliases {
                by_name.insert(alias.clone(), index);
            }
            by_number.insert(number, index);

            protocols.push(Protocol::new(entry.name, number, entry.aliases));
        }

        Self {
            protocols,
            by_name,
            by_number,
        }
    }
}

impl ProtocolsDb for BuiltinProtocolsDb {
    fn protocol_by_name(&self, name: &str) -> Option<Protocol> {
        self.by_name
            .get(name)
            .map(|&index| self.protocols[index].clone())
    }

    fn protocol_by_number(&self, number: i32) -> Option<Protocol> {
        self.by_number
            .get(&number)
            .map(|&index| self.protocols[index].clone())
    }

    fn protocols(&self) -> Vec<Protocol> {
        self.protocols.clone()
    }
}

#[derive(Debug, Default)]
struct ServiceTable {
    by_name: HashMap<String, usize>,
    by_port: HashMap<u16, usize>,
}

/// Compiled-in service table, one sub-table per transport protocol.
#[derive(Debug)]
pub struct BuiltinServicesDb {
    services: Vec<Service>,
    tcp: ServiceTable,
    udp: ServiceTable,
}

impl BuiltinServicesDb {
    pub fn get() -> &'static Self {
        static DB: OnceLock<BuiltinServicesDb> = OnceLock::new();

        DB.get_or_init(Self::build)
    }

    fn build() -> Self {
        log::trace!("building the built-in services table");

        let mut services = Vec::new();
        let mut tcp = ServiceTable::default();
        let mut udp = ServiceTable::default();

        for entry in NetDbParser::new(SERVICES_TABLE.as_bytes()) {
            let mut parts = entry.data.split('/');

            let port = match parts.next() {
                Some(port) => match port.parse::<u16>() {
                    Ok(port) => port,
                    Err(_) => continue,
                },
                None => continue,
            };

            // only tcp and udp rows are tabled
            let proto = match parts.next() {
                Some("tcp") => "tcp",
                Some("udp") => "udp",
                _ => continue,
            };

            let table = if proto == "tcp" { &mut tcp } else { &mut udp };

            let index = services.len();

            table.by_name.insert(entry.name.clone(), index);
            for alias in &entry.aliases {
                table.by_name.insert(alias.clone(), index);
            }
            table.by_port.insert(port, index);

            services.push(Service::new(entry.name, port, proto, entry.aliases));
        }

        Self {
            services,
            tcp,
            udp,
        }
    }

    /// A `proto` of `None` checks the tcp table first, then udp.
    fn lookup(&self, proto: Option<&str>, key: impl Fn(&ServiceTable) -> Option<usize>) -> Option<Service> {
        let index = match proto {
            Some("tcp") => key(&self.tcp),
            Some("udp") => key(&self.udp),
            Some(_) => None,
            None => key(&self.tcp).or_else(|| key(&self.udp)),
        };

        index.map(|index| self.services[index].clone())
    }
}

impl ServicesDb for BuiltinServicesDb {
    fn service_by_name(&self, name: &str, proto: Option<&str>) -> Option<Service> {
        self.lookup(proto, |table| table.by_name.get(name).copied())
    }

    fn service_by_port(&self, port: u16, proto: Option<&str>) -> Option<Service> {
        self.lookup(proto, |table| table.by_port.get(&port).copied())
    }

    fn services(&self) -> Vec<Service> {
        self.services.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_well_known_protocols() {
        let db = BuiltinProtocolsDb::get();

        let tcp = db.protocol_by_name("tcp").expect("tcp is built in");
        assert_eq!(tcp.number(), 6);
        assert_eq!(tcp.name(), "tcp");

        let udp = db.protocol_by_number(17).expect("udp is built in");
        assert_eq!(udp.name(), "udp");

        assert!(db.protocol_by_name("no-such-protocol").is_none());
        assert!(db.protocol_by_number(-1).is_none());
    }

    #[test]
    fn test_protocol_alias_equivalence() {
        let db = BuiltinProtocolsDb::get();

        let upper = db.protocol_by_name("IP").expect("alias is tabled");
        let lower = db.protocol_by_name("ip").expect("name is tabled");
        assert_eq!(upper.number(), lower.number());
        assert_eq!(upper.number(), 0);
    }

    #[test]
    fn test_name_number_symmetry() {
        let db = BuiltinProtocolsDb::get();

        for name in ["ip", "icmp", "tcp", "udp", "ipv6", "sctp"] {
            let protocol = db.protocol_by_name(name).expect("well-known protocol");
            let roundtrip = db
                .protocol_by_number(protocol.number())
                .expect("number resolves back");
            assert_eq!(roundtrip.name(), name);
        }
    }

    #[test]
    fn test_well_known_services() {
        let db = BuiltinServicesDb::get();

        let bootps = db
            .service_by_name("bootps", Some("udp"))
            .expect("bootps is built in");
        assert_eq!(bootps.port(), 67);
        assert_eq!(bootps.proto(), "udp");

        let bootps = db
            .service_by_port(67, Some("udp"))
            .expect("port 67 is built in");
        assert_eq!(bootps.name(), "bootps");
    }

    #[test]
    fn test_mail_notification_service() {
        let db = BuiltinServicesDb::get();

        // 512/udp carries both names in the registry
        let by_name = db
            .service_by_name("comsat", Some("udp"))
            .expect("comsat is built in");
        assert_eq!(by_name.port(), 512);

        let by_port = db
            .service_by_port(512, Some("udp"))
            .expect("port 512 is built in");
        assert!(by_port.name() == "comsat" || by_port.name() == "biff");

        // ...while 512/tcp is exec
        let exec = db
            .service_by_port(512, Some("tcp"))
            .expect("exec is built in");
        assert_eq!(exec.name(), "exec");
    }

    #[test]
    fn test_unqualified_proto_prefers_tcp() {
        let db = BuiltinServicesDb::get();

        let both = db.service_by_port(512, None).expect("port 512 is built in");
        assert_eq!(both.proto(), "tcp");

        let ssh = db.service_by_name("ssh", None).expect("ssh is built in");
        assert_eq!(ssh.proto(), "tcp");
        assert_eq!(ssh.port(), 22);
    }

    #[test]
    fn test_enumeration_completeness() {
        let protocols = BuiltinProtocolsDb::get().protocols();
        assert!(protocols.iter().any(|protocol| protocol.name() == "tcp"));

        let services = BuiltinServicesDb::get().services();
        assert!(services.iter().any(|service| service.name() == "ftp"));

        // enumeration retains rows that earlier same-name rows would shadow
        // in the name table (compressnet sits on ports 2 and 3)
        let compressnet: Vec<u16> = services
            .iter()
            .filter(|service| service.name() == "compressnet" && service.proto() == "tcp")
            .map(Service::port)
            .collect();
        assert_eq!(compressnet, [2, 3]);
    }
}
