//! Lookups backed by the flat system database files.
//!
//! Every query re-opens and re-scans the file. Results never go stale, and
//! concurrent callers are fully independent since each scan owns its stream.

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};

use crate::parse::{Entry, NetDbParser};
use crate::protocol::Protocol;
use crate::resolver::{ProtocolsDb, ServicesDb, UnavailableReason};
use crate::service::Service;

fn protocols_path() -> PathBuf {
    if cfg!(windows) {
        windows_etc().join("protocol")
    } else {
        PathBuf::from("/etc/protocols")
    }
}

fn services_path() -> PathBuf {
    if cfg!(windows) {
        windows_etc().join("services")
    } else {
        PathBuf::from("/etc/services")
    }
}

/// The network database directory under the Windows system root, with the
/// stock install location as fallback when `%SystemRoot%` is unset.
fn windows_etc() -> PathBuf {
    let root = std::env::var_os("SystemRoot").unwrap_or_else(|| "C:\\windows".into());

    PathBuf::from(root).join("system32\\drivers\\etc")
}

/// Opens the database file for a scan. Any open failure degrades to an empty
/// stream; a vanished or unreadable file means "no entries", not an error.
fn open_db_file(path: &Path) -> NetDbParser<Box<dyn BufRead>> {
    log::trace!("scanning {}", path.display());

    match File::open(path) {
        Ok(file) => NetDbParser::new(Box::new(BufReader::new(file))),
        Err(_) => NetDbParser::new(Box::new(io::empty())),
    }
}

/// Strict availability check shared by both file backends: the file must
/// open, and scanning it must produce at least one entry the interpreter
/// accepts.
fn probe_db_file<T>(
    path: PathBuf,
    interpret: impl Fn(Entry) -> Option<T>,
) -> Result<PathBuf, UnavailableReason> {
    let file = match File::open(&path) {
        Ok(file) => file,
        Err(err) => return Err(UnavailableReason::Unreadable { path, err }),
    };

    let mut parser = NetDbParser::new(BufReader::new(file));

    loop {
        match parser.try_next() {
            Ok(Some(entry)) => {
                if interpret(entry).is_some() {
                    return Ok(path);
                }
            }
            Ok(None) => return Err(UnavailableReason::NoEntries { path }),
            Err(err) => return Err(UnavailableReason::Unreadable { path, err }),
        }
    }
}

fn protocol_from_entry(entry: Entry) -> Option<Protocol> {
    let number = match entry.data.parse::<i32>() {
        Ok(number) => number,
        Err(_) => return None,
    };

    Some(Protocol::new(entry.name, number, entry.aliases))
}

fn service_from_entry(entry: Entry) -> Option<Service> {
    let mut parts = entry.data.split('/');

    let port = match parts.next() {
        Some(port) => match port.parse::<u16>() {
            Ok(port) => port,
            Err(_) => return None,
        },
        None => return None,
    };

    let proto = match parts.next() {
        Some(proto) if !proto.is_empty() => proto,
        _ => return None,
    };

    Some(Service::new(entry.name, port, proto, entry.aliases))
}

/// Protocol lookups scanning a protocols file on every query.
#[derive(Debug)]
pub struct FileProtocolsDb {
    path: PathBuf,
}

impl FileProtocolsDb {
    /// Probes the platform's protocols file.
    pub fn load() -> Result<Self, UnavailableReason> {
        Self::with_path(protocols_path())
    }

    /// Probes the given file instead of the platform default.
    pub fn with_path(path: impl Into<PathBuf>) -> Result<Self, UnavailableReason> {
        let path = probe_db_file(path.into(), protocol_from_entry)?;

        Ok(Self { path })
    }

    fn scan(&self, mut matches: impl FnMut(&Protocol) -> bool) -> Option<Protocol> {
        open_db_file(&self.path)
            .filter_map(protocol_from_entry)
            .find(|protocol| matches(protocol))
    }
}

impl ProtocolsDb for FileProtocolsDb {
    fn protocol_by_name(&self, name: &str) -> Option<Protocol> {
        self.scan(|protocol| protocol.answers_to(name))
    }

    fn protocol_by_number(&self, number: i32) -> Option<Protocol> {
        self.scan(|protocol| protocol.number() == number)
    }

    fn protocols(&self) -> Vec<Protocol> {
        open_db_file(&self.path)
            .filter_map(protocol_from_entry)
            .collect()
    }
}

/// Service lookups scanning a services file on every query.
#[derive(Debug)]
pub struct FileServicesDb {
    path: PathBuf,
}

impl FileServicesDb {
    /// Probes the platform's services file.
    pub fn load() -> Result<Self, UnavailableReason> {
        Self::with_path(services_path())
    }

    /// Probes the given file instead of the platform default.
    pub fn with_path(path: impl Into<PathBuf>) -> Result<Self, UnavailableReason> {
        let path = probe_db_file(path.into(), service_from_entry)?;

        Ok(Self { path })
    }

    fn scan(&self, mut matches: impl FnMut(&Service) -> bool) -> Option<Service> {
        open_db_file(&self.path)
            .filter_map(service_from_entry)
            .find(|service| matches(service))
    }
}

impl ServicesDb for FileServicesDb {
    fn service_by_name(&self, name: &str, proto: Option<&str>) -> Option<Service> {
        self.scan(|service| {
            if let Some(proto) = proto {
                if service.proto() != proto {
                    return false;
                }
            }

            service.answers_to(name)
        })
    }

    fn service_by_port(&self, port: u16, proto: Option<&str>) -> Option<Service> {
        self.scan(|service| {
            service.port() == port && proto.map_or(true, |proto| service.proto() == proto)
        })
    }

    fn services(&self) -> Vec<Service> {
        open_db_file(&self.path)
            .filter_map(service_from_entry)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    const PROTOCOLS: &str = "\
# protocols test db
ip\t0\tIP\t\t# internet protocol
icmp 1 ICMP
ggp 3 GGP
tcp 6 TCP
garbage notanumber NOPE
udp 17 UDP
";

    const SERVICES: &str = "\
# services test db
tcpmux 1/tcp
echo 7/tcp
echo 7/udp
exec 512/tcp
biff 512/udp comsat
bad-port x11/tcp
bare-data 512
bootps 67/tcp
bootps 67/udp # bootp server
";

    /// Writes the contents to a unique temp file; the guard removes it on
    /// drop so failing tests don't leak files.
    struct TempDb {
        path: PathBuf,
    }

    impl TempDb {
        fn new(name: &str, contents: &str) -> Self {
            let path =
                std::env::temp_dir().join(format!("netdb-{}-{name}", std::process::id()));
            fs::write(&path, contents).expect("temp db is writable");

            Self { path }
        }
    }

    impl Drop for TempDb {
        fn drop(&mut self) {
            let _ = fs::remove_file(&self.path);
        }
    }

    #[test]
    fn test_protocols_file() {
        let db = TempDb::new("protocols", PROTOCOLS);
        let protocols = FileProtocolsDb::with_path(&db.path).expect("valid protocols file");

        let tcp = protocols.protocol_by_name("tcp").expect("tcp is listed");
        assert_eq!(tcp.number(), 6);
        assert_eq!(tcp.aliases(), ["TCP".to_string()]);

        // alias lookup finds the same protocol as the canonical name
        let by_alias = protocols.protocol_by_name("ICMP").expect("alias matches");
        let by_name = protocols.protocol_by_name("icmp").expect("name matches");
        assert_eq!(by_alias.number(), by_name.number());

        let udp = protocols.protocol_by_number(17).expect("udp is listed");
        assert_eq!(udp.name(), "udp");

        assert!(protocols.protocol_by_name("garbage").is_none());
        assert!(protocols.protocol_by_name("st2").is_none());
        assert!(protocols.protocol_by_number(-1).is_none());

        // the malformed line is dropped, the rest come back in file order
        let all = protocols.protocols();
        let names: Vec<&str> = all.iter().map(Protocol::name).collect();
        assert_eq!(names, ["ip", "icmp", "ggp", "tcp", "udp"]);
    }

    #[test]
    fn test_services_file() {
        let db = TempDb::new("services", SERVICES);
        let services = FileServicesDb::with_path(&db.path).expect("valid services file");

        let exec = services
            .service_by_name("exec", Some("tcp"))
            .expect("exec is listed");
        assert_eq!(exec.port(), 512);

        // protocol-qualified lookups skip entries on other transports
        let comsat = services
            .service_by_name("comsat", Some("udp"))
            .expect("alias matches");
        assert_eq!(comsat.name(), "biff");
        assert_eq!(comsat.port(), 512);
        assert!(services.service_by_name("comsat", Some("tcp")).is_none());

        // a None proto matches the first hit in file order (tcp first here)
        let echo = services.service_by_port(7, None).expect("echo is listed");
        assert_eq!(echo.proto(), "tcp");
        let echo = services
            .service_by_port(7, Some("udp"))
            .expect("udp echo is listed");
        assert_eq!(echo.proto(), "udp");

        assert!(services.service_by_name("no-such-service", None).is_none());
        assert!(services.service_by_port(4711, None).is_none());

        // malformed rows (bad port, missing proto) are dropped from the scan
        let all = services.services();
        assert_eq!(all.len(), 7);
        assert!(all.iter().all(|service| service.name() != "bad-port"));
        assert!(all.iter().all(|service| service.name() != "bare-data"));
    }

    #[test]
    fn test_probe_rejects_unusable_files() {
        let missing = std::env::temp_dir().join("netdb-no-such-file");
        assert!(matches!(
            FileProtocolsDb::with_path(&missing),
            Err(UnavailableReason::Unreadable { .. })
        ));

        let db = TempDb::new("empty", "# nothing but comments\n\n");
        assert!(matches!(
            FileServicesDb::with_path(&db.path),
            Err(UnavailableReason::NoEntries { .. })
        ));

        // a protocols-style file is not a usable services file
        let db = TempDb::new("cross", "tcp 6 TCP\n");
        assert!(matches!(
            FileServicesDb::with_path(&db.path),
            Err(UnavailableReason::NoEntries { .. })
        ));
    }

    #[test]
    fn test_file_vanishing_after_probe_means_not_found() {
        let db = TempDb::new("vanishing", PROTOCOLS);
        let protocols = FileProtocolsDb::with_path(&db.path).expect("valid protocols file");

        fs::remove_file(&db.path).expect("temp db removable");

        assert!(protocols.protocol_by_name("tcp").is_none());
        assert!(protocols.protocols().is_empty());
    }
}
