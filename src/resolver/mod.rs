//! Backend selection for protocol and service lookups.
//!
//! Three backends answer the same queries: the operating system's own netdb
//! functions, a scan of the flat database files, and a compiled-in table.
//! [`NetDb::open`] probes them in that order and commits to the first one
//! that works; the probe result of a rejected backend says why it was
//! rejected.

use std::io;
use std::path::PathBuf;
use std::sync::OnceLock;

use crate::protocol::Protocol;
use crate::service::Service;

pub mod builtin;
pub mod file;
pub mod native;

use builtin::{BuiltinProtocolsDb, BuiltinServicesDb};
use file::{FileProtocolsDb, FileServicesDb};
use native::{NativeProtocolsDb, NativeServicesDb};

/// Why a backend declined to construct itself.
#[derive(Debug, thiserror::Error)]
pub enum UnavailableReason {
    #[error("native lookups are not supported on this platform")]
    UnsupportedPlatform,

    #[error("native sanity lookup for {0:?} returned no data")]
    ProbeFailed(&'static str),

    #[error("unable to read {}: {err}", path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        err: io::Error,
    },

    #[error("{}: no usable entries", path.display())]
    NoEntries { path: PathBuf },
}

/// The protocol query capabilities every backend provides.
pub trait ProtocolsDb {
    /// Looks up a protocol by its official name or an alias.
    fn protocol_by_name(&self, name: &str) -> Option<Protocol>;

    /// Looks up a protocol by number.
    fn protocol_by_number(&self, number: i32) -> Option<Protocol>;

    /// Enumerates all protocols known to this backend.
    fn protocols(&self) -> Vec<Protocol>;
}

/// The service query capabilities every backend provides.
///
/// A `proto` of `None` matches any transport protocol.
pub trait ServicesDb {
    /// Looks up a service by its official name or an alias.
    fn service_by_name(&self, name: &str, proto: Option<&str>) -> Option<Service>;

    /// Looks up a service by port.
    fn service_by_port(&self, port: u16, proto: Option<&str>) -> Option<Service>;

    /// Enumerates all services known to this backend.
    fn services(&self) -> Vec<Service>;
}

#[derive(Debug)]
pub enum ProtocolsBackend {
    Native(NativeProtocolsDb),
    File(FileProtocolsDb),
    Builtin(&'static BuiltinProtocolsDb),
}

impl ProtocolsDb for ProtocolsBackend {
    fn protocol_by_name(&self, name: &str) -> Option<Protocol> {
        match self {
            Self::Native(db) => db.protocol_by_name(name),
            Self::File(db) => db.protocol_by_name(name),
            Self::Builtin(db) => db.protocol_by_name(name),
        }
    }

    fn protocol_by_number(&self, number: i32) -> Option<Protocol> {
        match self {
            Self::Native(db) => db.protocol_by_number(number),
            Self::File(db) => db.protocol_by_number(number),
            Self::Builtin(db) => db.protocol_by_number(number),
        }
    }

    fn protocols(&self) -> Vec<Protocol> {
        match self {
            Self::Native(db) => db.protocols(),
            Self::File(db) => db.protocols(),
            Self::Builtin(db) => db.protocols(),
        }
    }
}

#[derive(Debug)]
pub enum ServicesBackend {
    Native(NativeServicesDb),
    File(FileServicesDb),
    Builtin(&'static BuiltinServicesDb),
}

impl ServicesDb for ServicesBackend {
    fn service_by_name(&self, name: &str, proto: Option<&str>) -> Option<Service> {
        match self {
            Self::Native(db) => db.service_by_name(name, proto),
            Self::File(db) => db.service_by_name(name, proto),
            Self::Builtin(db) => db.service_by_name(name, proto),
        }
    }

    fn service_by_port(&self, port: u16, proto: Option<&str>) -> Option<Service> {
        match self {
            Self::Native(db) => db.service_by_port(port, proto),
            Self::File(db) => db.service_by_port(port, proto),
            Self::Builtin(db) => db.service_by_port(port, proto),
        }
    }

    fn services(&self) -> Vec<Service> {
        match self {
            Self::Native(db) => db.services(),
            Self::File(db) => db.services(),
            Self::Builtin(db) => db.services(),
        }
    }
}

/// The resolver strategy: one protocols backend and one services backend,
/// selected once.
pub struct NetDb {
    protocols: ProtocolsBackend,
    services: ServicesBackend,
}

impl NetDb {
    /// Probes the backends in priority order (native, file, built-in) and
    /// commits to the first available one for each database. The built-in
    /// tables always construct, so this never fails.
    pub fn open() -> Self {
        Self {
            protocols: Self::probe_protocols(),
            services: Self::probe_services(),
        }
    }

    /// Bypasses probing and uses the given backends.
    pub fn with_backends(protocols: ProtocolsBackend, services: ServicesBackend) -> Self {
        Self {
            protocols,
            services,
        }
    }

    fn probe_protocols() -> ProtocolsBackend {
        match NativeProtocolsDb::load() {
            Ok(db) => return ProtocolsBackend::Native(db),
            Err(reason) => log::debug!("native protocols db unavailable: {reason}"),
        }

        match FileProtocolsDb::load() {
            Ok(db) => return ProtocolsBackend::File(db),
            Err(reason) => log::debug!("protocols file unavailable: {reason}"),
        }

        log::warn!("falling back to the built-in protocols table");
        ProtocolsBackend::Builtin(BuiltinProtocolsDb::get())
    }

    fn probe_services() -> ServicesBackend {
        match NativeServicesDb::load() {
            Ok(db) => return ServicesBackend::Native(db),
            Err(reason) => log::debug!("native services db unavailable: {reason}"),
        }

        match FileServicesDb::load() {
            Ok(db) => return ServicesBackend::File(db),
            Err(reason) => log::debug!("services file unavailable: {reason}"),
        }

        log::warn!("falling back to the built-in services table");
        ServicesBackend::Builtin(BuiltinServicesDb::get())
    }

    pub fn protocol_by_name(&self, name: &str) -> Option<Protocol> {
        self.protocols.protocol_by_name(name)
    }

    pub fn protocol_by_number(&self, number: i32) -> Option<Protocol> {
        self.protocols.protocol_by_number(number)
    }

    pub fn protocols(&self) -> Vec<Protocol> {
        self.protocols.protocols()
    }

    pub fn service_by_name(&self, name: &str, proto: Option<&str>) -> Option<Service> {
        self.services.service_by_name(name, proto)
    }

    pub fn service_by_port(&self, port: u16, proto: Option<&str>) -> Option<Service> {
        self.services.service_by_port(port, proto)
    }

    pub fn services(&self) -> Vec<Service> {
        self.services.services()
    }
}

/// The process-wide resolver, probed on first use and then bound for the
/// lifetime of the process.
pub fn global() -> &'static NetDb {
    static GLOBAL: OnceLock<NetDb> = OnceLock::new();

    GLOBAL.get_or_init(NetDb::open)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn builtin_netdb() -> NetDb {
        NetDb::with_backends(
            ProtocolsBackend::Builtin(BuiltinProtocolsDb::get()),
            ServicesBackend::Builtin(BuiltinServicesDb::get()),
        )
    }

    #[test]
    fn test_injected_backends() {
        let netdb = builtin_netdb();

        let tcp = netdb.protocol_by_name("tcp").expect("tcp is built in");
        assert_eq!(tcp.number(), 6);

        let bootps = netdb
            .service_by_name("bootps", Some("udp"))
            .expect("bootps is built in");
        assert_eq!(bootps.port(), 67);
    }

    #[test]
    fn test_file_probe_reports_reason() {
        let reason = FileProtocolsDb::with_path("/nonexistent/netdb/protocols")
            .expect_err("backend must decline a missing file");
        assert!(matches!(reason, UnavailableReason::Unreadable { .. }));
    }

    #[test]
    fn test_lookup_miss_is_not_an_error() {
        let netdb = builtin_netdb();

        assert!(netdb.protocol_by_name("foo-bar-baz").is_none());
        assert!(netdb.protocol_by_number(-1).is_none());
        assert!(netdb.service_by_name("foo-bar-baz", None).is_none());
        assert!(netdb.service_by_port(0, Some("ipx")).is_none());
    }
}
