//! Lookups through the operating system's own netdb functions.
//!
//! Only platforms whose `protoent`/`servent` layout is known to match the
//! declared struct descriptions are allowed to bind the native calls; on
//! everything else this backend reports itself unavailable and the chain
//! moves on. All raw-memory handling lives in the `sys` submodule.

use crate::protocol::Protocol;
use crate::resolver::{ProtocolsDb, ServicesDb, UnavailableReason};
use crate::service::Service;

/// Kernel families with a verified netdb record layout.
const NATIVE_NETDB_SUPPORTED: bool = cfg!(any(
    target_os = "linux",
    target_os = "macos",
    target_os = "freebsd",
    target_os = "netbsd",
    target_os = "illumos",
    target_os = "solaris",
));

#[cfg(any(
    target_os = "linux",
    target_os = "macos",
    target_os = "freebsd",
    target_os = "netbsd",
    target_os = "illumos",
    target_os = "solaris",
))]
mod sys;

/// Stub used where the native record layout is unknown. The probe rejects
/// the platform before any of these can be reached.
#[cfg(not(any(
    target_os = "linux",
    target_os = "macos",
    target_os = "freebsd",
    target_os = "netbsd",
    target_os = "illumos",
    target_os = "solaris",
)))]
mod sys {
    use crate::protocol::Protocol;
    use crate::service::Service;

    pub(super) fn protocol_by_name(_name: &str) -> Option<Protocol> {
        None
    }

    pub(super) fn protocol_by_number(_number: i32) -> Option<Protocol> {
        None
    }

    pub(super) fn protocols() -> Vec<Protocol> {
        Vec::new()
    }

    pub(super) fn service_by_name(_name: &str, _proto: Option<&str>) -> Option<Service> {
        None
    }

    pub(super) fn service_by_port(_port: u16, _proto: Option<&str>) -> Option<Service> {
        None
    }

    pub(super) fn services() -> Vec<Service> {
        Vec::new()
    }
}

/// Protocol lookups through `getprotobyname(3)` and friends.
#[derive(Debug)]
pub struct NativeProtocolsDb {
    _priv: (),
}

impl NativeProtocolsDb {
    /// Availability probe: the platform must be allowlisted and a sanity
    /// lookup of the always-present "ip" protocol must produce a record.
    pub fn load() -> Result<Self, UnavailableReason> {
        if !NATIVE_NETDB_SUPPORTED {
            return Err(UnavailableReason::UnsupportedPlatform);
        }

        if sys::protocol_by_name("ip").is_none() {
            return Err(UnavailableReason::ProbeFailed("ip"));
        }

        if sys::protocol_by_number(0).is_none() {
            return Err(UnavailableReason::ProbeFailed("protocol 0"));
        }

        Ok(Self { _priv: () })
    }
}

impl ProtocolsDb for NativeProtocolsDb {
    fn protocol_by_name(&self, name: &str) -> Option<Protocol> {
        sys::protocol_by_name(name)
    }

    fn protocol_by_number(&self, number: i32) -> Option<Protocol> {
        sys::protocol_by_number(number)
    }

    fn protocols(&self) -> Vec<Protocol> {
        sys::protocols()
    }
}

/// Service lookups through `getservbyname(3)` and friends.
#[derive(Debug)]
pub struct NativeServicesDb {
    _priv: (),
}

impl NativeServicesDb {
    /// Availability probe: the platform must be allowlisted and the
    /// well-known bootps/udp service must resolve by name and by port.
    pub fn load() -> Result<Self, UnavailableReason> {
        if !NATIVE_NETDB_SUPPORTED {
            return Err(UnavailableReason::UnsupportedPlatform);
        }

        if sys::service_by_name("bootps", Some("udp")).is_none() {
            return Err(UnavailableReason::ProbeFailed("bootps/udp"));
        }

        if sys::service_by_port(67, Some("udp")).is_none() {
            return Err(UnavailableReason::ProbeFailed("port 67/udp"));
        }

        Ok(Self { _priv: () })
    }
}

impl ServicesDb for NativeServicesDb {
    fn service_by_name(&self, name: &str, proto: Option<&str>) -> Option<Service> {
        sys::service_by_name(name, proto)
    }

    fn service_by_port(&self, port: u16, proto: Option<&str>) -> Option<Service> {
        sys::service_by_port(port, proto)
    }

    fn services(&self) -> Vec<Service> {
        sys::services()
    }
}
