//! Portable protocol and service name resolution.
//!
//! Maps symbolic identifiers to numeric ones and back ("tcp" to 6,
//! port 67/udp to "bootps") without requiring any particular host setup.
//! Lookups go through the first working backend out of three: the operating
//! system's own netdb functions, a scan of the flat database files
//! (`/etc/protocols`, `/etc/services`), and finally a compiled-in IANA
//! table, so a result is always available.
//!
//! ```no_run
//! use proxmox_netdb::{Protocol, Service};
//!
//! let tcp = Protocol::by_name("tcp").expect("tcp is always resolvable");
//! assert_eq!(tcp.number(), 6);
//!
//! let bootps = Service::by_port(67, Some("udp")).expect("bootps/udp");
//! assert_eq!(bootps.name(), "bootps");
//! ```
//!
//! The backend is chosen once, on first use, and stays bound for the process
//! lifetime. Code that wants control over the selection can build a
//! [`resolver::NetDb`] with explicit backends instead of going through the
//! process-wide one.

pub mod protocol;
pub mod resolver;
pub mod service;

pub(crate) mod parse;

pub use protocol::Protocol;
pub use resolver::NetDb;
pub use service::Service;
