//! Raw netdb access. This is the only module touching foreign memory; every
//! function here returns owned records with the byte order already fixed up.

use std::ffi::{CStr, CString};
use std::ptr;
use std::sync::{Mutex, MutexGuard, PoisonError};

use libc::{c_char, c_int};

use crate::protocol::Protocol;
use crate::service::Service;

// Solaris keeps the netdb calls in libsocket/libnsl.
#[cfg(any(target_os = "illumos", target_os = "solaris"))]
#[link(name = "socket")]
#[link(name = "nsl")]
extern "C" {}

#[repr(C)]
struct RawProtoent {
    p_name: *mut c_char,
    p_aliases: *mut *mut c_char,
    p_proto: c_int,
}

#[repr(C)]
struct RawServent {
    s_name: *mut c_char,
    s_aliases: *mut *mut c_char,
    s_port: c_int,
    s_proto: *mut c_char,
}

extern "C" {
    fn getprotobyname(name: *const c_char) -> *mut RawProtoent;
    fn getprotobynumber(number: c_int) -> *mut RawProtoent;
    fn setprotoent(stayopen: c_int);
    fn getprotoent() -> *mut RawProtoent;
    fn endprotoent();

    fn getservbyname(name: *const c_char, proto: *const c_char) -> *mut RawServent;
    fn getservbyport(port: c_int, proto: *const c_char) -> *mut RawServent;
    fn setservent(stayopen: c_int);
    fn getservent() -> *mut RawServent;
    fn endservent();
}

/// Serializes access to libc's process-global netdb state: the static
/// records handed out by the non-reentrant calls and the shared enumeration
/// cursor.
static NETDB_LOCK: Mutex<()> = Mutex::new(());

fn lock() -> MutexGuard<'static, ()> {
    NETDB_LOCK.lock().unwrap_or_else(PoisonError::into_inner)
}

fn c_string(s: &str) -> Option<CString> {
    // an interior NUL can never match a db entry
    CString::new(s).ok()
}

fn proto_ptr(proto: Option<&CStr>) -> *const c_char {
    proto.map_or(ptr::null(), CStr::as_ptr)
}

unsafe fn owned_string(ptr: *const c_char) -> String {
    if ptr.is_null() {
        String::new()
    } else {
        CStr::from_ptr(ptr).to_string_lossy().into_owned()
    }
}

/// Walks a NULL-terminated `char *` array into owned strings.
unsafe fn owned_string_array(mut ptr: *mut *mut c_char) -> Vec<String> {
    let mut strings = Vec::new();

    if ptr.is_null() {
        return strings;
    }

    while !(*ptr).is_null() {
        strings.push(owned_string(*ptr));
        ptr = ptr.add(1);
    }

    strings
}

unsafe fn protocol_from_raw(raw: *const RawProtoent) -> Option<Protocol> {
    if raw.is_null() {
        return None;
    }

    let raw = &*raw;

    Some(Protocol::new(
        owned_string(raw.p_name),
        raw.p_proto as i32,
        owned_string_array(raw.p_aliases),
    ))
}

unsafe fn service_from_raw(raw: *const RawServent) -> Option<Service> {
    if raw.is_null() {
        return None;
    }

    let raw = &*raw;

    // s_port carries a network-order 16 bit value; the unsigned conversion
    // also keeps ports >= 32768 from going negative
    let port = u16::from_be(raw.s_port as u16);

    Some(Service::new(
        owned_string(raw.s_name),
        port,
        owned_string(raw.s_proto),
        owned_string_array(raw.s_aliases),
    ))
}

/// Reentrant lookups: glibc and musl provide `*_r` variants filling a
/// caller-owned buffer, so single lookups need no lock.
#[cfg(target_os = "linux")]
mod lookup {
    use super::*;

    extern "C" {
        fn getprotobyname_r(
            name: *const c_char,
            result_buf: *mut RawProtoent,
            buf: *mut c_char,
            buflen: libc::size_t,
            result: *mut *mut RawProtoent,
        ) -> c_int;
        fn getprotobynumber_r(
            number: c_int,
            result_buf: *mut RawProtoent,
            buf: *mut c_char,
            buflen: libc::size_t,
            result: *mut *mut RawProtoent,
        ) -> c_int;
        fn getservbyname_r(
            name: *const c_char,
            proto: *const c_char,
            result_buf: *mut RawServent,
            buf: *mut c_char,
            buflen: libc::size_t,
            result: *mut *mut RawServent,
        ) -> c_int;
        fn getservbyport_r(
            port: c_int,
            proto: *const c_char,
            result_buf: *mut RawServent,
            buf: *mut c_char,
            buflen: libc::size_t,
            result: *mut *mut RawServent,
        ) -> c_int;
    }

    const INITIAL_BUFLEN: usize = 1024;
    const MAX_BUFLEN: usize = 1 << 20;

    fn grow(buf: &mut Vec<u8>) -> bool {
        if buf.len() >= MAX_BUFLEN {
            return false;
        }

        buf.resize(buf.len() * 2, 0);
        true
    }

    fn protocol_lookup(
        call: impl Fn(*mut RawProtoent, *mut c_char, libc::size_t, *mut *mut RawProtoent) -> c_int,
    ) -> Option<Protocol> {
        let mut buf = vec![0u8; INITIAL_BUFLEN];

        loop {
            let mut protoent = RawProtoent {
                p_name: ptr::null_mut(),
                p_aliases: ptr::null_mut(),
                p_proto: 0,
            };
            let mut result: *mut RawProtoent = ptr::null_mut();

            let rc = call(&mut protoent, buf.as_mut_ptr().cast(), buf.len(), &mut result);

            if rc == 0 {
                if result.is_null() {
                    return None;
                }

                return unsafe { protocol_from_raw(&protoent) };
            }

            if rc != libc::ERANGE || !grow(&mut buf) {
                return None;
            }
        }
    }

    fn service_lookup(
        call: impl Fn(*mut RawServent, *mut c_char, libc::size_t, *mut *mut RawServent) -> c_int,
    ) -> Option<Service> {
        let mut buf = vec![0u8; INITIAL_BUFLEN];

        loop {
            let mut servent = RawServent {
                s_name: ptr::null_mut(),
                s_aliases: ptr::null_mut(),
                s_port: 0,
                s_proto: ptr::null_mut(),
            };
            let mut result: *mut RawServent = ptr::null_mut();

            let rc = call(&mut servent, buf.as_mut_ptr().cast(), buf.len(), &mut result);

            if rc == 0 {
                if result.is_null() {
                    return None;
                }

                return unsafe { service_from_raw(&servent) };
            }

            if rc != libc::ERANGE || !grow(&mut buf) {
                return None;
            }
        }
    }

    pub(super) fn protocol_by_name(name: &CStr) -> Option<Protocol> {
        protocol_lookup(|protoent, buf, buflen, result| unsafe {
            getprotobyname_r(name.as_ptr(), protoent, buf, buflen, result)
        })
    }

    pub(super) fn protocol_by_number(number: c_int) -> Option<Protocol> {
        protocol_lookup(|protoent, buf, buflen, result| unsafe {
            getprotobynumber_r(number, protoent, buf, buflen, result)
        })
    }

    pub(super) fn service_by_name(name: &CStr, proto: Option<&CStr>) -> Option<Service> {
        service_lookup(|servent, buf, buflen, result| unsafe {
            getservbyname_r(name.as_ptr(), proto_ptr(proto), servent, buf, buflen, result)
        })
    }

    pub(super) fn service_by_port(port: c_int, proto: Option<&CStr>) -> Option<Service> {
        service_lookup(|servent, buf, buflen, result| unsafe {
            getservbyport_r(port, proto_ptr(proto), servent, buf, buflen, result)
        })
    }
}

/// Non-reentrant lookups: the returned record lives in static libc storage,
/// so the call and the copy-out happen under the netdb lock.
#[cfg(not(target_os = "linux"))]
mod lookup {
    use super::*;

    pub(super) fn protocol_by_name(name: &CStr) -> Option<Protocol> {
        let _guard = lock();

        unsafe { protocol_from_raw(getprotobyname(name.as_ptr())) }
    }

    pub(super) fn protocol_by_number(number: c_int) -> Option<Protocol> {
        let _guard = lock();

        unsafe { protocol_from_raw(getprotobynumber(number)) }
    }

    pub(super) fn service_by_name(name: &CStr, proto: Option<&CStr>) -> Option<Service> {
        let _guard = lock();

        unsafe { service_from_raw(getservbyname(name.as_ptr(), proto_ptr(proto))) }
    }

    pub(super) fn service_by_port(port: c_int, proto: Option<&CStr>) -> Option<Service> {
        let _guard = lock();

        unsafe { service_from_raw(getservbyport(port, proto_ptr(proto))) }
    }
}

pub(super) fn protocol_by_name(name: &str) -> Option<Protocol> {
    let name = c_string(name)?;

    lookup::protocol_by_name(&name)
}

pub(super) fn protocol_by_number(number: i32) -> Option<Protocol> {
    lookup::protocol_by_number(number as c_int)
}

pub(super) fn service_by_name(name: &str, proto: Option<&str>) -> Option<Service> {
    let name = c_string(name)?;
    let proto = match proto {
        Some(proto) => Some(c_string(proto)?),
        None => None,
    };

    lookup::service_by_name(&name, proto.as_deref())
}

pub(super) fn service_by_port(port: u16, proto: Option<&str>) -> Option<Service> {
    let proto = match proto {
        Some(proto) => Some(c_string(proto)?),
        None => None,
    };

    // the native call expects the port in network byte order
    lookup::service_by_port(port.to_be() as c_int, proto.as_deref())
}

/// Scoped protocol enumeration cursor; rewinds on open, ends on drop.
struct ProtoentCursor;

impl ProtoentCursor {
    fn open() -> Self {
        unsafe { setprotoent(0) };
        Self
    }

    fn next(&mut self) -> Option<Protocol> {
        unsafe { protocol_from_raw(getprotoent()) }
    }
}

impl Drop for ProtoentCursor {
    fn drop(&mut self) {
        unsafe { endprotoent() };
    }
}

/// Scoped service enumeration cursor; rewinds on open, ends on drop.
struct ServentCursor;

impl ServentCursor {
    fn open() -> Self {
        unsafe { setservent(0) };
        Self
    }

    fn next(&mut self) -> Option<Service> {
        unsafe { service_from_raw(getservent()) }
    }
}

impl Drop for ServentCursor {
    fn drop(&mut self) {
        unsafe { endservent() };
    }
}

pub(super) fn protocols() -> Vec<Protocol> {
    // the enumeration cursor is process-global even where reentrant
    // single-record lookups exist
    let _guard = lock();

    let mut cursor = ProtoentCursor::open();
    let mut protocols = Vec::new();

    while let Some(protocol) = cursor.next() {
        protocols.push(protocol);
    }

    protocols
}

pub(super) fn services() -> Vec<Service> {
    let _guard = lock();

    let mut cursor = ServentCursor::open();
    let mut services = Vec::new();

    while let Some(service) = cursor.next() {
        services.push(service);
    }

    services
}
