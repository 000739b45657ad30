//! Host network helpers: primary address discovery and port probing.

use crate::constants::PORT_PROBE_STEP;
use std::collections::HashSet;
use std::net::{IpAddr, Ipv4Addr, TcpListener, UdpSocket};

/// Primary non-loopback IPv4 address of this host.
///
/// Connecting a UDP socket sends nothing; it only makes the kernel pick
/// the outbound interface.
pub fn primary_ipv4() -> Option<Ipv4Addr> {
    let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0)).ok()?;
    socket.connect((Ipv4Addr::new(192, 0, 2, 1), 9)).ok()?;
    match socket.local_addr().ok()?.ip() {
        IpAddr::V4(ip) if !ip.is_loopback() && !ip.is_unspecified() => Some(ip),
        _ => None,
    }
}

/// True when nothing on this host is listening on `port`.
pub fn port_is_free(port: u16) -> bool {
    TcpListener::bind((Ipv4Addr::UNSPECIFIED, port)).is_ok()
}

/// First port at or above `base`, stepping by 1000, that no instance claims
/// and `is_free` accepts.
pub fn next_free_port(base: u16, taken: &HashSet<u16>, is_free: impl Fn(u16) -> bool) -> Option<u16> {
    let mut port = base;
    loop {
        if port != 0 && !taken.contains(&port) && is_free(port) {
            return Some(port);
        }
        port = port.checked_add(PORT_PROBE_STEP)?;
    }
}
