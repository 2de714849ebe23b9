//! Host-only check for the admin pages.
//!
//! This compares the peer address with the server's own addresses and nothing
//! more. Anyone on the network who can spoof or share the server's address
//! passes it, so treat it as a convenience for keeping the admin pages off
//! the shop-floor tablets, not as access control.

use std::net::{IpAddr, Ipv4Addr, UdpSocket};
use tracing::{debug, warn};

/// Any routable address works, no packet is sent.
const OUTBOUND_PROBE_ADDR: &str = "8.8.8.8:80";

pub struct AccessGate {
    server_ip: IpAddr,
}

impl AccessGate {
    pub fn new(server_ip: IpAddr) -> AccessGate {
        AccessGate {
            server_ip: server_ip.to_canonical(),
        }
    }

    pub fn server_ip(&self) -> IpAddr {
        self.server_ip
    }

    /// True if `addr` is a loopback address or the server's own address.
    pub fn is_host(&self, addr: IpAddr) -> bool {
        let addr = addr.to_canonical();
        addr.is_loopback() || addr == self.server_ip
    }
}

const ADMIN_SEGMENT: &str = "admin";

/// Paths served only to the host.
///
/// The path is judged after percent-decoding and dropping empty and `.`
/// segments, the same way the static file service resolves it, so
/// `/%61dmin/x` or `//admin/x` count as admin paths too.
pub fn is_admin_path(path: &str) -> bool {
    let decoded = urlencoding::decode_binary(path.as_bytes());
    let decoded = String::from_utf8_lossy(&decoded);

    let mut segments: Vec<&str> = Vec::new();
    for segment in decoded.split(['/', '\\']) {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            segment => segments.push(segment),
        }
    }

    segments
        .first()
        .is_some_and(|first| first.eq_ignore_ascii_case(ADMIN_SEGMENT))
}

/// The address this machine uses to reach the outside, i.e. the one other
/// devices on the LAN see. Falls back to `127.0.0.1`.
pub fn detect_server_ip() -> IpAddr {
    let probe = || -> std::io::Result<IpAddr> {
        let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0))?;
        socket.connect(OUTBOUND_PROBE_ADDR)?;
        Ok(socket.local_addr()?.ip())
    };

    match probe() {
        Ok(ip) => {
            debug!("Detected server address {}", ip);
            ip
        }
        Err(err) => {
            warn!("Could not detect server address, using loopback: {}", err);
            IpAddr::V4(Ipv4Addr::LOCALHOST)
        }
    }
}
