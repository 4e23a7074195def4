// Egress address discovery by connecting an unsent UDP socket

use crate::error::{ResolverError, ResolverResult};
use std::io::ErrorKind;
use std::net::{IpAddr, Ipv4Addr, SocketAddr, UdpSocket};

pub const DEFAULT_PROBE_PORT: u16 = 1;

/// Lets the kernel pick a source address for `target` without sending anything.
///
/// A UDP `connect` only fixes the peer and the local address; no packet
/// leaves the host. The socket is closed when the probe returns.
#[derive(Debug, Clone, Copy)]
pub struct SocketProbe {
    port: u16,
}

impl Default for SocketProbe {
    fn default() -> Self {
        SocketProbe::new(DEFAULT_PROBE_PORT)
    }
}

impl SocketProbe {
    pub fn new(port: u16) -> Self {
        SocketProbe { port }
    }

    pub fn egress_address(&self, target: Ipv4Addr) -> Option<Ipv4Addr> {
        match self.probe(target) {
            Ok(addr) => addr,
            Err(e) if is_unroutable(&e) => {
                tracing::debug!("Probe to {} reports no route, using loopback", target);
                Some(Ipv4Addr::LOCALHOST)
            }
            Err(e) => {
                tracing::debug!("Probe to {} failed: {}", target, e);
                None
            }
        }
    }

    fn probe(&self, target: Ipv4Addr) -> ResolverResult<Option<Ipv4Addr>> {
        let socket = UdpSocket::bind(SocketAddr::from((Ipv4Addr::UNSPECIFIED, 0)))?;
        socket.connect(SocketAddr::from((target, self.port)))?;

        match socket.local_addr()?.ip() {
            IpAddr::V4(addr) if !addr.is_unspecified() => Ok(Some(addr)),
            _ => Ok(None),
        }
    }
}

fn is_unroutable(err: &ResolverError) -> bool {
    match err {
        ResolverError::Probe(io) => matches!(
            io.kind(),
            ErrorKind::AddrNotAvailable | ErrorKind::NetworkUnreachable | ErrorKind::HostUnreachable
        ),
        _ => false,
    }
}
