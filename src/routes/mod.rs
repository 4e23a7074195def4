// Routes module - reads the kernel IPv4 route table and picks egress routes

pub mod lookup;
pub mod parser;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::Ipv4Addr;

/// Route flags as exposed by the kernel (`RTF_*`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RouteFlags(u16);

impl RouteFlags {
    pub const UP: RouteFlags = RouteFlags(0x0001);
    pub const GATEWAY: RouteFlags = RouteFlags(0x0002);
    pub const HOST: RouteFlags = RouteFlags(0x0004);
    pub const REJECT: RouteFlags = RouteFlags(0x0200);

    pub const fn from_bits(bits: u16) -> Self {
        RouteFlags(bits)
    }

    pub const fn bits(self) -> u16 {
        self.0
    }

    pub const fn contains(self, other: RouteFlags) -> bool {
        self.0 & other.0 == other.0
    }

    /// Up and not rejecting; only such routes take part in matching
    pub const fn is_usable(self) -> bool {
        self.contains(RouteFlags::UP) && !self.contains(RouteFlags::REJECT)
    }
}

impl std::ops::BitOr for RouteFlags {
    type Output = RouteFlags;

    fn bitor(self, rhs: RouteFlags) -> RouteFlags {
        RouteFlags(self.0 | rhs.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteEntry {
    pub destination: Ipv4Addr,
    pub mask: Ipv4Addr,
    pub gateway: Ipv4Addr,
    pub interface: String,
    pub interface_address: Ipv4Addr,
    pub flags: RouteFlags,
}

impl RouteEntry {
    pub fn mask_bits(&self) -> u32 {
        u32::from(self.mask)
    }

    /// Check if `target` falls within this route's destination network
    pub fn matches(&self, target: Ipv4Addr) -> bool {
        let mask = self.mask_bits();
        (u32::from(target) & mask) == (u32::from(self.destination) & mask)
    }
}

impl fmt::Display for RouteEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{} via {} dev {} src {}",
            self.destination,
            self.mask_bits().count_ones(),
            self.gateway,
            self.interface,
            self.interface_address
        )
    }
}

/// Snapshot of the usable routes on this host
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutingTable {
    pub hostname: String,
    pub routes: Vec<RouteEntry>,
    pub timestamp: String,
}

impl RoutingTable {
    pub fn new(routes: Vec<RouteEntry>) -> Self {
        RoutingTable {
            hostname: get_hostname(),
            routes,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

fn get_hostname() -> String {
    hostname::get()
        .ok()
        .and_then(|h| h.into_string().ok())
        .unwrap_or_else(|| "unknown".to_string())
}
