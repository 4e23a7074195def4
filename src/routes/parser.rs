// Route table reader for the kernel's textual IPv4 route table (/proc/net/route)

use super::{RouteEntry, RouteFlags};
use crate::error::{ResolverError, ResolverResult};
use std::net::Ipv4Addr;
use std::path::{Path, PathBuf};

pub const DEFAULT_ROUTE_TABLE_PATH: &str = "/proc/net/route";
const LOOPBACK_NAME: &str = "lo";

/// Destination, gateway, flags and mask columns; the mask is the 8th field
const MIN_FIELDS: usize = 8;

/// IPv4 address of one local interface
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterfaceAddress {
    pub name: String,
    pub address: Ipv4Addr,
    pub loopback: bool,
}

/// Per-read snapshot of local interface addresses, keyed by interface name
#[derive(Debug, Clone, Default)]
pub struct InterfaceAddresses {
    entries: Vec<InterfaceAddress>,
}

impl InterfaceAddresses {
    pub fn new(entries: Vec<InterfaceAddress>) -> Self {
        InterfaceAddresses { entries }
    }

    /// Ask the OS for every IPv4 address bound to a local interface
    #[cfg(unix)]
    pub fn query() -> ResolverResult<Self> {
        use nix::ifaddrs::getifaddrs;
        use nix::net::if_::InterfaceFlags;

        let addrs = getifaddrs().map_err(|e| ResolverError::InterfaceQuery(e.to_string()))?;

        let entries = addrs
            .filter_map(|ifa| {
                let sin = ifa.address.as_ref()?.as_sockaddr_in()?;
                Some(InterfaceAddress {
                    name: ifa.interface_name.clone(),
                    address: Ipv4Addr::from(sin.ip()),
                    loopback: ifa.flags.contains(InterfaceFlags::IFF_LOOPBACK),
                })
            })
            .collect();

        Ok(InterfaceAddresses { entries })
    }

    #[cfg(not(unix))]
    pub fn query() -> ResolverResult<Self> {
        Err(ResolverError::InterfaceQuery(
            "interface address query not supported on this platform".to_string(),
        ))
    }

    /// First IPv4 address of the named interface
    pub fn address_of(&self, name: &str) -> ResolverResult<Ipv4Addr> {
        self.entries
            .iter()
            .find(|e| e.name == name)
            .map(|e| e.address)
            .ok_or_else(|| ResolverError::InterfaceAddress(name.to_string()))
    }

    fn loopback(&self) -> Option<&InterfaceAddress> {
        self.entries.iter().find(|e| e.loopback)
    }
}

/// Reads usable IPv4 routes from a textual route table
#[derive(Debug, Clone)]
pub struct RouteTableReader {
    path: PathBuf,
}

impl Default for RouteTableReader {
    fn default() -> Self {
        RouteTableReader::new(DEFAULT_ROUTE_TABLE_PATH)
    }
}

impl RouteTableReader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        RouteTableReader { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether the route table source exists on this host
    pub fn is_available(&self) -> bool {
        self.path.exists()
    }

    /// Read the current usable routes, plus a synthesized loopback route.
    ///
    /// An unreadable source yields an empty set.
    pub fn read_routes(&self) -> Vec<RouteEntry> {
        let interfaces = InterfaceAddresses::query().unwrap_or_else(|e| {
            tracing::debug!("Interface address query failed: {}", e);
            InterfaceAddresses::default()
        });

        self.read_routes_with(&interfaces)
    }

    pub fn read_routes_with(&self, interfaces: &InterfaceAddresses) -> Vec<RouteEntry> {
        match self.try_read(interfaces) {
            Ok(routes) => routes,
            Err(e) => {
                tracing::warn!("{}", e);
                Vec::new()
            }
        }
    }

    fn try_read(&self, interfaces: &InterfaceAddresses) -> ResolverResult<Vec<RouteEntry>> {
        let content =
            std::fs::read_to_string(&self.path).map_err(|source| ResolverError::RouteTableRead {
                path: self.path.clone(),
                source,
            })?;

        let mut routes = parse_route_table(&content, interfaces);
        routes.push(loopback_route(interfaces));
        Ok(routes)
    }
}

/// Parse the table text into usable routes; bad lines and routes on
/// interfaces without an IPv4 address are skipped.
pub fn parse_route_table(content: &str, interfaces: &InterfaceAddresses) -> Vec<RouteEntry> {
    let mut routes = Vec::new();

    // Skip the header line
    for (idx, line) in content.lines().enumerate().skip(1) {
        if line.trim().is_empty() {
            continue;
        }

        let parsed = match parse_line(idx + 1, line) {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::debug!("Skipping route: {}", e);
                continue;
            }
        };

        if !parsed.flags.is_usable() {
            continue;
        }

        let interface_address = match interfaces.address_of(&parsed.interface) {
            Ok(addr) => addr,
            Err(e) => {
                tracing::debug!("Skipping route to {}: {}", parsed.destination, e);
                continue;
            }
        };

        routes.push(RouteEntry {
            destination: parsed.destination,
            mask: parsed.mask,
            gateway: parsed.gateway,
            interface: parsed.interface,
            interface_address,
            flags: parsed.flags,
        });
    }

    routes
}

struct ParsedLine {
    interface: String,
    destination: Ipv4Addr,
    gateway: Ipv4Addr,
    flags: RouteFlags,
    mask: Ipv4Addr,
}

fn parse_line(line_no: usize, line: &str) -> ResolverResult<ParsedLine> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    if fields.len() < MIN_FIELDS {
        return Err(ResolverError::MalformedLine {
            line: line_no,
            reason: format!("expected at least {} fields, got {}", MIN_FIELDS, fields.len()),
        });
    }

    let field = |name: &str, raw: &str| {
        u32::from_str_radix(raw, 16).map_err(|_| ResolverError::MalformedLine {
            line: line_no,
            reason: format!("bad {} field {:?}", name, raw),
        })
    };

    let flags = field("flags", fields[3])?;
    let flags = u16::try_from(flags).map_err(|_| ResolverError::MalformedLine {
        line: line_no,
        reason: format!("flags out of range {:?}", fields[3]),
    })?;

    Ok(ParsedLine {
        interface: fields[0].to_string(),
        destination: kernel_hex_addr(field("destination", fields[1])?),
        gateway: kernel_hex_addr(field("gateway", fields[2])?),
        flags: RouteFlags::from_bits(flags),
        mask: kernel_hex_addr(field("mask", fields[7])?),
    })
}

/// The kernel prints the raw in-memory `u32`, so native byte order recovers
/// the network-order octets.
fn kernel_hex_addr(raw: u32) -> Ipv4Addr {
    Ipv4Addr::from(raw.to_ne_bytes())
}

/// Host route for the loopback address, which the textual table may omit
fn loopback_route(interfaces: &InterfaceAddresses) -> RouteEntry {
    let (name, address) = match interfaces.loopback() {
        Some(lo) => (lo.name.clone(), lo.address),
        None => (LOOPBACK_NAME.to_string(), Ipv4Addr::LOCALHOST),
    };

    RouteEntry {
        destination: address,
        mask: Ipv4Addr::BROADCAST,
        gateway: Ipv4Addr::UNSPECIFIED,
        interface: name,
        interface_address: address,
        flags: RouteFlags::UP | RouteFlags::HOST,
    }
}
