// Local network interfaces as seen by the resolver

use crate::error::ResolverError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;

/// An IPv4 address bound with a subnet prefix, e.g. `192.168.1.5/24`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct NetworkInterface {
    address: Ipv4Addr,
    prefix_len: u8,
}

impl NetworkInterface {
    pub fn new(address: Ipv4Addr, prefix_len: u8) -> Result<Self, ResolverError> {
        if prefix_len > 32 {
            return Err(ResolverError::InvalidInterface(format!(
                "{}/{}: prefix length exceeds 32",
                address, prefix_len
            )));
        }
        Ok(NetworkInterface {
            address,
            prefix_len,
        })
    }

    pub fn address(&self) -> Ipv4Addr {
        self.address
    }

    pub fn prefix_len(&self) -> u8 {
        self.prefix_len
    }

    pub fn mask(&self) -> u32 {
        prefix_to_mask(self.prefix_len)
    }

    /// Network address of the subnet this interface sits on
    pub fn network(&self) -> Ipv4Addr {
        Ipv4Addr::from(u32::from(self.address) & self.mask())
    }

    /// Check if `target` falls within this interface's subnet
    pub fn contains(&self, target: Ipv4Addr) -> bool {
        let mask = self.mask();
        (u32::from(target) & mask) == (u32::from(self.address) & mask)
    }

    pub fn is_loopback(&self) -> bool {
        self.address.is_loopback()
    }
}

pub(crate) fn prefix_to_mask(prefix_len: u8) -> u32 {
    match prefix_len {
        0 => 0,
        len if len >= 32 => 0xFFFFFFFF,
        len => 0xFFFFFFFF << (32 - len),
    }
}

impl fmt::Display for NetworkInterface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.address, self.prefix_len)
    }
}

impl FromStr for NetworkInterface {
    type Err = ResolverError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: &str| ResolverError::InvalidInterface(format!("{}: {}", s, reason));

        let (addr, prefix) = match s.trim().split_once('/') {
            Some((addr, prefix)) => (addr, Some(prefix)),
            // No prefix length specified, assume a host address
            None => (s.trim(), None),
        };

        let address: Ipv4Addr = addr.parse().map_err(|_| invalid("bad IPv4 address"))?;
        let prefix_len = match prefix {
            Some(p) => p.parse().map_err(|_| invalid("bad prefix length"))?,
            None => 32,
        };

        NetworkInterface::new(address, prefix_len)
    }
}

impl TryFrom<String> for NetworkInterface {
    type Error = ResolverError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<NetworkInterface> for String {
    fn from(iface: NetworkInterface) -> Self {
        iface.to_string()
    }
}
