// Platform-selected source of "which local address would the OS send from"

use crate::probe::SocketProbe;
use crate::routes::lookup::RouteEngine;
use crate::routes::parser::RouteTableReader;
use serde::{Deserialize, Serialize};
use std::net::Ipv4Addr;

/// Best egress address for a target, as the OS would choose it
pub trait EgressSource: Send + Sync {
    fn egress_address(&self, target: Ipv4Addr) -> Option<Ipv4Addr>;
}

/// Which egress strategy to use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum Backend {
    /// Route table where the OS exposes one, socket probe otherwise
    #[default]
    Auto,
    RouteTable,
    Probe,
}

#[derive(Debug, Clone)]
pub enum PlatformEgress {
    RouteTable(RouteTableReader),
    SocketProbe(SocketProbe),
}

impl PlatformEgress {
    /// Pick the strategy for this host
    pub fn detect() -> Self {
        Self::select(Backend::Auto, RouteTableReader::default(), SocketProbe::default())
    }

    pub fn select(backend: Backend, reader: RouteTableReader, probe: SocketProbe) -> Self {
        let egress = match backend {
            Backend::RouteTable => PlatformEgress::RouteTable(reader),
            Backend::Probe => PlatformEgress::SocketProbe(probe),
            Backend::Auto if cfg!(target_os = "linux") && reader.is_available() => {
                PlatformEgress::RouteTable(reader)
            }
            Backend::Auto => PlatformEgress::SocketProbe(probe),
        };
        tracing::debug!("Using {} egress backend", egress.name());
        egress
    }

    pub fn name(&self) -> &'static str {
        match self {
            PlatformEgress::RouteTable(_) => "route-table",
            PlatformEgress::SocketProbe(_) => "probe",
        }
    }
}

impl EgressSource for PlatformEgress {
    fn egress_address(&self, target: Ipv4Addr) -> Option<Ipv4Addr> {
        match self {
            PlatformEgress::RouteTable(reader) => {
                RouteEngine::new(reader.read_routes()).egress_address(target)
            }
            PlatformEgress::SocketProbe(probe) => probe.egress_address(target),
        }
    }
}

impl<F> EgressSource for F
where
    F: Fn(Ipv4Addr) -> Option<Ipv4Addr> + Send + Sync,
{
    fn egress_address(&self, target: Ipv4Addr) -> Option<Ipv4Addr> {
        self(target)
    }
}
