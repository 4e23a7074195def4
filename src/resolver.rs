// Interface resolver: which known local interface reaches a target

use crate::egress::{EgressSource, PlatformEgress};
use crate::interface::NetworkInterface;
use std::net::Ipv4Addr;

/// Maps a target address to the local interface the OS would send from.
///
/// Stateless between calls; every `resolve` re-reads the OS state it needs.
pub struct InterfaceResolver<S = PlatformEgress> {
    source: S,
}

impl InterfaceResolver<PlatformEgress> {
    /// Resolver backed by this platform's egress strategy
    pub fn detect() -> Self {
        InterfaceResolver::new(PlatformEgress::detect())
    }
}

impl<S: EgressSource> InterfaceResolver<S> {
    pub fn new(source: S) -> Self {
        InterfaceResolver { source }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Resolve the interface used to reach `target`, or `None` if unreachable.
    ///
    /// Subnet membership is checked first; when several known subnets contain
    /// the target, the longest prefix wins and equal prefixes keep iteration
    /// order. Otherwise the OS is asked for its egress address, which must
    /// equal one of the known interface addresses.
    pub fn resolve<'a, I>(&self, interfaces: I, target: Ipv4Addr) -> Option<NetworkInterface>
    where
        I: IntoIterator<Item = &'a NetworkInterface>,
    {
        let interfaces: Vec<&NetworkInterface> = interfaces.into_iter().collect();
        if interfaces.is_empty() {
            return None;
        }

        if let Some(iface) = static_match(&interfaces, target) {
            tracing::debug!("{} is on the subnet of {}", target, iface);
            return Some(iface);
        }

        let Some(egress) = self.source.egress_address(target) else {
            tracing::debug!("No egress address for {}", target);
            return None;
        };

        let found = interfaces
            .iter()
            .find(|iface| iface.address() == egress)
            .map(|iface| **iface);

        match found {
            Some(iface) => tracing::debug!("{} is reached via {}", target, iface),
            None => tracing::debug!(
                "Egress address {} for {} is not a known interface",
                egress,
                target
            ),
        }
        found
    }
}

fn static_match(interfaces: &[&NetworkInterface], target: Ipv4Addr) -> Option<NetworkInterface> {
    let mut best: Option<&NetworkInterface> = None;

    for iface in interfaces.iter().copied().filter(|i| i.contains(target)) {
        match best {
            Some(current) if iface.prefix_len() <= current.prefix_len() => {}
            _ => best = Some(iface),
        }
    }

    best.copied()
}
