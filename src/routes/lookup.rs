// Route lookup engine with longest prefix matching

use super::RouteEntry;
use std::net::Ipv4Addr;

const EXACT: u32 = 0xFFFFFFFF;

pub struct RouteEngine {
    routes: Vec<RouteEntry>,
}

impl RouteEngine {
    pub fn new(routes: Vec<RouteEntry>) -> Self {
        RouteEngine { routes }
    }

    pub fn routes(&self) -> &[RouteEntry] {
        &self.routes
    }

    /// Find the best matching route for a destination using longest prefix matching.
    ///
    /// A route naming the target itself, either as its destination or as its
    /// interface address, outranks every other route. Ties go to the route
    /// seen last in table order.
    pub fn lookup(&self, dest: Ipv4Addr) -> Option<&RouteEntry> {
        let mut candidates: Vec<(u32, &RouteEntry)> = self
            .routes
            .iter()
            .filter(|route| route.flags.is_usable())
            .filter_map(|route| rank(route, dest).map(|mask| (mask, route)))
            .collect();

        // Stable sort keeps table order among equal masks
        candidates.sort_by_key(|(mask, _)| *mask);
        candidates.last().map(|(_, route)| *route)
    }

    /// Local address the kernel would use as the source for traffic to `dest`
    pub fn egress_address(&self, dest: Ipv4Addr) -> Option<Ipv4Addr> {
        self.lookup(dest).map(|route| route.interface_address)
    }
}

fn rank(route: &RouteEntry, dest: Ipv4Addr) -> Option<u32> {
    if route.destination == dest || route.interface_address == dest {
        return Some(EXACT);
    }

    if route.matches(dest) {
        Some(route.mask_bits())
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routes::RouteFlags;

    fn route(dst: [u8; 4], mask: [u8; 4], iface: &str, src: [u8; 4]) -> RouteEntry {
        RouteEntry {
            destination: Ipv4Addr::from(dst),
            mask: Ipv4Addr::from(mask),
            gateway: Ipv4Addr::UNSPECIFIED,
            interface: iface.to_string(),
            interface_address: Ipv4Addr::from(src),
            flags: RouteFlags::UP,
        }
    }

    #[test]
    fn test_longest_prefix_wins() {
        let engine = RouteEngine::new(vec![
            route([10, 1, 0, 0], [255, 255, 0, 0], "eth1", [10, 1, 9, 9]),
            route([10, 1, 2, 0], [255, 255, 255, 0], "eth2", [10, 1, 2, 7]),
            route([0, 0, 0, 0], [0, 0, 0, 0], "eth0", [192, 168, 1, 5]),
        ]);

        assert_eq!(
            engine.egress_address(Ipv4Addr::new(10, 1, 2, 50)),
            Some(Ipv4Addr::new(10, 1, 2, 7))
        );
        assert_eq!(
            engine.egress_address(Ipv4Addr::new(10, 1, 3, 50)),
            Some(Ipv4Addr::new(10, 1, 9, 9))
        );
        assert_eq!(
            engine.egress_address(Ipv4Addr::new(8, 8, 8, 8)),
            Some(Ipv4Addr::new(192, 168, 1, 5))
        );
    }

    #[test]
    fn test_exact_destination_overrides() {
        // Destination equal to the target wins regardless of the route's own mask
        let engine = RouteEngine::new(vec![
            route([10, 1, 2, 3], [0, 0, 0, 0], "tun0", [10, 9, 9, 9]),
            route([10, 1, 2, 0], [255, 255, 255, 0], "eth2", [10, 1, 2, 7]),
        ]);

        assert_eq!(
            engine.egress_address(Ipv4Addr::new(10, 1, 2, 3)),
            Some(Ipv4Addr::new(10, 9, 9, 9))
        );
        assert_eq!(
            engine.egress_address(Ipv4Addr::new(10, 1, 2, 4)),
            Some(Ipv4Addr::new(10, 1, 2, 7))
        );
    }

    #[test]
    fn test_local_address_overrides() {
        let engine = RouteEngine::new(vec![
            route([192, 168, 1, 0], [255, 255, 255, 0], "eth0", [192, 168, 1, 5]),
            route([10, 0, 0, 0], [255, 0, 0, 0], "eth1", [10, 0, 0, 1]),
            route([0, 0, 0, 0], [0, 0, 0, 0], "wg0", [10, 8, 0, 2]),
        ]);

        // The /8 is more specific, but 10.8.0.2 is wg0's own address
        assert_eq!(
            engine.egress_address(Ipv4Addr::new(10, 8, 0, 2)),
            Some(Ipv4Addr::new(10, 8, 0, 2))
        );
    }

    #[test]
    fn test_ties_go_to_last_seen() {
        let engine = RouteEngine::new(vec![
            route([0, 0, 0, 0], [0, 0, 0, 0], "eth0", [192, 168, 1, 5]),
            route([0, 0, 0, 0], [0, 0, 0, 0], "eth1", [172, 16, 0, 5]),
        ]);

        assert_eq!(
            engine.lookup(Ipv4Addr::new(1, 1, 1, 1)).map(|r| r.interface.as_str()),
            Some("eth1")
        );
    }

    #[test]
    fn test_unusable_routes_never_selected() {
        let mut down = route([10, 1, 2, 0], [255, 255, 255, 0], "eth2", [10, 1, 2, 7]);
        down.flags = RouteFlags::from_bits(0);
        let mut reject = route([10, 1, 0, 0], [255, 255, 0, 0], "eth3", [10, 1, 5, 5]);
        reject.flags = RouteFlags::UP | RouteFlags::REJECT;

        let engine = RouteEngine::new(vec![
            route([10, 0, 0, 0], [255, 0, 0, 0], "eth1", [10, 0, 0, 1]),
            down,
            reject,
        ]);

        assert_eq!(
            engine.egress_address(Ipv4Addr::new(10, 1, 2, 50)),
            Some(Ipv4Addr::new(10, 0, 0, 1))
        );
    }

    #[test]
    fn test_no_match() {
        let engine = RouteEngine::new(vec![route(
            [192, 168, 1, 0],
            [255, 255, 255, 0],
            "eth0",
            [192, 168, 1, 5],
        )]);
        assert_eq!(engine.egress_address(Ipv4Addr::new(8, 8, 8, 8)), None);
        assert_eq!(RouteEngine::new(Vec::new()).lookup(Ipv4Addr::LOCALHOST), None);
    }
}
