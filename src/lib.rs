//! Resolve which local IPv4 interface the operating system would use to reach
//! a target, without opening a connection.
//!
//! Known interfaces are matched by subnet first. When none contains the
//! target, the kernel's choice is read from the route table (Linux) or learned
//! from a connected, unsent UDP socket (elsewhere) and mapped back to a known
//! interface.

pub mod config;
pub mod egress;
pub mod error;
pub mod interface;
pub mod probe;
pub mod resolver;
pub mod routes;

pub use egress::{Backend, EgressSource, PlatformEgress};
pub use error::{ResolverError, ResolverResult};
pub use interface::NetworkInterface;
pub use probe::SocketProbe;
pub use resolver::InterfaceResolver;
pub use routes::parser::RouteTableReader;
pub use routes::{RouteEntry, RouteFlags, RoutingTable};
