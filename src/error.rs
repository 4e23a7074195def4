// Error types for egress resolution

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by the fallible steps behind a resolution.
///
/// None of these reach the caller of `InterfaceResolver::resolve`; they are
/// logged and turned into "no information" at that boundary.
#[derive(Error, Debug)]
pub enum ResolverError {
    #[error("Failed to read route table {path}: {source}")]
    RouteTableRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed route table line {line}: {reason}")]
    MalformedLine { line: usize, reason: String },

    #[error("No IPv4 address for interface {0}")]
    InterfaceAddress(String),

    #[error("Interface query failed: {0}")]
    InterfaceQuery(String),

    #[error("Route probe failed: {0}")]
    Probe(#[from] std::io::Error),

    #[error("Invalid interface notation: {0}")]
    InvalidInterface(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type alias using ResolverError
pub type ResolverResult<T> = Result<T, ResolverError>;

impl ResolverError {
    /// Whether the error only means "the OS gave us nothing", so the lookup
    /// degrades to no-match instead of failing.
    pub fn is_degradable(&self) -> bool {
        matches!(
            self,
            ResolverError::RouteTableRead { .. }
                | ResolverError::MalformedLine { .. }
                | ResolverError::InterfaceAddress(_)
                | ResolverError::InterfaceQuery(_)
                | ResolverError::Probe(_)
        )
    }
}
