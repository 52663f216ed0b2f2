//! Name resolution subsystem.
//!
//! # Data Flow
//! ```text
//! Startup:
//!     resolve_all() → every configured host looked up (retry + backoff)
//!     → cache.rs populated → barrier released
//!
//! Steady state (dns.rs refresh loop):
//!     timer → look up every host → compare with cache.rs
//!     → changed host: update cache, broadcast HostChanged
//!
//! Before each pass:
//!     resolve_pending() → hosts new to the config looked up once, no event
//!
//! Rendering:
//!     lookup(host) → synchronous cache read, never touches the network
//! ```
//!
//! # Design Decisions
//! - Lookups during rendering are in-memory only
//! - A failed refresh keeps the last known address
//! - A host's first address (`previous: None`) asks for a plain pass, never a
//!   throttled restart
//! - The smallest address of a lookup is chosen so answer ordering is not a change

pub mod cache;
pub mod dns;

use std::net::IpAddr;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::broadcast;

pub use cache::AddressCache;
pub use dns::{DnsResolver, HostLookup, SystemLookup};

/// A host whose cached address changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostChanged {
    pub host: String,
    pub previous: Option<IpAddr>,
    pub current: Option<IpAddr>,
}

/// Errors produced by the resolver.
#[derive(Debug, Error)]
pub enum ResolverError {
    /// Some hosts never resolved during the startup barrier.
    #[error("hosts still unresolved after {attempts} attempts: {}", .hosts.join(", "))]
    Unresolved { attempts: u32, hosts: Vec<String> },

    /// A single lookup failed.
    #[error("lookup of '{host}' failed: {reason}")]
    Lookup { host: String, reason: String },
}

/// Host → address cache with change notifications.
#[async_trait]
pub trait NameResolver: Send + Sync {
    /// Current cached address of `host`.
    fn lookup(&self, host: &str) -> Option<IpAddr>;

    /// Subscribe to per-host change events.
    fn subscribe(&self) -> broadcast::Receiver<HostChanged>;

    /// Resolve every known host once; completes only when the cache is usable.
    async fn resolve_all(&self) -> Result<(), ResolverError>;

    /// Look up configured hosts that have no cached address yet, once each.
    ///
    /// Newly cached hosts are not broadcast. Returns how many were cached.
    async fn resolve_pending(&self) -> usize;
}
