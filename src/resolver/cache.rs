//! Host → address cache.

use std::net::IpAddr;
use std::sync::Arc;

use dashmap::DashMap;

/// A thread-safe cache of resolved addresses.
#[derive(Clone, Default)]
pub struct AddressCache {
    inner: Arc<DashMap<String, IpAddr>>,
}

impl AddressCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached address for `host`. IP literals answer for themselves.
    pub fn get(&self, host: &str) -> Option<IpAddr> {
        if let Ok(ip) = host.parse::<IpAddr>() {
            return Some(ip);
        }
        self.inner.get(host).map(|r| *r.value())
    }

    /// Store `address` and return the previous value if it differed.
    ///
    /// `None` means nothing changed.
    pub fn update(&self, host: &str, address: IpAddr) -> Option<Option<IpAddr>> {
        match self.inner.insert(host.to_string(), address) {
            Some(previous) if previous == address => None,
            previous => Some(previous),
        }
    }

    /// Drop hosts no longer referenced by any backend.
    pub fn retain_hosts<F: Fn(&str) -> bool>(&self, keep: F) {
        self.inner.retain(|host, _| keep(host));
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}
