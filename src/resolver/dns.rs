//! Polling resolver backed by the system's name lookup.

use std::collections::BTreeSet;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::broadcast;
use tokio::time::{self, Instant, MissedTickBehavior};

use crate::config::schema::ResolverConfig;
use crate::config::store::ConfigStore;
use crate::observability::metrics;
use crate::resilience::backoff::calculate_backoff;
use crate::resolver::{AddressCache, HostChanged, NameResolver, ResolverError};

/// A single name lookup.
#[async_trait]
pub trait HostLookup: Send + Sync {
    async fn lookup(&self, host: &str) -> Result<Vec<IpAddr>, ResolverError>;
}

/// Lookup through the operating system resolver.
pub struct SystemLookup {
    timeout: Duration,
}

impl SystemLookup {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

#[async_trait]
impl HostLookup for SystemLookup {
    async fn lookup(&self, host: &str) -> Result<Vec<IpAddr>, ResolverError> {
        match time::timeout(self.timeout, tokio::net::lookup_host((host, 0))).await {
            Ok(Ok(addrs)) => Ok(addrs.map(|addr| addr.ip()).collect()),
            Ok(Err(e)) => Err(ResolverError::Lookup {
                host: host.to_string(),
                reason: e.to_string(),
            }),
            Err(_) => Err(ResolverError::Lookup {
                host: host.to_string(),
                reason: format!("timed out after {:?}", self.timeout),
            }),
        }
    }
}

/// Resolver that keeps every backend host's address cached.
pub struct DnsResolver {
    store: Arc<dyn ConfigStore>,
    lookup: Arc<dyn HostLookup>,
    cache: AddressCache,
    changes: broadcast::Sender<HostChanged>,
    config: ResolverConfig,
}

impl DnsResolver {
    pub fn new(
        store: Arc<dyn ConfigStore>,
        lookup: Arc<dyn HostLookup>,
        config: ResolverConfig,
    ) -> Self {
        let (changes, _) = broadcast::channel(256);
        Self {
            store,
            lookup,
            cache: AddressCache::new(),
            changes,
            config,
        }
    }

    pub fn cache(&self) -> &AddressCache {
        &self.cache
    }

    /// Every host name referenced by a backend, IP literals excluded.
    fn hosts(&self) -> BTreeSet<String> {
        self.store
            .snapshot()
            .backends
            .iter()
            .flat_map(|api| api.servers.iter())
            .filter(|server| server.host.parse::<IpAddr>().is_err())
            .map(|server| server.host.clone())
            .collect()
    }

    async fn resolve_host(&self, host: &str) -> Result<IpAddr, ResolverError> {
        let addrs = self.lookup.lookup(host).await?;
        addrs.into_iter().min().ok_or_else(|| ResolverError::Lookup {
            host: host.to_string(),
            reason: "no addresses returned".to_string(),
        })
    }

    /// Look up every host again and broadcast the ones that changed.
    ///
    /// Returns the number of changed hosts.
    pub async fn refresh(&self) -> usize {
        let hosts = self.hosts();
        self.cache.retain_hosts(|host| hosts.contains(host));

        let mut changed = 0;
        for host in &hosts {
            let address = match self.resolve_host(host).await {
                Ok(address) => address,
                Err(e) => {
                    tracing::warn!(error = %e, "Keeping last known address");
                    continue;
                }
            };

            if let Some(previous) = self.cache.update(host, address) {
                changed += 1;
                tracing::info!(
                    host = %host,
                    previous = ?previous,
                    current = %address,
                    "Host address changed"
                );
                metrics::record_host_change();
                let _ = self.changes.send(HostChanged {
                    host: host.clone(),
                    previous,
                    current: Some(address),
                });
            }
        }
        changed
    }

    /// Refresh periodically and whenever the backend definitions change.
    pub async fn run(self: Arc<Self>, mut shutdown: broadcast::Receiver<()>) {
        let period = Duration::from_secs(self.config.refresh_interval_secs);
        let mut ticker = time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut config_changes = self.store.subscribe();
        let mut watching_config = true;

        tracing::info!(interval_secs = period.as_secs(), "Resolver refresh loop starting");

        loop {
            tokio::select! {
                _ = shutdown.recv() => {
                    tracing::info!("Resolver received shutdown signal, exiting loop");
                    break;
                }
                _ = ticker.tick() => {
                    self.refresh().await;
                }
                res = config_changes.recv(), if watching_config => match res {
                    Ok(()) | Err(broadcast::error::RecvError::Lagged(_)) => {
                        self.refresh().await;
                    }
                    Err(broadcast::error::RecvError::Closed) => watching_config = false,
                },
            }
        }
    }
}

#[async_trait]
impl NameResolver for DnsResolver {
    fn lookup(&self, host: &str) -> Option<IpAddr> {
        self.cache.get(host)
    }

    fn subscribe(&self) -> broadcast::Receiver<HostChanged> {
        self.changes.subscribe()
    }

    async fn resolve_all(&self) -> Result<(), ResolverError> {
        let mut pending = self.hosts();
        let attempts = self.config.startup_attempts;
        tracing::info!(hosts = pending.len(), "Resolving all hosts");

        for attempt in 1..=attempts {
            let mut failed = BTreeSet::new();
            for host in pending {
                match self.resolve_host(&host).await {
                    Ok(address) => {
                        tracing::debug!(host = %host, address = %address, "Resolved");
                        self.cache.update(&host, address);
                    }
                    Err(e) => {
                        tracing::warn!(attempt, error = %e, "Host not resolved yet");
                        failed.insert(host);
                    }
                }
            }

            if failed.is_empty() {
                tracing::info!(cached = self.cache.len(), "All hosts resolved");
                return Ok(());
            }
            pending = failed;

            if attempt < attempts {
                let delay = calculate_backoff(
                    attempt,
                    self.config.base_delay_ms,
                    self.config.max_delay_ms,
                );
                tracing::info!(
                    remaining = pending.len(),
                    delay_ms = delay.as_millis() as u64,
                    "Retrying unresolved hosts"
                );
                time::sleep(delay).await;
            }
        }

        Err(ResolverError::Unresolved {
            attempts,
            hosts: pending.into_iter().collect(),
        })
    }

    async fn resolve_pending(&self) -> usize {
        let mut cached = 0;
        for host in self.hosts() {
            if self.cache.get(&host).is_some() {
                continue;
            }
            match self.resolve_host(&host).await {
                Ok(address) => {
                    tracing::info!(host = %host, address = %address, "New host resolved");
                    self.cache.update(&host, address);
                    cached += 1;
                }
                Err(e) => tracing::warn!(error = %e, "New host not resolved yet"),
            }
        }
        cached
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::{BackendDefinition, ReloaderConfig, ServerEntry};
    use crate::config::store::SharedConfigStore;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    struct ScriptedLookup {
        answers: Mutex<HashMap<String, Vec<IpAddr>>>,
        calls: AtomicU32,
    }

    impl ScriptedLookup {
        fn set(&self, host: &str, addrs: &[&str]) {
            self.answers.lock().unwrap().insert(
                host.to_string(),
                addrs.iter().map(|a| a.parse().unwrap()).collect(),
            );
        }
    }

    #[async_trait]
    impl HostLookup for ScriptedLookup {
        async fn lookup(&self, host: &str) -> Result<Vec<IpAddr>, ResolverError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.answers
                .lock()
                .unwrap()
                .get(host)
                .cloned()
                .ok_or_else(|| ResolverError::Lookup {
                    host: host.to_string(),
                    reason: "NXDOMAIN".to_string(),
                })
        }
    }

    fn store(hosts: &[&str]) -> Arc<SharedConfigStore> {
        let mut config = ReloaderConfig::default();
        config.apis.push(BackendDefinition {
            id: "web".into(),
            servers: hosts
                .iter()
                .map(|h| ServerEntry { host: h.to_string(), port: 80, weight: 1 })
                .collect(),
            balance_algorithm: None,
            keepalive_connections: None,
            frontend_host: None,
        });
        Arc::new(SharedConfigStore::new(&config))
    }

    fn resolver(
        store: Arc<SharedConfigStore>,
        lookup: Arc<ScriptedLookup>,
        attempts: u32,
    ) -> DnsResolver {
        let config = ResolverConfig {
            startup_attempts: attempts,
            base_delay_ms: 10,
            max_delay_ms: 100,
            ..ResolverConfig::default()
        };
        DnsResolver::new(store, lookup, config)
    }

    #[tokio::test]
    async fn test_resolve_all_populates_cache() {
        let lookup = Arc::new(ScriptedLookup::default());
        lookup.set("a.internal", &["10.0.0.9", "10.0.0.2"]);
        let resolver = resolver(store(&["a.internal", "192.168.1.1"]), lookup.clone(), 3);

        resolver.resolve_all().await.unwrap();
        assert_eq!(resolver.lookup("a.internal"), Some("10.0.0.2".parse().unwrap()));
        assert_eq!(resolver.lookup("192.168.1.1"), Some("192.168.1.1".parse().unwrap()));
        // literals never hit the lookup
        assert_eq!(lookup.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_resolve_all_gives_up() {
        let lookup = Arc::new(ScriptedLookup::default());
        lookup.set("a.internal", &["10.0.0.1"]);
        let resolver = resolver(store(&["a.internal", "missing.internal"]), lookup.clone(), 3);

        let err = resolver.resolve_all().await.unwrap_err();
        match err {
            ResolverError::Unresolved { attempts, hosts } => {
                assert_eq!(attempts, 3);
                assert_eq!(hosts, vec!["missing.internal".to_string()]);
            }
            other => panic!("unexpected error: {other}"),
        }
        // resolved hosts are not retried
        assert_eq!(lookup.calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_refresh_broadcasts_changes() {
        let lookup = Arc::new(ScriptedLookup::default());
        lookup.set("a.internal", &["10.0.0.1"]);
        lookup.set("b.internal", &["10.0.0.2"]);
        let resolver = resolver(store(&["a.internal", "b.internal"]), lookup.clone(), 1);
        resolver.resolve_all().await.unwrap();
        let mut rx = resolver.subscribe();

        assert_eq!(resolver.refresh().await, 0);

        lookup.set("b.internal", &["10.0.0.3"]);
        assert_eq!(resolver.refresh().await, 1);
        let event = rx.recv().await.unwrap();
        assert_eq!(event.host, "b.internal");
        assert_eq!(event.previous, Some("10.0.0.2".parse().unwrap()));
        assert_eq!(event.current, Some("10.0.0.3".parse().unwrap()));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_resolve_pending_only_looks_up_new_hosts() {
        let lookup = Arc::new(ScriptedLookup::default());
        lookup.set("a.internal", &["10.0.0.1"]);
        lookup.set("b.internal", &["10.0.0.2"]);
        let store = store(&["a.internal"]);
        let resolver = resolver(store.clone(), lookup.clone(), 1);
        resolver.resolve_all().await.unwrap();
        let mut rx = resolver.subscribe();

        let mut config = ReloaderConfig::default();
        config.apis.push(BackendDefinition {
            id: "web".into(),
            servers: ["a.internal", "b.internal", "c.internal"]
                .iter()
                .map(|h| ServerEntry { host: h.to_string(), port: 80, weight: 1 })
                .collect(),
            balance_algorithm: None,
            keepalive_connections: None,
            frontend_host: None,
        });
        store.replace(&config);

        assert_eq!(resolver.resolve_pending().await, 1);
        assert_eq!(resolver.lookup("b.internal"), Some("10.0.0.2".parse().unwrap()));
        assert_eq!(resolver.lookup("c.internal"), None);
        // a.internal once at startup, then b and c
        assert_eq!(lookup.calls.load(Ordering::SeqCst), 3);
        assert!(rx.try_recv().is_err());

        // the refresh that follows sees no change for the host just cached
        assert_eq!(resolver.refresh().await, 0);
    }

    #[tokio::test]
    async fn test_refresh_keeps_address_on_failure() {
        let lookup = Arc::new(ScriptedLookup::default());
        lookup.set("a.internal", &["10.0.0.1"]);
        let resolver = resolver(store(&["a.internal"]), lookup.clone(), 1);
        resolver.resolve_all().await.unwrap();

        lookup.answers.lock().unwrap().clear();
        assert_eq!(resolver.refresh().await, 0);
        assert_eq!(resolver.lookup("a.internal"), Some("10.0.0.1".parse().unwrap()));
    }
}
