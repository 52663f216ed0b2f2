//! Shared fakes for reconciliation and engine tests.
#![allow(dead_code)]

use std::collections::HashMap;
use std::io;
use std::net::IpAddr;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Map;
use tokio::sync::{broadcast, Notify};

use config_reloader::config::{
    BackendDefinition, ConfigSnapshot, ConfigStore, ServerEntry, UnresolvedHostPolicy,
};
use config_reloader::engine::{EngineEvent, EventBus, ReconcileCause};
use config_reloader::reconcile::{
    Collaborators, DocumentStore, ReconcileError, ReconcileOutcome, Reconciler,
};
use config_reloader::reload::{ReloadError, ReloadTrigger};
use config_reloader::render::JinjaRenderer;
use config_reloader::resolver::{HostChanged, HostLookup, NameResolver, ResolverError};

/// Compact template that exposes every normalized field.
pub const TEMPLATE: &str = "\
{% for api in apis %}
{{ api.id }} default={% if api.default_balance %}true{% else %}false{% endif %} keepalive={{ api.keepalive_connections }}
{% for s in api.servers %}
  {{ s.host }}={% if s.address %}{{ s.address }}{% else %}-{% endif %}:{{ s.port }}
{% endfor %}
{% endfor %}
hosts={{ frontend_hosts | join(\",\") }}
";

pub fn server(host: &str, port: u16) -> ServerEntry {
    ServerEntry {
        host: host.to_string(),
        port,
        weight: 1,
    }
}

pub fn backend(id: &str, servers: Vec<ServerEntry>) -> BackendDefinition {
    BackendDefinition {
        id: id.to_string(),
        servers,
        balance_algorithm: None,
        keepalive_connections: None,
        frontend_host: None,
    }
}

/// In-memory config store.
pub struct FakeStore {
    snapshot: Mutex<ConfigSnapshot>,
    changes: broadcast::Sender<()>,
}

impl FakeStore {
    pub fn new(backends: Vec<BackendDefinition>) -> Arc<Self> {
        let (changes, _) = broadcast::channel(16);
        Arc::new(Self {
            snapshot: Mutex::new(ConfigSnapshot {
                backends,
                settings: Map::new(),
            }),
            changes,
        })
    }

    /// Replace the definitions and notify subscribers.
    pub fn set_backends(&self, backends: Vec<BackendDefinition>) {
        self.snapshot.lock().unwrap().backends = backends;
        let _ = self.changes.send(());
    }
}

impl ConfigStore for FakeStore {
    fn snapshot(&self) -> ConfigSnapshot {
        self.snapshot.lock().unwrap().clone()
    }

    fn subscribe(&self) -> broadcast::Receiver<()> {
        self.changes.subscribe()
    }
}

/// Resolver whose cache the test controls.
pub struct FakeResolver {
    cache: Mutex<HashMap<String, IpAddr>>,
    changes: broadcast::Sender<HostChanged>,
    fail_startup: AtomicBool,
    pub resolve_calls: AtomicUsize,
}

impl FakeResolver {
    pub fn new(entries: &[(&str, &str)]) -> Arc<Self> {
        let (changes, _) = broadcast::channel(64);
        Arc::new(Self {
            cache: Mutex::new(
                entries
                    .iter()
                    .map(|(host, ip)| (host.to_string(), ip.parse().unwrap()))
                    .collect(),
            ),
            changes,
            fail_startup: AtomicBool::new(false),
            resolve_calls: AtomicUsize::new(0),
        })
    }

    pub fn failing() -> Arc<Self> {
        let resolver = Self::new(&[]);
        resolver.fail_startup.store(true, Ordering::SeqCst);
        resolver
    }

    /// Update the cache and emit a change event.
    pub fn change(&self, host: &str, ip: &str) {
        let current: IpAddr = ip.parse().unwrap();
        let previous = self.cache.lock().unwrap().insert(host.to_string(), current);
        let _ = self.changes.send(HostChanged {
            host: host.to_string(),
            previous,
            current: Some(current),
        });
    }
}

#[async_trait]
impl NameResolver for FakeResolver {
    fn lookup(&self, host: &str) -> Option<IpAddr> {
        self.cache.lock().unwrap().get(host).copied()
    }

    fn subscribe(&self) -> broadcast::Receiver<HostChanged> {
        self.changes.subscribe()
    }

    async fn resolve_all(&self) -> Result<(), ResolverError> {
        self.resolve_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_startup.load(Ordering::SeqCst) {
            return Err(ResolverError::Unresolved {
                attempts: 1,
                hosts: vec!["down.internal".to_string()],
            });
        }
        Ok(())
    }

    async fn resolve_pending(&self) -> usize {
        0
    }
}

/// Name lookup that answers from a table after a fixed delay.
pub struct DelayedLookup {
    answers: Mutex<HashMap<String, IpAddr>>,
    delay: Duration,
}

impl DelayedLookup {
    pub fn new(delay: Duration, entries: &[(&str, &str)]) -> Arc<Self> {
        let lookup = Arc::new(Self {
            answers: Mutex::new(HashMap::new()),
            delay,
        });
        for (host, ip) in entries {
            lookup.set(host, ip);
        }
        lookup
    }

    pub fn set(&self, host: &str, ip: &str) {
        self.answers
            .lock()
            .unwrap()
            .insert(host.to_string(), ip.parse().unwrap());
    }
}

#[async_trait]
impl HostLookup for DelayedLookup {
    async fn lookup(&self, host: &str) -> Result<Vec<IpAddr>, ResolverError> {
        tokio::time::sleep(self.delay).await;
        let answer = self.answers.lock().unwrap().get(host).copied();
        answer
            .map(|address| vec![address])
            .ok_or_else(|| ResolverError::Lookup {
                host: host.to_string(),
                reason: "NXDOMAIN".to_string(),
            })
    }
}

/// Ordered record of side effects across fakes.
#[derive(Clone, Default)]
pub struct Journal(Arc<Mutex<Vec<String>>>);

impl Journal {
    pub fn push(&self, entry: impl Into<String>) {
        self.0.lock().unwrap().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    pub fn clear(&self) {
        self.0.lock().unwrap().clear();
    }
}

/// Document kept in memory.
pub struct MemoryDocument {
    path: PathBuf,
    content: Mutex<Option<Vec<u8>>>,
    journal: Journal,
    pub fail_writes: AtomicBool,
    pub writes: AtomicUsize,
}

impl MemoryDocument {
    pub fn new(journal: Journal) -> Arc<Self> {
        Arc::new(Self {
            path: PathBuf::from("/memory/api_backends.conf"),
            content: Mutex::new(None),
            journal,
            fail_writes: AtomicBool::new(false),
            writes: AtomicUsize::new(0),
        })
    }

    pub fn seed(&self, content: &str) {
        *self.content.lock().unwrap() = Some(content.as_bytes().to_vec());
    }

    pub fn text(&self) -> Option<String> {
        self.content
            .lock()
            .unwrap()
            .as_ref()
            .map(|bytes| String::from_utf8_lossy(bytes).into_owned())
    }
}

#[async_trait]
impl DocumentStore for MemoryDocument {
    fn path(&self) -> &Path {
        &self.path
    }

    async fn read(&self) -> io::Result<Option<Vec<u8>>> {
        tokio::task::yield_now().await;
        Ok(self.content.lock().unwrap().clone())
    }

    async fn replace(&self, content: &str) -> io::Result<()> {
        tokio::task::yield_now().await;
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(io::Error::new(io::ErrorKind::PermissionDenied, "read-only"));
        }
        *self.content.lock().unwrap() = Some(content.as_bytes().to_vec());
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.journal.push("write");
        Ok(())
    }
}

/// Reload trigger that records calls.
pub struct RecordingReload {
    journal: Journal,
    pub fail: AtomicBool,
    pub calls: AtomicUsize,
    pub delay: Mutex<Duration>,
    pub entered: Notify,
}

impl RecordingReload {
    pub fn new(journal: Journal) -> Arc<Self> {
        Arc::new(Self {
            journal,
            fail: AtomicBool::new(false),
            calls: AtomicUsize::new(0),
            delay: Mutex::new(Duration::ZERO),
            entered: Notify::new(),
        })
    }
}

#[async_trait]
impl ReloadTrigger for RecordingReload {
    async fn reload(&self) -> Result<(), ReloadError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.journal.push("reload");
        self.entered.notify_one();

        let delay = *self.delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        if self.fail.load(Ordering::SeqCst) {
            return Err(ReloadError::Failed {
                status: "exit status: 1".into(),
                stderr: "nginx not running".into(),
            });
        }
        Ok(())
    }
}

/// A reconciler wired to fakes.
pub struct Harness {
    pub store: Arc<FakeStore>,
    pub resolver: Arc<FakeResolver>,
    pub document: Arc<MemoryDocument>,
    pub reload: Arc<RecordingReload>,
    pub journal: Journal,
    pub events: EventBus,
    pub reconciler: Arc<Reconciler>,
}

impl Harness {
    pub fn new(store: Arc<FakeStore>, resolver: Arc<FakeResolver>) -> Self {
        Self::with_policy(store, resolver, UnresolvedHostPolicy::Keep)
    }

    pub fn with_policy(
        store: Arc<FakeStore>,
        resolver: Arc<FakeResolver>,
        policy: UnresolvedHostPolicy,
    ) -> Self {
        let journal = Journal::default();
        let document = MemoryDocument::new(journal.clone());
        let reload = RecordingReload::new(journal.clone());
        let events = EventBus::new();
        let reconciler = Arc::new(Reconciler::new(
            Collaborators {
                store: store.clone(),
                resolver: resolver.clone(),
                renderer: Arc::new(JinjaRenderer::from_source(TEMPLATE).unwrap()),
                document: document.clone(),
                proxy: reload.clone(),
            },
            policy,
            events.clone(),
        ));

        Self {
            store,
            resolver,
            document,
            reload,
            journal,
            events,
            reconciler,
        }
    }
}

/// Wait for the next completed pass, skipping other events.
pub async fn next_completed(
    rx: &mut broadcast::Receiver<EngineEvent>,
) -> (Vec<ReconcileCause>, Result<ReconcileOutcome, ReconcileError>) {
    loop {
        match rx.recv().await.expect("event bus closed") {
            EngineEvent::ReconcileCompleted { causes, result } => return (causes, result),
            _ => continue,
        }
    }
}

/// Let every runnable task run until it blocks.
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(1)).await;
}
