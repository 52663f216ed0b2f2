//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the reloader.
//! All types derive Serde traits for deserialization from config files.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Keepalive connection count applied when a backend leaves it unset or zero.
pub const DEFAULT_KEEPALIVE_CONNECTIONS: u32 = 10;

/// Root configuration for the reloader.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct ReloaderConfig {
    /// Template and output locations.
    pub paths: PathsConfig,

    /// Proxy reload command.
    pub reload: ReloadConfig,

    /// Debounce and cooldown policy for host-change restarts.
    pub restart: RestartConfig,

    /// Name resolution settings.
    pub resolver: ResolverConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Free-form values handed to the template next to the backends.
    pub settings: Map<String, Value>,

    /// Logical upstream definitions.
    pub apis: Vec<BackendDefinition>,
}

/// File locations.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct PathsConfig {
    /// Template used to render the routing document.
    pub template: String,

    /// Routing document included by the proxy.
    pub output: String,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            template: "templates/api_backends.conf.j2".to_string(),
            output: "config/nginx/api_backends.conf".to_string(),
        }
    }
}

/// Proxy reload command configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ReloadConfig {
    /// Shell command that asks the proxy to re-read its configuration.
    pub command: String,

    /// Upper bound on the command's runtime in seconds.
    pub timeout_secs: u64,
}

impl Default for ReloadConfig {
    fn default() -> Self {
        Self {
            command: "supervisorctl -c config/supervisord.conf pid nginx_router | xargs kill -s HUP"
                .to_string(),
            timeout_secs: 30,
        }
    }
}

impl ReloadConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Restart scheduling policy.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct RestartConfig {
    /// Delay before a host change triggers a pass when no cooldown is active.
    pub debounce_ms: u64,

    /// Window after a host-triggered pass during which new changes are throttled.
    pub cooldown_secs: u64,

    /// Delay applied to a host change that arrives inside the cooldown window.
    pub cooldown_delay_secs: u64,
}

impl Default for RestartConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 0,
            cooldown_secs: 15 * 60,
            cooldown_delay_secs: 15 * 60,
        }
    }
}

/// What to do with a server whose host has no cached address at render time.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum UnresolvedHostPolicy {
    /// Render the server with an absent address and let the template decide.
    #[default]
    Keep,
    /// Leave the server out of its backend.
    Skip,
    /// Fail the pass and keep the previous document.
    Abort,
}

/// Name resolution configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ResolverConfig {
    /// Seconds between refresh rounds of every known host.
    pub refresh_interval_secs: u64,

    /// Attempts made by the startup barrier before giving up.
    pub startup_attempts: u32,

    /// Base delay for exponential backoff in milliseconds.
    pub base_delay_ms: u64,

    /// Maximum delay for exponential backoff in milliseconds.
    pub max_delay_ms: u64,

    /// Timeout for a single host lookup in seconds.
    pub lookup_timeout_secs: u64,

    /// Handling of hosts without an address.
    pub unresolved_host: UnresolvedHostPolicy,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            refresh_interval_secs: 30,
            startup_attempts: 10,
            base_delay_ms: 500,
            max_delay_ms: 30_000,
            lookup_timeout_secs: 5,
            unresolved_host: UnresolvedHostPolicy::Keep,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9464".to_string(),
        }
    }
}

/// Load-balancing policy of a backend.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum BalancePolicy {
    LeastConn,
    IpHash,
    /// Proxy's built-in weighted round robin. Unknown names land here too.
    #[default]
    #[serde(other)]
    Default,
}

/// A logical upstream service.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct BackendDefinition {
    /// Unique backend identifier, used as the upstream name.
    pub id: String,

    /// Ordered server entries.
    #[serde(default)]
    pub servers: Vec<ServerEntry>,

    /// Requested balancing policy.
    #[serde(default)]
    pub balance_algorithm: Option<BalancePolicy>,

    /// Idle keepalive connections to keep per worker.
    #[serde(default)]
    pub keepalive_connections: Option<u32>,

    /// Public host name this backend is served under.
    #[serde(default)]
    pub frontend_host: Option<String>,
}

/// One server behind a backend.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct ServerEntry {
    /// Host name or IP literal.
    pub host: String,

    /// Port the proxy connects to.
    pub port: u16,

    /// Weight for weighted balancing (default: 1).
    #[serde(default = "default_weight")]
    pub weight: u32,
}

fn default_weight() -> u32 {
    1
}
