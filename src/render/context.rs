//! Snapshot normalization and address enrichment.

use std::collections::BTreeSet;
use std::net::IpAddr;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::config::schema::{
    BackendDefinition, BalancePolicy, UnresolvedHostPolicy, DEFAULT_KEEPALIVE_CONNECTIONS,
};
use crate::config::store::ConfigSnapshot;
use crate::render::RenderError;
use crate::resolver::NameResolver;

/// A server entry with its address for this pass.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ResolvedServer {
    pub host: String,
    pub port: u16,
    pub weight: u32,
    pub address: Option<IpAddr>,
}

/// A backend after normalization.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RenderedBackend {
    pub id: String,
    pub servers: Vec<ResolvedServer>,
    pub balance_algorithm: BalancePolicy,
    /// Set unless the backend asked for `least_conn` or `ip_hash`.
    pub default_balance: bool,
    pub keepalive_connections: u32,
    pub frontend_host: Option<String>,
}

/// Everything the template sees.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RenderContext {
    pub apis: Vec<RenderedBackend>,
    pub frontend_hosts: Vec<String>,
    pub settings: Map<String, Value>,
}

/// Turn a snapshot into a render context.
///
/// Backends without servers are dropped. With [`UnresolvedHostPolicy::Skip`] a
/// backend whose servers all lacked an address is dropped as well.
pub fn build_context(
    snapshot: ConfigSnapshot,
    resolver: &dyn NameResolver,
    policy: UnresolvedHostPolicy,
) -> Result<RenderContext, RenderError> {
    let mut apis = Vec::with_capacity(snapshot.backends.len());

    for api in snapshot.backends {
        if api.servers.is_empty() {
            tracing::debug!(backend = %api.id, "Skipping backend without servers");
            continue;
        }
        if let Some(backend) = normalize(api, resolver, policy)? {
            apis.push(backend);
        }
    }

    let frontend_hosts = apis
        .iter()
        .filter_map(|api| api.frontend_host.as_deref())
        .filter(|host| !host.is_empty())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .map(str::to_string)
        .collect();

    Ok(RenderContext {
        apis,
        frontend_hosts,
        settings: snapshot.settings,
    })
}

fn normalize(
    api: BackendDefinition,
    resolver: &dyn NameResolver,
    policy: UnresolvedHostPolicy,
) -> Result<Option<RenderedBackend>, RenderError> {
    let balance_algorithm = api.balance_algorithm.unwrap_or_default();
    let default_balance = !matches!(
        balance_algorithm,
        BalancePolicy::LeastConn | BalancePolicy::IpHash
    );
    let keepalive_connections = match api.keepalive_connections {
        None | Some(0) => DEFAULT_KEEPALIVE_CONNECTIONS,
        Some(n) => n,
    };

    let mut servers = Vec::with_capacity(api.servers.len());
    for server in api.servers {
        let address = resolver.lookup(&server.host);
        if address.is_none() {
            match policy {
                UnresolvedHostPolicy::Keep => {
                    tracing::warn!(backend = %api.id, host = %server.host, "Rendering server without address");
                }
                UnresolvedHostPolicy::Skip => {
                    tracing::warn!(backend = %api.id, host = %server.host, "Leaving unresolved server out");
                    continue;
                }
                UnresolvedHostPolicy::Abort => {
                    return Err(RenderError::UnresolvedHost {
                        backend: api.id,
                        host: server.host,
                    });
                }
            }
        }
        servers.push(ResolvedServer {
            host: server.host,
            port: server.port,
            weight: server.weight,
            address,
        });
    }

    if servers.is_empty() {
        return Ok(None);
    }

    Ok(Some(RenderedBackend {
        id: api.id,
        servers,
        balance_algorithm,
        default_balance,
        keepalive_connections,
        frontend_host: api.frontend_host,
    }))
}
