//! Route table construction from configuration.
//!
//! Routes are registered in file order; registration errors (such as a
//! generic literal target) name the offending route.

use std::sync::Arc;
use std::time::Duration;

use crate::cache::{CacheStore, MemoryCacheStore};
use crate::config::loader::ConfigError;
use crate::config::options::{GlobalOptions, RouteOptions};
use crate::config::schema::{ProxyConfig, RouteConfig};
use crate::routing::{HostMatcher, Pattern, RouteTable, Target};

/// Global options described by `config`.
pub fn global_options(config: &ProxyConfig) -> GlobalOptions {
    let options = &config.options;
    GlobalOptions {
        preserve_host: options.preserve_host,
        x_forwarded_host: options.x_forwarded_host,
        matching_mode: options.matching_mode,
        verify_ssl: options.verify_ssl,
        open_timeout: options.open_timeout_secs.map(Duration::from_secs),
        timeout: options.timeout_secs.map(Duration::from_secs),
        username: options.username.clone(),
        password: options.password.clone(),
        cache: None,
        cache_namespace: config.cache.namespace.clone(),
        cache_exemptions: config.cache.exemptions.clone(),
    }
}

/// Build the route table described by `config`.
pub fn build_route_table(config: &ProxyConfig) -> Result<RouteTable, ConfigError> {
    let store: Arc<dyn CacheStore> = Arc::new(match config.cache.ttl_secs {
        Some(ttl) => MemoryCacheStore::with_ttl(Duration::from_secs(ttl)),
        None => MemoryCacheStore::new(),
    });

    let mut table = RouteTable::with_options(global_options(config));
    for route in &config.routes {
        let rejected = |source| ConfigError::Route {
            name: route.name.clone(),
            source,
        };

        let pattern = match (&route.path_prefix, &route.path_regex) {
            (_, Some(re)) => Pattern::regex(re).map_err(rejected)?,
            (Some(prefix), None) => Pattern::literal(prefix.as_str()),
            (None, None) => Pattern::literal("/"),
        };
        let options = route_options(route, config.cache.enabled, &store);

        table
            .register(pattern, Target::new(route.target.as_str()), options)
            .map_err(rejected)?;
    }

    tracing::info!(routes = table.len(), "Route table built");
    Ok(table)
}

fn route_options(route: &RouteConfig, cache_default: bool, store: &Arc<dyn CacheStore>) -> RouteOptions {
    let mut options = RouteOptions {
        preserve_host: route.preserve_host,
        x_forwarded_host: route.x_forwarded_host,
        verify_ssl: route.verify_ssl,
        open_timeout: route.open_timeout_secs.map(Duration::from_secs),
        timeout: route.timeout_secs.map(Duration::from_secs),
        username: route.username.clone(),
        password: route.password.clone(),
        cache: None,
        cache_namespace: route.cache_namespace.clone(),
        cache_exemptions: route.cache_exemptions.clone(),
        predicate: None,
    };

    if route.cache.unwrap_or(cache_default) {
        options.cache = Some(store.clone());
    }
    if let Some(host) = &route.host {
        options.predicate = Some(HostMatcher::new(host.as_str()).into_predicate());
    }
    options
}
