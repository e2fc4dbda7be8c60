//! Route lookup and dispatch.
//!
//! # Responsibilities
//! - Store compiled routes in registration order
//! - Reject generic literal targets at registration
//! - Look up matching route for a request path
//! - Return matched route, explicit no-match, or an ambiguity error
//!
//! # Design Decisions
//! - Immutable after construction (thread-safe without locks)
//! - Every route is evaluated on every lookup, even in first-match mode,
//!   so predicates always observe the request
//! - Explicit NoMatch rather than silent default

use std::fmt;

use crate::config::options::{GlobalOptions, MatchingMode, ResolvedOptions, RouteOptions};
use crate::error::{ProxyError, RouteDescriptor};
use crate::http::forwarder;
use crate::http::request::ProxyRequest;
use crate::routing::matcher::{PathCaptures, Pattern};
use crate::routing::target::{self, Target};

/// A registered (pattern, target, options) triple.
pub struct Route {
    pattern: Pattern,
    target: Target,
    options: ResolvedOptions,
    client: reqwest::Client,
}

impl Route {
    pub fn pattern(&self) -> &Pattern {
        &self.pattern
    }

    pub fn target(&self) -> &Target {
        &self.target
    }

    pub fn options(&self) -> &ResolvedOptions {
        &self.options
    }

    /// Upstream client configured with this route's TLS and timeout options.
    pub fn client(&self) -> &reqwest::Client {
        &self.client
    }

    pub fn descriptor(&self) -> RouteDescriptor {
        RouteDescriptor {
            pattern: self.pattern.to_string(),
            target: self.target.summary(),
        }
    }
}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route")
            .field("pattern", &self.pattern)
            .field("target", &self.target)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

/// A route selected for a request, with the captures its pattern produced.
#[derive(Debug)]
pub struct RouteMatch<'a> {
    pub route: &'a Route,
    pub captures: PathCaptures,
}

/// Ordered collection of routes.
#[derive(Debug, Default)]
pub struct RouteTable {
    options: GlobalOptions,
    routes: Vec<Route>,
}

impl RouteTable {
    /// Create an empty table with default global options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty table with the given global options.
    pub fn with_options(options: GlobalOptions) -> Self {
        Self {
            options,
            routes: Vec::new(),
        }
    }

    pub fn options(&self) -> &GlobalOptions {
        &self.options
    }

    /// Register a route. Routes are matched in registration order.
    pub fn register(
        &mut self,
        pattern: impl Into<Pattern>,
        target: impl Into<Target>,
        options: RouteOptions,
    ) -> Result<(), ProxyError> {
        let pattern = pattern.into();
        let target = target.into();

        if let (Pattern::Literal(prefix), Target::Static(url)) = (&pattern, &target) {
            if !target::is_absolute(url) {
                return Err(ProxyError::GenericTarget {
                    pattern: prefix.clone(),
                    target: url.clone(),
                });
            }
        }

        let options = options.resolve(&self.options);
        let client = forwarder::build_client(&options)?;

        tracing::info!(
            pattern = %pattern,
            target = %target.summary(),
            position = self.routes.len(),
            "Route registered"
        );

        self.routes.push(Route {
            pattern,
            target,
            options,
            client,
        });
        Ok(())
    }

    /// Resolve `path` to at most one route.
    pub fn resolve<'a>(
        &'a self,
        path: &str,
        request: &ProxyRequest,
    ) -> Result<Option<RouteMatch<'a>>, ProxyError> {
        let mut matches: Vec<RouteMatch<'a>> = self
            .routes
            .iter()
            .filter_map(|route| {
                let captures = route.pattern.captures(path)?;
                route
                    .options
                    .accepts(request)
                    .then_some(RouteMatch { route, captures })
            })
            .collect();

        match matches.len() {
            0 => {
                tracing::debug!(path = %path, "No route matched");
                Ok(None)
            }
            1 => Ok(matches.pop()),
            count if self.options.matching_mode == MatchingMode::First => {
                tracing::debug!(path = %path, count, "Multiple routes matched, using first");
                Ok(Some(matches.swap_remove(0)))
            }
            _ => {
                let descriptors: Vec<RouteDescriptor> =
                    matches.iter().map(|m| m.route.descriptor()).collect();
                tracing::warn!(path = %path, count = descriptors.len(), "Ambiguous route match");
                Err(ProxyError::AmbiguousMatch {
                    path: path.to_string(),
                    matches: descriptors,
                })
            }
        }
    }

    /// Registered routes in registration order.
    pub fn routes(&self) -> impl Iterator<Item = &Route> {
        self.routes.iter()
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}
