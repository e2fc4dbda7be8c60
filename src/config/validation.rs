//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Each route names exactly one pattern, and regexes compile
//! - Validate value ranges (timeouts > 0, addresses parse)
//! - Catch half-configured credentials, after route overrides merge over global options
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ProxyConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;
use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::{ProxyConfig, RouteConfig};

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("invalid {field} address `{value}`")]
    InvalidAddress { field: &'static str, value: String },

    #[error("route #{index} has no name")]
    UnnamedRoute { index: usize },

    #[error("duplicate route name `{0}`")]
    DuplicateRoute(String),

    #[error("route `{0}` must set exactly one of path_prefix or path_regex")]
    PatternCount(String),

    #[error("route `{route}` has an invalid regex: {reason}")]
    InvalidRegex { route: String, reason: String },

    #[error("route `{0}` has an empty target")]
    EmptyTarget(String),

    #[error("{scope}: {field} must be greater than zero")]
    ZeroTimeout { scope: String, field: &'static str },

    #[error("{0}: username and password must be set together")]
    PartialCredentials(String),
}

/// Validate a configuration, collecting every problem found.
pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field: "listener.bind_address",
            value: config.listener.bind_address.clone(),
        });
    }
    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::InvalidAddress {
            field: "observability.metrics_address",
            value: config.observability.metrics_address.clone(),
        });
    }

    let options = &config.options;
    check_timeouts("options", options.open_timeout_secs, options.timeout_secs, &mut errors);

    let mut names = HashSet::new();
    for (index, route) in config.routes.iter().enumerate() {
        if route.name.is_empty() {
            errors.push(ValidationError::UnnamedRoute { index });
        } else if !names.insert(route.name.as_str()) {
            errors.push(ValidationError::DuplicateRoute(route.name.clone()));
        }
        validate_route(route, &mut errors);

        let username = route.username.as_ref().or(options.username.as_ref());
        let password = route.password.as_ref().or(options.password.as_ref());
        if username.is_some() != password.is_some() {
            errors.push(ValidationError::PartialCredentials(format!("route `{}`", route.name)));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn validate_route(route: &RouteConfig, errors: &mut Vec<ValidationError>) {
    let name = route.name.clone();

    match (&route.path_prefix, &route.path_regex) {
        (Some(_), None) => {}
        (None, Some(re)) => {
            if let Err(e) = regex::Regex::new(re) {
                errors.push(ValidationError::InvalidRegex {
                    route: name.clone(),
                    reason: e.to_string(),
                });
            }
        }
        _ => errors.push(ValidationError::PatternCount(name.clone())),
    }

    if route.target.trim().is_empty() {
        errors.push(ValidationError::EmptyTarget(name.clone()));
    }

    let scope = format!("route `{}`", name);
    check_timeouts(&scope, route.open_timeout_secs, route.timeout_secs, errors);
}

fn check_timeouts(
    scope: &str,
    open_timeout_secs: Option<u64>,
    timeout_secs: Option<u64>,
    errors: &mut Vec<ValidationError>,
) {
    if open_timeout_secs == Some(0) {
        errors.push(ValidationError::ZeroTimeout {
            scope: scope.to_string(),
            field: "open_timeout_secs",
        });
    }
    if timeout_secs == Some(0) {
        errors.push(ValidationError::ZeroTimeout {
            scope: scope.to_string(),
            field: "timeout_secs",
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn route(name: &str) -> RouteConfig {
        RouteConfig {
            name: name.to_string(),
            path_prefix: Some("/api".to_string()),
            target: "http://127.0.0.1:3000".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&ProxyConfig::default()).is_ok());
    }

    #[test]
    fn test_collects_all_errors() {
        let mut config = ProxyConfig::default();
        config.listener.bind_address = "not-an-address".into();
        config.routes.push(route("api"));
        config.routes.push(route("api"));
        config.routes.push(RouteConfig {
            path_prefix: None,
            path_regex: Some("(".into()),
            timeout_secs: Some(0),
            ..route("broken")
        });
        config.routes.push(RouteConfig {
            path_regex: Some("/x".into()),
            target: " ".into(),
            username: Some("u".into()),
            ..route("confused")
        });

        let errors = validate_config(&config).unwrap_err();
        assert!(errors.contains(&ValidationError::InvalidAddress {
            field: "listener.bind_address",
            value: "not-an-address".into()
        }));
        assert!(errors.contains(&ValidationError::DuplicateRoute("api".into())));
        assert!(errors
            .iter()
            .any(|e| matches!(e, ValidationError::InvalidRegex { route, .. } if route == "broken")));
        assert!(errors.contains(&ValidationError::ZeroTimeout {
            scope: "route `broken`".into(),
            field: "timeout_secs"
        }));
        assert!(errors.contains(&ValidationError::PatternCount("confused".into())));
        assert!(errors.contains(&ValidationError::EmptyTarget("confused".into())));
        assert!(errors.contains(&ValidationError::PartialCredentials("route `confused`".into())));
        assert_eq!(errors.len(), 7);
    }

    #[test]
    fn test_credentials_merge_with_global_options() {
        let mut config = ProxyConfig::default();
        config.options.password = Some("shared-secret".into());
        config.routes.push(RouteConfig {
            username: Some("svc".into()),
            ..route("merged")
        });
        assert!(validate_config(&config).is_ok());

        config.options.password = None;
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(
            errors,
            vec![ValidationError::PartialCredentials("route `merged`".into())]
        );
    }
}
