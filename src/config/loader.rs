//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::ProxyConfig;
use crate::config::validation::{validate_config, ValidationError};
use crate::error::ProxyError;

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),

    #[error("Route `{name}` rejected: {source}")]
    Route {
        name: String,
        #[source]
        source: ProxyError,
    },
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Parse and validate configuration from TOML text.
pub fn parse_config(content: &str) -> Result<ProxyConfig, ConfigError> {
    let config: ProxyConfig = toml::from_str(content)?;

    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<ProxyConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    parse_config(&content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::options::MatchingMode;

    const SAMPLE: &str = r#"
        [listener]
        bind_address = "127.0.0.1:8080"

        [options]
        matching_mode = "first"
        timeout_secs = 10

        [cache]
        enabled = true
        namespace = "edge"
        exemptions = ["/admin"]

        [[routes]]
        name = "static"
        path_prefix = "/static"
        target = "http://cdn.example.com"

        [[routes]]
        name = "items"
        path_regex = '^/api/(\d+)'
        target = "http://backend/$1"
        host = "api.example.com"
        cache = false
    "#;

    #[test]
    fn test_parse_sample() {
        let config = parse_config(SAMPLE).unwrap();
        assert_eq!(config.options.matching_mode, MatchingMode::First);
        assert_eq!(config.options.timeout_secs, Some(10));
        assert!(config.options.preserve_host);
        assert!(config.cache.enabled);
        assert_eq!(config.routes.len(), 2);
        assert_eq!(config.routes[1].path_regex.as_deref(), Some(r"^/api/(\d+)"));
        assert_eq!(config.routes[1].cache, Some(false));
    }

    #[test]
    fn test_parse_error() {
        assert!(matches!(parse_config("routes = 5"), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_validation_error() {
        let err = parse_config(
            r#"
            [[routes]]
            name = "r"
            target = "http://x"
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Validation(ref errors) if errors.len() == 1));
        assert!(err.to_string().contains("exactly one of path_prefix or path_regex"));
    }

    #[test]
    fn test_missing_file() {
        let err = load_config(Path::new("/definitely/not/here.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }

    #[test]
    fn test_route_error_keeps_source() {
        use std::error::Error as _;

        let err = ConfigError::Route {
            name: "bare".into(),
            source: ProxyError::GenericTarget {
                pattern: "/foo".into(),
                target: "bar.com".into(),
            },
        };
        assert!(err.to_string().starts_with("Route `bare` rejected: target `bar.com`"));
        assert!(matches!(
            err.source().and_then(|e| e.downcast_ref::<ProxyError>()),
            Some(ProxyError::GenericTarget { .. })
        ));
    }
}
