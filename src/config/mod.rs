//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → ProxyConfig (validated, immutable)
//!     → builder.rs (GlobalOptions + registered RouteTable)
//!
//! Programmatic use:
//!     GlobalOptions + RouteOptions (options.rs)
//!     → merged per route into ResolvedOptions at registration
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require a restart
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod builder;
pub mod loader;
pub mod options;
pub mod schema;
pub mod validation;

pub use builder::build_route_table;
pub use loader::{load_config, parse_config, ConfigError};
pub use options::{GlobalOptions, MatchingMode, ResolvedOptions, RouteOptions};
pub use schema::{CacheConfig, ListenerConfig, ObservabilityConfig, OptionsConfig, ProxyConfig, RouteConfig};
