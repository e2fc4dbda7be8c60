//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming Request (path with query, headers)
//!     → router.rs (evaluate every route in registration order)
//!     → matcher.rs (pattern captures + optional predicate)
//!     → Return: matched Route, NoMatch, or AmbiguousMatch
//!     → target.rs (matched Route + captures → destination URI)
//!
//! Route Registration (at startup):
//!     (pattern, target, options)
//!     → Compile pattern (prefix or regex)
//!     → Classify target (static, templated, dynamic)
//!     → Merge options over globals, build upstream client
//!     → Append to immutable RouteTable
//! ```
//!
//! # Design Decisions
//! - Routes compiled at registration, immutable at runtime
//! - Deterministic: same input always matches same route
//! - Ambiguity is an error unless first-match mode is configured

pub mod matcher;
pub mod router;
pub mod target;

pub use matcher::{HostMatcher, Matcher, PathCaptures, Pattern};
pub use router::{Route, RouteMatch, RouteTable};
pub use target::Target;
