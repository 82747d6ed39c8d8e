//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Route Compilation (at startup / reload):
//!     RoutesConfig (five template lists)
//!     → matcher.rs (parse templates into segment lists)
//!     → table.rs (group patterns by RouteGroup)
//!     → Freeze as immutable RouteTable
//!
//! Incoming path
//!     → table.rs (walk groups in priority order)
//!     → matcher.rs (anchored segment match)
//!     → Return: matched RouteGroup or None
//! ```
//!
//! # Design Decisions
//! - Routes compiled at startup, immutable at runtime
//! - No regex in hot path (segment comparison only)
//! - Deterministic: same input always matches same group
//! - First match wins (fixed group priority)

pub mod matcher;
pub mod table;

pub use matcher::{any_match, MalformedTemplate, PathMatch, RoutePattern};
pub use table::{RouteGroup, RouteTable};
