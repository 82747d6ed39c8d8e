//! Access policy subsystem.
//!
//! # Data Flow
//! ```text
//! Session token (from cookie)
//!     → trust.rs (TrustResolver → TrustLevel)
//!
//! Request path + TrustLevel
//!     → engine.rs (classify via RouteTable, first match wins)
//!     → ownership.rs (user-restricted pages only)
//!     → Return: Decision (Allow / RedirectToLogin / RedirectToDefault)
//! ```
//!
//! # Design Decisions
//! - Engine built once per route table, immutable afterwards
//! - Rules are explicit per-group branches, not a generic interpreter
//! - Token corruption is absorbed by the resolver, never an error

pub mod engine;
pub mod ownership;
pub mod trust;

pub use engine::{Decision, Evaluation, PolicyEngine};
pub use ownership::{NoOwnershipCheck, OwnershipCheck};
pub use trust::{ClaimTokenResolver, TrustLevel, TrustResolver};
