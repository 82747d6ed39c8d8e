//! Route groups and the compiled route table.
//!
//! # Responsibilities
//! - Name the five route groups and their priority order
//! - Compile every group's templates from configuration
//! - Classify a path into at most one group (first match wins)
//!
//! # Design Decisions
//! - Immutable after construction (thread-safe without locks)
//! - Priority order is fixed in code, not configuration
//! - `None` from `classify` is the implicit default group

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::config::schema::RoutesConfig;
use crate::routing::matcher::{compile_all, MalformedTemplate, PathMatch, RoutePattern};

/// A named class of pages sharing one authorization rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum RouteGroup {
    AuthFlow,
    UserOpen,
    UserRestricted,
    AdminOnly,
    Public,
}

impl RouteGroup {
    /// Evaluation order. Earlier groups shadow later ones.
    pub const PRIORITY: [RouteGroup; 5] = [
        RouteGroup::AuthFlow,
        RouteGroup::UserOpen,
        RouteGroup::UserRestricted,
        RouteGroup::AdminOnly,
        RouteGroup::Public,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RouteGroup::AuthFlow => "auth-flow",
            RouteGroup::UserOpen => "user-open",
            RouteGroup::UserRestricted => "user-restricted",
            RouteGroup::AdminOnly => "admin-only",
            RouteGroup::Public => "public",
        }
    }
}

impl fmt::Display for RouteGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RouteGroup {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RouteGroup::PRIORITY
            .into_iter()
            .find(|g| g.as_str() == s)
            .ok_or_else(|| format!("unknown route group `{}`", s))
    }
}

/// Compiled templates for every route group.
#[derive(Debug, Clone)]
pub struct RouteTable {
    auth_flow: Vec<RoutePattern>,
    user_open: Vec<RoutePattern>,
    user_restricted: Vec<RoutePattern>,
    admin_only: Vec<RoutePattern>,
    public: Vec<RoutePattern>,
}

impl RouteTable {
    /// Compile every group. The first malformed template aborts compilation.
    pub fn compile(config: &RoutesConfig) -> Result<Self, MalformedTemplate> {
        Ok(Self {
            auth_flow: compile_all(&config.auth_flow)?,
            user_open: compile_all(&config.user_open)?,
            user_restricted: compile_all(&config.user_restricted)?,
            admin_only: compile_all(&config.admin_only)?,
            public: compile_all(&config.public)?,
        })
    }

    /// Templates belonging to one group, in declaration order.
    pub fn patterns(&self, group: RouteGroup) -> &[RoutePattern] {
        match group {
            RouteGroup::AuthFlow => &self.auth_flow,
            RouteGroup::UserOpen => &self.user_open,
            RouteGroup::UserRestricted => &self.user_restricted,
            RouteGroup::AdminOnly => &self.admin_only,
            RouteGroup::Public => &self.public,
        }
    }

    /// Find the first group (in priority order) with a matching template.
    pub fn classify(&self, path: &str) -> Option<RouteGroup> {
        RouteGroup::PRIORITY
            .into_iter()
            .find(|group| self.patterns(*group).test(path))
    }

    /// Total number of compiled templates.
    pub fn len(&self) -> usize {
        RouteGroup::PRIORITY
            .iter()
            .map(|g| self.patterns(*g).len())
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
