//! Access policy evaluation.
//!
//! # Responsibilities
//! - Classify a request path into a route group
//! - Apply that group's rule to the caller's trust level
//! - Produce exactly one [`Decision`] per request
//!
//! # Design Decisions
//! - Total function: every (path, trust) pair yields a decision
//! - Unlisted paths are allowed (explicit default-open fallback)
//! - No per-request state; safe to share behind `Arc` without locks

use std::fmt;
use std::sync::Arc;

use serde::Serialize;

use crate::config::schema::RoutesConfig;
use crate::policy::ownership::{NoOwnershipCheck, OwnershipCheck};
use crate::policy::trust::TrustLevel;
use crate::routing::matcher::MalformedTemplate;
use crate::routing::table::{RouteGroup, RouteTable};

/// Outcome of policy evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Decision {
    /// Continue to the next handler unchanged.
    Allow,
    /// Terminate with a redirect to the login page.
    RedirectToLogin,
    /// Terminate with a redirect to the authenticated landing page.
    RedirectToDefault,
}

impl Decision {
    pub fn as_str(&self) -> &'static str {
        match self {
            Decision::Allow => "allow",
            Decision::RedirectToLogin => "redirect-to-login",
            Decision::RedirectToDefault => "redirect-to-default",
        }
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A decision together with the group that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Evaluation {
    /// `None` when no group matched.
    pub group: Option<RouteGroup>,
    pub decision: Decision,
}

/// Compiled route table plus the rules applied to each group.
#[derive(Debug, Clone)]
pub struct PolicyEngine {
    table: RouteTable,
    ownership: Arc<dyn OwnershipCheck>,
}

impl PolicyEngine {
    /// Create an engine over a compiled table with the no-op ownership hook.
    pub fn new(table: RouteTable) -> Self {
        Self {
            table,
            ownership: Arc::new(NoOwnershipCheck),
        }
    }

    /// Compile the route table from configuration, failing fast on bad templates.
    pub fn from_config(routes: &RoutesConfig) -> Result<Self, MalformedTemplate> {
        Ok(Self::new(RouteTable::compile(routes)?))
    }

    /// Replace the ownership hook consulted for `user-restricted` pages.
    pub fn with_ownership_check(mut self, check: Arc<dyn OwnershipCheck>) -> Self {
        self.ownership = check;
        self
    }

    pub fn table(&self) -> &RouteTable {
        &self.table
    }

    /// Decide what happens to a request for `path` from a caller at `trust`.
    pub fn classify_and_authorize(&self, path: &str, trust: TrustLevel) -> Decision {
        self.evaluate(path, trust).decision
    }

    /// Like [`classify_and_authorize`](Self::classify_and_authorize), also
    /// reporting the matched group.
    pub fn evaluate(&self, path: &str, trust: TrustLevel) -> Evaluation {
        let group = self.table.classify(path);

        let decision = match group {
            // Signed-in callers have no business on login/signup pages.
            Some(RouteGroup::AuthFlow) => {
                if trust.is_anonymous() {
                    Decision::Allow
                } else {
                    Decision::RedirectToDefault
                }
            }
            Some(RouteGroup::UserOpen) => {
                if trust.is_anonymous() {
                    Decision::RedirectToLogin
                } else {
                    Decision::Allow
                }
            }
            Some(RouteGroup::UserRestricted) => {
                if trust.is_anonymous() {
                    Decision::RedirectToLogin
                } else if self.ownership.permits(path, trust) {
                    Decision::Allow
                } else {
                    Decision::RedirectToDefault
                }
            }
            Some(RouteGroup::AdminOnly) => {
                if trust.is_anonymous() {
                    Decision::RedirectToLogin
                } else if trust.is_admin() {
                    Decision::Allow
                } else {
                    Decision::RedirectToDefault
                }
            }
            Some(RouteGroup::Public) => Decision::Allow,
            None => Decision::Allow,
        };

        Evaluation { group, decision }
    }
}
