//! Ownership hook for user-restricted pages.
//!
//! Authenticated callers reaching a `user-restricted` page are passed to an
//! [`OwnershipCheck`] before being allowed in. The shipped check admits
//! everyone, so restricted pages currently require authentication only.

use std::fmt::Debug;

use crate::policy::trust::TrustLevel;

/// Decides whether an authenticated caller may view a restricted resource.
pub trait OwnershipCheck: Send + Sync + Debug {
    /// Returns false to bounce the caller to the default page.
    fn permits(&self, path: &str, trust: TrustLevel) -> bool;
}

/// Admits every authenticated caller.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOwnershipCheck;

impl OwnershipCheck for NoOwnershipCheck {
    fn permits(&self, path: &str, trust: TrustLevel) -> bool {
        tracing::debug!(path = %path, trust = %trust, "Ownership check not enforced");
        true
    }
}
