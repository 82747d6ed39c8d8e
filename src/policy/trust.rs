//! Trust levels and session token resolution.
//!
//! The identity provider signs callers in and issues a session token that
//! names exactly one tier. This module only maps that token onto a
//! [`TrustLevel`]; it never verifies credentials.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Caller tier derived from the session token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TrustLevel {
    /// No session token.
    #[default]
    Anonymous,
    User,
    Admin,
    /// Signed in, but the token carries neither the `user` nor the `admin` claim.
    Authenticated,
}

impl TrustLevel {
    pub const ALL: [TrustLevel; 4] = [
        TrustLevel::Anonymous,
        TrustLevel::User,
        TrustLevel::Admin,
        TrustLevel::Authenticated,
    ];

    pub fn is_anonymous(&self) -> bool {
        matches!(self, TrustLevel::Anonymous)
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, TrustLevel::Admin)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TrustLevel::Anonymous => "anonymous",
            TrustLevel::User => "user",
            TrustLevel::Admin => "admin",
            TrustLevel::Authenticated => "authenticated",
        }
    }
}

impl fmt::Display for TrustLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TrustLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TrustLevel::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| format!("unknown trust level `{}`", s))
    }
}

/// Converts a raw session token into a trust level.
///
/// Implementations must be total: a corrupt or unknown token resolves to
/// [`TrustLevel::Anonymous`] instead of failing the request.
pub trait TrustResolver: Send + Sync + fmt::Debug {
    fn resolve(&self, token: Option<&str>) -> TrustLevel;
}

/// Resolver for tokens whose value is the claim name itself
/// (`user`, `admin` or `authenticated`).
#[derive(Debug, Clone, Copy, Default)]
pub struct ClaimTokenResolver;

impl TrustResolver for ClaimTokenResolver {
    fn resolve(&self, token: Option<&str>) -> TrustLevel {
        let token = match token.map(str::trim) {
            None | Some("") => return TrustLevel::Anonymous,
            Some(t) => t,
        };

        match token {
            "user" => TrustLevel::User,
            "admin" => TrustLevel::Admin,
            "authenticated" => TrustLevel::Authenticated,
            other => {
                tracing::debug!(token_len = other.len(), "Unrecognized session token, treating as anonymous");
                TrustLevel::Anonymous
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_claim_resolver() {
        let resolver = ClaimTokenResolver;

        assert_eq!(resolver.resolve(None), TrustLevel::Anonymous);
        assert_eq!(resolver.resolve(Some("")), TrustLevel::Anonymous);
        assert_eq!(resolver.resolve(Some("user")), TrustLevel::User);
        assert_eq!(resolver.resolve(Some("admin")), TrustLevel::Admin);
        assert_eq!(resolver.resolve(Some("authenticated")), TrustLevel::Authenticated);
    }

    #[test]
    fn test_malformed_token_degrades() {
        let resolver = ClaimTokenResolver;

        assert_eq!(resolver.resolve(Some("ADMIN")), TrustLevel::Anonymous);
        assert_eq!(resolver.resolve(Some("user,admin")), TrustLevel::Anonymous);
        assert_eq!(resolver.resolve(Some("\u{0}garbage")), TrustLevel::Anonymous);
    }

    #[test]
    fn test_parse_and_display() {
        for level in TrustLevel::ALL {
            assert_eq!(level.to_string().parse::<TrustLevel>(), Ok(level));
        }
        assert_eq!(TrustLevel::default(), TrustLevel::Anonymous);
    }
}
