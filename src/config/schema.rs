//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the gateway.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GatewayConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Application server that allowed requests are forwarded to.
    pub upstream: UpstreamConfig,

    /// Session cookie settings.
    pub session: SessionConfig,

    /// Redirect targets for gated requests.
    pub redirects: RedirectConfig,

    /// Route groups, evaluated in fixed priority order.
    pub routes: RoutesConfig,

    /// Paths that bypass the gate entirely.
    pub exclusions: ExclusionConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Upstream application configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Upstream address (e.g., "127.0.0.1:3000").
    pub address: String,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            address: "127.0.0.1:3000".to_string(),
        }
    }
}

/// Session cookie configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Name of the cookie carrying the session token.
    pub cookie_name: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cookie_name: "user_session".to_string(),
        }
    }
}

/// Where gated requests are sent.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RedirectConfig {
    /// Login surface for anonymous callers.
    pub login: String,

    /// Authenticated landing surface.
    pub default: String,
}

impl Default for RedirectConfig {
    fn default() -> Self {
        Self {
            login: "/auth/login".to_string(),
            default: "/about".to_string(),
        }
    }
}

/// Route templates per group.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RoutesConfig {
    /// Login, signup, password reset and email verification pages.
    #[serde(rename = "auth-flow")]
    pub auth_flow: Vec<String>,

    /// Pages any authenticated caller may view.
    #[serde(rename = "user-open")]
    pub user_open: Vec<String>,

    /// Pages requiring authentication plus the ownership hook.
    #[serde(rename = "user-restricted")]
    pub user_restricted: Vec<String>,

    /// Pages requiring the admin trust level.
    #[serde(rename = "admin-only")]
    pub admin_only: Vec<String>,

    /// Pages open to everyone.
    pub public: Vec<String>,
}

impl Default for RoutesConfig {
    fn default() -> Self {
        Self {
            auth_flow: strings(&[
                "/auth/:oobcode/reset-password",
                "/auth/:oobcode/verify-email",
                "/auth/forgot-password",
                "/auth/login",
                "/auth/send-verify-email",
                "/auth/signup",
            ]),
            user_open: strings(&["/about"]),
            user_restricted: strings(&["/users/:userid"]),
            admin_only: strings(&["/dashboard"]),
            public: strings(&["/"]),
        }
    }
}

/// Paths that never reach the policy engine.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ExclusionConfig {
    /// Path prefixes, matched on whole segments.
    pub prefixes: Vec<String>,
}

impl Default for ExclusionConfig {
    fn default() -> Self {
        Self {
            prefixes: strings(&["/api", "/_next/static", "/_next/image", "/favicon.ico"]),
        }
    }
}

/// Timeout configuration for various operations.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Upstream connection establishment timeout in seconds.
    pub connect_secs: u64,

    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_secs: 5,
            request_secs: 30,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}
