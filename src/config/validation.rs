//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate addresses, redirect targets and timeouts
//! - Compile every route template (fail fast at startup)
//! - Detect redirect targets that would bounce forever
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GatewayConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::GatewayConfig;
use crate::policy::{Decision, PolicyEngine, TrustLevel};
use crate::routing::matcher::{MalformedTemplate, RoutePattern};
use crate::routing::table::RouteGroup;

/// A single semantic problem with a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field}: `{value}` is not a valid socket address")]
    InvalidAddress { field: &'static str, value: String },

    #[error("{field}: redirect target `{value}` must be an absolute path")]
    InvalidRedirect { field: &'static str, value: String },

    #[error("session.cookie_name must not be empty")]
    EmptyCookieName,

    #[error("{field} must be greater than zero")]
    ZeroTimeout { field: &'static str },

    #[error("exclusions.prefixes: `{0}` must start with `/`")]
    InvalidExclusion(String),

    #[error("routes.{group}: {source}")]
    Template {
        group: RouteGroup,
        source: MalformedTemplate,
    },

    #[error("{field}: `{target}` is not reachable by a {trust} caller ({decision})")]
    RedirectLoop {
        field: &'static str,
        target: String,
        trust: TrustLevel,
        decision: Decision,
    },
}

/// Check a configuration, collecting every problem found.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    check_address(&mut errors, "listener.bind_address", &config.listener.bind_address);
    check_address(&mut errors, "upstream.address", &config.upstream.address);
    if config.observability.metrics_enabled {
        check_address(&mut errors, "observability.metrics_address", &config.observability.metrics_address);
    }

    check_redirect(&mut errors, "redirects.login", &config.redirects.login);
    check_redirect(&mut errors, "redirects.default", &config.redirects.default);

    if config.session.cookie_name.trim().is_empty() {
        errors.push(ValidationError::EmptyCookieName);
    }

    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::ZeroTimeout { field: "timeouts.request_secs" });
    }
    if config.timeouts.connect_secs == 0 {
        errors.push(ValidationError::ZeroTimeout { field: "timeouts.connect_secs" });
    }

    for prefix in &config.exclusions.prefixes {
        if !prefix.starts_with('/') {
            errors.push(ValidationError::InvalidExclusion(prefix.clone()));
        }
    }

    let mut templates_ok = true;
    for group in RouteGroup::PRIORITY {
        for template in group_templates(config, group) {
            if let Err(source) = RoutePattern::compile(template) {
                templates_ok = false;
                errors.push(ValidationError::Template { group, source });
            }
        }
    }

    // Loop detection needs a compiled table.
    if templates_ok {
        if let Ok(engine) = PolicyEngine::from_config(&config.routes) {
            check_reachable(&mut errors, &engine, "redirects.login", &config.redirects.login, TrustLevel::Anonymous);
            check_reachable(&mut errors, &engine, "redirects.default", &config.redirects.default, TrustLevel::User);
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn group_templates(config: &GatewayConfig, group: RouteGroup) -> &[String] {
    let routes = &config.routes;
    match group {
        RouteGroup::AuthFlow => &routes.auth_flow,
        RouteGroup::UserOpen => &routes.user_open,
        RouteGroup::UserRestricted => &routes.user_restricted,
        RouteGroup::AdminOnly => &routes.admin_only,
        RouteGroup::Public => &routes.public,
    }
}

fn check_address(errors: &mut Vec<ValidationError>, field: &'static str, value: &str) {
    if value.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field,
            value: value.to_string(),
        });
    }
}

fn check_redirect(errors: &mut Vec<ValidationError>, field: &'static str, value: &str) {
    // Reject protocol-relative targets such as `//evil.example`.
    if !value.starts_with('/') || value.starts_with("//") {
        errors.push(ValidationError::InvalidRedirect {
            field,
            value: value.to_string(),
        });
    }
}

fn check_reachable(
    errors: &mut Vec<ValidationError>,
    engine: &PolicyEngine,
    field: &'static str,
    target: &str,
    trust: TrustLevel,
) {
    let path = target.split(['?', '#']).next().unwrap_or(target);
    let decision = engine.classify_and_authorize(path, trust);
    if decision != Decision::Allow {
        errors.push(ValidationError::RedirectLoop {
            field,
            target: target.to_string(),
            trust,
            decision,
        });
    }
}
