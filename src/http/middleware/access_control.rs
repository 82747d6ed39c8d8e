//! Access Control Middleware.
//! Gates every page request on the caller's session trust level.

use std::sync::Arc;

use arc_swap::ArcSwap;
use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::Response,
};

use crate::config::schema::{GatewayConfig, RedirectConfig};
use crate::http::request::{normalize_path, request_id, session_token, with_path};
use crate::http::response::{bad_request, decision_response};
use crate::observability::metrics;
use crate::policy::{OwnershipCheck, PolicyEngine, TrustLevel, TrustResolver};
use crate::routing::matcher::MalformedTemplate;
use crate::routing::table::RouteGroup;

/// Everything the gate needs per request, swapped as one unit on reload.
#[derive(Debug, Clone)]
pub struct GatePolicy {
    pub engine: PolicyEngine,
    pub redirects: RedirectConfig,
    pub cookie_name: String,
    pub excluded_prefixes: Vec<String>,
}

impl GatePolicy {
    /// Compile the route table and capture the boundary settings.
    pub fn compile(
        config: &GatewayConfig,
        ownership: Arc<dyn OwnershipCheck>,
    ) -> Result<Self, MalformedTemplate> {
        Ok(Self {
            engine: PolicyEngine::from_config(&config.routes)?.with_ownership_check(ownership),
            redirects: config.redirects.clone(),
            cookie_name: config.session.cookie_name.clone(),
            excluded_prefixes: config.exclusions.prefixes.clone(),
        })
    }

    /// True for paths the gate never classifies (assets, API routes).
    ///
    /// Prefixes match on whole segments: `/api` covers `/api` and
    /// `/api/users` but not `/apiary`.
    pub fn is_excluded(&self, path: &str) -> bool {
        self.excluded_prefixes.iter().any(|prefix| {
            let prefix = prefix.trim_end_matches('/');
            match path.strip_prefix(prefix) {
                Some(rest) => rest.is_empty() || rest.starts_with('/') || prefix.is_empty(),
                None => false,
            }
        })
    }
}

/// Shared, atomically replaceable gate policy.
///
/// Readers take a snapshot per request; a reload publishes a fully built
/// policy with a single pointer swap.
#[derive(Clone)]
pub struct PolicyHandle {
    current: Arc<ArcSwap<GatePolicy>>,
    ownership: Arc<dyn OwnershipCheck>,
}

impl PolicyHandle {
    pub fn new(
        config: &GatewayConfig,
        ownership: Arc<dyn OwnershipCheck>,
    ) -> Result<Self, MalformedTemplate> {
        let policy = GatePolicy::compile(config, ownership.clone())?;
        Ok(Self {
            current: Arc::new(ArcSwap::from_pointee(policy)),
            ownership,
        })
    }

    /// Snapshot of the current policy.
    pub fn load(&self) -> Arc<GatePolicy> {
        self.current.load_full()
    }

    /// Compile `config` and publish it. On error the current policy stays.
    pub fn reload(&self, config: &GatewayConfig) -> Result<(), MalformedTemplate> {
        let policy = GatePolicy::compile(config, self.ownership.clone())?;
        self.current.store(Arc::new(policy));
        Ok(())
    }
}

/// State required for access control.
#[derive(Clone)]
pub struct AccessControlState {
    pub policy: PolicyHandle,
    pub resolver: Arc<dyn TrustResolver>,
}

/// Context attached to allowed requests.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GateContext {
    pub trust: TrustLevel,
    /// `None` when the path matched no group.
    pub group: Option<RouteGroup>,
}

pub async fn access_control_middleware(
    State(state): State<AccessControlState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let policy = state.policy.load();

    // 1. Canonicalize, and forward exactly what gets classified.
    let rewritten = normalize_path(req.uri().path()).and_then(|path| {
        let uri = with_path(req.uri(), &path)?;
        Ok((path, uri))
    });
    let path = match rewritten {
        Ok((path, uri)) => {
            *req.uri_mut() = uri;
            path
        }
        Err(e) => {
            metrics::record_rejected_path();
            tracing::debug!(request_id = %request_id(req.headers()), error = %e, "Rejected request path");
            return bad_request();
        }
    };

    // 2. Non-page paths bypass the gate.
    if policy.is_excluded(&path) {
        metrics::record_excluded();
        return next.run(req).await;
    }

    // 3. Derive the trust level from the session cookie.
    let token = session_token(req.headers(), &policy.cookie_name);
    let trust = state.resolver.resolve(token.as_deref());

    // 4. Classify and authorize
    let eval = policy.engine.evaluate(&path, trust);
    metrics::record_decision(eval.group, eval.decision);

    tracing::debug!(
        request_id = %request_id(req.headers()),
        path = %path,
        trust = %trust,
        group = eval.group.map_or("default", |g| g.as_str()),
        decision = %eval.decision,
        "Gate decision"
    );

    // 5. Apply: redirects terminate here, nothing downstream runs.
    match decision_response(eval.decision, &policy.redirects) {
        Some(redirect) => redirect,
        None => {
            req.extensions_mut().insert(GateContext {
                trust,
                group: eval.group,
            });
            next.run(req).await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::{ClaimTokenResolver, NoOwnershipCheck};
    use axum::{
        http::{header, StatusCode},
        middleware, Router,
    };
    use tower::ServiceExt;

    async fn echo_trust(req: Request<Body>) -> String {
        match req.extensions().get::<GateContext>() {
            Some(ctx) => ctx.trust.to_string(),
            None => "bypass".to_string(),
        }
    }

    fn app(config: &GatewayConfig) -> (Router, PolicyHandle) {
        let handle = PolicyHandle::new(config, Arc::new(NoOwnershipCheck)).unwrap();
        let state = AccessControlState {
            policy: handle.clone(),
            resolver: Arc::new(ClaimTokenResolver),
        };
        let router = Router::new()
            .fallback(echo_trust)
            .layer(middleware::from_fn_with_state(state, access_control_middleware));
        (router, handle)
    }

    async fn send(router: &Router, path: &str, session: Option<&str>) -> Response {
        let mut builder = Request::builder().uri(path);
        if let Some(value) = session {
            builder = builder.header(header::COOKIE, format!("user_session={}", value));
        }
        router
            .clone()
            .oneshot(builder.body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    fn location(response: &Response) -> &str {
        response.headers()[header::LOCATION].to_str().unwrap()
    }

    #[tokio::test]
    async fn test_redirects_and_allows() {
        let (router, _) = app(&GatewayConfig::default());

        let res = send(&router, "/dashboard", None).await;
        assert_eq!(res.status(), StatusCode::TEMPORARY_REDIRECT);
        assert_eq!(location(&res), "/auth/login");

        let res = send(&router, "/dashboard", Some("user")).await;
        assert_eq!(location(&res), "/about");

        let res = send(&router, "/dashboard", Some("admin")).await;
        assert_eq!(res.status(), StatusCode::OK);
        let body = axum::body::to_bytes(res.into_body(), 1024).await.unwrap();
        assert_eq!(&body[..], b"admin");

        let res = send(&router, "/auth/login", Some("authenticated")).await;
        assert_eq!(location(&res), "/about");
    }

    #[tokio::test]
    async fn test_normalized_path_is_gated() {
        let (router, _) = app(&GatewayConfig::default());

        let res = send(&router, "/dashboard/", Some("user")).await;
        assert_eq!(res.status(), StatusCode::TEMPORARY_REDIRECT);

        // Dot segments cannot smuggle a page past the exclusion list.
        let res = send(&router, "/api/../dashboard", None).await;
        assert_eq!(location(&res), "/auth/login");
    }

    #[tokio::test]
    async fn test_encoded_paths_are_gated() {
        let (router, _) = app(&GatewayConfig::default());

        for path in ["/%64ashboard", "/%61bout", "/users/%2e%2e/dashboard", "/%2E%2E/dashboard"] {
            let res = send(&router, path, None).await;
            assert_eq!(res.status(), StatusCode::TEMPORARY_REDIRECT, "{}", path);
            assert_eq!(location(&res), "/auth/login", "{}", path);
        }

        let res = send(&router, "/%64ashboard", Some("user")).await;
        assert_eq!(location(&res), "/about");

        // Encoded dot segments cannot climb out of an excluded prefix either.
        let res = send(&router, "/api/%2e%2e/dashboard", None).await;
        assert_eq!(location(&res), "/auth/login");
    }

    #[tokio::test]
    async fn test_encoded_separator_is_rejected() {
        let (router, _) = app(&GatewayConfig::default());

        for path in ["/dashboard%2F", "/dashboard%2f", "/api%2F..%2Fdashboard"] {
            let res = send(&router, path, Some("admin")).await;
            assert_eq!(res.status(), StatusCode::BAD_REQUEST, "{}", path);
        }
    }

    #[tokio::test]
    async fn test_allowed_request_carries_normalized_uri() {
        let state = AccessControlState {
            policy: PolicyHandle::new(&GatewayConfig::default(), Arc::new(NoOwnershipCheck)).unwrap(),
            resolver: Arc::new(ClaimTokenResolver),
        };
        let router = Router::new()
            .fallback(|req: Request<Body>| async move { req.uri().to_string() })
            .layer(middleware::from_fn_with_state(state, access_control_middleware));

        let res = send(&router, "/%64ashboard/?tab=2", Some("admin")).await;
        assert_eq!(res.status(), StatusCode::OK);
        let body = axum::body::to_bytes(res.into_body(), 1024).await.unwrap();
        assert_eq!(&body[..], b"/dashboard?tab=2");
    }

    #[tokio::test]
    async fn test_excluded_paths_bypass() {
        let (router, _) = app(&GatewayConfig::default());

        let res = send(&router, "/api/users", None).await;
        assert_eq!(res.status(), StatusCode::OK);
        let body = axum::body::to_bytes(res.into_body(), 1024).await.unwrap();
        assert_eq!(&body[..], b"bypass");
    }

    #[tokio::test]
    async fn test_corrupt_cookie_is_anonymous() {
        let (router, _) = app(&GatewayConfig::default());

        let res = send(&router, "/about", Some("%%%garbage")).await;
        assert_eq!(location(&res), "/auth/login");

        let res = send(&router, "/auth/login", Some("%%%garbage")).await;
        assert_eq!(res.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_reload_swaps_policy() {
        let (router, handle) = app(&GatewayConfig::default());

        let res = send(&router, "/reports", None).await;
        assert_eq!(res.status(), StatusCode::OK);

        let mut config = GatewayConfig::default();
        config.routes.admin_only.push("/reports".into());
        handle.reload(&config).unwrap();

        let res = send(&router, "/reports", None).await;
        assert_eq!(location(&res), "/auth/login");
    }

    #[tokio::test]
    async fn test_failed_reload_keeps_policy() {
        let (router, handle) = app(&GatewayConfig::default());

        let mut config = GatewayConfig::default();
        config.routes.admin_only = vec!["/about".into(), "/bad/:".into()];
        assert!(handle.reload(&config).is_err());

        let res = send(&router, "/about", Some("user")).await;
        assert_eq!(res.status(), StatusCode::OK);
    }

    #[test]
    fn test_exclusion_matches_segments() {
        let policy = GatePolicy::compile(&GatewayConfig::default(), Arc::new(NoOwnershipCheck)).unwrap();

        assert!(policy.is_excluded("/api"));
        assert!(policy.is_excluded("/api/v1/users"));
        assert!(policy.is_excluded("/_next/static/chunk.js"));
        assert!(policy.is_excluded("/favicon.ico"));
        assert!(!policy.is_excluded("/apiary"));
        assert!(!policy.is_excluded("/_next/data"));
        assert!(!policy.is_excluded("/"));
    }
}
