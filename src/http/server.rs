//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the gate and the forwarding handler
//! - Wire up middleware (tracing, timeout, request ID, access control)
//! - Bind server to listener
//! - Forward allowed requests to the upstream application
//! - Apply configuration reloads by swapping the gate policy

use axum::{
    body::Body,
    extract::State,
    http::{
        uri::{Authority, InvalidUri, PathAndQuery, Scheme},
        HeaderValue, Request, Uri,
    },
    middleware,
    response::Response,
    routing::any,
    Router,
};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::GatewayConfig;
use crate::http::middleware::{access_control_middleware, AccessControlState, GateContext, PolicyHandle};
use crate::http::request::{request_id, UuidRequestId};
use crate::http::response::bad_gateway;
use crate::lifecycle::ShutdownSignal;
use crate::observability::metrics;
use crate::policy::{ClaimTokenResolver, NoOwnershipCheck, OwnershipCheck, TrustResolver};
use crate::routing::matcher::MalformedTemplate;

/// Header telling the upstream which trust level the gate resolved.
pub const X_GATE_TRUST: &str = "x-gate-trust";

/// Errors that prevent the server from being built.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("invalid route table: {0}")]
    Routes(#[from] MalformedTemplate),

    #[error("invalid upstream address `{address}`: {source}")]
    Upstream { address: String, source: InvalidUri },
}

/// State for the forwarding handler.
#[derive(Clone)]
pub struct ForwardState {
    pub client: Client<HttpConnector, Body>,
    pub upstream: Authority,
}

/// HTTP server for the gateway.
pub struct GatewayServer {
    config: GatewayConfig,
    policy: PolicyHandle,
    resolver: Arc<dyn TrustResolver>,
    forward: ForwardState,
}

impl GatewayServer {
    /// Create a server with the cookie-claim resolver and no ownership check.
    pub fn new(config: GatewayConfig) -> Result<Self, ServerError> {
        Self::with_hooks(config, Arc::new(ClaimTokenResolver), Arc::new(NoOwnershipCheck))
    }

    /// Create a server with custom identity and ownership hooks.
    ///
    /// Fails if any route template is malformed.
    pub fn with_hooks(
        config: GatewayConfig,
        resolver: Arc<dyn TrustResolver>,
        ownership: Arc<dyn OwnershipCheck>,
    ) -> Result<Self, ServerError> {
        let policy = PolicyHandle::new(&config, ownership)?;

        let upstream = Authority::from_str(&config.upstream.address).map_err(|source| {
            ServerError::Upstream {
                address: config.upstream.address.clone(),
                source,
            }
        })?;

        let mut connector = HttpConnector::new();
        connector.set_connect_timeout(Some(Duration::from_secs(config.timeouts.connect_secs)));
        let client = Client::builder(TokioExecutor::new()).build(connector);

        Ok(Self {
            config,
            policy,
            resolver,
            forward: ForwardState { client, upstream },
        })
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    pub fn router(&self) -> Router {
        let access = AccessControlState {
            policy: self.policy.clone(),
            resolver: self.resolver.clone(),
        };

        Router::new()
            .route("/{*path}", any(forward_handler))
            .route("/", any(forward_handler))
            .with_state(self.forward.clone())
            .layer(middleware::from_fn_with_state(access, access_control_middleware))
            .layer(TimeoutLayer::new(Duration::from_secs(self.config.timeouts.request_secs)))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TraceLayer::new_for_http().make_span_with(|req: &Request<Body>| {
                tracing::info_span!(
                    "request",
                    method = %req.method(),
                    path = %req.uri().path(),
                    request_id = %request_id(req.headers())
                )
            }))
            .layer(SetRequestIdLayer::x_request_id(UuidRequestId))
    }

    /// Run the server until `shutdown` fires, applying config updates as they arrive.
    pub async fn run(
        self,
        listener: TcpListener,
        mut config_updates: mpsc::UnboundedReceiver<GatewayConfig>,
        mut shutdown: ShutdownSignal,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            upstream = %self.forward.upstream,
            templates = self.policy.load().engine.table().len(),
            "Gateway starting"
        );

        let policy = self.policy.clone();
        let running_upstream = self.config.upstream.address.clone();
        let reloader = tokio::spawn(async move {
            while let Some(config) = config_updates.recv().await {
                apply_update(&policy, &config, &running_upstream);
            }
        });

        let app = self.router().into_make_service();
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        reloader.abort();
        tracing::info!("Gateway stopped");
        Ok(())
    }
}

fn apply_update(policy: &PolicyHandle, config: &GatewayConfig, running_upstream: &str) {
    match policy.reload(config) {
        Ok(()) => {
            metrics::record_reload(true);
            tracing::info!(
                templates = policy.load().engine.table().len(),
                "Route table reloaded"
            );
        }
        Err(e) => {
            metrics::record_reload(false);
            tracing::error!(error = %e, "Rejected route table reload, keeping current table");
        }
    }

    if config.upstream.address != running_upstream {
        tracing::warn!(
            running = %running_upstream,
            configured = %config.upstream.address,
            "Upstream address changes require a restart"
        );
    }
}

/// Forward an allowed request to the upstream application.
async fn forward_handler(State(state): State<ForwardState>, request: Request<Body>) -> Response {
    let req_id = request_id(request.headers()).to_string();
    let (mut parts, body) = request.into_parts();

    // URI rewrite
    let mut uri_parts = parts.uri.clone().into_parts();
    uri_parts.scheme = Some(Scheme::HTTP);
    uri_parts.authority = Some(state.upstream.clone());
    if uri_parts.path_and_query.is_none() {
        uri_parts.path_and_query = Some(PathAndQuery::from_static("/"));
    }
    parts.uri = match Uri::from_parts(uri_parts) {
        Ok(uri) => uri,
        Err(e) => {
            tracing::error!(request_id = %req_id, error = %e, "Failed to build upstream URI");
            return bad_gateway();
        }
    };

    // Never trust a client-supplied trust header.
    parts.headers.remove(X_GATE_TRUST);
    if let Some(ctx) = parts.extensions.get::<GateContext>() {
        parts
            .headers
            .insert(X_GATE_TRUST, HeaderValue::from_static(ctx.trust.as_str()));
    }

    match state.client.request(Request::from_parts(parts, body)).await {
        Ok(response) => {
            let (parts, body) = response.into_parts();
            Response::from_parts(parts, Body::new(body))
        }
        Err(e) => {
            tracing::error!(request_id = %req_id, upstream = %state.upstream, error = %e, "Upstream error");
            metrics::record_upstream_error();
            bad_gateway()
        }
    }
}
