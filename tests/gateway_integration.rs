//! End-to-end tests: real listener, real upstream, real HTTP client.

use std::time::Duration;

use reqwest::header::{COOKIE, LOCATION};
use route_gate::config::GatewayConfig;

mod common;

async fn get(gateway: &common::TestGateway, path: &str, token: Option<&str>) -> reqwest::Response {
    let mut req = common::client().get(format!("http://{}{}", gateway.addr, path));
    if let Some(token) = token {
        req = req.header(COOKIE, common::session_cookie(token));
    }
    req.send().await.expect("Gateway unreachable")
}

fn location(res: &reqwest::Response) -> &str {
    res.headers()[LOCATION].to_str().unwrap()
}

#[tokio::test]
async fn test_scenarios_over_http() {
    let upstream = common::start_echo_upstream().await;
    let gateway = common::start_gateway(GatewayConfig::default(), upstream).await;

    let res = get(&gateway, "/auth/login", None).await;
    assert_eq!(res.status(), 200);
    assert_eq!(res.text().await.unwrap(), "/auth/login anonymous");

    let res = get(&gateway, "/auth/login", Some("user")).await;
    assert_eq!(res.status(), 307);
    assert_eq!(location(&res), "/about");

    let res = get(&gateway, "/dashboard", None).await;
    assert_eq!(res.status(), 307);
    assert_eq!(location(&res), "/auth/login");

    let res = get(&gateway, "/dashboard", Some("user")).await;
    assert_eq!(location(&res), "/about");

    let res = get(&gateway, "/dashboard?tab=2", Some("admin")).await;
    assert_eq!(res.status(), 200);
    assert_eq!(res.text().await.unwrap(), "/dashboard?tab=2 admin");

    let res = get(&gateway, "/about", None).await;
    assert_eq!(location(&res), "/auth/login");

    gateway.shutdown.trigger();
}

#[tokio::test]
async fn test_encoded_paths_cannot_bypass_the_gate() {
    let upstream = common::start_echo_upstream().await;
    let gateway = common::start_gateway(GatewayConfig::default(), upstream).await;

    let res = get(&gateway, "/%64ashboard", None).await;
    assert_eq!(res.status(), 307);
    assert_eq!(location(&res), "/auth/login");

    let res = get(&gateway, "/%64ashboard", Some("user")).await;
    assert_eq!(location(&res), "/about");

    // The upstream sees the page that was authorized, not the raw escape.
    let res = get(&gateway, "/%61bout?x=1", Some("user")).await;
    assert_eq!(res.status(), 200);
    assert_eq!(res.text().await.unwrap(), "/about?x=1 user");

    let res = get(&gateway, "/dashboard%2F", Some("admin")).await;
    assert_eq!(res.status(), 400);

    gateway.shutdown.trigger();
}

#[tokio::test]
async fn test_forged_trust_header_is_replaced() {
    let upstream = common::start_echo_upstream().await;
    let gateway = common::start_gateway(GatewayConfig::default(), upstream).await;

    let res = common::client()
        .get(format!("http://{}/random/unlisted", gateway.addr))
        .header("x-gate-trust", "admin")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);
    assert_eq!(res.text().await.unwrap(), "/random/unlisted anonymous");

    gateway.shutdown.trigger();
}

#[tokio::test]
async fn test_excluded_paths_skip_the_gate() {
    let upstream = common::start_echo_upstream().await;
    let gateway = common::start_gateway(GatewayConfig::default(), upstream).await;

    let res = get(&gateway, "/api/session", None).await;
    assert_eq!(res.status(), 200);
    // No gate context, so no trust header.
    assert_eq!(res.text().await.unwrap(), "/api/session -");

    gateway.shutdown.trigger();
}

#[tokio::test]
async fn test_request_id_is_returned() {
    let upstream = common::start_echo_upstream().await;
    let gateway = common::start_gateway(GatewayConfig::default(), upstream).await;

    let res = get(&gateway, "/dashboard", None).await;
    let id = res.headers()["x-request-id"].to_str().unwrap();
    assert!(uuid::Uuid::parse_str(id).is_ok());

    gateway.shutdown.trigger();
}

#[tokio::test]
async fn test_upstream_down_is_bad_gateway() {
    // Bind then drop to get a port nobody listens on.
    let closed = {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap()
    };
    let gateway = common::start_gateway(GatewayConfig::default(), closed).await;

    let res = get(&gateway, "/", None).await;
    assert_eq!(res.status(), 502);

    // Redirects never touch the upstream.
    let res = get(&gateway, "/dashboard", None).await;
    assert_eq!(res.status(), 307);

    gateway.shutdown.trigger();
}

#[tokio::test]
async fn test_config_update_swaps_route_table() {
    let upstream = common::start_echo_upstream().await;
    let gateway = common::start_gateway(GatewayConfig::default(), upstream).await;

    let res = get(&gateway, "/reports", None).await;
    assert_eq!(res.status(), 200);

    let mut config = GatewayConfig::default();
    config.upstream.address = upstream.to_string();
    config.routes.admin_only.push("/reports".into());
    gateway.updates.send(config).unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;

    let res = get(&gateway, "/reports", Some("user")).await;
    assert_eq!(res.status(), 307);
    assert_eq!(location(&res), "/about");

    // A broken update is rejected and the last good table stays live.
    let mut broken = GatewayConfig::default();
    broken.upstream.address = upstream.to_string();
    broken.routes.public.push("/:".into());
    gateway.updates.send(broken).unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;

    let res = get(&gateway, "/reports", Some("admin")).await;
    assert_eq!(res.status(), 200);

    gateway.shutdown.trigger();
}

#[tokio::test]
async fn test_shutdown_stops_listener() {
    let upstream = common::start_echo_upstream().await;
    let gateway = common::start_gateway(GatewayConfig::default(), upstream).await;

    gateway.shutdown.trigger();
    tokio::time::sleep(Duration::from_millis(200)).await;

    let res = common::client()
        .get(format!("http://{}/", gateway.addr))
        .timeout(Duration::from_secs(1))
        .send()
        .await;
    assert!(res.is_err());
}
