//! Router tests: requests go through the full layer stack via `oneshot`

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    body::{self, Body},
    extract::ConnectInfo,
    http::{header, HeaderValue, Request, StatusCode},
    response::Response,
    Router,
};
use formtrap_core::{ClientId, FormTrap, ManualClock, TrapConfig};
use tower::ServiceExt;

use crate::{config::Config, create_router, AppState};

const VISITOR: [u8; 4] = [192, 0, 2, 10];
const REMOTE: [u8; 4] = [203, 0, 113, 9];
const LOOPBACK: [u8; 4] = [127, 0, 0, 1];
const MULTIPART_BOUNDARY: &str = "formtrap-boundary";
const MULTIPART_TYPE: &str = "multipart/form-data; boundary=formtrap-boundary";

fn setup(trap: TrapConfig) -> (Arc<ManualClock>, AppState, Router) {
    let clock = Arc::new(ManualClock::starting_now());
    let engine = FormTrap::with_clock(trap.clone(), clock.clone()).unwrap();
    let state = AppState {
        trap: Arc::new(engine),
        config: Config { port: 0, trust_forwarded: false, trap },
    };
    let router = create_router(state.clone());
    (clock, state, router)
}

fn get(path: &str, peer: [u8; 4]) -> Request<Body> {
    let mut req = Request::builder().uri(path).body(Body::empty()).unwrap();
    req.extensions_mut().insert(ConnectInfo(SocketAddr::from((peer, 40000))));
    req
}

fn post_form(path: &str, form: &str, peer: [u8; 4]) -> Request<Body> {
    let mut req = Request::builder()
        .method("POST")
        .uri(path)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(form.to_string()))
        .unwrap();
    req.extensions_mut().insert(ConnectInfo(SocketAddr::from((peer, 40000))));
    req
}

fn post(path: &str, content_type: &str, body: String, peer: [u8; 4]) -> Request<Body> {
    let mut req = Request::builder()
        .method("POST")
        .uri(path)
        .header(header::CONTENT_TYPE, content_type)
        .body(Body::from(body))
        .unwrap();
    req.extensions_mut().insert(ConnectInfo(SocketAddr::from((peer, 40000))));
    req
}

fn multipart(fields: &[(&str, &str)]) -> String {
    let mut body = String::new();
    for (name, value) in fields {
        body.push_str(&format!(
            "--{MULTIPART_BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
        ));
    }
    body.push_str(&format!("--{MULTIPART_BOUNDARY}--\r\n"));
    body
}

async fn send(router: &Router, req: Request<Body>) -> Response {
    router.clone().oneshot(req).await.unwrap()
}

async fn text(resp: Response) -> String {
    let bytes = body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

fn token_from(html: &str) -> String {
    let marker = r#"name="_hp_token" value=""#;
    let start = html.find(marker).expect("token field rendered") + marker.len();
    let end = html[start..].find('"').unwrap();
    html[start..start + end].to_string()
}

#[tokio::test]
async fn test_human_submission_reaches_handler() {
    let (clock, state, router) = setup(TrapConfig::default());

    let page = text(send(&router, get("/", VISITOR)).await).await;
    let token = token_from(&page);

    clock.advance_secs(2.0);
    let resp = send(
        &router,
        post_form("/", &format!("name=Ada&message=hello&_hp_token={}", token), VISITOR),
    )
    .await;

    assert_eq!(resp.status(), StatusCode::OK);
    assert!(text(resp).await.contains("Thanks, Ada"));
    assert!(state.trap.incidents().is_empty());
}

#[tokio::test]
async fn test_bot_submission_is_denied_and_banned() {
    let (_clock, state, router) = setup(TrapConfig {
        ban_ip: true,
        ..Default::default()
    });

    let resp = send(&router, post_form("/", "name=spam&message=buy", REMOTE)).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    assert_eq!(state.trap.incidents().len(), 1);

    let resp = send(&router, get("/", REMOTE)).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    assert!(text(resp).await.contains("Access denied"));
}

#[tokio::test]
async fn test_filled_decoy_is_denied() {
    let (clock, state, router) = setup(TrapConfig::default());
    let decoy = state.trap.registry().decoys()[0].name.clone();

    let token = token_from(&text(send(&router, get("/", VISITOR)).await).await);
    clock.advance_secs(3.0);

    let body = format!("name=x&_hp_token={}&{}=filled", token, decoy);
    let resp = send(&router, post_form("/", &body, VISITOR)).await;

    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    assert!(!state.trap.bans().is_banned(&ClientId::from("192.0.2.10")));
}

#[tokio::test]
async fn test_denied_submission_redirects_when_configured() {
    let (_clock, _state, router) = setup(TrapConfig {
        redirect_on_trigger: true,
        redirect_to: "/thanks".to_string(),
        ..Default::default()
    });

    let resp = send(&router, post_form("/", "hp_field=gotcha", REMOTE)).await;

    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(resp.headers()[header::LOCATION], "/thanks");
}

#[tokio::test]
async fn test_multipart_decoy_is_denied() {
    let (clock, state, router) = setup(TrapConfig::default());
    let decoy = state.trap.registry().decoys()[0].name.clone();

    let token = token_from(&text(send(&router, get("/", VISITOR)).await).await);
    clock.advance_secs(3.0);

    let body = multipart(&[("name", "x"), ("_hp_token", token.as_str()), (decoy.as_str(), "filled")]);
    let resp = send(&router, post("/", MULTIPART_TYPE, body, VISITOR)).await;

    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    assert_eq!(state.trap.incidents().len(), 1);
}

#[tokio::test]
async fn test_multipart_human_submission_passes_gate() {
    let (clock, state, router) = setup(TrapConfig::default());

    let token = token_from(&text(send(&router, get("/", VISITOR)).await).await);
    clock.advance_secs(3.0);

    let body = multipart(&[("name", "Ada"), ("_hp_token", token.as_str())]);
    let resp = send(&router, post("/", MULTIPART_TYPE, body, VISITOR)).await;

    // The demo handler only takes urlencoded forms, but the gate let it through.
    assert_ne!(resp.status(), StatusCode::FORBIDDEN);
    assert!(state.trap.incidents().is_empty());
}

#[tokio::test]
async fn test_other_post_bodies_fail_closed() {
    let (_clock, state, router) = setup(TrapConfig {
        ban_ip: true,
        ..Default::default()
    });

    let resp = send(&router, post("/", "application/json", r#"{"name":"spam"}"#.to_string(), REMOTE)).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    assert_eq!(state.trap.incidents().len(), 1);
    assert!(state.trap.bans().is_banned(&ClientId::from("203.0.113.9")));

    let resp = send(&router, post("/", "text/plain", "hp_field=x".to_string(), VISITOR)).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    assert_eq!(state.trap.incidents().len(), 2);
}

#[tokio::test]
async fn test_oversized_form_is_rejected() {
    let (_clock, _state, router) = setup(TrapConfig::default());
    let body = format!("message={}", "a".repeat(70 * 1024));

    let resp = send(&router, post_form("/", &body, VISITOR)).await;
    assert_eq!(resp.status(), StatusCode::PAYLOAD_TOO_LARGE);
}

#[tokio::test]
async fn test_admin_page_bypasses_ban_for_loopback() {
    let (_clock, state, router) = setup(TrapConfig {
        enable_admin: true,
        ..Default::default()
    });
    state.trap.manual_ban(ClientId::from("127.0.0.1"));

    let resp = send(&router, get("/honeypot/admin", LOOPBACK)).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let html = text(resp).await;
    assert!(html.contains("Active bans (1)"));
    assert!(html.contains(r#"name="unban_ip" value="127.0.0.1""#));

    // Outside the admin surface the ban still applies.
    let resp = send(&router, get("/", LOOPBACK)).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_admin_refused_for_remote_and_when_disabled() {
    let (_clock, _state, router) = setup(TrapConfig {
        enable_admin: true,
        ..Default::default()
    });
    let resp = send(&router, get("/honeypot/admin", REMOTE)).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let (_clock, _state, router) = setup(TrapConfig::default());
    let resp = send(&router, get("/honeypot/admin", LOOPBACK)).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_admin_unban_and_manual_ban() {
    let (_clock, state, router) = setup(TrapConfig {
        enable_admin: true,
        ..Default::default()
    });
    let target = ClientId::from("198.51.100.7");

    let resp = send(&router, post_form("/honeypot/admin", "manual_ban_ip=198.51.100.7", LOOPBACK)).await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(resp.headers()[header::LOCATION], "/honeypot/admin");
    assert!(state.trap.bans().is_banned(&target));

    let resp = send(&router, post_form("/honeypot/admin", "unban_ip=198.51.100.7", LOOPBACK)).await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert!(!state.trap.bans().is_banned(&target));

    let resp = send(&router, post_form("/honeypot/admin", "manual_ban_ip=nonsense", LOOPBACK)).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_admin_post_from_foreign_origin_is_refused() {
    let (_clock, state, router) = setup(TrapConfig {
        enable_admin: true,
        ..Default::default()
    });
    let target = ClientId::from("198.51.100.7");

    let mut req = post_form("/honeypot/admin", "manual_ban_ip=198.51.100.7", LOOPBACK);
    req.headers_mut().insert("sec-fetch-site", HeaderValue::from_static("cross-site"));
    assert_eq!(send(&router, req).await.status(), StatusCode::FORBIDDEN);

    let mut req = post_form("/honeypot/admin", "manual_ban_ip=198.51.100.7", LOOPBACK);
    req.headers_mut().insert(header::ORIGIN, HeaderValue::from_static("https://evil.example"));
    req.headers_mut().insert(header::HOST, HeaderValue::from_static("127.0.0.1:8080"));
    assert_eq!(send(&router, req).await.status(), StatusCode::FORBIDDEN);
    assert!(!state.trap.bans().is_banned(&target));

    let mut req = post_form("/honeypot/admin", "manual_ban_ip=198.51.100.7", LOOPBACK);
    req.headers_mut().insert(header::ORIGIN, HeaderValue::from_static("http://127.0.0.1:8080"));
    req.headers_mut().insert(header::HOST, HeaderValue::from_static("127.0.0.1:8080"));
    req.headers_mut().insert("sec-fetch-site", HeaderValue::from_static("same-origin"));
    assert_eq!(send(&router, req).await.status(), StatusCode::SEE_OTHER);
    assert!(state.trap.bans().is_banned(&target));
}

#[tokio::test]
async fn test_export_downloads_history() {
    let (_clock, _state, router) = setup(TrapConfig {
        enable_admin: true,
        ..Default::default()
    });
    send(&router, post_form("/", "name=a", REMOTE)).await;
    send(&router, post_form("/", "name=b", VISITOR)).await;

    let resp = send(&router, get("/honeypot/export", LOOPBACK)).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        resp.headers()[header::CONTENT_DISPOSITION],
        "attachment; filename=\"honeypot_ban_history.csv\""
    );

    let csv = text(resp).await;
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(lines[0], "Timestamp,IP,Path,Reason");
    assert_eq!(lines.len(), 3);
    assert!(lines[1].contains("203.0.113.9,/,suspiciously fast submit"));
    assert!(lines[2].contains("192.0.2.10,/,suspiciously fast submit"));
}

#[tokio::test]
async fn test_health() {
    let (_clock, _state, router) = setup(TrapConfig::default());

    let resp = send(&router, get("/health", VISITOR)).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let json: serde_json::Value = serde_json::from_str(&text(resp).await).unwrap();
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["engine"]["active_bans"], 0);
}
