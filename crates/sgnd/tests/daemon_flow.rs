//! End-to-end scenarios against the assembled `axum::Router`, exercised
//! with `tower::ServiceExt::oneshot` (spec §8).

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use clap::Parser;
use serde_json::{json, Value};
use tower::ServiceExt;

use sgnd::config::Config;
use sgnd::http;
use sgnd::state::{self, AppState};

async fn test_state(data_dir: &std::path::Path) -> state::SharedState {
    let config = Config::try_parse_from([
        "sgnd",
        "--data-dir",
        data_dir.to_str().unwrap(),
    ])
    .unwrap();
    AppState::open(config).await.unwrap()
}

fn unsigned_ku(title: &str) -> Value {
    json!({
        "type": "ku.patch.migration",
        "schema_id": "ku.v1",
        "content_type": "application/json",
        "payload": {"title": title, "severity": "high"},
        "parents": [],
        "sources": [],
        "tests": [],
        "provenance": {},
        "tags": ["db"],
    })
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn publish_then_fetch_round_trips() {
    let dir = tempfile::tempdir().unwrap();
    let state = test_state(dir.path()).await;
    let app = http::router(state);

    let req = Request::builder()
        .method("POST")
        .uri("/publish")
        .header("content-type", "application/json")
        .body(Body::from(json!({"ku": unsigned_ku("fix a")}).to_string()))
        .unwrap();
    let resp = app.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert_eq!(body["stored"], true);
    assert_eq!(body["enqueued"], true);
    let cid = body["cid"].as_str().unwrap().to_string();

    let req = Request::builder()
        .uri(format!("/ku/{cid}"))
        .body(Body::empty())
        .unwrap();
    let resp = app.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let ku = body_json(resp).await;
    assert_eq!(ku["payload"]["title"], "fix a");
}

#[tokio::test]
async fn duplicate_publish_is_not_reenqueued() {
    let dir = tempfile::tempdir().unwrap();
    let state = test_state(dir.path()).await;
    let app = http::router(state);

    let ku = unsigned_ku("dedup me");
    for expected_enqueued in [true, false] {
        let req = Request::builder()
            .method("POST")
            .uri("/publish")
            .header("content-type", "application/json")
            .body(Body::from(json!({"ku": ku.clone()}).to_string()))
            .unwrap();
        let resp = app.clone().oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body = body_json(resp).await;
        assert_eq!(body["stored"], true);
        assert_eq!(body["enqueued"], expected_enqueued);
    }
}

#[tokio::test]
async fn unknown_cid_is_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let state = test_state(dir.path()).await;
    let app = http::router(state);

    let req = Request::builder()
        .uri("/ku/cid-blake3:does-not-exist")
        .body(Body::empty())
        .unwrap();
    let resp = app.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn edge_insert_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let state = test_state(dir.path()).await;
    let app = http::router(state);

    let body = json!({"src": "cid-a", "dst": "cid-b", "type": "verifies"});
    let first = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/edges")
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    let first = body_json(first).await;
    assert_eq!(first["inserted"], true);

    let second = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/edges")
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    let second = body_json(second).await;
    assert_eq!(second["inserted"], false);
}

#[tokio::test]
async fn live_and_health_report_ok() {
    let dir = tempfile::tempdir().unwrap();
    let state = test_state(dir.path()).await;
    let app = http::router(state);

    let resp = app
        .clone()
        .oneshot(Request::builder().uri("/live").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    let resp = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn enforce_mode_rejects_untrusted_signed_publish() {
    use sgn_core::{canonical_bytes, Ku};
    use sgn_crypto::{sign_ku, KeyPair};

    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("trust.json"),
        json!({"mode": "enforce", "allow": []}).to_string(),
    )
    .unwrap();
    let state = test_state(dir.path()).await;
    let app = http::router(state);

    let keypair = KeyPair::generate();
    let mut ku: Ku = serde_json::from_value(unsigned_ku("needs trust")).unwrap();
    ku.provenance.agent_pubkey = Some(keypair.public_key_pem().unwrap());
    let _ = canonical_bytes(&ku).unwrap();
    let signed = sign_ku(&ku, &keypair).unwrap();

    let req = Request::builder()
        .method("POST")
        .uri("/publish")
        .header("content-type", "application/json")
        .body(Body::from(json!({"ku": signed, "verify": true}).to_string()))
        .unwrap();
    let resp = app.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    let body = body_json(resp).await;
    assert_eq!(body["error"], "untrusted_key");
}
