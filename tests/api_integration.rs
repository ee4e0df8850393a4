//! Integration tests for the HTTP API
//!
//! Routes share one classifier; each test builds its own router.

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use std::sync::Arc;
use std::time::Duration;

use hoopsense::core::{
    create_router, encode_packet, run_udp_listener, AppState, CsvReplay, SessionLog, ShotClassifier,
};
use serde_json::Value;
use tokio::net::UdpSocket;
use tower::ServiceExt;

fn create_test_router() -> Router {
    create_router(ShotClassifier::default())
}

async fn get_json(app: &Router, uri: &str) -> (StatusCode, Value) {
    let response = app
        .clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&body).unwrap_or(Value::Null))
}

async fn post_json(app: &Router, uri: &str, body: &str) -> (StatusCode, Value) {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&body).unwrap_or(Value::Null))
}

#[tokio::test]
async fn test_health_endpoint() {
    let app = create_test_router();
    let (status, json) = get_json(&app, "/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
    assert_eq!(json["basket_policy"], "impact");
    assert!(json["version"].is_string());
}

#[tokio::test]
async fn test_batch_produces_shot() {
    let app = create_test_router();
    let (status, json) = post_json(
        &app,
        "/batch",
        r#"[
            {"sensor": "ACCEL", "timestamp": 10.0, "magnitude": 6.2},
            {"sensor": "DISTANCE", "timestamp": 10.05, "distance_mm": 65534, "signal_rate": 0.0},
            {"sensor": "DISTANCE", "timestamp": 10.1, "distance_mm": 200, "signal_rate": 1500.0},
            {"sensor": "ACCEL", "timestamp": 10.2, "magnitude": 1.0}
        ]"#,
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["received"], 4);
    assert_eq!(json["accepted"], 3);
    assert_eq!(json["dropped_sentinels"], 1);
    assert_eq!(json["phase"], "BLACKOUT");
    assert_eq!(json["shots"][0]["classification"], "MAKE");
    assert_eq!(json["shots"][0]["basket_type"], "BANK");
    assert!(json["shots"][0]["received_at"].is_string());

    let (_, shots) = get_json(&app, "/shots").await;
    assert_eq!(shots.as_array().map(Vec::len), Some(1));

    let (_, stats) = get_json(&app, "/stats").await;
    assert_eq!(stats["tally"]["makes"], 1);
    assert_eq!(stats["samples_processed"], 2);
}

#[tokio::test]
async fn test_flush_releases_held_samples() {
    let app = create_test_router();
    let (_, json) = post_json(
        &app,
        "/batch",
        r#"[{"sensor": "DISTANCE", "timestamp": 25.0, "distance_mm": 150, "signal_rate": 1100.0}]"#,
    )
    .await;
    assert_eq!(json["shots"], Value::Array(vec![]));

    let (status, json) = post_json(&app, "/flush", "").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["phase"], "BLACKOUT");
    assert_eq!(json["shots"][0]["basket_type"], "SWISH");

    let (_, stats) = get_json(&app, "/stats").await;
    assert_eq!(stats["pending_samples"], 0);
}

#[tokio::test]
async fn test_out_of_order_batch_rejected() {
    let app = create_test_router();
    post_json(&app, "/batch", r#"[{"sensor": "ACCEL", "timestamp": 5.0, "magnitude": 1.0}]"#).await;

    let (status, json) = post_json(
        &app,
        "/batch",
        r#"[{"sensor": "ACCEL", "timestamp": 4.0, "magnitude": 1.0}]"#,
    )
    .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(json["error"].as_str().unwrap().contains("out of order"));
}

#[tokio::test]
async fn test_reset_clears_session() {
    let app = create_test_router();
    post_json(
        &app,
        "/batch",
        r#"[{"sensor": "DISTANCE", "timestamp": 25.0, "distance_mm": 150, "signal_rate": 1100.0}]"#,
    )
    .await;

    let response = app
        .clone()
        .oneshot(Request::builder().method("POST").uri("/reset").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let (_, stats) = get_json(&app, "/stats").await;
    assert_eq!(stats["phase"], "IDLE");
    assert_eq!(stats["tally"]["total"], 0);
    let (_, shots) = get_json(&app, "/shots").await;
    assert_eq!(shots, Value::Array(vec![]));
}

#[tokio::test]
async fn test_udp_packets_are_logged_and_classified() {
    let file = tempfile::NamedTempFile::new().unwrap();
    let log = SessionLog::create(file.path()).unwrap();
    let state = AppState::new(ShotClassifier::default());

    let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let target = socket.local_addr().unwrap();
    tokio::spawn(run_udp_listener(socket, Arc::clone(&state), Some(log)));

    let sender = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let packets = [
        encode_packet(
            2_040,
            &[(40, [12288, 0, 0, 0, 0, 0]), (20, [0, 0, 2048, 0, 0, 0]), (0, [0, 0, 2048, 0, 0, 0])],
            &[(30, 0xFFFE, 0), (0, 700, 300)],
        ),
        vec![0, 1],
        encode_packet(2_200, &[(0, [0, 0, 2048, 0, 0, 0])], &[(100, 210, 1450)]),
    ];
    for packet in &packets {
        sender.send_to(packet, target).await.unwrap();
    }

    for _ in 0..200 {
        if !state.shots.read().await.is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    let shots = state.shots.read().await.clone();
    assert_eq!(shots.len(), 1);
    assert_eq!(shots[0].event.basket_time(), Some(2.1));

    // The malformed datagram is neither logged nor classified
    let replay = CsvReplay::from_path(file.path()).unwrap();
    assert_eq!(replay.rows().len(), 4);
    let mut classifier = ShotClassifier::default();
    let summary = replay.run(&mut classifier, |_| {});
    assert_eq!(summary.events, vec![shots[0].event]);
}
