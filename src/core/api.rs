//! HTTP + WebSocket + UDP service for HoopSense
//!
//! Endpoints:
//! - GET /health - Health check
//! - GET /stats - Phase, tally, and buffer counters
//! - GET /shots - Every shot since start or reset
//! - POST /batch - Feed a JSON array of raw samples
//! - POST /flush - Classify samples held back by the merge
//! - POST /reset - Start a new session
//! - WS /ws - Live shot feed
//!
//! Sensor packets arriving on the UDP socket feed the same classifier and,
//! when a session log is open, are recorded in the replay CSV format.

use axum::{
    extract::{State, WebSocketUpgrade, ws::{Message, WebSocket}},
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use chrono::{DateTime, Utc};
use futures_util::{SinkExt, StreamExt};
use serde::Serialize;
use std::io::Write;
use std::sync::Arc;
use tokio::net::UdpSocket;
use tokio::sync::{broadcast, RwLock};
use tracing::{debug, info, warn};

use crate::core::{Packet, SessionLog, ShotClassifier};
use crate::types::{ClassifierPhase, RawSample, ShotEvent, ShotTally};

/// Largest datagram the receiver accepts
const MAX_DATAGRAM: usize = 2048;

/// Shot as seen by service clients
#[derive(Debug, Clone, Copy, Serialize)]
pub struct ShotRecord {
    /// Wall-clock time the shot was published, after its batch was processed
    pub received_at: DateTime<Utc>,
    #[serde(flatten)]
    pub event: ShotEvent,
}

/// App state
pub struct AppState {
    pub classifier: RwLock<ShotClassifier>,
    pub shots: RwLock<Vec<ShotRecord>>,
    pub update_tx: broadcast::Sender<ShotRecord>,
    pub started_at: DateTime<Utc>,
}

impl AppState {
    pub fn new(classifier: ShotClassifier) -> Arc<Self> {
        let (update_tx, _) = broadcast::channel(100);
        Arc::new(Self {
            classifier: RwLock::new(classifier),
            shots: RwLock::new(Vec::new()),
            update_tx,
            started_at: Utc::now(),
        })
    }

    /// Feed one batch; completed shots are stored and broadcast
    pub async fn ingest(&self, batch: &[RawSample]) -> Result<Ingested, String> {
        let (events, dropped, phase) = {
            let mut classifier = self.classifier.write().await;
            let before = classifier.dropped_sentinels();
            let events = classifier.process_batch(batch).map_err(|e| e.to_string())?;
            let dropped = (classifier.dropped_sentinels() - before) as usize;
            (events, dropped, classifier.phase())
        };
        Ok(Ingested {
            accepted: batch.len() - dropped,
            dropped_sentinels: dropped,
            shots: self.publish(events).await,
            phase,
        })
    }

    /// Release everything the merge is holding back
    pub async fn flush(&self) -> Result<(Vec<ShotRecord>, ClassifierPhase), String> {
        let (events, phase) = {
            let mut classifier = self.classifier.write().await;
            let events = classifier.flush().map_err(|e| e.to_string())?;
            (events, classifier.phase())
        };
        Ok((self.publish(events).await, phase))
    }

    async fn publish(&self, events: Vec<ShotEvent>) -> Vec<ShotRecord> {
        if events.is_empty() {
            return Vec::new();
        }
        let received_at = Utc::now();
        let records: Vec<ShotRecord> = events
            .into_iter()
            .map(|event| ShotRecord { received_at, event })
            .collect();

        let mut shots = self.shots.write().await;
        for record in &records {
            shots.push(*record);
            // No subscribers is fine
            let _ = self.update_tx.send(*record);
        }
        records
    }
}

/// Result of feeding one batch
#[derive(Debug, Clone)]
pub struct Ingested {
    /// Samples buffered for classification
    pub accepted: usize,
    pub dropped_sentinels: usize,
    pub shots: Vec<ShotRecord>,
    pub phase: ClassifierPhase,
}

/// Health response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub started_at: DateTime<Utc>,
    pub basket_policy: String,
}

/// Stats response
#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub phase: ClassifierPhase,
    pub tally: ShotTally,
    pub samples_processed: u64,
    pub pending_samples: usize,
    pub dropped_sentinels: u64,
}

/// Batch response
#[derive(Debug, Serialize)]
pub struct BatchResponse {
    /// Samples in the request
    pub received: usize,
    /// Samples buffered for classification (sentinels excluded)
    pub accepted: usize,
    pub dropped_sentinels: usize,
    pub shots: Vec<ShotRecord>,
    pub phase: ClassifierPhase,
}

/// Flush response
#[derive(Debug, Serialize)]
pub struct FlushResponse {
    pub shots: Vec<ShotRecord>,
    pub phase: ClassifierPhase,
}

/// Error body for rejected requests
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Create the API router around a fresh classifier
pub fn create_router(classifier: ShotClassifier) -> Router {
    router(AppState::new(classifier))
}

/// Create the API router over existing state
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/stats", get(stats))
        .route("/shots", get(shots))
        .route("/batch", post(batch))
        .route("/flush", post(flush))
        .route("/reset", post(reset))
        .route("/ws", get(websocket_handler))
        .with_state(state)
}

/// Health check endpoint
async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let classifier = state.classifier.read().await;
    Json(HealthResponse {
        status: "ok".to_string(),
        version: crate::VERSION.to_string(),
        started_at: state.started_at,
        basket_policy: classifier.policy_name().to_string(),
    })
}

async fn stats(State(state): State<Arc<AppState>>) -> Json<StatsResponse> {
    let classifier = state.classifier.read().await;
    Json(StatsResponse {
        phase: classifier.phase(),
        tally: classifier.tally(),
        samples_processed: classifier.samples_processed(),
        pending_samples: classifier.pending_samples(),
        dropped_sentinels: classifier.dropped_sentinels(),
    })
}

async fn shots(State(state): State<Arc<AppState>>) -> Json<Vec<ShotRecord>> {
    Json(state.shots.read().await.clone())
}

/// Feed samples posted as JSON
async fn batch(
    State(state): State<Arc<AppState>>,
    Json(samples): Json<Vec<RawSample>>,
) -> Result<Json<BatchResponse>, (StatusCode, Json<ErrorResponse>)> {
    let ingested = state.ingest(&samples).await.map_err(|error| {
        warn!(%error, "batch rejected");
        (StatusCode::UNPROCESSABLE_ENTITY, Json(ErrorResponse { error }))
    })?;

    Ok(Json(BatchResponse {
        received: samples.len(),
        accepted: ingested.accepted,
        dropped_sentinels: ingested.dropped_sentinels,
        shots: ingested.shots,
        phase: ingested.phase,
    }))
}

async fn flush(
    State(state): State<Arc<AppState>>,
) -> Result<Json<FlushResponse>, (StatusCode, Json<ErrorResponse>)> {
    let (shots, phase) = state.flush().await.map_err(|error| {
        warn!(%error, "flush failed");
        (StatusCode::INTERNAL_SERVER_ERROR, Json(ErrorResponse { error }))
    })?;
    Ok(Json(FlushResponse { shots, phase }))
}

async fn reset(State(state): State<Arc<AppState>>) -> StatusCode {
    state.classifier.write().await.reset();
    state.shots.write().await.clear();
    info!("session reset");
    StatusCode::NO_CONTENT
}

/// WebSocket handler for live shots
async fn websocket_handler(
    State(state): State<Arc<AppState>>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    let rx = state.update_tx.subscribe();
    ws.on_upgrade(move |socket| handle_websocket(socket, rx))
}

/// Forward shots until either side goes away
async fn handle_websocket(socket: WebSocket, mut rx: broadcast::Receiver<ShotRecord>) {
    let (mut sender, mut receiver) = socket.split();

    let mut send_task = tokio::spawn(async move {
        loop {
            let record = match rx.recv().await {
                Ok(record) => record,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "websocket client lagging");
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => break,
            };
            let Some(frame) = shot_frame(&record) else {
                continue;
            };
            if sender.send(frame).await.is_err() {
                break;
            }
        }
    });

    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(message)) = receiver.next().await {
            if matches!(message, Message::Close(_)) {
                break;
            }
        }
    });

    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }
    debug!("websocket client disconnected");
}

/// JSON text frame for one shot; `None` (logged) if it cannot be encoded
fn shot_frame(record: &ShotRecord) -> Option<Message> {
    match serde_json::to_string(record) {
        Ok(json) => Some(Message::Text(json)),
        Err(e) => {
            warn!(error = %e, "cannot encode shot for websocket");
            None
        }
    }
}

/// Receive sensor packets until the socket fails, recording each decoded
/// packet to `log` before it is classified
pub async fn run_udp_listener<W: Write>(
    socket: UdpSocket,
    state: Arc<AppState>,
    mut log: Option<SessionLog<W>>,
) -> std::io::Result<()> {
    let mut buf = [0u8; MAX_DATAGRAM];
    loop {
        let (len, peer) = socket.recv_from(&mut buf).await?;
        let packet = match Packet::decode(&buf[..len]) {
            Ok(packet) => packet,
            Err(e) => {
                warn!(%peer, error = %e, "dropping malformed packet");
                continue;
            }
        };
        if let Some(log) = log.as_mut() {
            if let Err(e) = log.record(&packet.rows()) {
                warn!(error = %e, "session log write failed");
            }
        }
        match state.ingest(&packet.samples()).await {
            Ok(ingested) => {
                for record in ingested.shots {
                    info!(shot = %record.event.to_parseable_string(), "shot from sensor");
                }
            }
            Err(error) => warn!(%peer, %error, "packet rejected"),
        }
    }
}

/// Run the API server, plus the UDP receiver when `udp_addr` is given.
/// `log_path` records received packets in the replay CSV format.
pub async fn run_server(
    addr: &str,
    udp_addr: Option<&str>,
    log_path: Option<&str>,
    classifier: ShotClassifier,
) -> Result<(), Box<dyn std::error::Error>> {
    let state = AppState::new(classifier);

    match udp_addr {
        Some(udp_addr) => {
            let socket = UdpSocket::bind(udp_addr).await?;
            info!(addr = %udp_addr, "listening for sensor packets");
            let log = log_path.map(|path| SessionLog::create(path)).transpose()?;
            if let Some(path) = log_path {
                info!(%path, "recording session log");
            }
            let udp_state = Arc::clone(&state);
            tokio::spawn(async move {
                if let Err(e) = run_udp_listener(socket, udp_state, log).await {
                    warn!(error = %e, "sensor receiver stopped");
                }
            });
        }
        None if log_path.is_some() => warn!("--log needs --udp-addr; nothing will be recorded"),
        None => {}
    }

    let listener = tokio::net::TcpListener::bind(addr).await?;
    println!("🏀 HoopSense API running on {}", addr);
    println!("  GET  /health - Health check");
    println!("  GET  /stats  - Phase and tally");
    println!("  GET  /shots  - Shot history");
    println!("  POST /batch  - Feed raw samples");
    println!("  POST /flush  - Release held samples");
    println!("  POST /reset  - New session");
    println!("  WS   /ws     - Live shots");
    axum::serve(listener, router(state)).await?;
    Ok(())
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::BasketType;

    #[tokio::test]
    async fn test_ingest_counts_exclude_sentinels() {
        let state = AppState::new(ShotClassifier::default());
        let ingested = state
            .ingest(&[
                RawSample::accel(1.0, 6.0),
                RawSample::distance(1.05, 0xFFFF, 0.0),
                RawSample::distance(1.1, 0xFFFE, 0.0),
                RawSample::distance(1.2, 200, 1500.0),
            ])
            .await
            .unwrap();

        assert_eq!(ingested.accepted, 2);
        assert_eq!(ingested.dropped_sentinels, 2);
        assert_eq!(ingested.phase, ClassifierPhase::ImpactDetected);
    }

    #[tokio::test]
    async fn test_shot_stamped_after_processing() {
        let state = AppState::new(ShotClassifier::default());
        state.ingest(&[RawSample::distance(3.0, 150, 1100.0)]).await.unwrap();

        let before = Utc::now();
        let (shots, phase) = state.flush().await.unwrap();
        assert_eq!(phase, ClassifierPhase::Blackout);
        assert_eq!(shots.len(), 1);
        assert!(shots[0].received_at >= before);
        assert_eq!(state.shots.read().await.len(), 1);
    }

    #[test]
    fn test_shot_frame_is_flat_json() {
        let record = ShotRecord {
            received_at: Utc::now(),
            event: ShotEvent::make(Some(2.0), 2.1, BasketType::Bank, 0.95),
        };
        let Some(Message::Text(json)) = shot_frame(&record) else {
            panic!("expected a text frame");
        };
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["classification"], "MAKE");
        assert_eq!(value["basket_time"], 2.1);
        assert!(value["received_at"].is_string());
    }
}
