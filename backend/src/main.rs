use std::env;
use std::time::Duration;

use axum::extract::ws::{Message as WsMessage, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use futures_util::{SinkExt, StreamExt};
use tokio::time::interval;
use tracing::{debug, info, warn};

use data_feed::{default_universe, SyntheticConfig, SyntheticFeed, TickShape};

const BIND_ADDR_ENV: &str = "BIND_ADDR";
const FEED_INTERVAL_ENV: &str = "FEED_INTERVAL_MS";

#[derive(Clone)]
struct ServerState {
    push_interval: Duration,
}

#[derive(Debug, serde::Deserialize, Clone)]
struct WsParams {
    shape: Option<String>,
}

fn parse_shape(value: Option<&str>) -> TickShape {
    match value.map(|v| v.to_ascii_lowercase()) {
        Some(v) if v == "ohlc" || v == "candle" => TickShape::Ohlc,
        _ => TickShape::Value,
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let bind_addr =
        env::var(BIND_ADDR_ENV).unwrap_or_else(|_| "0.0.0.0:4000".to_string());
    let push_interval = env::var(FEED_INTERVAL_ENV)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .map(Duration::from_millis)
        .unwrap_or(Duration::from_secs(2));

    let state = ServerState { push_interval };

    let app = Router::new()
        .route("/api/ws", get(ws_handler))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .expect("bind feed address");
    info!(addr = %bind_addr, interval_ms = push_interval.as_millis() as u64, "feed server listening");
    axum::serve(listener, app).await.expect("server failed");
}

async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<ServerState>,
    Query(params): Query<WsParams>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_ws(socket, state, params))
}

async fn handle_ws(stream: WebSocket, state: ServerState, params: WsParams) {
    let (mut sender, mut receiver) = stream.split();

    // Per-connection generator so every client gets its own independent walk.
    let mut feed = SyntheticFeed::new(
        default_universe(),
        SyntheticConfig {
            shape: parse_shape(params.shape.as_deref()),
            ..SyntheticConfig::default()
        },
    );

    let mut timer = interval(state.push_interval);
    info!("client connected");

    loop {
        tokio::select! {
            _ = timer.tick() => {
                let batch = feed.next_batch();
                let text = match serde_json::to_string(&batch) {
                    Ok(text) => text,
                    Err(err) => {
                        warn!(%err, "batch serialization failed");
                        continue;
                    }
                };
                if sender.send(WsMessage::Text(text)).await.is_err() {
                    break;
                }
                debug!(points = batch.len(), "batch pushed");
            }
            msg = receiver.next() => {
                match msg {
                    // Inbound payloads are ignored; the feed is push-only.
                    Some(Ok(_)) => {}
                    Some(Err(_)) | None => break,
                }
            }
        }
    }
    info!("client disconnected");
}
