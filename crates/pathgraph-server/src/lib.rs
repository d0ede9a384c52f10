//! PathGraph WebSocket Server
//!
//! Holds the authoritative graph. Clients send binary protobuf commands on
//! `/ws`; the server assigns node ids, applies the command and broadcasts
//! the resulting mutations to every connected client, sender included.
//! Path requests are answered to the requester only.
//!
//! A client receives the whole graph as `NodeAdded`/`ConnectionAdded`
//! messages right after connecting.

pub mod config;
pub mod graph;
pub mod pathfinding;

use std::sync::Arc;
use std::time::Instant;

use axum::{
    Router,
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::IntoResponse,
    routing::get,
};
use bytes::Bytes;
use dashmap::DashMap;
use futures_util::{SinkExt, StreamExt};
use pathgraph_core::protocol::{ServerMessage, decode_client_message, encode_server_message};
use thiserror::Error;
use tokio::sync::{Mutex, broadcast};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{debug, info, warn};
use uuid::Uuid;

pub use config::{ConfigError, ServerConfig};
pub use graph::{Outcome, ServerGraph};

#[derive(Debug, Error)]
pub enum ServerError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Shared application state
pub struct AppState {
    graph: Mutex<ServerGraph>,
    /// Encoded mutations fanned out to every session
    tx: broadcast::Sender<Bytes>,
    /// Connected peers and when they connected
    peers: DashMap<Uuid, Instant>,
}

impl AppState {
    pub fn new(channel_capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(channel_capacity);
        Self {
            graph: Mutex::new(ServerGraph::new()),
            tx,
            peers: DashMap::new(),
        }
    }

    pub fn peer_count(&self) -> usize {
        self.peers.len()
    }

    /// Subscribe to mutations and take a snapshot as one step, so that no
    /// mutation is missed or seen twice.
    async fn join(&self) -> (broadcast::Receiver<Bytes>, Vec<ServerMessage>) {
        let graph = self.graph.lock().await;
        (self.tx.subscribe(), graph.snapshot())
    }

    /// Apply one inbound frame. Returns a reply for the sender, if any.
    pub async fn handle_frame(&self, peer_id: Uuid, frame: &[u8]) -> Option<Bytes> {
        let msg = match decode_client_message(frame) {
            Ok(Some(msg)) => msg,
            Ok(None) => {
                debug!("Empty command from {}", peer_id);
                return None;
            }
            Err(e) => {
                warn!("Malformed frame from {} ({} bytes): {}", peer_id, frame.len(), e);
                return None;
            }
        };
        debug!("Peer {} sent {:?}", peer_id, msg);

        // Broadcast under the lock so every session sees mutations in apply order
        let mut graph = self.graph.lock().await;
        match graph.apply(msg) {
            Outcome::Broadcast(msgs) => {
                for msg in &msgs {
                    // Fails only when nobody is subscribed
                    let _ = self.tx.send(encode(msg));
                }
                None
            }
            Outcome::Reply(msg) => Some(encode(&msg)),
            Outcome::Ignored => None,
        }
    }
}

fn encode(msg: &ServerMessage) -> Bytes {
    Bytes::from(encode_server_message(msg))
}

/// Build the HTTP router.
pub fn app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/ws", get(ws_handler))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Bind and serve until the process is stopped.
pub async fn serve(config: ServerConfig) -> Result<(), ServerError> {
    let state = Arc::new(AppState::new(config.channel_capacity));
    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    info!("PathGraph server listening on {}", config.addr);
    info!("WebSocket endpoint: ws://{}/ws", config.addr);

    axum::serve(listener, app(state)).await?;
    Ok(())
}

/// Index page
async fn index(State(state): State<Arc<AppState>>) -> String {
    let nodes = state.graph.lock().await.node_count();
    format!(
        "PathGraph Server - {} nodes, {} peers - Connect via WebSocket at /ws",
        nodes,
        state.peer_count()
    )
}

/// Health check
async fn health() -> &'static str {
    "ok"
}

/// WebSocket upgrade handler
async fn ws_handler(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Handle a WebSocket connection
async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let peer_id = Uuid::new_v4();
    state.peers.insert(peer_id, Instant::now());
    info!("New connection: {} ({} connected)", peer_id, state.peer_count());

    run_session(socket, &state, peer_id).await;

    // Cleanup on disconnect
    if let Some((_, connected_at)) = state.peers.remove(&peer_id) {
        info!(
            "Connection closed: {} after {:.1}s",
            peer_id,
            connected_at.elapsed().as_secs_f64()
        );
    }
}

async fn run_session(socket: WebSocket, state: &AppState, peer_id: Uuid) {
    let (mut sender, mut receiver) = socket.split();
    let (mut rx, snapshot) = state.join().await;

    debug!("Sending {} snapshot messages to {}", snapshot.len(), peer_id);
    for msg in &snapshot {
        if sender.send(Message::Binary(encode(msg))).await.is_err() {
            return;
        }
    }

    loop {
        tokio::select! {
            // Handle incoming messages from client
            msg = receiver.next() => {
                match msg {
                    Some(Ok(Message::Binary(data))) => {
                        if let Some(reply) = state.handle_frame(peer_id, &data).await {
                            if sender.send(Message::Binary(reply)).await.is_err() {
                                break;
                            }
                        }
                    }
                    Some(Ok(Message::Text(text))) => {
                        warn!("Ignoring text frame from {} ({} bytes)", peer_id, text.as_str().len());
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        break;
                    }
                    Some(Ok(_)) => {} // Ignore ping/pong
                    Some(Err(e)) => {
                        warn!("WebSocket error for {}: {}", peer_id, e);
                        break;
                    }
                }
            }

            // Forward mutations from other sessions and our own
            frame = rx.recv() => {
                match frame {
                    Ok(frame) => {
                        if sender.send(Message::Binary(frame)).await.is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        // The client's mirror is now stale; it resyncs on reconnect
                        warn!("Peer {} fell {} messages behind, closing", peer_id, skipped);
                        break;
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        }
    }
}
