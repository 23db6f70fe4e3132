//! The WebSocket transport for the relay: one axum route that upgrades
//! to a [`WebSocket`], reads exactly one hello frame, and either pairs
//! the connection immediately or waits for an opposite-role peer.
//!
//! Grounded in `tallow-relay::websocket`'s shape (an axum `Router`
//! with a `/ws` route and a `/health` check, permissive CORS since the
//! relay is a pure forwarder and security comes from E2E encryption
//! rather than origin checks) but driving this spec's hello/pairing
//! protocol instead of tallow's room-join handshake, and forwarding
//! whole frames rather than bridging a length-prefixed wire format.

use axum::extract::ws::{CloseFrame, Message as WsMessage, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

use relaycopy_protocol::wire::channel::Frame;
use relaycopy_protocol::wire::messages::Message as ProtoMessage;

use crate::config::RelayConfig;
use crate::error::RelayError;
use crate::pairing::{PairOutcome, PairingTable};

/// Protocol-violation close code: malformed first frame, missing
/// fields, or an invalid role (§4.1).
const CLOSE_PROTOCOL_VIOLATION: u16 = 1002;
/// Try-again-later close code for a same-role pairing collision.
const CLOSE_TRY_AGAIN: u16 = 1013;
/// A connection that never sends its first frame is not worth holding
/// open indefinitely, mirroring `tallow-relay`'s WebSocket handshake
/// timeout around its own room-join read.
const HELLO_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(10);

/// Shared state handed to every connection handler.
pub struct RelayState {
    pub table: PairingTable,
    pub config: RelayConfig,
}

impl RelayState {
    pub fn new(config: RelayConfig) -> Arc<Self> {
        Arc::new(Self {
            table: PairingTable::new(),
            config,
        })
    }
}

/// Build the relay's axum [`Router`]: `/ws` for pairing and
/// forwarding, `/health` for liveness probes.
pub fn router(state: Arc<RelayState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/ws", get(ws_handler))
        .route("/health", get(|| async { "ok" }))
        .layer(cors)
        .with_state(state)
}

async fn ws_handler(ws: WebSocketUpgrade, State(state): State<Arc<RelayState>>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_connection(socket, state))
}

async fn handle_connection(socket: WebSocket, state: Arc<RelayState>) {
    let (mut sink, mut stream) = socket.split();

    let (code_hash_hex, role) = match read_hello(&mut stream).await {
        Ok(hello) => hello,
        Err(err) => {
            warn!(error = %err, "rejecting connection: bad hello");
            close_with(&mut sink, CLOSE_PROTOCOL_VIOLATION, &err.to_string()).await;
            return;
        }
    };

    let (inbound_tx, mut inbound_rx) = mpsc::unbounded_channel::<Frame>();

    let peer_tx = match state.table.pair(&code_hash_hex, role, inbound_tx) {
        PairOutcome::RoleCollision => {
            warn!(code_hash_hex, ?role, "rejecting same-role pairing collision");
            close_with(&mut sink, CLOSE_TRY_AGAIN, "a peer with this role is already waiting").await;
            return;
        }
        PairOutcome::Paired { peer_tx } => {
            info!(code_hash_hex, ?role, "paired immediately");
            peer_tx
        }
        PairOutcome::Waiting { ticket, paired_rx } => {
            info!(code_hash_hex, ?role, "waiting for an opposite-role peer");
            match wait_for_pairing(&mut stream, paired_rx, state.config.pairing_timeout()).await {
                WaitOutcome::Paired { peer_tx, buffered } => {
                    for frame in buffered {
                        if peer_tx.send(frame).is_err() {
                            return;
                        }
                    }
                    peer_tx
                }
                WaitOutcome::GaveUp => {
                    state.table.abandon(&code_hash_hex, ticket);
                    info!(code_hash_hex, ?role, "waiter closed or timed out before pairing");
                    return;
                }
            }
        }
    };

    info!(code_hash_hex, ?role, "forwarding frames");
    forward(sink, stream, inbound_rx.by_ref(), peer_tx).await;
}

/// Read the connection's first frame and parse it as a `hello`,
/// bounded by [`HELLO_TIMEOUT`].
async fn read_hello(
    stream: &mut futures_util::stream::SplitStream<WebSocket>,
) -> Result<(String, relaycopy_protocol::wire::messages::Role), RelayError> {
    let frame = tokio::time::timeout(HELLO_TIMEOUT, stream.next())
        .await
        .map_err(|_| RelayError::HelloTimeout)?
        .ok_or(RelayError::PeerGone)?
        .map_err(RelayError::WebSocket)?;

    let text = match frame {
        WsMessage::Text(text) => text.to_string(),
        WsMessage::Close(_) => return Err(RelayError::PeerGone),
        _ => return Err(RelayError::BadHello("first frame must be a text hello".into())),
    };

    match serde_json::from_str::<ProtoMessage>(&text) {
        Ok(ProtoMessage::Hello { code_hash_hex, role }) => {
            if code_hash_hex.len() != 64 || hex::decode(&code_hash_hex).is_err() {
                return Err(RelayError::BadHello(
                    "code_hash_hex must be 64 hex characters".into(),
                ));
            }
            Ok((code_hash_hex, role))
        }
        Ok(other) => Err(RelayError::BadHello(format!(
            "first frame must be hello, got {}",
            other.kind()
        ))),
        Err(e) => Err(RelayError::BadHello(format!("malformed hello: {e}"))),
    }
}

enum WaitOutcome {
    Paired {
        peer_tx: mpsc::UnboundedSender<Frame>,
        buffered: Vec<Frame>,
    },
    GaveUp,
}

/// While waiting to be adopted, buffer any frames the peer sends us
/// (e.g. the receiver's own `ready`, emitted right after its `hello`,
/// before the sender has necessarily arrived) so they are forwarded
/// in order the moment a peer appears.
async fn wait_for_pairing(
    stream: &mut futures_util::stream::SplitStream<WebSocket>,
    mut paired_rx: oneshot::Receiver<mpsc::UnboundedSender<Frame>>,
    timeout: Option<std::time::Duration>,
) -> WaitOutcome {
    let mut buffered = Vec::new();
    let deadline = timeout.map(|d| tokio::time::Instant::now() + d);

    loop {
        let next_frame = async {
            match deadline {
                Some(at) => tokio::time::timeout_at(at, stream.next()).await.ok().flatten(),
                None => stream.next().await,
            }
        };

        tokio::select! {
            biased;
            result = &mut paired_rx => {
                return match result {
                    Ok(peer_tx) => WaitOutcome::Paired { peer_tx, buffered },
                    Err(_) => WaitOutcome::GaveUp,
                };
            }
            frame = next_frame => {
                match frame {
                    Some(Ok(WsMessage::Text(text))) => buffered.push(Frame::Text(text.to_string())),
                    Some(Ok(WsMessage::Binary(bytes))) => buffered.push(Frame::Binary(bytes.to_vec())),
                    Some(Ok(_)) => {}
                    Some(Err(_)) | None => return WaitOutcome::GaveUp,
                }
            }
        }
    }
}

async fn close_with(
    sink: &mut futures_util::stream::SplitSink<WebSocket, WsMessage>,
    code: u16,
    reason: &str,
) {
    let _ = sink
        .send(WsMessage::Close(Some(CloseFrame {
            code,
            reason: reason.to_string().into(),
        })))
        .await;
}

/// Bridge frames in both directions once paired: this connection's
/// reads go to `peer_tx`; `inbound_rx` (frames the peer forwards to
/// us) are written to this connection's socket. Either direction
/// closing or erroring tears down both.
async fn forward(
    mut sink: futures_util::stream::SplitSink<WebSocket, WsMessage>,
    mut stream: futures_util::stream::SplitStream<WebSocket>,
    inbound_rx: &mut mpsc::UnboundedReceiver<Frame>,
    peer_tx: mpsc::UnboundedSender<Frame>,
) {
    loop {
        tokio::select! {
            incoming = stream.next() => {
                match incoming {
                    Some(Ok(WsMessage::Text(text))) => {
                        if peer_tx.send(Frame::Text(text.to_string())).is_err() {
                            return;
                        }
                    }
                    Some(Ok(WsMessage::Binary(bytes))) => {
                        if peer_tx.send(Frame::Binary(bytes.to_vec())).is_err() {
                            return;
                        }
                    }
                    Some(Ok(WsMessage::Close(_))) | None => return,
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        warn!(error = %e, "read error, closing both sides");
                        return;
                    }
                }
            }
            outgoing = inbound_rx.recv() => {
                match outgoing {
                    Some(Frame::Text(text)) => {
                        if sink.send(WsMessage::Text(text.into())).await.is_err() {
                            return;
                        }
                    }
                    Some(Frame::Binary(bytes)) => {
                        if sink.send(WsMessage::Binary(bytes.into())).await.is_err() {
                            return;
                        }
                    }
                    None => return,
                }
            }
        }
    }
}
