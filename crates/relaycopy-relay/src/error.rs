//! Relay-side error type.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RelayError {
    #[error("websocket error: {0}")]
    WebSocket(#[from] axum::Error),

    #[error("peer disconnected before pairing completed")]
    PeerGone,

    #[error("no hello frame arrived within the pairing window")]
    HelloTimeout,

    #[error("first frame was not a well-formed hello: {0}")]
    BadHello(String),
}
