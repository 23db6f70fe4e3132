//! The sender and receiver state machines: the ~80% of the system
//! that is not the relay.

pub mod crypto_session;
pub mod progress;
pub mod receive;
pub mod send;

use std::time::Duration;

/// 1 MiB, the fixed chunk size for reading from disk (§6).
pub const CHUNK_SIZE: usize = 1024 * 1024;

/// Timeout for the `ready` handshake and the resume-manifest wait (§5).
pub const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(30);

pub use progress::{ProgressSink, TransferProgress};
pub use receive::{receive, ReceiveOptions};
pub use send::{send, SendOptions};
