//! Relay server configuration.

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::time::Duration;

/// Relay server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayConfig {
    /// Address the HTTP/WebSocket listener binds to.
    pub bind_addr: SocketAddr,
    /// A waiting peer is evicted if no opposite-role peer arrives
    /// within this many seconds. Zero disables the deadline.
    #[serde(default = "default_pairing_timeout_secs")]
    pub pairing_timeout_secs: u64,
}

fn default_pairing_timeout_secs() -> u64 {
    120
}

impl RelayConfig {
    pub fn pairing_timeout(&self) -> Option<Duration> {
        if self.pairing_timeout_secs == 0 {
            None
        } else {
            Some(Duration::from_secs(self.pairing_timeout_secs))
        }
    }
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:4455".parse().unwrap(),
            pairing_timeout_secs: default_pairing_timeout_secs(),
        }
    }
}
