//! The rendezvous table: pairs a sender and a receiver that present the
//! same code fingerprint, then gets out of the way.
//!
//! Grounded in the reference relay's `WAITING`/`LOCK` pair (a single
//! mutex-guarded map from code fingerprint to the first arrival). That
//! implementation lets the adopting (second-arrival) connection drive
//! both directions of forwarding directly against the waiter's raw
//! socket, while the waiter's own task does nothing but watch for its
//! socket to close. Rust's ownership rules mean a socket can't be
//! driven from two tasks at once, so the handoff here carries channel
//! endpoints instead of the raw connection: each connection owns its
//! socket for its entire lifetime, and pairing exchanges the sender
//! half of an mpsc channel that the *other* side's forwarding loop
//! writes into. The observable behavior is the same: exactly one pair
//! is formed per fingerprint, and a same-role second arrival is
//! rejected rather than silently queued.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use tokio::sync::{mpsc, oneshot};

use relaycopy_protocol::wire::channel::Frame;
use relaycopy_protocol::wire::messages::Role;

/// The inbound sender a waiting connection was registered with, handed
/// to whoever adopts it.
type InboundTx = mpsc::UnboundedSender<Frame>;

struct WaitingEntry {
    role: Role,
    ticket: u64,
    inbound_tx: InboundTx,
    notify: oneshot::Sender<InboundTx>,
    registered_at: std::time::Instant,
}

/// Outcome of attempting to join the table under a given code
/// fingerprint.
pub enum PairOutcome {
    /// An opposite-role peer was already waiting; forwarding can start
    /// immediately using `peer_tx`.
    Paired { peer_tx: InboundTx },
    /// No peer was waiting; registered as the new waiter. `paired_rx`
    /// resolves once an opposite-role peer adopts this entry.
    Waiting {
        ticket: u64,
        paired_rx: oneshot::Receiver<InboundTx>,
    },
    /// A peer with the same role is already waiting under this
    /// fingerprint; one sender and one receiver may share a code, never
    /// two of the same role.
    RoleCollision,
}

#[derive(Default)]
pub struct PairingTable {
    waiting: Mutex<HashMap<String, WaitingEntry>>,
    next_ticket: AtomicU64,
}

impl PairingTable {
    pub fn new() -> Self {
        Self {
            waiting: Mutex::new(HashMap::new()),
            next_ticket: AtomicU64::new(0),
        }
    }

    /// Attempt to pair under `code_hash_hex` as `role`, registering
    /// `inbound_tx` as the channel others should forward frames to us
    /// through if we end up waiting (or being adopted).
    pub fn pair(&self, code_hash_hex: &str, role: Role, inbound_tx: InboundTx) -> PairOutcome {
        let mut table = self.waiting.lock().unwrap();
        match table.remove(code_hash_hex) {
            Some(existing) if existing.role == role => {
                table.insert(code_hash_hex.to_string(), existing);
                PairOutcome::RoleCollision
            }
            Some(existing) => {
                // existing.notify may fail if the waiter already gave up
                // (timeout, disconnect); the caller sees that as ChannelClosed
                // the first time it tries to use the dead peer_tx.
                let _ = existing.notify.send(inbound_tx);
                PairOutcome::Paired {
                    peer_tx: existing.inbound_tx,
                }
            }
            None => {
                let ticket = self.next_ticket.fetch_add(1, Ordering::Relaxed);
                let (notify, paired_rx) = oneshot::channel();
                table.insert(
                    code_hash_hex.to_string(),
                    WaitingEntry {
                        role,
                        ticket,
                        inbound_tx,
                        notify,
                        registered_at: std::time::Instant::now(),
                    },
                );
                PairOutcome::Waiting { ticket, paired_rx }
            }
        }
    }

    /// Remove a waiter, but only if it is still the same registration
    /// (nobody has adopted it since). Called when a waiting connection
    /// closes or times out before a peer arrives.
    pub fn abandon(&self, code_hash_hex: &str, ticket: u64) {
        let mut table = self.waiting.lock().unwrap();
        if table.get(code_hash_hex).map(|e| e.ticket) == Some(ticket) {
            table.remove(code_hash_hex);
        }
    }

    /// Drop waiters older than `max_age`. A waiter's own connection
    /// handler also removes itself via `abandon` on close or pairing
    /// timeout; this is a backstop for a waiter whose peer never shows
    /// up and whose own socket never errors (e.g. a half-open TCP
    /// connection), so a single code fingerprint cannot pin memory
    /// forever.
    pub fn cleanup_stale(&self, max_age: std::time::Duration) -> usize {
        let mut table = self.waiting.lock().unwrap();
        let before = table.len();
        table.retain(|_, entry| entry.registered_at.elapsed() < max_age);
        before - table.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cleanup_stale_drops_old_waiters_but_keeps_fresh_ones() {
        let table = PairingTable::new();
        let (tx_old, _rx_old) = mpsc::unbounded_channel();
        table.pair("stale", Role::Sender, tx_old);

        std::thread::sleep(std::time::Duration::from_millis(20));

        let (tx_fresh, _rx_fresh) = mpsc::unbounded_channel();
        table.pair("fresh", Role::Sender, tx_fresh);

        let removed = table.cleanup_stale(std::time::Duration::from_millis(10));
        assert_eq!(removed, 1);

        let (tx_b, _rx_b) = mpsc::unbounded_channel();
        assert!(matches!(
            table.pair("fresh", Role::Receiver, tx_b),
            PairOutcome::Paired { .. }
        ));
        let (tx_c, _rx_c) = mpsc::unbounded_channel();
        assert!(matches!(
            table.pair("stale", Role::Receiver, tx_c),
            PairOutcome::Waiting { .. }
        ));
    }

    #[test]
    fn first_arrival_waits_second_arrival_pairs() {
        let table = PairingTable::new();
        let (tx_a, _rx_a) = mpsc::unbounded_channel();
        let outcome_a = table.pair("abcd", Role::Sender, tx_a);
        assert!(matches!(outcome_a, PairOutcome::Waiting { .. }));

        let (tx_b, _rx_b) = mpsc::unbounded_channel();
        let outcome_b = table.pair("abcd", Role::Receiver, tx_b);
        assert!(matches!(outcome_b, PairOutcome::Paired { .. }));
    }

    #[test]
    fn same_role_second_arrival_is_rejected() {
        let table = PairingTable::new();
        let (tx_a, _rx_a) = mpsc::unbounded_channel();
        table.pair("code", Role::Sender, tx_a);

        let (tx_b, _rx_b) = mpsc::unbounded_channel();
        let outcome = table.pair("code", Role::Sender, tx_b);
        assert!(matches!(outcome, PairOutcome::RoleCollision));
    }

    #[test]
    fn abandon_only_removes_the_matching_ticket() {
        let table = PairingTable::new();
        let (tx_a, _rx_a) = mpsc::unbounded_channel();
        let ticket = match table.pair("code", Role::Sender, tx_a) {
            PairOutcome::Waiting { ticket, .. } => ticket,
            _ => panic!("expected Waiting"),
        };

        // A stale abandon (e.g. a delayed timeout firing after the
        // entry was already adopted and replaced) must not evict the
        // newer registration.
        let (tx_b, _rx_b) = mpsc::unbounded_channel();
        table.abandon("code", ticket + 1);
        assert!(matches!(
            table.pair("code", Role::Receiver, tx_b),
            PairOutcome::Paired { .. }
        ));
    }

    #[tokio::test]
    async fn adopting_a_waiter_delivers_its_inbound_sender_through_the_oneshot() {
        let table = PairingTable::new();
        let (tx_a, _rx_a) = mpsc::unbounded_channel();
        let paired_rx = match table.pair("code", Role::Sender, tx_a) {
            PairOutcome::Waiting { paired_rx, .. } => paired_rx,
            _ => panic!("expected Waiting"),
        };

        let (tx_b, _rx_b) = mpsc::unbounded_channel();
        let peer_tx_for_b = match table.pair("code", Role::Receiver, tx_b) {
            PairOutcome::Paired { peer_tx } => peer_tx,
            _ => panic!("expected Paired"),
        };

        // `a` learns `b`'s inbound sender via the oneshot.
        let delivered = paired_rx.await.unwrap();
        assert!(delivered.send(Frame::Text("hi".into())).is_ok());
        // `b` already got `a`'s inbound sender directly.
        assert!(peer_tx_for_b.send(Frame::Text("hey".into())).is_ok());
    }
}
