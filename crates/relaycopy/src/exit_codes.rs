//! Exit code constants. The failure codes themselves (2 usage, 3
//! handshake/peer, 4 protocol/integrity) live on
//! `relaycopy_protocol::error::TransferError::exit_code`, which is
//! canonical; this only names the success case `main` checks for.

pub const SUCCESS: i32 = 0;
