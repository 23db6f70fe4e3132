//! Command executors: one module per CLI subcommand, each mapping its
//! [`crate::cli`] args onto the `relaycopy-protocol` core and
//! reporting a [`relaycopy_protocol::error::TransferError`] the caller
//! turns into an exit code.

pub mod receive;
pub mod send;
