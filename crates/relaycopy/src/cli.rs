//! CLI argument parsing.
//!
//! Trimmed from `tallow::cli::{SendArgs, ReceiveArgs}`'s flag shapes to
//! the fields this protocol's core actually consumes: no `--proxy`,
//! `--discover`, `--throttle`, `--text`, or the other features those
//! flags name, since they are out of scope here.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "relaycopy")]
#[command(author, version, about = "Send files through a rendezvous relay using a shared code", long_about = None)]
pub struct Cli {
    /// Verbose output (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Send files or directories to a waiting receiver
    Send(SendArgs),

    /// Receive files or directories from a waiting sender
    Receive(ReceiveArgs),
}

#[derive(Args)]
pub struct SendArgs {
    /// Files or directories to send
    #[arg(required = true)]
    pub files: Vec<PathBuf>,

    /// Relay server WebSocket URL (also reads RELAYCOPY_SERVER env var)
    #[arg(long, env = "RELAYCOPY_SERVER")]
    pub server: String,

    /// Shared code both sides use to find each other (also reads
    /// RELAYCOPY_CODE env var)
    #[arg(long, env = "RELAYCOPY_CODE")]
    pub code: String,

    /// Encrypt the manifest, file headers, and file contents with a
    /// code-derived key
    #[arg(long)]
    pub encrypt: bool,

    /// Compression mode: auto (probe first chunk), on, or off
    #[arg(long, default_value = "auto")]
    pub compress: CompressArg,

    /// Ask the receiver to disclose what it already has and resume
    /// matching prefixes instead of retransmitting whole files
    #[arg(long)]
    pub resume: bool,
}

#[derive(Args)]
pub struct ReceiveArgs {
    /// Relay server WebSocket URL (also reads RELAYCOPY_SERVER env var)
    #[arg(long, env = "RELAYCOPY_SERVER")]
    pub server: String,

    /// Shared code both sides use to find each other (also reads
    /// RELAYCOPY_CODE env var)
    #[arg(long, env = "RELAYCOPY_CODE")]
    pub code: String,

    /// Decrypt the manifest, file headers, and file contents with a
    /// code-derived key (must match the sender's `--encrypt`)
    #[arg(long)]
    pub encrypt: bool,

    /// Directory to write received files into
    #[arg(long, default_value = ".")]
    pub out: PathBuf,

    /// Do not disclose locally-present files for resume, even if the
    /// sender requests it
    #[arg(long)]
    pub no_resume: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum CompressArg {
    Auto,
    On,
    Off,
}

impl From<CompressArg> for relaycopy_protocol::compression::CompressMode {
    fn from(value: CompressArg) -> Self {
        match value {
            CompressArg::Auto => Self::Auto,
            CompressArg::On => Self::On,
            CompressArg::Off => Self::Off,
        }
    }
}
