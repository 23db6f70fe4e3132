//! `relaycopy send`: build a manifest from the given paths, connect to
//! the relay, and run the sender pipeline.

use crate::cli::SendArgs;
use crate::channel::WsChannel;
use crate::progress_bar::CliProgress;
use relaycopy_protocol::error::TransferError;
use relaycopy_protocol::manifest;
use relaycopy_protocol::transfer::{send, SendOptions};

pub async fn execute(args: SendArgs, quiet: bool) -> Result<(), TransferError> {
    let entries = manifest::build(&args.files).map_err(TransferError::Io)?;
    if entries.is_empty() {
        return Err(TransferError::NoFiles);
    }

    tracing::info!(files = entries.len(), server = %args.server, "connecting to relay");
    let mut channel = WsChannel::connect(&args.server)
        .await
        .map_err(|e| TransferError::Io(std::io::Error::other(e.to_string())))?;

    let options = SendOptions {
        code: args.code,
        encrypt: args.encrypt,
        compress: args.compress.into(),
        resume: args.resume,
    };

    let mut progress = CliProgress::new(quiet);
    send(&mut channel, &options, &entries, Some(&mut progress)).await
}
