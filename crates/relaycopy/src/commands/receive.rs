//! `relaycopy receive`: connect to the relay and run the receiver
//! pipeline against the given output directory.

use crate::cli::ReceiveArgs;
use crate::channel::WsChannel;
use crate::progress_bar::CliProgress;
use relaycopy_protocol::error::TransferError;
use relaycopy_protocol::transfer::{receive, ReceiveOptions};

pub async fn execute(args: ReceiveArgs, quiet: bool) -> Result<(), TransferError> {
    std::fs::create_dir_all(&args.out).map_err(TransferError::Io)?;

    tracing::info!(server = %args.server, out = %args.out.display(), "connecting to relay");
    let mut channel = WsChannel::connect(&args.server)
        .await
        .map_err(|e| TransferError::Io(std::io::Error::other(e.to_string())))?;

    let options = ReceiveOptions {
        code: args.code,
        encrypt: args.encrypt,
        out: args.out,
        resume: !args.no_resume,
    };

    let mut progress = CliProgress::new(quiet);
    receive(&mut channel, &options, Some(&mut progress)).await
}
