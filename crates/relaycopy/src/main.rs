//! relaycopy: send and receive files through a rendezvous relay using
//! a shared code.

#![forbid(unsafe_code)]

mod channel;
mod cli;
mod commands;
mod exit_codes;
mod logging;
mod progress_bar;

use clap::Parser;
use cli::{Cli, Commands};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    logging::init_logging(cli.verbose, cli.quiet);

    let result = match cli.command {
        Commands::Send(args) => commands::send::execute(args, cli.quiet).await,
        Commands::Receive(args) => commands::receive::execute(args, cli.quiet).await,
    };

    match result {
        Ok(()) => std::process::exit(exit_codes::SUCCESS),
        Err(e) => {
            tracing::error!("{e}");
            eprintln!("relaycopy: {e}");
            std::process::exit(e.exit_code());
        }
    }
}
