//! Renders a [`TransferProgress`] stream as an `indicatif` progress
//! bar, the way `tallow`'s CLI output layer wraps its own transfer
//! progress type (`output::progress::TransferProgressBar`) -- except
//! this one actually drives indicatif instead of leaving it as a
//! "would use indicatif" stub.

use indicatif::{ProgressBar, ProgressStyle};
use relaycopy_protocol::transfer::{ProgressSink, TransferProgress};

pub struct CliProgress {
    bar: ProgressBar,
}

impl CliProgress {
    pub fn new(quiet: bool) -> Self {
        let bar = if quiet {
            ProgressBar::hidden()
        } else {
            ProgressBar::new(0)
        };
        bar.set_style(
            ProgressStyle::with_template(
                "{spinner:.green} {msg} [{bar:30.cyan/blue}] {bytes}/{total_bytes} ({eta})",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-"),
        );
        Self { bar }
    }
}

impl ProgressSink for CliProgress {
    fn on_progress(&mut self, progress: &TransferProgress) {
        if self.bar.length() != Some(progress.total_bytes) {
            self.bar.set_length(progress.total_bytes);
        }
        self.bar.set_position(progress.bytes_transferred);
        if let Some(file) = &progress.current_file {
            self.bar.set_message(file.clone());
        }
        if progress.done {
            self.bar.finish_with_message("done");
        }
    }
}
