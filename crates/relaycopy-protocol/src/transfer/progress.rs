//! Transfer progress tracking: purely observational, never consulted
//! by the protocol state machines themselves.
//!
//! Grounded in `tallow-protocol::transfer::progress`'s
//! `TransferProgress`, trimmed to the fields `relaycopy`'s CLI actually
//! renders (no speed/ETA smoothing here; `indicatif` computes that from
//! raw byte counts on its own).

/// A snapshot of an in-flight send or receive session, handed to
/// whatever callback the CLI registered.
#[derive(Debug, Clone)]
pub struct TransferProgress {
    /// Path of the file currently streaming, if any.
    pub current_file: Option<String>,
    /// Bytes transferred so far across the whole session.
    pub bytes_transferred: u64,
    /// Total bytes the session expects to move, summed from the
    /// manifest sizes (post-resume-skip is not subtracted: a skipped
    /// file simply never advances `bytes_transferred` for its range).
    pub total_bytes: u64,
    /// Set once the final `eof` has been exchanged.
    pub done: bool,
}

impl TransferProgress {
    pub fn new(total_bytes: u64) -> Self {
        Self {
            current_file: None,
            bytes_transferred: 0,
            total_bytes,
            done: false,
        }
    }

    fn start_file(&mut self, path: &str) {
        self.current_file = Some(path.to_string());
    }

    fn set_total(&mut self, total_bytes: u64) {
        self.total_bytes = total_bytes;
    }

    fn add_bytes(&mut self, n: u64) {
        self.bytes_transferred += n;
    }

    fn finish(&mut self) {
        self.current_file = None;
        self.done = true;
    }
}

/// A callback invoked after every chunk and at start/end of each file.
/// `Option<&mut dyn ProgressSink>` is threaded through `send`/`receive`
/// rather than a generic type parameter so `Channel` trait objects and
/// this hook compose the same way.
pub trait ProgressSink {
    fn on_progress(&mut self, progress: &TransferProgress);
}

impl<F: FnMut(&TransferProgress)> ProgressSink for F {
    fn on_progress(&mut self, progress: &TransferProgress) {
        self(progress)
    }
}

/// Internal driver owned by `send`/`receive`: tracks state and forwards
/// to an optional sink, so call sites don't need to construct a
/// `TransferProgress` by hand at every update site.
pub(crate) struct ProgressDriver<'a> {
    state: TransferProgress,
    sink: Option<&'a mut dyn ProgressSink>,
}

impl<'a> ProgressDriver<'a> {
    pub(crate) fn new(total_bytes: u64, sink: Option<&'a mut dyn ProgressSink>) -> Self {
        Self {
            state: TransferProgress::new(total_bytes),
            sink,
        }
    }

    pub(crate) fn start_file(&mut self, path: &str) {
        self.state.start_file(path);
        self.notify();
    }

    pub(crate) fn set_total(&mut self, total_bytes: u64) {
        self.state.set_total(total_bytes);
        self.notify();
    }

    pub(crate) fn add_bytes(&mut self, n: u64) {
        self.state.add_bytes(n);
        self.notify();
    }

    pub(crate) fn finish(&mut self) {
        self.state.finish();
        self.notify();
    }

    fn notify(&mut self) {
        if let Some(sink) = self.sink.as_deref_mut() {
            sink.on_progress(&self.state);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn driver_forwards_updates_to_the_registered_sink() {
        let mut seen = Vec::new();
        {
            let mut sink = |p: &TransferProgress| seen.push((p.bytes_transferred, p.done));
            let mut driver = ProgressDriver::new(100, Some(&mut sink));
            driver.start_file("a.txt");
            driver.add_bytes(40);
            driver.add_bytes(60);
            driver.finish();
        }
        assert_eq!(seen, vec![(0, false), (40, false), (100, false), (100, true)]);
    }

    #[test]
    fn driver_with_no_sink_does_not_panic() {
        let mut driver = ProgressDriver::new(10, None);
        driver.start_file("a.txt");
        driver.add_bytes(10);
        driver.finish();
    }
}
