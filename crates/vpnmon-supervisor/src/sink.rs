//! Output sinks for forwarded client output

use std::io::Write;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, warn};

/// Receives client output one line at a time, as soon as it is read
pub trait OutputSink: Send + 'static {
    fn line(&mut self, line: &str);
}

/// Writes each line to stdout and flushes immediately.
///
/// Write failures never stop the supervisor; the first one is logged and
/// later ones are dropped silently. Clones share that state.
#[derive(Debug, Clone, Default)]
pub struct StdoutSink {
    write_failed: Arc<AtomicBool>,
}

impl StdoutSink {
    fn write_to<W: Write>(&self, out: &mut W, line: &str) {
        let result = writeln!(out, "{line}").and_then(|()| out.flush());
        if let Err(e) = result {
            if !self.write_failed.swap(true, Ordering::Relaxed) {
                warn!("Cannot forward client output to stdout: {}", e);
            }
        }
    }
}

impl OutputSink for StdoutSink {
    fn line(&mut self, line: &str) {
        self.write_to(&mut std::io::stdout().lock(), line);
    }
}

impl OutputSink for UnboundedSender<String> {
    fn line(&mut self, line: &str) {
        if self.send(line.to_string()).is_err() {
            debug!("Output receiver closed, dropping line");
        }
    }
}
