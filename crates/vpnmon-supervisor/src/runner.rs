//! Process runner seam
//!
//! The supervisor delegates each iteration to a [`ProcessRunner`]. The
//! production runner spawns a real process; tests substitute runners that
//! return immediately.

use crate::command::ClientCommand;
use crate::error::SupervisorError;
use crate::process::SupervisedProcess;
use crate::sink::OutputSink;
use std::future::Future;
use tracing::{debug, info};

/// Runs a command once to completion
pub trait ProcessRunner: Send + Sync + 'static {
    /// Run `command`, forwarding its output to `sink` line by line, and
    /// resolve with the exit code once it has exited
    fn run<S: OutputSink>(
        &self,
        command: &ClientCommand,
        sink: &mut S,
    ) -> impl Future<Output = Result<Option<i32>, SupervisorError>> + Send;
}

/// Runs the command as a real child process
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessLauncher;

impl ProcessRunner for ProcessLauncher {
    fn run<S: OutputSink>(
        &self,
        command: &ClientCommand,
        sink: &mut S,
    ) -> impl Future<Output = Result<Option<i32>, SupervisorError>> + Send {
        async move {
            let mut process = SupervisedProcess::spawn(command)?;
            info!("Started `{}` (pid {:?})", command, process.id());

            while let Some(line) = process.next_line().await? {
                sink.line(&line);
            }

            let status = process.wait().await?;
            debug!("`{}` exited with {}", command, status);
            Ok(status.code())
        }
    }
}
