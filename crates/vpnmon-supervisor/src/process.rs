//! Supervised client process
//!
//! One running instance of the client. Output is exposed as a lazy stream
//! of lines multiplexed from the child's stdout and stderr; the stream can
//! be consumed once and ends when both pipes are closed. Bytes that are not
//! valid UTF-8 are replaced, never treated as a read failure.

use crate::command::ClientCommand;
use crate::error::SupervisorError;
use std::process::{ExitStatus, Stdio};
use tokio::io::{AsyncBufReadExt, BufReader, Split};
use tokio::process::{Child, ChildStderr, ChildStdout, Command};

/// Run state of a client process
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    /// No process; waiting to (re)launch
    Idle,
    /// Process is running
    Running,
    /// Process has exited
    Exited,
}

impl RunState {
    pub fn is_running(&self) -> bool {
        matches!(self, RunState::Running)
    }
}

/// A spawned client with its combined output stream
pub struct SupervisedProcess {
    child: Child,
    stdout: Option<Split<BufReader<ChildStdout>>>,
    stderr: Option<Split<BufReader<ChildStderr>>>,
    state: RunState,
}

impl SupervisedProcess {
    /// Launch `command` with piped output. The child is killed if this
    /// value is dropped before it exits.
    pub fn spawn(command: &ClientCommand) -> Result<Self, SupervisorError> {
        let mut child = Command::new(&command.program)
            .args(&command.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| SupervisorError::Spawn {
                command: command.to_string(),
                source,
            })?;

        let stdout = child.stdout.take().map(|s| BufReader::new(s).split(b'\n'));
        let stderr = child.stderr.take().map(|s| BufReader::new(s).split(b'\n'));

        Ok(Self {
            child,
            stdout,
            stderr,
            state: RunState::Running,
        })
    }

    pub fn id(&self) -> Option<u32> {
        self.child.id()
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    /// Next line from either stdout or stderr, whichever is ready first.
    ///
    /// Returns `None` once both streams reach end of file.
    pub async fn next_line(&mut self) -> Result<Option<String>, SupervisorError> {
        loop {
            let (from_stdout, line) = match (self.stdout.as_mut(), self.stderr.as_mut()) {
                (None, None) => return Ok(None),
                (Some(out), None) => (true, out.next_segment().await?),
                (None, Some(err)) => (false, err.next_segment().await?),
                (Some(out), Some(err)) => tokio::select! {
                    line = out.next_segment() => (true, line?),
                    line = err.next_segment() => (false, line?),
                },
            };

            match line {
                Some(line) => return Ok(Some(decode_line(&line))),
                None if from_stdout => self.stdout = None,
                None => self.stderr = None,
            }
        }
    }

    /// Wait for the process to exit
    pub async fn wait(&mut self) -> Result<ExitStatus, SupervisorError> {
        let status = self.child.wait().await?;
        self.state = RunState::Exited;
        Ok(status)
    }
}

fn decode_line(raw: &[u8]) -> String {
    let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
    String::from_utf8_lossy(raw).into_owned()
}
