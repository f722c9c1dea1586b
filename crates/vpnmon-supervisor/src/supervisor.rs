//! Process Supervisor
//!
//! Keeps one client command running for the lifetime of the program.
//!
//! # Lifecycle
//!
//! ```text
//! Idle ──▶ Running ──▶ Exited ──(restart delay)──▶ Idle ──▶ Running ──▶ ...
//! ```
//!
//! Every exit, clean or not, leads to a relaunch after a fixed delay. Any
//! error (or panic) raised while launching or running the command is
//! logged and turned into "wait and retry"; nothing escapes the loop. The
//! delay bounds the restart rate of a client that crashes on startup.
//! Panic containment relies on unwinding, so the binary must not be built
//! with `panic = "abort"`.
//!
//! Each iteration is reported on the handle's event channel so callers can
//! observe individual restarts.

use crate::command::ClientCommand;
use crate::error::SupervisorError;
use crate::process::RunState;
use crate::runner::ProcessRunner;
use crate::sink::OutputSink;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Default pause between an exit and the next launch
pub const DEFAULT_RESTART_DELAY: Duration = Duration::from_secs(1);

/// Supervisor configuration
#[derive(Debug, Clone)]
pub struct SupervisorConfig {
    /// Pause between an exit and the next launch
    pub restart_delay: Duration,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            restart_delay: DEFAULT_RESTART_DELAY,
        }
    }
}

/// How one iteration ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IterationOutcome {
    /// The process ran and exited (code is `None` if killed by a signal)
    Exited { code: Option<i32> },
    /// Launching or running the process failed
    Failed { error: String },
}

/// Lifecycle notifications
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SupervisorEvent {
    Started { iteration: u64 },
    IterationComplete { iteration: u64, outcome: IterationOutcome },
    Stopped,
}

/// Spawns the supervision loop
pub struct ProcessSupervisor;

impl ProcessSupervisor {
    /// Start supervising `command` on the current tokio runtime.
    ///
    /// The loop runs until [`SupervisorHandle::shutdown`] is called;
    /// dropping the handle does not stop it.
    pub fn spawn<R, S>(
        runner: R,
        command: ClientCommand,
        sink: S,
        config: SupervisorConfig,
    ) -> SupervisorHandle
    where
        R: ProcessRunner,
        S: OutputSink + Clone,
    {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let (state_tx, state_rx) = watch::channel(RunState::Idle);

        let task = tokio::spawn(run_loop(
            Arc::new(runner),
            command,
            sink,
            config,
            events_tx,
            state_tx,
            shutdown_rx,
        ));

        SupervisorHandle {
            task,
            events: events_rx,
            shutdown: shutdown_tx,
            state: state_rx,
        }
    }
}

/// Handle to a running supervisor
pub struct SupervisorHandle {
    task: JoinHandle<()>,
    events: mpsc::UnboundedReceiver<SupervisorEvent>,
    shutdown: watch::Sender<bool>,
    state: watch::Receiver<RunState>,
}

impl SupervisorHandle {
    /// Next lifecycle event, or `None` once the loop has ended
    pub async fn next_event(&mut self) -> Option<SupervisorEvent> {
        self.events.recv().await
    }

    /// Current run state of the supervised command
    pub fn state(&self) -> RunState {
        *self.state.borrow()
    }

    /// Ask the loop to stop; a running process is killed
    pub fn shutdown(&self) {
        self.shutdown.send_replace(true);
    }

    /// Wait for the loop to end
    pub async fn join(self) -> Result<(), SupervisorError> {
        let SupervisorHandle { task, shutdown, .. } = self;
        let result = task.await;
        drop(shutdown);
        result.map_err(|e| SupervisorError::Task(e.to_string()))
    }
}

/// Resolves once shutdown is requested; never resolves if the handle is gone
async fn shutdown_requested(rx: &mut watch::Receiver<bool>) {
    loop {
        if *rx.borrow_and_update() {
            return;
        }
        if rx.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

async fn run_loop<R, S>(
    runner: Arc<R>,
    command: ClientCommand,
    sink: S,
    config: SupervisorConfig,
    events: mpsc::UnboundedSender<SupervisorEvent>,
    state: watch::Sender<RunState>,
    mut shutdown: watch::Receiver<bool>,
) where
    R: ProcessRunner,
    S: OutputSink + Clone,
{
    let mut iteration: u64 = 0;

    loop {
        iteration += 1;
        info!("Launching `{}` (run {})", command, iteration);
        state.send_replace(RunState::Running);
        let _ = events.send(SupervisorEvent::Started { iteration });

        // Own task per run so a panic is contained to the iteration
        let mut run = tokio::spawn({
            let runner = Arc::clone(&runner);
            let command = command.clone();
            let mut sink = sink.clone();
            async move { runner.run(&command, &mut sink).await }
        });

        let joined = tokio::select! {
            joined = &mut run => joined,
            _ = shutdown_requested(&mut shutdown) => {
                run.abort();
                break;
            }
        };

        let outcome = match joined {
            Ok(Ok(code)) => {
                warn!("`{}` exited (code {:?}), restarting", command, code);
                IterationOutcome::Exited { code }
            }
            Ok(Err(e)) => {
                error!("{}", e);
                IterationOutcome::Failed { error: e.to_string() }
            }
            Err(e) => {
                let e = SupervisorError::Panicked(e.to_string());
                error!("{}", e);
                IterationOutcome::Failed { error: e.to_string() }
            }
        };

        state.send_replace(RunState::Exited);
        let _ = events.send(SupervisorEvent::IterationComplete { iteration, outcome });

        tokio::select! {
            _ = tokio::time::sleep(config.restart_delay) => {}
            _ = shutdown_requested(&mut shutdown) => break,
        }
        state.send_replace(RunState::Idle);
    }

    debug!("Supervisor for `{}` stopped", command);
    state.send_replace(RunState::Idle);
    let _ = events.send(SupervisorEvent::Stopped);
}
