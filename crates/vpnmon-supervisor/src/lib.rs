//! vpnmon supervisor - keep a VPN client process alive
//!
//! Runs one external client command in a restart-forever loop on a
//! dedicated tokio task, forwarding its combined stdout/stderr line by line
//! to an [`OutputSink`] as soon as each line is read.
//!
//! # Usage
//!
//! ```rust,ignore
//! let command = ClientCommand::vpn_ws(&client_path, "tap0", "wss://vpn.example.net/vpn");
//! let handle = ProcessSupervisor::spawn(
//!     ProcessLauncher,
//!     command,
//!     StdoutSink::default(),
//!     SupervisorConfig::default(),
//! );
//!
//! // Runs until the process is killed
//! handle.join().await?;
//! ```

mod command;
mod error;
mod process;
mod runner;
mod sink;
mod supervisor;

pub use command::{ClientCommand, VPN_WS_CLIENT};
pub use error::SupervisorError;
pub use process::{RunState, SupervisedProcess};
pub use runner::{ProcessLauncher, ProcessRunner};
pub use sink::{OutputSink, StdoutSink};
pub use supervisor::{
    DEFAULT_RESTART_DELAY, IterationOutcome, ProcessSupervisor, SupervisorConfig, SupervisorEvent,
    SupervisorHandle,
};
