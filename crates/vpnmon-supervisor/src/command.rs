//! VPN client command line

use std::path::{Path, PathBuf};

/// Executable name of the vpn-ws client
pub const VPN_WS_CLIENT: &str = "vpn-ws-client";

/// An external command to keep running
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientCommand {
    pub program: PathBuf,
    pub args: Vec<String>,
}

impl ClientCommand {
    pub fn new(program: impl Into<PathBuf>, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// `vpn-ws-client --no-verify <device> <server-url>`
    pub fn vpn_ws(program: &Path, device: &str, server_url: &str) -> Self {
        Self::new(program, ["--no-verify", device, server_url])
    }
}

impl std::fmt::Display for ClientCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.program.display())?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}
