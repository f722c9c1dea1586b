//! Tunnel errors
//!
//! Every failure the tunnel layer can report. Validation errors are raised
//! before any external effect; command errors carry the attempted command
//! line and its combined output verbatim.

use crate::spec::AddressFamily;
use ipnet::IpNet;

/// A spec field violated its constraint
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid {field}: {constraint}")]
pub struct ValidationError {
    /// Name of the offending field (`mode`, `mtu`, `ipv4`, `ipv6`, `name`)
    pub field: &'static str,
    /// Human-readable constraint that was violated
    pub constraint: String,
}

impl ValidationError {
    pub(crate) fn new(field: &'static str, constraint: impl Into<String>) -> Self {
        Self {
            field,
            constraint: constraint.into(),
        }
    }
}

/// An external backend call failed
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("cmd `{command}` error: {output}")]
pub struct CommandError {
    /// The command that was attempted
    pub command: String,
    /// Captured combined stdout/stderr
    pub output: String,
}

impl CommandError {
    /// Create a new command error
    pub fn new(command: impl Into<String>, output: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            output: output.into(),
        }
    }
}

/// Tunnel controller errors
#[derive(Debug, thiserror::Error)]
pub enum TunnelError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("tunnel {name} already exists, nothing to do")]
    AlreadyExists { name: String },

    #[error("add tunnel {name} failed: {output}")]
    CreationFailed { name: String, output: String },

    #[error("tunnel {name}: {family} address {address} overlaps with another interface")]
    Overlap {
        name: String,
        family: AddressFamily,
        address: IpNet,
    },

    #[error(transparent)]
    Command(#[from] CommandError),
}
