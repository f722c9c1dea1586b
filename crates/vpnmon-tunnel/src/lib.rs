//! vpnmon tunnel - tun/tap interface lifecycle
//!
//! Creates and destroys a virtual network interface, sets its MTU and
//! assigns addresses to it without colliding with addresses already in use
//! on the host.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐    ┌──────────────────┐    ┌─────────────────────────┐
//! │ TunnelSpec  │───▶│ TunnelController │───▶│ NetworkInterfaceBackend │
//! │ (validated) │    │  create/add/     │    │  IpCommandBackend (ip)  │
//! └─────────────┘    │  destroy         │    │  MemoryBackend (tests)  │
//!                    └────────┬─────────┘    └────────────▲────────────┘
//!                             │                           │
//!                             ▼                           │
//!                    ┌────────────────────────┐           │
//!                    │ AddressOverlapChecker  │───────────┘
//!                    └────────────────────────┘
//! ```
//!
//! All backend calls are blocking and the controller is meant to be driven
//! from a single thread.

mod backend;
mod controller;
mod error;
mod ip_command;
mod memory;
mod overlap;
mod spec;

pub use backend::NetworkInterfaceBackend;
pub use controller::TunnelController;
pub use error::{CommandError, TunnelError, ValidationError};
pub use ip_command::{IpCommandBackend, parse_addresses, parse_link_names};
pub use memory::{BackendCall, BackendOp, FakeInterface, MemoryBackend};
pub use overlap::{AddressOverlapChecker, networks_overlap};
pub use spec::{
    AddressFamily, Mtu, TunnelMode, TunnelSpec, TunnelSpecBuilder, parse_interface_address,
};

pub use ipnet::{IpNet, Ipv4Net, Ipv6Net};
