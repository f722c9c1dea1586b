//! Network interface backend
//!
//! The primitive OS operations the controller needs. Implementations are
//! blocking: each call returns only once the underlying OS operation has
//! completed. Mutating calls return the combined command output on success.

use crate::error::CommandError;
use crate::spec::{AddressFamily, Mtu, TunnelMode};
use ipnet::IpNet;

/// Primitive interface operations against the live OS state
pub trait NetworkInterfaceBackend {
    /// Names of every interface currently present
    fn list_interface_names(&self) -> Result<Vec<String>, CommandError>;

    /// Every address of `family` assigned to any interface, with its prefix
    fn list_addresses(&self, family: AddressFamily) -> Result<Vec<IpNet>, CommandError>;

    fn create_device(&self, name: &str, mode: TunnelMode) -> Result<String, CommandError>;

    fn delete_device(&self, name: &str, mode: TunnelMode) -> Result<String, CommandError>;

    /// Set the link administratively up
    fn set_up(&self, name: &str) -> Result<String, CommandError>;

    fn set_mtu(&self, name: &str, mtu: Mtu) -> Result<String, CommandError>;

    fn add_address(&self, name: &str, address: IpNet) -> Result<String, CommandError>;
}

impl<B: NetworkInterfaceBackend + ?Sized> NetworkInterfaceBackend for &B {
    fn list_interface_names(&self) -> Result<Vec<String>, CommandError> {
        (**self).list_interface_names()
    }

    fn list_addresses(&self, family: AddressFamily) -> Result<Vec<IpNet>, CommandError> {
        (**self).list_addresses(family)
    }

    fn create_device(&self, name: &str, mode: TunnelMode) -> Result<String, CommandError> {
        (**self).create_device(name, mode)
    }

    fn delete_device(&self, name: &str, mode: TunnelMode) -> Result<String, CommandError> {
        (**self).delete_device(name, mode)
    }

    fn set_up(&self, name: &str) -> Result<String, CommandError> {
        (**self).set_up(name)
    }

    fn set_mtu(&self, name: &str, mtu: Mtu) -> Result<String, CommandError> {
        (**self).set_mtu(name, mtu)
    }

    fn add_address(&self, name: &str, address: IpNet) -> Result<String, CommandError> {
        (**self).add_address(name, address)
    }
}
