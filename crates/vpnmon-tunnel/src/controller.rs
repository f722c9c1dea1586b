//! Tunnel Controller
//!
//! Brings a tun/tap interface into existence from a [`TunnelSpec`] or tears
//! it down.
//!
//! # Usage
//!
//! ```rust,ignore
//! let controller = TunnelController::new(spec, IpCommandBackend::new());
//!
//! // Replace any stale device left behind by a previous run
//! controller.destroy()?;
//! controller.add()?;
//! ```
//!
//! # Ordering
//!
//! `add()` runs create → MTU → IPv4 → IPv6 and stops at the first failure.
//! Earlier steps are not rolled back: a device created by a failed `add()`
//! stays behind until `destroy()` is called.
//!
//! Existence and address state are re-queried before every decision. The
//! controller takes no lock on the network namespace; callers must not run
//! two controllers' overlap-check-then-assign sequences concurrently.

use crate::backend::NetworkInterfaceBackend;
use crate::error::TunnelError;
use crate::overlap::AddressOverlapChecker;
use crate::spec::{AddressFamily, TunnelSpec};
use tracing::{debug, info, warn};

/// Orchestrates backend calls for one tunnel
pub struct TunnelController<B: NetworkInterfaceBackend> {
    spec: TunnelSpec,
    backend: B,
}

impl<B: NetworkInterfaceBackend> TunnelController<B> {
    pub fn new(spec: TunnelSpec, backend: B) -> Self {
        Self { spec, backend }
    }

    /// Whether the device currently exists
    pub fn exists(&self) -> Result<bool, TunnelError> {
        let names = self.backend.list_interface_names()?;
        Ok(names.iter().any(|n| n == self.spec.name()))
    }

    /// Create the device and set it up.
    ///
    /// Fails with [`TunnelError::AlreadyExists`] without touching anything
    /// if a device of that name is already present.
    pub fn create(&self) -> Result<(), TunnelError> {
        let name = self.spec.name();
        if self.exists()? {
            return Err(TunnelError::AlreadyExists {
                name: name.to_string(),
            });
        }

        let output = self.backend.create_device(name, self.spec.mode())?;

        if let Err(e) = self.backend.set_up(name) {
            warn!("Failed to set {} up: {}", name, e);
        }

        if !self.exists()? {
            return Err(TunnelError::CreationFailed {
                name: name.to_string(),
                output,
            });
        }

        info!("Created {} device {}", self.spec.mode(), name);
        Ok(())
    }

    pub fn set_mtu(&self) -> Result<(), TunnelError> {
        self.backend.set_mtu(self.spec.name(), self.spec.mtu())?;
        debug!("Set {} mtu {}", self.spec.name(), self.spec.mtu());
        Ok(())
    }

    /// Assign the configured address of `family`.
    ///
    /// Runs the overlap check first; an overlap aborts before any address
    /// command is issued. Does nothing if no address of `family` is set.
    pub fn assign_address(&self, family: AddressFamily) -> Result<(), TunnelError> {
        let Some(address) = self.spec.address(family) else {
            return Ok(());
        };
        let name = self.spec.name();

        let checker = AddressOverlapChecker::new(&self.backend);
        if checker.overlaps(&address)? {
            return Err(TunnelError::Overlap {
                name: name.to_string(),
                family,
                address,
            });
        }

        self.backend.add_address(name, address)?;
        info!("Assigned {} to {}", address, name);
        Ok(())
    }

    /// Create the device, set its MTU and assign its addresses, in that
    /// order, aborting on the first failure
    pub fn add(&self) -> Result<(), TunnelError> {
        self.create()?;
        self.set_mtu()?;
        if self.spec.ipv4().is_some() {
            self.assign_address(AddressFamily::V4)?;
        }
        if self.spec.ipv6().is_some() {
            self.assign_address(AddressFamily::V6)?;
        }
        Ok(())
    }

    /// Delete the device. Succeeds without doing anything if it is absent.
    pub fn destroy(&self) -> Result<(), TunnelError> {
        let name = self.spec.name();
        if !self.exists()? {
            debug!("{} not present, nothing to delete", name);
            return Ok(());
        }

        self.backend.delete_device(name, self.spec.mode())?;
        info!("Deleted {} device {}", self.spec.mode(), name);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{BackendCall, BackendOp, MemoryBackend};
    use crate::spec::TunnelMode;

    fn tap_spec() -> TunnelSpec {
        TunnelSpec::builder("tap0")
            .mode("tap")
            .unwrap()
            .ipv4_str("10.8.0.2/16")
            .unwrap()
            .build()
            .unwrap()
    }

    #[test]
    fn test_create_existing_fails_without_mutation() {
        let backend = MemoryBackend::new().with_interface("tap0", &[]);
        let controller = TunnelController::new(tap_spec(), &backend);

        let err = controller.create().unwrap_err();
        assert!(matches!(err, TunnelError::AlreadyExists { .. }));
        assert!(backend.calls().is_empty());
    }

    #[test]
    fn test_create_sets_up() {
        let backend = MemoryBackend::new();
        let controller = TunnelController::new(tap_spec(), &backend);

        controller.create().unwrap();

        let iface = backend.interface("tap0").unwrap();
        assert!(iface.up);
        assert_eq!(iface.mode, Some(TunnelMode::Tap));
    }

    #[test]
    fn test_create_post_check_failure() {
        let backend = MemoryBackend::new();
        backend.ignore_creates();
        let controller = TunnelController::new(tap_spec(), &backend);

        let err = controller.create().unwrap_err();
        assert!(matches!(err, TunnelError::CreationFailed { ref name, .. } if name == "tap0"));
    }

    #[test]
    fn test_create_command_failure() {
        let backend = MemoryBackend::new();
        backend.fail(BackendOp::CreateDevice, "ioctl(TUNSETIFF): Operation not permitted");
        let controller = TunnelController::new(tap_spec(), &backend);

        match controller.create().unwrap_err() {
            TunnelError::Command(e) => {
                assert!(e.command.contains("tuntap add"));
                assert!(e.output.contains("Operation not permitted"));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(backend.calls().len(), 1);
    }

    #[test]
    fn test_set_up_failure_is_not_fatal() {
        let backend = MemoryBackend::new();
        backend.fail(BackendOp::SetUp, "RTNETLINK answers: Operation not permitted");
        let controller = TunnelController::new(tap_spec(), &backend);

        assert!(controller.create().is_ok());
    }

    #[test]
    fn test_overlap_aborts_before_assignment() {
        let backend = MemoryBackend::new().with_interface("eth0", &["10.8.200.1/24"]);
        let controller = TunnelController::new(tap_spec(), &backend);
        controller.create().unwrap();
        backend.clear_calls();

        let err = controller.assign_address(AddressFamily::V4).unwrap_err();
        assert!(matches!(err, TunnelError::Overlap { family: AddressFamily::V4, .. }));
        assert!(backend.calls().is_empty());
    }

    #[test]
    fn test_assign_absent_family_is_noop() {
        let backend = MemoryBackend::new();
        let controller = TunnelController::new(tap_spec(), &backend);

        controller.assign_address(AddressFamily::V6).unwrap();
        assert!(backend.calls().is_empty());
    }

    #[test]
    fn test_set_mtu_failure_is_command_error() {
        let backend = MemoryBackend::new();
        let controller = TunnelController::new(tap_spec(), &backend);

        let err = controller.set_mtu().unwrap_err();
        assert!(matches!(err, TunnelError::Command(_)));
    }

    #[test]
    fn test_destroy_absent_is_noop() {
        let backend = MemoryBackend::new();
        let controller = TunnelController::new(tap_spec(), &backend);

        controller.destroy().unwrap();
        controller.destroy().unwrap();
        assert!(backend.calls().is_empty());
    }

    #[test]
    fn test_destroy_present() {
        let backend = MemoryBackend::new().with_interface("tap0", &[]);
        let controller = TunnelController::new(tap_spec(), &backend);

        controller.destroy().unwrap();
        assert_eq!(
            backend.calls(),
            vec![BackendCall::DeleteDevice {
                name: "tap0".into(),
                mode: TunnelMode::Tap,
            }]
        );
        assert!(backend.interface("tap0").is_none());
    }
}
