//! Address overlap detection
//!
//! Decides whether a candidate address-with-prefix collides with any
//! address already assigned on the host. The backend is queried on every
//! check and nothing is cached, so the answer is only as fresh as the
//! moment it was computed: another process can assign a colliding address
//! between a negative check and our own assignment.

use crate::backend::NetworkInterfaceBackend;
use crate::error::CommandError;
use crate::spec::AddressFamily;
use ipnet::IpNet;
use tracing::debug;

/// Whether two networks share at least one address.
///
/// Both sides are truncated to their own prefix first. CIDR blocks are
/// either disjoint or nested, so checking both network addresses suffices.
pub fn networks_overlap(a: &IpNet, b: &IpNet) -> bool {
    let a = a.trunc();
    let b = b.trunc();
    a.contains(&b.network()) || b.contains(&a.network())
}

/// Checks candidate addresses against live interface state
pub struct AddressOverlapChecker<'a, B: NetworkInterfaceBackend + ?Sized> {
    backend: &'a B,
}

impl<'a, B: NetworkInterfaceBackend + ?Sized> AddressOverlapChecker<'a, B> {
    pub fn new(backend: &'a B) -> Self {
        Self { backend }
    }

    /// Returns the first existing address whose network intersects the
    /// candidate's network, if any
    pub fn find_overlap(&self, candidate: &IpNet) -> Result<Option<IpNet>, CommandError> {
        let family = AddressFamily::of(candidate);
        let existing = self.backend.list_addresses(family)?;

        let hit = existing
            .into_iter()
            .find(|assigned| networks_overlap(assigned, candidate));

        if let Some(assigned) = hit {
            debug!("{} overlaps existing {}", candidate, assigned);
        }
        Ok(hit)
    }

    pub fn overlaps(&self, candidate: &IpNet) -> Result<bool, CommandError> {
        Ok(self.find_overlap(candidate)?.is_some())
    }
}
