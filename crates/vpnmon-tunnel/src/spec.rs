//! Tunnel Spec
//!
//! An immutable, always-valid description of a tun/tap interface: name,
//! mode, MTU and optional IPv4/IPv6 addresses with prefix.
//!
//! # Usage
//!
//! ```rust
//! use vpnmon_tunnel::{TunnelSpec, TunnelMode};
//!
//! let spec = TunnelSpec::builder("tap0")
//!     .mode("TAP")?
//!     .mtu(1400)?
//!     .ipv4_str("10.8.0.2/16")?
//!     .build()?;
//!
//! assert_eq!(spec.mode(), TunnelMode::Tap);
//! # Ok::<(), vpnmon_tunnel::ValidationError>(())
//! ```

use crate::error::ValidationError;
use ipnet::{IpNet, Ipv4Net, Ipv6Net};
use std::net::IpAddr;

/// Kernel limit on interface names (IFNAMSIZ minus the trailing NUL)
const MAX_NAME_LEN: usize = 15;

/// Virtual interface mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TunnelMode {
    /// Raw IP packets
    #[default]
    Tun,
    /// Ethernet frames
    Tap,
}

impl TunnelMode {
    /// Mode keyword as understood by `ip tuntap`
    pub fn as_str(&self) -> &'static str {
        match self {
            TunnelMode::Tun => "tun",
            TunnelMode::Tap => "tap",
        }
    }
}

impl std::fmt::Display for TunnelMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TunnelMode {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "tun" => Ok(TunnelMode::Tun),
            "tap" => Ok(TunnelMode::Tap),
            _ => Err(ValidationError::new(
                "mode",
                format!("mode must be tun or tap, got {s:?}"),
            )),
        }
    }
}

/// Interface MTU, always within `[Mtu::MIN, Mtu::MAX]`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Mtu(u16);

impl Mtu {
    pub const MIN: u32 = 68;
    pub const MAX: u32 = 9000;
    pub const DEFAULT: Mtu = Mtu(1500);

    /// Validate and wrap an MTU value
    pub fn new(value: u32) -> Result<Self, ValidationError> {
        if !(Self::MIN..=Self::MAX).contains(&value) {
            return Err(ValidationError::new(
                "mtu",
                format!("mtu must be between {} and {}, got {value}", Self::MIN, Self::MAX),
            ));
        }
        // MAX fits in u16
        Ok(Mtu(value as u16))
    }

    pub fn get(&self) -> u16 {
        self.0
    }
}

impl Default for Mtu {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl TryFrom<u32> for Mtu {
    type Error = ValidationError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Mtu::new(value)
    }
}

impl std::fmt::Display for Mtu {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// IP address family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AddressFamily {
    V4,
    V6,
}

impl AddressFamily {
    /// Family of an address-with-prefix
    pub fn of(net: &IpNet) -> Self {
        match net {
            IpNet::V4(_) => AddressFamily::V4,
            IpNet::V6(_) => AddressFamily::V6,
        }
    }

    /// `ip` command family flag
    pub fn flag(&self) -> &'static str {
        match self {
            AddressFamily::V4 => "-4",
            AddressFamily::V6 => "-6",
        }
    }

    /// Spec field holding addresses of this family
    pub fn field(&self) -> &'static str {
        match self {
            AddressFamily::V4 => "ipv4",
            AddressFamily::V6 => "ipv6",
        }
    }
}

impl std::fmt::Display for AddressFamily {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AddressFamily::V4 => f.write_str("IPv4"),
            AddressFamily::V6 => f.write_str("IPv6"),
        }
    }
}

/// Parse an interface address such as `10.0.0.2/16`.
///
/// A bare address gets a host prefix (/32 or /128).
pub fn parse_interface_address(field: &'static str, s: &str) -> Result<IpNet, ValidationError> {
    let s = s.trim();
    if let Ok(net) = s.parse::<IpNet>() {
        return Ok(net);
    }
    s.parse::<IpAddr>()
        .map(IpNet::from)
        .map_err(|_| ValidationError::new(field, format!("{s:?} is not an address with prefix")))
}

/// Validated tunnel description
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TunnelSpec {
    name: String,
    mode: TunnelMode,
    mtu: Mtu,
    ipv4: Option<Ipv4Net>,
    ipv6: Option<Ipv6Net>,
}

impl TunnelSpec {
    /// Start building a spec for the named interface
    pub fn builder(name: impl Into<String>) -> TunnelSpecBuilder {
        TunnelSpecBuilder::new(name)
    }

    /// Spec with default mode and MTU and no addresses
    pub fn new(name: impl Into<String>) -> Result<Self, ValidationError> {
        Self::builder(name).build()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn mode(&self) -> TunnelMode {
        self.mode
    }

    pub fn mtu(&self) -> Mtu {
        self.mtu
    }

    pub fn ipv4(&self) -> Option<Ipv4Net> {
        self.ipv4
    }

    pub fn ipv6(&self) -> Option<Ipv6Net> {
        self.ipv6
    }

    /// Configured address of the given family, if any
    pub fn address(&self, family: AddressFamily) -> Option<IpNet> {
        match family {
            AddressFamily::V4 => self.ipv4.map(IpNet::V4),
            AddressFamily::V6 => self.ipv6.map(IpNet::V6),
        }
    }
}

/// Validating builder for [`TunnelSpec`].
///
/// Each setter validates before mutating; on error the builder keeps its
/// previous value for that field.
#[derive(Debug, Clone)]
pub struct TunnelSpecBuilder {
    name: String,
    mode: TunnelMode,
    mtu: Mtu,
    ipv4: Option<Ipv4Net>,
    ipv6: Option<Ipv6Net>,
}

impl TunnelSpecBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            mode: TunnelMode::default(),
            mtu: Mtu::default(),
            ipv4: None,
            ipv6: None,
        }
    }

    /// Set the mode from a case-insensitive `tun`/`tap` keyword
    pub fn mode(&mut self, mode: &str) -> Result<&mut Self, ValidationError> {
        self.mode = mode.parse()?;
        Ok(self)
    }

    pub fn mtu(&mut self, mtu: u32) -> Result<&mut Self, ValidationError> {
        self.mtu = Mtu::new(mtu)?;
        Ok(self)
    }

    /// Set the IPv4 address; an IPv6 value is rejected
    pub fn ipv4(&mut self, address: impl Into<IpNet>) -> Result<&mut Self, ValidationError> {
        match address.into() {
            IpNet::V4(net) => {
                self.ipv4 = Some(net);
                Ok(self)
            }
            IpNet::V6(net) => Err(ValidationError::new(
                "ipv4",
                format!("{net} is not an IPv4 address with prefix"),
            )),
        }
    }

    /// Set the IPv6 address; an IPv4 value is rejected
    pub fn ipv6(&mut self, address: impl Into<IpNet>) -> Result<&mut Self, ValidationError> {
        match address.into() {
            IpNet::V6(net) => {
                self.ipv6 = Some(net);
                Ok(self)
            }
            IpNet::V4(net) => Err(ValidationError::new(
                "ipv6",
                format!("{net} is not an IPv6 address with prefix"),
            )),
        }
    }

    pub fn ipv4_str(&mut self, address: &str) -> Result<&mut Self, ValidationError> {
        let net = parse_interface_address(AddressFamily::V4.field(), address)?;
        self.ipv4(net)
    }

    pub fn ipv6_str(&mut self, address: &str) -> Result<&mut Self, ValidationError> {
        let net = parse_interface_address(AddressFamily::V6.field(), address)?;
        self.ipv6(net)
    }

    /// Finish the spec; the interface name is checked here
    pub fn build(&self) -> Result<TunnelSpec, ValidationError> {
        validate_name(&self.name)?;
        Ok(TunnelSpec {
            name: self.name.clone(),
            mode: self.mode,
            mtu: self.mtu,
            ipv4: self.ipv4,
            ipv6: self.ipv6,
        })
    }
}

fn validate_name(name: &str) -> Result<(), ValidationError> {
    if name.is_empty() {
        return Err(ValidationError::new("name", "name must not be empty"));
    }
    if name.len() > MAX_NAME_LEN {
        return Err(ValidationError::new(
            "name",
            format!("name must be at most {MAX_NAME_LEN} bytes"),
        ));
    }
    if name.chars().any(|c| c.is_whitespace() || c == '/' || c == ':') {
        return Err(ValidationError::new(
            "name",
            "name must not contain whitespace, '/' or ':'",
        ));
    }
    Ok(())
}
