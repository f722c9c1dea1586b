//! iproute2 backend
//!
//! Drives the kernel through the `ip` utility. Every call runs one command
//! synchronously; stdout and stderr are captured and concatenated into the
//! combined output reported on failure.

use crate::backend::NetworkInterfaceBackend;
use crate::error::CommandError;
use crate::spec::{AddressFamily, Mtu, TunnelMode, parse_interface_address};
use ipnet::IpNet;
use std::ffi::OsString;
use std::process::Command;
use tracing::{debug, warn};

/// Backend that shells out to `ip`
#[derive(Debug, Clone)]
pub struct IpCommandBackend {
    program: OsString,
}

impl IpCommandBackend {
    /// Use `ip` from `PATH`
    pub fn new() -> Self {
        Self::with_program("ip")
    }

    /// Use a specific `ip` binary
    pub fn with_program(program: impl Into<OsString>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Run `ip <args>` and return its combined output
    fn run(&self, args: &[&str]) -> Result<String, CommandError> {
        let command_line = format!("{} {}", self.program.to_string_lossy(), args.join(" "));
        debug!("Running `{}`", command_line);

        let output = Command::new(&self.program)
            .args(args)
            .output()
            .map_err(|e| CommandError::new(command_line.clone(), e.to_string()))?;

        let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
        combined.push_str(&String::from_utf8_lossy(&output.stderr));

        if !output.status.success() {
            warn!("`{}` exited with {}", command_line, output.status);
            return Err(CommandError::new(command_line, combined.trim_end()));
        }

        Ok(combined)
    }
}

impl Default for IpCommandBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl NetworkInterfaceBackend for IpCommandBackend {
    fn list_interface_names(&self) -> Result<Vec<String>, CommandError> {
        let output = self.run(&["-o", "link", "show"])?;
        Ok(parse_link_names(&output))
    }

    fn list_addresses(&self, family: AddressFamily) -> Result<Vec<IpNet>, CommandError> {
        let output = self.run(&["-o", family.flag(), "addr", "show"])?;
        Ok(parse_addresses(&output, family))
    }

    fn create_device(&self, name: &str, mode: TunnelMode) -> Result<String, CommandError> {
        self.run(&["tuntap", "add", "dev", name, "mode", mode.as_str()])
    }

    fn delete_device(&self, name: &str, mode: TunnelMode) -> Result<String, CommandError> {
        self.run(&["tuntap", "del", "dev", name, "mode", mode.as_str()])
    }

    fn set_up(&self, name: &str) -> Result<String, CommandError> {
        self.run(&["link", "set", name, "up"])
    }

    fn set_mtu(&self, name: &str, mtu: Mtu) -> Result<String, CommandError> {
        let mtu = mtu.to_string();
        self.run(&["link", "set", name, "mtu", &mtu])
    }

    fn add_address(&self, name: &str, address: IpNet) -> Result<String, CommandError> {
        let family = AddressFamily::of(&address);
        let address = address.to_string();
        self.run(&[family.flag(), "addr", "add", &address, "dev", name])
    }
}

/// Extract interface names from `ip -o link show` output.
///
/// Lines look like `3: veth0@if2: <BROADCAST,...> mtu 1500 ...`; the
/// `@peer` suffix is not part of the name.
pub fn parse_link_names(output: &str) -> Vec<String> {
    output
        .lines()
        .filter_map(|line| {
            let (index, rest) = line.split_once(':')?;
            if index.trim().parse::<u32>().is_err() {
                return None;
            }
            let (name, flags) = rest.split_once(':')?;
            if !flags.trim_start().starts_with('<') {
                return None;
            }
            let name = name.trim();
            let name = name.split_once('@').map_or(name, |(base, _)| base);
            (!name.is_empty()).then(|| name.to_string())
        })
        .collect()
}

/// Extract addresses of `family` from `ip -o addr show` output.
///
/// The token following `inet`/`inet6` is the local address, usually with
/// its prefix. Point-to-point links print a bare local address followed by
/// `peer`; that address is taken as a host route.
pub fn parse_addresses(output: &str, family: AddressFamily) -> Vec<IpNet> {
    let keyword = match family {
        AddressFamily::V4 => "inet",
        AddressFamily::V6 => "inet6",
    };

    output
        .lines()
        .filter_map(|line| {
            let mut tokens = line.split_whitespace();
            tokens.find(|t| *t == keyword)?;
            let net = parse_interface_address(family.field(), tokens.next()?).ok()?;
            (AddressFamily::of(&net) == family).then_some(net)
        })
        .collect()
}
