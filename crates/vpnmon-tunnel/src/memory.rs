//! In-memory backend
//!
//! A deterministic stand-in for the OS network namespace. It keeps a table
//! of interfaces and their addresses, records every mutating call in order,
//! and can be told to fail specific operations.

use crate::backend::NetworkInterfaceBackend;
use crate::error::CommandError;
use crate::spec::{AddressFamily, Mtu, TunnelMode};
use ipnet::IpNet;
use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

/// Mutating backend operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendOp {
    CreateDevice,
    DeleteDevice,
    SetUp,
    SetMtu,
    AddAddress,
}

/// A recorded mutating call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendCall {
    CreateDevice { name: String, mode: TunnelMode },
    DeleteDevice { name: String, mode: TunnelMode },
    SetUp { name: String },
    SetMtu { name: String, mtu: Mtu },
    AddAddress { name: String, address: IpNet },
}

impl BackendCall {
    pub fn op(&self) -> BackendOp {
        match self {
            BackendCall::CreateDevice { .. } => BackendOp::CreateDevice,
            BackendCall::DeleteDevice { .. } => BackendOp::DeleteDevice,
            BackendCall::SetUp { .. } => BackendOp::SetUp,
            BackendCall::SetMtu { .. } => BackendOp::SetMtu,
            BackendCall::AddAddress { .. } => BackendOp::AddAddress,
        }
    }
}

/// Simulated interface
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FakeInterface {
    pub mode: Option<TunnelMode>,
    pub up: bool,
    pub mtu: Option<Mtu>,
    pub addresses: Vec<IpNet>,
}

#[derive(Debug, Default)]
struct State {
    interfaces: BTreeMap<String, FakeInterface>,
    calls: Vec<BackendCall>,
    failures: HashMap<BackendOp, String>,
    list_failure: Option<String>,
    ignore_creates: bool,
}

/// Backend over an in-memory interface table
#[derive(Debug, Default)]
pub struct MemoryBackend {
    state: Mutex<State>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a pre-existing interface carrying `addresses`.
    ///
    /// Panics if an address does not parse; this is a fixture helper.
    pub fn with_interface(self, name: &str, addresses: &[&str]) -> Self {
        {
            let mut state = self.lock();
            let iface = state.interfaces.entry(name.to_string()).or_default();
            iface.up = true;
            for address in addresses {
                match address.parse() {
                    Ok(net) => iface.addresses.push(net),
                    Err(_) => panic!("invalid fake address {address:?}"),
                }
            }
        }
        self
    }

    /// Make every call of `op` fail with `output`
    pub fn fail(&self, op: BackendOp, output: impl Into<String>) {
        self.lock().failures.insert(op, output.into());
    }

    /// Make interface and address listing fail with `output`
    pub fn fail_listing(&self, output: impl Into<String>) {
        self.lock().list_failure = Some(output.into());
    }

    /// Accept create requests without actually creating anything
    pub fn ignore_creates(&self) {
        self.lock().ignore_creates = true;
    }

    /// Mutating calls in the order they were issued
    pub fn calls(&self) -> Vec<BackendCall> {
        self.lock().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.lock().calls.clear();
    }

    /// Snapshot of one interface
    pub fn interface(&self, name: &str) -> Option<FakeInterface> {
        self.lock().interfaces.get(name).cloned()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        // A panicking test thread must not wedge the others
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn mutate<F>(&self, call: BackendCall, command: String, apply: F) -> Result<String, CommandError>
    where
        F: FnOnce(&mut State) -> Result<(), String>,
    {
        let mut state = self.lock();
        let op = call.op();
        state.calls.push(call);

        if let Some(output) = state.failures.get(&op) {
            return Err(CommandError::new(command, output.clone()));
        }
        apply(&mut *state).map_err(|output| CommandError::new(command, output))?;
        Ok(String::new())
    }
}

fn no_device(name: &str) -> String {
    format!("Cannot find device \"{name}\"")
}

impl NetworkInterfaceBackend for MemoryBackend {
    fn list_interface_names(&self) -> Result<Vec<String>, CommandError> {
        let state = self.lock();
        if let Some(output) = &state.list_failure {
            return Err(CommandError::new("ip -o link show", output.clone()));
        }
        Ok(state.interfaces.keys().cloned().collect())
    }

    fn list_addresses(&self, family: AddressFamily) -> Result<Vec<IpNet>, CommandError> {
        let state = self.lock();
        if let Some(output) = &state.list_failure {
            return Err(CommandError::new(
                format!("ip -o {} addr show", family.flag()),
                output.clone(),
            ));
        }
        Ok(state
            .interfaces
            .values()
            .flat_map(|iface| iface.addresses.iter().copied())
            .filter(|net| AddressFamily::of(net) == family)
            .collect())
    }

    fn create_device(&self, name: &str, mode: TunnelMode) -> Result<String, CommandError> {
        let call = BackendCall::CreateDevice {
            name: name.to_string(),
            mode,
        };
        let command = format!("ip tuntap add dev {name} mode {mode}");
        self.mutate(call, command, |state| {
            if state.interfaces.contains_key(name) {
                return Err("ioctl(TUNSETIFF): Device or resource busy".to_string());
            }
            if !state.ignore_creates {
                state.interfaces.insert(
                    name.to_string(),
                    FakeInterface {
                        mode: Some(mode),
                        ..FakeInterface::default()
                    },
                );
            }
            Ok(())
        })
    }

    fn delete_device(&self, name: &str, mode: TunnelMode) -> Result<String, CommandError> {
        let call = BackendCall::DeleteDevice {
            name: name.to_string(),
            mode,
        };
        let command = format!("ip tuntap del dev {name} mode {mode}");
        self.mutate(call, command, |state| {
            state
                .interfaces
                .remove(name)
                .map(|_| ())
                .ok_or_else(|| no_device(name))
        })
    }

    fn set_up(&self, name: &str) -> Result<String, CommandError> {
        let call = BackendCall::SetUp {
            name: name.to_string(),
        };
        let command = format!("ip link set {name} up");
        self.mutate(call, command, |state| {
            let iface = state.interfaces.get_mut(name).ok_or_else(|| no_device(name))?;
            iface.up = true;
            Ok(())
        })
    }

    fn set_mtu(&self, name: &str, mtu: Mtu) -> Result<String, CommandError> {
        let call = BackendCall::SetMtu {
            name: name.to_string(),
            mtu,
        };
        let command = format!("ip link set {name} mtu {mtu}");
        self.mutate(call, command, |state| {
            let iface = state.interfaces.get_mut(name).ok_or_else(|| no_device(name))?;
            iface.mtu = Some(mtu);
            Ok(())
        })
    }

    fn add_address(&self, name: &str, address: IpNet) -> Result<String, CommandError> {
        let call = BackendCall::AddAddress {
            name: name.to_string(),
            address,
        };
        let family = AddressFamily::of(&address);
        let command = format!("ip {} addr add {address} dev {name}", family.flag());
        self.mutate(call, command, |state| {
            let iface = state.interfaces.get_mut(name).ok_or_else(|| no_device(name))?;
            if iface.addresses.contains(&address) {
                return Err("RTNETLINK answers: File exists".to_string());
            }
            iface.addresses.push(address);
            Ok(())
        })
    }
}
