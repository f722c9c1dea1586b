//! vpnmon: tun/tap tunnel provisioning and VPN client supervision
//!
//! Brings up the configured tunnel interface, then keeps the VPN client
//! running against it until the process is killed.
//!
//! Usage: `vpnmon [CONFIG]`. Without an argument the config is looked up
//! relative to the install location (see [`config::default_config_path`]).

mod config;
mod logging;

use anyhow::{Context, Result};
use config::MonitorConfig;
use std::path::PathBuf;
use tracing::info;
use vpnmon_supervisor::{ProcessLauncher, ProcessSupervisor, StdoutSink};
use vpnmon_tunnel::{IpCommandBackend, TunnelController};

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

fn main() -> Result<()> {
    let config_path = match std::env::args_os().nth(1) {
        Some(path) => PathBuf::from(path),
        None => config::default_config_path()?,
    };
    let config = MonitorConfig::from_file(&config_path)
        .with_context(|| format!("loading {}", config_path.display()))?;

    logging::init(config.log_file.as_deref())?;
    info!("vpnmon starting with {}", config_path.display());

    let tunnel = config.first_tunnel()?;
    let spec = tunnel
        .to_spec()
        .with_context(|| format!("tunnel {}", tunnel.name))?;

    // Interface setup is blocking and must succeed before supervision starts
    let controller = TunnelController::new(spec, IpCommandBackend::new());
    controller.destroy()?;
    controller.add()?;

    let command = tunnel.client_command(&config::exe_dir()?);
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;

    runtime.block_on(async {
        let handle = ProcessSupervisor::spawn(
            ProcessLauncher,
            command,
            StdoutSink::default(),
            config.supervisor_config(),
        );
        handle.join().await
    })?;

    info!("vpnmon shutting down");
    Ok(())
}
