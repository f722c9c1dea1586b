use vpnmon_tunnel::{
    AddressFamily, BackendCall, BackendOp, IpNet, MemoryBackend, Mtu, TunnelController,
    TunnelError, TunnelMode, TunnelSpec,
};

fn net(s: &str) -> IpNet {
    s.parse().unwrap()
}

#[test]
fn add_ipv4_only_issues_exact_sequence() {
    let backend = MemoryBackend::new().with_interface("eth0", &["192.168.1.20/24"]);
    let spec = TunnelSpec::builder("tap0")
        .mode("tap")
        .unwrap()
        .mtu(1400)
        .unwrap()
        .ipv4_str("10.8.0.2/16")
        .unwrap()
        .build()
        .unwrap();
    let controller = TunnelController::new(spec, &backend);

    controller.add().unwrap();

    assert_eq!(
        backend.calls(),
        vec![
            BackendCall::CreateDevice {
                name: "tap0".into(),
                mode: TunnelMode::Tap,
            },
            BackendCall::SetUp { name: "tap0".into() },
            BackendCall::SetMtu {
                name: "tap0".into(),
                mtu: Mtu::new(1400).unwrap(),
            },
            BackendCall::AddAddress {
                name: "tap0".into(),
                address: net("10.8.0.2/16"),
            },
        ]
    );

    let iface = backend.interface("tap0").unwrap();
    assert_eq!(iface.addresses, vec![net("10.8.0.2/16")]);
    assert_eq!(iface.mtu, Some(Mtu::new(1400).unwrap()));
}

#[test]
fn add_dual_stack_assigns_ipv4_before_ipv6() {
    let backend = MemoryBackend::new();
    let spec = TunnelSpec::builder("tun0")
        .ipv4_str("10.9.0.2/24")
        .unwrap()
        .ipv6_str("fd00:9::2/64")
        .unwrap()
        .build()
        .unwrap();
    let controller = TunnelController::new(spec, &backend);

    controller.add().unwrap();

    let assigned: Vec<IpNet> = backend
        .calls()
        .into_iter()
        .filter_map(|call| match call {
            BackendCall::AddAddress { address, .. } => Some(address),
            _ => None,
        })
        .collect();
    assert_eq!(assigned, vec![net("10.9.0.2/24"), net("fd00:9::2/64")]);
}

#[test]
fn add_twice_is_an_error() {
    let backend = MemoryBackend::new();
    let controller = TunnelController::new(TunnelSpec::new("tun0").unwrap(), &backend);

    controller.add().unwrap();
    let err = controller.add().unwrap_err();

    assert!(matches!(err, TunnelError::AlreadyExists { .. }));
}

#[test]
fn add_aborts_on_ipv6_overlap_without_rollback() {
    let backend = MemoryBackend::new().with_interface("eth0", &["fd00:9::1/48"]);
    let spec = TunnelSpec::builder("tun0")
        .ipv4_str("10.9.0.2/24")
        .unwrap()
        .ipv6_str("fd00:9::2/64")
        .unwrap()
        .build()
        .unwrap();
    let controller = TunnelController::new(spec, &backend);

    let err = controller.add().unwrap_err();
    assert!(matches!(err, TunnelError::Overlap { family: AddressFamily::V6, .. }));

    // Earlier steps stay applied
    let iface = backend.interface("tun0").unwrap();
    assert_eq!(iface.addresses, vec![net("10.9.0.2/24")]);
}

#[test]
fn add_stops_after_mtu_failure() {
    let backend = MemoryBackend::new();
    backend.fail(BackendOp::SetMtu, "Error: mtu greater than device maximum.");
    let spec = TunnelSpec::builder("tun0")
        .ipv4_str("10.9.0.2/24")
        .unwrap()
        .build()
        .unwrap();
    let controller = TunnelController::new(spec, &backend);

    let err = controller.add().unwrap_err();
    assert!(matches!(err, TunnelError::Command(_)));
    assert!(
        backend
            .calls()
            .iter()
            .all(|call| call.op() != BackendOp::AddAddress)
    );
}

#[test]
fn destroy_then_add_replaces_stale_device() {
    let backend = MemoryBackend::new().with_interface("tap0", &["10.8.0.2/16"]);
    let spec = TunnelSpec::builder("tap0")
        .mode("TAP")
        .unwrap()
        .ipv4_str("10.8.0.2/16")
        .unwrap()
        .build()
        .unwrap();
    let controller = TunnelController::new(spec, &backend);

    controller.destroy().unwrap();
    controller.add().unwrap();

    assert_eq!(backend.calls()[0].op(), BackendOp::DeleteDevice);
    assert!(controller.exists().unwrap());
}

#[test]
fn listing_failure_surfaces_as_command_error() {
    let backend = MemoryBackend::new();
    backend.fail_listing("Cannot open netlink socket: Permission denied");
    let controller = TunnelController::new(TunnelSpec::new("tun0").unwrap(), &backend);

    assert!(matches!(controller.destroy().unwrap_err(), TunnelError::Command(_)));
    assert!(backend.calls().is_empty());
}
