//! Startup reconciliation: drive the OS toward the persisted intent.

mod common;

use common::{FakeExecutor, FakeRoute, VPN_GATEWAY, test_config, test_switcher};
use vpnswitch::routing::types::Mode;

fn split_pair() -> Vec<FakeRoute> {
    vec![
        FakeRoute {
            destination: "0.0.0.0".to_string(),
            netmask: "128.0.0.0".to_string(),
            gateway: VPN_GATEWAY.to_string(),
            metric: 1,
        },
        FakeRoute {
            destination: "128.0.0.0".to_string(),
            netmask: "128.0.0.0".to_string(),
            gateway: VPN_GATEWAY.to_string(),
            metric: 1,
        },
    ]
}

#[tokio::test]
async fn reconcile_restores_vpn_intent_after_reboot() {
    let executor = FakeExecutor::normal_host();
    let dir = tempfile::tempdir().unwrap();
    let mut config = test_config();
    config.last_known_vpn_state = true;
    let switcher = test_switcher(&executor, config, &dir);

    let mode = switcher.reconcile_on_startup().await.unwrap();
    assert_eq!(mode, Mode::Vpn);
    assert_eq!(executor.routes_via(VPN_GATEWAY).len(), 2);
    assert_eq!(
        executor.host.lock().unwrap().dns.as_deref(),
        Some("10.64.0.1")
    );
}

#[tokio::test]
async fn reconcile_with_unreachable_gateway_stays_normal() {
    let executor = FakeExecutor::normal_host();
    executor.host.lock().unwrap().reachable = false;
    let dir = tempfile::tempdir().unwrap();
    let mut config = test_config();
    config.last_known_vpn_state = true;
    let switcher = test_switcher(&executor, config, &dir);

    let mode = switcher.reconcile_on_startup().await.unwrap();
    assert_eq!(mode, Mode::Normal);
    assert!(executor.mutation_commands().is_empty());
}

#[tokio::test]
async fn reconcile_in_agreement_touches_nothing() {
    let executor = FakeExecutor::normal_host();
    let dir = tempfile::tempdir().unwrap();
    let switcher = test_switcher(&executor, test_config(), &dir);

    let mode = switcher.reconcile_on_startup().await.unwrap();
    assert_eq!(mode, Mode::Normal);
    assert_eq!(executor.commands(), vec!["route print -4"]);
}

#[tokio::test]
async fn reconcile_removes_leftover_vpn_routes_when_intent_is_normal() {
    // A toggle that died between route add and config save leaves the pair
    // behind while the saved intent still says Normal.
    let executor = FakeExecutor::normal_host();
    executor
        .host
        .lock()
        .unwrap()
        .routes
        .extend(split_pair());
    let dir = tempfile::tempdir().unwrap();
    let switcher = test_switcher(&executor, test_config(), &dir);

    let mode = switcher.reconcile_on_startup().await.unwrap();
    assert_eq!(mode, Mode::Normal);
    assert!(executor.routes_via(VPN_GATEWAY).is_empty());
    assert_eq!(
        executor.host.lock().unwrap().dns.as_deref(),
        Some("10.0.0.1")
    );
}

#[tokio::test]
async fn a_half_pair_reads_as_normal_and_the_next_toggle_repairs_it() {
    // One leftover half must never be reported as VPN. Toggling from that
    // state clears the stale half before adding the fresh pair.
    let executor = FakeExecutor::normal_host();
    executor
        .host
        .lock()
        .unwrap()
        .routes
        .push(split_pair().remove(0));
    let dir = tempfile::tempdir().unwrap();
    let switcher = test_switcher(&executor, test_config(), &dir);

    let status = switcher.status().await.unwrap();
    assert_eq!(status.mode, Mode::Normal);

    let transition = switcher.toggle().await.unwrap();
    assert_eq!(transition.mode, Mode::Vpn);
    assert_eq!(executor.routes_via(VPN_GATEWAY).len(), 2);
}
