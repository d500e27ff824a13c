mod common;

use common::{
    new_state, pool_address, target_address, test_config, test_config_with_ops, two_view_cluster,
    FakeAccount, Visibility,
};
use station::report::{ErrorKind, Strategy};
use station::snapshot::fetch_snapshot;
use station::{GasStation, StationTelemetry};
use tokio_util::sync::CancellationToken;
use tron::client::{NodeCluster, ResourceCode};
use tron::resources::SUN_PER_TRX;

fn station_with(
    state: &std::sync::Arc<std::sync::Mutex<common::ChainState>>,
    cfg: station::AppConfig,
) -> GasStation<common::FakeNode> {
    GasStation::new(two_view_cluster(state), cfg, StationTelemetry::new()).unwrap()
}

fn broadcast_ops(state: &std::sync::Arc<std::sync::Mutex<common::ChainState>>) -> Vec<String> {
    state
        .lock()
        .unwrap()
        .broadcasts
        .iter()
        .map(|(op, _)| op.clone())
        .collect()
}

#[tokio::test(start_paused = true)]
async fn fresh_address_happy_path_activates_and_delegates() {
    let state = new_state();
    let station = station_with(&state, test_config());
    let cancel = CancellationToken::new();

    let result = station.prepare_for_usdt(target_address(), &cancel).await;

    assert!(result.success, "errors: {:?}", result.errors);
    assert_eq!(result.strategy, Strategy::CompletePreparation);
    assert!(result.errors.is_empty());

    // Activation transfer first, then freeze+delegate per resource, ENERGY
    // before BANDWIDTH.
    assert_eq!(
        broadcast_ops(&state),
        vec![
            "transfer",
            "freeze:ENERGY",
            "delegate:ENERGY",
            "freeze:BANDWIDTH",
            "delegate:BANDWIDTH",
        ]
    );

    assert_eq!(result.delegations.len(), 2);
    let energy = &result.delegations[0];
    let bandwidth = &result.delegations[1];
    assert_eq!(energy.resource, ResourceCode::Energy);
    assert_eq!(bandwidth.resource, ResourceCode::Bandwidth);
    assert!(energy.satisfied && bandwidth.satisfied);
    assert!(energy.broadcast_ok && bandwidth.broadcast_ok);
    assert!(energy.observed_increase > 0);
    assert!(energy.trx_frozen_sun >= SUN_PER_TRX);
    // 350 bandwidth units at 200 units/TRX.
    assert_eq!(bandwidth.trx_frozen_sun, 1_750_000);

    // New-holder penalty applied on top of the proxied simulation:
    // ceil(ceil(1817 * 1.2) * 1.15) + 5000.
    assert_eq!(result.required_energy, 7_509);
    assert_eq!(result.required_bandwidth, 350);

    let activated = state
        .lock()
        .unwrap()
        .accounts
        .get(&target_address().to_base58check())
        .unwrap()
        .activated;
    assert!(activated);
}

#[tokio::test(start_paused = true)]
async fn ready_address_short_circuits_without_broadcasting_twice() {
    let state = new_state();
    state.lock().unwrap().accounts.insert(
        target_address().to_base58check(),
        FakeAccount {
            activated: true,
            balance_sun: 500_000,
            energy_available: 40_000,
            bandwidth_available: 500,
            ..FakeAccount::default()
        },
    );
    let station = station_with(&state, test_config());
    let cancel = CancellationToken::new();

    let first = station.prepare_for_usdt(target_address(), &cancel).await;
    let second = station.prepare_for_usdt(target_address(), &cancel).await;

    for result in [&first, &second] {
        assert!(result.success);
        assert_eq!(result.strategy, Strategy::AlreadyReady);
        assert!(result.verification.usdt_ready);
    }
    assert!(broadcast_ops(&state).is_empty());
}

#[tokio::test(start_paused = true)]
async fn activation_without_transfer_permission_is_refused_before_any_broadcast() {
    let state = new_state();
    // Control permission may stake and delegate but not move TRX.
    let station = station_with(
        &state,
        test_config_with_ops("freeze_balance_v2,delegate_resource"),
    );
    let cancel = CancellationToken::new();

    let result = station.prepare_for_usdt(target_address(), &cancel).await;

    assert!(!result.success);
    assert_eq!(result.strategy, Strategy::ActivationFailed);
    assert_eq!(result.errors.len(), 1);
    assert_eq!(result.errors[0].kind, ErrorKind::Permission);
    assert_eq!(result.errors[0].location, "activate");
    assert!(!result.errors[0].retryable);
    assert!(broadcast_ops(&state).is_empty());
}

#[tokio::test(start_paused = true)]
async fn rejected_bandwidth_delegation_fails_the_preparation_but_keeps_energy() {
    let state = new_state();
    state
        .lock()
        .unwrap()
        .reject_ops
        .insert("delegate:BANDWIDTH".to_string());
    let station = station_with(&state, test_config());
    let cancel = CancellationToken::new();

    let result = station.prepare_for_usdt(target_address(), &cancel).await;

    assert!(!result.success);
    assert_eq!(result.strategy, Strategy::CompletePreparation);

    let energy = &result.delegations[0];
    let bandwidth = &result.delegations[1];
    assert!(energy.satisfied);
    assert!(!bandwidth.broadcast_ok);
    assert!(!bandwidth.satisfied);
    // The bandwidth freeze went through before the node rejected the
    // delegation; that TRX stays frozen on the pool.
    assert_eq!(bandwidth.trx_frozen_sun, 1_750_000);
    assert!(bandwidth.txid.is_none());

    assert!(result
        .errors
        .iter()
        .any(|e| e.kind == ErrorKind::Broadcast && e.message.contains("contract validate error")));
}

#[tokio::test(start_paused = true)]
async fn lagging_views_are_accepted_once_the_delegation_appears() {
    let state = new_state();
    {
        let mut s = state.lock().unwrap();
        s.visibility = Visibility::AfterReads(6);
        s.accounts.insert(
            target_address().to_base58check(),
            FakeAccount {
                activated: true,
                balance_sun: 2_000_000,
                ..FakeAccount::default()
            },
        );
    }
    let station = station_with(&state, test_config());
    let cancel = CancellationToken::new();

    let result = station.prepare_for_usdt(target_address(), &cancel).await;

    assert!(result.success, "errors: {:?}", result.errors);
    assert!(result.delegations.iter().all(|d| d.observed_increase > 0));
    assert!(!result
        .warnings
        .iter()
        .any(|w| w.starts_with("verification_timeout")));
}

#[tokio::test(start_paused = true)]
async fn stuck_views_succeed_with_verification_timeout_warnings() {
    let state = new_state();
    {
        let mut s = state.lock().unwrap();
        s.visibility = Visibility::Never;
        s.accounts.insert(
            target_address().to_base58check(),
            FakeAccount {
                activated: true,
                balance_sun: 2_000_000,
                ..FakeAccount::default()
            },
        );
    }
    let station = station_with(&state, test_config());
    let cancel = CancellationToken::new();

    let result = station.prepare_for_usdt(target_address(), &cancel).await;

    // The freeze math guarantees coverage, so the stuck view only warns.
    assert!(result.success, "errors: {:?}", result.errors);
    assert!(result.delegations.iter().all(|d| d.satisfied));
    assert!(result.delegations.iter().all(|d| d.observed_increase == 0));
    assert!(result
        .warnings
        .iter()
        .any(|w| w == "verification_timeout:energy"));
    assert!(result
        .warnings
        .iter()
        .any(|w| w == "verification_timeout:bandwidth"));
}

#[tokio::test(start_paused = true)]
async fn testnet_bandwidth_anomaly_uses_the_floored_yield() {
    let state = new_state();
    {
        let mut s = state.lock().unwrap();
        // Raw network yield of 12 bandwidth units per TRX.
        s.total_net_limit = 12_000;
        s.total_net_weight = 1_000;
    }
    let station = station_with(&state, test_config());
    let cancel = CancellationToken::new();

    let result = station.prepare_for_usdt(target_address(), &cancel).await;

    assert!(result.success, "errors: {:?}", result.errors);
    let bandwidth = result
        .delegations
        .iter()
        .find(|d| d.resource == ResourceCode::Bandwidth)
        .unwrap();
    // 350 units priced at the floored 200 units/TRX, not the raw 12.
    assert_eq!(bandwidth.trx_frozen_sun, 1_750_000);
    assert!(result
        .warnings
        .iter()
        .any(|w| w.starts_with("oracle_testnet_floor:bandwidth")));
}

#[tokio::test(start_paused = true)]
async fn simulation_failure_falls_back_to_category_estimates() {
    let state = new_state();
    state.lock().unwrap().sim_ok = false;
    let station = station_with(&state, test_config());
    let cancel = CancellationToken::new();

    let result = station.prepare_for_usdt(target_address(), &cancel).await;

    assert!(result.success, "errors: {:?}", result.errors);
    // ceil(65_000 * 1.15) + 5_000 from the new-holder estimate.
    assert_eq!(result.required_energy, 79_750);
    assert!(result
        .warnings
        .iter()
        .any(|w| w.starts_with("simulation_fallback")));
    // Simulation trouble downgrades to a warning, never an error.
    assert!(result.errors.is_empty());
}

#[tokio::test(start_paused = true)]
async fn insufficient_pool_funds_stop_before_any_broadcast() {
    let state = new_state();
    state
        .lock()
        .unwrap()
        .accounts
        .get_mut(&pool_address().to_base58check())
        .unwrap()
        .balance_sun = 2 * SUN_PER_TRX;
    let station = station_with(&state, test_config());
    let cancel = CancellationToken::new();

    let result = station.prepare_for_usdt(target_address(), &cancel).await;

    assert!(!result.success);
    assert!(result
        .errors
        .iter()
        .any(|e| e.kind == ErrorKind::InsufficientFunds && !e.retryable));
    assert!(broadcast_ops(&state).is_empty());
}

#[tokio::test(start_paused = true)]
async fn cancelled_preparation_returns_immediately() {
    let state = new_state();
    let station = station_with(&state, test_config());
    let cancel = CancellationToken::new();
    cancel.cancel();

    let result = station.prepare_for_usdt(target_address(), &cancel).await;

    assert!(!result.success);
    assert_eq!(result.strategy, Strategy::Cancelled);
    assert!(result.errors.iter().any(|e| e.kind == ErrorKind::Cancelled));
    assert!(broadcast_ops(&state).is_empty());
}

#[tokio::test(start_paused = true)]
async fn dry_run_plans_without_broadcasting() {
    let state = new_state();
    let station = station_with(&state, test_config());

    let report = station.dry_run(target_address()).await;

    assert!(report.feasible);
    let plan = report.plan.expect("plan");
    assert_eq!(plan.need_bandwidth_units, 350);
    assert!(plan.energy_trx_to_freeze_sun >= SUN_PER_TRX);
    // Cost covers activation plus both freezes.
    let expected_sun = plan.total_freeze_sun() + SUN_PER_TRX;
    assert!((report.estimated_cost_trx - expected_sun as f64 / SUN_PER_TRX as f64).abs() < 1e-9);
    assert!(broadcast_ops(&state).is_empty());
}

#[tokio::test(start_paused = true)]
async fn multi_endpoint_snapshot_reports_the_maximum_view() {
    // Three endpoints with diverging views of the same address.
    let states = [new_state(), new_state(), new_state()];
    for (state, energy) in states.iter().zip([0u64, 10_000, 6_000]) {
        state.lock().unwrap().accounts.insert(
            target_address().to_base58check(),
            FakeAccount {
                activated: energy > 0,
                energy_available: energy,
                ..FakeAccount::default()
            },
        );
    }
    let cluster = NodeCluster {
        full: common::FakeNode::new("full", states[0].clone()),
        solidity: common::FakeNode::new("solidity", states[1].clone()),
        remote_solidity: Some(common::FakeNode::new("remote", states[2].clone())),
    };

    let snapshot = fetch_snapshot(&cluster, target_address()).await.unwrap();
    assert_eq!(snapshot.energy_available, 10_000);
    assert!(snapshot.activated);
}

#[tokio::test(start_paused = true)]
async fn status_reports_pool_capacity_and_permissions() {
    let state = new_state();
    {
        let mut s = state.lock().unwrap();
        let pool = s.accounts.get_mut(&pool_address().to_base58check()).unwrap();
        pool.energy_available = 1_465_000;
        pool.bandwidth_available = 690_000;
        pool.staked_energy_sun = 50 * SUN_PER_TRX;
        pool.staked_bandwidth_sun = 1_000 * SUN_PER_TRX;
    }
    let station = station_with(&state, test_config());

    let status = station.status().await.unwrap();
    assert_eq!(status.pool_wallet_address, pool_address().to_base58check());
    assert_eq!(status.balance_trx, 8_000.0);
    assert_eq!(status.permission_id, 2);
    assert!(!status.fallback_to_owner);
    assert!(status.control_ops_allowed.contains(&"delegate_resource"));
    // 1_465_000 / 14_650 = 100 energy-limited transfers; bandwidth allows
    // 2_000, so energy is the bottleneck.
    assert_eq!(status.capacity.daily_usdt_transfers, 100);
    assert_eq!(status.capacity.bottleneck, ResourceCode::Energy);
    assert_eq!(status.capacity.account_activations, 8_000);

    assert_eq!(status.staked_energy_trx, 50.0);
    assert_eq!(status.staked_bandwidth_trx, 1_000.0);
    // 50 TRX nominally yields 1.6M energy; 1.465M on-chain is ~91.6%.
    assert!((status.efficiency.energy - 91.5625).abs() < 1e-9);
    // 1_000 TRX nominally yields 1M bandwidth; 690k is 69%.
    assert!((status.efficiency.bandwidth - 69.0).abs() < 1e-9);
    assert!(status
        .warnings
        .iter()
        .any(|w| w == "bandwidth staking efficiency below 80%"));
    assert!(!status
        .warnings
        .iter()
        .any(|w| w == "energy staking efficiency below 80%"));
    assert!(!status.warnings.iter().any(|w| w.contains("capacity")));
}

#[tokio::test(start_paused = true)]
async fn status_grades_critically_low_capacity() {
    let state = new_state();
    {
        let mut s = state.lock().unwrap();
        let pool = s.accounts.get_mut(&pool_address().to_base58check()).unwrap();
        // A single energy-limited transfer and no bandwidth at all.
        pool.energy_available = 14_650;
        pool.bandwidth_available = 0;
    }
    let station = station_with(&state, test_config());

    let status = station.status().await.unwrap();
    assert_eq!(status.capacity.daily_usdt_transfers, 0);
    assert!(status
        .warnings
        .iter()
        .any(|w| w.starts_with("critical: very low daily transfer capacity")));
    // Nothing staked: both efficiency figures read zero and warn.
    assert_eq!(status.efficiency.energy, 0.0);
    assert!(status
        .warnings
        .iter()
        .any(|w| w == "energy staking efficiency below 80%"));
    assert!(status
        .warnings
        .iter()
        .any(|w| w == "bandwidth staking efficiency below 80%"));
}

#[tokio::test(start_paused = true)]
async fn health_reads_every_view() {
    let state = new_state();
    let station = station_with(&state, test_config());

    let health = station.health().await;
    assert!(health.connected);
    assert_eq!(health.latest_block, 1_000);
    assert!(health.warnings.is_empty());
}
