//! Post-delegation verification: watch the target through the multi-view
//! snapshot until the delegated resource shows up, tolerating index lag.

use crate::poll::{poll_until, PollOutcome};
use crate::snapshot::{fetch_snapshot, ResourceSnapshot};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tron::client::{NodeClient, NodeCluster};
use tron::{ResourceCode, TronAddress};

pub const USDT_READY_MIN_ENERGY: u64 = 15_000;
pub const USDT_READY_MIN_BANDWIDTH: u64 = 300;

/// An address can send a USDT transfer at zero cost to itself.
pub fn usdt_ready(snapshot: &ResourceSnapshot) -> bool {
    snapshot.activated
        && snapshot.energy_available >= USDT_READY_MIN_ENERGY
        && snapshot.bandwidth_available >= USDT_READY_MIN_BANDWIDTH
}

#[derive(Debug, Clone, Copy)]
pub struct VerifyOutcome {
    /// Increase over the baseline for the watched resource.
    pub observed_increase: u64,
    pub last_snapshot: Option<ResourceSnapshot>,
    pub cancelled: bool,
}

fn available(snapshot: &ResourceSnapshot, resource: ResourceCode) -> u64 {
    match resource {
        ResourceCode::Energy => snapshot.energy_available,
        ResourceCode::Bandwidth => snapshot.bandwidth_available,
    }
}

/// Polls until the target's `resource` rises above `baseline`, accepting any
/// positive delta.
pub async fn wait_for_increase<C: NodeClient>(
    cluster: &NodeCluster<C>,
    cancel: &CancellationToken,
    interval: Duration,
    attempts: u32,
    target: TronAddress,
    resource: ResourceCode,
    baseline: u64,
) -> VerifyOutcome {
    let outcome = poll_until(
        cancel,
        interval,
        attempts,
        || fetch_snapshot(cluster, target),
        |snapshot| available(snapshot, resource) > baseline,
    )
    .await;

    let cancelled = matches!(outcome, PollOutcome::Cancelled);
    let last_snapshot = outcome.last();
    let observed_increase = last_snapshot
        .map(|s| available(&s, resource).saturating_sub(baseline))
        .unwrap_or(0);

    VerifyOutcome {
        observed_increase,
        last_snapshot,
        cancelled,
    }
}
