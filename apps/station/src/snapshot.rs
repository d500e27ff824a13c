//! Momentary per-address resource views, recomputed on every read.

use anyhow::Result;
use serde::Serialize;
use tron::client::{MergeMax, NodeClient, NodeCluster};
use tron::protocol::Account;
use tron::resources::SUN_PER_TRX;
use tron::TronAddress;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ResourceSnapshot {
    pub activated: bool,
    pub balance_sun: u64,
    pub energy_available: u64,
    pub bandwidth_available: u64,
}

impl MergeMax for ResourceSnapshot {
    fn merge_max(self, other: Self) -> Self {
        Self {
            activated: self.activated || other.activated,
            balance_sun: self.balance_sun.max(other.balance_sun),
            energy_available: self.energy_available.max(other.energy_available),
            bandwidth_available: self.bandwidth_available.max(other.bandwidth_available),
        }
    }
}

/// Reads the snapshot from every endpoint in parallel and keeps the
/// element-wise maximum, masking index lag right after a freeze or delegate.
pub async fn fetch_snapshot<C: NodeClient>(
    cluster: &NodeCluster<C>,
    addr: TronAddress,
) -> Result<ResourceSnapshot> {
    cluster
        .parallel_max(|node| async move {
            let account = node.get_account(addr).await?;
            let resources = node.get_account_resources(addr).await?;
            Ok(ResourceSnapshot {
                activated: account.exists(),
                balance_sun: account.balance,
                energy_available: resources.energy_available(),
                bandwidth_available: resources.bandwidth_available(),
            })
        })
        .await
}

/// Stake 2.0 `frozenV2` breakdown of the pool wallet, in TRX.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct StakeBreakdown {
    pub energy_trx: f64,
    pub bandwidth_trx: f64,
}

/// Nominal Stake 2.0 yields, units per staked TRX.
pub const NOMINAL_ENERGY_UNITS_PER_TRX: f64 = 32_000.0;
pub const NOMINAL_BANDWIDTH_UNITS_PER_TRX: f64 = 1_000.0;

/// Staking efficiency: the account's actual resource limit against what the
/// staked TRX should nominally yield, as a percentage capped at 100.
pub fn staking_efficiency_pct(
    staked_trx: f64,
    resource_limit: u64,
    nominal_units_per_trx: f64,
) -> f64 {
    let expected = staked_trx * nominal_units_per_trx;
    if expected <= 0.0 {
        return 0.0;
    }
    (resource_limit as f64 / expected * 100.0).min(100.0)
}

/// Entries with a missing type are type 0, which is BANDWIDTH.
pub fn stake_breakdown(account: &Account) -> StakeBreakdown {
    let mut breakdown = StakeBreakdown::default();
    for entry in &account.frozen_v2 {
        let trx = entry.amount as f64 / SUN_PER_TRX as f64;
        match entry.kind.as_deref() {
            Some("ENERGY") => breakdown.energy_trx += trx,
            Some("TRON_POWER") => {}
            _ => breakdown.bandwidth_trx += trx,
        }
    }
    breakdown
}
