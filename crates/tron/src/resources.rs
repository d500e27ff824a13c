use crate::protocol::{AccountResources, ChainParameters};
use anyhow::Result;

/// Key names returned by `getchainparameters`.
///
/// Tron nodes expose a list of (key,value) params. We only consume the
/// fee-related ones.
pub const CHAIN_PARAM_ENERGY_FEE: &str = "getEnergyFee";
pub const CHAIN_PARAM_TX_FEE_PER_BYTE: &str = "getTransactionFee";

pub const SUN_PER_TRX: u64 = 1_000_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChainFees {
    /// Sun per energy unit.
    pub energy_fee_sun_per_energy: Option<u64>,
    /// Sun per bandwidth byte.
    pub tx_fee_sun_per_byte: Option<u64>,
}

pub fn parse_chain_fees(params: &ChainParameters) -> ChainFees {
    let positive = |key: &str| {
        params
            .get(key)
            .and_then(|v| u64::try_from(v).ok())
            .filter(|v| *v > 0)
    };
    ChainFees {
        energy_fee_sun_per_energy: positive(CHAIN_PARAM_ENERGY_FEE),
        tx_fee_sun_per_byte: positive(CHAIN_PARAM_TX_FEE_PER_BYTE),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceStakeTotals {
    /// Total resource capacity on the network (energy units or bandwidth units).
    pub total_limit: u64,
    /// Total stake weight backing this resource (in TRX).
    pub total_weight: u64,
}

impl ResourceStakeTotals {
    /// Units obtained per staked TRX under the current network totals, or
    /// `None` when the node reports no weight (private nets, stale views).
    pub fn units_per_trx(&self) -> Option<f64> {
        if self.total_limit == 0 || self.total_weight == 0 {
            return None;
        }
        Some(self.total_limit as f64 / self.total_weight as f64)
    }
}

pub fn energy_stake_totals(res: &AccountResources) -> ResourceStakeTotals {
    ResourceStakeTotals {
        total_limit: res.total_energy_limit,
        total_weight: res.total_energy_weight,
    }
}

pub fn net_stake_totals(res: &AccountResources) -> ResourceStakeTotals {
    ResourceStakeTotals {
        total_limit: res.total_net_limit,
        total_weight: res.total_net_weight,
    }
}

/// Minimum TRX (in sun) to freeze so the stake yields at least `units` of the
/// resource, never below the network's 1 TRX freeze minimum.
pub fn freeze_sun_for_units(units: u64, units_per_trx: f64) -> Result<u64> {
    if units_per_trx <= 0.0 || !units_per_trx.is_finite() {
        anyhow::bail!("units_per_trx must be positive, got {units_per_trx}");
    }
    let sun = (units as f64 / units_per_trx * SUN_PER_TRX as f64).ceil() as u64;
    Ok(sun.max(SUN_PER_TRX))
}
