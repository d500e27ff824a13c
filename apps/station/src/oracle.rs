//! Live units-per-TRX yields derived from chain parameters, with profile
//! fallbacks. Re-read for every preparation; never cached across calls.

use crate::config::{NetworkKind, NetworkProfile};
use anyhow::Result;
use tron::client::NodeClient;
use tron::resources::{self, ChainFees, ResourceStakeTotals, SUN_PER_TRX};
use tron::TronAddress;

/// Computed bandwidth yields below this are treated as a testnet parameter
/// glitch and replaced with [`TESTNET_BANDWIDTH_YIELD`].
const TESTNET_BANDWIDTH_ANOMALY: f64 = 50.0;
const TESTNET_BANDWIDTH_YIELD: f64 = 200.0;

#[derive(Debug, Clone)]
pub struct ResourceYields {
    pub energy_per_trx: f64,
    pub bandwidth_per_trx: f64,
    pub warnings: Vec<String>,
}

/// Derives both yields from a chain view. Pure so the fallback chain is
/// testable without a node.
pub fn derive_yields(
    fees: ChainFees,
    net_totals: ResourceStakeTotals,
    profile: &NetworkProfile,
) -> ResourceYields {
    let mut warnings = Vec::new();

    let energy_per_trx = match fees.energy_fee_sun_per_energy {
        Some(fee) => SUN_PER_TRX as f64 / fee as f64,
        None => {
            warnings.push(format!(
                "oracle_fallback:energy getEnergyFee unavailable, using {}",
                profile.energy_per_trx_fallback
            ));
            profile.energy_per_trx_fallback
        }
    };

    let mut bandwidth_per_trx = match net_totals.units_per_trx() {
        Some(yield_) => yield_,
        None => match fees.tx_fee_sun_per_byte {
            Some(fee) => {
                warnings.push("oracle_fallback:bandwidth using getTransactionFee".to_string());
                SUN_PER_TRX as f64 / fee as f64
            }
            None => {
                warnings.push(format!(
                    "oracle_fallback:bandwidth network totals unavailable, using {}",
                    profile.bandwidth_per_trx_fallback
                ));
                profile.bandwidth_per_trx_fallback
            }
        },
    };

    if profile.kind == NetworkKind::Testnet && bandwidth_per_trx < TESTNET_BANDWIDTH_ANOMALY {
        warnings.push(format!(
            "oracle_testnet_floor:bandwidth raw yield {bandwidth_per_trx:.2} below {TESTNET_BANDWIDTH_ANOMALY}, using {TESTNET_BANDWIDTH_YIELD}"
        ));
        bandwidth_per_trx = TESTNET_BANDWIDTH_YIELD;
    }

    ResourceYields {
        energy_per_trx,
        bandwidth_per_trx,
        warnings,
    }
}

/// Reads chain parameters and network stake totals from the full node.
pub async fn read_yields<C: NodeClient>(
    full: &C,
    pool_wallet: TronAddress,
    profile: &NetworkProfile,
) -> Result<ResourceYields> {
    let params = full.get_chain_parameters().await?;
    let resources = full.get_account_resources(pool_wallet).await?;

    let fees = resources::parse_chain_fees(&params);
    let net_totals = resources::net_stake_totals(&resources);
    Ok(derive_yields(fees, net_totals, profile))
}
