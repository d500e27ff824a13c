//! Constant-contract simulation of the USDT transfer the target will send.

use anyhow::{Context, Result};
use serde::Serialize;
use tron::abi;
use tron::client::{ConstantCallRequest, NodeClient};
use tron::wallet::signed_size_estimate;
use tron::TronAddress;

/// A simulated transfer below this energy cost means the recipient already
/// holds USDT (its balance slot is warm).
pub const HOLDER_ENERGY_BOUNDARY: u64 = 50_000;

/// Category estimates used when simulation is unavailable.
pub const FALLBACK_ENERGY_EXISTING_HOLDER: u64 = 32_000;
pub const FALLBACK_ENERGY_NEW_HOLDER: u64 = 65_000;
/// Size of a fully signed TRC20 transfer.
pub const FALLBACK_BANDWIDTH: u64 = 345;

#[derive(Debug, Clone, Copy, Serialize)]
pub struct SimulationResult {
    pub energy_used: u64,
    pub bandwidth_used: u64,
    pub would_succeed: bool,
    pub recipient_is_existing_usdt_holder: Option<bool>,
    /// True when the numbers are category estimates rather than a node reply.
    pub estimated: bool,
}

impl SimulationResult {
    /// New-holder penalty for simulations proxied through the pool wallet:
    /// the real sender pays the cold-slot surcharge the proxy does not.
    pub fn with_proxy_penalty(mut self) -> Self {
        self.energy_used = (self.energy_used as f64 * 1.2).ceil() as u64;
        self
    }
}

/// Classifies by the 50k boundary.
pub fn is_existing_holder(energy_used: u64) -> bool {
    energy_used < HOLDER_ENERGY_BOUNDARY
}

/// Category estimate when the node cannot simulate.
pub fn fallback_estimate(assume_existing_holder: bool) -> SimulationResult {
    let energy_used = if assume_existing_holder {
        FALLBACK_ENERGY_EXISTING_HOLDER
    } else {
        FALLBACK_ENERGY_NEW_HOLDER
    };
    SimulationResult {
        energy_used,
        bandwidth_used: FALLBACK_BANDWIDTH,
        would_succeed: false,
        recipient_is_existing_usdt_holder: None,
        estimated: true,
    }
}

/// Simulates `transfer(to, amount)` on the USDT contract from `from`.
///
/// Energy comes from the node verbatim; bandwidth is the serialized size of
/// the would-be signed transaction (64-byte signature placeholder included).
pub async fn simulate_usdt_transfer<C: NodeClient>(
    node: &C,
    from: TronAddress,
    to: TronAddress,
    usdt_contract: TronAddress,
    amount: u64,
) -> Result<SimulationResult> {
    let req = ConstantCallRequest {
        owner: from,
        contract: usdt_contract,
        selector: abi::TRANSFER_SELECTOR.to_string(),
        parameter: abi::encode_transfer_params(to, amount),
    };

    let reply = node
        .trigger_constant_contract(&req)
        .await
        .context("triggerconstantcontract")?;

    if !reply.succeeded() {
        let detail = reply
            .result
            .message
            .clone()
            .or(reply.result.code.clone())
            .unwrap_or_else(|| "empty constant_result".to_string());
        anyhow::bail!("simulation did not succeed: {detail}");
    }

    let bandwidth_used = reply
        .transaction
        .as_ref()
        .filter(|tx| !tx.raw_data_hex.is_empty())
        .map(|tx| signed_size_estimate(&tx.raw_data_hex, 1))
        .unwrap_or(FALLBACK_BANDWIDTH);

    Ok(SimulationResult {
        energy_used: reply.energy_used,
        bandwidth_used,
        would_succeed: true,
        recipient_is_existing_usdt_holder: Some(is_existing_holder(reply.energy_used)),
        estimated: false,
    })
}
