mod env;
mod load;
mod parse;

pub use load::load_config;

use crate::plan::PlanParams;
use crate::signer::ControlOps;
use serde::Serialize;
use std::time::Duration;
use tron::TronAddress;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NetworkKind {
    Mainnet,
    Testnet,
}

impl std::fmt::Display for NetworkKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            NetworkKind::Mainnet => "mainnet",
            NetworkKind::Testnet => "testnet",
        })
    }
}

/// Immutable per-network facts, fixed for the life of the process.
#[derive(Debug, Clone, Copy)]
pub struct NetworkProfile {
    pub kind: NetworkKind,
    pub activation_cost_sun: u64,
    /// Long-run yield constants used when chain parameters are unavailable.
    pub energy_per_trx_fallback: f64,
    pub bandwidth_per_trx_fallback: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivationMode {
    Transfer,
    CreateAccount,
}

#[derive(Debug, Clone)]
pub struct EndpointsConfig {
    /// "local" or "remote" depending on which set serves the primary views.
    pub node_type: &'static str,
    pub full_url: String,
    pub solidity_url: String,
    /// Extra confirmed view kept even when a local node is primary.
    pub remote_solidity_url: Option<String>,
    pub api_key: Option<String>,
    pub timeout: Duration,
    pub retries: u32,
}

#[derive(Debug, Clone)]
pub struct KeysConfig {
    pub owner_key_hex: Option<String>,
    pub control_key_hex: Option<String>,
    /// Dedicated key for activation transfers, outside the permission model.
    pub activation_key_hex: Option<String>,
    pub permission_id: u8,
    pub allowed_ops: ControlOps,
    pub fallback_to_owner: bool,
}

/// Per-transfer cost estimates used for pool capacity accounting.
#[derive(Debug, Clone, Copy)]
pub struct EstimateConfig {
    pub usdt_energy_per_transfer: u64,
    pub usdt_bandwidth_per_transfer: u64,
}

#[derive(Debug, Clone, Copy)]
pub struct TimingConfig {
    pub rpc_timeout: Duration,
    pub rpc_retries: u32,
    pub poll_interval: Duration,
    pub poll_attempts: u32,
    pub preparation_timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub profile: NetworkProfile,
    pub endpoints: EndpointsConfig,
    pub pool_wallet: TronAddress,
    pub usdt_contract: TronAddress,
    pub activation_mode: ActivationMode,
    pub keys: KeysConfig,
    pub plan: PlanParams,
    pub estimates: EstimateConfig,
    pub timing: TimingConfig,
}
