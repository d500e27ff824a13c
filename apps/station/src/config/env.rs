use serde::Deserialize;

#[derive(Debug, Deserialize)]
#[serde(default)]
pub(super) struct Env {
    pub tron_network: String,

    pub tron_api_key: Option<String>,

    pub tron_local_node_enabled: bool,

    pub tron_mainnet_local_full_node: String,

    pub tron_mainnet_local_solidity_node: String,

    pub tron_testnet_local_full_node: String,

    pub tron_testnet_local_solidity_node: String,

    pub tron_remote_mainnet_full_node: String,

    pub tron_remote_mainnet_solidity_node: String,

    pub tron_remote_testnet_full_node: String,

    pub tron_remote_testnet_solidity_node: String,

    pub tron_mainnet_usdt_contract: String,

    pub tron_testnet_usdt_contract: String,

    pub gas_wallet_address: String,

    /// Owner key; discouraged, only read for explicit fallback.
    #[serde(default)]
    pub gas_wallet_private_key: String,

    #[serde(default)]
    pub gas_wallet_control_private_key: String,

    pub gas_wallet_control_permission_id: u8,

    pub gas_control_allowed_ops: String,

    pub gas_control_fallback_to_owner: bool,

    pub gas_account_activation_mode: String,

    #[serde(default)]
    pub gas_activation_private_key: String,

    /// None means the network-profile default (1.0 testnet / 1.5 mainnet).
    pub auto_activation_trx_amount: Option<f64>,

    /// Optional per-delegation floors; unset leaves the plan at its computed
    /// safety-margin amounts.
    pub target_energy_units: Option<u64>,

    pub target_bandwidth_units: Option<u64>,

    pub usdt_energy_per_transfer_estimate: u64,

    pub usdt_bandwidth_per_transfer_estimate: u64,

    pub energy_units_per_trx_estimate: Option<f64>,

    pub bandwidth_units_per_trx_estimate: Option<f64>,

    pub delegation_safety_multiplier: f64,

    pub bandwidth_safety_multiplier: f64,

    pub min_delegate_trx: u64,

    pub rpc_timeout_secs: u64,

    pub rpc_retries: u32,

    pub poll_interval_ms: u64,

    pub poll_attempts: u32,

    pub preparation_timeout_secs: u64,
}

impl Default for Env {
    fn default() -> Self {
        Self {
            tron_network: "testnet".to_string(),
            tron_api_key: None,
            tron_local_node_enabled: true,
            tron_mainnet_local_full_node: "http://127.0.0.1:8090".to_string(),
            tron_mainnet_local_solidity_node: "http://127.0.0.1:8091".to_string(),
            tron_testnet_local_full_node: "http://127.0.0.1:8090".to_string(),
            tron_testnet_local_solidity_node: "http://127.0.0.1:8091".to_string(),
            tron_remote_mainnet_full_node: "https://api.trongrid.io".to_string(),
            tron_remote_mainnet_solidity_node: "https://api.trongrid.io".to_string(),
            tron_remote_testnet_full_node: "https://nile.trongrid.io".to_string(),
            tron_remote_testnet_solidity_node: "https://nile.trongrid.io".to_string(),
            tron_mainnet_usdt_contract: "TR7NHqjeKQxGTCi8q8ZY4pL8otSzgjLj6t".to_string(),
            tron_testnet_usdt_contract: "TXYZopYRdj2D9XRtbG411XZZ3kM5VkAeBf".to_string(),
            gas_wallet_address: String::new(),
            gas_wallet_private_key: String::new(),
            gas_wallet_control_private_key: String::new(),
            gas_wallet_control_permission_id: 2,
            gas_control_allowed_ops:
                "transfer,freeze_balance_v2,delegate_resource,undelegate_resource".to_string(),
            gas_control_fallback_to_owner: true,
            gas_account_activation_mode: "transfer".to_string(),
            gas_activation_private_key: String::new(),
            auto_activation_trx_amount: None,
            target_energy_units: None,
            target_bandwidth_units: None,
            usdt_energy_per_transfer_estimate: 14_650,
            usdt_bandwidth_per_transfer_estimate: 345,
            energy_units_per_trx_estimate: None,
            bandwidth_units_per_trx_estimate: None,
            delegation_safety_multiplier: 1.15,
            bandwidth_safety_multiplier: 1.25,
            min_delegate_trx: 1,
            rpc_timeout_secs: 10,
            rpc_retries: 3,
            poll_interval_ms: 500,
            poll_attempts: 10,
            preparation_timeout_secs: 60,
        }
    }
}
