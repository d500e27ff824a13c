//! Serde models for the subset of the TRON `wallet`/`walletsolidity` HTTP API
//! the gas station consumes. Field names mirror the node's JSON exactly; all
//! addresses travel in base58check form (`visible = true`).

use serde::{Deserialize, Serialize};

/// `POST /wallet/getaccount`. The node answers `{}` for accounts that do not
/// exist on-chain yet, so every field is optional.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Account {
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub balance: u64,
    #[serde(default, rename = "frozenV2")]
    pub frozen_v2: Vec<FrozenEntry>,
}

impl Account {
    /// An account exists on-chain iff the node echoes its address back.
    pub fn exists(&self) -> bool {
        self.address.is_some()
    }
}

/// One Stake 2.0 `frozenV2` entry. A missing `type` means type 0, which is
/// BANDWIDTH.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FrozenEntry {
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub amount: u64,
}

/// `POST /wallet/getaccountresource`.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct AccountResources {
    #[serde(default, rename = "freeNetUsed")]
    pub free_net_used: u64,
    #[serde(default, rename = "freeNetLimit")]
    pub free_net_limit: u64,
    #[serde(default, rename = "NetUsed")]
    pub net_used: u64,
    #[serde(default, rename = "NetLimit")]
    pub net_limit: u64,
    #[serde(default, rename = "EnergyUsed")]
    pub energy_used: u64,
    #[serde(default, rename = "EnergyLimit")]
    pub energy_limit: u64,
    #[serde(default, rename = "TotalNetLimit")]
    pub total_net_limit: u64,
    #[serde(default, rename = "TotalNetWeight")]
    pub total_net_weight: u64,
    #[serde(default, rename = "TotalEnergyLimit")]
    pub total_energy_limit: u64,
    #[serde(default, rename = "TotalEnergyWeight")]
    pub total_energy_weight: u64,
}

impl AccountResources {
    pub fn energy_available(&self) -> u64 {
        self.energy_limit.saturating_sub(self.energy_used)
    }

    /// Delegated quota plus the free daily allowance, both net of usage.
    pub fn bandwidth_available(&self) -> u64 {
        self.net_limit
            .saturating_sub(self.net_used)
            .saturating_add(self.free_net_limit.saturating_sub(self.free_net_used))
    }
}

/// `GET /wallet/getchainparameters`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChainParameters {
    #[serde(default, rename = "chainParameter")]
    pub chain_parameter: Vec<ChainParameter>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChainParameter {
    #[serde(default)]
    pub key: String,
    #[serde(default)]
    pub value: Option<i64>,
}

impl ChainParameters {
    pub fn get(&self, key: &str) -> Option<i64> {
        self.chain_parameter
            .iter()
            .find(|p| p.key == key)
            .and_then(|p| p.value)
    }
}

/// Response of `POST /wallet/triggerconstantcontract`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConstantCallResult {
    #[serde(default)]
    pub result: CallStatus,
    #[serde(default)]
    pub energy_used: u64,
    #[serde(default)]
    pub constant_result: Vec<String>,
    #[serde(default)]
    pub transaction: Option<BuiltTransaction>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CallStatus {
    #[serde(default)]
    pub result: bool,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl ConstantCallResult {
    /// Simulation succeeded: node flagged ok, no revert message, and the
    /// contract produced output.
    pub fn succeeded(&self) -> bool {
        self.result.result && self.result.message.is_none() && !self.constant_result.is_empty()
    }
}

/// A transaction skeleton as returned by the node's build endpoints
/// (`createtransaction`, `freezebalancev2`, `delegateresource`,
/// `createaccount`). `raw_data_hex` is the exact byte string the signature
/// must cover.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BuiltTransaction {
    #[serde(default, rename = "txID")]
    pub txid: String,
    #[serde(default)]
    pub raw_data: serde_json::Value,
    #[serde(default)]
    pub raw_data_hex: String,
    #[serde(default)]
    pub visible: bool,
    #[serde(default, rename = "Error", skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// A fully signed transaction in the JSON shape `broadcasttransaction`
/// expects.
#[derive(Debug, Clone, Serialize)]
pub struct SignedTransaction {
    #[serde(rename = "txID")]
    pub txid: String,
    pub raw_data: serde_json::Value,
    pub raw_data_hex: String,
    pub signature: Vec<String>,
    pub visible: bool,
}

/// `POST /wallet/broadcasttransaction`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BroadcastAck {
    #[serde(default)]
    pub result: bool,
    #[serde(default)]
    pub txid: Option<String>,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl BroadcastAck {
    /// Node rejection messages arrive hex-encoded; fall back to the raw text.
    pub fn message_text(&self) -> Option<String> {
        let raw = self.message.as_deref()?;
        let decoded = hex::decode(raw)
            .ok()
            .and_then(|b| String::from_utf8(b).ok());
        Some(decoded.unwrap_or_else(|| raw.to_string()))
    }
}

/// `POST /wallet/gettransactioninfobyid`; `{}` until the tx is indexed.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TransactionInfo {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default, rename = "blockNumber")]
    pub block_number: u64,
    #[serde(default)]
    pub receipt: Option<Receipt>,
    #[serde(default)]
    pub result: Option<String>,
}

impl TransactionInfo {
    pub fn included(&self) -> bool {
        self.id.is_some() && self.block_number > 0
    }

    pub fn failed(&self) -> bool {
        self.result.as_deref() == Some("FAILED")
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Receipt {
    #[serde(default)]
    pub energy_usage_total: u64,
    #[serde(default)]
    pub net_usage: u64,
    #[serde(default)]
    pub result: Option<String>,
}

/// `GET /wallet/getnowblock`, trimmed to the header number.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NowBlock {
    #[serde(default)]
    pub block_header: BlockHeader,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BlockHeader {
    #[serde(default)]
    pub raw_data: BlockHeaderRaw,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BlockHeaderRaw {
    #[serde(default)]
    pub number: u64,
}
