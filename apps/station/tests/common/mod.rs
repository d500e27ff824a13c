//! An in-memory TRON node for orchestrator tests: applies broadcasts to a
//! shared chain state and can lag or reject on demand.
#![allow(dead_code)]

use anyhow::Result;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use station::config::{
    ActivationMode, AppConfig, EndpointsConfig, EstimateConfig, KeysConfig, NetworkKind,
    NetworkProfile, TimingConfig,
};
use station::plan::PlanParams;
use station::signer::ControlOps;
use tron::client::{ConstantCallRequest, NodeClient, NodeCluster, ResourceCode};
use tron::protocol::{
    Account, AccountResources, BroadcastAck, BuiltTransaction, ChainParameters, ConstantCallResult,
    SignedTransaction, TransactionInfo,
};
use tron::{TronAddress, TronWallet};

pub const CONTROL_KEY_HEX: &str =
    "1111111111111111111111111111111111111111111111111111111111111111";

pub fn control_wallet() -> TronWallet {
    TronWallet::from_hex(CONTROL_KEY_HEX).unwrap()
}

pub fn pool_address() -> TronAddress {
    TronWallet::new([9u8; 32]).unwrap().address()
}

pub fn target_address() -> TronAddress {
    TronWallet::new([3u8; 32]).unwrap().address()
}

pub fn usdt_contract() -> TronAddress {
    TronWallet::new([7u8; 32]).unwrap().address()
}

#[derive(Debug, Clone, Default)]
pub struct FakeAccount {
    pub activated: bool,
    pub balance_sun: u64,
    pub energy_available: u64,
    pub bandwidth_available: u64,
    pub staked_energy_sun: u64,
    pub staked_bandwidth_sun: u64,
}

/// When a delegated resource becomes visible to reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    Immediate,
    /// Visible after this many resource reads of the receiving address.
    AfterReads(u32),
    Never,
}

#[derive(Debug)]
struct PendingDelegation {
    addr: String,
    resource: ResourceCode,
    units: u64,
    reads_remaining: u32,
    never: bool,
}

pub struct ChainState {
    pub accounts: HashMap<String, FakeAccount>,
    /// (op key, accepted) per broadcast attempt, in order.
    pub broadcasts: Vec<(String, bool)>,
    broadcast_txids: HashSet<String>,
    pub reject_ops: HashSet<String>,
    pub visibility: Visibility,
    pending: Vec<PendingDelegation>,

    pub energy_fee: Option<i64>,
    pub total_net_limit: u64,
    pub total_net_weight: u64,

    pub sim_energy: u64,
    pub sim_ok: bool,
}

impl ChainState {
    fn account(&self, addr: &TronAddress) -> FakeAccount {
        self.accounts
            .get(&addr.to_base58check())
            .cloned()
            .unwrap_or_default()
    }

    fn energy_yield(&self) -> f64 {
        match self.energy_fee {
            Some(fee) if fee > 0 => 1_000_000.0 / fee as f64,
            _ => 76.28,
        }
    }

    fn bandwidth_yield(&self) -> f64 {
        if self.total_net_weight == 0 {
            return 200.0;
        }
        let raw = self.total_net_limit as f64 / self.total_net_weight as f64;
        if raw < 50.0 { 200.0 } else { raw }
    }

    fn settle_pending(&mut self, addr: &str) {
        let mut ready = Vec::new();
        for p in self.pending.iter_mut().filter(|p| p.addr == addr && !p.never) {
            if p.reads_remaining == 0 {
                ready.push((p.resource, p.units));
                p.never = true; // consumed
            } else {
                p.reads_remaining -= 1;
            }
        }
        if let Some(account) = self.accounts.get_mut(addr) {
            for (resource, units) in ready {
                match resource {
                    ResourceCode::Energy => account.energy_available += units,
                    ResourceCode::Bandwidth => account.bandwidth_available += units,
                }
            }
        }
    }
}

#[derive(Clone)]
pub struct FakeNode {
    label: String,
    state: Arc<Mutex<ChainState>>,
}

impl FakeNode {
    pub fn new(label: &str, state: Arc<Mutex<ChainState>>) -> Self {
        Self {
            label: label.to_string(),
            state,
        }
    }

    fn built(raw_data: serde_json::Value) -> BuiltTransaction {
        let raw_data_hex = hex::encode(serde_json::to_vec(&raw_data).unwrap());
        BuiltTransaction {
            txid: String::new(),
            raw_data,
            raw_data_hex,
            visible: true,
            error: None,
        }
    }
}

pub fn new_state() -> Arc<Mutex<ChainState>> {
    let mut accounts = HashMap::new();
    accounts.insert(
        pool_address().to_base58check(),
        FakeAccount {
            activated: true,
            balance_sun: 8_000 * 1_000_000,
            ..FakeAccount::default()
        },
    );
    Arc::new(Mutex::new(ChainState {
        accounts,
        broadcasts: Vec::new(),
        broadcast_txids: HashSet::new(),
        reject_ops: HashSet::new(),
        visibility: Visibility::Immediate,
        pending: Vec::new(),
        energy_fee: Some(420),
        total_net_limit: 43_200_000_000,
        total_net_weight: 216_000_000,
        sim_energy: 1_817,
        sim_ok: true,
    }))
}

impl NodeClient for FakeNode {
    fn label(&self) -> &str {
        &self.label
    }

    async fn get_account(&self, addr: TronAddress) -> Result<Account> {
        let state = self.state.lock().unwrap();
        let account = state.account(&addr);
        if !account.activated && account.balance_sun == 0 {
            return Ok(Account::default());
        }
        let mut frozen = Vec::new();
        if account.staked_energy_sun > 0 {
            frozen.push(serde_json::json!({"type": "ENERGY", "amount": account.staked_energy_sun}));
        }
        if account.staked_bandwidth_sun > 0 {
            // Untyped entry: type 0, i.e. BANDWIDTH.
            frozen.push(serde_json::json!({"amount": account.staked_bandwidth_sun}));
        }
        Ok(serde_json::from_value(serde_json::json!({
            "address": addr.to_base58check(),
            "balance": account.balance_sun,
            "frozenV2": frozen,
        }))?)
    }

    async fn get_account_resources(&self, addr: TronAddress) -> Result<AccountResources> {
        let mut state = self.state.lock().unwrap();
        let key = addr.to_base58check();
        state.settle_pending(&key);
        let account = state.account(&addr);
        Ok(serde_json::from_value(serde_json::json!({
            "EnergyLimit": account.energy_available,
            "NetLimit": account.bandwidth_available,
            "TotalNetLimit": state.total_net_limit,
            "TotalNetWeight": state.total_net_weight,
        }))?)
    }

    async fn get_chain_parameters(&self) -> Result<ChainParameters> {
        let state = self.state.lock().unwrap();
        let mut params = vec![serde_json::json!({"key": "getTransactionFee", "value": 1000})];
        if let Some(fee) = state.energy_fee {
            params.push(serde_json::json!({"key": "getEnergyFee", "value": fee}));
        }
        Ok(serde_json::from_value(
            serde_json::json!({"chainParameter": params}),
        )?)
    }

    async fn trigger_constant_contract(
        &self,
        _req: &ConstantCallRequest,
    ) -> Result<ConstantCallResult> {
        let state = self.state.lock().unwrap();
        if !state.sim_ok {
            return Ok(serde_json::from_value(serde_json::json!({
                "result": {"result": true, "message": "REVERT opcode executed"},
                "energy_used": 0,
                "constant_result": [],
            }))?);
        }
        // 206 raw bytes + 64-byte signature placeholder = 270 bandwidth.
        Ok(serde_json::from_value(serde_json::json!({
            "result": {"result": true},
            "energy_used": state.sim_energy,
            "constant_result": ["0000000000000000000000000000000000000000000000000000000000000001"],
            "transaction": {"raw_data_hex": "00".repeat(206), "raw_data": {}},
        }))?)
    }

    async fn build_transfer(
        &self,
        from: TronAddress,
        to: TronAddress,
        amount_sun: u64,
        permission_id: Option<u8>,
    ) -> Result<BuiltTransaction> {
        Ok(Self::built(serde_json::json!({
            "op": "transfer",
            "from": from.to_base58check(),
            "to": to.to_base58check(),
            "amount": amount_sun,
            "permission_id": permission_id,
        })))
    }

    async fn build_freeze_balance_v2(
        &self,
        owner: TronAddress,
        frozen_sun: u64,
        resource: ResourceCode,
        permission_id: Option<u8>,
    ) -> Result<BuiltTransaction> {
        Ok(Self::built(serde_json::json!({
            "op": format!("freeze:{}", resource.api_name()),
            "owner": owner.to_base58check(),
            "amount": frozen_sun,
            "permission_id": permission_id,
        })))
    }

    async fn build_delegate_resource(
        &self,
        owner: TronAddress,
        receiver: TronAddress,
        balance_sun: u64,
        resource: ResourceCode,
        lock_period_blocks: u64,
        permission_id: Option<u8>,
    ) -> Result<BuiltTransaction> {
        Ok(Self::built(serde_json::json!({
            "op": format!("delegate:{}", resource.api_name()),
            "owner": owner.to_base58check(),
            "to": receiver.to_base58check(),
            "balance": balance_sun,
            "lock_period": lock_period_blocks,
            "permission_id": permission_id,
        })))
    }

    async fn build_create_account(
        &self,
        owner: TronAddress,
        target: TronAddress,
        permission_id: Option<u8>,
    ) -> Result<BuiltTransaction> {
        Ok(Self::built(serde_json::json!({
            "op": "create_account",
            "owner": owner.to_base58check(),
            "to": target.to_base58check(),
            "permission_id": permission_id,
        })))
    }

    async fn broadcast(&self, tx: &SignedTransaction) -> Result<BroadcastAck> {
        let mut state = self.state.lock().unwrap();
        let op = tx.raw_data["op"].as_str().unwrap_or("unknown").to_string();

        if state.reject_ops.contains(&op) {
            state.broadcasts.push((op, false));
            return Ok(BroadcastAck {
                result: false,
                txid: None,
                code: Some("CONTRACT_VALIDATE_ERROR".to_string()),
                message: Some(hex::encode("contract validate error")),
            });
        }

        match op.as_str() {
            "transfer" => {
                let to = tx.raw_data["to"].as_str().unwrap().to_string();
                let amount = tx.raw_data["amount"].as_u64().unwrap_or(0);
                let account = state.accounts.entry(to).or_default();
                account.activated = true;
                account.balance_sun += amount;
            }
            "create_account" => {
                let to = tx.raw_data["to"].as_str().unwrap().to_string();
                state.accounts.entry(to).or_default().activated = true;
            }
            op if op.starts_with("delegate:") => {
                let to = tx.raw_data["to"].as_str().unwrap().to_string();
                let balance = tx.raw_data["balance"].as_u64().unwrap_or(0);
                let resource = if op.ends_with("ENERGY") {
                    ResourceCode::Energy
                } else {
                    ResourceCode::Bandwidth
                };
                let units = (balance as f64 / 1_000_000.0
                    * match resource {
                        ResourceCode::Energy => state.energy_yield(),
                        ResourceCode::Bandwidth => state.bandwidth_yield(),
                    })
                .floor() as u64;
                match state.visibility {
                    Visibility::Immediate => {
                        let account = state.accounts.entry(to).or_default();
                        match resource {
                            ResourceCode::Energy => account.energy_available += units,
                            ResourceCode::Bandwidth => account.bandwidth_available += units,
                        }
                    }
                    Visibility::AfterReads(reads) => state.pending.push(PendingDelegation {
                        addr: to,
                        resource,
                        units,
                        reads_remaining: reads,
                        never: false,
                    }),
                    Visibility::Never => state.pending.push(PendingDelegation {
                        addr: to,
                        resource,
                        units,
                        reads_remaining: 0,
                        never: true,
                    }),
                }
            }
            _ => {}
        }

        state.broadcasts.push((op, true));
        state.broadcast_txids.insert(tx.txid.clone());
        Ok(BroadcastAck {
            result: true,
            txid: Some(tx.txid.clone()),
            code: None,
            message: None,
        })
    }

    async fn get_transaction_info(&self, txid: &str) -> Result<TransactionInfo> {
        let state = self.state.lock().unwrap();
        if state.broadcast_txids.contains(txid) {
            return Ok(serde_json::from_value(serde_json::json!({
                "id": txid,
                "blockNumber": 100,
                "receipt": {"result": "SUCCESS"},
            }))?);
        }
        Ok(TransactionInfo::default())
    }

    async fn now_block_number(&self) -> Result<u64> {
        Ok(1_000)
    }
}

pub fn two_view_cluster(state: &Arc<Mutex<ChainState>>) -> NodeCluster<FakeNode> {
    NodeCluster {
        full: FakeNode::new("full", state.clone()),
        solidity: FakeNode::new("solidity", state.clone()),
        remote_solidity: None,
    }
}

pub fn test_config() -> AppConfig {
    test_config_with_ops("transfer,freeze_balance_v2,delegate_resource,undelegate_resource")
}

pub fn test_config_with_ops(allowed_csv: &str) -> AppConfig {
    AppConfig {
        profile: NetworkProfile {
            kind: NetworkKind::Testnet,
            activation_cost_sun: 1_000_000,
            energy_per_trx_fallback: 76.28,
            bandwidth_per_trx_fallback: 1_000.0,
        },
        endpoints: EndpointsConfig {
            node_type: "local",
            full_url: "http://fake".to_string(),
            solidity_url: "http://fake".to_string(),
            remote_solidity_url: None,
            api_key: None,
            timeout: Duration::from_secs(10),
            retries: 3,
        },
        pool_wallet: pool_address(),
        usdt_contract: usdt_contract(),
        activation_mode: ActivationMode::Transfer,
        keys: KeysConfig {
            owner_key_hex: None,
            control_key_hex: Some(CONTROL_KEY_HEX.to_string()),
            activation_key_hex: None,
            permission_id: 2,
            allowed_ops: ControlOps::parse_csv(allowed_csv).unwrap(),
            fallback_to_owner: false,
        },
        plan: PlanParams::default(),
        estimates: EstimateConfig {
            usdt_energy_per_transfer: 14_650,
            usdt_bandwidth_per_transfer: 345,
        },
        timing: TimingConfig {
            rpc_timeout: Duration::from_secs(10),
            rpc_retries: 3,
            poll_interval: Duration::from_millis(500),
            poll_attempts: 10,
            preparation_timeout: Duration::from_secs(60),
        },
    }
}
