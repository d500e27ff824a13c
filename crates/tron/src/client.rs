use crate::address::TronAddress;
use crate::protocol::{
    Account, AccountResources, BroadcastAck, BuiltTransaction, ChainParameters,
    ConstantCallResult, NowBlock, SignedTransaction, TransactionInfo,
};
use anyhow::{Context, Result};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};

pub const DEFAULT_RPC_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_RPC_RETRIES: u32 = 3;

/// TRON resource kinds accepted by the staking endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceCode {
    Energy,
    Bandwidth,
}

impl ResourceCode {
    pub fn api_name(self) -> &'static str {
        match self {
            ResourceCode::Energy => "ENERGY",
            ResourceCode::Bandwidth => "BANDWIDTH",
        }
    }
}

impl std::fmt::Display for ResourceCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            ResourceCode::Energy => "energy",
            ResourceCode::Bandwidth => "bandwidth",
        })
    }
}

/// Arguments for a read-only `triggerconstantcontract` call.
#[derive(Debug, Clone)]
pub struct ConstantCallRequest {
    pub owner: TronAddress,
    pub contract: TronAddress,
    pub selector: String,
    pub parameter: String,
}

/// One TRON node endpoint.
///
/// The station talks to several of these (local full, local solidity, remote
/// solidity); tests substitute an in-memory fake. Build and broadcast methods
/// are only ever invoked on the full node of a cluster.
#[allow(async_fn_in_trait)]
pub trait NodeClient {
    fn label(&self) -> &str;

    async fn get_account(&self, addr: TronAddress) -> Result<Account>;
    async fn get_account_resources(&self, addr: TronAddress) -> Result<AccountResources>;
    async fn get_chain_parameters(&self) -> Result<ChainParameters>;
    async fn trigger_constant_contract(
        &self,
        req: &ConstantCallRequest,
    ) -> Result<ConstantCallResult>;

    async fn build_transfer(
        &self,
        from: TronAddress,
        to: TronAddress,
        amount_sun: u64,
        permission_id: Option<u8>,
    ) -> Result<BuiltTransaction>;
    async fn build_freeze_balance_v2(
        &self,
        owner: TronAddress,
        frozen_sun: u64,
        resource: ResourceCode,
        permission_id: Option<u8>,
    ) -> Result<BuiltTransaction>;
    async fn build_delegate_resource(
        &self,
        owner: TronAddress,
        receiver: TronAddress,
        balance_sun: u64,
        resource: ResourceCode,
        lock_period_blocks: u64,
        permission_id: Option<u8>,
    ) -> Result<BuiltTransaction>;
    async fn build_create_account(
        &self,
        owner: TronAddress,
        target: TronAddress,
        permission_id: Option<u8>,
    ) -> Result<BuiltTransaction>;

    async fn broadcast(&self, tx: &SignedTransaction) -> Result<BroadcastAck>;
    async fn get_transaction_info(&self, txid: &str) -> Result<TransactionInfo>;
    async fn now_block_number(&self) -> Result<u64>;
}

/// Which API tree a node serves reads from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Full,
    Solidity,
}

impl NodeKind {
    fn read_prefix(self) -> &'static str {
        match self {
            NodeKind::Full => "wallet",
            NodeKind::Solidity => "walletsolidity",
        }
    }
}

/// `reqwest`-backed [`NodeClient`] with per-call timeout and bounded retry.
#[derive(Clone)]
pub struct HttpNode {
    inner: Arc<HttpNodeInner>,
}

struct HttpNodeInner {
    label: String,
    base_url: String,
    kind: NodeKind,
    api_key: Option<String>,
    http: reqwest::Client,
    retries: u32,
    last_latency_ms: AtomicU64,
    last_ok: AtomicBool,
}

impl HttpNode {
    pub fn new(
        label: impl Into<String>,
        base_url: impl Into<String>,
        kind: NodeKind,
        api_key: Option<String>,
        timeout: Duration,
        retries: u32,
    ) -> Result<Self> {
        let http = reqwest::ClientBuilder::new()
            .timeout(timeout)
            .build()
            .context("build reqwest client")?;
        Ok(Self {
            inner: Arc::new(HttpNodeInner {
                label: label.into(),
                base_url: base_url.into().trim_end_matches('/').to_string(),
                kind,
                api_key,
                http,
                retries: retries.max(1),
                last_latency_ms: AtomicU64::new(0),
                last_ok: AtomicBool::new(false),
            }),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.inner.base_url
    }

    /// Latency of the most recent successful call, if any.
    pub fn last_latency_ms(&self) -> Option<u64> {
        if self.inner.last_ok.load(Ordering::Relaxed) {
            Some(self.inner.last_latency_ms.load(Ordering::Relaxed))
        } else {
            None
        }
    }

    fn read_path(&self, method: &str) -> String {
        format!(
            "{}/{}/{}",
            self.inner.base_url,
            self.inner.kind.read_prefix(),
            method
        )
    }

    fn write_path(&self, method: &str) -> String {
        format!("{}/wallet/{}", self.inner.base_url, method)
    }

    async fn post_json<B: Serialize, T: DeserializeOwned>(&self, url: &str, body: &B) -> Result<T> {
        let mut last_err: Option<anyhow::Error> = None;
        for attempt in 0..self.inner.retries {
            if attempt > 0 {
                tokio::time::sleep(Duration::from_millis(200 * u64::from(attempt))).await;
            }
            let started = Instant::now();
            match self.try_post(url, body).await {
                Ok(value) => {
                    let ms = started.elapsed().as_millis() as u64;
                    self.inner.last_latency_ms.store(ms, Ordering::Relaxed);
                    self.inner.last_ok.store(true, Ordering::Relaxed);
                    return Ok(value);
                }
                Err(err) => {
                    self.inner.last_ok.store(false, Ordering::Relaxed);
                    tracing::debug!(
                        node = %self.inner.label,
                        url,
                        attempt,
                        err = %err,
                        "tron rpc call failed"
                    );
                    last_err = Some(err);
                }
            }
        }
        Err(last_err
            .unwrap_or_else(|| anyhow::anyhow!("no attempts made"))
            .context(format!("POST {url} after {} tries", self.inner.retries)))
    }

    async fn try_post<B: Serialize, T: DeserializeOwned>(&self, url: &str, body: &B) -> Result<T> {
        let mut req = self.inner.http.post(url).json(body);
        if let Some(key) = &self.inner.api_key {
            req = req.header("TRON-PRO-API-KEY", key);
        }
        let resp = req.send().await.context("http send")?;
        let status = resp.status();
        let text = resp.text().await.context("read body")?;
        if !status.is_success() {
            anyhow::bail!("http status {}: {}", status.as_u16(), text.trim());
        }
        serde_json::from_str(&text).with_context(|| format!("parse response: {}", text.trim()))
    }
}

impl NodeClient for HttpNode {
    fn label(&self) -> &str {
        &self.inner.label
    }

    async fn get_account(&self, addr: TronAddress) -> Result<Account> {
        self.post_json(
            &self.read_path("getaccount"),
            &serde_json::json!({"address": addr.to_base58check(), "visible": true}),
        )
        .await
    }

    async fn get_account_resources(&self, addr: TronAddress) -> Result<AccountResources> {
        self.post_json(
            &self.read_path("getaccountresource"),
            &serde_json::json!({"address": addr.to_base58check(), "visible": true}),
        )
        .await
    }

    async fn get_chain_parameters(&self) -> Result<ChainParameters> {
        self.post_json(
            &self.write_path("getchainparameters"),
            &serde_json::json!({}),
        )
        .await
    }

    async fn trigger_constant_contract(
        &self,
        req: &ConstantCallRequest,
    ) -> Result<ConstantCallResult> {
        self.post_json(
            &self.read_path("triggerconstantcontract"),
            &serde_json::json!({
                "owner_address": req.owner.to_base58check(),
                "contract_address": req.contract.to_base58check(),
                "function_selector": req.selector,
                "parameter": req.parameter,
                "visible": true,
            }),
        )
        .await
    }

    async fn build_transfer(
        &self,
        from: TronAddress,
        to: TronAddress,
        amount_sun: u64,
        permission_id: Option<u8>,
    ) -> Result<BuiltTransaction> {
        let mut body = serde_json::json!({
            "owner_address": from.to_base58check(),
            "to_address": to.to_base58check(),
            "amount": amount_sun,
            "visible": true,
        });
        stamp_permission(&mut body, permission_id);
        self.post_json(&self.write_path("createtransaction"), &body).await
    }

    async fn build_freeze_balance_v2(
        &self,
        owner: TronAddress,
        frozen_sun: u64,
        resource: ResourceCode,
        permission_id: Option<u8>,
    ) -> Result<BuiltTransaction> {
        let mut body = serde_json::json!({
            "owner_address": owner.to_base58check(),
            "frozen_balance": frozen_sun,
            "resource": resource.api_name(),
            "visible": true,
        });
        stamp_permission(&mut body, permission_id);
        self.post_json(&self.write_path("freezebalancev2"), &body).await
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
        let mut body = serde_json::json!({
            "owner_address": owner.to_base58check(),
            "receiver_address": receiver.to_base58check(),
            "balance": balance_sun,
            "resource": resource.api_name(),
            "lock": true,
            "lock_period": lock_period_blocks,
            "visible": true,
        });
        stamp_permission(&mut body, permission_id);
        self.post_json(&self.write_path("delegateresource"), &body).await
    }

    async fn build_create_account(
        &self,
        owner: TronAddress,
        target: TronAddress,
        permission_id: Option<u8>,
    ) -> Result<BuiltTransaction> {
        let mut body = serde_json::json!({
            "owner_address": owner.to_base58check(),
            "account_address": target.to_base58check(),
            "visible": true,
        });
        stamp_permission(&mut body, permission_id);
        self.post_json(&self.write_path("createaccount"), &body).await
    }

    async fn broadcast(&self, tx: &SignedTransaction) -> Result<BroadcastAck> {
        self.post_json(&self.write_path("broadcasttransaction"), tx).await
    }

    async fn get_transaction_info(&self, txid: &str) -> Result<TransactionInfo> {
        self.post_json(
            &self.read_path("gettransactioninfobyid"),
            &serde_json::json!({"value": txid}),
        )
        .await
    }

    async fn now_block_number(&self) -> Result<u64> {
        let block: NowBlock = self
            .post_json(&self.read_path("getnowblock"), &serde_json::json!({}))
            .await?;
        Ok(block.block_header.raw_data.number)
    }
}

fn stamp_permission(body: &mut serde_json::Value, permission_id: Option<u8>) {
    if let (Some(id), Some(map)) = (permission_id, body.as_object_mut()) {
        map.insert("Permission_id".to_string(), serde_json::json!(id));
    }
}

/// Values that can be folded element-wise, keeping the larger element. Used
/// by the multi-view reads to mask index lag between endpoints.
pub trait MergeMax {
    fn merge_max(self, other: Self) -> Self;
}

/// The station's view onto a set of node endpoints: a full node for writes
/// plus one or more (possibly lagging) read views.
#[derive(Clone)]
pub struct NodeCluster<C> {
    pub full: C,
    pub solidity: C,
    pub remote_solidity: Option<C>,
}

impl<C: NodeClient> NodeCluster<C> {
    pub fn read_views(&self) -> Vec<&C> {
        let mut views = vec![&self.full, &self.solidity];
        if let Some(remote) = &self.remote_solidity {
            views.push(remote);
        }
        views
    }

    /// Runs `read` against every view in parallel and folds the successful
    /// responses with [`MergeMax`]. Fails only when every view fails, with
    /// the per-endpoint errors joined into one.
    pub async fn parallel_max<'a, T, F, Fut>(&'a self, read: F) -> Result<T>
    where
        T: MergeMax,
        F: Fn(&'a C) -> Fut,
        Fut: Future<Output = Result<T>> + 'a,
    {
        let views = self.read_views();
        let results = futures::future::join_all(views.iter().map(|view| read(*view))).await;

        let mut merged: Option<T> = None;
        let mut errors: Vec<String> = Vec::new();
        for (view, result) in views.iter().zip(results) {
            match result {
                Ok(value) => {
                    merged = Some(match merged {
                        Some(acc) => acc.merge_max(value),
                        None => value,
                    });
                }
                Err(err) => errors.push(format!("{}: {err:#}", view.label())),
            }
        }

        merged.with_context(|| format!("all endpoints failed: {}", errors.join("; ")))
    }
}
