//! The pool-wallet broadcast critical section.
//!
//! All transactions originating from the pool wallet are serialized through
//! one async mutex so concurrent preparations cannot race on reference
//! blocks. The lock covers build + sign + broadcast and nothing else.

use crate::metrics::StationTelemetry;
use crate::signer::SigningPlan;
use std::fmt;
use std::future::Future;
use std::time::Instant;
use tokio::sync::Mutex;
use tron::client::NodeClient;
use tron::protocol::BuiltTransaction;

#[derive(Debug)]
pub enum SendError {
    /// The node could not build the transaction (bad request or transport).
    Build(anyhow::Error),
    /// Local signing failed.
    Sign(anyhow::Error),
    /// The broadcast POST itself failed.
    Transport(anyhow::Error),
    /// The node answered `result=false`.
    Rejected {
        code: Option<String>,
        message: String,
    },
}

impl fmt::Display for SendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SendError::Build(e) => write!(f, "build transaction: {e:#}"),
            SendError::Sign(e) => write!(f, "sign transaction: {e:#}"),
            SendError::Transport(e) => write!(f, "broadcast transaction: {e:#}"),
            SendError::Rejected { code, message } => match code {
                Some(code) => write!(f, "node rejected broadcast ({code}): {message}"),
                None => write!(f, "node rejected broadcast: {message}"),
            },
        }
    }
}

impl std::error::Error for SendError {}

#[derive(Debug, Clone)]
pub struct BroadcastSent {
    pub txid: String,
}

pub struct Broadcaster<'a, C> {
    node: &'a C,
    lock: &'a Mutex<()>,
    telemetry: &'a StationTelemetry,
}

impl<'a, C: NodeClient> Broadcaster<'a, C> {
    pub fn new(node: &'a C, lock: &'a Mutex<()>, telemetry: &'a StationTelemetry) -> Self {
        Self {
            node,
            lock,
            telemetry,
        }
    }

    /// Builds via `build`, signs with the planned key, and broadcasts, all
    /// under the pool-wallet lock.
    pub async fn send<F, Fut>(
        &self,
        op_label: &'static str,
        plan: SigningPlan<'_>,
        build: F,
    ) -> Result<BroadcastSent, SendError>
    where
        F: FnOnce(&'a C, Option<u8>) -> Fut,
        Fut: Future<Output = anyhow::Result<BuiltTransaction>>,
    {
        let _guard = self.lock.lock().await;
        let started = Instant::now();

        let result = self.send_locked(plan, build).await;
        let ms = started.elapsed().as_millis() as u64;
        self.telemetry.broadcast(op_label, result.is_ok(), ms);

        match &result {
            Ok(sent) => {
                tracing::info!(op = op_label, txid = %sent.txid, ms, "broadcast accepted");
            }
            Err(err) => {
                tracing::warn!(op = op_label, ms, err = %err, "broadcast failed");
            }
        }
        result
    }

    async fn send_locked<F, Fut>(
        &self,
        plan: SigningPlan<'_>,
        build: F,
    ) -> Result<BroadcastSent, SendError>
    where
        F: FnOnce(&'a C, Option<u8>) -> Fut,
        Fut: Future<Output = anyhow::Result<BuiltTransaction>>,
    {
        let built = build(self.node, plan.permission_id)
            .await
            .map_err(SendError::Build)?;
        let signed = plan
            .wallet
            .sign_transaction(&built)
            .map_err(SendError::Sign)?;
        let ack = self
            .node
            .broadcast(&signed)
            .await
            .map_err(SendError::Transport)?;

        if !ack.result {
            return Err(SendError::Rejected {
                code: ack.code.clone(),
                message: ack
                    .message_text()
                    .unwrap_or_else(|| "no message".to_string()),
            });
        }

        Ok(BroadcastSent { txid: signed.txid })
    }
}
