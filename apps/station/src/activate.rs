//! Creates the target account on-chain, either by sending the activation TRX
//! or by issuing an `AccountCreateContract`.

use crate::broadcast::{Broadcaster, SendError};
use crate::config::ActivationMode;
use crate::poll::{poll_until, PollOutcome};
use crate::report::{ErrorKind, StepError};
use crate::signer::{ControlOp, Signer, SigningPlan};
use crate::snapshot::fetch_snapshot;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tron::client::{NodeClient, NodeCluster};
use tron::{TronAddress, TronWallet};

pub struct ActivationArgs {
    pub pool_wallet: TronAddress,
    pub target: TronAddress,
    pub mode: ActivationMode,
    pub activation_cost_sun: u64,
    pub poll_interval: Duration,
    pub poll_attempts: u32,
}

#[derive(Debug, Clone, Default)]
pub struct ActivationOutcome {
    pub txid: Option<String>,
    pub warnings: Vec<String>,
}

/// Activates `target`. A dedicated activation key sidesteps the permission
/// model entirely; otherwise the control signer must allow the operation.
pub async fn activate<C: NodeClient>(
    cluster: &NodeCluster<C>,
    broadcaster: &Broadcaster<'_, C>,
    signer: &Signer,
    activation_key: Option<&TronWallet>,
    cancel: &CancellationToken,
    args: &ActivationArgs,
) -> Result<ActivationOutcome, StepError> {
    let op = match args.mode {
        ActivationMode::Transfer => ControlOp::Transfer,
        ActivationMode::CreateAccount => ControlOp::CreateAccount,
    };

    let plan = match activation_key {
        // The dedicated key signs its own transfers with its owner permission.
        Some(wallet) => SigningPlan {
            wallet,
            permission_id: None,
        },
        None => signer.plan(op).map_err(|refusal| {
            StepError::new(ErrorKind::Permission, "activate", refusal.to_string())
        })?,
    };
    let from = match activation_key {
        Some(wallet) => wallet.address(),
        None => args.pool_wallet,
    };

    let sent = match args.mode {
        ActivationMode::Transfer => {
            broadcaster
                .send("activate:transfer", plan, |node, permission_id| {
                    node.build_transfer(from, args.target, args.activation_cost_sun, permission_id)
                })
                .await
        }
        ActivationMode::CreateAccount => {
            broadcaster
                .send("activate:create_account", plan, |node, permission_id| {
                    node.build_create_account(from, args.target, permission_id)
                })
                .await
        }
    };

    let sent = sent.map_err(|err| match err {
        SendError::Rejected { .. } => StepError::new(ErrorKind::Broadcast, "activate", err.to_string()),
        other => StepError::new(ErrorKind::Network, "activate", other.to_string()),
    })?;

    // Existence (or a balance) is enough to proceed; an unconfirmed txinfo
    // only downgrades to a warning.
    let target = args.target;
    let outcome = poll_until(
        cancel,
        args.poll_interval,
        args.poll_attempts,
        || fetch_snapshot(cluster, target),
        |snapshot| snapshot.activated || snapshot.balance_sun > 0,
    )
    .await;

    let mut warnings = Vec::new();
    match outcome {
        PollOutcome::Satisfied(_) => {
            match broadcaster_confirmation(cluster, &sent.txid).await {
                Some(true) => {}
                _ => warnings.push(format!("activation_unconfirmed:{}", sent.txid)),
            }
            tracing::info!(address = %target, txid = %sent.txid, "target activated");
            Ok(ActivationOutcome {
                txid: Some(sent.txid),
                warnings,
            })
        }
        PollOutcome::Cancelled => Err(StepError::new(
            ErrorKind::Cancelled,
            "activate",
            "cancelled while waiting for activation",
        )),
        PollOutcome::Exhausted(_) => Err(StepError::new(
            ErrorKind::VerificationTimeout,
            "activate",
            format!("account {target} not visible after activation broadcast {}", sent.txid),
        )),
    }
}

async fn broadcaster_confirmation<C: NodeClient>(
    cluster: &NodeCluster<C>,
    txid: &str,
) -> Option<bool> {
    match cluster.full.get_transaction_info(txid).await {
        Ok(info) => Some(info.included() && !info.failed()),
        Err(_) => None,
    }
}
