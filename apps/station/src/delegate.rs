//! Freeze-and-delegate of one resource from the pool wallet to the target.

use crate::broadcast::{Broadcaster, SendError};
use crate::metrics::StationTelemetry;
use crate::report::{DelegationOutcome, ErrorKind, StepError};
use crate::signer::{ControlOp, Signer};
use crate::verify;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tron::client::{NodeClient, NodeCluster};
use tron::resources::SUN_PER_TRX;
use tron::{ResourceCode, TronAddress};

/// Stake 2.0 minimum lock: 3 days of 3-second blocks.
pub const DELEGATION_LOCK_BLOCKS: u64 = 86_400;

pub struct DelegateArgs {
    pub pool_wallet: TronAddress,
    pub target: TronAddress,
    pub resource: ResourceCode,
    pub units: u64,
    pub freeze_sun: u64,
    pub units_per_trx: f64,
    /// The target's availability before any broadcast, from the probe.
    pub baseline_available: u64,
    pub poll_interval: Duration,
    pub poll_attempts: u32,
}

#[derive(Debug)]
pub struct DelegationReport {
    pub outcome: DelegationOutcome,
    pub warnings: Vec<String>,
    pub errors: Vec<StepError>,
}

fn location(resource: ResourceCode) -> &'static str {
    match resource {
        ResourceCode::Energy => "delegate:energy",
        ResourceCode::Bandwidth => "delegate:bandwidth",
    }
}

fn resource_name(resource: ResourceCode) -> &'static str {
    match resource {
        ResourceCode::Energy => "energy",
        ResourceCode::Bandwidth => "bandwidth",
    }
}

/// Freezes TRX on the pool wallet, delegates the stake to the target, then
/// watches for the resource to land. An accepted broadcast whose freeze
/// covers the requested units counts as delivered even if every poll still
/// shows the lagging view.
pub async fn delegate<C: NodeClient>(
    cluster: &NodeCluster<C>,
    broadcaster: &Broadcaster<'_, C>,
    signer: &Signer,
    telemetry: &StationTelemetry,
    cancel: &CancellationToken,
    args: &DelegateArgs,
) -> DelegationReport {
    let where_ = location(args.resource);
    let mut outcome = DelegationOutcome {
        resource: args.resource,
        units_requested: args.units,
        trx_frozen_sun: 0,
        freeze_txid: None,
        txid: None,
        broadcast_ok: false,
        observed_increase: 0,
        satisfied: false,
    };
    let report = |outcome: DelegationOutcome, warnings, errors| DelegationReport {
        outcome,
        warnings,
        errors,
    };

    let freeze_plan = match signer.plan(ControlOp::FreezeBalanceV2) {
        Ok(plan) => plan,
        Err(refusal) => {
            telemetry.delegation(resource_name(args.resource), false);
            return report(
                outcome,
                Vec::new(),
                vec![StepError::new(ErrorKind::Permission, where_, refusal.to_string())],
            );
        }
    };

    let frozen = broadcaster
        .send("freeze_balance_v2", freeze_plan, |node, permission_id| {
            node.build_freeze_balance_v2(
                args.pool_wallet,
                args.freeze_sun,
                args.resource,
                permission_id,
            )
        })
        .await;
    match frozen {
        Ok(sent) => {
            outcome.trx_frozen_sun = args.freeze_sun;
            outcome.freeze_txid = Some(sent.txid);
        }
        Err(err) => {
            telemetry.delegation(resource_name(args.resource), false);
            return report(outcome, Vec::new(), vec![send_error(where_, err)]);
        }
    }

    let delegate_plan = match signer.plan(ControlOp::DelegateResource) {
        Ok(plan) => plan,
        Err(refusal) => {
            telemetry.delegation(resource_name(args.resource), false);
            return report(
                outcome,
                Vec::new(),
                vec![StepError::new(ErrorKind::Permission, where_, refusal.to_string())],
            );
        }
    };

    let sent = broadcaster
        .send("delegate_resource", delegate_plan, |node, permission_id| {
            node.build_delegate_resource(
                args.pool_wallet,
                args.target,
                args.freeze_sun,
                args.resource,
                DELEGATION_LOCK_BLOCKS,
                permission_id,
            )
        })
        .await;
    match sent {
        Ok(sent) => {
            outcome.txid = Some(sent.txid);
            outcome.broadcast_ok = true;
        }
        Err(err) => {
            telemetry.delegation(resource_name(args.resource), false);
            return report(outcome, Vec::new(), vec![send_error(where_, err)]);
        }
    }

    let started = Instant::now();
    let verified = verify::wait_for_increase(
        cluster,
        cancel,
        args.poll_interval,
        args.poll_attempts,
        args.target,
        args.resource,
        args.baseline_available,
    )
    .await;
    telemetry.verify(
        resource_name(args.resource),
        verified.observed_increase > 0,
        started.elapsed().as_millis() as u64,
    );

    outcome.observed_increase = verified.observed_increase;

    let mut warnings = Vec::new();
    let mut errors = Vec::new();
    if verified.observed_increase > 0 {
        outcome.satisfied = true;
    } else if verified.cancelled {
        errors.push(StepError::new(
            ErrorKind::Cancelled,
            where_,
            "cancelled while waiting for delegated resource",
        ));
    } else if freeze_covers_units(args.freeze_sun, args.units, args.units_per_trx) {
        // The math guarantees coverage; the views are just behind.
        outcome.satisfied = true;
        warnings.push(format!(
            "verification_timeout:{}",
            resource_name(args.resource)
        ));
    } else {
        errors.push(StepError::new(
            ErrorKind::VerificationTimeout,
            where_,
            format!(
                "no {} increase observed on {} within the verification window",
                resource_name(args.resource),
                args.target
            ),
        ));
    }

    telemetry.delegation(resource_name(args.resource), outcome.satisfied);
    report(outcome, warnings, errors)
}

fn send_error(where_: &'static str, err: SendError) -> StepError {
    match err {
        SendError::Rejected { .. } => StepError::new(ErrorKind::Broadcast, where_, err.to_string()),
        other => StepError::new(ErrorKind::Network, where_, other.to_string()),
    }
}

fn freeze_covers_units(freeze_sun: u64, units: u64, units_per_trx: f64) -> bool {
    if freeze_sun < SUN_PER_TRX || units_per_trx <= 0.0 {
        return false;
    }
    freeze_sun as f64 / SUN_PER_TRX as f64 * units_per_trx >= units as f64
}
