//! The structured results every public operation returns. Field names are
//! stable: the API facade forwards these verbatim as JSON.

use crate::plan::DelegationPlan;
use crate::snapshot::ResourceSnapshot;
use serde::Serialize;
use tron::ResourceCode;

/// How far a preparation got, or why it stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    AlreadyReady,
    CompletePreparation,
    ProbeFailed,
    ActivationFailed,
    Cancelled,
    Timeout,
}

impl Strategy {
    pub fn as_str(self) -> &'static str {
        match self {
            Strategy::AlreadyReady => "already_ready",
            Strategy::CompletePreparation => "complete_preparation",
            Strategy::ProbeFailed => "probe_failed",
            Strategy::ActivationFailed => "activation_failed",
            Strategy::Cancelled => "cancelled",
            Strategy::Timeout => "timeout",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Config,
    Network,
    Simulation,
    InsufficientFunds,
    Permission,
    Broadcast,
    VerificationTimeout,
    Cancelled,
    Timeout,
}

impl ErrorKind {
    pub fn retryable(self) -> bool {
        matches!(
            self,
            ErrorKind::Network
                | ErrorKind::Simulation
                | ErrorKind::VerificationTimeout
                | ErrorKind::Cancelled
                | ErrorKind::Timeout
        )
    }
}

/// One recorded fault. The orchestrator never throws; it folds these into the
/// result instead.
#[derive(Debug, Clone, Serialize)]
pub struct StepError {
    pub kind: ErrorKind,
    #[serde(rename = "where")]
    pub location: &'static str,
    pub retryable: bool,
    pub message: String,
}

impl StepError {
    pub fn new(kind: ErrorKind, location: &'static str, message: impl Into<String>) -> Self {
        Self {
            kind,
            location,
            retryable: kind.retryable(),
            message: message.into(),
        }
    }
}

/// Per-resource delegation outcome.
#[derive(Debug, Clone, Serialize)]
pub struct DelegationOutcome {
    pub resource: ResourceCode,
    pub units_requested: u64,
    pub trx_frozen_sun: u64,
    pub freeze_txid: Option<String>,
    pub txid: Option<String>,
    pub broadcast_ok: bool,
    pub observed_increase: u64,
    /// Whether this delegation counts as delivered: an observed increase, or
    /// an accepted broadcast whose freeze math guarantees coverage.
    pub satisfied: bool,
}

#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct VerificationReport {
    pub energy_ok: bool,
    pub bandwidth_ok: bool,
    pub activated: bool,
    pub usdt_ready: bool,
}

/// Result of `prepare_for_usdt`.
#[derive(Debug, Clone, Serialize)]
pub struct PreparationResult {
    pub success: bool,
    pub strategy: Strategy,
    pub target: String,
    pub execution_time_ms: u64,
    pub required_energy: u64,
    pub required_bandwidth: u64,
    pub delegations: Vec<DelegationOutcome>,
    pub verification: VerificationReport,
    pub warnings: Vec<String>,
    pub errors: Vec<StepError>,
}

/// Result of `dry_run`: the plan and its cost, with nothing broadcast.
#[derive(Debug, Clone, Serialize)]
pub struct DryRunReport {
    pub target: String,
    pub plan: Option<DelegationPlan>,
    pub estimated_cost_trx: f64,
    pub feasible: bool,
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub node_type: String,
    pub connected: bool,
    pub latest_block: u64,
    pub latency_ms: u64,
    pub warnings: Vec<String>,
}

/// How many operations the pool can currently subsidize.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct CapacityReport {
    pub daily_usdt_transfers: u64,
    pub account_activations: u64,
    pub bottleneck: ResourceCode,
}

/// Resource limit vs the nominal yield of the staked TRX, as a percentage.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct EfficiencyReport {
    pub energy: f64,
    pub bandwidth: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct StatusReport {
    pub pool_wallet_address: String,
    pub balance_trx: f64,
    pub energy_available: u64,
    pub bandwidth_available: u64,
    pub staked_energy_trx: f64,
    pub staked_bandwidth_trx: f64,
    pub efficiency: EfficiencyReport,
    pub permission_id: u8,
    pub control_ops_allowed: Vec<&'static str>,
    pub fallback_to_owner: bool,
    pub capacity: CapacityReport,
    pub warnings: Vec<String>,
}

impl PreparationResult {
    pub fn snapshot_verification(
        snapshot: &ResourceSnapshot,
        required_energy: u64,
        required_bandwidth: u64,
    ) -> VerificationReport {
        VerificationReport {
            energy_ok: snapshot.energy_available as f64 >= 0.9 * required_energy as f64,
            bandwidth_ok: snapshot.bandwidth_available as f64 >= 0.9 * required_bandwidth as f64,
            activated: snapshot.activated,
            usdt_ready: crate::verify::usdt_ready(snapshot),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_with_stable_field_names() {
        let result = PreparationResult {
            success: false,
            strategy: Strategy::ActivationFailed,
            target: "T...".into(),
            execution_time_ms: 12,
            required_energy: 7_090,
            required_bandwidth: 350,
            delegations: vec![],
            verification: VerificationReport::default(),
            warnings: vec!["verification_timeout:bandwidth".into()],
            errors: vec![StepError::new(ErrorKind::Permission, "activate", "denied")],
        };

        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["strategy"], "activation_failed");
        assert_eq!(json["errors"][0]["kind"], "permission");
        assert_eq!(json["errors"][0]["where"], "activate");
        assert_eq!(json["errors"][0]["retryable"], false);
        assert_eq!(json["required_energy"], 7_090);
    }

    #[test]
    fn retryability_follows_the_taxonomy() {
        assert!(ErrorKind::Network.retryable());
        assert!(ErrorKind::Simulation.retryable());
        assert!(!ErrorKind::Config.retryable());
        assert!(!ErrorKind::Permission.retryable());
        assert!(!ErrorKind::Broadcast.retryable());
        assert!(!ErrorKind::InsufficientFunds.retryable());
    }
}
