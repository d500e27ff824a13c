//! The gas station itself: one injected service value composing the probe,
//! simulator, oracle, activator, delegator and verifier into
//! `prepare_for_usdt`, plus the read-only `dry_run` / `health` / `status`
//! surfaces.

use crate::activate::{activate, ActivationArgs};
use crate::broadcast::Broadcaster;
use crate::config::AppConfig;
use crate::delegate::{delegate, DelegateArgs};
use crate::metrics::StationTelemetry;
use crate::oracle::{self, ResourceYields};
use crate::plan::{build_plan, DelegationPlan};
use crate::report::{
    CapacityReport, DryRunReport, EfficiencyReport, ErrorKind, HealthReport, PreparationResult,
    StatusReport, StepError, Strategy, VerificationReport,
};
use crate::signer::{Signer, SigningMode};
use crate::simulate::{self, SimulationResult};
use crate::snapshot::{
    fetch_snapshot, stake_breakdown, staking_efficiency_pct, ResourceSnapshot,
    NOMINAL_BANDWIDTH_UNITS_PER_TRX, NOMINAL_ENERGY_UNITS_PER_TRX,
};
use crate::verify;
use anyhow::{Context, Result};
use std::time::Instant;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tron::client::{NodeClient, NodeCluster};
use tron::resources::{ChainFees, ResourceStakeTotals, SUN_PER_TRX};
use tron::{ResourceCode, TronAddress, TronWallet};

pub struct GasStation<C> {
    cluster: NodeCluster<C>,
    signer: Signer,
    activation_key: Option<TronWallet>,
    cfg: AppConfig,
    telemetry: StationTelemetry,
    /// Serializes every broadcast originating from the pool wallet.
    broadcast_lock: Mutex<()>,
}

#[derive(Default)]
struct PrepState {
    warnings: Vec<String>,
    errors: Vec<StepError>,
    delegations: Vec<crate::report::DelegationOutcome>,
    required_energy: u64,
    required_bandwidth: u64,
    verification: VerificationReport,
    success: bool,
}

impl<C: NodeClient> GasStation<C> {
    pub fn new(cluster: NodeCluster<C>, cfg: AppConfig, telemetry: StationTelemetry) -> Result<Self> {
        let control = cfg
            .keys
            .control_key_hex
            .as_deref()
            .map(TronWallet::from_hex)
            .transpose()
            .context("GAS_WALLET_CONTROL_PRIVATE_KEY")?;
        let owner = cfg
            .keys
            .owner_key_hex
            .as_deref()
            .map(TronWallet::from_hex)
            .transpose()
            .context("GAS_WALLET_PRIVATE_KEY")?;
        let activation_key = cfg
            .keys
            .activation_key_hex
            .as_deref()
            .map(TronWallet::from_hex)
            .transpose()
            .context("GAS_ACTIVATION_PRIVATE_KEY")?;

        let mode = match (&control, &owner, cfg.keys.fallback_to_owner) {
            (Some(_), Some(_), true) => SigningMode::ControlWithOwnerFallback,
            (Some(_), _, _) => SigningMode::ControlOnly,
            (None, Some(_), _) => SigningMode::OwnerOnly,
            (None, None, _) => anyhow::bail!("no signing key configured"),
        };
        let signer = Signer::new(
            mode,
            control,
            owner,
            cfg.keys.permission_id,
            cfg.keys.allowed_ops,
        )?;

        Ok(Self {
            cluster,
            signer,
            activation_key,
            cfg,
            telemetry,
            broadcast_lock: Mutex::new(()),
        })
    }

    pub fn pool_wallet(&self) -> TronAddress {
        self.cfg.pool_wallet
    }

    /// The single primary entrypoint. Never returns an error: every fault is
    /// folded into the result.
    pub async fn prepare_for_usdt(
        &self,
        target: TronAddress,
        cancel: &CancellationToken,
    ) -> PreparationResult {
        let started = Instant::now();
        let deadline = started + self.cfg.timing.preparation_timeout;
        let mut state = PrepState::default();

        tracing::info!(address = %target, "preparing target for USDT");
        let strategy = self.run_pipeline(target, cancel, deadline, &mut state).await;
        let execution_time_ms = started.elapsed().as_millis() as u64;

        self.telemetry
            .preparation(strategy.as_str(), state.success, execution_time_ms);
        tracing::info!(
            address = %target,
            strategy = strategy.as_str(),
            success = state.success,
            ms = execution_time_ms,
            "preparation finished"
        );

        PreparationResult {
            success: state.success,
            strategy,
            target: target.to_base58check(),
            execution_time_ms,
            required_energy: state.required_energy,
            required_bandwidth: state.required_bandwidth,
            delegations: state.delegations,
            verification: state.verification,
            warnings: state.warnings,
            errors: state.errors,
        }
    }

    async fn run_pipeline(
        &self,
        target: TronAddress,
        cancel: &CancellationToken,
        deadline: Instant,
        state: &mut PrepState,
    ) -> Strategy {
        // probe
        if let Some(stop) = checkpoint(cancel, deadline, "probe", state) {
            return stop;
        }
        let probe = match fetch_snapshot(&self.cluster, target).await {
            Ok(snapshot) => snapshot,
            Err(err) => {
                state.errors.push(StepError::new(
                    ErrorKind::Network,
                    "probe",
                    format!("{err:#}"),
                ));
                return Strategy::ProbeFailed;
            }
        };
        if verify::usdt_ready(&probe) {
            state.verification = PreparationResult::snapshot_verification(&probe, 0, 0);
            state.success = true;
            return Strategy::AlreadyReady;
        }

        // simulate
        if let Some(stop) = checkpoint(cancel, deadline, "simulate", state) {
            return stop;
        }
        let sim = self.simulate_for(target, &probe, state).await;

        // plan
        if let Some(stop) = checkpoint(cancel, deadline, "plan", state) {
            return stop;
        }
        let yields = self.read_yields(state).await;
        let plan = match build_plan(&sim, &yields, &self.cfg.plan) {
            Ok(plan) => plan,
            Err(err) => {
                state.errors.push(StepError::new(
                    ErrorKind::Config,
                    "plan",
                    format!("{err:#}"),
                ));
                return Strategy::CompletePreparation;
            }
        };
        state.required_energy = plan.need_energy_units;
        state.required_bandwidth = plan.need_bandwidth_units;

        if let Err(err) = self.check_pool_funds(&plan, probe.activated).await {
            state.errors.push(err);
            return Strategy::CompletePreparation;
        }

        // activate if needed
        if !probe.activated {
            if let Some(stop) = checkpoint(cancel, deadline, "activate", state) {
                return stop;
            }
            let broadcaster =
                Broadcaster::new(&self.cluster.full, &self.broadcast_lock, &self.telemetry);
            let args = ActivationArgs {
                pool_wallet: self.cfg.pool_wallet,
                target,
                mode: self.cfg.activation_mode,
                activation_cost_sun: self.cfg.profile.activation_cost_sun,
                poll_interval: self.cfg.timing.poll_interval,
                poll_attempts: self.cfg.timing.poll_attempts,
            };
            match activate(
                &self.cluster,
                &broadcaster,
                &self.signer,
                self.activation_key.as_ref(),
                cancel,
                &args,
            )
            .await
            {
                Ok(outcome) => {
                    self.telemetry.activation(true);
                    state.warnings.extend(outcome.warnings);
                }
                Err(step) => {
                    self.telemetry.activation(false);
                    let cancelled = step.kind == ErrorKind::Cancelled;
                    state.errors.push(step);
                    return if cancelled {
                        Strategy::Cancelled
                    } else {
                        Strategy::ActivationFailed
                    };
                }
            }
        }

        // delegate ENERGY, then BANDWIDTH; independent broadcasts.
        for (resource, units, freeze_sun, units_per_trx, baseline) in [
            (
                ResourceCode::Energy,
                plan.need_energy_units,
                plan.energy_trx_to_freeze_sun,
                yields.energy_per_trx,
                probe.energy_available,
            ),
            (
                ResourceCode::Bandwidth,
                plan.need_bandwidth_units,
                plan.bandwidth_trx_to_freeze_sun,
                yields.bandwidth_per_trx,
                probe.bandwidth_available,
            ),
        ] {
            if let Some(stop) = checkpoint(cancel, deadline, "delegate", state) {
                return stop;
            }
            let broadcaster =
                Broadcaster::new(&self.cluster.full, &self.broadcast_lock, &self.telemetry);
            let args = DelegateArgs {
                pool_wallet: self.cfg.pool_wallet,
                target,
                resource,
                units,
                freeze_sun,
                units_per_trx,
                baseline_available: baseline,
                poll_interval: self.cfg.timing.poll_interval,
                poll_attempts: self.cfg.timing.poll_attempts,
            };
            let report = delegate(
                &self.cluster,
                &broadcaster,
                &self.signer,
                &self.telemetry,
                cancel,
                &args,
            )
            .await;

            let cancelled = report.errors.iter().any(|e| e.kind == ErrorKind::Cancelled);
            state.delegations.push(report.outcome);
            state.warnings.extend(report.warnings);
            state.errors.extend(report.errors);
            if cancelled {
                return Strategy::Cancelled;
            }
        }

        // verify
        let final_snapshot = fetch_snapshot(&self.cluster, target).await.unwrap_or(probe);
        state.verification = PreparationResult::snapshot_verification(
            &final_snapshot,
            state.required_energy,
            state.required_bandwidth,
        );

        let covered = |resource: ResourceCode, observed_ok: bool| {
            observed_ok
                || state
                    .delegations
                    .iter()
                    .any(|d| d.resource == resource && d.satisfied)
        };
        let success = state.verification.usdt_ready
            || (state.verification.activated
                && covered(ResourceCode::Energy, state.verification.energy_ok)
                && covered(ResourceCode::Bandwidth, state.verification.bandwidth_ok));
        state.success = success;

        Strategy::CompletePreparation
    }

    async fn simulate_for(
        &self,
        target: TronAddress,
        probe: &ResourceSnapshot,
        state: &mut PrepState,
    ) -> SimulationResult {
        // A not-yet-activated target cannot be the simulation sender; proxy
        // through the pool wallet and pay the new-holder penalty.
        let proxy = if probe.activated {
            target
        } else {
            self.cfg.pool_wallet
        };

        match simulate::simulate_usdt_transfer(
            &self.cluster.full,
            proxy,
            target,
            self.cfg.usdt_contract,
            1,
        )
        .await
        {
            Ok(sim) if probe.activated => sim,
            Ok(sim) => sim.with_proxy_penalty(),
            Err(err) => {
                self.telemetry.simulation_fallback();
                state.warnings.push(format!("simulation_fallback: {err:#}"));
                simulate::fallback_estimate(false)
            }
        }
    }

    async fn read_yields(&self, state: &mut PrepState) -> ResourceYields {
        let mut yields = match oracle::read_yields(
            &self.cluster.full,
            self.cfg.pool_wallet,
            &self.cfg.profile,
        )
        .await
        {
            Ok(yields) => yields,
            Err(err) => {
                state
                    .warnings
                    .push(format!("oracle_unreachable: {err:#}"));
                // Run the fallback chain with an empty chain view.
                oracle::derive_yields(
                    ChainFees {
                        energy_fee_sun_per_energy: None,
                        tx_fee_sun_per_byte: None,
                    },
                    ResourceStakeTotals {
                        total_limit: 0,
                        total_weight: 0,
                    },
                    &self.cfg.profile,
                )
            }
        };
        state.warnings.append(&mut yields.warnings);
        yields
    }

    async fn check_pool_funds(
        &self,
        plan: &DelegationPlan,
        target_activated: bool,
    ) -> Result<(), StepError> {
        let account = self
            .cluster
            .full
            .get_account(self.cfg.pool_wallet)
            .await
            .map_err(|err| StepError::new(ErrorKind::Network, "plan", format!("{err:#}")))?;

        let mut cost = plan.total_freeze_sun();
        if !target_activated {
            cost += self.cfg.profile.activation_cost_sun;
        }
        if account.balance < cost {
            return Err(StepError::new(
                ErrorKind::InsufficientFunds,
                "plan",
                format!(
                    "pool wallet holds {} sun, preparation needs {} sun",
                    account.balance, cost
                ),
            ));
        }
        Ok(())
    }

    /// The plan and its cost without a single broadcast.
    pub async fn dry_run(&self, target: TronAddress) -> DryRunReport {
        let mut warnings = Vec::new();

        let probe = match fetch_snapshot(&self.cluster, target).await {
            Ok(snapshot) => snapshot,
            Err(err) => {
                warnings.push(format!("probe_failed: {err:#}"));
                return DryRunReport {
                    target: target.to_base58check(),
                    plan: None,
                    estimated_cost_trx: 0.0,
                    feasible: false,
                    warnings,
                };
            }
        };
        if verify::usdt_ready(&probe) {
            warnings.push("already_ready".to_string());
            return DryRunReport {
                target: target.to_base58check(),
                plan: None,
                estimated_cost_trx: 0.0,
                feasible: true,
                warnings,
            };
        }

        let mut state = PrepState::default();
        let sim = self.simulate_for(target, &probe, &mut state).await;
        let yields = self.read_yields(&mut state).await;
        warnings.append(&mut state.warnings);

        let plan = match build_plan(&sim, &yields, &self.cfg.plan) {
            Ok(plan) => plan,
            Err(err) => {
                warnings.push(format!("plan_failed: {err:#}"));
                return DryRunReport {
                    target: target.to_base58check(),
                    plan: None,
                    estimated_cost_trx: 0.0,
                    feasible: false,
                    warnings,
                };
            }
        };

        let mut cost = plan.total_freeze_sun();
        if !probe.activated {
            cost += self.cfg.profile.activation_cost_sun;
        }
        let feasible = match self.cluster.full.get_account(self.cfg.pool_wallet).await {
            Ok(account) => account.balance >= cost,
            Err(err) => {
                warnings.push(format!("pool_balance_unknown: {err:#}"));
                false
            }
        };

        DryRunReport {
            target: target.to_base58check(),
            plan: Some(plan),
            estimated_cost_trx: cost as f64 / SUN_PER_TRX as f64,
            feasible,
            warnings,
        }
    }

    pub async fn health(&self) -> HealthReport {
        let mut warnings = Vec::new();
        let mut latest_block = 0u64;
        let mut connected = false;
        let mut latency_ms = 0u64;

        for (i, view) in self.cluster.read_views().into_iter().enumerate() {
            let started = Instant::now();
            match view.now_block_number().await {
                Ok(block) => {
                    let ms = started.elapsed().as_millis() as u64;
                    latest_block = latest_block.max(block);
                    if i == 0 {
                        connected = true;
                        latency_ms = ms;
                    }
                }
                Err(err) => {
                    warnings.push(format!("{}: {err:#}", view.label()));
                }
            }
        }

        HealthReport {
            node_type: self.cfg.endpoints.node_type.to_string(),
            connected,
            latest_block,
            latency_ms,
            warnings,
        }
    }

    pub async fn status(&self) -> Result<StatusReport> {
        let account = self
            .cluster
            .full
            .get_account(self.cfg.pool_wallet)
            .await
            .context("read pool account")?;
        let resources = self
            .cluster
            .full
            .get_account_resources(self.cfg.pool_wallet)
            .await
            .context("read pool resources")?;

        let breakdown = stake_breakdown(&account);
        let balance_trx = account.balance as f64 / SUN_PER_TRX as f64;

        let energy_capacity =
            resources.energy_limit / self.cfg.estimates.usdt_energy_per_transfer;
        let bandwidth_capacity = (resources.net_limit + resources.free_net_limit)
            / self.cfg.estimates.usdt_bandwidth_per_transfer;
        let activations = if self.cfg.profile.activation_cost_sun > 0 {
            account.balance / self.cfg.profile.activation_cost_sun
        } else {
            0
        };

        let efficiency = EfficiencyReport {
            energy: staking_efficiency_pct(
                breakdown.energy_trx,
                resources.energy_limit,
                NOMINAL_ENERGY_UNITS_PER_TRX,
            ),
            bandwidth: staking_efficiency_pct(
                breakdown.bandwidth_trx,
                resources.net_limit,
                NOMINAL_BANDWIDTH_UNITS_PER_TRX,
            ),
        };

        let mut warnings = Vec::new();
        if balance_trx < 10.0 {
            warnings.push("critical: pool TRX balance below 10 TRX".to_string());
        } else if balance_trx < 50.0 {
            warnings.push("low pool TRX balance, consider refilling".to_string());
        }
        let daily = energy_capacity.min(bandwidth_capacity);
        if daily < 10 {
            warnings.push(format!("critical: very low daily transfer capacity: {daily}"));
        } else if daily < 100 {
            warnings.push(format!("low daily transfer capacity: {daily}"));
        }
        if efficiency.energy < 80.0 {
            warnings.push("energy staking efficiency below 80%".to_string());
        }
        if efficiency.bandwidth < 80.0 {
            warnings.push("bandwidth staking efficiency below 80%".to_string());
        }

        Ok(StatusReport {
            pool_wallet_address: self.cfg.pool_wallet.to_base58check(),
            balance_trx,
            energy_available: resources.energy_available(),
            bandwidth_available: resources.bandwidth_available(),
            staked_energy_trx: breakdown.energy_trx,
            staked_bandwidth_trx: breakdown.bandwidth_trx,
            efficiency,
            permission_id: self.signer.permission_id(),
            control_ops_allowed: self.signer.allowed_ops().names(),
            fallback_to_owner: self.signer.fallback_to_owner(),
            capacity: CapacityReport {
                daily_usdt_transfers: daily,
                account_activations: activations,
                bottleneck: if energy_capacity <= bandwidth_capacity {
                    ResourceCode::Energy
                } else {
                    ResourceCode::Bandwidth
                },
            },
            warnings,
        })
    }
}

fn checkpoint(
    cancel: &CancellationToken,
    deadline: Instant,
    step: &'static str,
    state: &mut PrepState,
) -> Option<Strategy> {
    if cancel.is_cancelled() {
        state.errors.push(StepError::new(
            ErrorKind::Cancelled,
            step,
            "preparation cancelled",
        ));
        return Some(Strategy::Cancelled);
    }
    if Instant::now() >= deadline {
        state.errors.push(StepError::new(
            ErrorKind::Timeout,
            step,
            "preparation exceeded its overall timeout",
        ));
        return Some(Strategy::Timeout);
    }
    None
}
