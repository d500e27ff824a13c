use super::env::Env;
use super::parse::{opt_key, parse_activation_mode, parse_address, parse_network, trx_to_sun};
use super::{
    ActivationMode, AppConfig, EndpointsConfig, EstimateConfig, KeysConfig, NetworkKind,
    NetworkProfile, TimingConfig,
};
use crate::plan::PlanParams;
use crate::signer::{ControlOp, ControlOps};
use anyhow::{Context, Result};
use std::time::Duration;
use tron::resources::SUN_PER_TRX;

/// Yield fallbacks per network; the mainnet energy figure is the long-run
/// ratio, the testnet one a live snapshot of the nile network.
const MAINNET_ENERGY_PER_TRX_FALLBACK: f64 = 2.38;
const TESTNET_ENERGY_PER_TRX_FALLBACK: f64 = 76.28;
const BANDWIDTH_PER_TRX_FALLBACK: f64 = 1_000.0;

pub fn load_config() -> Result<AppConfig> {
    let env: Env = envy::from_env().context("load station env config")?;
    from_env(env)
}

fn from_env(env: Env) -> Result<AppConfig> {
    let kind = parse_network(&env.tron_network)?;

    if env.gas_wallet_address.trim().is_empty() {
        anyhow::bail!("GAS_WALLET_ADDRESS must be set");
    }
    let pool_wallet = parse_address("GAS_WALLET_ADDRESS", &env.gas_wallet_address)?;

    let usdt_contract = match kind {
        NetworkKind::Mainnet => {
            parse_address("TRON_MAINNET_USDT_CONTRACT", &env.tron_mainnet_usdt_contract)?
        }
        NetworkKind::Testnet => {
            parse_address("TRON_TESTNET_USDT_CONTRACT", &env.tron_testnet_usdt_contract)?
        }
    };

    let activation_cost_trx = env.auto_activation_trx_amount.unwrap_or(match kind {
        NetworkKind::Mainnet => 1.5,
        NetworkKind::Testnet => 1.0,
    });
    let profile = NetworkProfile {
        kind,
        activation_cost_sun: trx_to_sun(activation_cost_trx)
            .context("AUTO_ACTIVATION_TRX_AMOUNT")?,
        energy_per_trx_fallback: env.energy_units_per_trx_estimate.unwrap_or(match kind {
            NetworkKind::Mainnet => MAINNET_ENERGY_PER_TRX_FALLBACK,
            NetworkKind::Testnet => TESTNET_ENERGY_PER_TRX_FALLBACK,
        }),
        bandwidth_per_trx_fallback: env
            .bandwidth_units_per_trx_estimate
            .unwrap_or(BANDWIDTH_PER_TRX_FALLBACK),
    };

    let endpoints = if env.tron_local_node_enabled {
        let (full, solidity, remote_solidity) = match kind {
            NetworkKind::Mainnet => (
                env.tron_mainnet_local_full_node,
                env.tron_mainnet_local_solidity_node,
                env.tron_remote_mainnet_solidity_node,
            ),
            NetworkKind::Testnet => (
                env.tron_testnet_local_full_node,
                env.tron_testnet_local_solidity_node,
                env.tron_remote_testnet_solidity_node,
            ),
        };
        EndpointsConfig {
            node_type: "local",
            full_url: full,
            solidity_url: solidity,
            remote_solidity_url: opt_key(&remote_solidity),
            api_key: env.tron_api_key.clone().and_then(|k| opt_key(&k)),
            timeout: Duration::from_secs(env.rpc_timeout_secs.max(1)),
            retries: env.rpc_retries.max(1),
        }
    } else {
        let (full, solidity) = match kind {
            NetworkKind::Mainnet => (
                env.tron_remote_mainnet_full_node,
                env.tron_remote_mainnet_solidity_node,
            ),
            NetworkKind::Testnet => (
                env.tron_remote_testnet_full_node,
                env.tron_remote_testnet_solidity_node,
            ),
        };
        EndpointsConfig {
            node_type: "remote",
            full_url: full,
            solidity_url: solidity,
            remote_solidity_url: None,
            api_key: env.tron_api_key.clone().and_then(|k| opt_key(&k)),
            timeout: Duration::from_secs(env.rpc_timeout_secs.max(1)),
            retries: env.rpc_retries.max(1),
        }
    };

    let allowed_ops = ControlOps::parse_csv(&env.gas_control_allowed_ops)
        .context("GAS_CONTROL_ALLOWED_OPS")?;
    let keys = KeysConfig {
        owner_key_hex: opt_key(&env.gas_wallet_private_key),
        control_key_hex: opt_key(&env.gas_wallet_control_private_key),
        activation_key_hex: opt_key(&env.gas_activation_private_key),
        permission_id: env.gas_wallet_control_permission_id,
        allowed_ops,
        fallback_to_owner: env.gas_control_fallback_to_owner,
    };
    if keys.control_key_hex.is_none() && keys.owner_key_hex.is_none() {
        anyhow::bail!(
            "GAS_WALLET_CONTROL_PRIVATE_KEY or GAS_WALLET_PRIVATE_KEY must be set"
        );
    }

    let activation_mode = parse_activation_mode(&env.gas_account_activation_mode)?;
    if activation_mode == ActivationMode::CreateAccount {
        let owner_reachable = keys.owner_key_hex.is_some()
            && (keys.fallback_to_owner || keys.control_key_hex.is_none());
        if !allowed_ops.contains(ControlOp::CreateAccount) && !owner_reachable {
            anyhow::bail!(
                "GAS_ACCOUNT_ACTIVATION_MODE=create_account but no configured signer may issue \
                 AccountCreateContract; grant create_account to the control permission or enable \
                 owner fallback"
            );
        }
        tracing::warn!(
            "create_account activation mode is node-build dependent; transfer mode is the tested path"
        );
    }

    let plan = PlanParams {
        energy_safety: env.delegation_safety_multiplier,
        bandwidth_safety: env.bandwidth_safety_multiplier,
        energy_floor_units: env.target_energy_units.unwrap_or(0),
        bandwidth_floor_units: env.target_bandwidth_units.unwrap_or(0),
        min_delegate_sun: env.min_delegate_trx.max(1) * SUN_PER_TRX,
    };
    if !(plan.energy_safety >= 1.0 && plan.energy_safety.is_finite()) {
        anyhow::bail!("DELEGATION_SAFETY_MULTIPLIER must be >= 1.0");
    }
    if !(plan.bandwidth_safety >= 1.0 && plan.bandwidth_safety.is_finite()) {
        anyhow::bail!("BANDWIDTH_SAFETY_MULTIPLIER must be >= 1.0");
    }

    Ok(AppConfig {
        profile,
        endpoints,
        pool_wallet,
        usdt_contract,
        activation_mode,
        keys,
        plan,
        estimates: EstimateConfig {
            usdt_energy_per_transfer: env.usdt_energy_per_transfer_estimate.max(1),
            usdt_bandwidth_per_transfer: env.usdt_bandwidth_per_transfer_estimate.max(1),
        },
        timing: TimingConfig {
            rpc_timeout: Duration::from_secs(env.rpc_timeout_secs.max(1)),
            rpc_retries: env.rpc_retries.max(1),
            poll_interval: Duration::from_millis(env.poll_interval_ms.max(100)),
            poll_attempts: env.poll_attempts.max(1),
            preparation_timeout: Duration::from_secs(env.preparation_timeout_secs.max(5)),
        },
    })
}
