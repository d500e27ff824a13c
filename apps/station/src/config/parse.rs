use super::{ActivationMode, NetworkKind};
use anyhow::{Context, Result};
use tron::TronAddress;

pub(super) fn parse_network(s: &str) -> Result<NetworkKind> {
    match s.trim().to_ascii_lowercase().as_str() {
        "mainnet" => Ok(NetworkKind::Mainnet),
        "testnet" | "nile" => Ok(NetworkKind::Testnet),
        other => anyhow::bail!("TRON_NETWORK must be mainnet or testnet, got {other:?}"),
    }
}

pub(super) fn parse_activation_mode(s: &str) -> Result<ActivationMode> {
    match s.trim().to_ascii_lowercase().as_str() {
        "transfer" => Ok(ActivationMode::Transfer),
        "create_account" => Ok(ActivationMode::CreateAccount),
        other => anyhow::bail!(
            "GAS_ACCOUNT_ACTIVATION_MODE must be transfer or create_account, got {other:?}"
        ),
    }
}

pub(super) fn parse_address(name: &str, s: &str) -> Result<TronAddress> {
    TronAddress::from_base58check(s.trim()).with_context(|| format!("parse {name}"))
}

pub(super) fn opt_key(s: &str) -> Option<String> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// TRX amounts from the environment arrive as decimals; convert to sun.
pub(super) fn trx_to_sun(trx: f64) -> Result<u64> {
    if !(trx.is_finite() && trx >= 0.0) {
        anyhow::bail!("TRX amount must be a non-negative number, got {trx}");
    }
    Ok((trx * 1_000_000.0).round() as u64)
}
