use anyhow::{Context, Result};
use station::{load_config, GasStation, StationTelemetry};
use tokio_util::sync::CancellationToken;
use tron::client::{HttpNode, NodeCluster, NodeKind};
use tron::TronAddress;

const USAGE: &str = "usage: station <prepare|dry-run> <address> | station <status|health>";

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cfg = load_config()?;
    let telemetry = StationTelemetry::new();

    let cluster = NodeCluster {
        full: HttpNode::new(
            "full",
            &cfg.endpoints.full_url,
            NodeKind::Full,
            cfg.endpoints.api_key.clone(),
            cfg.endpoints.timeout,
            cfg.endpoints.retries,
        )?,
        solidity: HttpNode::new(
            "solidity",
            &cfg.endpoints.solidity_url,
            NodeKind::Solidity,
            cfg.endpoints.api_key.clone(),
            cfg.endpoints.timeout,
            cfg.endpoints.retries,
        )?,
        remote_solidity: cfg
            .endpoints
            .remote_solidity_url
            .as_ref()
            .map(|url| {
                HttpNode::new(
                    "remote_solidity",
                    url,
                    NodeKind::Solidity,
                    cfg.endpoints.api_key.clone(),
                    cfg.endpoints.timeout,
                    cfg.endpoints.retries,
                )
            })
            .transpose()?,
    };

    tracing::info!(
        network = %cfg.profile.kind,
        node_type = cfg.endpoints.node_type,
        pool_wallet = %cfg.pool_wallet,
        "gas station starting"
    );

    let station = GasStation::new(cluster, cfg, telemetry)?;

    let args: Vec<String> = std::env::args().skip(1).collect();
    let ok = match args.first().map(String::as_str) {
        Some("prepare") => {
            let target = target_arg(&args)?;
            let cancel = CancellationToken::new();
            let prep = station.prepare_for_usdt(target, &cancel);
            tokio::pin!(prep);
            let result = tokio::select! {
                result = &mut prep => result,
                _ = tokio::signal::ctrl_c() => {
                    // Cancel and let the pipeline wind down with its partials.
                    cancel.cancel();
                    prep.await
                }
            };
            print_json(&result)?;
            result.success
        }
        Some("dry-run") => {
            let target = target_arg(&args)?;
            let report = station.dry_run(target).await;
            print_json(&report)?;
            report.feasible
        }
        Some("status") => {
            let report = station.status().await?;
            print_json(&report)?;
            true
        }
        Some("health") => {
            let report = station.health().await;
            print_json(&report)?;
            report.connected
        }
        _ => anyhow::bail!(USAGE),
    };

    if !ok {
        std::process::exit(1);
    }
    Ok(())
}

fn target_arg(args: &[String]) -> Result<TronAddress> {
    let raw = args.get(1).with_context(|| USAGE.to_string())?;
    TronAddress::from_base58check(raw)
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
