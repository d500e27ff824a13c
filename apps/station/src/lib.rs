//! Gas station core: prepares arbitrary TRON addresses to send a USDT
//! transfer at zero cost, by estimating the exact ENERGY/BANDWIDTH need,
//! activating the address when necessary, and delegating pool resources
//! through a permission-scoped control signer.

pub mod activate;
pub mod broadcast;
pub mod config;
pub mod delegate;
pub mod metrics;
pub mod oracle;
pub mod plan;
pub mod poll;
pub mod report;
pub mod signer;
pub mod simulate;
pub mod snapshot;
pub mod station;
pub mod verify;

pub use config::{load_config, AppConfig};
pub use metrics::StationTelemetry;
pub use report::PreparationResult;
pub use station::GasStation;
