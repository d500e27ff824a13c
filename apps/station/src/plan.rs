//! Turns a simulation into TRX amounts to freeze per resource.

use crate::oracle::ResourceYields;
use crate::simulate::SimulationResult;
use anyhow::Result;
use serde::Serialize;
use tron::resources::{freeze_sun_for_units, SUN_PER_TRX};

/// Flat energy headroom on top of the safety multiplier.
pub const ENERGY_MARGIN_UNITS: u64 = 5_000;
/// Minimum bandwidth units worth delegating.
pub const MIN_BANDWIDTH_UNITS: u64 = 350;

#[derive(Debug, Clone, Copy)]
pub struct PlanParams {
    pub energy_safety: f64,
    pub bandwidth_safety: f64,
    /// Optional configured floors; 0 disables them.
    pub energy_floor_units: u64,
    pub bandwidth_floor_units: u64,
    pub min_delegate_sun: u64,
}

impl Default for PlanParams {
    fn default() -> Self {
        Self {
            energy_safety: 1.15,
            bandwidth_safety: 1.25,
            energy_floor_units: 0,
            bandwidth_floor_units: 0,
            min_delegate_sun: SUN_PER_TRX,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct DelegationPlan {
    pub need_energy_units: u64,
    pub need_bandwidth_units: u64,
    pub energy_trx_to_freeze_sun: u64,
    pub bandwidth_trx_to_freeze_sun: u64,
}

impl DelegationPlan {
    pub fn total_freeze_sun(&self) -> u64 {
        self.energy_trx_to_freeze_sun + self.bandwidth_trx_to_freeze_sun
    }
}

pub fn build_plan(
    sim: &SimulationResult,
    yields: &ResourceYields,
    params: &PlanParams,
) -> Result<DelegationPlan> {
    let need_energy_units = ((sim.energy_used as f64 * params.energy_safety).ceil() as u64
        + ENERGY_MARGIN_UNITS)
        .max(params.energy_floor_units);
    let need_bandwidth_units = ((sim.bandwidth_used as f64 * params.bandwidth_safety).ceil()
        as u64)
        .max(MIN_BANDWIDTH_UNITS)
        .max(params.bandwidth_floor_units);

    let min_sun = params.min_delegate_sun.max(SUN_PER_TRX);
    let energy_trx_to_freeze_sun =
        freeze_sun_for_units(need_energy_units, yields.energy_per_trx)?.max(min_sun);
    let bandwidth_trx_to_freeze_sun =
        freeze_sun_for_units(need_bandwidth_units, yields.bandwidth_per_trx)?.max(min_sun);

    Ok(DelegationPlan {
        need_energy_units,
        need_bandwidth_units,
        energy_trx_to_freeze_sun,
        bandwidth_trx_to_freeze_sun,
    })
}
