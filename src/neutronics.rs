//! Spatial neutron flux and power distributions and criticality estimates.
//!
//! Based on one-group diffusion theory in its fundamental mode: the radial shape depends on the core
//! geometry and the axial shape is always a cosine. The spatial grids are deterministic for a given
//! set of parameters and timestep.
use crate::model::ReactorParameters;
use itertools::iproduct;
use serde::Serialize;
use std::f64::consts::PI;

/// Number of points along each axis of the spatial grid
pub const GRID_SIZE: usize = 20;

/// Prompt neutron lifetime for a light-water reactor (s)
pub const PROMPT_NEUTRON_LIFETIME: f64 = 1e-4;

/// Doppler temperature coefficient for U-235 fuel (pcm/°C)
const DOPPLER_COEFFICIENT: f64 = -2.5;

/// Reference thermal flux for a 1000 MW core at 5% enrichment (n/(cm²·s))
const REFERENCE_FLUX: f64 = 1e13;

/// Neutron flux at one point in the core
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NeutronFluxPoint {
    /// Normalised radial position (0-1)
    pub radial_position: f64,
    /// Normalised axial position (0-1)
    pub axial_position: f64,
    /// Thermal (moderated) flux (n/(cm²·s))
    pub thermal_flux: f64,
    /// Fast (unmoderated) flux (n/(cm²·s))
    pub fast_flux: f64,
}

/// Power density at one point in the core
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PowerDistributionPoint {
    /// Normalised radial position (0-1)
    pub radial_position: f64,
    /// Normalised axial position (0-1)
    pub axial_position: f64,
    /// Local power density (MW/m³)
    pub power_density: f64,
    /// Local power density relative to the core average
    pub peaking_factor: f64,
}

/// Iterate over the normalised (r, z) positions of the spatial grid in row-major order
fn grid_positions() -> impl Iterator<Item = (f64, f64)> {
    let step = |i: usize| i as f64 / (GRID_SIZE - 1) as f64;
    iproduct!(0..GRID_SIZE, 0..GRID_SIZE).map(move |(i, j)| (step(i), step(j)))
}

/// Axial cosine shape at normalised height `z`
fn axial_profile(z: f64) -> f64 {
    (PI * (z - 0.5)).cos()
}

/// Reduction in flux as the fuel burns up
fn burnup_factor(params: &ReactorParameters, timestep: f64) -> f64 {
    (-timestep / (f64::from(params.plant_lifespan_years) * 2.0)).exp()
}

/// Calculate the 2D neutron flux distribution over a 20×20 (r, z) grid.
///
/// # Arguments
///
/// * `params` - Reactor parameters
/// * `timestep` - Time into the fuel cycle, used for the burnup decay term
pub fn calculate_neutron_flux(params: &ReactorParameters, timestep: f64) -> Vec<NeutronFluxPoint> {
    let moderating_ratio = params.moderator_type.properties().moderating_ratio;
    let fuel_factor = params.fuel_type.properties().flux_factor;
    let enrichment_factor = params.enrichment_percent / 5.0;
    let base_flux =
        REFERENCE_FLUX * (params.capacity.value() / 1000.0) * fuel_factor * enrichment_factor;
    let burnup = burnup_factor(params, timestep);

    grid_positions()
        .map(|(r, z)| {
            let shape = base_flux * params.geometry.radial_profile(r) * axial_profile(z) * burnup;
            NeutronFluxPoint {
                radial_position: r,
                axial_position: z,
                thermal_flux: (shape * moderating_ratio / 100.0).max(0.0),
                fast_flux: (shape * 0.3).max(0.0),
            }
        })
        .collect()
}

/// Calculate the 2D power density distribution over a 20×20 (r, z) grid.
///
/// Peaking factors are local power density divided by the core-average power density.
pub fn calculate_power_distribution(
    params: &ReactorParameters,
    timestep: f64,
) -> Vec<PowerDistributionPoint> {
    let core_volume = params.geometry.core_volume();
    let average_power_density =
        params.capacity.value() * params.thermal_efficiency * 1000.0 / core_volume;
    let burnup = burnup_factor(params, timestep);

    let densities: Vec<_> = grid_positions()
        .map(|(r, z)| {
            let density = average_power_density
                * params.geometry.radial_profile(r)
                * axial_profile(z)
                * burnup;
            (r, z, density)
        })
        .collect();
    let max_density = densities
        .iter()
        .map(|(_, _, density)| *density)
        .fold(0.0, f64::max);

    densities
        .into_iter()
        .map(|(r, z, density)| {
            let power_density = density.max(0.0);
            let peaking_factor = if max_density > 0.0 {
                power_density / average_power_density
            } else {
                1.0
            };
            PowerDistributionPoint {
                radial_position: r,
                axial_position: z,
                power_density,
                peaking_factor,
            }
        })
        .collect()
}

/// Estimate the effective multiplication factor for the given year of operation.
///
/// The result is clamped to [0.8, 1.2].
pub fn calculate_keff(params: &ReactorParameters, year: u32) -> f64 {
    let moderating_ratio = params.moderator_type.properties().moderating_ratio;

    // Fresh fuel is slightly supercritical
    let mut keff = 1.05;
    keff += (params.enrichment_percent - 3.5) * 0.02;
    keff += moderating_ratio / 1000.0;
    keff -= f64::from(year) * 0.008;
    keff -= params.control_rod_insertion * 0.005;
    keff += DOPPLER_COEFFICIENT * 0.0001;
    // Equilibrium xenon
    keff -= 0.03;

    keff.clamp(0.8, 1.2)
}

/// Neutron generation time (s), longer for better moderators
pub fn calculate_neutron_generation_time(params: &ReactorParameters) -> f64 {
    PROMPT_NEUTRON_LIFETIME * params.moderator_type.generation_time_multiplier()
}
