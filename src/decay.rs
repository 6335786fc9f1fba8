//! Fission product inventories, decay heat and shielding estimates.
use crate::model::ReactorParameters;
use serde::Serialize;

/// Energy released per fission of U-235 (MeV)
const FISSION_ENERGY_MEV: f64 = 200.0;

/// Conversion factor from MeV to joules
const MEV_TO_JOULES: f64 = 1.602_176_634e-13;

const SECONDS_PER_YEAR: f64 = 365.25 * 24.0 * 3600.0;

/// Approximate fuelled core volume (cm³)
const CORE_VOLUME_CM3: f64 = 1e8;

/// Default acceptable dose rate outside the shielding (mSv/h)
pub const DEFAULT_TARGET_DOSE_RATE: f64 = 0.001;

/// Times after shutdown (hours) at which decay heat is evaluated, from 1 s to 1 year
pub const DECAY_HEAT_TIME_POINTS: [f64; 15] = [
    1.0 / 3600.0,
    10.0 / 3600.0,
    1.0,
    2.0,
    6.0,
    12.0,
    24.0,
    48.0,
    72.0,
    168.0,
    336.0,
    720.0,
    2160.0,
    4320.0,
    8760.0,
];

/// A tracked fission product
struct Isotope {
    name: &'static str,
    /// Decay constant (1/s)
    decay_constant: f64,
    /// Atoms produced per fission
    fission_yield: f64,
    /// Energy of the principal gamma emission (MeV), if any
    gamma_energy: Option<f64>,
}

const FISSION_PRODUCTS: [Isotope; 4] = [
    Isotope {
        name: "Xe-135",
        decay_constant: 2.09e-5,
        fission_yield: 0.00237,
        gamma_energy: None,
    },
    Isotope {
        name: "I-135",
        decay_constant: 2.92e-5,
        fission_yield: 0.0639,
        gamma_energy: None,
    },
    Isotope {
        name: "Cs-137",
        decay_constant: 7.30e-10,
        fission_yield: 0.0625,
        gamma_energy: Some(0.662),
    },
    Isotope {
        name: "Sr-90",
        decay_constant: 7.61e-10,
        fission_yield: 0.0593,
        gamma_energy: None,
    },
];

/// Inventory of one fission product at the end of an operating period
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FissionProductData {
    pub isotope: &'static str,
    /// Concentration (atoms/cm³)
    pub concentration: f64,
    /// Activity (Bq)
    pub activity: f64,
    /// Gamma dose rate at 1 m (mSv/h), zero for isotopes without a significant gamma line
    pub dose_rate: f64,
}

/// Decay heat at one time after shutdown
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DecayHeatData {
    /// Hours since shutdown
    pub time_after_shutdown: f64,
    /// Decay heat (MW thermal)
    pub decay_power: f64,
    /// Decay heat as a percentage of the operating thermal power
    pub percent_of_operating: f64,
}

/// Shielding thicknesses (cm) needed to reduce a dose rate to the target
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ShieldingRequirement {
    pub concrete: f64,
    pub lead: f64,
    pub water: f64,
}

/// Calculate the fission product inventory after `operating_years` years at full power.
///
/// Each isotope builds up towards its equilibrium concentration as
/// `N(t) = P / (V λ) (1 - e^(-λt))`.
pub fn calculate_fission_products(
    params: &ReactorParameters,
    operating_years: f64,
) -> Vec<FissionProductData> {
    let fissions_per_second =
        params.thermal_power() * 1e6 / (FISSION_ENERGY_MEV * MEV_TO_JOULES);
    let operating_seconds = operating_years * SECONDS_PER_YEAR;
    let total_fissions = fissions_per_second * operating_seconds;

    FISSION_PRODUCTS
        .iter()
        .map(|isotope| {
            let lambda = isotope.decay_constant;
            let production = total_fissions * isotope.fission_yield;
            let concentration =
                production / (CORE_VOLUME_CM3 * lambda) * (1.0 - (-lambda * operating_seconds).exp());
            let activity = lambda * concentration * CORE_VOLUME_CM3;
            let dose_rate = if isotope.gamma_energy.is_some() {
                activity * 1e-12
            } else {
                0.0
            };

            FissionProductData {
                isotope: isotope.name,
                concentration,
                activity,
                dose_rate,
            }
        })
        .collect()
}

/// Fraction of operating power released as decay heat `hours` after shutdown
fn decay_power_fraction(hours: f64) -> f64 {
    if hours < 1.0 {
        0.066 * (hours * 3600.0).powf(-0.2)
    } else if hours < 24.0 {
        0.022 * hours.powf(-0.3)
    } else if hours < 720.0 {
        0.010 * (hours / 24.0).powf(-0.35)
    } else {
        0.004 * (hours / 24.0).powf(-0.4)
    }
}

/// Calculate the decay heat curve after shutting down a reactor that ran for `operating_years`.
///
/// Reactors that have run for less than three years produce proportionally less decay heat.
pub fn calculate_decay_heat(params: &ReactorParameters, operating_years: f64) -> Vec<DecayHeatData> {
    let operating_power = params.thermal_power();
    let operating_time_factor = (operating_years / 3.0).powf(0.2).min(1.0);

    DECAY_HEAT_TIME_POINTS
        .iter()
        .map(|&hours| {
            let fraction = decay_power_fraction(hours) * operating_time_factor;
            DecayHeatData {
                time_after_shutdown: hours,
                decay_power: operating_power * fraction,
                percent_of_operating: fraction * 100.0,
            }
        })
        .collect()
}

/// Dose rate (mSv/h) at 1 m from spent fuel after `cooling_hours` hours of cooling
pub fn calculate_radiation_dose(params: &ReactorParameters, cooling_hours: f64) -> f64 {
    // R/h immediately after shutdown
    let initial_dose_rate = params.thermal_power() * 1000.0;
    let dose_rate = initial_dose_rate * (cooling_hours + 1.0).powf(-1.2);

    // 1 R is roughly 10 mSv
    dose_rate * 10.0
}

/// Thickness of each shielding material needed to attenuate `dose_rate` down to `target_dose_rate`.
///
/// If the dose rate is already at or below the target, no shielding is needed.
pub fn calculate_shielding_requirement(
    dose_rate: f64,
    target_dose_rate: f64,
) -> ShieldingRequirement {
    let attenuation = (dose_rate / target_dose_rate).ln().max(0.0);

    ShieldingRequirement {
        concrete: attenuation / 0.5,
        lead: attenuation / 1.5,
        water: attenuation / 0.1,
    }
}
