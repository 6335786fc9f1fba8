//! Simplified year-by-year reactor physics.
//!
//! These are illustrative closed-form approximations rather than a validated reactor physics code.
//! All functions are pure and assume their inputs have already been validated.
use crate::model::{FuelType, ReactorParameters};
use crate::units::{Dimensionless, Energy, Mass, MassPerEnergy};

/// Hours in a (non-leap) year
pub const HOURS_PER_YEAR: f64 = 8760.0;

/// High-level waste produced per MWh for standard uranium fuel
pub const WASTE_PER_MWH: MassPerEnergy = MassPerEnergy::new(0.0003);

/// CO2 emissions avoided per MWh compared to fossil generation
pub const CO2_AVOIDED_PER_MWH: MassPerEnergy = MassPerEnergy::new(0.5);

/// Base accident frequency per reactor-year
const BASE_ACCIDENT_PROBABILITY: f64 = 1e-4;

/// Fractional efficiency retained each year as the plant ages
const ANNUAL_EFFICIENCY_RETENTION: f64 = 0.995;

/// Range within which the aged thermal efficiency is held
const AGED_EFFICIENCY_BOUNDS: (f64, f64) = (0.25, 0.42);

/// Energy generated over `years` years with the given parameters.
///
/// Linear in `years`: the annual output is computed once and scaled.
pub fn calculate_energy_output(params: &ReactorParameters, years: f64) -> Energy {
    let uptime_factor = params.uptime_percent / 100.0;
    let energy_density = params.fuel_type.properties().energy_density;
    let annual = params.capacity.value()
        * HOURS_PER_YEAR
        * uptime_factor
        * params.thermal_efficiency
        * energy_density;

    Energy::new(annual * years)
}

/// Energy generated in a single year
pub fn calculate_annual_energy(params: &ReactorParameters) -> Energy {
    calculate_energy_output(params, 1.0)
}

/// Mass of high-level waste produced when generating `energy`
pub fn calculate_waste_production(energy: Energy, fuel_type: FuelType) -> Mass {
    WASTE_PER_MWH * energy * Dimensionless(fuel_type.properties().waste_factor)
}

/// Fuel burnup (GWd/MTU) reached in the given year of operation
pub fn calculate_fuel_burnup(params: &ReactorParameters, year: u32) -> f64 {
    let enrichment_factor = params.enrichment_percent / 5.0;
    let degradation = (1.0 - f64::from(year) * 0.01).max(0.8);

    50.0 * enrichment_factor * degradation
}

/// Thermal efficiency after `year` years of ageing.
///
/// The result is clamped to [0.25, 0.42], so a plant never ages below 25% efficiency and an
/// implausibly efficient design is capped at 42%.
pub fn calculate_reactor_efficiency(params: &ReactorParameters, year: u32) -> f64 {
    let (min, max) = AGED_EFFICIENCY_BOUNDS;
    (params.thermal_efficiency * ANNUAL_EFFICIENCY_RETENTION.powi(year as i32)).clamp(min, max)
}

/// Probability of a serious accident occurring in the given year of operation
pub fn calculate_accident_probability(params: &ReactorParameters, year: u32) -> f64 {
    let ageing_factor = 1.0 + f64::from(year) * 0.02;
    // Low availability is taken as a sign of maintenance problems
    let maintenance_factor = if params.uptime_percent < 80.0 {
        1.5
    } else {
        1.0
    };
    let control_rod_factor = if params.control_rod_insertion < 30.0 {
        1.2
    } else {
        0.9
    };

    BASE_ACCIDENT_PROBABILITY
        * params.reactor_type.accident_factor()
        * ageing_factor
        * maintenance_factor
        * control_rod_factor
}

/// Fuel centreline temperature (°C) when running at `power_level` MW
pub fn calculate_fuel_temperature(params: &ReactorParameters, power_level: f64) -> f64 {
    let capacity = params.capacity.value();
    let power_fraction = if capacity > 0.0 {
        power_level / capacity
    } else {
        0.0
    };

    600.0 + power_fraction * 1000.0 + params.thermal_efficiency * 500.0
}

/// Coolant outlet temperature (°C) for the given fuel temperature
pub fn calculate_coolant_temperature(params: &ReactorParameters, fuel_temperature: f64) -> f64 {
    let inlet_temperature = 280.0;
    let flow_rate_factor = params.coolant_flow_rate / 1000.0;
    let heat_transfer = (fuel_temperature - inlet_temperature) * 0.3 * flow_rate_factor;

    inlet_temperature + heat_transfer
}

/// Simplified k-eff-like reactivity indicator for the given year of operation
pub fn calculate_reactivity(params: &ReactorParameters, year: u32) -> f64 {
    let burnup_effect = -0.001 * f64::from(year);
    let control_effect = -params.control_rod_insertion * 0.002;
    let temperature_effect = -0.00003;

    1.0 + burnup_effect
        + control_effect
        + temperature_effect
        + params.moderator_type.reactivity_bonus()
}

/// Number of major maintenance outages over the plant lifetime
pub fn calculate_maintenance_cycles(params: &ReactorParameters) -> u32 {
    params.plant_lifespan_years / params.reactor_type.maintenance_cycle_years()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::reactor;
    use crate::model::{ModeratorType, ReactorType};
    use crate::units::Capacity;
    use float_cmp::assert_approx_eq;
    use rstest::rstest;
    use strum::IntoEnumIterator;

    #[rstest]
    fn test_energy_output(reactor: ReactorParameters) {
        // 1000 MW * 8760 h * 0.9 * 0.33
        let expected = 2_601_720.0;
        assert_approx_eq!(
            f64,
            calculate_annual_energy(&reactor).value(),
            expected,
            epsilon = 1e-6
        );
    }

    #[rstest]
    fn test_energy_output_linear_in_years(reactor: ReactorParameters) {
        let one = calculate_energy_output(&reactor, 1.0);
        let two = calculate_energy_output(&reactor, 2.0);
        assert_eq!(two.value(), 2.0 * one.value());
    }

    #[rstest]
    fn test_energy_output_zero_capacity(mut reactor: ReactorParameters) {
        reactor.capacity = Capacity(0.0);
        assert_eq!(calculate_annual_energy(&reactor), Energy(0.0));
    }

    #[rstest]
    #[case(FuelType::U235, 0.3)]
    #[case(FuelType::Th232, 0.09)]
    fn test_waste_production(#[case] fuel_type: FuelType, #[case] expected: f64) {
        let waste = calculate_waste_production(Energy(1000.0), fuel_type);
        assert_approx_eq!(f64, waste.value(), expected, epsilon = 1e-12);
    }

    #[rstest]
    fn test_reactor_efficiency_ageing(reactor: ReactorParameters) {
        assert_eq!(calculate_reactor_efficiency(&reactor, 0), 0.33);
        assert_approx_eq!(
            f64,
            calculate_reactor_efficiency(&reactor, 10),
            0.33 * 0.995f64.powi(10)
        );
    }

    #[rstest]
    #[case(0.25, 39, 0.25)]
    #[case(0.35, 39, 0.35 * 0.995f64.powi(39))]
    #[case(0.33, 80, 0.25)]
    #[case(0.45, 0, 0.42)]
    #[case(0.45, 20, 0.45 * 0.995f64.powi(20))]
    fn test_reactor_efficiency_bounds(
        mut reactor: ReactorParameters,
        #[case] thermal_efficiency: f64,
        #[case] year: u32,
        #[case] expected: f64,
    ) {
        reactor.thermal_efficiency = thermal_efficiency;
        let efficiency = calculate_reactor_efficiency(&reactor, year);
        assert_approx_eq!(f64, efficiency, expected);
        assert!((0.25..=0.42).contains(&efficiency));
    }

    #[rstest]
    fn test_accident_probability_increases_with_age(mut reactor: ReactorParameters) {
        for reactor_type in ReactorType::iter() {
            reactor.reactor_type = reactor_type;
            for year in 0..60 {
                assert!(
                    calculate_accident_probability(&reactor, year + 1)
                        > calculate_accident_probability(&reactor, year)
                );
            }
        }
    }

    #[rstest]
    fn test_accident_probability_factors(mut reactor: ReactorParameters) {
        // PWR, uptime 90, rods at 50%
        assert_approx_eq!(f64, calculate_accident_probability(&reactor, 0), 0.9e-4);

        reactor.uptime_percent = 75.0;
        reactor.control_rod_insertion = 10.0;
        assert_approx_eq!(
            f64,
            calculate_accident_probability(&reactor, 0),
            1e-4 * 1.5 * 1.2
        );
    }

    #[rstest]
    fn test_thermal_model(reactor: ReactorParameters) {
        let fuel_temperature = calculate_fuel_temperature(&reactor, 900.0);
        assert_approx_eq!(f64, fuel_temperature, 600.0 + 900.0 + 165.0);

        let coolant_temperature = calculate_coolant_temperature(&reactor, fuel_temperature);
        assert_approx_eq!(
            f64,
            coolant_temperature,
            280.0 + (fuel_temperature - 280.0) * 0.3 * 15.0
        );
    }

    #[rstest]
    fn test_fuel_temperature_zero_capacity(mut reactor: ReactorParameters) {
        reactor.capacity = Capacity(0.0);
        assert!(calculate_fuel_temperature(&reactor, 0.0).is_finite());
    }

    #[rstest]
    fn test_reactivity(mut reactor: ReactorParameters) {
        assert_approx_eq!(
            f64,
            calculate_reactivity(&reactor, 0),
            1.0 - 0.1 - 0.00003
        );

        reactor.moderator_type = ModeratorType::HeavyWater;
        assert_approx_eq!(
            f64,
            calculate_reactivity(&reactor, 10),
            1.0 - 0.01 - 0.1 - 0.00003 + 0.05
        );
    }

    #[rstest]
    fn test_fuel_burnup(reactor: ReactorParameters) {
        assert_approx_eq!(f64, calculate_fuel_burnup(&reactor, 0), 50.0);
        // Degradation bottoms out at 80%
        assert_approx_eq!(f64, calculate_fuel_burnup(&reactor, 30), 40.0);
    }

    #[rstest]
    fn test_maintenance_cycles(mut reactor: ReactorParameters) {
        assert_eq!(calculate_maintenance_cycles(&reactor), 6);
        reactor.reactor_type = ReactorType::Smr;
        assert_eq!(calculate_maintenance_cycles(&reactor), 10);
    }
}
