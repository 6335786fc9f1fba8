//! Fixtures for tests
use crate::model::{
    FinancialParameters, FuelType, Geometry, Model, ModeratorType, PolicyParameters,
    ReactorParameters, ReactorType,
};
use crate::simulation::{SimulationResult, run_simulation};
use crate::units::{Capacity, Dimensionless, Money, MoneyPerCapacity, MoneyPerEnergy, MoneyPerMass};
use rstest::fixture;

/// Assert that an error with the given message occurs
macro_rules! assert_error {
    ($result:expr, $msg:expr) => {
        assert_eq!(
            $result.unwrap_err().chain().next().unwrap().to_string(),
            $msg
        );
    };
}
pub(crate) use assert_error;

/// A 1000 MW pressurised water reactor, matching the default preset
#[fixture]
pub fn reactor() -> ReactorParameters {
    ReactorParameters {
        reactor_type: ReactorType::Pwr,
        fuel_type: FuelType::U235,
        enrichment_percent: 5.0,
        thermal_efficiency: 0.33,
        uptime_percent: 90.0,
        capacity: Capacity(1000.0),
        plant_lifespan_years: 40,
        moderator_type: ModeratorType::LightWater,
        geometry: Geometry::Cylindrical,
        control_rod_insertion: 50.0,
        coolant_flow_rate: 15000.0,
    }
}

#[fixture]
pub fn financial() -> FinancialParameters {
    FinancialParameters {
        construction_cost_per_mw: MoneyPerCapacity(6000.0),
        annual_operating_cost: Money(25.0),
        fuel_cost_per_year: Money(40.0),
        decommissioning_cost: Money(500.0),
        insurance_cost_per_year: Money(10.0),
        electricity_price_per_mwh: MoneyPerEnergy(75.0),
        discount_rate: Dimensionless(0.08),
        inflation_rate: Dimensionless(0.025),
        carbon_tax_per_ton: MoneyPerMass(50.0),
        subsidy_per_mwh: MoneyPerEnergy(5.0),
    }
}

#[fixture]
pub fn policy() -> PolicyParameters {
    PolicyParameters {
        carbon_tax_enabled: true,
        subsidies_enabled: true,
        waste_management_cost: MoneyPerMass(100_000.0),
        accident_insurance_multiplier: 1.5,
        public_acceptance_factor: 0.7,
    }
}

#[fixture]
pub fn model(
    reactor: ReactorParameters,
    financial: FinancialParameters,
    policy: PolicyParameters,
) -> Model {
    Model {
        reactor,
        financial,
        policy,
    }
}

/// The result of simulating the default model
#[fixture]
pub fn simulation_result(model: Model) -> SimulationResult {
    run_simulation(&model.reactor, &model.financial, &model.policy)
}
