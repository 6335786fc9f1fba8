//! Functionality for running the deterministic plant simulation.
//!
//! The simulation steps through each year of the plant's life, computing the physics for that year
//! and then handing the annual series to the finance code to build the cash-flow projection.
use crate::finance::{
    IrrResult, calculate_construction_cost, calculate_irr, calculate_npv,
    calculate_payback_period, generate_yearly_data,
};
use crate::model::{FinancialParameters, PolicyParameters, ReactorParameters};
use crate::physics::{
    CO2_AVOIDED_PER_MWH, calculate_accident_probability, calculate_annual_energy,
    calculate_coolant_temperature, calculate_fuel_temperature, calculate_reactivity,
    calculate_reactor_efficiency, calculate_waste_production,
};
use crate::units::{Energy, Mass, Money};
use log::debug;
use serde::{Deserialize, Serialize};

/// Physics results for a single year of operation
#[derive(Debug, Clone, PartialEq)]
pub struct AnnualPhysics {
    /// Electricity generated
    pub energy: Energy,
    /// High-level waste produced
    pub waste: Mass,
    /// CO2 emissions avoided
    pub co2_avoided: Mass,
    /// Fuel temperature (°C)
    pub fuel_temperature: f64,
    /// Coolant outlet temperature (°C)
    pub coolant_temperature: f64,
    /// Reactivity indicator
    pub reactivity: f64,
}

/// Physical and financial results for one year of the plant's life
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YearlyData {
    /// Year of operation, starting from 1
    pub year: u32,
    pub energy_produced: Energy,
    /// Sales revenue including subsidies and carbon credits
    pub revenue: Money,
    /// All running costs for the year (plus decommissioning in the final year)
    pub operating_cost: Money,
    pub cash_flow: Money,
    /// Cash flow to date, including construction
    pub cumulative_cash_flow: Money,
    pub co2_avoided: Mass,
    pub waste_produced: Mass,
    pub fuel_temperature: f64,
    pub coolant_temperature: f64,
    pub reactivity: f64,
}

/// The outcome of simulating a plant over its whole lifetime
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationResult {
    /// Total electricity generated
    pub energy_produced: Energy,
    /// Total revenue
    pub revenue_total: Money,
    /// Total running costs, including decommissioning
    pub costs_total: Money,
    /// Net present value of the plant, including construction
    pub npv: Money,
    /// Internal rate of return
    pub irr: IrrResult,
    /// Years until the plant has paid for itself
    pub payback_years: f64,
    /// Total CO2 emissions avoided
    pub co2_avoided: Mass,
    /// Total high-level waste produced
    pub waste_produced: Mass,
    /// Sum of the annual accident probabilities.
    ///
    /// This is an illustrative risk indicator rather than a true probability: for long-lived or
    /// high-risk plants it can exceed 1.
    pub accident_probability: f64,
    /// Results for each year of operation
    pub yearly_data: Vec<YearlyData>,
}

impl SimulationResult {
    /// The cash-flow sequence used for NPV, IRR and payback, starting with construction at year 0
    pub fn cash_flows(&self) -> Vec<Money> {
        let construction = self
            .yearly_data
            .first()
            .map_or(Money(0.0), |first| first.cash_flow - first.cumulative_cash_flow);

        std::iter::once(-construction)
            .chain(self.yearly_data.iter().map(|data| data.cash_flow))
            .collect()
    }
}

/// Calculate the physics for the given year of operation
fn simulate_year(reactor: &ReactorParameters, year: u32) -> AnnualPhysics {
    // The plant loses efficiency as it ages
    let aged = ReactorParameters {
        thermal_efficiency: calculate_reactor_efficiency(reactor, year),
        ..reactor.clone()
    };
    let energy = calculate_annual_energy(&aged);

    let power_level = reactor.capacity.value() * reactor.uptime_percent / 100.0;
    let fuel_temperature = calculate_fuel_temperature(reactor, power_level);

    AnnualPhysics {
        energy,
        waste: calculate_waste_production(energy, reactor.fuel_type),
        co2_avoided: CO2_AVOIDED_PER_MWH * energy,
        fuel_temperature,
        coolant_temperature: calculate_coolant_temperature(reactor, fuel_temperature),
        reactivity: calculate_reactivity(reactor, year),
    }
}

/// Run the simulation.
///
/// This is a pure function of its arguments: the same parameters always give the same result.
///
/// # Arguments
///
/// * `reactor` - Reactor design and operating parameters
/// * `financial` - Financial assumptions
/// * `policy` - Policy environment
pub fn run_simulation(
    reactor: &ReactorParameters,
    financial: &FinancialParameters,
    policy: &PolicyParameters,
) -> SimulationResult {
    let years = 0..reactor.plant_lifespan_years;
    let physics: Vec<_> = years
        .clone()
        .map(|year| simulate_year(reactor, year))
        .collect();
    let yearly_data = generate_yearly_data(reactor, financial, policy, &physics);

    let cash_flows: Vec<_> =
        std::iter::once(-calculate_construction_cost(reactor, financial))
            .chain(yearly_data.iter().map(|data| data.cash_flow))
            .collect();
    let npv = calculate_npv(&cash_flows, financial.discount_rate);
    let irr = calculate_irr(&cash_flows);
    let payback_years = calculate_payback_period(&cash_flows);
    if !irr.converged {
        debug!(
            "IRR did not converge after {} iterations (last rate: {})",
            irr.iterations, irr.rate
        );
    }

    let accident_probability = years
        .map(|year| calculate_accident_probability(reactor, year))
        .sum();

    SimulationResult {
        energy_produced: physics.iter().map(|annual| annual.energy).sum(),
        revenue_total: yearly_data.iter().map(|data| data.revenue).sum(),
        costs_total: yearly_data.iter().map(|data| data.operating_cost).sum(),
        npv,
        irr,
        payback_years,
        co2_avoided: physics.iter().map(|annual| annual.co2_avoided).sum(),
        waste_produced: physics.iter().map(|annual| annual.waste).sum(),
        accident_probability,
        yearly_data,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{financial, model, policy, reactor, simulation_result};
    use crate::model::{Model, ReactorType};
    use float_cmp::assert_approx_eq;
    use rstest::rstest;

    #[rstest]
    fn test_run_simulation_default_preset(simulation_result: SimulationResult) {
        let result = simulation_result;
        assert_eq!(result.yearly_data.len(), 40);

        // Roughly 2.6 TWh a year for 40 years
        let energy = result.energy_produced.value();
        assert!((5e7..1e9).contains(&energy), "unexpected energy: {energy}");

        assert!(result.npv > Money(0.0));
        assert!(result.irr.converged);
        assert!(result.payback_years < 1.0);
        assert!(result.accident_probability > 0.0 && result.accident_probability < 1.0);
    }

    #[rstest]
    fn test_run_simulation_deterministic(model: Model) {
        let first = run_simulation(&model.reactor, &model.financial, &model.policy);
        let second = run_simulation(&model.reactor, &model.financial, &model.policy);
        assert_eq!(first, second);
    }

    #[rstest]
    fn test_run_simulation_totals(simulation_result: SimulationResult) {
        let result = simulation_result;
        let energy: Energy = result.yearly_data.iter().map(|d| d.energy_produced).sum();
        assert_eq!(energy, result.energy_produced);

        // Energy declines as the plant ages
        let first = &result.yearly_data[0];
        let last = result.yearly_data.last().unwrap();
        assert!(last.energy_produced < first.energy_produced);

        // Final cumulative cash flow is the undiscounted sum of all cash flows
        let cash_flows = result.cash_flows();
        let total: Money = cash_flows.iter().copied().sum();
        assert_approx_eq!(
            Money,
            last.cumulative_cash_flow,
            total,
            epsilon = 1e-6 * total.value().abs()
        );
    }

    #[rstest]
    fn test_run_simulation_npv_matches_cash_flows(model: Model) {
        let result = run_simulation(&model.reactor, &model.financial, &model.policy);
        let cash_flows = result.cash_flows();
        assert_eq!(cash_flows.len(), 41);
        assert_approx_eq!(
            Money,
            cash_flows[0],
            Money(-6_000_000.0),
            epsilon = 1e-6
        );
        assert_approx_eq!(
            Money,
            calculate_npv(&cash_flows, model.financial.discount_rate),
            result.npv,
            epsilon = 1e-6 * result.npv.value().abs()
        );
    }

    #[rstest]
    fn test_run_simulation_single_year(
        mut reactor: ReactorParameters,
        financial: FinancialParameters,
        policy: PolicyParameters,
    ) {
        reactor.plant_lifespan_years = 1;
        let result = run_simulation(&reactor, &financial, &policy);
        assert_eq!(result.yearly_data.len(), 1);

        // Decommissioning lands in the only year
        let data = &result.yearly_data[0];
        assert_approx_eq!(
            Money,
            data.cash_flow,
            data.revenue - data.operating_cost,
            epsilon = 1e-6
        );
        assert!(data.operating_cost > financial.decommissioning_cost);
    }

    #[rstest]
    fn test_accident_probability_is_sum(
        mut reactor: ReactorParameters,
        financial: FinancialParameters,
        policy: PolicyParameters,
    ) {
        reactor.reactor_type = ReactorType::FastBreeder;
        let result = run_simulation(&reactor, &financial, &policy);
        let expected: f64 = (0..40)
            .map(|year| calculate_accident_probability(&reactor, year))
            .sum();
        assert_approx_eq!(f64, result.accident_probability, expected);
    }

    #[rstest]
    fn test_zero_capacity_still_produces_result(
        mut reactor: ReactorParameters,
        financial: FinancialParameters,
        policy: PolicyParameters,
    ) {
        reactor.capacity = crate::units::Capacity(0.0);
        let result = run_simulation(&reactor, &financial, &policy);
        assert_eq!(result.energy_produced, Energy(0.0));
        assert!(result.npv < Money(0.0));
        assert!(result.npv.is_finite());
    }
}
