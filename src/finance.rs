//! General functions related to finance.
//!
//! Cash-flow sequences are indexed by year, with index 0 being the undiscounted construction year.
use crate::model::{FinancialParameters, FuelType, PolicyParameters, ReactorParameters};
use crate::simulation::{AnnualPhysics, SimulationResult, YearlyData};
use crate::units::{Dimensionless, Energy, Mass, Money, MoneyPerEnergy, MoneyPerMass};
use serde::{Deserialize, Serialize};

/// Initial guess for the Newton-Raphson IRR solver
const IRR_INITIAL_GUESS: f64 = 0.1;

/// Maximum number of Newton-Raphson iterations
const IRR_MAX_ITERATIONS: u32 = 1000;

/// The IRR is accepted once the NPV is smaller in magnitude than this
const IRR_TOLERANCE: f64 = 1e-5;

/// The rate is never allowed to fall below this, to avoid dividing by zero
const IRR_MIN_RATE: f64 = -0.99;

/// Outcome of an internal rate of return calculation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IrrResult {
    /// The last rate reached by the solver, whether or not it converged
    pub rate: Dimensionless,
    /// Whether the solver found a root
    pub converged: bool,
    /// Number of iterations performed
    pub iterations: u32,
}

/// Calculate the net present value of a cash-flow sequence.
///
/// Cash flow `t` is discounted by `(1 + discount_rate)^t`.
pub fn calculate_npv(cash_flows: &[Money], discount_rate: Dimensionless) -> Money {
    let base = 1.0 + discount_rate.value();
    cash_flows
        .iter()
        .enumerate()
        .map(|(year, cash_flow)| *cash_flow / Dimensionless(base.powi(year as i32)))
        .sum()
}

/// Calculate the internal rate of return of a cash-flow sequence using Newton-Raphson.
///
/// The solver starts from a rate of 10% and runs for at most 1000 iterations. It converges when the
/// NPV is within tolerance of zero or when the Newton step stops changing the rate. Steps which would
/// take the rate below -99% are clamped and never count as convergence. If the derivative vanishes
/// or the rate becomes non-finite, the solver gives up.
///
/// The last rate is always returned, so callers should check [`IrrResult::converged`] before trusting
/// it.
pub fn calculate_irr(cash_flows: &[Money]) -> IrrResult {
    let mut rate = IRR_INITIAL_GUESS;

    for iteration in 0..IRR_MAX_ITERATIONS {
        let mut npv = 0.0;
        let mut derivative = 0.0;
        for (t, cash_flow) in cash_flows.iter().enumerate() {
            let t = t as i32;
            npv += cash_flow.value() / (1.0 + rate).powi(t);
            derivative -= f64::from(t) * cash_flow.value() / (1.0 + rate).powi(t + 1);
        }

        if npv.abs() < IRR_TOLERANCE {
            return irr_result(rate, true, iteration);
        }
        if derivative == 0.0 || !derivative.is_finite() {
            return irr_result(rate, false, iteration);
        }

        let unclamped = rate - npv / derivative;
        if !unclamped.is_finite() {
            return irr_result(rate, false, iteration + 1);
        }

        let next = unclamped.max(IRR_MIN_RATE);
        let stalled = next == unclamped && (next - rate).abs() <= 1e-12 * (1.0 + rate.abs());
        rate = next;
        if stalled {
            return irr_result(rate, true, iteration + 1);
        }
    }

    irr_result(rate, false, IRR_MAX_ITERATIONS)
}

fn irr_result(rate: f64, converged: bool, iterations: u32) -> IrrResult {
    IrrResult {
        rate: Dimensionless(rate),
        converged,
        iterations,
    }
}

/// Calculate the payback period in years.
///
/// Returns the time at which the cumulative cash flow first becomes positive, interpolating linearly
/// between the end of the previous year and the end of the year in which it crosses zero. If the
/// first cash flow is already positive, the payback period is zero. If the cumulative cash flow never
/// becomes positive, the length of the sequence is returned.
pub fn calculate_payback_period(cash_flows: &[Money]) -> f64 {
    let mut cumulative = Money(0.0);
    for (year, cash_flow) in cash_flows.iter().enumerate() {
        let previous = cumulative;
        cumulative += *cash_flow;
        if cumulative > Money(0.0) {
            if year == 0 {
                return 0.0;
            }

            let fraction = (-previous / *cash_flow).value();
            return (year - 1) as f64 + fraction;
        }
    }

    cash_flows.len() as f64
}

/// Total overnight construction cost for the plant
pub fn calculate_construction_cost(
    reactor: &ReactorParameters,
    financial: &FinancialParameters,
) -> Money {
    financial.construction_cost_per_mw * reactor.capacity
}

/// Revenue from selling `energy`, including any per-MWh subsidy
pub fn calculate_annual_revenue(
    energy: Energy,
    price: MoneyPerEnergy,
    subsidy: MoneyPerEnergy,
) -> Money {
    (price + subsidy) * energy
}

/// Running costs for the given year of operation, inflated from year 0.
///
/// Covers operating, fuel (scaled by the fuel's cost multiplier), insurance and waste management
/// costs.
pub fn calculate_annual_costs(
    financial: &FinancialParameters,
    fuel_type: FuelType,
    waste_produced: Mass,
    waste_management_cost: MoneyPerMass,
    year: u32,
) -> Money {
    let fuel_cost_multiplier = Dimensionless(fuel_type.properties().cost_multiplier);
    let base_cost = financial.annual_operating_cost
        + financial.fuel_cost_per_year * fuel_cost_multiplier
        + financial.insurance_cost_per_year
        + waste_management_cost * waste_produced;
    let inflation = (Dimensionless(1.0) + financial.inflation_rate).powi(year as i32);

    base_cost * inflation
}

/// Value of the carbon credits earned by avoiding `co2_avoided` tonnes of CO2
pub fn calculate_carbon_credits(co2_avoided: Mass, carbon_price: MoneyPerMass) -> Money {
    carbon_price * co2_avoided
}

/// Assemble the year-by-year financial projection from the annual physics results.
///
/// One [`YearlyData`] entry is produced per element of `physics`, numbered from 1. The cumulative
/// cash flow starts from minus the construction cost and the decommissioning cost is charged in full
/// to the final year.
pub fn generate_yearly_data(
    reactor: &ReactorParameters,
    financial: &FinancialParameters,
    policy: &PolicyParameters,
    physics: &[AnnualPhysics],
) -> Vec<YearlyData> {
    let subsidy = if policy.subsidies_enabled {
        financial.subsidy_per_mwh
    } else {
        MoneyPerEnergy(0.0)
    };

    let mut cumulative_cash_flow = -calculate_construction_cost(reactor, financial);
    let mut yearly_data: Vec<_> = physics
        .iter()
        .zip(0u32..)
        .map(|(annual, year)| {
            let revenue = calculate_annual_revenue(
                annual.energy,
                financial.electricity_price_per_mwh,
                subsidy,
            );
            let carbon_credits = if policy.carbon_tax_enabled {
                calculate_carbon_credits(annual.co2_avoided, financial.carbon_tax_per_ton)
            } else {
                Money(0.0)
            };
            let costs = calculate_annual_costs(
                financial,
                reactor.fuel_type,
                annual.waste,
                policy.waste_management_cost,
                year,
            );

            let cash_flow = revenue + carbon_credits - costs;
            cumulative_cash_flow += cash_flow;

            YearlyData {
                year: year + 1,
                energy_produced: annual.energy,
                revenue: revenue + carbon_credits,
                operating_cost: costs,
                cash_flow,
                cumulative_cash_flow,
                co2_avoided: annual.co2_avoided,
                waste_produced: annual.waste,
                fuel_temperature: annual.fuel_temperature,
                coolant_temperature: annual.coolant_temperature,
                reactivity: annual.reactivity,
            }
        })
        .collect();

    if let Some(last) = yearly_data.last_mut() {
        last.operating_cost += financial.decommissioning_cost;
        last.cash_flow -= financial.decommissioning_cost;
        last.cumulative_cash_flow -= financial.decommissioning_cost;
    }

    yearly_data
}

/// Electricity price at which lifetime revenue from sales would just cover lifetime costs
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BreakEven {
    /// Lifetime costs divided by lifetime energy
    pub price: MoneyPerEnergy,
    /// Margin of the current price over the break-even price (%)
    pub margin_percent: f64,
}

/// Calculate the break-even electricity price for a simulation result.
///
/// A result with no energy production has an infinite (or NaN) break-even price.
pub fn calculate_break_even(result: &SimulationResult, current_price: MoneyPerEnergy) -> BreakEven {
    let price = result.costs_total / result.energy_produced;
    let margin_percent = ((current_price - price) / price).value() * 100.0;

    BreakEven {
        price,
        margin_percent,
    }
}
