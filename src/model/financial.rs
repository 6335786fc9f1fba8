//! Financial assumptions for a plant.
use crate::input::check_non_negative;
use crate::units::{Dimensionless, Money, MoneyPerCapacity, MoneyPerEnergy, MoneyPerMass};
use anyhow::{Result, ensure};
use serde::{Deserialize, Serialize};

/// Costs, prices and rates used to value a plant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinancialParameters {
    /// Overnight construction cost per MW of capacity
    pub construction_cost_per_mw: MoneyPerCapacity,
    /// Fixed operating cost per year
    pub annual_operating_cost: Money,
    /// Fuel cost per year (before the fuel cost multiplier)
    pub fuel_cost_per_year: Money,
    /// Cost of decommissioning, incurred in the final year
    pub decommissioning_cost: Money,
    /// Insurance cost per year
    pub insurance_cost_per_year: Money,
    /// Wholesale electricity price
    pub electricity_price_per_mwh: MoneyPerEnergy,
    /// Discount rate applied to future cash flows
    pub discount_rate: Dimensionless,
    /// Annual inflation rate applied to costs
    pub inflation_rate: Dimensionless,
    /// Carbon price credited per tonne of CO2 avoided
    pub carbon_tax_per_ton: MoneyPerMass,
    /// Production subsidy
    pub subsidy_per_mwh: MoneyPerEnergy,
}

/// Check that a rate is finite and greater than -100%
fn check_rate(name: &str, value: Dimensionless) -> Result<()> {
    ensure!(
        value.is_finite() && value > Dimensionless(-1.0),
        "{name} must be a finite number greater than -1"
    );

    Ok(())
}

impl FinancialParameters {
    /// Check that all monetary inputs are non-negative and the rates are usable
    pub fn validate(&self) -> Result<()> {
        check_non_negative(
            "construction_cost_per_mw",
            self.construction_cost_per_mw.value(),
        )?;
        check_non_negative("annual_operating_cost", self.annual_operating_cost.value())?;
        check_non_negative("fuel_cost_per_year", self.fuel_cost_per_year.value())?;
        check_non_negative("decommissioning_cost", self.decommissioning_cost.value())?;
        check_non_negative(
            "insurance_cost_per_year",
            self.insurance_cost_per_year.value(),
        )?;
        check_non_negative(
            "electricity_price_per_mwh",
            self.electricity_price_per_mwh.value(),
        )?;
        check_non_negative("carbon_tax_per_ton", self.carbon_tax_per_ton.value())?;
        check_non_negative("subsidy_per_mwh", self.subsidy_per_mwh.value())?;
        check_rate("discount_rate", self.discount_rate)?;
        check_rate("inflation_rate", self.inflation_rate)?;

        Ok(())
    }
}
