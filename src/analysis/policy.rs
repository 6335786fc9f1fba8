//! Policy shock scenarios.
//!
//! Each scenario transforms a base parameter triple into the parameters a plant would face after a
//! change in government policy or market conditions.
use crate::model::{FinancialParameters, PolicyParameters, ReactorParameters, ReactorType};
use crate::simulation::{SimulationResult, run_simulation};
use crate::units::{Dimensionless, Energy, Mass, Money, MoneyPerEnergy};
use clap::ValueEnum;
use serde::Serialize;
use strum::{Display, EnumIter};

/// A policy or market shock
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter, ValueEnum, Serialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
#[value(rename_all = "snake_case")]
pub enum PolicyScenario {
    /// Imports of enriched uranium are banned
    UraniumImportBan,
    /// The carbon tax is raised sharply
    CarbonTaxIncrease,
    /// Government subsidies for nuclear power are withdrawn
    SubsidyCut,
    /// Existing plants must close early
    NuclearPhaseOut,
    /// New build is fast-tracked and subsidised
    AcceleratedDeployment,
    /// Waste disposal becomes more expensive
    WasteTaxIncrease,
    /// Plants must carry much higher liability insurance
    InsuranceMandate,
    /// Renewables are given priority on the grid
    RenewablePreference,
}

/// Headline impacts anticipated for a scenario
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ExpectedImpacts {
    /// Change in the cost of energy (%)
    pub energy_cost_change: f64,
    /// Expected loss in portfolio value (negative for a gain)
    pub portfolio_loss_expected: Money,
    /// Change in CO2 reduction (%)
    pub co2_reduction_change: f64,
    /// Change in reliability (%)
    pub reliability_change: f64,
}

/// The parameters resulting from a policy shock
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PolicyImpact {
    pub scenario: PolicyScenario,
    pub name: &'static str,
    pub description: &'static str,
    pub reactor: ReactorParameters,
    pub financial: FinancialParameters,
    pub policy: PolicyParameters,
    pub expected_impacts: ExpectedImpacts,
}

impl PolicyScenario {
    /// Human-readable name
    pub fn name(self) -> &'static str {
        match self {
            Self::UraniumImportBan => "Uranium Import Ban",
            Self::CarbonTaxIncrease => "Carbon Tax Increase",
            Self::SubsidyCut => "Nuclear Subsidy Elimination",
            Self::NuclearPhaseOut => "Nuclear Phase-Out Policy",
            Self::AcceleratedDeployment => "Accelerated Nuclear Deployment",
            Self::WasteTaxIncrease => "Nuclear Waste Tax Increase",
            Self::InsuranceMandate => "Stricter Insurance Requirements",
            Self::RenewablePreference => "Renewable Energy Preference",
        }
    }

    /// One-sentence description of the shock
    pub fn description(self) -> &'static str {
        match self {
            Self::UraniumImportBan => {
                "Simulates sanctions or domestic supply restrictions on uranium"
            }
            Self::CarbonTaxIncrease => "Doubles carbon pricing to incentivize clean energy",
            Self::SubsidyCut => "Removes all government subsidies for nuclear energy",
            Self::NuclearPhaseOut => "Mandates gradual shutdown of nuclear facilities",
            Self::AcceleratedDeployment => {
                "Government program to rapidly expand nuclear capacity"
            }
            Self::WasteTaxIncrease => "Doubles the cost of nuclear waste management",
            Self::InsuranceMandate => "Mandates higher insurance coverage for nuclear accidents",
            Self::RenewablePreference => "Policy shift favoring renewables over nuclear",
        }
    }

    fn expected_impacts(self) -> ExpectedImpacts {
        let (energy_cost_change, loss, co2_reduction_change, reliability_change) = match self {
            Self::UraniumImportBan => (130.0, 2.5e9, -30.0, -30.0),
            Self::CarbonTaxIncrease => (-15.0, -5e8, 40.0, 5.0),
            Self::SubsidyCut => (25.0, 8e8, -15.0, -10.0),
            Self::NuclearPhaseOut => (60.0, 5e9, -50.0, -40.0),
            Self::AcceleratedDeployment => (-30.0, -1.5e9, 70.0, 20.0),
            Self::WasteTaxIncrease => (15.0, 6e8, -5.0, 0.0),
            Self::InsuranceMandate => (20.0, 4.5e8, 0.0, 10.0),
            Self::RenewablePreference => (10.0, 3.5e8, -10.0, -5.0),
        };

        ExpectedImpacts {
            energy_cost_change,
            portfolio_loss_expected: Money(loss),
            co2_reduction_change,
            reliability_change,
        }
    }
}

/// Apply a policy shock to a base parameter triple.
pub fn simulate_policy_shock(
    scenario: PolicyScenario,
    reactor: &ReactorParameters,
    financial: &FinancialParameters,
    policy: &PolicyParameters,
) -> PolicyImpact {
    let mut reactor = reactor.clone();
    let mut financial = financial.clone();
    let mut policy = policy.clone();

    match scenario {
        PolicyScenario::UraniumImportBan => {
            reactor.uptime_percent *= 0.7;
            financial.fuel_cost_per_year = financial.fuel_cost_per_year * Dimensionless(2.5);
            financial.electricity_price_per_mwh =
                financial.electricity_price_per_mwh * Dimensionless(1.3);
        }
        PolicyScenario::CarbonTaxIncrease => {
            financial.carbon_tax_per_ton = financial.carbon_tax_per_ton * Dimensionless(2.0);
            financial.subsidy_per_mwh = financial.subsidy_per_mwh * Dimensionless(1.5);
            policy.carbon_tax_enabled = true;
            policy.subsidies_enabled = true;
        }
        PolicyScenario::SubsidyCut => {
            financial.subsidy_per_mwh = MoneyPerEnergy(0.0);
            policy.subsidies_enabled = false;
        }
        PolicyScenario::NuclearPhaseOut => {
            // A plant must still run for at least a year
            reactor.plant_lifespan_years = (reactor.plant_lifespan_years / 2).max(1);
            reactor.uptime_percent *= 0.8;
            financial.decommissioning_cost = financial.decommissioning_cost * Dimensionless(1.5);
            policy.subsidies_enabled = false;
            policy.public_acceptance_factor = 0.3;
        }
        PolicyScenario::AcceleratedDeployment => {
            reactor.reactor_type = ReactorType::Smr;
            financial.construction_cost_per_mw =
                financial.construction_cost_per_mw * Dimensionless(0.7);
            financial.subsidy_per_mwh = financial.subsidy_per_mwh * Dimensionless(2.0);
            policy.subsidies_enabled = true;
            policy.public_acceptance_factor = 0.85;
        }
        PolicyScenario::WasteTaxIncrease => {
            policy.waste_management_cost = policy.waste_management_cost * Dimensionless(2.0);
        }
        PolicyScenario::InsuranceMandate => {
            financial.insurance_cost_per_year =
                financial.insurance_cost_per_year * Dimensionless(2.5);
            policy.accident_insurance_multiplier *= 2.0;
        }
        PolicyScenario::RenewablePreference => {
            financial.electricity_price_per_mwh =
                financial.electricity_price_per_mwh * Dimensionless(0.85);
            financial.subsidy_per_mwh = financial.subsidy_per_mwh * Dimensionless(0.5);
            policy.subsidies_enabled = true;
            policy.public_acceptance_factor = 0.5;
        }
    }

    PolicyImpact {
        scenario,
        name: scenario.name(),
        description: scenario.description(),
        reactor,
        financial,
        policy,
        expected_impacts: scenario.expected_impacts(),
    }
}

/// Simulated effect of a policy shock on a plant
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PolicyComparison {
    pub impact: PolicyImpact,
    /// Result of simulating the unshocked parameters
    pub base: SimulationResult,
    /// Result of simulating the shocked parameters
    pub shocked: SimulationResult,
    /// Shocked NPV minus base NPV
    pub npv_change: Money,
    pub energy_change: Energy,
    pub co2_avoided_change: Mass,
}

/// Simulate a plant with and without a policy shock and report the differences
pub fn compare_policy_shock(
    scenario: PolicyScenario,
    reactor: &ReactorParameters,
    financial: &FinancialParameters,
    policy: &PolicyParameters,
) -> PolicyComparison {
    let impact = simulate_policy_shock(scenario, reactor, financial, policy);
    let base = run_simulation(reactor, financial, policy);
    let shocked = run_simulation(&impact.reactor, &impact.financial, &impact.policy);

    PolicyComparison {
        npv_change: shocked.npv - base.npv,
        energy_change: shocked.energy_produced - base.energy_produced,
        co2_avoided_change: shocked.co2_avoided - base.co2_avoided,
        impact,
        base,
        shocked,
    }
}
