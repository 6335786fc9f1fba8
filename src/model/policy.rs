//! Policy settings which modify the economics of a plant.
use crate::input::{check_finite_in_range, check_non_negative};
use crate::units::MoneyPerMass;
use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Government policy toggles and multipliers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyParameters {
    /// Whether avoided CO2 earns carbon credits
    pub carbon_tax_enabled: bool,
    /// Whether the production subsidy is paid
    pub subsidies_enabled: bool,
    /// Cost of managing each tonne of waste
    pub waste_management_cost: MoneyPerMass,
    /// Multiplier on accident insurance requirements
    pub accident_insurance_multiplier: f64,
    /// Degree of public support for the plant, from 0 to 1
    pub public_acceptance_factor: f64,
}

impl PolicyParameters {
    /// Check that the multipliers are in range
    pub fn validate(&self) -> Result<()> {
        check_non_negative("waste_management_cost", self.waste_management_cost.value())?;
        check_non_negative(
            "accident_insurance_multiplier",
            self.accident_insurance_multiplier,
        )?;
        check_finite_in_range(
            "public_acceptance_factor",
            self.public_acceptance_factor,
            0.0,
            1.0,
        )?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::policy;
    use rstest::rstest;

    #[rstest]
    #[case(0.0, true)]
    #[case(0.7, true)]
    #[case(1.0, true)]
    #[case(1.01, false)]
    #[case(-0.1, false)]
    fn test_validate_public_acceptance(
        mut policy: PolicyParameters,
        #[case] value: f64,
        #[case] expected_valid: bool,
    ) {
        policy.public_acceptance_factor = value;
        assert_eq!(policy.validate().is_ok(), expected_valid);
    }
}
