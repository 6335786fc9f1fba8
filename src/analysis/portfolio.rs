//! Mean-variance allocation across fissile and fertile isotopes.
use anyhow::{Result, ensure};
use serde::Serialize;
use std::f64::consts::LN_2;

/// Annual risk-free rate used for the Sharpe ratio
const RISK_FREE_RATE: f64 = 0.03;

/// Electricity price used to value energy yields ($/MWh)
const ENERGY_PRICE: f64 = 75.0;

/// Assumed correlation between the returns of different isotopes
const ISOTOPE_CORRELATION: f64 = 0.3;

/// Number of reweighting passes
const OPTIMISATION_ITERATIONS: usize = 100;

/// An isotope which can be held as an energy asset
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IsotopeAsset {
    pub isotope: &'static str,
    /// Half-life (years)
    pub half_life: f64,
    /// Energy yield (MWh/kg)
    pub energy_yield: f64,
    /// Cost ($/kg)
    pub cost: f64,
    /// Risk level from 0 to 1
    pub risk_level: f64,
}

impl IsotopeAsset {
    /// Decay constant (1/year)
    pub fn decay_constant(&self) -> f64 {
        LN_2 / self.half_life
    }

    /// Return on investment after holding the isotope for `years`, allowing for decay
    pub fn expected_return(&self, years: f64) -> f64 {
        let effective_yield = self.energy_yield * (-self.decay_constant() * years).exp();
        let revenue = effective_yield * ENERGY_PRICE;

        (revenue - self.cost) / self.cost
    }
}

/// The isotopes available for investment
pub fn isotope_assets() -> [IsotopeAsset; 4] {
    [
        IsotopeAsset {
            isotope: "U-235",
            half_life: 703_800_000.0,
            energy_yield: 83_000.0,
            cost: 5000.0,
            risk_level: 0.3,
        },
        IsotopeAsset {
            isotope: "Pu-239",
            half_life: 24_110.0,
            energy_yield: 88_000.0,
            cost: 8000.0,
            risk_level: 0.6,
        },
        IsotopeAsset {
            isotope: "Th-232",
            half_life: 14_050_000_000.0,
            energy_yield: 45_000.0,
            cost: 2000.0,
            risk_level: 0.2,
        },
        IsotopeAsset {
            isotope: "U-233",
            half_life: 159_200.0,
            energy_yield: 87_000.0,
            cost: 9000.0,
            risk_level: 0.5,
        },
    ]
}

/// Weight given to one isotope
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PortfolioAllocation {
    pub isotope: &'static str,
    /// Fraction of the portfolio, from 0 to 1
    pub weight: f64,
    pub expected_return: f64,
    pub expected_risk: f64,
}

/// An optimised isotope portfolio
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OptimisedPortfolio {
    pub allocations: Vec<PortfolioAllocation>,
    pub expected_total_return: f64,
    /// Risk ignoring correlations between isotopes
    pub expected_total_risk: f64,
    /// Risk including correlations between isotopes
    pub correlated_risk: f64,
    pub sharpe_ratio: f64,
    /// Sharpe ratio per unit of risk
    pub efficiency_score: f64,
    /// Whether the portfolio reaches the target return, if one was given
    pub meets_target_return: Option<bool>,
    /// Holding period (years)
    pub time_horizon: u32,
    /// Weighted energy yield of the portfolio for each year from 0 to the time horizon
    pub decay_adjusted_return: Vec<f64>,
}

/// Covariance matrix for assets with the given risks and a fixed pairwise correlation
pub fn build_covariance_matrix(risks: &[f64]) -> Vec<Vec<f64>> {
    risks
        .iter()
        .enumerate()
        .map(|(i, risk_i)| {
            risks
                .iter()
                .enumerate()
                .map(|(j, risk_j)| {
                    if i == j {
                        risk_i * risk_i
                    } else {
                        ISOTOPE_CORRELATION * risk_i * risk_j
                    }
                })
                .collect()
        })
        .collect()
}

fn normalise(weights: &mut [f64]) {
    let sum: f64 = weights.iter().sum();
    for weight in weights.iter_mut() {
        *weight /= sum;
    }
}

/// Iteratively shift weight towards assets with a high return for their risk, penalising risky assets
/// more heavily for lower risk tolerances.
fn optimise_weights(returns: &[f64], risks: &[f64], risk_tolerance: f64) -> Vec<f64> {
    let n = returns.len();
    let mean_return = returns.iter().sum::<f64>() / n as f64;
    let mean_risk = risks.iter().sum::<f64>() / n as f64;
    let mut weights = vec![1.0 / n as f64; n];

    for _ in 0..OPTIMISATION_ITERATIONS {
        for ((weight, ret), risk) in weights.iter_mut().zip(returns).zip(risks) {
            let return_score = ret / mean_return;
            let risk_score = risk / mean_risk;
            let adjustment = return_score / (risk_score + 0.01);
            *weight *= 1.0 + 0.05 * (adjustment - 1.0);
        }
        normalise(&mut weights);

        for (weight, risk) in weights.iter_mut().zip(risks) {
            *weight *= 1.0 - risk * (1.0 - risk_tolerance);
        }
        normalise(&mut weights);
    }

    weights
}

/// Choose an isotope portfolio.
///
/// # Arguments
///
/// * `target_return` - Optional return the portfolio should reach
/// * `time_horizon` - Holding period in years
/// * `risk_tolerance` - Appetite for risk, from 0 (averse) to 1 (neutral)
pub fn optimise_portfolio(
    target_return: Option<f64>,
    time_horizon: u32,
    risk_tolerance: f64,
) -> Result<OptimisedPortfolio> {
    ensure!(
        (0.0..=1.0).contains(&risk_tolerance),
        "Risk tolerance must be between 0 and 1"
    );

    let assets = isotope_assets();
    let years = f64::from(time_horizon);
    let returns: Vec<_> = assets.iter().map(|a| a.expected_return(years)).collect();
    let risks: Vec<_> = assets.iter().map(|a| a.risk_level).collect();
    let weights = optimise_weights(&returns, &risks, risk_tolerance);

    let portfolio_return: f64 = weights.iter().zip(&returns).map(|(w, r)| w * r).sum();
    let portfolio_risk = weights
        .iter()
        .zip(&risks)
        .map(|(w, risk)| (w * risk).powi(2))
        .sum::<f64>()
        .sqrt();
    let covariance = build_covariance_matrix(&risks);
    let correlated_risk = weights
        .iter()
        .zip(&covariance)
        .map(|(w_i, row)| w_i * weights.iter().zip(row).map(|(w_j, c)| w_j * c).sum::<f64>())
        .sum::<f64>()
        .sqrt();
    let sharpe_ratio = (portfolio_return - RISK_FREE_RATE) / portfolio_risk;

    let decay_adjusted_return = (0..=time_horizon)
        .map(|year| {
            assets
                .iter()
                .zip(&weights)
                .map(|(asset, weight)| {
                    asset.energy_yield * (-asset.decay_constant() * f64::from(year)).exp() * weight
                })
                .sum()
        })
        .collect();

    let allocations = assets
        .iter()
        .zip(&weights)
        .zip(&returns)
        .map(|((asset, weight), expected_return)| PortfolioAllocation {
            isotope: asset.isotope,
            weight: *weight,
            expected_return: *expected_return,
            expected_risk: asset.risk_level,
        })
        .collect();

    Ok(OptimisedPortfolio {
        allocations,
        expected_total_return: portfolio_return,
        expected_total_risk: portfolio_risk,
        correlated_risk,
        sharpe_ratio,
        efficiency_score: sharpe_ratio / (portfolio_risk + 0.01),
        meets_target_return: target_return.map(|target| portfolio_return >= target),
        time_horizon,
        decay_adjusted_return,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use float_cmp::assert_approx_eq;
    use itertools::Itertools;
    use rstest::rstest;

    #[rstest]
    #[case(0.0)]
    #[case(0.5)]
    #[case(1.0)]
    fn test_weights_sum_to_one(#[case] risk_tolerance: f64) {
        let portfolio = optimise_portfolio(None, 40, risk_tolerance).unwrap();
        let total: f64 = portfolio.allocations.iter().map(|a| a.weight).sum();
        assert_approx_eq!(f64, total, 1.0, epsilon = 1e-12);
        assert!(portfolio.allocations.iter().all(|a| a.weight >= 0.0));
        assert_eq!(
            portfolio.allocations.iter().map(|a| a.isotope).collect_vec(),
            ["U-235", "Pu-239", "Th-232", "U-233"]
        );
    }

    #[test]
    fn test_lower_tolerance_avoids_risky_assets() {
        let cautious = optimise_portfolio(None, 40, 0.0).unwrap();
        let bold = optimise_portfolio(None, 40, 1.0).unwrap();

        // Pu-239 is the riskiest isotope
        assert!(cautious.allocations[1].weight < bold.allocations[1].weight);
    }

    #[test]
    fn test_portfolio_metrics() {
        let portfolio = optimise_portfolio(Some(1e6), 40, 0.5).unwrap();
        assert_eq!(portfolio.meets_target_return, Some(false));
        assert_approx_eq!(
            f64,
            portfolio.sharpe_ratio,
            (portfolio.expected_total_return - 0.03) / portfolio.expected_total_risk
        );

        // Positive correlations increase risk
        assert!(portfolio.correlated_risk > portfolio.expected_total_risk);

        // Decay profile covers years 0 to 40 and never increases
        assert_eq!(portfolio.decay_adjusted_return.len(), 41);
        for (earlier, later) in portfolio.decay_adjusted_return.iter().tuple_windows() {
            assert!(later <= earlier);
        }
    }

    #[test]
    fn test_expected_return() {
        let thorium = &isotope_assets()[2];
        // Thorium barely decays, so the return is close to its undecayed value
        assert_approx_eq!(
            f64,
            thorium.expected_return(0.0),
            (45_000.0 * 75.0 - 2000.0) / 2000.0
        );
        assert!(thorium.expected_return(40.0) < thorium.expected_return(0.0));
    }

    #[test]
    fn test_covariance_matrix() {
        let covariance = build_covariance_matrix(&[0.5, 0.2]);
        assert_approx_eq!(f64, covariance[0][0], 0.25);
        assert_approx_eq!(f64, covariance[0][1], 0.03);
        assert_eq!(covariance[0][1], covariance[1][0]);
    }

    #[test]
    fn test_invalid_risk_tolerance() {
        assert!(optimise_portfolio(None, 40, 1.5).is_err());
    }
}
