//! Correlation between reactor reliability and financial performance.
use crate::monte_carlo::{MonteCarloResult, mean, percentile, std_dev};
use crate::simulation::SimulationResult;
use serde::Serialize;

/// Annual risk-free rate used for the Sharpe ratio
const RISK_FREE_RATE: f64 = 0.03;

/// Relationship between nuclear reliability and NPV across Monte Carlo scenarios.
///
/// Degenerate inputs (e.g. a single scenario or zero variance) give NaN for the affected metrics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CorrelationMetrics {
    /// Mean reliability score over all scenarios
    pub nuclear_reliability_index: f64,
    /// Standard deviation of NPV relative to its mean
    pub market_volatility: f64,
    /// Pearson correlation between reliability and NPV
    pub correlation_coefficient: f64,
    /// Slope of the least-squares fit of NPV against reliability
    pub regression_slope: f64,
    /// Coefficient of determination of the fit
    pub r_squared: f64,
    pub sharpe_ratio: f64,
    /// Value at risk at 95% confidence (negated 5th percentile NPV)
    pub expected_loss: f64,
}

struct Regression {
    slope: f64,
    r_squared: f64,
}

fn pearson_correlation(x: &[f64], y: &[f64]) -> f64 {
    let mean_x = mean(x);
    let mean_y = mean(y);

    let (mut numerator, mut denom_x, mut denom_y) = (0.0, 0.0, 0.0);
    for (xi, yi) in x.iter().zip(y) {
        let diff_x = xi - mean_x;
        let diff_y = yi - mean_y;
        numerator += diff_x * diff_y;
        denom_x += diff_x * diff_x;
        denom_y += diff_y * diff_y;
    }

    numerator / (denom_x * denom_y).sqrt()
}

fn linear_regression(x: &[f64], y: &[f64]) -> Regression {
    let mean_x = mean(x);
    let mean_y = mean(y);

    let (mut numerator, mut denominator) = (0.0, 0.0);
    for (xi, yi) in x.iter().zip(y) {
        let diff_x = xi - mean_x;
        numerator += diff_x * (yi - mean_y);
        denominator += diff_x * diff_x;
    }
    let slope = numerator / denominator;
    let intercept = mean_y - slope * mean_x;

    let ss_res: f64 = x
        .iter()
        .zip(y)
        .map(|(xi, yi)| (yi - (slope * xi + intercept)).powi(2))
        .sum();
    let ss_tot: f64 = y.iter().map(|yi| (yi - mean_y).powi(2)).sum();

    Regression {
        slope,
        r_squared: 1.0 - ss_res / ss_tot,
    }
}

/// Measure how strongly reactor reliability drives NPV across a set of Monte Carlo scenarios.
///
/// The reliability of each scenario is `(1 - accident probability) * energy / base energy`, where the
/// base energy comes from the deterministic run `base`.
pub fn calculate_nuclear_financial_correlation(
    monte_carlo: &MonteCarloResult,
    base: &SimulationResult,
) -> CorrelationMetrics {
    let base_energy = base.energy_produced.value();
    let reliability: Vec<_> = monte_carlo
        .scenarios
        .iter()
        .map(|s| (1.0 - s.accident_probability) * (s.energy_produced.value() / base_energy))
        .collect();
    let npvs: Vec<_> = monte_carlo.scenarios.iter().map(|s| s.npv.value()).collect();

    let regression = linear_regression(&reliability, &npvs);
    let mean_npv = mean(&npvs);
    let std_npv = std_dev(&npvs);

    let mut sorted_npvs = npvs.clone();
    sorted_npvs.sort_by(f64::total_cmp);

    CorrelationMetrics {
        nuclear_reliability_index: mean(&reliability),
        market_volatility: std_npv / mean_npv,
        correlation_coefficient: pearson_correlation(&reliability, &npvs),
        regression_slope: regression.slope,
        r_squared: regression.r_squared,
        sharpe_ratio: (mean_npv - RISK_FREE_RATE) / std_npv,
        expected_loss: -percentile(&sorted_npvs, 0.05),
    }
}
