//! Monte Carlo risk analysis.
//!
//! Each iteration perturbs the uncertain reactor and financial parameters around their base values
//! and runs the full simulation. Policy parameters are held fixed. Iterations are independent and run
//! in parallel, each with its own random stream derived from a single seed, so a given seed always
//! gives the same result however many threads are used.
use crate::model::{FinancialParameters, PolicyParameters, ReactorParameters};
use crate::simulation::{SimulationResult, run_simulation};
use crate::units::{Dimensionless, Money, MoneyPerCapacity, MoneyPerEnergy, MoneyPerMass};
use anyhow::{Result, bail, ensure};
use log::info;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Fraction of the worst outcomes averaged for the conditional value at risk
const CVAR_FRACTION: f64 = 0.05;

/// Summary of a Monte Carlo run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonteCarloResult {
    /// The result of each iteration, in iteration order
    pub scenarios: Vec<SimulationResult>,
    /// Mean NPV
    pub mean_npv: Money,
    /// Median NPV
    pub median_npv: Money,
    /// Population standard deviation of the NPV
    pub std_dev_npv: Money,
    /// Fraction of scenarios with a positive NPV
    pub probability_profit: f64,
    /// 5th percentile NPV
    pub percentile_5: Money,
    /// 95th percentile NPV
    pub percentile_95: Money,
    /// Mean IRR over all scenarios, whether or not the IRR converged
    pub mean_irr: Dimensionless,
    /// Mean NPV of the worst 5% of scenarios (at least one scenario)
    pub cvar_5: Money,
}

/// A handle which can be used to abort a running Monte Carlo analysis from another thread
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    /// Create a new token which has not been cancelled
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    /// Whether cancellation has been requested
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Generate a seed from the current time
pub fn time_based_seed() -> u64 {
    chrono::Utc::now()
        .timestamp_nanos_opt()
        .unwrap_or_default()
        .unsigned_abs()
}

/// Draw a value normally distributed around `base` with standard deviation `base * variation`.
///
/// The result is clamped to `bounds` if given.
fn random_variation<R: Rng>(
    rng: &mut R,
    base: f64,
    variation: f64,
    bounds: Option<(f64, f64)>,
) -> f64 {
    // Box-Muller transform. u1 must be non-zero.
    let u1: f64 = rng.gen_range(f64::EPSILON..1.0);
    let u2: f64 = rng.gen_range(0.0..1.0);
    let standard_normal = (-2.0 * u1.ln()).sqrt() * (2.0 * PI * u2).cos();

    let value = base + base * variation * standard_normal;
    match bounds {
        Some((min, max)) => value.clamp(min, max),
        None => value,
    }
}

fn vary_reactor<R: Rng>(rng: &mut R, base: &ReactorParameters) -> ReactorParameters {
    ReactorParameters {
        uptime_percent: random_variation(rng, base.uptime_percent, 0.05, Some((70.0, 98.0))),
        thermal_efficiency: random_variation(
            rng,
            base.thermal_efficiency,
            0.03,
            Some((0.25, 0.40)),
        ),
        ..base.clone()
    }
}

fn vary_financial<R: Rng>(rng: &mut R, base: &FinancialParameters) -> FinancialParameters {
    FinancialParameters {
        construction_cost_per_mw: MoneyPerCapacity(random_variation(
            rng,
            base.construction_cost_per_mw.value(),
            0.15,
            None,
        )),
        annual_operating_cost: Money(random_variation(
            rng,
            base.annual_operating_cost.value(),
            0.10,
            None,
        )),
        electricity_price_per_mwh: MoneyPerEnergy(random_variation(
            rng,
            base.electricity_price_per_mwh.value(),
            0.20,
            Some((30.0, 150.0)),
        )),
        discount_rate: Dimensionless(random_variation(
            rng,
            base.discount_rate.value(),
            0.15,
            Some((0.03, 0.12)),
        )),
        inflation_rate: Dimensionless(random_variation(
            rng,
            base.inflation_rate.value(),
            0.30,
            Some((0.01, 0.06)),
        )),
        carbon_tax_per_ton: MoneyPerMass(random_variation(
            rng,
            base.carbon_tax_per_ton.value(),
            0.25,
            Some((0.0, 200.0)),
        )),
        ..base.clone()
    }
}

/// Run a Monte Carlo analysis.
///
/// # Arguments
///
/// * `reactor` - Base reactor parameters
/// * `financial` - Base financial parameters
/// * `policy` - Policy parameters (not perturbed)
/// * `iterations` - Number of scenarios to simulate (at least one)
/// * `seed` - Seed for the random number generator
pub fn run_monte_carlo_simulation(
    reactor: &ReactorParameters,
    financial: &FinancialParameters,
    policy: &PolicyParameters,
    iterations: u32,
    seed: u64,
) -> Result<MonteCarloResult> {
    run_monte_carlo_simulation_with_cancellation(
        reactor,
        financial,
        policy,
        iterations,
        seed,
        &CancellationToken::new(),
    )
}

/// Run a Monte Carlo analysis which can be aborted with `token`.
///
/// Returns an error if the token is cancelled before all iterations have finished.
pub fn run_monte_carlo_simulation_with_cancellation(
    reactor: &ReactorParameters,
    financial: &FinancialParameters,
    policy: &PolicyParameters,
    iterations: u32,
    seed: u64,
    token: &CancellationToken,
) -> Result<MonteCarloResult> {
    ensure!(iterations >= 1, "Number of iterations must be at least 1");
    info!("Running {iterations} Monte Carlo iterations with seed {seed}");

    let scenarios: Option<Vec<_>> = (0..iterations)
        .into_par_iter()
        .map(|iteration| {
            if token.is_cancelled() {
                return None;
            }

            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            rng.set_stream(u64::from(iteration));
            let reactor = vary_reactor(&mut rng, reactor);
            let financial = vary_financial(&mut rng, financial);
            Some(run_simulation(&reactor, &financial, policy))
        })
        .collect();

    let Some(scenarios) = scenarios else {
        bail!("Monte Carlo analysis cancelled");
    };

    Ok(analyse_scenarios(scenarios))
}

/// Compute the summary statistics for a set of scenarios
fn analyse_scenarios(scenarios: Vec<SimulationResult>) -> MonteCarloResult {
    let mut npvs: Vec<_> = scenarios.iter().map(|s| s.npv.value()).collect();
    npvs.sort_by(f64::total_cmp);
    let irrs: Vec<_> = scenarios.iter().map(|s| s.irr.rate.value()).collect();

    let profitable = npvs.iter().filter(|npv| **npv > 0.0).count();
    let tail_len = ((npvs.len() as f64 * CVAR_FRACTION).floor() as usize).max(1);

    MonteCarloResult {
        mean_npv: Money(mean(&npvs)),
        median_npv: Money(median(&npvs)),
        std_dev_npv: Money(std_dev(&npvs)),
        probability_profit: profitable as f64 / npvs.len() as f64,
        percentile_5: Money(percentile(&npvs, 0.05)),
        percentile_95: Money(percentile(&npvs, 0.95)),
        mean_irr: Dimensionless(mean(&irrs)),
        cvar_5: Money(mean(&npvs[..tail_len.min(npvs.len())])),
        scenarios,
    }
}

/// Arithmetic mean (NaN for an empty slice)
pub fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

/// Median of sorted values, averaging the middle pair for an even count
pub fn median(sorted: &[f64]) -> f64 {
    if sorted.is_empty() {
        return f64::NAN;
    }

    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 1 {
        sorted[mid]
    } else {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    }
}

/// Population standard deviation
pub fn std_dev(values: &[f64]) -> f64 {
    let avg = mean(values);
    let squared_diffs: Vec<_> = values.iter().map(|value| (value - avg).powi(2)).collect();
    mean(&squared_diffs).sqrt()
}

/// Nearest-rank percentile of sorted values, for `p` in [0, 1]
pub fn percentile(sorted: &[f64], p: f64) -> f64 {
    if sorted.is_empty() {
        return f64::NAN;
    }

    let rank = (sorted.len() as f64 * p).ceil() as usize;
    sorted[rank.saturating_sub(1).min(sorted.len() - 1)]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{model, simulation_result};
    use crate::model::Model;
    use float_cmp::assert_approx_eq;
    use rstest::rstest;

    fn run(model: &Model, iterations: u32, seed: u64) -> MonteCarloResult {
        run_monte_carlo_simulation(
            &model.reactor,
            &model.financial,
            &model.policy,
            iterations,
            seed,
        )
        .unwrap()
    }

    #[rstest]
    fn test_monte_carlo_reproducible(model: Model) {
        let first = run(&model, 50, 42);
        let second = run(&model, 50, 42);
        assert_eq!(first, second);
        assert_eq!(first.scenarios.len(), 50);

        let other = run(&model, 50, 43);
        assert_ne!(first.mean_npv, other.mean_npv);
    }

    #[rstest]
    fn test_monte_carlo_independent_of_thread_count(model: Model) {
        let expected = run(&model, 20, 7);
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(1)
            .build()
            .unwrap();
        let single_threaded = pool.install(|| run(&model, 20, 7));
        assert_eq!(single_threaded, expected);
    }

    #[rstest]
    fn test_monte_carlo_statistics(model: Model, simulation_result: SimulationResult) {
        let result = run(&model, 1000, 1234);

        assert!(result.percentile_5 <= result.median_npv);
        assert!(result.median_npv <= result.percentile_95);
        assert!(result.cvar_5 <= result.percentile_5);
        assert!((0.0..=1.0).contains(&result.probability_profit));
        assert!(result.std_dev_npv > Money(0.0));

        // Perturbations are symmetric, so the mean should be close to the base case
        let base = simulation_result.npv.value();
        let relative_error = (result.mean_npv.value() - base).abs() / base.abs();
        assert!(relative_error < 0.1, "relative error: {relative_error}");
    }

    #[rstest]
    fn test_perturbations_respect_bounds(model: Model) {
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        for _ in 0..1000 {
            let reactor = vary_reactor(&mut rng, &model.reactor);
            assert!((70.0..=98.0).contains(&reactor.uptime_percent));
            assert!((0.25..=0.40).contains(&reactor.thermal_efficiency));
            assert_eq!(reactor.capacity, model.reactor.capacity);

            let financial = vary_financial(&mut rng, &model.financial);
            assert!((30.0..=150.0).contains(&financial.electricity_price_per_mwh.value()));
            assert!((0.03..=0.12).contains(&financial.discount_rate.value()));
            assert!((0.01..=0.06).contains(&financial.inflation_rate.value()));
            assert!((0.0..=200.0).contains(&financial.carbon_tax_per_ton.value()));
            assert_eq!(
                financial.decommissioning_cost,
                model.financial.decommissioning_cost
            );
        }
    }

    #[test]
    fn test_random_variation_distribution() {
        let mut rng = ChaCha8Rng::seed_from_u64(99);
        let samples: Vec<_> = (0..20_000)
            .map(|_| random_variation(&mut rng, 100.0, 0.1, None))
            .collect();
        assert_approx_eq!(f64, mean(&samples), 100.0, epsilon = 0.5);
        assert_approx_eq!(f64, std_dev(&samples), 10.0, epsilon = 0.5);
    }

    #[rstest]
    fn test_monte_carlo_zero_iterations(model: Model) {
        let result = run_monte_carlo_simulation(
            &model.reactor,
            &model.financial,
            &model.policy,
            0,
            1,
        );
        assert!(result.is_err());
    }

    #[rstest]
    fn test_monte_carlo_cancelled(model: Model) {
        let token = CancellationToken::new();
        token.cancel();
        let result = run_monte_carlo_simulation_with_cancellation(
            &model.reactor,
            &model.financial,
            &model.policy,
            100,
            1,
            &token,
        );
        assert_eq!(
            result.unwrap_err().to_string(),
            "Monte Carlo analysis cancelled"
        );
    }

    #[rstest]
    fn test_monte_carlo_single_iteration(model: Model) {
        let result = run(&model, 1, 5);
        assert_eq!(result.mean_npv, result.median_npv);
        assert_eq!(result.percentile_5, result.percentile_95);
        assert_eq!(result.cvar_5, result.mean_npv);
        assert_eq!(result.std_dev_npv, Money(0.0));
    }

    #[rstest]
    #[case(0.05, 1.0)]
    #[case(0.5, 5.0)]
    #[case(0.95, 10.0)]
    #[case(1.0, 10.0)]
    #[case(0.0, 1.0)]
    fn test_percentile(#[case] p: f64, #[case] expected: f64) {
        let values: Vec<_> = (1..=10).map(f64::from).collect();
        assert_eq!(percentile(&values, p), expected);
    }

    #[rstest]
    #[case(&[1.0, 2.0, 3.0], 2.0)]
    #[case(&[1.0, 2.0, 3.0, 10.0], 2.5)]
    #[case(&[4.0], 4.0)]
    fn test_median(#[case] values: &[f64], #[case] expected: f64) {
        assert_eq!(median(values), expected);
    }

    #[test]
    fn test_std_dev() {
        assert_approx_eq!(f64, std_dev(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]), 2.0);
        assert!(mean(&[]).is_nan());
    }
}
