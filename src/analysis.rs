//! Secondary analyses built on top of simulation and Monte Carlo results.
//!
//! These consume [`crate::simulation::SimulationResult`] and
//! [`crate::monte_carlo::MonteCarloResult`] values but never feed back into them.
pub mod correlation;
pub use correlation::{CorrelationMetrics, calculate_nuclear_financial_correlation};
pub mod policy;
pub use policy::{
    PolicyComparison, PolicyImpact, PolicyScenario, compare_policy_shock, simulate_policy_shock,
};
pub mod portfolio;
pub use portfolio::{OptimisedPortfolio, optimise_portfolio};
