//! The command line interface for the simulation.
use crate::analysis::{
    PolicyScenario, calculate_nuclear_financial_correlation, compare_policy_shock,
    optimise_portfolio,
};
use crate::finance::calculate_break_even;
use crate::log;
use crate::model::Model;
use crate::monte_carlo::{run_monte_carlo_simulation, time_based_seed};
use crate::output::metadata::{RunInfo, write_metadata};
use crate::output::{
    Session, create_output_directory, get_output_dir, write_correlation, write_monte_carlo,
    write_simulation_outputs,
};
use crate::physics::calculate_maintenance_cycles;
use crate::settings::Settings;
use crate::simulation::{SimulationResult, run_simulation};
use ::log::{info, warn};
use anyhow::{Context, Result};
use clap::{Args, CommandFactory, Parser, Subcommand};
use std::path::{Path, PathBuf};

pub mod preset;
use preset::PresetSubcommands;
pub mod settings;
use settings::SettingsSubcommands;

/// The command line interface for the simulation.
#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// The available commands.
    #[command(subcommand)]
    command: Option<Commands>,
    /// Flag to provide the CLI docs as markdown
    #[arg(long, hide = true)]
    markdown_help: bool,
}

/// Options for commands which write output files
#[derive(Args, Default)]
pub struct RunOpts {
    /// Directory for output files
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,
    /// Whether to overwrite the output directory if it already exists
    #[arg(long)]
    pub overwrite: bool,
    /// Whether to write additional information to CSV files
    #[arg(long)]
    pub debug_model: bool,
}

/// Options for the monte-carlo command
#[derive(Args, Default)]
pub struct MonteCarloOpts {
    /// Number of scenarios to simulate
    #[arg(short = 'n', long)]
    pub iterations: Option<u32>,
    /// Seed for the random number generator
    #[arg(long)]
    pub seed: Option<u64>,
}

/// Options for the portfolio command
#[derive(Args)]
pub struct PortfolioOpts {
    /// Holding period in years
    #[arg(long, default_value_t = 40)]
    pub time_horizon: u32,
    /// Appetite for risk, from 0 (averse) to 1 (neutral)
    #[arg(long, default_value_t = 0.5)]
    pub risk_tolerance: f64,
    /// Return the portfolio should reach
    #[arg(long)]
    pub target_return: Option<f64>,
}

/// The available commands.
#[derive(Subcommand)]
enum Commands {
    /// Run a deterministic simulation of a plant.
    Run {
        /// Path to the model file or the folder containing it.
        model_path: PathBuf,
        /// Other run options
        #[command(flatten)]
        opts: RunOpts,
    },
    /// Run a Monte Carlo risk analysis of a plant.
    MonteCarlo {
        /// Path to the model file or the folder containing it.
        model_path: PathBuf,
        /// Output options
        #[command(flatten)]
        opts: RunOpts,
        /// Monte Carlo options
        #[command(flatten)]
        monte_carlo_opts: MonteCarloOpts,
    },
    /// Validate a model.
    Validate {
        /// Path to the model file or the folder containing it.
        model_path: PathBuf,
    },
    /// Compare a plant with and without a policy shock.
    Policy {
        /// Path to the model file or the folder containing it.
        model_path: PathBuf,
        /// The policy shock to apply
        scenario: PolicyScenario,
    },
    /// Choose an isotope investment portfolio.
    Portfolio {
        /// Portfolio options
        #[command(flatten)]
        opts: PortfolioOpts,
    },
    /// Manage built-in preset models.
    Preset {
        /// The available subcommands for managing preset models.
        #[command(subcommand)]
        subcommand: PresetSubcommands,
    },
    /// Manage program settings.
    Settings {
        /// The available subcommands for managing settings.
        #[command(subcommand)]
        subcommand: SettingsSubcommands,
    },
}

impl Commands {
    /// Execute the supplied CLI command
    fn execute(self) -> Result<()> {
        match self {
            Self::Run { model_path, opts } => handle_run_command(&model_path, &opts, None),
            Self::MonteCarlo {
                model_path,
                opts,
                monte_carlo_opts,
            } => handle_monte_carlo_command(&model_path, &opts, &monte_carlo_opts, None),
            Self::Validate { model_path } => handle_validate_command(&model_path, None),
            Self::Policy {
                model_path,
                scenario,
            } => handle_policy_command(&model_path, scenario, None),
            Self::Portfolio { opts } => handle_portfolio_command(&opts, None),
            Self::Preset { subcommand } => subcommand.execute(),
            Self::Settings { subcommand } => subcommand.execute(),
        }
    }
}

/// Parse CLI arguments and start the program
pub fn run_cli() -> Result<()> {
    let cli = Cli::parse();

    // Invoked as: `$ reactor-sim --markdown-help`
    if cli.markdown_help {
        clap_markdown::print_help_markdown::<Cli>();
        return Ok(());
    }

    let Some(command) = cli.command else {
        // Output program help
        let help_str = Cli::command().render_long_help().to_string();
        println!("{help_str}");
        return Ok(());
    };

    command.execute()
}

/// Load program settings, if not provided
fn load_settings(settings: Option<Settings>) -> Result<Settings> {
    if let Some(settings) = settings {
        Ok(settings)
    } else {
        Settings::load().context("Failed to load settings.")
    }
}

/// Initialise the program logger, with a run log in the output folder if there is one.
///
/// Does nothing if an earlier command in the same process has already done so.
fn init_logger(settings: &Settings, run_log: Option<(&Path, &RunInfo)>) -> Result<()> {
    if log::is_logger_initialised() {
        return Ok(());
    }

    log::init(&settings.log_level, run_log).context("Failed to initialise logging.")
}

/// Create the output folder and start logging to it.
///
/// # Returns
///
/// The path to the output folder
fn prepare_output_dir(run: &RunInfo, opts: &RunOpts, settings: &Settings) -> Result<PathBuf> {
    let output_path = if let Some(p) = opts.output_dir.as_deref() {
        p.to_path_buf()
    } else {
        get_output_dir(run.model_path)?
    };

    let overwrite = create_output_directory(&output_path, opts.overwrite || settings.overwrite)
        .with_context(|| {
            format!(
                "Failed to create output directory: {}",
                output_path.display()
            )
        })?;

    init_logger(settings, Some((&output_path, run)))?;

    // NB: We have to wait until the logger is initialised to display this warning
    if overwrite {
        warn!("Output folder will be overwritten");
    }
    info!("Output folder: {}", output_path.display());

    Ok(output_path)
}

/// Load a model, logging where it came from
fn load_model(model_path: &Path) -> Result<Model> {
    let model = Model::from_path(model_path).context("Failed to load model.")?;
    info!("Loaded model from {}", model_path.display());

    Ok(model)
}

/// Log the headline results of a simulation
fn log_simulation_summary(model: &Model, result: &SimulationResult) {
    info!("Energy produced: {:.2} TWh", result.energy_produced.value() / 1e6);
    info!("NPV: ${:.2}M", result.npv.value() / 1e6);
    if result.irr.converged {
        info!("IRR: {:.2}%", result.irr.rate.value() * 100.0);
    } else {
        warn!(
            "IRR did not converge after {} iterations (last estimate: {:.2}%)",
            result.irr.iterations,
            result.irr.rate.value() * 100.0
        );
    }
    info!("Payback period: {:.1} years", result.payback_years);
    info!("CO2 avoided: {:.2}M tons", result.co2_avoided.value() / 1e6);
    info!(
        "Major maintenance outages: {}",
        calculate_maintenance_cycles(&model.reactor)
    );

    let break_even = calculate_break_even(result, model.financial.electricity_price_per_mwh);
    info!(
        "Break-even electricity price: ${:.2}/MWh ({:+.1}% margin at current price)",
        break_even.price.value(),
        break_even.margin_percent
    );
}

/// Handle the `run` command.
pub fn handle_run_command(
    model_path: &Path,
    opts: &RunOpts,
    settings: Option<Settings>,
) -> Result<()> {
    let mut settings = load_settings(settings)?;

    // This setting can be overridden by command-line argument
    if opts.debug_model {
        settings.debug_model = true;
    }

    let run = RunInfo {
        command: "run",
        model_path,
        seed: None,
    };
    let output_path = prepare_output_dir(&run, opts, &settings)?;
    let model = load_model(model_path)?;

    let result = run_simulation(&model.reactor, &model.financial, &model.policy);
    log_simulation_summary(&model, &result);

    write_simulation_outputs(&output_path, &model, &result, settings.debug_model)?;
    write_metadata(&output_path, &run, &model)?;
    Session {
        model,
        result,
        monte_carlo: None,
    }
    .save(&output_path)?;
    info!("Simulation complete!");

    Ok(())
}

/// Handle the `monte-carlo` command.
pub fn handle_monte_carlo_command(
    model_path: &Path,
    opts: &RunOpts,
    monte_carlo_opts: &MonteCarloOpts,
    settings: Option<Settings>,
) -> Result<()> {
    let settings = load_settings(settings)?;
    let iterations = monte_carlo_opts
        .iterations
        .unwrap_or(settings.monte_carlo.iterations);
    let seed = monte_carlo_opts
        .seed
        .or(settings.monte_carlo.seed)
        .unwrap_or_else(time_based_seed);

    let run = RunInfo {
        command: "monte-carlo",
        model_path,
        seed: Some(seed),
    };
    let output_path = prepare_output_dir(&run, opts, &settings)?;
    let model = load_model(model_path)?;

    let result = run_simulation(&model.reactor, &model.financial, &model.policy);
    let monte_carlo = run_monte_carlo_simulation(
        &model.reactor,
        &model.financial,
        &model.policy,
        iterations,
        seed,
    )?;
    info!("Mean NPV: ${:.2}M", monte_carlo.mean_npv.value() / 1e6);
    info!(
        "Probability of profit: {:.1}%",
        monte_carlo.probability_profit * 100.0
    );
    info!(
        "90% of scenarios have an NPV between ${:.2}M and ${:.2}M",
        monte_carlo.percentile_5.value() / 1e6,
        monte_carlo.percentile_95.value() / 1e6
    );

    let correlation = calculate_nuclear_financial_correlation(&monte_carlo, &result);
    info!(
        "Correlation between reliability and NPV: {:.3}",
        correlation.correlation_coefficient
    );

    write_monte_carlo(&output_path, &monte_carlo)?;
    write_correlation(&output_path, &correlation)?;
    write_metadata(&output_path, &run, &model)?;
    Session {
        model,
        result,
        monte_carlo: Some(monte_carlo),
    }
    .save(&output_path)?;
    info!("Monte Carlo analysis complete!");

    Ok(())
}

/// Handle the `validate` command.
pub fn handle_validate_command(model_path: &Path, settings: Option<Settings>) -> Result<()> {
    let settings = load_settings(settings)?;

    // Initialise program logger (we won't save log files when running the validate command)
    init_logger(&settings, None)?;

    // Load/validate the model
    Model::from_path(model_path).context("Failed to validate model.")?;
    info!("Model validation successful!");

    Ok(())
}

/// Handle the `policy` command.
pub fn handle_policy_command(
    model_path: &Path,
    scenario: PolicyScenario,
    settings: Option<Settings>,
) -> Result<()> {
    let settings = load_settings(settings)?;
    init_logger(&settings, None)?;
    let model = load_model(model_path)?;

    let comparison = compare_policy_shock(scenario, &model.reactor, &model.financial, &model.policy);
    let impact = &comparison.impact;
    info!("{}: {}", impact.name, impact.description);
    info!(
        "NPV change: ${:.2}M (${:.2}M -> ${:.2}M)",
        comparison.npv_change.value() / 1e6,
        comparison.base.npv.value() / 1e6,
        comparison.shocked.npv.value() / 1e6
    );
    info!(
        "Energy change: {:.2} TWh",
        comparison.energy_change.value() / 1e6
    );
    info!(
        "CO2 avoided change: {:.2}M tons",
        comparison.co2_avoided_change.value() / 1e6
    );

    let expected = &impact.expected_impacts;
    info!(
        "Expected impacts: energy cost {:+}%, portfolio loss ${:.0}M, CO2 reduction {:+}%, \
         reliability {:+}%",
        expected.energy_cost_change,
        expected.portfolio_loss_expected.value() / 1e6,
        expected.co2_reduction_change,
        expected.reliability_change
    );

    Ok(())
}

/// Handle the `portfolio` command.
pub fn handle_portfolio_command(opts: &PortfolioOpts, settings: Option<Settings>) -> Result<()> {
    let settings = load_settings(settings)?;
    init_logger(&settings, None)?;

    let portfolio = optimise_portfolio(opts.target_return, opts.time_horizon, opts.risk_tolerance)?;
    for allocation in &portfolio.allocations {
        info!(
            "{}: {:.1}% (expected return {:.1}, risk {:.2})",
            allocation.isotope,
            allocation.weight * 100.0,
            allocation.expected_return,
            allocation.expected_risk
        );
    }
    info!(
        "Expected return: {:.2}, risk: {:.3} ({:.3} with correlations)",
        portfolio.expected_total_return, portfolio.expected_total_risk, portfolio.correlated_risk
    );
    info!(
        "Sharpe ratio: {:.2}, efficiency score: {:.2}",
        portfolio.sharpe_ratio, portfolio.efficiency_score
    );
    match portfolio.meets_target_return {
        Some(true) => info!("Target return met"),
        Some(false) => warn!("Target return not met"),
        None => {}
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_monte_carlo_args() {
        let cli = Cli::parse_from([
            "reactor-sim",
            "monte-carlo",
            "model.toml",
            "-n",
            "50",
            "--seed",
            "7",
            "--overwrite",
        ]);
        let Some(Commands::MonteCarlo {
            model_path,
            opts,
            monte_carlo_opts,
        }) = cli.command
        else {
            panic!("Expected monte-carlo command");
        };
        assert_eq!(model_path, PathBuf::from("model.toml"));
        assert!(opts.overwrite);
        assert_eq!(monte_carlo_opts.iterations, Some(50));
        assert_eq!(monte_carlo_opts.seed, Some(7));
    }

    #[test]
    fn test_parse_policy_scenario() {
        let cli = Cli::parse_from(["reactor-sim", "policy", "model.toml", "subsidy_cut"]);
        assert!(matches!(
            cli.command,
            Some(Commands::Policy {
                scenario: PolicyScenario::SubsidyCut,
                ..
            })
        ));
        assert!(
            Cli::try_parse_from(["reactor-sim", "policy", "model.toml", "free_energy"]).is_err()
        );
    }
}
