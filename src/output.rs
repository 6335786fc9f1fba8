//! The module responsible for writing output data to disk.
use crate::analysis::CorrelationMetrics;
use crate::decay::{
    DEFAULT_TARGET_DOSE_RATE, calculate_decay_heat, calculate_fission_products,
    calculate_radiation_dose, calculate_shielding_requirement,
};
use crate::model::{MODEL_FILE_NAME, Model, ReactorParameters};
use crate::monte_carlo::MonteCarloResult;
use crate::neutronics::{calculate_keff, calculate_neutron_flux, calculate_power_distribution};
use crate::physics::calculate_fuel_burnup;
use crate::simulation::SimulationResult;
use crate::units::{Dimensionless, Money};
use anyhow::{Context, Result, ensure};
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

pub mod metadata;

/// The root folder in which model-specific output folders will be created
const OUTPUT_DIRECTORY_ROOT: &str = "reactor_sim_results";

/// The output file name for the year-by-year results
pub const YEARLY_DATA_FILE_NAME: &str = "yearly_data.csv";

/// The output file name for Monte Carlo scenarios
pub const MONTE_CARLO_FILE_NAME: &str = "montecarlo_analysis.csv";

/// The output file name for the saved session
pub const SESSION_FILE_NAME: &str = "session.json";

/// The output file name for reliability/NPV correlation metrics
pub const CORRELATION_FILE_NAME: &str = "correlation.toml";

const NEUTRON_FLUX_FILE_NAME: &str = "neutron_flux.csv";
const POWER_DISTRIBUTION_FILE_NAME: &str = "power_distribution.csv";
const DECAY_HEAT_FILE_NAME: &str = "decay_heat.csv";
const FISSION_PRODUCTS_FILE_NAME: &str = "fission_products.csv";
const CORE_HISTORY_FILE_NAME: &str = "core_history.csv";
const SHIELDING_FILE_NAME: &str = "shielding.csv";

/// The output file name for discounted cash flows
const CASH_FLOWS_FILE_NAME: &str = "debug_cash_flows.csv";

/// Timestep at which the neutron flux is evaluated
const FLUX_TIMESTEP: f64 = 50.0;

/// Timestep at which the power distribution is evaluated
const POWER_TIMESTEP: f64 = 100.0;

/// Operating period (years) before shutdown used for the decay heat curve
const DECAY_HEAT_OPERATING_YEARS: f64 = 1000.0;

/// Spent fuel cooling times (hours) at which dose and shielding are reported: shutdown, one day,
/// one week, one month and one year
const SHIELDING_COOLING_HOURS: [f64; 5] = [0.0, 24.0, 168.0, 720.0, 8760.0];

const YEARLY_DATA_HEADERS: [&str; 11] = [
    "Year",
    "Energy Produced (MWh)",
    "Revenue ($M)",
    "Operating Cost ($M)",
    "Cash Flow ($M)",
    "Cumulative Cash Flow ($M)",
    "CO2 Avoided (tons)",
    "Waste Produced (tons)",
    "Fuel Temperature (°C)",
    "Coolant Temperature (°C)",
    "Reactivity (k-eff)",
];

const MONTE_CARLO_HEADERS: [&str; 4] = ["Scenario", "NPV ($M)", "IRR (%)", "Payback (years)"];

/// Get the default output folder for the model at the specified path.
///
/// The path may point at either a model file or the folder containing `model.toml`. In the latter
/// case, or if the file is called `model.toml`, the model is named after its folder.
pub fn get_output_dir(model_path: &Path) -> Result<PathBuf> {
    let model_path = model_path
        .canonicalize() // canonicalise in case the user has specified "."
        .context("Could not resolve path to model")?;

    let model_name = if model_path.is_file() {
        if model_path
            .file_name()
            .is_some_and(|name| name == MODEL_FILE_NAME)
        {
            model_path.parent().and_then(Path::file_name)
        } else {
            model_path.file_stem()
        }
    } else {
        model_path.file_name()
    };

    let model_name = model_name
        .context("Model cannot be in root folder")?
        .to_str()
        .context("Invalid chars in model name")?;

    Ok([OUTPUT_DIRECTORY_ROOT, model_name].iter().collect())
}

/// Create a new output directory.
///
/// If the folder already contains files, they are deleted when `allow_overwrite` is set; otherwise
/// an error is returned.
///
/// # Returns
///
/// Whether an existing output folder was overwritten
pub fn create_output_directory(output_dir: &Path, allow_overwrite: bool) -> Result<bool> {
    let overwrite = if let Ok(mut entries) = fs::read_dir(output_dir) {
        if entries.next().is_none() {
            // Already exists and is empty
            return Ok(false);
        }

        ensure!(
            allow_overwrite,
            "Output folder already exists and is not empty. Rerun with --overwrite to replace it."
        );
        fs::remove_dir_all(output_dir)?;
        true
    } else {
        false
    };

    fs::create_dir_all(output_dir)?;

    Ok(overwrite)
}

fn output_err_msg(file_path: &Path) -> String {
    format!("Error writing {}", file_path.display())
}

/// Current time in RFC 3339 format
fn timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Express an amount of money in millions of dollars
fn millions(value: Money) -> f64 {
    value.value() / 1e6
}

/// Format a rate as a percentage, flagging rates from an IRR solve which did not converge
fn format_irr(rate: Dimensionless, converged: bool) -> String {
    let percent = format!("{:.2}%", rate.value() * 100.0);
    if converged {
        percent
    } else {
        format!("{percent} (not converged)")
    }
}

fn create_file(file_path: &Path) -> Result<BufWriter<File>> {
    let file = File::create(file_path).with_context(|| output_err_msg(file_path))?;
    Ok(BufWriter::new(file))
}

/// Write the year-by-year results of a simulation along with summary metrics.
///
/// Monetary columns are in millions of dollars.
pub fn write_yearly_data(output_dir: &Path, model: &Model, result: &SimulationResult) -> Result<()> {
    let file_path = output_dir.join(YEARLY_DATA_FILE_NAME);
    let mut file = create_file(&file_path)?;
    let reactor = &model.reactor;

    writeln!(file, "# Nuclear Reactor Simulation Results")?;
    writeln!(
        file,
        "# Reactor: {} - {}MW",
        reactor.reactor_type, reactor.capacity
    )?;
    writeln!(
        file,
        "# Fuel: {} at {}% enrichment",
        reactor.fuel_type, reactor.enrichment_percent
    )?;
    writeln!(file, "# Generated: {}", timestamp())?;
    writeln!(file)?;

    {
        let mut writer = csv::Writer::from_writer(&mut file);
        writer.write_record(YEARLY_DATA_HEADERS)?;
        for data in &result.yearly_data {
            writer.write_record([
                data.year.to_string(),
                format!("{:.2}", data.energy_produced.value()),
                format!("{:.2}", millions(data.revenue)),
                format!("{:.2}", millions(data.operating_cost)),
                format!("{:.2}", millions(data.cash_flow)),
                format!("{:.2}", millions(data.cumulative_cash_flow)),
                format!("{:.2}", data.co2_avoided.value()),
                format!("{:.4}", data.waste_produced.value()),
                format!("{:.2}", data.fuel_temperature),
                format!("{:.2}", data.coolant_temperature),
                format!("{:.4}", data.reactivity),
            ])?;
        }
        writer.flush()?;
    }

    writeln!(file)?;
    writeln!(file, "# Summary Metrics")?;
    writeln!(file, "NPV,${:.2}M", millions(result.npv))?;
    writeln!(
        file,
        "IRR,{}",
        format_irr(result.irr.rate, result.irr.converged)
    )?;
    writeln!(file, "Payback Period,{:.1} years", result.payback_years)?;
    writeln!(
        file,
        "Total Energy,{:.2} TWh",
        result.energy_produced.value() / 1e6
    )?;
    writeln!(
        file,
        "Total CO2 Avoided,{:.2}M tons",
        result.co2_avoided.value() / 1e6
    )?;
    writeln!(file, "Total Waste,{:.2} tons", result.waste_produced.value())?;
    writeln!(
        file,
        "Accident Probability,{:.4}%",
        result.accident_probability * 100.0
    )?;
    file.flush().with_context(|| output_err_msg(&file_path))?;

    Ok(())
}

/// Write the scenarios of a Monte Carlo analysis along with summary statistics
pub fn write_monte_carlo(output_dir: &Path, monte_carlo: &MonteCarloResult) -> Result<()> {
    let file_path = output_dir.join(MONTE_CARLO_FILE_NAME);
    let mut file = create_file(&file_path)?;

    writeln!(file, "# Monte Carlo Risk Analysis Results")?;
    writeln!(file, "# Scenarios: {}", monte_carlo.scenarios.len())?;
    writeln!(file, "# Generated: {}", timestamp())?;
    writeln!(file)?;

    {
        let mut writer = csv::Writer::from_writer(&mut file);
        writer.write_record(MONTE_CARLO_HEADERS)?;
        for (scenario, result) in (1u32..).zip(&monte_carlo.scenarios) {
            writer.write_record([
                scenario.to_string(),
                format!("{:.2}", millions(result.npv)),
                format!("{:.2}", result.irr.rate.value() * 100.0),
                format!("{:.2}", result.payback_years),
            ])?;
        }
        writer.flush()?;
    }

    writeln!(file)?;
    writeln!(file, "# Statistical Summary")?;
    writeln!(file, "Mean NPV,${:.2}M", millions(monte_carlo.mean_npv))?;
    writeln!(file, "Median NPV,${:.2}M", millions(monte_carlo.median_npv))?;
    writeln!(file, "Std Dev NPV,${:.2}M", millions(monte_carlo.std_dev_npv))?;
    writeln!(
        file,
        "Profit Probability,{:.2}%",
        monte_carlo.probability_profit * 100.0
    )?;
    writeln!(
        file,
        "5th Percentile NPV,${:.2}M",
        millions(monte_carlo.percentile_5)
    )?;
    writeln!(
        file,
        "95th Percentile NPV,${:.2}M",
        millions(monte_carlo.percentile_95)
    )?;
    writeln!(
        file,
        "Mean IRR,{:.2}%",
        monte_carlo.mean_irr.value() * 100.0
    )?;
    writeln!(file, "5% CVaR NPV,${:.2}M", millions(monte_carlo.cvar_5))?;
    file.flush().with_context(|| output_err_msg(&file_path))?;

    Ok(())
}

/// Write the reliability/NPV correlation metrics in TOML format
pub fn write_correlation(output_dir: &Path, metrics: &CorrelationMetrics) -> Result<()> {
    let file_path = output_dir.join(CORRELATION_FILE_NAME);
    fs::write(&file_path, toml::to_string(metrics)?).with_context(|| output_err_msg(&file_path))?;

    Ok(())
}

/// Serialise each of `rows` as a row of a CSV file
fn write_rows<T: Serialize>(file_path: &Path, rows: &[T]) -> Result<()> {
    let mut writer = csv::Writer::from_path(file_path).with_context(|| output_err_msg(file_path))?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;

    Ok(())
}

/// Core state at the start of one year of operation
#[derive(Serialize)]
struct CoreHistoryRow {
    year: u32,
    keff: f64,
    /// GWd/MTU
    fuel_burnup: f64,
}

/// Dose from spent fuel after cooling, with the shielding needed to meet the target dose rate
#[derive(Serialize)]
struct ShieldingRow {
    cooling_hours: f64,
    /// mSv/h at 1 m
    dose_rate: f64,
    concrete_cm: f64,
    lead_cm: f64,
    water_cm: f64,
}

fn core_history(reactor: &ReactorParameters) -> Vec<CoreHistoryRow> {
    (0..reactor.plant_lifespan_years)
        .map(|year| CoreHistoryRow {
            year: year + 1,
            keff: calculate_keff(reactor, year),
            fuel_burnup: calculate_fuel_burnup(reactor, year),
        })
        .collect()
}

fn shielding(reactor: &ReactorParameters) -> Vec<ShieldingRow> {
    SHIELDING_COOLING_HOURS
        .iter()
        .map(|&cooling_hours| {
            let dose_rate = calculate_radiation_dose(reactor, cooling_hours);
            let shielding = calculate_shielding_requirement(dose_rate, DEFAULT_TARGET_DOSE_RATE);
            ShieldingRow {
                cooling_hours,
                dose_rate,
                concrete_cm: shielding.concrete,
                lead_cm: shielding.lead,
                water_cm: shielding.water,
            }
        })
        .collect()
}

/// Write the auxiliary physics outputs: neutron flux, power distribution, decay heat, fission
/// products, the year-by-year core history and spent fuel shielding
pub fn write_physics_data(output_dir: &Path, reactor: &ReactorParameters) -> Result<()> {
    write_rows(
        &output_dir.join(NEUTRON_FLUX_FILE_NAME),
        &calculate_neutron_flux(reactor, FLUX_TIMESTEP),
    )?;
    write_rows(
        &output_dir.join(POWER_DISTRIBUTION_FILE_NAME),
        &calculate_power_distribution(reactor, POWER_TIMESTEP),
    )?;
    write_rows(
        &output_dir.join(DECAY_HEAT_FILE_NAME),
        &calculate_decay_heat(reactor, DECAY_HEAT_OPERATING_YEARS),
    )?;
    write_rows(
        &output_dir.join(FISSION_PRODUCTS_FILE_NAME),
        &calculate_fission_products(reactor, f64::from(reactor.plant_lifespan_years)),
    )?;
    write_rows(&output_dir.join(CORE_HISTORY_FILE_NAME), &core_history(reactor))?;
    write_rows(&output_dir.join(SHIELDING_FILE_NAME), &shielding(reactor))?;

    Ok(())
}

/// Represents a row in the discounted cash flows CSV file
#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct CashFlowRow {
    year: u32,
    cash_flow: Money,
    discount_factor: Dimensionless,
    discounted_cash_flow: Money,
    cumulative_discounted_cash_flow: Money,
}

/// Write each cash flow alongside its discounted value.
///
/// Year 0 is construction. The final cumulative discounted cash flow is the NPV.
pub fn write_debug_cash_flows(
    output_dir: &Path,
    result: &SimulationResult,
    discount_rate: Dimensionless,
) -> Result<()> {
    let mut cumulative = Money(0.0);
    let rows: Vec<_> = result
        .cash_flows()
        .into_iter()
        .zip(0u32..)
        .map(|(cash_flow, year)| {
            let discount_factor =
                Dimensionless(1.0 / (1.0 + discount_rate.value()).powi(year as i32));
            let discounted_cash_flow = cash_flow * discount_factor;
            cumulative += discounted_cash_flow;
            CashFlowRow {
                year,
                cash_flow,
                discount_factor,
                discounted_cash_flow,
                cumulative_discounted_cash_flow: cumulative,
            }
        })
        .collect();

    write_rows(&output_dir.join(CASH_FLOWS_FILE_NAME), &rows)
}

/// Everything needed to inspect or reproduce a run: the model and its results
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    /// The parameters which were simulated
    pub model: Model,
    /// Result of the deterministic simulation
    pub result: SimulationResult,
    /// Result of the Monte Carlo analysis, if one was run
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub monte_carlo: Option<MonteCarloResult>,
}

impl Session {
    /// Save the session as JSON in the given folder
    pub fn save(&self, output_dir: &Path) -> Result<()> {
        let file_path = output_dir.join(SESSION_FILE_NAME);
        let mut file = create_file(&file_path)?;
        serde_json::to_writer_pretty(&mut file, self)
            .with_context(|| output_err_msg(&file_path))?;
        file.flush()?;

        Ok(())
    }

    /// Load a session previously written with [`Session::save`]
    pub fn load(file_path: &Path) -> Result<Self> {
        let file = File::open(file_path)
            .with_context(|| format!("Error reading {}", file_path.display()))?;
        serde_json::from_reader(BufReader::new(file))
            .with_context(|| format!("Error reading {}", file_path.display()))
    }
}

/// Write all the outputs of a deterministic simulation run
pub fn write_simulation_outputs(
    output_dir: &Path,
    model: &Model,
    result: &SimulationResult,
    debug_model: bool,
) -> Result<()> {
    write_yearly_data(output_dir, model, result)?;
    write_physics_data(output_dir, &model.reactor)?;
    if debug_model {
        write_debug_cash_flows(output_dir, result, model.financial.discount_rate)?;
    }

    Ok(())
}
