//! Records which command, model, seed and build produced a set of results.
use crate::model::Model;
use crate::neutronics::calculate_neutron_generation_time;
use crate::physics::calculate_maintenance_cycles;
use crate::settings::seed_repr;
use anyhow::{Context, Result, anyhow};
use chrono::Local;
use platform_info::{PlatformInfo, PlatformInfoAPI, UNameAPI};
use serde::Serialize;
use std::fmt::Write;
use std::fs;
use std::path::Path;

/// The output file name for metadata
const METADATA_FILE_NAME: &str = "metadata.toml";

/// Information about the program build via `built` crate
mod built_info {
    // The file has been placed there by the build script.
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

/// The command that produced a set of results
#[derive(Debug, Clone, Copy)]
pub struct RunInfo<'a> {
    /// CLI command name, e.g. `run` or `monte-carlo`
    pub command: &'a str,
    /// Path to the model being simulated
    pub model_path: &'a Path,
    /// Master seed, for stochastic commands
    pub seed: Option<u64>,
}

impl RunInfo<'_> {
    /// A one-line description of the run, e.g. `reactor-sim 0.1.0 monte-carlo plant.toml (seed 42)`
    pub fn summary(&self) -> String {
        let mut summary = format!(
            "{} {} {} {}",
            built_info::PKG_NAME,
            built_info::PKG_VERSION,
            self.command,
            self.model_path.display()
        );
        if let Some(seed) = self.seed {
            // Writing to a String can't fail
            let _ = write!(summary, " (seed {seed})");
        }

        summary
    }
}

#[derive(Serialize)]
struct Metadata<'a> {
    run: RunSection<'a>,
    plant: PlantSection,
    build: BuildSection,
    /// Operating system and architecture of the machine the run took place on
    platform: String,
}

#[derive(Serialize)]
struct RunSection<'a> {
    command: &'a str,
    model_path: &'a Path,
    #[serde(with = "seed_repr", skip_serializing_if = "Option::is_none")]
    seed: Option<u64>,
    started: String,
}

/// The plant which was simulated
#[derive(Serialize)]
struct PlantSection {
    reactor: String,
    fuel: String,
    lifespan_years: u32,
    maintenance_cycles: u32,
    /// Seconds
    neutron_generation_time: f64,
}

impl PlantSection {
    fn new(model: &Model) -> Self {
        let reactor = &model.reactor;
        Self {
            reactor: format!("{} {} MW", reactor.reactor_type, reactor.capacity),
            fuel: format!(
                "{} at {}% enrichment",
                reactor.fuel_type, reactor.enrichment_percent
            ),
            lifespan_years: reactor.plant_lifespan_years,
            maintenance_cycles: calculate_maintenance_cycles(reactor),
            neutron_generation_time: calculate_neutron_generation_time(reactor),
        }
    }
}

#[derive(Serialize)]
struct BuildSection {
    version: &'static str,
    /// Short git hash, marked `-dirty` for builds with uncommitted changes
    commit: String,
    rustc: &'static str,
    target: &'static str,
}

impl BuildSection {
    fn new() -> Self {
        let commit = match built_info::GIT_COMMIT_HASH_SHORT {
            Some(hash) if built_info::GIT_DIRTY == Some(true) => format!("{hash}-dirty"),
            Some(hash) => hash.to_string(),
            None => "unknown".to_string(),
        };

        Self {
            version: built_info::PKG_VERSION,
            commit,
            rustc: built_info::RUSTC_VERSION,
            target: built_info::TARGET,
        }
    }
}

/// Describe the platform as e.g. `GNU/Linux 6.1.0 (x86_64)`
fn describe_platform() -> Result<String> {
    let info = PlatformInfo::new()
        .map_err(|err| anyhow!("{err}"))
        .context("Unable to determine platform info")?;

    Ok(format!(
        "{} {} ({})",
        info.osname().to_string_lossy(),
        info.release().to_string_lossy(),
        info.machine().to_string_lossy()
    ))
}

/// Write `metadata.toml` to the output folder
pub fn write_metadata(output_path: &Path, run: &RunInfo, model: &Model) -> Result<()> {
    let metadata = Metadata {
        run: RunSection {
            command: run.command,
            model_path: run.model_path,
            seed: run.seed,
            started: Local::now().to_rfc3339(),
        },
        plant: PlantSection::new(model),
        build: BuildSection::new(),
        platform: describe_platform()?,
    };
    let file_path = output_path.join(METADATA_FILE_NAME);
    fs::write(&file_path, toml::to_string(&metadata)?)
        .with_context(|| format!("Error writing {}", file_path.display()))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::model;
    use rstest::rstest;
    use tempfile::tempdir;

    fn read_metadata(dir: &Path) -> toml::Table {
        toml::from_str(&fs::read_to_string(dir.join(METADATA_FILE_NAME)).unwrap()).unwrap()
    }

    #[rstest]
    fn test_write_metadata(model: Model) {
        let dir = tempdir().unwrap();
        let run = RunInfo {
            command: "monte-carlo",
            model_path: Path::new("model.toml"),
            seed: Some(42),
        };
        write_metadata(dir.path(), &run, &model).unwrap();

        let metadata = read_metadata(dir.path());
        assert_eq!(metadata["run"]["command"].as_str(), Some("monte-carlo"));
        assert_eq!(metadata["run"]["seed"].as_integer(), Some(42));
        assert_eq!(metadata["plant"]["reactor"].as_str(), Some("PWR 1000 MW"));
        assert_eq!(
            metadata["plant"]["fuel"].as_str(),
            Some("U-235 at 5% enrichment")
        );
        // A PWR is refuelled every six years
        assert_eq!(metadata["plant"]["maintenance_cycles"].as_integer(), Some(6));
        assert_eq!(
            metadata["build"]["version"].as_str(),
            Some(env!("CARGO_PKG_VERSION"))
        );
        assert!(metadata["platform"].is_str());
    }

    #[rstest]
    fn test_write_metadata_large_seed(model: Model) {
        let dir = tempdir().unwrap();
        let run = RunInfo {
            command: "monte-carlo",
            model_path: Path::new("model.toml"),
            seed: Some(u64::MAX),
        };
        write_metadata(dir.path(), &run, &model).unwrap();

        let metadata = read_metadata(dir.path());
        assert_eq!(
            metadata["run"]["seed"].as_str(),
            Some("18446744073709551615")
        );
    }

    #[test]
    fn test_run_summary() {
        let mut run = RunInfo {
            command: "run",
            model_path: Path::new("plant.toml"),
            seed: None,
        };
        let version = env!("CARGO_PKG_VERSION");
        assert_eq!(
            run.summary(),
            format!("reactor-sim {version} run plant.toml")
        );

        run.seed = Some(7);
        assert!(run.summary().ends_with("plant.toml (seed 7)"));
    }
}
