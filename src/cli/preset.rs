//! Code related to the built-in preset models and the CLI commands for interacting with them.
use super::{RunOpts, handle_run_command};
use crate::settings::Settings;
use anyhow::{Context, Result, bail, ensure};
use clap::Subcommand;
use include_dir::{Dir, DirEntry, include_dir};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// The directory containing the preset models.
static PRESETS_DIR: Dir<'static> = include_dir!("$CARGO_MANIFEST_DIR/presets");

/// The available subcommands for managing preset models.
#[derive(Subcommand)]
pub enum PresetSubcommands {
    /// List available presets.
    List,
    /// Provide information about the specified preset.
    Info {
        /// The name of the preset.
        name: String,
    },
    /// Extract a preset model to a new directory.
    Extract {
        /// The name of the preset to extract.
        name: String,
        /// The destination folder for the preset.
        new_path: Option<PathBuf>,
    },
    /// Run a preset.
    Run {
        /// The name of the preset to run.
        name: String,
        /// Other run options
        #[command(flatten)]
        opts: RunOpts,
    },
}

impl PresetSubcommands {
    /// Execute the supplied preset subcommand
    pub fn execute(self) -> Result<()> {
        match self {
            Self::List => handle_preset_list_command(),
            Self::Info { name } => handle_preset_info_command(&name)?,
            Self::Extract {
                name,
                new_path: dest,
            } => handle_preset_extract_command(&name, dest.as_deref())?,
            Self::Run { name, opts } => handle_preset_run_command(&name, &opts, None)?,
        }

        Ok(())
    }
}

/// Names of the built-in presets
pub fn preset_names() -> impl Iterator<Item = &'static str> {
    PRESETS_DIR
        .dirs()
        .filter_map(|dir| dir.path().file_name()?.to_str())
}

/// Handle the `preset list` command.
fn handle_preset_list_command() {
    for name in preset_names() {
        println!("{name}");
    }
}

/// Get the README for the specified preset
fn preset_readme(name: &str) -> Result<&'static str> {
    let path: PathBuf = [name, "README.txt"].iter().collect();
    PRESETS_DIR
        .get_file(path)
        .context("Preset not found.")?
        .contents_utf8()
        .context("README.txt is not UTF-8 encoded")
}

/// Handle the `preset info` command.
fn handle_preset_info_command(name: &str) -> Result<()> {
    println!("{}", preset_readme(name)?);

    Ok(())
}

/// Handle the `preset extract` command
fn handle_preset_extract_command(name: &str, dest: Option<&Path>) -> Result<()> {
    let dest = dest.unwrap_or(Path::new(name));
    extract_preset(name, dest)
}

/// Extract the specified preset to a new directory
pub fn extract_preset(name: &str, new_path: &Path) -> Result<()> {
    // Find the subdirectory in PRESETS_DIR whose name matches `name`.
    let sub_dir = PRESETS_DIR.get_dir(name).context("Preset not found.")?;

    ensure!(
        !new_path.exists(),
        "Destination directory {} already exists",
        new_path.display()
    );

    // Copy the contents of the subdirectory to the destination
    fs::create_dir(new_path)?;
    for entry in sub_dir.entries() {
        match entry {
            DirEntry::Dir(_) => bail!("Subdirectories in presets not supported"),
            DirEntry::File(f) => {
                let file_name = f.path().file_name().context("Invalid preset file")?;
                let file_path = new_path.join(file_name);
                fs::write(&file_path, f.contents())?;
            }
        }
    }

    Ok(())
}

/// Handle the `preset run` command.
///
/// If no output folder is given, results are written to the default location for a model with the
/// preset's name.
pub fn handle_preset_run_command(
    name: &str,
    opts: &RunOpts,
    settings: Option<Settings>,
) -> Result<()> {
    let temp_dir = TempDir::new().context("Failed to create temporary directory.")?;
    let model_path = temp_dir.path().join(name);
    extract_preset(name, &model_path)?;
    handle_run_command(&model_path, opts, settings)
}
