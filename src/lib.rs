//! Common functionality for reactor-sim, a simulator for the physics and economics of nuclear
//! power plants.
#![warn(missing_docs)]
use std::path::PathBuf;

pub mod analysis;
pub mod cli;
pub mod decay;
pub mod finance;
pub mod input;
pub mod log;
pub mod model;
pub mod monte_carlo;
pub mod neutronics;
pub mod output;
pub mod physics;
pub mod settings;
pub mod simulation;
pub mod units;

#[cfg(test)]
mod fixture;

/// Get the folder in which program configuration files are stored
pub fn get_reactor_sim_config_dir() -> PathBuf {
    let Some(mut config_dir) = dirs::config_dir() else {
        // No config dir available
        return PathBuf::new();
    };

    config_dir.push("reactor-sim");
    config_dir
}
