//! Code for simulation models.
//!
//! A model is the parameter triple describing one plant: its reactor design, the financial
//! assumptions used to value it and the policy environment it operates in. Models are read from a
//! `model.toml` file with `[reactor]`, `[financial]` and `[policy]` tables.
use crate::input::{input_err_msg, read_toml};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub mod financial;
pub use financial::FinancialParameters;
pub mod policy;
pub use policy::PolicyParameters;
pub mod reactor;
pub use reactor::{FuelType, Geometry, ModeratorType, ReactorParameters, ReactorType};

/// The name of the file containing the model definition
pub const MODEL_FILE_NAME: &str = "model.toml";

/// Get the path of the model file, given either the file itself or the folder containing it
pub fn model_file_path(model_path: &Path) -> PathBuf {
    if model_path.is_dir() {
        model_path.join(MODEL_FILE_NAME)
    } else {
        model_path.to_path_buf()
    }
}

/// Model definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Model {
    /// Reactor design and operating parameters
    pub reactor: ReactorParameters,
    /// Financial assumptions
    pub financial: FinancialParameters,
    /// Policy environment
    pub policy: PolicyParameters,
}

impl Model {
    /// Read a model from the specified path.
    ///
    /// # Arguments
    ///
    /// * `model_path` - A model file, or a folder containing a `model.toml` file
    ///
    /// # Returns
    ///
    /// The validated [`Model`] or an error naming the offending file
    pub fn from_path<P: AsRef<Path>>(model_path: P) -> Result<Model> {
        let file_path = model_file_path(model_path.as_ref());
        let model: Model = read_toml(&file_path)?;
        model
            .validate()
            .with_context(|| input_err_msg(&file_path))?;

        Ok(model)
    }

    /// Validate all three parameter sets
    pub fn validate(&self) -> Result<()> {
        self.reactor
            .validate()
            .context("Invalid reactor parameters")?;
        self.financial
            .validate()
            .context("Invalid financial parameters")?;
        self.policy.validate().context("Invalid policy parameters")?;

        Ok(())
    }
}
