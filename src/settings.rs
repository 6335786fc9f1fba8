//! Program settings, read from `settings.toml` in the user's configuration folder.
use crate::get_reactor_sim_config_dir;
use crate::input::read_toml;
use crate::log::{DEFAULT_LOG_LEVEL, parse_log_level};
use anyhow::{Context, Result, ensure};
use documented::DocumentedFields;
use serde::{Deserialize, Serialize};
use std::fmt::Write;
use std::path::{Path, PathBuf};
use toml::Value;

const SETTINGS_FILE_NAME: &str = "settings.toml";

const DEFAULT_SETTINGS_FILE_HEADER: &str = "# Program settings for reactor-sim.
# Uncomment a line to change the setting from its default value. Command-line options take
# precedence over these settings.
";

/// The number of Monte Carlo iterations run if none are specified
pub const DEFAULT_MONTE_CARLO_ITERATIONS: u32 = 1000;

/// Get the path to where the settings file will be read from
pub fn get_settings_file_path() -> PathBuf {
    get_reactor_sim_config_dir().join(SETTINGS_FILE_NAME)
}

/// Program settings from config file
#[derive(Debug, Clone, DocumentedFields, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Settings {
    /// Log level: off, error, warn, info, debug or trace
    pub log_level: String,
    /// Replace existing output folders without needing --overwrite
    pub overwrite: bool,
    /// Also write the discounted cash flows of each run (debug_cash_flows.csv)
    pub debug_model: bool,
    /// Defaults for the monte-carlo command
    pub monte_carlo: MonteCarloSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            overwrite: false,
            debug_model: false,
            monte_carlo: MonteCarloSettings::default(),
        }
    }
}

/// Defaults for the monte-carlo command, used when not given on the command line
#[derive(Debug, Clone, DocumentedFields, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MonteCarloSettings {
    /// Number of scenarios to simulate
    pub iterations: u32,
    /// Master seed for the random number generator. If unset, a seed is taken from the current
    /// time. Seeds above 9223372036854775807 must be quoted, e.g. seed = "18446744073709551615".
    #[serde(with = "seed_repr", skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

impl Default for MonteCarloSettings {
    fn default() -> Self {
        Self {
            iterations: DEFAULT_MONTE_CARLO_ITERATIONS,
            seed: None,
        }
    }
}

/// (De)serialise a `u64` seed as a TOML integer where it fits in one and as a string otherwise
pub(crate) mod seed_repr {
    use serde::de::Error;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    #[derive(Serialize, Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Integer(i64),
        Text(String),
    }

    #[allow(clippy::ref_option)]
    pub fn serialize<S: Serializer>(seed: &Option<u64>, serializer: S) -> Result<S::Ok, S::Error> {
        seed.map(|seed| {
            i64::try_from(seed).map_or_else(|_| Repr::Text(seed.to_string()), Repr::Integer)
        })
        .serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<u64>, D::Error> {
        let Some(repr) = Option::<Repr>::deserialize(deserializer)? else {
            return Ok(None);
        };

        let seed = match repr {
            Repr::Integer(value) => u64::try_from(value)
                .map_err(|_| D::Error::custom(format!("seed cannot be negative: {value}")))?,
            Repr::Text(text) => text
                .trim()
                .parse()
                .map_err(|_| D::Error::custom(format!("invalid seed: {text:?}")))?,
        };

        Ok(Some(seed))
    }
}

impl Settings {
    /// Read the contents of the program settings file.
    ///
    /// If the file is not present, default values for settings will be used
    pub fn load() -> Result<Settings> {
        Self::load_from_path(&get_settings_file_path())
    }

    /// Read from the specified path, falling back to defaults if there is no file
    fn load_from_path(file_path: &Path) -> Result<Settings> {
        if !file_path.is_file() {
            return Ok(Settings::default());
        }

        let settings: Settings = read_toml(file_path)?;
        settings
            .validate()
            .with_context(|| format!("Invalid settings in {}", file_path.display()))?;

        Ok(settings)
    }

    /// Check that the settings can be acted on
    fn validate(&self) -> Result<()> {
        parse_log_level(&self.log_level)?;
        ensure!(
            self.monte_carlo.iterations >= 1,
            "monte_carlo.iterations must be at least 1"
        );

        Ok(())
    }

    /// The contents of the default settings file: every setting commented out, with its docs
    pub fn default_file_contents() -> Result<String> {
        // Include an example seed so that it appears in the file
        let settings = Settings {
            monte_carlo: MonteCarloSettings {
                seed: Some(42),
                ..MonteCarloSettings::default()
            },
            ..Settings::default()
        };
        let value = Value::try_from(&settings)?;
        let table = value
            .as_table()
            .context("Settings did not serialise to a table")?;

        let mut out = DEFAULT_SETTINGS_FILE_HEADER.to_string();
        let mut sub_tables = Vec::new();
        for (key, value) in table {
            if let Value::Table(sub_table) = value {
                sub_tables.push((key, sub_table));
            } else {
                write_commented_setting(&mut out, key, value, Settings::get_field_docs(key))?;
            }
        }

        // Only [monte_carlo] at present
        for (key, sub_table) in sub_tables {
            let docs = Settings::get_field_docs(key)
                .ok()
                .with_context(|| format!("Missing doc comment for field {key}"))?;
            write!(&mut out, "\n# {docs}\n[{key}]\n")?;
            for (key, value) in sub_table {
                write_commented_setting(
                    &mut out,
                    key,
                    value,
                    MonteCarloSettings::get_field_docs(key),
                )?;
            }
        }

        Ok(out)
    }
}

/// Append a setting to `out` as a commented-out line preceded by its docs
fn write_commented_setting<E>(
    out: &mut String,
    key: &str,
    value: &Value,
    docs: Result<&str, E>,
) -> Result<()> {
    let docs = docs
        .ok()
        .with_context(|| format!("Missing doc comment for field {key}"))?;
    writeln!(out)?;
    for line in docs.lines() {
        writeln!(out, "# # {}", line.trim())?;
    }
    writeln!(out, "# {key} = {value}")?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::fs;
    use tempfile::tempdir;

    fn load_str(contents: &str) -> Result<Settings> {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join(SETTINGS_FILE_NAME);
        fs::write(&file_path, contents).unwrap();
        Settings::load_from_path(&file_path)
    }

    #[test]
    fn test_settings_load_from_path_no_file() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join(SETTINGS_FILE_NAME); // NB: doesn't exist
        assert_eq!(
            Settings::load_from_path(&file_path).unwrap(),
            Settings::default()
        );
    }

    #[test]
    fn test_settings_load_from_path() {
        let settings = load_str("log_level = \"warn\"\n[monte_carlo]\nseed = 7\n").unwrap();
        assert_eq!(
            settings,
            Settings {
                log_level: "warn".to_string(),
                monte_carlo: MonteCarloSettings {
                    iterations: DEFAULT_MONTE_CARLO_ITERATIONS,
                    seed: Some(7),
                },
                ..Settings::default()
            }
        );
    }

    #[test]
    fn test_empty_file_gives_defaults() {
        assert_eq!(load_str("").unwrap(), Settings::default());
    }

    #[rstest]
    #[case("seed = 0", 0)]
    #[case("seed = 9223372036854775807", 9_223_372_036_854_775_807)]
    #[case("seed = \"18446744073709551615\"", u64::MAX)]
    fn test_load_seed(#[case] line: &str, #[case] expected: u64) {
        let settings = load_str(&format!("[monte_carlo]\n{line}\n")).unwrap();
        assert_eq!(settings.monte_carlo.seed, Some(expected));
    }

    #[rstest]
    #[case("[monte_carlo]\nseed = -1")]
    #[case("[monte_carlo]\nseed = \"lucky\"")]
    #[case("[monte_carlo]\niterations = 0")]
    #[case("log_level = \"verbose\"")]
    fn test_load_invalid(#[case] contents: &str) {
        assert!(load_str(contents).is_err());
    }

    #[test]
    fn test_large_seed_written_as_string() {
        let settings = Settings {
            monte_carlo: MonteCarloSettings {
                seed: Some(u64::MAX),
                ..MonteCarloSettings::default()
            },
            ..Settings::default()
        };
        let contents = toml::to_string(&settings).unwrap();
        assert!(contents.contains("seed = \"18446744073709551615\""));
        assert_eq!(toml::from_str::<Settings>(&contents).unwrap(), settings);
    }

    #[test]
    fn test_default_file_contents() {
        let contents = Settings::default_file_contents().unwrap();
        assert!(contents.starts_with(DEFAULT_SETTINGS_FILE_HEADER));
        assert!(contents.contains("# log_level = \"info\""));
        assert!(contents.contains("\n[monte_carlo]\n"));
        assert!(contents.contains("# iterations = 1000"));
        assert!(contents.contains("# seed = 42"));

        // As written, the file gives the defaults
        assert_eq!(load_str(&contents).unwrap(), Settings::default());

        // Uncommenting every setting gives a valid file
        let uncommented: String = contents
            .lines()
            .map(|line| match line.strip_prefix("# ") {
                Some(setting) if setting.contains(" = ") && !setting.starts_with('#') => setting,
                _ => line,
            })
            .map(|line| format!("{line}\n"))
            .collect();
        let settings = load_str(&uncommented).unwrap();
        assert_eq!(settings.monte_carlo.seed, Some(42));
    }
}
