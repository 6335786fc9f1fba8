//! Program logging.
//!
//! Messages are written to the terminal, with warnings and errors going to stderr. Commands which
//! write an output folder also keep a plain-text run log there, headed with the command, model and
//! seed, so that a set of results can be traced back to the run that produced it.
use crate::output::metadata::RunInfo;
use anyhow::{Context, Result, anyhow};
use chrono::Local;
use fern::Dispatch;
use fern::colors::{Color, ColoredLevelConfig};
use log::{Level, LevelFilter};
use std::env;
use std::fs::File;
use std::io::{self, IsTerminal, Write};
use std::path::Path;
use std::sync::OnceLock;

/// A flag indicating whether the logger has been initialised
static LOGGER_INIT: OnceLock<()> = OnceLock::new();

/// The environment variable used to override the log level
pub const LOG_LEVEL_ENV_VAR: &str = "REACTOR_SIM_LOG_LEVEL";

/// The log level used if neither the environment variable nor `settings.toml` gives one
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// The run log, written to the output folder
const RUN_LOG_FILE_NAME: &str = "reactor_sim.log";

/// Whether the program logger has been initialised
pub fn is_logger_initialised() -> bool {
    LOGGER_INIT.get().is_some()
}

/// Convert a log level name (case-insensitive) into a [`LevelFilter`]
pub fn parse_log_level(log_level: &str) -> Result<LevelFilter> {
    match log_level.to_lowercase().as_str() {
        "off" => Ok(LevelFilter::Off),
        "error" => Ok(LevelFilter::Error),
        "warn" => Ok(LevelFilter::Warn),
        "info" => Ok(LevelFilter::Info),
        "debug" => Ok(LevelFilter::Debug),
        "trace" => Ok(LevelFilter::Trace),
        unknown => Err(anyhow!(
            "Unknown log level: {unknown} (expected off, error, warn, info, debug or trace)"
        )),
    }
}

/// Initialise the program logger.
///
/// The log level is taken from the `REACTOR_SIM_LOG_LEVEL` environment variable if set, otherwise
/// from `log_level`.
///
/// If `run_log` is given, a run log is created in that folder. It records messages at `info` level
/// or above even if the terminal output is quieter, so that it is a complete record of the run.
pub fn init(log_level: &str, run_log: Option<(&Path, &RunInfo)>) -> Result<()> {
    let log_level = match env::var(LOG_LEVEL_ENV_VAR) {
        Ok(level) => parse_log_level(&level)
            .with_context(|| format!("Invalid value for {LOG_LEVEL_ENV_VAR}"))?,
        Err(_) => parse_log_level(log_level)?,
    };

    let mut dispatch = Dispatch::new()
        .chain(
            terminal_output(io::stdout().is_terminal())
                .filter(|metadata| metadata.level() > Level::Warn)
                .level(log_level)
                .chain(io::stdout()),
        )
        .chain(
            terminal_output(io::stderr().is_terminal())
                .level(log_level.min(LevelFilter::Warn))
                .chain(io::stderr()),
        );

    if let Some((output_dir, run)) = run_log {
        dispatch = dispatch.chain(
            Dispatch::new()
                .format(|out, message, record| {
                    let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S");
                    out.finish(format_args!("{timestamp} {:<5} {message}", record.level()));
                })
                .level(log_level.max(LevelFilter::Info))
                .chain(create_run_log(output_dir, run)?),
        );
    }

    dispatch
        .apply()
        .map_err(|_| anyhow!("Logger already initialised"))?;
    let _ = LOGGER_INIT.set(());

    Ok(())
}

/// Terminal output as `[12:00:00 INFO] message`, with the level coloured if `use_colour` is set
fn terminal_output(use_colour: bool) -> Dispatch {
    let colours = ColoredLevelConfig::new()
        .info(Color::Green)
        .debug(Color::Blue);

    Dispatch::new().format(move |out, message, record| {
        let time = Local::now().format("%H:%M:%S");
        if use_colour {
            out.finish(format_args!(
                "[{time} {}] {message}",
                colours.color(record.level())
            ));
        } else {
            out.finish(format_args!("[{time} {}] {message}", record.level()));
        }
    })
}

/// Create the run log in `output_dir` and write its header
fn create_run_log(output_dir: &Path, run: &RunInfo) -> Result<File> {
    let file_path = output_dir.join(RUN_LOG_FILE_NAME);
    let mut file = File::create(&file_path)
        .with_context(|| format!("Could not create log file {}", file_path.display()))?;
    writeln!(file, "# {}", run.summary())?;
    writeln!(file, "# Started {}", Local::now().to_rfc3339())?;

    Ok(file)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::fs;
    use tempfile::tempdir;

    #[rstest]
    #[case("off", LevelFilter::Off)]
    #[case("warn", LevelFilter::Warn)]
    #[case("DEBUG", LevelFilter::Debug)]
    #[case("Trace", LevelFilter::Trace)]
    fn test_parse_log_level(#[case] name: &str, #[case] expected: LevelFilter) {
        assert_eq!(parse_log_level(name).unwrap(), expected);
    }

    #[test]
    fn test_parse_log_level_unknown() {
        assert!(parse_log_level("verbose").is_err());
    }

    #[test]
    fn test_create_run_log() {
        let dir = tempdir().unwrap();
        let run = RunInfo {
            command: "monte-carlo",
            model_path: Path::new("presets/default"),
            seed: Some(1234),
        };
        drop(create_run_log(dir.path(), &run).unwrap());

        let contents = fs::read_to_string(dir.path().join(RUN_LOG_FILE_NAME)).unwrap();
        let lines: Vec<_> = contents.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], format!("# {}", run.summary()));
        assert!(lines[0].ends_with("monte-carlo presets/default (seed 1234)"));
        assert!(lines[1].starts_with("# Started "));
    }
}
