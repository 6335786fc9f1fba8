//! Integration tests for the `preset run` command.
use reactor_sim::cli::RunOpts;
use reactor_sim::cli::preset::{handle_preset_run_command, preset_names};
use reactor_sim::output::{SESSION_FILE_NAME, Session};
use reactor_sim::settings::Settings;
use tempfile::tempdir;

/// An integration test for the `preset run` command, covering every preset.
#[test]
fn test_handle_preset_run_command() {
    unsafe { std::env::set_var("REACTOR_SIM_LOG_LEVEL", "off") };

    for name in preset_names() {
        let output_dir = tempdir().unwrap();
        let opts = RunOpts {
            output_dir: Some(output_dir.path().to_path_buf()),
            ..RunOpts::default()
        };
        handle_preset_run_command(name, &opts, Some(Settings::default())).unwrap();

        let session = Session::load(&output_dir.path().join(SESSION_FILE_NAME)).unwrap();
        assert_eq!(
            session.result.yearly_data.len(),
            session.model.reactor.plant_lifespan_years as usize
        );
    }
}
