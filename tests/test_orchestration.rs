//! End-to-end NPT cycles against stand-in NAMD and GOMC executables.

#![cfg(unix)]

mod common;

use common::{combined_engines, install_engines, write_file};
use hybrid_mdmc::checkpoint::Checkpoint;
use hybrid_mdmc::combine::combine_runs;
use hybrid_mdmc::config::SimulationConfig;
use hybrid_mdmc::orchestrator::Orchestrator;
use hybrid_mdmc::settings::{Settings, SettingsManager};
use std::fs;
use std::path::Path;
use tempfile::tempdir;

const GOMC_TEMPLATE: &str = "\
Restart            restart_true_or_false
Checkpoint         Restart_Checkpoint_file
all_parameter_files
Coordinates 0      pdb_file_box_0_file
Structure 0        psf_file_box_0_file
binCoordinates 0   coor_box_0_file
extendedSystem 0   xsc_box_0_file
binVelocities 0    vel_box_0_file
Temperature        System_temp_set
Pressure           System_press_set
CellBasisVector1 0 x_dim_box_0 0 0
CellBasisVector2 0 0 y_dim_box_0 0
CellBasisVector3 0 0 0 z_dim_box_0
RunSteps           GOMC_Run_Steps
";

fn config_json(starting_cycle: u64, total_cycles: u64) -> String {
    format!(
        r#"{{
            "total_cycles_namd_gomc_sims": {},
            "starting_at_cycle_namd_gomc_sims": {},
            "gomc_use_CPU_or_GPU": "CPU",
            "simulation_type": "NPT",
            "only_use_box_0_for_namd_for_gemc": true,
            "no_core_box_0": 2,
            "simulation_temp_k": 300,
            "simulation_pressure_bar": 1.0,
            "gomc_run_steps": 1000,
            "namd_run_steps": 2000,
            "namd_minimize_mult_scalar": 1,
            "set_dims_box_0_list": [25, null, null],
            "starting_ff_file_list_gomc": ["ff/GOMC_FF.inp"],
            "starting_ff_file_list_namd": ["ff/NAMD_FF.inp"],
            "starting_pdb_box_0_file": "start/box_0.pdb",
            "starting_psf_box_0_file": "start/box_0.psf",
            "namd2_bin_directory": "bin/namd",
            "gomc_bin_directory": "bin/gomc"
        }}"#,
        total_cycles, starting_cycle
    )
}

fn setup(work: &Path) {
    install_engines(work, "GOMC_CPU_NPT");
    write_file(&work.join("required_data/config_files/GOMC_NPT.conf"), GOMC_TEMPLATE);
}

// A single test: the stand-in scripts are written and executed by the same
// thread.
#[test]
fn test_npt_cycles_resume_and_combine() {
    let dir = tempdir().unwrap();
    let work = dir.path().canonicalize().unwrap();
    setup(&work);
    let settings = SettingsManager::with_settings(Settings::default());

    // Cycles 0 and 1.
    let config = SimulationConfig::from_json_str(&config_json(0, 2)).unwrap();
    let summary = Orchestrator::new(&config, &settings, &work).unwrap().run().unwrap();
    assert_eq!(summary.runs, 4);
    assert_eq!(summary.final_step, 6000);
    assert_eq!(summary.continuity.len(), 3);
    assert_eq!(summary.continuity_failures(), 0);

    let run_0 = work.join("NAMD/0000000000_a");
    let control = fs::read_to_string(run_0.join("in.conf")).unwrap();
    assert!(control.contains("set restart        false"));
    assert!(control.contains("coordinates        ../../start/box_0.pdb"));
    assert!(control.contains("PMEGridSizeX       33"));
    assert!(control.contains("minimize           2000"));
    assert!(control.contains("cellOrigin         12.5 12.5 12.5"));
    assert!(run_0.join("FFTW_NAMD_2.14_Linux-x86_64.txt").exists());

    let gomc_1 = fs::read_to_string(work.join("GOMC/0000000001/in.conf")).unwrap();
    assert!(gomc_1.contains("Checkpoint         false Output_data_restart.chk"));
    assert!(gomc_1.contains("binCoordinates 0   ../../NAMD/0000000000_a/namdOut.restart.coor"));
    assert!(gomc_1.contains("RunSteps           1000"));

    let run_2 = work.join("NAMD/0000000002_a");
    let control = fs::read_to_string(run_2.join("in.conf")).unwrap();
    assert!(control.contains("set restart        true"));
    assert!(control.contains("coordinates        ../../GOMC/0000000001/Output_data_BOX_0_restart.pdb"));
    let plan = run_2.join("FFTW_NAMD_2.14_Linux-x86_64.txt");
    assert!(fs::symlink_metadata(&plan).unwrap().file_type().is_symlink());

    let gomc_3 = fs::read_to_string(work.join("GOMC/0000000003/in.conf")).unwrap();
    assert!(gomc_3.contains("Checkpoint         true ../0000000001/Output_data_restart.chk"));

    let checkpoint = Checkpoint::load(&work.join("hybrid_checkpoint.json")).unwrap();
    assert_eq!(checkpoint.last_completed_cycle, 1);
    assert_eq!(checkpoint.global_step, 6000);
    assert_eq!(checkpoint.box_state(0).unwrap().pme_grid, Some([33, 33, 33]));

    let run_log = fs::read_to_string(work.join("NAMD_GOMC_started_at_cycle_No_0.log")).unwrap();
    assert!(run_log.contains("run_no = 0 (START)"));
    assert!(run_log.contains("run_no = 3 (End)"));
    assert!(run_log.contains("TIME_STATS_TITLE:"));
    assert_eq!(run_log.matches("TIME_STATS_DATA:").count(), 2);
    assert!(!run_log.contains("WARNING:"));

    // Minimization rows stay in the raw dump only.
    let raw = fs::read_to_string(work.join("combined_data/NAMD_data_box_0.txt")).unwrap();
    assert!(raw.lines().nth(1).unwrap().starts_with("-2000\t"));
    assert_eq!(
        combined_engines(&work, 0),
        vec!["NAMD", "NAMD", "NAMD", "NAMD", "GOMC", "NAMD", "NAMD", "GOMC"]
    );

    // Rebuilding from the run directories gives the same tables.
    let combined_path = work.join("combined_data/combined_NAMD_GOMC_data_box_0.txt");
    let in_memory = fs::read_to_string(&combined_path).unwrap();
    let replay = combine_runs(&config, &settings, &work).unwrap();
    assert_eq!(replay.runs, 4);
    assert_eq!(replay.counter.offset(), 6000);
    assert_eq!(fs::read_to_string(&combined_path).unwrap(), in_memory);

    // Resume for cycle 2.
    let resumed = SimulationConfig::from_json_str(&config_json(2, 3)).unwrap();
    let summary = Orchestrator::new(&resumed, &settings, &work).unwrap().run().unwrap();
    assert_eq!(summary.runs, 2);
    assert_eq!(summary.final_step, 9000);
    assert_eq!(summary.continuity.len(), 1);

    let run_4 = work.join("NAMD/0000000004_a");
    let control = fs::read_to_string(run_4.join("in.conf")).unwrap();
    assert!(control.contains("coordinates        ../../GOMC/0000000003/Output_data_BOX_0_restart.pdb"));
    assert!(control.contains("PMEGridSizeZ       33"));
    assert!(fs::symlink_metadata(run_4.join("FFTW_NAMD_2.14_Linux-x86_64.txt")).is_ok());
    assert!(work.join("NAMD_GOMC_started_at_cycle_No_2.log").exists());

    assert_eq!(combined_engines(&work, 0).len(), 12);
    let checkpoint = Checkpoint::load(&work.join("hybrid_checkpoint.json")).unwrap();
    assert_eq!(checkpoint.last_completed_cycle, 2);
    assert_eq!(checkpoint.global_step, 9000);
}
