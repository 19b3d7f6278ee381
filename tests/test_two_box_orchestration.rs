//! End-to-end GCMC and GEMC cycles against stand-in NAMD and GOMC
//! executables.

#![cfg(unix)]

mod common;

use common::{combined_engines, install_engines, write_file};
use hybrid_mdmc::checkpoint::Checkpoint;
use hybrid_mdmc::combine::combine_runs;
use hybrid_mdmc::config::{NamdSimOrder, SimulationConfig};
use hybrid_mdmc::orchestrator::Orchestrator;
use hybrid_mdmc::settings::{Settings, SettingsManager};
use std::fs;
use std::path::Path;
use tempfile::tempdir;

const TWO_BOX_GOMC_TEMPLATE: &str = "\
Restart            restart_true_or_false
Checkpoint         Restart_Checkpoint_file
all_parameter_files
Coordinates 0      pdb_file_box_0_file
Structure 0        psf_file_box_0_file
Coordinates 1      pdb_file_box_1_file
Structure 1        psf_file_box_1_file
binCoordinates 0   coor_box_0_file
extendedSystem 0   xsc_box_0_file
binVelocities 0    vel_box_0_file
binCoordinates 1   coor_box_1_file
extendedSystem 1   xsc_box_1_file
binVelocities 1    vel_box_1_file
Temperature        System_temp_set
CellBasisVector1 0 x_dim_box_0 0 0
CellBasisVector2 0 0 y_dim_box_0 0
CellBasisVector3 0 0 0 z_dim_box_0
CellBasisVector1 1 x_dim_box_1 0 0
CellBasisVector2 1 0 y_dim_box_1 0
CellBasisVector3 1 0 0 z_dim_box_1
mu_ChemPot_K_or_P_Fugacitiy_bar_all
RunSteps           GOMC_Run_Steps
";

fn config(ensemble: &str, md_box_1: bool) -> SimulationConfig {
    let json = format!(
        r#"{{
            "total_cycles_namd_gomc_sims": 2,
            "starting_at_cycle_namd_gomc_sims": 0,
            "gomc_use_CPU_or_GPU": "CPU",
            "simulation_type": "{}",
            "only_use_box_0_for_namd_for_gemc": {},
            "no_core_box_0": 2,
            "no_core_box_1": 2,
            "simulation_temp_k": 300,
            "GCMC_ChemPot_or_Fugacity": "ChemPot",
            "GCMC_ChemPot_or_Fugacity_dict": {{"TIP3": -4000}},
            "gomc_run_steps": 1000,
            "namd_run_steps": 2000,
            "namd_minimize_mult_scalar": 1,
            "starting_ff_file_list_gomc": ["ff/GOMC_FF.inp"],
            "starting_ff_file_list_namd": ["ff/NAMD_FF.inp"],
            "starting_pdb_box_0_file": "start/box_0.pdb",
            "starting_psf_box_0_file": "start/box_0.psf",
            "starting_pdb_box_1_file": "start/box_1.pdb",
            "starting_psf_box_1_file": "start/box_1.psf",
            "namd2_bin_directory": "bin/namd",
            "gomc_bin_directory": "bin/gomc"
        }}"#,
        ensemble, !md_box_1
    );
    SimulationConfig::from_json_str(&json).unwrap()
}

fn setup(work: &Path, ensemble: &str) {
    install_engines(work, &format!("GOMC_CPU_{}", ensemble));
    write_file(
        &work.join(format!("required_data/config_files/GOMC_{}.conf", ensemble)),
        TWO_BOX_GOMC_TEMPLATE,
    );
    write_file(
        &work.join("start/box_1.pdb"),
        "CRYST1   30.000   30.000   30.000  90.00  90.00  90.00 P 1           1\nEND\n",
    );
    write_file(&work.join("start/box_1.psf"), "PSF\n");
}

fn read(path: &Path) -> String {
    fs::read_to_string(path).unwrap()
}

fn gcmc_cycles() {
    let dir = tempdir().unwrap();
    let work = dir.path().canonicalize().unwrap();
    setup(&work, "GCMC");
    let settings = SettingsManager::with_settings(Settings::default());
    let config = config("GCMC", false);
    assert_eq!(config.mc_log_boxes(), vec![0]);

    let summary = Orchestrator::new(&config, &settings, &work).unwrap().run().unwrap();
    assert_eq!(summary.runs, 4);
    assert_eq!(summary.final_step, 6000);
    assert_eq!(summary.continuity.len(), 3);
    assert!(summary.continuity.iter().all(|c| c.box_index == 0));
    assert_eq!(summary.continuity_failures(), 0);

    // The reservoir starts from its PDB and has no restart on the first turn.
    let gomc_1 = read(&work.join("GOMC/0000000001/in.conf"));
    assert!(gomc_1.contains("Restart            false"));
    assert!(gomc_1.contains("Coordinates 1      ../../start/box_1.pdb"));
    assert!(gomc_1.contains("CellBasisVector1 1 30.0 0 0"));
    assert!(!gomc_1.contains("binCoordinates 1"));
    assert!(gomc_1.contains("ChemPot \t TIP3 \t -4000"));

    let gomc_3 = read(&work.join("GOMC/0000000003/in.conf"));
    assert!(gomc_3.contains("Restart            true"));
    assert!(gomc_3.contains("binCoordinates 1   ../0000000001/Output_data_BOX_1_restart.coor"));
    assert!(gomc_3.contains("CellBasisVector1 1 25.0 0 0"));

    let run_0 = read(&work.join("NAMD/0000000000_a/in.conf"));
    assert!(run_0.contains("PMEGridSizeX       26"));
    assert!(!work.join("NAMD/0000000000_b").exists());

    let checkpoint = Checkpoint::load(&work.join("hybrid_checkpoint.json")).unwrap();
    assert_eq!(checkpoint.global_step, 6000);
    let reservoir = checkpoint.box_state(1).unwrap();
    assert_eq!(reservoir.geometry.unwrap().dims, [25.0, 25.0, 25.0]);

    let out = work.join("combined_data");
    assert_eq!(
        combined_engines(&work, 0),
        vec!["NAMD", "NAMD", "NAMD", "NAMD", "GOMC", "NAMD", "NAMD", "GOMC"]
    );
    assert!(!out.join("combined_NAMD_GOMC_data_box_1.txt").exists());
    assert_eq!(read(&out.join("GOMC_hist_data_box_0.txt")), "T N\n1000 10\n1000 10\n");
    assert_eq!(
        read(&out.join("GOMC_dist_data_box_0_res_or_mol_no_1.txt")),
        "10 2\n11 4\n"
    );
    assert!(!read(&work.join("NAMD_GOMC_started_at_cycle_No_0.log")).contains("WARNING:"));

    let replay = combine_runs(&config, &settings, &work).unwrap();
    assert_eq!(replay.runs, 4);
    assert_eq!(replay.counter.offset(), 6000);
}

fn gemc_parallel_cycles() {
    let dir = tempdir().unwrap();
    let work = dir.path().canonicalize().unwrap();
    setup(&work, "GEMC");
    let mut settings = Settings::default();
    settings.run.namd_sims_order = NamdSimOrder::Parallel;
    let settings = SettingsManager::with_settings(settings);
    let config = config("GEMC", true);
    assert_eq!(config.mc_log_boxes(), vec![0, 1]);

    let summary = Orchestrator::new(&config, &settings, &work).unwrap().run().unwrap();
    assert_eq!(summary.runs, 4);
    assert_eq!(summary.final_step, 6000);
    assert_eq!(summary.continuity.len(), 6);
    assert_eq!(summary.continuity.iter().filter(|c| c.box_index == 1).count(), 3);
    assert_eq!(summary.continuity_failures(), 0);

    let box_1_run_0 = read(&work.join("NAMD/0000000000_b/in.conf"));
    assert!(box_1_run_0.contains("coordinates        ../../start/box_1.pdb"));
    assert!(box_1_run_0.contains("PMEGridSizeX       40"));

    let gomc_1 = read(&work.join("GOMC/0000000001/in.conf"));
    assert!(gomc_1.contains("Restart            true"));
    assert!(gomc_1.contains("binCoordinates 1   ../../NAMD/0000000000_b/namdOut.restart.coor"));

    let box_1_run_2 = work.join("NAMD/0000000002_b");
    let control = read(&box_1_run_2.join("in.conf"));
    assert!(control.contains("coordinates        ../../GOMC/0000000001/Output_data_BOX_1_restart.pdb"));
    assert!(control.contains("PMEGridSizeX       33"));
    let plan = box_1_run_2.join("FFTW_NAMD_2.14_Linux-x86_64.txt");
    assert!(fs::symlink_metadata(&plan).unwrap().file_type().is_symlink());

    let out = work.join("combined_data");
    assert!(out.join("GOMC_Energies_Stat_box_1.txt").exists());
    assert_eq!(combined_engines(&work, 1), combined_engines(&work, 0));
    assert_eq!(combined_engines(&work, 1).len(), 8);
    assert!(!out.join("GOMC_hist_data_box_0.txt").exists());

    let replay = combine_runs(&config, &settings, &work).unwrap();
    assert_eq!(replay.runs, 4);
}

// One test: the stand-in scripts are written and executed by the same thread.
#[test]
fn test_two_box_ensembles_run_every_cycle() {
    gcmc_cycles();
    gemc_parallel_cycles();
}
