//! Built-in help for the hybrid NAMD/GOMC driver.
//!
//! Documents every key of the JSON simulation file, the sections of the
//! settings file and the command line.

/// Category for organizing keywords in the help system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeywordCategory {
    /// Keys every simulation file must set.
    Required,
    /// Ensemble-specific keys.
    Ensemble,
    /// Step counts and core counts.
    Run,
    /// Box dimension and angle overrides.
    Geometry,
    /// Starting structures, force fields and binaries.
    Files,
}

const CATEGORY_ORDER: [KeywordCategory; 5] = [
    KeywordCategory::Required,
    KeywordCategory::Ensemble,
    KeywordCategory::Run,
    KeywordCategory::Geometry,
    KeywordCategory::Files,
];

/// Documentation entry for a single JSON key.
#[derive(Debug, Clone)]
pub struct Keyword {
    /// Key name as written in the JSON file.
    pub name: &'static str,
    /// Category the key is listed under.
    pub category: KeywordCategory,
    /// What the key controls.
    pub description: &'static str,
    /// Default value, if the key may be omitted.
    pub default_value: Option<&'static str>,
    /// Example JSON fragment.
    pub example: Option<&'static str>,
    /// Whether the key must be present.
    pub required: bool,
}

/// All keyword documentation
pub const KEYWORDS: &[Keyword] = &[
    Keyword {
        name: "total_cycles_namd_gomc_sims",
        category: KeywordCategory::Required,
        description: "Number of NAMD+GOMC cycles the simulation reaches",
        default_value: None,
        example: Some("\"total_cycles_namd_gomc_sims\": 50"),
        required: true,
    },
    Keyword {
        name: "starting_at_cycle_namd_gomc_sims",
        category: KeywordCategory::Required,
        description: "Cycle to start at; a value > 0 resumes from the run directories of the previous cycle",
        default_value: None,
        example: Some("\"starting_at_cycle_namd_gomc_sims\": 0"),
        required: true,
    },
    Keyword {
        name: "simulation_type",
        category: KeywordCategory::Required,
        description: "Ensemble: GEMC, GCMC, NPT or NVT",
        default_value: None,
        example: Some("\"simulation_type\": \"NPT\""),
        required: true,
    },
    Keyword {
        name: "simulation_temp_k",
        category: KeywordCategory::Required,
        description: "Temperature in K, written into both control files",
        default_value: None,
        example: Some("\"simulation_temp_k\": 250"),
        required: true,
    },
    Keyword {
        name: "gomc_use_CPU_or_GPU",
        category: KeywordCategory::Required,
        description: "GOMC build flavour; selects GOMC_CPU_<ensemble> or GOMC_GPU_<ensemble>",
        default_value: None,
        example: Some("\"gomc_use_CPU_or_GPU\": \"CPU\""),
        required: true,
    },
    Keyword {
        name: "simulation_pressure_bar",
        category: KeywordCategory::Ensemble,
        description: "Pressure in bar. Required for NPT; other ensembles use 1.01325",
        default_value: Some("1.01325"),
        example: Some("\"simulation_pressure_bar\": 1.0"),
        required: false,
    },
    Keyword {
        name: "only_use_box_0_for_namd_for_gemc",
        category: KeywordCategory::Ensemble,
        description: "GEMC only: run NAMD on box 0 alone and leave box 1 to GOMC",
        default_value: None,
        example: Some("\"only_use_box_0_for_namd_for_gemc\": true"),
        required: true,
    },
    Keyword {
        name: "GCMC_ChemPot_or_Fugacity",
        category: KeywordCategory::Ensemble,
        description: "GCMC only: whether the reservoir is given as ChemPot (K) or Fugacity (bar)",
        default_value: None,
        example: Some("\"GCMC_ChemPot_or_Fugacity\": \"Fugacity\""),
        required: false,
    },
    Keyword {
        name: "GCMC_ChemPot_or_Fugacity_dict",
        category: KeywordCategory::Ensemble,
        description: "GCMC only: reservoir value per residue name; fugacities must be >= 0",
        default_value: None,
        example: Some("\"GCMC_ChemPot_or_Fugacity_dict\": {\"WAT\": 0.5}"),
        required: false,
    },
    Keyword {
        name: "namd_run_steps",
        category: KeywordCategory::Run,
        description: "MD steps per cycle",
        default_value: None,
        example: Some("\"namd_run_steps\": 2000"),
        required: true,
    },
    Keyword {
        name: "gomc_run_steps",
        category: KeywordCategory::Run,
        description: "MC steps per cycle",
        default_value: None,
        example: Some("\"gomc_run_steps\": 1000"),
        required: true,
    },
    Keyword {
        name: "namd_minimize_mult_scalar",
        category: KeywordCategory::Run,
        description: "Minimization length of the first MD turn, as a multiple of namd_run_steps",
        default_value: Some("0"),
        example: Some("\"namd_minimize_mult_scalar\": 1"),
        required: false,
    },
    Keyword {
        name: "no_core_box_0",
        category: KeywordCategory::Run,
        description: "Cores for box 0; also the core count of every process with one MD box",
        default_value: None,
        example: Some("\"no_core_box_0\": 4"),
        required: true,
    },
    Keyword {
        name: "no_core_box_1",
        category: KeywordCategory::Run,
        description: "Cores for box 1 when GEMC runs NAMD on both boxes",
        default_value: Some("0"),
        example: Some("\"no_core_box_1\": 4"),
        required: false,
    },
    Keyword {
        name: "set_dims_box_0_list",
        category: KeywordCategory::Geometry,
        description: "Box 0 dimensions in Å; null keeps the starting PDB value for that axis",
        default_value: Some("null"),
        example: Some("\"set_dims_box_0_list\": [25, null, 25]"),
        required: false,
    },
    Keyword {
        name: "set_dims_box_1_list",
        category: KeywordCategory::Geometry,
        description: "Box 1 dimensions in Å",
        default_value: Some("null"),
        example: Some("\"set_dims_box_1_list\": [40, 40, 40]"),
        required: false,
    },
    Keyword {
        name: "set_angle_box_0_list",
        category: KeywordCategory::Geometry,
        description: "Box 0 angles in degrees; only orthogonal boxes (90) are supported",
        default_value: Some("null"),
        example: Some("\"set_angle_box_0_list\": [90, 90, 90]"),
        required: false,
    },
    Keyword {
        name: "set_angle_box_1_list",
        category: KeywordCategory::Geometry,
        description: "Box 1 angles in degrees",
        default_value: Some("null"),
        example: Some("\"set_angle_box_1_list\": [90, 90, 90]"),
        required: false,
    },
    Keyword {
        name: "starting_pdb_box_0_file",
        category: KeywordCategory::Files,
        description: "Starting structure of box 0; its CRYST1 record gives the box",
        default_value: None,
        example: Some("\"starting_pdb_box_0_file\": \"required_data/equilb_box_298K/box_0.pdb\""),
        required: true,
    },
    Keyword {
        name: "starting_psf_box_0_file",
        category: KeywordCategory::Files,
        description: "Starting topology of box 0",
        default_value: None,
        example: Some("\"starting_psf_box_0_file\": \"required_data/equilb_box_298K/box_0.psf\""),
        required: true,
    },
    Keyword {
        name: "starting_pdb_box_1_file",
        category: KeywordCategory::Files,
        description: "Starting structure of box 1 (GEMC, GCMC)",
        default_value: None,
        example: Some("\"starting_pdb_box_1_file\": \"required_data/equilb_box_298K/box_1.pdb\""),
        required: false,
    },
    Keyword {
        name: "starting_psf_box_1_file",
        category: KeywordCategory::Files,
        description: "Starting topology of box 1 (GEMC, GCMC)",
        default_value: None,
        example: Some("\"starting_psf_box_1_file\": \"required_data/equilb_box_298K/box_1.psf\""),
        required: false,
    },
    Keyword {
        name: "starting_ff_file_list_namd",
        category: KeywordCategory::Files,
        description: "Force-field files written as 'parameters' lines into the NAMD control file",
        default_value: None,
        example: Some("\"starting_ff_file_list_namd\": [\"required_data/ff/par_water.inp\"]"),
        required: true,
    },
    Keyword {
        name: "starting_ff_file_list_gomc",
        category: KeywordCategory::Files,
        description: "Force-field files written as 'Parameters' lines into the GOMC control file",
        default_value: None,
        example: Some("\"starting_ff_file_list_gomc\": [\"required_data/ff/par_water.inp\"]"),
        required: true,
    },
    Keyword {
        name: "namd2_bin_directory",
        category: KeywordCategory::Files,
        description: "Directory holding namd2, relative to the working directory",
        default_value: None,
        example: Some("\"namd2_bin_directory\": \"../NAMD_2.14_Linux-x86_64-multicore\""),
        required: true,
    },
    Keyword {
        name: "gomc_bin_directory",
        category: KeywordCategory::Files,
        description: "Directory holding the GOMC_<CPU|GPU>_<ensemble> binaries",
        default_value: None,
        example: Some("\"gomc_bin_directory\": \"../GOMC/bin\""),
        required: true,
    },
];

/// Print global help
pub fn print_global_help() {
    println!("hybrid-mdmc - Hybrid NAMD/GOMC molecular dynamics / Monte Carlo driver");
    println!();
    println!("USAGE:");
    println!("    hybrid-mdmc [OPTIONS] <COMMAND>");
    println!();
    println!("COMMANDS:");
    println!("    -f <simulation.json> [-namd_sims_order series|parallel]");
    println!("                        Run the NAMD/GOMC cycles described by the JSON file");
    println!();
    println!("    combine -f <simulation.json>");
    println!("                        Rebuild the combined data tables from existing run directories");
    println!();
    println!("    ci hybrid_mdmc.cfg");
    println!("                        Create a settings template file");
    println!();
    println!("OPTIONS:");
    println!("    -h, --help [topic]   Show help. Topics: keywords, settings, outputs, examples");
    println!();
    println!("SETTINGS FILE:");
    println!("    hybrid-mdmc reads 'hybrid_mdmc.cfg' for installation settings.");
    println!("    Create template:     hybrid-mdmc ci hybrid_mdmc.cfg");
    println!("    Supported locations:");
    println!("      - ./hybrid_mdmc.cfg (local, highest priority)");
    println!("      - ~/.config/hybrid_mdmc/hybrid_mdmc.cfg (user)");
    println!("      - /etc/hybrid_mdmc/hybrid_mdmc.cfg (system)");
    println!();
    println!("EXAMPLES:");
    println!("    Run:                 hybrid-mdmc -f user_input_NAMD_GOMC.json");
    println!("    Run GEMC in parallel: hybrid-mdmc -f gemc.json -namd_sims_order parallel");
    println!("    Combine data:        hybrid-mdmc combine -f user_input_NAMD_GOMC.json");
    println!("    View keywords:       hybrid-mdmc --help keywords");
    println!();
}

/// Print keyword reference
pub fn print_keyword_help() {
    println!("SIMULATION FILE KEYWORDS");
    println!("═══════════════════════════════════════════════════════════════════════");
    println!();

    for category in CATEGORY_ORDER {
        print_category_header(category);
        println!();
        for keyword in KEYWORDS.iter().filter(|k| k.category == category) {
            print_keyword(keyword);
            println!();
        }
        println!();
    }
}

/// Print settings file reference
pub fn print_settings_help() {
    println!("SETTINGS FILE (hybrid_mdmc.cfg)");
    println!("═══════════════════════════════════════════════════════════════════════");
    println!();
    println!("[paths]");
    println!("{}", "─".repeat(76));
    println!("namd_runs            Root of the NAMD run directories (default: NAMD)");
    println!("gomc_runs            Root of the GOMC run directories (default: GOMC)");
    println!("combined_data        Output directory of the combined tables (default: combined_data)");
    println!("namd_template        NAMD control template (default: required_data/config_files/NAMD.conf)");
    println!("gomc_template_dir    Directory of GOMC_<ensemble>.conf (default: required_data/config_files)");
    println!();
    println!("[logging]");
    println!("{}", "─".repeat(76));
    println!("level                error, warn, info, debug or trace (default: info)");
    println!("file_logging         Write NAMD_GOMC_started_at_cycle_No_<c>.log (default: true)");
    println!();
    println!("[continuity]");
    println!("{}", "─".repeat(76));
    println!("potential_tolerance          Relative potential energy tolerance (default: 0.005)");
    println!("vdw_elec_tolerance           Relative VDW + electrostatic tolerance (default: 0.005)");
    println!("vdw_elec_absolute_kcal_mol   Absolute VDW + electrostatic fallback (default: 0.5)");
    println!();
    println!("[run]");
    println!("{}", "─".repeat(76));
    println!("namd_sims_order      series or parallel launch of the two GEMC NAMD boxes (default: series)");
    println!();
}

/// Print output file reference
pub fn print_output_help() {
    println!("OUTPUT FILES");
    println!("═══════════════════════════════════════════════════════════════════════");
    println!();
    println!("RUN DIRECTORIES");
    println!("{}", "─".repeat(76));
    println!("NAMD/<run_no>_a, NAMD/<run_no>_b   MD turns (even run_no), box 0 and box 1");
    println!("GOMC/<run_no>                      MC turns (odd run_no)");
    println!("    in.conf     rendered control file");
    println!("    out.dat     engine console log");
    println!();
    println!("DRIVER FILES");
    println!("{}", "─".repeat(76));
    println!("NAMD_GOMC_started_at_cycle_No_<c>.log   progress, continuity and timing log");
    println!("hybrid_checkpoint.json                  global step and box state after each cycle");
    println!();
    println!("COMBINED DATA (per box N)");
    println!("{}", "─".repeat(76));
    println!("NAMD_data_box_N.txt                        NAMD energies, global steps");
    println!("NAMD_data_density_box_N.txt                NAMD energies from step 0 with density");
    println!("GOMC_Energies_Stat_box_N.txt               GOMC energies (K) and statistics");
    println!("GOMC_Energies_Stat_kcal_per_mol_box_N.txt  GOMC energies in kcal/mol, density in g/cm3");
    println!("combined_NAMD_GOMC_data_box_N.txt          merged MD/MC time series");
    println!("GOMC_hist_data_box_0.txt                   GCMC histogram history");
    println!("GOMC_dist_data_box_0_res_or_mol_no_<n>.txt GCMC molecule number distributions");
    println!();
}

/// Print example usages
pub fn print_examples() {
    println!("USAGE EXAMPLES");
    println!("═══════════════════════════════════════════════════════════════════════");
    println!();
    println!("SIMULATION FILE EXAMPLE (NPT)");
    println!("{}", "─".repeat(76));
    println!("{{");
    println!("  \"total_cycles_namd_gomc_sims\": 50,");
    println!("  \"starting_at_cycle_namd_gomc_sims\": 0,");
    println!("  \"gomc_use_CPU_or_GPU\": \"CPU\",");
    println!("  \"simulation_type\": \"NPT\",");
    println!("  \"only_use_box_0_for_namd_for_gemc\": true,");
    println!("  \"no_core_box_0\": 4,");
    println!("  \"no_core_box_1\": 0,");
    println!("  \"simulation_temp_k\": 250,");
    println!("  \"simulation_pressure_bar\": 1.0,");
    println!("  \"gomc_run_steps\": 1000,");
    println!("  \"namd_run_steps\": 2000,");
    println!("  \"namd_minimize_mult_scalar\": 1,");
    println!("  \"set_dims_box_0_list\": [25, 25, 25],");
    println!("  \"set_angle_box_0_list\": [90, 90, 90],");
    println!("  \"starting_ff_file_list_gomc\": [\"required_data/ff/GOMC_water.inp\"],");
    println!("  \"starting_ff_file_list_namd\": [\"required_data/ff/NAMD_water.inp\"],");
    println!("  \"starting_pdb_box_0_file\": \"required_data/box_0.pdb\",");
    println!("  \"starting_psf_box_0_file\": \"required_data/box_0.psf\",");
    println!("  \"namd2_bin_directory\": \"../NAMD_2.14\",");
    println!("  \"gomc_bin_directory\": \"../GOMC/bin\"");
    println!("}}");
    println!();
    println!("RESUMING");
    println!("{}", "─".repeat(76));
    println!("Set starting_at_cycle_namd_gomc_sims to the first cycle that has not run and");
    println!("raise total_cycles_namd_gomc_sims if needed. The NAMD and GOMC directories of");
    println!("the previous cycle and the run-0 NAMD directories must still exist.");
    println!();
}

/// Prints help for a topic; returns `false` for an unknown topic.
pub fn print_topic_help(topic: &str) -> bool {
    match topic {
        "keywords" => print_keyword_help(),
        "settings" => print_settings_help(),
        "outputs" => print_output_help(),
        "examples" => print_examples(),
        _ => return false,
    }
    true
}

fn print_category_header(category: KeywordCategory) {
    let title = match category {
        KeywordCategory::Required => "REQUIRED KEYS",
        KeywordCategory::Ensemble => "ENSEMBLE KEYS",
        KeywordCategory::Run => "STEPS AND CORES",
        KeywordCategory::Geometry => "BOX GEOMETRY OVERRIDES",
        KeywordCategory::Files => "FILES AND BINARIES",
    };
    println!("{}", title);
    println!("{}", "─".repeat(76));
}

fn print_keyword(keyword: &Keyword) {
    let required_str = if keyword.required { " [REQUIRED]" } else { "" };

    println!("{}{}", keyword.name, required_str);
    println!("    {}", keyword.description);

    if let Some(default) = keyword.default_value {
        println!("    Default: {}", default);
    }

    if let Some(example) = keyword.example {
        println!("    Example: {}", example);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_category_has_keywords() {
        for category in CATEGORY_ORDER {
            assert!(KEYWORDS.iter().any(|k| k.category == category));
        }
    }

    #[test]
    fn test_unknown_topic() {
        assert!(!print_topic_help("no_such_topic"));
        assert!(print_topic_help("outputs"));
    }
}
