//! hybrid-mdmc command-line interface
//!
//! Entry point of the hybrid NAMD/GOMC driver. Parses the command line, loads
//! the settings and the JSON simulation file, and runs or combines the
//! NAMD/GOMC cycles.
//!
//! # Usage
//!
//! ```bash
//! # Run the cycles described by a simulation file
//! hybrid-mdmc -f user_input_NAMD_GOMC.json
//!
//! # GEMC with two NAMD boxes launched side by side
//! hybrid-mdmc -f gemc.json -namd_sims_order parallel
//!
//! # Rebuild the combined data tables of an existing run
//! hybrid-mdmc combine -f user_input_NAMD_GOMC.json
//!
//! # Write a settings template
//! hybrid-mdmc ci hybrid_mdmc.cfg
//! ```
//!
//! # Help System
//!
//! - `hybrid-mdmc --help` - General help
//! - `hybrid-mdmc --help keywords` - Simulation file keys
//! - `hybrid-mdmc --help settings` - Settings file sections
//! - `hybrid-mdmc --help outputs` - Files written by a run
//! - `hybrid-mdmc --help examples` - Example simulation file

use hybrid_mdmc::combine::combine_runs;
use hybrid_mdmc::config::{NamdSimOrder, SimulationConfig};
use hybrid_mdmc::help;
use hybrid_mdmc::orchestrator::Orchestrator;
use hybrid_mdmc::settings::{SettingsManager, SETTINGS_FILE_NAME};
use log::{info, warn, LevelFilter};
use std::env;
use std::path::{Path, PathBuf};
use std::process;
use std::str::FromStr;

/// Parsed command line.
#[derive(Debug, Clone, PartialEq)]
enum Command {
    Run {
        json: PathBuf,
        order: Option<String>,
    },
    Combine {
        json: PathBuf,
    },
    CreateSettings {
        path: PathBuf,
    },
}

fn main() {
    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        print_usage(&args[0]);
        process::exit(1);
    }

    check_help_flags(&args);

    let command = match parse_args(&args[1..]) {
        Ok(command) => command,
        Err(message) => {
            eprintln!("Error: {}", message);
            print_usage(&args[0]);
            process::exit(1);
        }
    };

    let result = match command {
        Command::CreateSettings { path } => run_create_settings_template(&path),
        Command::Run { json, order } => {
            init_logging().and_then(|settings| run_cycles(settings, &json, order.as_deref()))
        }
        Command::Combine { json } => init_logging().and_then(|settings| run_combine(&settings, &json)),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn parse_args(args: &[String]) -> Result<Command, String> {
    let (is_combine, rest) = match args.first().map(String::as_str) {
        Some("ci") => {
            let path = args.get(1).ok_or("missing settings file argument for 'ci'")?;
            return Ok(Command::CreateSettings {
                path: PathBuf::from(path),
            });
        }
        Some("combine") => (true, &args[1..]),
        _ => (false, args),
    };

    let mut json = None;
    let mut order = None;
    let mut iter = rest.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "-f" | "--file" => {
                json = Some(PathBuf::from(iter.next().ok_or("-f needs a JSON file")?));
            }
            "-namd_sims_order" | "--namd_sims_order" => {
                order = Some(iter.next().ok_or("-namd_sims_order needs a value")?.clone());
            }
            other => return Err(format!("unknown argument: {}", other)),
        }
    }

    let json = json.ok_or("no simulation file given (use -f <file>)")?;
    if is_combine {
        Ok(Command::Combine { json })
    } else {
        Ok(Command::Run { json, order })
    }
}

/// Loads the settings and starts the console logger at the configured level.
/// `RUST_LOG`, when set, takes precedence.
fn init_logging() -> Result<SettingsManager, Box<dyn std::error::Error>> {
    let settings = SettingsManager::load()?;
    let level = LevelFilter::from_str(&settings.logging().level).unwrap_or(LevelFilter::Info);

    let mut builder = env_logger::Builder::new();
    builder
        .filter_level(level)
        .target(env_logger::Target::Stdout)
        .format_timestamp_millis();
    if let Ok(filters) = env::var("RUST_LOG") {
        builder.parse_filters(&filters);
    }
    builder.init();

    info!("Settings loaded from: {}", settings.config_source());
    Ok(settings)
}

fn run_cycles(
    mut settings: SettingsManager,
    json: &Path,
    order: Option<&str>,
) -> Result<(), Box<dyn std::error::Error>> {
    print_banner();

    if let Some(value) = order {
        match NamdSimOrder::parse(value) {
            Some(order) => settings.set_namd_sims_order(order),
            None => {
                warn!(
                    "Invalid -namd_sims_order '{}'; expected series or parallel. Using series.",
                    value
                );
                settings.set_namd_sims_order(NamdSimOrder::Series);
            }
        }
    }

    let config = SimulationConfig::load(json)?;
    print_parameters(&config, &settings);

    let summary = Orchestrator::new(&config, &settings, Path::new("."))?.run()?;

    println!("{}", "=".repeat(76));
    println!("Completed {} turns, final global step {}", summary.runs, summary.final_step);
    let failures = summary.continuity_failures();
    if failures > 0 {
        warn!("{} energy continuity check(s) failed; see the run log", failures);
    }
    println!("Total simulation time (s): {:.3}", summary.elapsed_secs);
    println!("{}", "=".repeat(76));
    Ok(())
}

fn run_combine(settings: &SettingsManager, json: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let config = SimulationConfig::load(json)?;
    let work_dir = Path::new(".").canonicalize()?;
    let replay = combine_runs(&config, settings, &work_dir)?;
    println!(
        "Combined {} turns into {}",
        replay.runs,
        work_dir.join(&settings.paths().combined_data).display()
    );
    Ok(())
}

fn run_create_settings_template(path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    if path.file_name().and_then(|n| n.to_str()) != Some(SETTINGS_FILE_NAME) {
        return Err(format!("settings template must be named {}", SETTINGS_FILE_NAME).into());
    }
    SettingsManager::create_template(path)?;
    println!("✓ Settings template created successfully!");
    println!("  Output file: {}", path.display());
    println!("\nNext steps:");
    println!("  1. Review and edit {}", path.display());
    println!("  2. Point [paths] at your NAMD/GOMC templates and run directories");
    println!("  3. The settings will be automatically loaded by hybrid-mdmc");
    Ok(())
}

fn print_banner() {
    println!("{}", "=".repeat(76));
    println!("       hybrid-mdmc: hybrid NAMD/GOMC molecular dynamics / Monte Carlo");
    println!("                         Version {}", env!("CARGO_PKG_VERSION"));
    println!("{}", "=".repeat(76));
}

fn print_parameters(config: &SimulationConfig, settings: &SettingsManager) {
    println!("  Simulation type:           {}", config.simulation_type.label());
    println!(
        "  Cycles:                    {} -> {}",
        config.starting_cycle, config.total_cycles
    );
    println!("  NAMD steps per cycle:      {}", config.namd_run_steps);
    println!("  GOMC steps per cycle:      {}", config.gomc_run_steps);
    println!("  Temperature (K):           {}", config.simulation_temp_k);
    println!("  Pressure (bar):            {}", config.pressure_bar());
    println!("  MD boxes:                  {:?}", config.md_boxes());
    println!("  NAMD launch order:         {}", settings.run().namd_sims_order);
    println!("  Total cores:               {}", config.total_cores());
    println!("  Settings:                  {}", settings.config_source());
    println!("{}", "=".repeat(76));
}

fn check_help_flags(args: &[String]) {
    if args[1] != "--help" && args[1] != "-h" {
        return;
    }
    match args.get(2) {
        Some(topic) if help::print_topic_help(topic) => {}
        _ => help::print_global_help(),
    }
    process::exit(0);
}

fn print_usage(program_name: &str) {
    eprintln!("hybrid-mdmc - Hybrid NAMD/GOMC MD/MC driver");
    eprintln!();
    eprintln!("Usage:");
    eprintln!("  {} -f <simulation.json> [-namd_sims_order series|parallel]", program_name);
    eprintln!("                    Run the NAMD/GOMC cycles");
    eprintln!();
    eprintln!("  {} combine -f <simulation.json>", program_name);
    eprintln!("                    Rebuild the combined data tables");
    eprintln!();
    eprintln!("  {} ci {}", program_name, SETTINGS_FILE_NAME);
    eprintln!("                    Create a settings template file");
    eprintln!();
    eprintln!("  {} --help [keywords|settings|outputs|examples]", program_name);
}
