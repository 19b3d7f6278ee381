//! Stand-in NAMD and GOMC executables shared by the orchestration tests.
//!
//! The stand-ins are shell scripts that read the rendered control file and
//! print console logs shaped like the real engines'. GOMC reports box 1 on
//! the console only for GEMC; every box named in the control file gets
//! restart files.

#![allow(dead_code)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;

pub const FAKE_NAMD: &str = r##"#!/bin/sh
RUN=$(sed -n 's/^run *//p' "$2")
LAST=$RUN
echo "Info: TOTAL MASS = 3000.0 amu"
echo "Info: PME GRID DIMENSIONS 33 33 33"
if grep -q '^set restart *false' "$2"; then
  MIN=$(sed -n 's/^minimize *//p' "$2")
  echo "TCL: Minimizing for $MIN steps"
  LAST=$((RUN + MIN))
  touch FFTW_NAMD_2.14_Linux-x86_64.txt
fi
echo "ETITLE: TS ELECT VDW POTENTIAL PRESSURE VOLUME"
TS=0
while [ "$TS" -le "$LAST" ]; do
  echo "ENERGY: $TS -500.0 100.0 -400.0 1.0 15625.0"
  TS=$((TS + 1000))
done
printf '#$LABELS step a_x a_y a_z b_x b_y b_z c_x c_y c_z o_x o_y o_z\n%s 25 0 0 0 25 0 0 0 25 12.5 12.5 12.5\n' "$LAST" > namdOut.restart.xsc
touch namdOut.restart.coor namdOut.restart.vel
"##;

pub const FAKE_GOMC: &str = r##"#!/bin/sh
STEPS=$(sed -n 's/^RunSteps *//p' "$2")
case "$0" in
  *GEMC) LOGGED="0 1" ;;
  *) LOGGED="0" ;;
esac
echo "ETITLE: STEP TOTAL INTRA(B) INTRA(NB) INTER(LJ) LRC TOTAL_ELECT"
echo "STITLE: STEP VOLUME PRESSURE TOT_MOL TOT_DENSITY"
for b in $LOGGED; do
  echo "ENER_$b: $STEPS -201288.0 0.0 0.0 50322.0 0.0 -251610.0"
  echo "STAT_$b: $STEPS 15625.0 1.0 500 318.8"
done
for b in 0 1; do
  grep -q "^Coordinates $b" "$2" || continue
  printf 'CRYST1   25.000   25.000   25.000  90.00  90.00  90.00 P 1           1\nEND\n' > "Output_data_BOX_${b}_restart.pdb"
  printf '#$LABELS step a_x a_y a_z b_x b_y b_z c_x c_y c_z o_x o_y o_z\n%s 25 0 0 0 25 0 0 0 25 12.5 12.5 12.5\n' "$STEPS" > "Output_data_BOX_${b}_restart.xsc"
  for ext in psf coor vel; do touch "Output_data_BOX_${b}_restart.$ext"; done
done
touch Output_data_restart.chk
case "$0" in
  *GCMC)
    printf 'T N\n%s 10\n' "$STEPS" > his1a.dat
    printf '10 1\n11 2\n' > n1dis1a.dat
    ;;
esac
"##;

pub const NAMD_TEMPLATE: &str = "\
structure          psf_box_file
coordinates        pdb_box_file
set restart        Bool_restart
bincoordinates     coor_file
extendedSystem     xsc_file
binvelocities      vel_file
all_parameter_files
temperature        System_temp_set
cellBasisVector1   x_dim_box 0 0
cellBasisVector2   0 y_dim_box 0
cellBasisVector3   0 0 z_dim_box
cellOrigin         x_origin_box y_origin_box z_origin_box
PMEGridSizeX       X_PME_GRID_DIM
PMEGridSizeY       Y_PME_GRID_DIM
PMEGridSizeZ       Z_PME_GRID_DIM
minimize           NAMD_Minimize
run                NAMD_Run_Steps
";

pub const CRYST1_25: &str =
    "CRYST1   25.000   25.000   25.000  90.00  90.00  90.00 P 1           1\nEND\n";

pub fn write_file(path: &Path, content: &str) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

pub fn write_script(path: &Path, content: &str) {
    write_file(path, content);
    fs::set_permissions(path, fs::Permissions::from_mode(0o755)).unwrap();
}

/// Installs both stand-ins, the NAMD template and the box 0 inputs.
pub fn install_engines(work: &Path, gomc_binary: &str) {
    write_script(&work.join("bin/namd/namd2"), FAKE_NAMD);
    write_script(&work.join("bin/gomc").join(gomc_binary), FAKE_GOMC);
    write_file(&work.join("required_data/config_files/NAMD.conf"), NAMD_TEMPLATE);
    write_file(&work.join("start/box_0.pdb"), CRYST1_25);
    write_file(&work.join("start/box_0.psf"), "PSF\n");
    write_file(&work.join("ff/GOMC_FF.inp"), "* GOMC\n");
    write_file(&work.join("ff/NAMD_FF.inp"), "* NAMD\n");
}

/// `#ENGINE` column of a combined table.
pub fn combined_engines(work: &Path, box_index: usize) -> Vec<String> {
    fs::read_to_string(work.join(format!(
        "combined_data/combined_NAMD_GOMC_data_box_{}.txt",
        box_index
    )))
    .unwrap()
    .lines()
    .skip(1)
    .map(|l| l.split('\t').next().unwrap().to_string())
    .collect()
}
