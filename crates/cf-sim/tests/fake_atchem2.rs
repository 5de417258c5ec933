//! AtChem2 runner against shell-script stand-ins for the build script and binary.
#![cfg(unix)]

use cf_config::{InputsDef, ModelConfig, ModelDef, ModelParameters};
use cf_sim::{AtChem2Runner, SegmentJob, SegmentRunner, SimError, Step};
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;

const BUILD_OK: &str = "#!/bin/sh\ntest -f \"$1\" || exit 7\necho built \"$1\"\n";

const RUN_OK: &str = r#"#!/bin/sh
test -f model/configuration/initialConcentrations.config || exit 9
test -f model/configuration/model.parameters || exit 9
out=model/output
cat > $out/speciesConcentrations.output <<EOT
t NO NO2
0 1.0E+10 2.0E+10
60 0.9E+10 2.1E+10
EOT
cat > $out/environmentVariables.output <<EOT
t TEMP
0 298.15
60 298.15
EOT
cat > $out/lossRates.output <<EOT
time speciesNumber speciesName reactionNumber rate reaction
60 1 NO 1 1.0-100 NO+O3=NO2
EOT
cat > $out/productionRates.output <<EOT
time speciesNumber speciesName reactionNumber rate reaction
60 2 NO2 1 3.5E+04 NO+O3=NO2
EOT
"#;

fn write_script(path: &Path, body: &str) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, body).unwrap();
    fs::set_permissions(path, fs::Permissions::from_mode(0o755)).unwrap();
}

fn fake_model(root: &Path, build: &str, run: &str) -> ModelDef {
    let template = root.join("atchem2");
    write_script(&template.join("build/build_atchem2.sh"), build);
    write_script(&template.join("atchem2"), run);
    fs::create_dir_all(template.join("model/output")).unwrap();
    let mech = root.join("chamber.fac");
    fs::write(&mech, "% 1.8D-12*EXP(-1370/TEMP) : NO + O3 = NO2 ;\n").unwrap();
    ModelDef::new(template, mech)
}

fn run_once(model: ModelDef) -> Result<cf_results::OutputTables, SimError> {
    let inputs = InputsDef::default();
    let species = vec!["NO".to_string(), "NO2".to_string()];
    let job = SegmentJob {
        index: 0,
        start: 0.0,
        config: ModelConfig::new(&inputs, &species, &species),
        parameters: ModelParameters {
            n_steps: 1,
            step_size: 60.0,
            t_start: 0.0,
            date: chrono::NaiveDate::from_ymd_opt(2023, 6, 21).unwrap(),
            latitude: 51.5,
            longitude: -0.1,
        },
    };
    AtChem2Runner::new(model).run_segment(&job)
}

#[test]
fn successful_segment_returns_tables() {
    let dir = tempfile::tempdir().unwrap();
    let tables = run_once(fake_model(dir.path(), BUILD_OK, RUN_OK)).unwrap();
    assert_eq!(tables.species.columns, vec!["NO", "NO2"]);
    assert_eq!(tables.species.times(), vec![0.0, 60.0]);
    assert_eq!(tables.environment.len(), 2);
    assert_eq!(tables.loss_rates.species(), vec!["NO"]);
    assert_eq!(tables.production_rates.rows[0].cells[4], "3.5E+04");
}

#[test]
fn build_failure_is_reported_with_log() {
    let dir = tempfile::tempdir().unwrap();
    let build = "#!/bin/sh\necho 'gfortran: mechanism.f90:12: error'\nexit 1\n";
    let err = run_once(fake_model(dir.path(), build, RUN_OK)).unwrap_err();
    match err {
        SimError::Failed { step, log_tail, .. } => {
            assert_eq!(step, Step::Build);
            assert!(log_tail.contains("gfortran"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn missing_output_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let run = "#!/bin/sh\necho 't NO' > model/output/speciesConcentrations.output\n";
    let err = run_once(fake_model(dir.path(), BUILD_OK, run)).unwrap_err();
    assert!(matches!(
        err,
        SimError::Results(cf_results::ResultsError::MissingOutput { .. })
    ));
}

#[test]
fn run_timeout_kills_the_model() {
    let dir = tempfile::tempdir().unwrap();
    let mut model = fake_model(dir.path(), BUILD_OK, "#!/bin/sh\nexec sleep 30\n");
    model.timeout_s = 0.3;
    let err = run_once(model).unwrap_err();
    assert!(matches!(err, SimError::Timeout { step: Step::Run, .. }));
}

#[test]
fn mechanism_species_are_cached() {
    let dir = tempfile::tempdir().unwrap();
    let mut runner = AtChem2Runner::new(fake_model(dir.path(), BUILD_OK, RUN_OK));
    assert_eq!(runner.mechanism_species().unwrap(), vec!["NO", "O3", "NO2"]);
    fs::remove_file(dir.path().join("chamber.fac")).unwrap();
    assert_eq!(runner.mechanism_species().unwrap().len(), 3);
}
