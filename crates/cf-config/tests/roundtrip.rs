use cf_config::*;
use chrono::NaiveDate;
use std::collections::BTreeMap;
use std::path::PathBuf;

fn base_experiment(root: &std::path::Path) -> Experiment {
    Experiment {
        version: LATEST_VERSION,
        name: "Chamber run".to_string(),
        model: ModelDef {
            atchem2_path: root.join("AtChem2"),
            mechanism_path: root.join("mcm.fac"),
            build_script: PathBuf::from("build/build_atchem2.sh"),
            executable: PathBuf::from("atchem2"),
            timeout_s: 120.0,
        },
        clock: ClockDef {
            date: NaiveDate::from_ymd_opt(2023, 6, 1).unwrap(),
            latitude: 51.5,
            longitude: -0.1,
            t_start: 0.0,
            t_end: 3600.0,
            step_size: 60.0,
        },
        inputs: InputsDef {
            initial_concentrations: BTreeMap::from([("O3".to_string(), 7.5e11)]),
            environment: BTreeMap::from([
                ("TEMP".to_string(), EnvValue::Number(293.15)),
                ("ROOF".to_string(), EnvValue::text("CLOSED")),
            ]),
            ..InputsDef::default()
        },
        outputs: OutputsDef {
            species: vec!["O3".to_string(), "NO".to_string()],
            rates: vec!["O3".to_string()],
            strict: false,
        },
        injections: vec![InjectionDef {
            time: 1800.0,
            species: BTreeMap::from([("NO".to_string(), 2.5e11)]),
        }],
        nox_constraint: vec![],
    }
}

#[test]
fn roundtrip_yaml_experiment() {
    let dir = tempfile::tempdir().unwrap();
    let experiment = base_experiment(dir.path());
    let path = dir.path().join("experiment.yaml");

    save_yaml(&path, &experiment).unwrap();
    let loaded = load_experiment(&path).unwrap();

    assert_eq!(experiment, loaded);
}

#[test]
fn roundtrip_json_experiment() {
    let dir = tempfile::tempdir().unwrap();
    let experiment = base_experiment(dir.path());
    let path = dir.path().join("experiment.json");

    save_json(&path, &experiment).unwrap();
    let loaded = load_experiment(&path).unwrap();

    assert_eq!(experiment, loaded);
}

#[test]
fn yaml_defaults_and_relative_paths() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("minimal.yaml");
    std::fs::write(
        &path,
        r#"
name: minimal
model:
  atchem2_path: AtChem2
  mechanism_path: mech/mcm.fac
clock:
  date: 2023-06-01
  latitude: 0.0
  longitude: 0.0
  t_start: 0
  t_end: 100
  step_size: 50
nox_constraint:
  - { time: 0, value: 100 }
  - { time: 100, value: 140 }
"#,
    )
    .unwrap();

    let experiment = load_experiment(&path).unwrap();
    assert_eq!(experiment.version, LATEST_VERSION);
    assert_eq!(experiment.model.atchem2_path, dir.path().join("AtChem2"));
    assert_eq!(experiment.model.mechanism_path, dir.path().join("mech/mcm.fac"));
    assert_eq!(experiment.model.build_script, PathBuf::from("build/build_atchem2.sh"));
    assert_eq!(experiment.model.timeout_s, 600.0);
    assert!(experiment.injections.is_empty());
    assert_eq!(experiment.nox_constraint.len(), 2);
}
