use std::collections::BTreeMap;
use std::fs;

use assert_matches::assert_matches;
use camino::Utf8PathBuf;

use gdc_dice::config::{ConfigLoader, ConfigOverrides, DiceConfig};
use gdc_dice::error::DiceError;

fn mirror_tree() -> (tempfile::TempDir, Utf8PathBuf) {
    let temp = tempfile::tempdir().unwrap();
    let mirror = Utf8PathBuf::from_path_buf(temp.path().join("mirror")).unwrap();
    for dir in [
        "TCGA/TCGA-ACC/metadata",
        "TCGA/TCGA-BRCA",
        "TCGA/metadata",
        "TARGET/TARGET-AML",
        "TARGET/TCGA-ACC",
    ] {
        fs::create_dir_all(mirror.join(dir).as_std_path()).unwrap();
    }
    (temp, mirror)
}

#[test]
fn parse_config_file() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("gdc-dice.json");
    fs::write(
        &path,
        r#"{
            "mirror_dir": "/data/mirror",
            "dice_dir": "/data/diced",
            "projects": ["TCGA-ACC"],
            "aggregates": {"COADREAD": "TCGA-COAD,TCGA-READ"}
        }"#,
    )
    .unwrap();

    let config = ConfigLoader::resolve(path.to_str()).unwrap();
    assert_eq!(config.mirror_dir.as_deref(), Some("/data/mirror"));
    assert_eq!(config.projects, vec!["TCGA-ACC"]);
    assert!(config.programs.is_empty());
    assert_eq!(config.aggregates["COADREAD"], "TCGA-COAD,TCGA-READ");
}

#[test]
fn explicit_missing_file_is_an_error() {
    let err = ConfigLoader::resolve(Some("/nonexistent/gdc-dice.json")).unwrap_err();
    assert_matches!(err, DiceError::ConfigRead(_));
}

#[test]
fn malformed_file_is_a_parse_error() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("gdc-dice.json");
    fs::write(&path, "{ not json").unwrap();
    let err = ConfigLoader::resolve(path.to_str()).unwrap_err();
    assert_matches!(err, DiceError::ConfigParse(_));
}

#[test]
fn roots_are_required() {
    let err = ConfigLoader::resolve_config(DiceConfig::default(), ConfigOverrides::default())
        .unwrap_err();
    assert_matches!(err, DiceError::ConfigParse(message) if message.contains("mirror"));
}

#[test]
fn programs_and_projects_default_to_mirror_contents() {
    let (_temp, mirror) = mirror_tree();
    let overrides = ConfigOverrides {
        mirror_dir: Some(mirror.to_string()),
        dice_dir: Some("/diced".to_string()),
        ..ConfigOverrides::default()
    };

    let resolved = ConfigLoader::resolve_config(DiceConfig::default(), overrides).unwrap();
    assert_eq!(resolved.programs, vec!["TARGET", "TCGA"]);
    assert_eq!(resolved.projects, vec!["TARGET-AML", "TCGA-ACC", "TCGA-BRCA"]);
    assert!(resolved.log_dir.is_none());
    assert!(resolved.translation_table.is_none());
}

#[test]
fn cli_selection_overrides_file_selection() {
    let (_temp, mirror) = mirror_tree();
    let config = DiceConfig {
        mirror_dir: Some(mirror.to_string()),
        dice_dir: Some("/diced".to_string()),
        log_dir: Some("/logs".to_string()),
        programs: vec!["TARGET".to_string()],
        projects: vec!["TARGET-AML".to_string()],
        translation_table: Some("/file/table.tsv".to_string()),
        aggregates: BTreeMap::from([("X".to_string(), "A,B".to_string())]),
    };
    let overrides = ConfigOverrides {
        programs: vec!["TCGA".to_string()],
        translation_table: Some("/cli/table.tsv".to_string()),
        dry_run: true,
        ..ConfigOverrides::default()
    };

    let resolved = ConfigLoader::resolve_config(config, overrides).unwrap();
    assert_eq!(resolved.programs, vec!["TCGA"]);
    assert_eq!(resolved.projects, vec!["TARGET-AML"]);
    assert_eq!(resolved.log_dir.as_deref(), Some(camino::Utf8Path::new("/logs")));
    assert_eq!(resolved.translation_table.unwrap(), "/cli/table.tsv");
    assert_eq!(resolved.aggregates.len(), 1);
    assert!(resolved.dry_run);
    assert!(!resolved.force);
}
