//! Runs the `rusty-unit` binary on files in a temp dir.

use std::fs;
use std::process::Command;

fn rusty_unit() -> Command {
    Command::new(env!("CARGO_BIN_EXE_rusty-unit"))
}

#[test]
fn test_decode_prints_json() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("traces.log");
    fs::write(&path, "7 $mycrate::foo$ root\nnoise\n7 $mycrate::foo$ branch[1 2.5]\n").unwrap();

    let output = rusty_unit().arg("decode").arg(&path).output().unwrap();
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json[0]["test_id"], 7);
    assert_eq!(json[0]["covered"], 1);
    assert_eq!(json[0]["blocks"][1]["distance"], 2.5);
}

#[test]
fn test_decode_malformed_file_fails() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("traces.log");
    fs::write(&path, "7 $mycrate::foo$ branch[oops]\n").unwrap();

    let output = rusty_unit().arg("decode").arg(&path).output().unwrap();
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Malformed trace file"));
}

#[test]
fn test_types_uses_config_seed() {
    let dir = tempfile::tempdir().unwrap();
    let callables = dir.path().join("callables.json");
    fs::write(&callables, "[]").unwrap();
    let config = dir.path().join("rusty-unit.toml");
    fs::write(&config, "seed = 5\n").unwrap();

    let output = rusty_unit()
        .args(["--config"])
        .arg(&config)
        .arg("types")
        .arg(&callables)
        .output()
        .unwrap();
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["callables"], 4);
}
