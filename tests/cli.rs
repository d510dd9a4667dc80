//! Drive the `invsync` binary end to end.

mod common;

use common::{document_name, SyncFixture, NODE07};
use inventory_sync::config::{load_config, write_config};
use serde_json::Value;
use std::path::Path;
use std::process::{Command, Output};

fn invsync(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_invsync"))
        .args(args)
        .env("INVSYNC_LOG", "warn")
        .output()
        .expect("run invsync")
}

fn path_arg(path: &Path) -> &str {
    path.to_str().expect("utf-8 temp path")
}

/// `init` a config in the fixture, then point it at the fixture's files.
fn init_config(fixture: &SyncFixture) -> std::path::PathBuf {
    let config_path = fixture.path("invsync.json");
    let output = invsync(&[
        "init",
        "--config",
        path_arg(&config_path),
        "--domain",
        common::DOMAIN,
    ]);
    assert!(output.status.success(), "init failed: {output:?}");

    let mut config = load_config(&config_path).expect("load generated config");
    let generated = fixture.config();
    config.inventory_dir = generated.inventory_dir;
    config.exports = generated.exports;
    config.resolver.command = "sh -c 'echo \"$0 has address 10.0.0.9\"'".to_string();
    config.resolver.timeout_secs = 5;
    write_config(&config_path, &config).expect("rewrite config");
    config_path
}

#[test]
fn init_refuses_to_overwrite_without_force() {
    let fixture = SyncFixture::seeded();
    let config_path = init_config(&fixture);
    let args = [
        "init",
        "--config",
        path_arg(&config_path),
        "--domain",
        common::DOMAIN,
    ];

    let output = invsync(&args);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("--force"));

    let mut forced = args.to_vec();
    forced.push("--force");
    assert!(invsync(&forced).status.success());
}

#[test]
fn scan_reports_matches_as_json() {
    let fixture = SyncFixture::seeded();
    let config_path = init_config(&fixture);

    let output = invsync(&["scan", "--config", path_arg(&config_path), "--json"]);
    assert!(output.status.success(), "scan failed: {output:?}");

    let report: Value = serde_json::from_slice(&output.stdout).expect("scan JSON");
    assert_eq!(report["exports_read"], 2);
    assert_eq!(report["matched"], 1);
    assert_eq!(report["records"][0]["tag"], "A1");
    assert_eq!(report["records"][0]["node"], "node07");
    assert_eq!(fixture.read(&document_name("node07")), NODE07);
}

#[test]
fn run_resolves_through_configured_command() {
    let fixture = SyncFixture::seeded();
    let config_path = init_config(&fixture);

    let dry = invsync(&["run", "--config", path_arg(&config_path), "--dry-run", "--json"]);
    assert!(dry.status.success(), "dry run failed: {dry:?}");
    let report: Value = serde_json::from_slice(&dry.stdout).expect("dry-run JSON");
    assert_eq!(report["dry_run"], Value::Bool(true));
    assert_eq!(report["updated"][0], "node07");
    assert_eq!(fixture.read(&document_name("node07")), NODE07);

    let output = invsync(&["run", "--config", path_arg(&config_path), "--json"]);
    assert!(output.status.success(), "run failed: {output:?}");
    let report: Value = serde_json::from_slice(&output.stdout).expect("run JSON");
    assert_eq!(report["resolved"], 1);
    assert_eq!(report["audit"][0]["reason"], "Service tag not in clean dataset");

    let document = fixture.read(&document_name("node07"));
    assert!(document.contains("dell_eos: 2024-01-01\n"));
    assert!(document.contains("public_mac: 'aa:bb:cc:dd:ee:ff'\nidrac_ip: 10.0.0.9\n"));
    assert!(fixture.path("unedited.csv").is_file());
}

#[test]
fn run_without_config_file_fails() {
    let fixture = SyncFixture::seeded();
    let missing = fixture.path("absent.json");
    let output = invsync(&["run", "--config", path_arg(&missing)]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("absent.json"));
}

#[test]
fn run_continues_when_resolver_program_is_missing() {
    let fixture = SyncFixture::seeded();
    let config_path = init_config(&fixture);
    let mut config = load_config(&config_path).expect("load config");
    config.resolver.command = "invsync-no-such-resolver".to_string();
    write_config(&config_path, &config).expect("rewrite config");

    let output = invsync(&["run", "--config", path_arg(&config_path), "--json"]);
    assert!(output.status.success(), "run failed: {output:?}");
    let report: Value = serde_json::from_slice(&output.stdout).expect("run JSON");
    assert_eq!(report["resolved"], 0);
    assert_eq!(report["updated"][0], "node07");

    let document = fixture.read(&document_name("node07"));
    assert!(document.contains("dell_service_tag: a1\ndell_eos: 2024-01-01\n"));
    assert!(!document.contains("idrac_ip"));
    assert!(fixture.path("output.csv").is_file());
}
