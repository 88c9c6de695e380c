// FakeHLML - Hardware Management Test Double
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use std::path::PathBuf;
use std::process::{Command, Output};
use std::time::{SystemTime, UNIX_EPOCH};

fn write_temp_file(prefix: &str, contents: &str) -> PathBuf {
    let mut dir = std::env::temp_dir();
    dir.push("fakehlml-tests");
    let _ = std::fs::create_dir_all(&dir);

    let nonce = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    let path = dir.join(format!("{}-{}.yaml", prefix, nonce));
    std::fs::write(&path, contents).expect("Failed to write temp file");
    path
}

fn run(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_fakehlml"))
        .args(args)
        .output()
        .expect("Failed to execute command")
}

const TWO_GAUDIS: &str = r#"
schema_version: "1.0"
name: "two-gaudis"
devices:
  - pci_address: "0000:0f:00.0"
    device_id: "0x1020"
    vendor_id: "0x1da3"
    serial: "AM1000"
    index: 0
  - pci_address: "0000:10:00.0"
    device_id: "0x1020"
    vendor_id: "0x1da3"
    serial: "AM1001"
    index: 1
"#;

#[test]
fn test_cli_help() {
    let output = run(&["--help"]);
    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains("FakeHLML scenario runner"));
    assert!(stdout.contains("discover"));
    assert!(stdout.contains("watch"));
}

#[test]
fn test_cli_missing_scenario_is_config_error() {
    let output = run(&["discover", "--scenario", "non_existent_scenario.yaml"]);
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn test_cli_discover_text() {
    let scenario = write_temp_file("discover-text", TWO_GAUDIS);
    let output = run(&["discover", "--scenario", scenario.to_str().unwrap()]);

    assert_eq!(output.status.code(), Some(0));
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains("[0] 0000:0f:00.0 id=0x1da31020 serial=AM1000"));
    assert!(stdout.contains("[1] 0000:10:00.0 id=0x1da31020 serial=AM1001"));
    assert!(stdout.contains("devices: 2"));
    assert!(stdout.contains("status: ok"));
}

#[test]
fn test_cli_discover_json() {
    let scenario = write_temp_file("discover-json", TWO_GAUDIS);
    let output = run(&["discover", "--scenario", scenario.to_str().unwrap(), "--json"]);

    assert_eq!(output.status.code(), Some(0));
    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["result_schema_version"], "1.0");
    assert_eq!(report["scenario"], "two-gaudis");
    assert_eq!(report["status"], "ok");
    assert_eq!(report["devices"].as_array().unwrap().len(), 2);
    assert_eq!(report["devices"][1]["serial"], "AM1001");
    assert!(report.get("failure").is_none());
}

#[test]
fn test_cli_discover_writes_output_file() {
    let scenario = write_temp_file("discover-output", TWO_GAUDIS);
    let out = scenario.with_extension("json");
    let output = run(&[
        "discover",
        "--scenario",
        scenario.to_str().unwrap(),
        "--output",
        out.to_str().unwrap(),
    ]);

    assert_eq!(output.status.code(), Some(0));
    let written = std::fs::read_to_string(&out).unwrap();
    let report: serde_json::Value = serde_json::from_str(&written).unwrap();
    assert_eq!(report["devices"][0]["pci_address"], "0000:0f:00.0");
}

#[test]
fn test_cli_discover_injected_error_exit_3() {
    let scenario = write_temp_file(
        "discover-injected",
        &format!(
            "{}errors:\n  - call: device_get_serial\n    status: aip_is_lost\n",
            TWO_GAUDIS
        ),
    );
    let output = run(&["discover", "--scenario", scenario.to_str().unwrap(), "--json"]);

    assert_eq!(output.status.code(), Some(3));
    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["status"], "error");
    assert_eq!(report["failure"]["call"], "device_get_serial");
    assert_eq!(report["failure"]["status"], "aip_is_lost");
    assert_eq!(report["failure"]["code"], 15);
}

#[test]
fn test_cli_injected_init_failure_exit_3() {
    let scenario = write_temp_file(
        "init-injected",
        r#"
schema_version: "1.0"
name: "broken-init"
initialize: true
errors:
  - call: init_with_flags
    status: driver_not_loaded
"#,
    );
    let output = run(&["discover", "--scenario", scenario.to_str().unwrap()]);
    assert_eq!(output.status.code(), Some(3));
}

#[test]
fn test_cli_unknown_call_is_config_error() {
    let scenario = write_temp_file(
        "unknown-call",
        r#"
schema_version: "1.0"
name: "typo"
errors:
  - call: device_get_temperature
    status: unknown
"#,
    );
    let output = run(&["discover", "--scenario", scenario.to_str().unwrap()]);
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn test_cli_bad_schema_version_is_config_error() {
    let scenario = write_temp_file(
        "bad-version",
        r#"
schema_version: "9.9"
name: "future"
"#,
    );
    let output = run(&["watch", "--scenario", scenario.to_str().unwrap()]);
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn test_cli_watch_reports_events() {
    let scenario = write_temp_file(
        "watch-events",
        &format!("{}events:\n  - \"AM1000\"\n  - \"AM1001\"\n", TWO_GAUDIS),
    );
    let output = run(&[
        "watch",
        "--scenario",
        scenario.to_str().unwrap(),
        "--timeout-ms",
        "10",
        "--json",
    ]);

    assert_eq!(output.status.code(), Some(0));
    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["armed_devices"], 2);
    let events = report["events"].as_array().unwrap();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0]["serial"], "AM1001");
    assert_eq!(events[0]["pci_address"], "0000:10:00.0");
    assert_eq!(events[1]["serial"], "AM1000");
    assert_eq!(events[1]["event_type"], 2);
    assert!(report["remaining_events"].as_array().unwrap().is_empty());
}

#[test]
fn test_cli_watch_text_lists_undelivered() {
    let scenario = write_temp_file(
        "watch-foreign",
        &format!("{}events:\n  - \"AM1000\"\n  - \"STRANGER\"\n", TWO_GAUDIS),
    );
    let output = run(&["watch", "--scenario", scenario.to_str().unwrap()]);

    assert_eq!(output.status.code(), Some(0));
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains("armed devices: 2"));
    assert!(stdout.contains("undelivered: AM1000, STRANGER"));
    assert!(!stdout.contains("critical event:"));
}

#[test]
fn test_cli_state_prints_snapshot() {
    let scenario = write_temp_file(
        "state",
        &format!(
            "{}initialize: true\nerrors:\n  - call: event_set_wait\n    status: timeout\n",
            TWO_GAUDIS
        ),
    );
    let output = run(&["state", "--scenario", scenario.to_str().unwrap()]);

    assert_eq!(output.status.code(), Some(0));
    let state: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(state["initialized"], true);
    assert_eq!(state["devices"].as_array().unwrap().len(), 2);
    assert_eq!(state["injected_errors"][0]["call"], "event_set_wait");
    assert_eq!(state["injected_errors"][0]["code"], 10);
}

#[test]
fn test_cli_trace_flag_logs_calls() {
    let scenario = write_temp_file("trace", TWO_GAUDIS);
    let output = run(&["--trace", "discover", "--scenario", scenario.to_str().unwrap()]);

    assert_eq!(output.status.code(), Some(0));
    let stderr = String::from_utf8(output.stderr).unwrap();
    assert!(stderr.contains("hlml_device_get_count called"));
}
