use std::process::Command;

fn temp_path(label: &str) -> std::path::PathBuf {
    std::env::temp_dir().join(format!(
        "quest-cli-{label}-{}",
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos()
    ))
}

#[test]
fn cli_list_scenarios_writes_output() {
    let exe = env!("CARGO_BIN_EXE_quest-tester");
    let output_path = temp_path("list");
    let status = Command::new(exe)
        .args(["--list-scenarios", "--output"])
        .arg(&output_path)
        .status()
        .expect("run cli");
    assert!(status.success());
    let content = std::fs::read_to_string(output_path).expect("read output");
    assert!(content.contains("Available scenarios"));
    assert!(content.contains("perfect-run"));
    assert!(content.contains("sweep-hint-hungry"));
}

#[test]
fn cli_runs_scripted_scenario_with_json_report() {
    let exe = env!("CARGO_BIN_EXE_quest-tester");
    let output_path = temp_path("run");
    let status = Command::new(exe)
        .args([
            "--scenarios",
            "perfect-run,split-vote",
            "--iterations",
            "1",
            "--seeds",
            "1..3",
            "--report",
            "json",
            "--output",
        ])
        .arg(&output_path)
        .status()
        .expect("run cli");
    assert!(status.success());
    let content = std::fs::read_to_string(output_path).expect("read output");
    let json_end = content.rfind(']').expect("json array");
    let results: serde_json::Value =
        serde_json::from_str(&content[..=json_end]).expect("parse report");
    let runs = results.as_array().expect("array");
    assert_eq!(runs.len(), 4);
    assert!(runs.iter().all(|run| run["passed"] == true));
    assert_eq!(runs[0]["endings"]["justice"], 1);
}

#[test]
fn cli_round_trips_snapshots() {
    let exe = env!("CARGO_BIN_EXE_quest-tester");
    let snapshots = temp_path("snapshots");
    let output_path = temp_path("snapshot-report");
    let status = Command::new(exe)
        .args([
            "--scenarios",
            "sweep-diligent",
            "--iterations",
            "2",
            "--report",
            "markdown",
            "--snapshots",
        ])
        .arg(&snapshots)
        .arg("--output")
        .arg(&output_path)
        .status()
        .expect("run cli");
    assert!(status.success());
    assert!(std::fs::read_dir(&snapshots).expect("snapshot dir").count() >= 2);
    let content = std::fs::read_to_string(output_path).expect("read output");
    assert!(content.contains("# Quest Logic Test Results"));
}

#[test]
fn cli_fails_on_unreadable_adventure() {
    let exe = env!("CARGO_BIN_EXE_quest-tester");
    let output = Command::new(exe)
        .args(["--adventure"])
        .arg(temp_path("missing.json"))
        .output()
        .expect("run cli");
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("loading adventure"));
}
