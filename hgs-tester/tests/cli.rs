use std::process::Command;

fn temp_path(label: &str) -> std::path::PathBuf {
    std::env::temp_dir().join(format!(
        "hgs-cli-{label}-{}",
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos()
    ))
}

#[test]
fn cli_writes_json_report() {
    let exe = env!("CARGO_BIN_EXE_hgs-tester");
    let output_path = temp_path("report.json");
    let output = Command::new(exe)
        .args([
            "--seeds",
            "1,2",
            "--iterations",
            "2",
            "--tributes",
            "8",
            "--report",
            "json",
            "--output",
        ])
        .arg(&output_path)
        .output()
        .expect("run cli");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Hunger Games Simulator Tester"));

    let content = std::fs::read_to_string(output_path).expect("read output");
    let report: serde_json::Value = serde_json::from_str(&content).expect("valid json");
    assert_eq!(report["summary"]["games"], 4);
    assert_eq!(report["summary"]["failures"], 0);
    assert_eq!(report["games"].as_array().map(Vec::len), Some(4));
}

#[test]
fn cli_same_seed_gives_same_digest() {
    let exe = env!("CARGO_BIN_EXE_hgs-tester");
    let digest = |label: &str| {
        let path = temp_path(label);
        let status = Command::new(exe)
            .args(["--seeds", "0x2a", "--report", "json", "--output"])
            .arg(&path)
            .status()
            .expect("run cli");
        assert!(status.success());
        let content = std::fs::read_to_string(path).expect("read output");
        let report: serde_json::Value = serde_json::from_str(&content).expect("valid json");
        report["games"][0]["digest"].as_str().unwrap_or_default().to_string()
    };
    let first = digest("digest-a");
    assert!(!first.is_empty());
    assert_eq!(first, digest("digest-b"));
}

#[test]
fn cli_exports_event_configuration() {
    let exe = env!("CARGO_BIN_EXE_hgs-tester");
    let export_path = temp_path("export.json");
    let status = Command::new(exe)
        .arg("--export")
        .arg(&export_path)
        .status()
        .expect("run cli");
    assert!(status.success());
    let content = std::fs::read_to_string(export_path).expect("read export");
    let config: serde_json::Value = serde_json::from_str(&content).expect("valid json");
    assert_eq!(config["version"], 1);
    assert!(config["events"]["bloodbath"].is_array());
}

#[test]
fn cli_rejects_bad_seed() {
    let exe = env!("CARGO_BIN_EXE_hgs-tester");
    let output = Command::new(exe)
        .args(["--seeds", "banana"])
        .output()
        .expect("run cli");
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("banana"));
}

#[test]
fn cli_reports_undersized_roster_as_failure() {
    let exe = env!("CARGO_BIN_EXE_hgs-tester");
    let output_path = temp_path("lonely.md");
    let status = Command::new(exe)
        .args(["--tributes", "1", "--report", "markdown", "--output"])
        .arg(&output_path)
        .status()
        .expect("run cli");
    assert_eq!(status.code(), Some(1));
    let content = std::fs::read_to_string(output_path).expect("read output");
    assert!(content.contains("at least two tributes"));
}

#[test]
fn cli_plays_roster_file_with_round_cap() {
    let exe = env!("CARGO_BIN_EXE_hgs-tester");
    let roster_path = temp_path("roster.json");
    std::fs::write(
        &roster_path,
        r#"[
            {"name": "Katniss", "pronouns": "feminine"},
            {"name": "Peeta", "pronouns": "masculine"},
            {"name": "Rue", "pronouns": "feminine"},
            {"name": "Cato", "pronouns": "masculine", "tags": ["career"]},
            {"name": "Foxface", "pronouns": {"custom": "they/them/their/themself"}}
        ]"#,
    )
    .expect("write roster");
    let output_path = temp_path("capped.json");
    let status = Command::new(exe)
        .args(["--max-rounds", "1", "--transcript", "--report", "json", "--roster"])
        .arg(&roster_path)
        .arg("--output")
        .arg(&output_path)
        .status()
        .expect("run cli");
    assert!(status.success());
    let content = std::fs::read_to_string(output_path).expect("read output");
    let report: serde_json::Value = serde_json::from_str(&content).expect("valid json");
    let game = &report["games"][0];
    assert_eq!(game["rounds"], 1);
    assert_eq!(game["capped"], true);
    assert_eq!(game["transcript"][0], "== Bloodbath ==");
}
