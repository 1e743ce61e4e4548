//! CLI contract tests: outputs and exit codes of the `repoq` binary

mod common;

use std::path::Path;
use std::process::{Command, Output};

fn repoq(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_repoq"))
        .args(args)
        .env_remove("RUST_LOG")
        .env_remove("REPOQ_CONFIG")
        .output()
        .expect("failed to run repoq")
}

fn path_str(p: &Path) -> &str {
    p.to_str().unwrap()
}

fn read_json(p: &Path) -> serde_json::Value {
    serde_json::from_str(&std::fs::read_to_string(p).unwrap()).unwrap()
}

/// Files of the two-file repo must stay under 10 LOC or fail
const SMALL_FILES: &str = r#"
@prefix sh: <http://www.w3.org/ns/shacl#> .
@prefix repo: <http://repoq.dev/ns#> .
repo:SmallFileShape a sh:NodeShape ;
    sh:targetClass repo:File ;
    sh:property [ sh:path repo:loc ; sh:maxInclusive 10 ; sh:severity sh:SEVERITY ] .
"#;

fn shapes_file(dir: &Path, severity: &str) -> std::path::PathBuf {
    let path = dir.join(format!("small-{}.ttl", severity));
    std::fs::write(&path, SMALL_FILES.replace("SEVERITY", severity)).unwrap();
    path
}

#[test]
fn test_analyze_writes_all_reports() {
    let repo = common::two_file_repo();
    let out = tempfile::tempdir().unwrap();
    let jsonld = out.path().join("report.jsonld");
    let ttl = out.path().join("report.ttl");
    let md = out.path().join("report.md");

    let output = repoq(&[
        "analyze",
        path_str(repo.path()),
        "--no-external",
        "-o",
        path_str(&jsonld),
        "--ttl",
        path_str(&ttl),
        "--md",
        path_str(&md),
    ]);
    assert_eq!(output.status.code(), Some(0), "{}", String::from_utf8_lossy(&output.stderr));

    let report = read_json(&jsonld);
    assert!(report["@context"]["repo"].is_string());
    assert_eq!(report["@type"][0], "repo:Project");
    assert_eq!(report["files"].as_array().unwrap().len(), 3);
    let coupling = report["coupling"].as_array().unwrap();
    assert_eq!(coupling.len(), 1);
    assert_eq!(coupling[0]["weight"], 1);

    let turtle = std::fs::read_to_string(&ttl).unwrap();
    assert!(turtle.contains("@prefix repo: <http://repoq.dev/ns#>"));
    assert!(turtle.contains("repo:Coupling"));

    let markdown = std::fs::read_to_string(&md).unwrap();
    assert!(markdown.contains("## Hotspots"));
    assert!(markdown.contains("big.py"));
}

#[test]
fn test_analyze_prints_format_to_stdout() {
    let repo = common::two_file_repo();
    let output = repoq(&[
        "full",
        path_str(repo.path()),
        "--no-external",
        "--no-git",
        "--format",
        "turtle",
    ]);
    assert_eq!(output.status.code(), Some(0));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.starts_with("@prefix "));
    assert!(!stdout.contains("repo:Commit"));
}

#[test]
fn test_structure_flags() {
    let repo = common::two_file_repo();
    let output = repoq(&[
        "structure",
        path_str(repo.path()),
        "--no-external",
        "--exclude",
        "idle.py",
        "--max-files",
        "1",
    ]);
    assert_eq!(output.status.code(), Some(0));
    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let files = report["files"].as_array().unwrap();
    assert_eq!(files.len(), 1);
    assert_eq!(files[0]["path"], "big.py");
    assert!(report["commits"].as_array().unwrap().is_empty());
}

#[test]
fn test_missing_path_exits_2() {
    let output = repoq(&["analyze", "/definitely/not/a/repo"]);
    assert_eq!(output.status.code(), Some(2));
    assert!(String::from_utf8_lossy(&output.stderr).contains("not/a/repo"));
}

#[test]
fn test_file_target_exits_2() {
    let repo = common::two_file_repo();
    let file = repo.path().join("big.py");
    for command in ["structure", "history", "analyze"] {
        let output = repoq(&[command, path_str(&file), "--no-git", "--no-external"]);
        assert_eq!(output.status.code(), Some(2), "{}", command);
        assert!(output.stdout.is_empty());
        assert!(String::from_utf8_lossy(&output.stderr).contains("is not a directory"));
    }
}

#[test]
fn test_bad_config_exits_2() {
    let repo = common::two_file_repo();
    std::fs::write(repo.path().join("repoq.toml"), "[history]\nownership_threshold = 3.0\n").unwrap();
    let output = repoq(&["analyze", path_str(repo.path()), "--no-external"]);
    assert_eq!(output.status.code(), Some(2));

    let missing = repoq(&["--config", "/no/such/repoq.toml", "structure", path_str(repo.path())]);
    assert_eq!(missing.status.code(), Some(2));
}

#[test]
fn test_gate_exit_codes() {
    let repo = common::two_file_repo();
    let shapes = tempfile::tempdir().unwrap();
    let violation = shapes_file(shapes.path(), "Violation");
    let warning = shapes_file(shapes.path(), "Warning");
    let root = path_str(repo.path());

    let failed = repoq(&["gate", root, "--no-external", "--shapes", path_str(&violation)]);
    assert_eq!(failed.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&failed.stdout).contains("FAILED"));

    let lenient = repoq(&["gate", root, "--no-external", "--shapes", path_str(&warning)]);
    assert_eq!(lenient.status.code(), Some(0));

    let strict = repoq(&[
        "gate",
        root,
        "--no-external",
        "--shapes",
        path_str(&warning),
        "--strict",
        "--json",
    ]);
    assert_eq!(strict.status.code(), Some(1));
    let outcome: serde_json::Value = serde_json::from_slice(&strict.stdout).unwrap();
    assert_eq!(outcome["passed"], false);
    assert_eq!(outcome["warnings"], 1);

    let missing_shapes = repoq(&["gate", root, "--shapes", "/no/such/shapes"]);
    assert_eq!(missing_shapes.status.code(), Some(2));
}

#[test]
fn test_validate_exported_turtle() {
    let repo = common::two_file_repo();
    let out = tempfile::tempdir().unwrap();
    let ttl = out.path().join("report.ttl");
    let exported = repoq(&[
        "analyze",
        path_str(repo.path()),
        "--no-external",
        "--format",
        "ttl",
        "-o",
        path_str(&ttl),
    ]);
    assert_eq!(exported.status.code(), Some(0));

    let violation = shapes_file(out.path(), "Violation");
    let report = out.path().join("validation.ttl");
    let failed = repoq(&[
        "validate",
        path_str(&ttl),
        "--shapes",
        path_str(&violation),
        "--report",
        path_str(&report),
    ]);
    assert_eq!(failed.status.code(), Some(1));
    let text = std::fs::read_to_string(&report).unwrap();
    assert!(text.contains("sh:ValidationReport"));
    assert!(text.contains("sh:conforms false"));

    let lenient = out.path().join("lenient.ttl");
    std::fs::write(
        &lenient,
        "@prefix sh: <http://www.w3.org/ns/shacl#> .\n@prefix repo: <http://repoq.dev/ns#> .\n\
         repo:S a sh:NodeShape ; sh:targetClass repo:File ; sh:property [ sh:path repo:path ; sh:minCount 1 ] .\n",
    )
    .unwrap();
    let passed = repoq(&["validate", path_str(&ttl), "--shapes", path_str(&lenient)]);
    assert_eq!(passed.status.code(), Some(0));
    assert!(String::from_utf8_lossy(&passed.stdout).contains("sh:conforms true"));
}

#[test]
fn test_diff_fail_on_regression() {
    let repo = common::two_file_repo();
    let out = tempfile::tempdir().unwrap();
    let old = out.path().join("old.jsonld");
    let new = out.path().join("new.jsonld");
    let root = path_str(repo.path());

    // Without history nothing is hot; with it big.py becomes a high hotspot
    assert_eq!(
        repoq(&["analyze", root, "--no-external", "--no-git", "-o", path_str(&old)]).status.code(),
        Some(0)
    );
    assert_eq!(
        repoq(&["analyze", root, "--no-external", "-o", path_str(&new)]).status.code(),
        Some(0)
    );

    let plain = repoq(&["diff", path_str(&old), path_str(&new)]);
    assert_eq!(plain.status.code(), Some(0));

    let gated = repoq(&["diff", path_str(&old), path_str(&new), "--fail-on-regression", "--json"]);
    assert_eq!(gated.status.code(), Some(1));
    let diff: serde_json::Value = serde_json::from_slice(&gated.stdout).unwrap();
    assert!(diff["new_issues"]
        .as_array()
        .unwrap()
        .iter()
        .any(|i| i["id"] == "repo:issue/hotspot/big.py"));

    let reversed = repoq(&["diff", path_str(&new), path_str(&old), "--fail-on-regression"]);
    assert_eq!(reversed.status.code(), Some(0));

    let broken = out.path().join("broken.jsonld");
    std::fs::write(&broken, "{ not json").unwrap();
    assert_eq!(repoq(&["diff", path_str(&broken), path_str(&new)]).status.code(), Some(2));
}

#[test]
fn test_refactor_plan() {
    let repo = common::two_file_repo();
    let output = repoq(&["refactor-plan", path_str(repo.path()), "--no-external", "--top", "1"]);
    assert_eq!(output.status.code(), Some(0));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("# Refactor plan"));
    assert!(stdout.contains("| 1 | `big.py` | S | high |"));

    let out = tempfile::tempdir().unwrap();
    let report = out.path().join("report.jsonld");
    assert_eq!(
        repoq(&["analyze", path_str(repo.path()), "--no-external", "-o", path_str(&report)])
            .status
            .code(),
        Some(0)
    );
    let json = repoq(&["refactor-plan", path_str(&report), "--format", "json"]);
    assert_eq!(json.status.code(), Some(0));
    let plan: serde_json::Value = serde_json::from_slice(&json.stdout).unwrap();
    assert_eq!(plan["tasks"][0]["file"], "big.py");
    assert_eq!(plan["tasks"][0]["effort"], "S");
}
