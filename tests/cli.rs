//! CLI argument parsing and binary smoke tests.

use assert_cmd::Command;
use assert_fs::TempDir;
use assert_fs::prelude::*;
use clap::Parser;
use predicates::prelude::*;

use teachassist::cli::{Cli, Commands};

fn tas() -> Command {
    Command::cargo_bin("tas").unwrap()
}

#[test]
fn detect_defaults_to_current_directory() {
    let cli = Cli::try_parse_from(["teachassist", "detect"]).unwrap();
    match cli.command {
        Commands::Detect(args) => {
            assert_eq!(args.path.to_str(), Some("."));
            assert!(!args.json);
        }
        _ => panic!("expected detect"),
    }
}

#[test]
fn analyze_requires_a_target() {
    assert!(Cli::try_parse_from(["teachassist", "analyze"]).is_err());

    let cli = Cli::try_parse_from([
        "teachassist",
        "analyze",
        "src/",
        "--exercise",
        "test-basic",
        "--output",
        "out.json",
    ])
    .unwrap();
    match cli.command {
        Commands::Analyze(args) => {
            assert_eq!(args.targets.len(), 1);
            assert_eq!(args.exercise.as_deref(), Some("test-basic"));
            assert_eq!(args.output.to_str(), Some("out.json"));
        }
        _ => panic!("expected analyze"),
    }
}

#[test]
fn assess_requires_an_assessment_id() {
    assert!(Cli::try_parse_from(["teachassist", "assess"]).is_err());

    let cli = Cli::try_parse_from(["teachassist", "assess", "midterm", "--json"]).unwrap();
    match cli.command {
        Commands::Assess(args) => {
            assert_eq!(args.assessment, "midterm");
            assert_eq!(args.submissions.to_str(), Some("extracted"));
            assert!(args.json);
        }
        _ => panic!("expected assess"),
    }
}

#[test]
fn global_flags_parse_anywhere() {
    let cli =
        Cli::try_parse_from(["teachassist", "detect", "--quiet", "--no-color", "--dry-run"])
            .unwrap();
    assert!(cli.quiet);
    assert!(cli.no_color);
    assert!(cli.dry_run);
}

#[test]
fn detect_reports_empty_folder() {
    let tmp = TempDir::new().unwrap();

    tas()
        .current_dir(tmp.path())
        .arg("detect")
        .assert()
        .success()
        .stdout(predicate::str::contains("No ZIP archives"));
}

#[test]
fn detect_json_lists_archives() {
    let tmp = TempDir::new().unwrap();
    tmp.child("alice.zip").write_binary(b"PK").unwrap();

    tas()
        .current_dir(tmp.path())
        .args(["detect", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"student_name\":\"alice\""));
}

#[test]
fn init_refuses_to_overwrite_without_force() {
    let tmp = TempDir::new().unwrap();

    tas().current_dir(tmp.path()).arg("init").assert().success();
    tmp.child("teachassist.toml")
        .assert(predicate::str::contains("config_dir"));

    tas()
        .current_dir(tmp.path())
        .arg("init")
        .assert()
        .failure()
        .stderr(predicate::str::contains("--force"));

    tas()
        .current_dir(tmp.path())
        .args(["init", "--force"])
        .assert()
        .success();
}

#[test]
fn analyze_writes_a_report_file() {
    let tmp = TempDir::new().unwrap();
    tmp.child("Broken.java")
        .write_str("public class Broken {\n    int x = ;\n}\n")
        .unwrap();

    tas()
        .current_dir(tmp.path())
        .args(["--no-color", "analyze", "Broken.java"])
        .assert()
        .success();

    tmp.child("analysis.json")
        .assert(predicate::str::contains("syntax.valid"));
}

#[test]
fn completions_print_to_stdout() {
    tas()
        .args(["completions", "bash", "--stdout"])
        .assert()
        .success()
        .stdout(predicate::str::contains("teachassist"));
}
