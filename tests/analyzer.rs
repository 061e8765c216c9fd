//! End-to-end analysis over the bundled Java fixtures.

use std::path::PathBuf;

use anyhow::Result;
use teachassist::core::analyze::{CodeAnalyzer, FindingStatus};
use teachassist::infra::config::load_exercise_config;

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name)
}

fn fixture_config_dir() -> PathBuf {
    fixture("configs")
}

#[test]
fn defective_submission_yields_multiple_diagnostics() -> Result<()> {
    let exercise = load_exercise_config(&fixture_config_dir(), "test-basic")?;
    let analyzer = CodeAnalyzer::new(exercise)?;

    let report = analyzer.analyze_file(&fixture("SyntaxError.java"));

    // The fixture carries a missing parenthesis, an unclosed brace and
    // an assignment to an undeclared variable.
    assert!(report.has_syntax_errors());
    assert!(report.syntax_errors.len() >= 2, "expected at least two syntax defects, got {:?}", report.syntax_errors);
    assert!(report.diagnostic_count() >= 3);

    let syntax = report
        .findings
        .iter()
        .find(|f| f.rule_id == "syntax.valid")
        .expect("syntax.valid finding");
    assert_eq!(syntax.status, FindingStatus::Failed);

    let scope = report
        .findings
        .iter()
        .find(|f| f.rule_id == "scope.undeclared")
        .expect("scope.undeclared finding");
    assert_eq!(scope.status, FindingStatus::Failed);
    assert!(scope.description.contains("unknownVar"));
    Ok(())
}

#[test]
fn syntax_defects_carry_positions_and_messages() -> Result<()> {
    let analyzer = CodeAnalyzer::syntax_only()?;
    let report = analyzer.analyze_file(&fixture("SyntaxError.java"));

    for issue in &report.syntax_errors {
        assert!(issue.line >= 1);
        assert!(issue.column >= 1);
        assert!(!issue.message.is_empty());
    }
    Ok(())
}

#[test]
fn clean_submission_satisfies_the_exercise() -> Result<()> {
    let exercise = load_exercise_config(&fixture_config_dir(), "test-basic")?;
    let analyzer = CodeAnalyzer::new(exercise)?;

    let report = analyzer.analyze_file(&fixture("Hello.java"));

    assert!(!report.has_syntax_errors());
    assert_eq!(report.diagnostic_count(), 0);
    assert!(
        report
            .findings
            .iter()
            .all(|f| f.status == FindingStatus::Passed),
        "unexpected non-passed findings: {:?}",
        report.findings
    );

    // syntax.valid, class Hello, method main
    assert!(report.findings.len() >= 3);
    Ok(())
}

#[test]
fn reports_serialize_with_stable_field_names() -> Result<()> {
    let analyzer = CodeAnalyzer::syntax_only()?;
    let report = analyzer.analyze_file(&fixture("Hello.java"));

    let json = serde_json::to_string(&report)?;
    assert!(json.contains("\"rule_id\":\"syntax.valid\""));
    assert!(json.contains("\"status\":\"passed\""));
    Ok(())
}
