//! Assessment scoring across extracted submissions.
//!
//! For each student and exercise: every Java file is analyzed, findings
//! are merged at the rule level (declared-in-any-file satisfies a
//! requirement), and points are prorated by passed/required findings.
//! Any syntax error zeroes the exercise; warnings never deduct.

use std::path::PathBuf;

use anyhow::{Context, Result};
use itertools::Itertools;
use indexmap::IndexMap;
use owo_colors::OwoColorize;
use rayon::prelude::*;
use serde::Serialize;
use tabled::{Table, Tabled};
use tracing::info;

use crate::cli::{AppContext, AssessArgs};
use crate::core::analyze::{CodeAnalyzer, FindingStatus};
use crate::core::locate::locate_all_java_files;
use crate::infra::config::{
    AssessmentConfig, load_assessment_config, load_config, load_exercise_config,
};

const DEFAULT_MAX_POINTS: u32 = 10;

#[derive(Debug, Clone, Serialize)]
pub struct ExerciseScore {
    pub exercise_id: String,
    pub max_points: u32,
    pub points: f64,
    pub passed: usize,
    pub failed: usize,
    pub syntax_errors: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct StudentResult {
    pub student_name: String,
    pub scores: Vec<ExerciseScore>,
    pub total: f64,
    pub max_total: u32,
}

#[derive(Debug, Serialize)]
pub struct AssessmentReport {
    pub assessment_id: String,
    pub name: String,
    pub results: Vec<StudentResult>,
}

/// Score one exercise over all of a student's files.
fn score_exercise(analyzer: &CodeAnalyzer, files: &[PathBuf], max_points: u32) -> ExerciseScore {
    let reports: Vec<_> = files.iter().map(|f| analyzer.analyze_file(f)).collect();

    let syntax_errors: usize = reports.iter().map(|r| r.syntax_errors.len()).sum();

    // Merge rule verdicts across files: a requirement satisfied in any
    // file counts as passed.
    let mut merged: IndexMap<(String, String), FindingStatus> = IndexMap::new();
    for finding in reports.iter().flat_map(|r| &r.findings) {
        let key = (finding.rule_id.clone(), finding.description.clone());
        match merged.get(&key) {
            Some(FindingStatus::Passed) => {}
            _ => {
                merged.insert(key, finding.status);
            }
        }
    }

    let passed = merged
        .values()
        .filter(|s| **s == FindingStatus::Passed)
        .count();
    let failed = merged
        .values()
        .filter(|s| **s == FindingStatus::Failed)
        .count();

    let points = if files.is_empty() || syntax_errors > 0 {
        0.0
    } else if passed + failed == 0 {
        f64::from(max_points)
    } else {
        // One decimal keeps grade sheets readable
        let ratio = passed as f64 / (passed + failed) as f64;
        (f64::from(max_points) * ratio * 10.0).round() / 10.0
    };

    ExerciseScore {
        exercise_id: analyzer.exercise_id().to_string(),
        max_points,
        points,
        passed,
        failed,
        syntax_errors,
    }
}

fn assess(
    assessment: &AssessmentConfig,
    analyzers: &[(CodeAnalyzer, u32)],
    submissions: &IndexMap<String, Vec<PathBuf>>,
) -> AssessmentReport {
    let max_total: u32 = assessment
        .total_max_points
        .unwrap_or_else(|| analyzers.iter().map(|(_, max)| *max).sum());

    let mut results: Vec<StudentResult> = submissions
        .par_iter()
        .map(|(student, files)| {
            let scores: Vec<ExerciseScore> = analyzers
                .iter()
                .map(|(analyzer, max)| score_exercise(analyzer, files, *max))
                .collect();

            let total = scores.iter().map(|s| s.points).sum();

            StudentResult {
                student_name: student.clone(),
                scores,
                total,
                max_total,
            }
        })
        .collect();

    results.sort_by(|a, b| a.student_name.cmp(&b.student_name));

    AssessmentReport {
        assessment_id: assessment.assessment_id.clone(),
        name: assessment.name.clone(),
        results,
    }
}

#[derive(Tabled)]
struct ScoreRow {
    student: String,
    exercise: String,
    points: String,
    issues: String,
}

fn print_table(report: &AssessmentReport) {
    let rows: Vec<ScoreRow> = report
        .results
        .iter()
        .flat_map(|result| {
            result.scores.iter().map(|score| {
                let issues = if score.syntax_errors > 0 {
                    format!("{} syntax error(s)", score.syntax_errors)
                        .red()
                        .to_string()
                } else if score.failed > 0 {
                    format!("{} failed finding(s)", score.failed)
                        .yellow()
                        .to_string()
                } else {
                    "ok".green().to_string()
                };

                ScoreRow {
                    student: result.student_name.clone(),
                    exercise: score.exercise_id.clone(),
                    points: format!("{}/{}", score.points, score.max_points),
                    issues,
                }
            })
        })
        .collect();

    println!("{}", Table::new(rows));

    let totals = report
        .results
        .iter()
        .map(|r| format!("{}: {}/{}", r.student_name, r.total, r.max_total))
        .join("  |  ");
    println!("\n{} {}", "Totals".bold(), totals);
}

pub fn run(args: AssessArgs, ctx: &AppContext) -> Result<()> {
    let config = load_config().unwrap_or_default();
    let config_dir = args.config_dir.unwrap_or(config.config_dir);

    let assessment = load_assessment_config(&config_dir, &args.assessment)
        .with_context(|| format!("loading assessment '{}'", args.assessment))?;

    // An assessment naming a missing exercise is an operator error, not
    // a per-student condition; fail fast before any grading.
    let analyzers: Vec<(CodeAnalyzer, u32)> = assessment
        .exercises
        .iter()
        .map(|ex| {
            let exercise = load_exercise_config(&config_dir, &ex.exercise_id)
                .with_context(|| format!("loading exercise '{}'", ex.exercise_id))?;
            Ok((
                CodeAnalyzer::new(exercise)?,
                ex.max_points.unwrap_or(DEFAULT_MAX_POINTS),
            ))
        })
        .collect::<Result<_>>()?;

    let submissions = locate_all_java_files(&args.submissions)?;
    if submissions.is_empty() {
        anyhow::bail!(
            "No submissions found under {}",
            args.submissions.display()
        );
    }

    if ctx.dry_run {
        if !ctx.quiet {
            println!("{}", "DRY RUN: Would assess:".yellow());
            println!("  Assessment: {}", assessment.name);
            println!("  Students: {}", submissions.keys().join(", "));
        }
        return Ok(());
    }

    info!(
        assessment = %assessment.assessment_id,
        students = submissions.len(),
        "scoring submissions"
    );

    let report = assess(&assessment, &analyzers, &submissions);

    if args.json {
        println!("{}", serde_json::to_string(&report)?);
    } else if !ctx.quiet {
        println!("{} — {}\n", report.name.bold(), report.assessment_id);
        print_table(&report);
    }

    if let Some(output) = &args.output {
        let json = serde_json::to_string_pretty(&report)?;
        std::fs::write(output, json)
            .with_context(|| format!("writing results to {}", output.display()))?;
        if !ctx.quiet && !args.json {
            println!("{} Results written to {}", "✓".green(), output.display());
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::config::{AssessmentExercise, ExerciseConfig, ExerciseRules};
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    fn analyzer_requiring(classes: &[&str]) -> CodeAnalyzer {
        CodeAnalyzer::new(ExerciseConfig {
            id: "ex1".to_string(),
            name: "Exercise 1".to_string(),
            description: "test".to_string(),
            rules: ExerciseRules {
                required_classes: classes.iter().map(|s| s.to_string()).collect(),
                ..Default::default()
            },
        })
        .unwrap()
    }

    fn write(dir: &Path, rel: &str, contents: &str) -> PathBuf {
        let path = dir.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn full_marks_for_clean_satisfying_submission() {
        let tmp = TempDir::new().unwrap();
        let file = write(tmp.path(), "Main.java", "public class Main {}");

        let analyzer = analyzer_requiring(&["Main"]);
        let score = score_exercise(&analyzer, &[file], 10);

        assert_eq!(score.syntax_errors, 0);
        assert_eq!(score.points, 10.0);
    }

    #[test]
    fn syntax_errors_zero_the_exercise() {
        let tmp = TempDir::new().unwrap();
        let file = write(tmp.path(), "Main.java", "public class Main {");

        let analyzer = analyzer_requiring(&["Main"]);
        let score = score_exercise(&analyzer, &[file], 10);

        assert!(score.syntax_errors > 0);
        assert_eq!(score.points, 0.0);
    }

    #[test]
    fn points_prorate_by_passed_findings() {
        let tmp = TempDir::new().unwrap();
        let file = write(tmp.path(), "Main.java", "public class Main {}");

        // syntax.valid passes, Main passes, Helper fails: 2/3 of 9
        let analyzer = analyzer_requiring(&["Main", "Helper"]);
        let score = score_exercise(&analyzer, &[file], 9);

        assert_eq!(score.passed, 2);
        assert_eq!(score.failed, 1);
        assert_eq!(score.points, 6.0);
    }

    #[test]
    fn requirement_satisfied_in_any_file_counts() {
        let tmp = TempDir::new().unwrap();
        let a = write(tmp.path(), "A.java", "public class A {}");
        let b = write(tmp.path(), "Helper.java", "public class Helper {}");

        let analyzer = analyzer_requiring(&["Helper"]);
        let score = score_exercise(&analyzer, &[a, b], 10);

        assert_eq!(score.failed, 0);
        assert_eq!(score.points, 10.0);
    }

    #[test]
    fn empty_submission_scores_zero() {
        let analyzer = analyzer_requiring(&[]);
        let score = score_exercise(&analyzer, &[], 10);
        assert_eq!(score.points, 0.0);
    }

    #[test]
    fn assessment_totals_sum_exercises() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "alice/Main.java", "public class Main {}");

        let submissions = locate_all_java_files(tmp.path()).unwrap();
        let assessment = AssessmentConfig {
            assessment_id: "mid".to_string(),
            name: "Midterm".to_string(),
            exercises: vec![AssessmentExercise {
                exercise_id: "ex1".to_string(),
                max_points: Some(10),
            }],
            total_max_points: None,
        };
        let analyzers = vec![(analyzer_requiring(&["Main"]), 10u32)];

        let report = assess(&assessment, &analyzers, &submissions);
        assert_eq!(report.results.len(), 1);
        assert_eq!(report.results[0].total, 10.0);
        assert_eq!(report.results[0].max_total, 10);
    }
}
