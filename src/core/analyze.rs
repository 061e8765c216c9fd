//! End-to-end analysis of Java submissions against an exercise.
//!
//! One report record per analyzed file: the syntax issues tree-sitter
//! recovered, the rule findings, and run metadata. Rules still run when
//! the parse had errors; tree-sitter's recovery keeps the rest of the
//! file visible, so a missing brace doesn't mask an undeclared variable.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use ariadne::{Color, Label, Report, ReportKind, Source};
use chrono::{DateTime, Utc};
use owo_colors::OwoColorize;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::cli::{AnalyzeArgs, AppContext};
use crate::core::rules::RuleEngine;
use crate::infra::config::{ExerciseConfig, load_config, load_exercise_config};
use crate::infra::io::read_file_smart;
use crate::infra::walk::FileWalker;
use crate::parsers::java_parser::{JavaParser, PARSER_VERSION, SyntaxIssue};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FindingStatus {
    Passed,
    Failed,
    Warning,
    Info,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Location {
    pub line: usize,
    pub column: usize,
}

/// One rule verdict, in the shape graders consume downstream.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Finding {
    pub rule_id: String,
    pub description: String,
    pub status: FindingStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<Location>,
}

impl Finding {
    fn new(rule_id: &str, description: String, status: FindingStatus) -> Self {
        Self {
            rule_id: rule_id.to_string(),
            description,
            status,
            message: None,
            location: None,
        }
    }

    pub fn passed(rule_id: &str, description: impl Into<String>) -> Self {
        Self::new(rule_id, description.into(), FindingStatus::Passed)
    }

    pub fn failed(rule_id: &str, description: impl Into<String>) -> Self {
        Self::new(rule_id, description.into(), FindingStatus::Failed)
    }

    pub fn warning(rule_id: &str, description: impl Into<String>) -> Self {
        Self::new(rule_id, description.into(), FindingStatus::Warning)
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn at(mut self, line: usize, column: usize) -> Self {
        self.location = Some(Location { line, column });
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisMetadata {
    pub analysis_date: DateTime<Utc>,
    pub parser_version: String,
}

/// Full analysis record for one source file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileAnalysis {
    pub exercise_id: String,
    pub file: PathBuf,
    pub findings: Vec<Finding>,
    pub syntax_errors: Vec<SyntaxIssue>,
    pub metadata: AnalysisMetadata,
}

impl FileAnalysis {
    /// Total diagnostics a grader sees: syntax defects plus rule
    /// findings that flag a problem.
    pub fn diagnostic_count(&self) -> usize {
        self.syntax_errors.len()
            + self
                .findings
                .iter()
                .filter(|f| matches!(f.status, FindingStatus::Failed | FindingStatus::Warning))
                .count()
    }

    pub fn has_syntax_errors(&self) -> bool {
        !self.syntax_errors.is_empty()
    }
}

/// Analyzer bound to one exercise configuration.
pub struct CodeAnalyzer {
    exercise: ExerciseConfig,
    parser: JavaParser,
}

impl CodeAnalyzer {
    pub fn new(exercise: ExerciseConfig) -> Result<Self> {
        Ok(Self {
            exercise,
            parser: JavaParser::new()?,
        })
    }

    /// Analyzer for ad-hoc syntax checking without exercise rules.
    pub fn syntax_only() -> Result<Self> {
        Self::new(ExerciseConfig {
            id: "syntax-check".to_string(),
            name: "Syntax check".to_string(),
            description: "Syntax validation without exercise rules".to_string(),
            rules: Default::default(),
        })
    }

    pub fn exercise_id(&self) -> &str {
        &self.exercise.id
    }

    /// Analyze one source string; IO and config problems are the
    /// caller's business, parse defects are findings, never errors.
    pub fn analyze(&self, code: &str, file: &Path) -> Result<FileAnalysis> {
        let analysis = self.parser.analyze_source(code)?;

        let mut findings = Vec::new();
        if analysis.parsed_cleanly() {
            findings.push(Finding::passed(
                "syntax.valid",
                "Source parsed without syntax errors",
            ));
        } else {
            findings.push(Finding::failed(
                "syntax.valid",
                format!(
                    "Source has {} syntax error(s)",
                    analysis.syntax_issues.len()
                ),
            ));
        }

        findings.extend(RuleEngine::new(&self.exercise.rules).evaluate(&analysis, code));

        Ok(FileAnalysis {
            exercise_id: self.exercise.id.clone(),
            file: file.to_path_buf(),
            findings,
            syntax_errors: analysis.syntax_issues,
            metadata: AnalysisMetadata {
                analysis_date: Utc::now(),
                parser_version: PARSER_VERSION.to_string(),
            },
        })
    }

    /// Analyze a file from disk; read failures degrade to a
    /// `system.error` warning record so one bad file never sinks a run.
    pub fn analyze_file(&self, path: &Path) -> FileAnalysis {
        let content = match read_file_smart(path) {
            Ok(c) => c,
            Err(err) => return self.system_error_record(path, &err),
        };

        match self.analyze(content.as_ref(), path) {
            Ok(report) => report,
            Err(err) => self.system_error_record(path, &err),
        }
    }

    fn system_error_record(&self, path: &Path, err: &anyhow::Error) -> FileAnalysis {
        warn!(file = %path.display(), error = %err, "analysis failed");
        FileAnalysis {
            exercise_id: self.exercise.id.clone(),
            file: path.to_path_buf(),
            findings: vec![
                Finding::warning("system.error", "A system error occurred during analysis")
                    .with_message(format!("{err:#}")),
            ],
            syntax_errors: Vec::new(),
            metadata: AnalysisMetadata {
                analysis_date: Utc::now(),
                parser_version: PARSER_VERSION.to_string(),
            },
        }
    }
}

/// Expand target paths: files stay, directories are walked for `.java`.
fn collect_java_targets(targets: &[PathBuf], ignores: &[String]) -> Result<Vec<PathBuf>> {
    let walker = FileWalker::new(ignores)?.with_extensions(&["java"]);

    let mut files = Vec::new();
    for target in targets {
        if target.is_dir() {
            files.extend(walker.walk_files(target));
        } else {
            files.push(target.clone());
        }
    }
    files.sort();
    files.dedup();
    Ok(files)
}

pub fn run(args: AnalyzeArgs, ctx: &AppContext) -> Result<()> {
    let config = load_config().unwrap_or_default();
    let config_dir = args.config_dir.unwrap_or(config.config_dir);

    // A missing exercise config degrades to syntax-only analysis with a
    // system.error finding, matching how downstream consumers expect
    // partial results rather than a hard stop.
    let (analyzer, config_failure) = match &args.exercise {
        Some(id) => match load_exercise_config(&config_dir, id) {
            Ok(exercise) => (CodeAnalyzer::new(exercise)?, None),
            Err(err) => {
                warn!(exercise = %id, error = %err, "exercise config unavailable");
                (CodeAnalyzer::syntax_only()?, Some(err.to_string()))
            }
        },
        None => (CodeAnalyzer::syntax_only()?, None),
    };

    let files = collect_java_targets(&args.targets, &config.ignore_patterns)?;
    if files.is_empty() {
        anyhow::bail!("No Java files found in the given targets");
    }

    if ctx.dry_run {
        if !ctx.quiet {
            println!("{}", "DRY RUN: Would analyze:".yellow());
            for f in &files {
                println!("  {}", f.display());
            }
        }
        return Ok(());
    }

    info!(files = files.len(), exercise = analyzer.exercise_id(), "starting analysis");

    let mut reports: Vec<FileAnalysis> = files
        .par_iter()
        .map(|path| analyzer.analyze_file(path))
        .collect();

    if let Some(reason) = config_failure {
        for report in &mut reports {
            report.findings.push(
                Finding::warning("system.error", "Exercise configuration unavailable")
                    .with_message(reason.clone()),
            );
        }
    }

    if args.json {
        println!("{}", serde_json::to_string(&reports)?);
    } else if !ctx.quiet {
        for report in &reports {
            print_report(report, ctx)?;
        }
        print_summary(&reports);
    }

    let json = serde_json::to_string_pretty(&reports)?;
    std::fs::write(&args.output, json)
        .with_context(|| format!("writing report to {}", args.output.display()))?;

    if !ctx.quiet && !args.json {
        println!("{} Report written to {}", "✓".green(), args.output.display());
    }

    Ok(())
}

/// Human-readable report for one file: labeled source snippets for
/// syntax defects, then rule findings.
fn print_report(report: &FileAnalysis, ctx: &AppContext) -> Result<()> {
    println!("\n{}", report.file.display().to_string().bold());

    if report.has_syntax_errors() {
        if ctx.no_color {
            for issue in &report.syntax_errors {
                println!("  {}:{} {}", issue.line, issue.column, issue.message);
                if let Some(snippet) = &issue.snippet {
                    println!("    | {snippet}");
                }
            }
        } else {
            print_labeled_issues(report)?;
        }
    }

    for finding in &report.findings {
        let tag = match finding.status {
            FindingStatus::Passed => "PASS".green().to_string(),
            FindingStatus::Failed => "FAIL".red().to_string(),
            FindingStatus::Warning => "WARN".yellow().to_string(),
            FindingStatus::Info => "INFO".blue().to_string(),
        };
        let place = finding
            .location
            .as_ref()
            .map(|l| format!(" (line {})", l.line))
            .unwrap_or_default();
        println!("  [{tag}] {}{place}", finding.description);
        if let Some(msg) = &finding.message {
            println!("         {msg}");
        }
    }

    Ok(())
}

fn print_labeled_issues(report: &FileAnalysis) -> Result<()> {
    let source = std::fs::read_to_string(&report.file).unwrap_or_default();
    let source_id = report.file.display().to_string();

    for issue in &report.syntax_errors {
        let span = issue.byte_offset..issue.byte_offset + 1;
        Report::build(ReportKind::Error, (&source_id, span.clone()))
            .with_message(&issue.message)
            .with_label(
                Label::new((&source_id, span))
                    .with_message(&issue.message)
                    .with_color(Color::Red),
            )
            .finish()
            .print((&source_id, Source::from(source.clone())))
            .map_err(|e| anyhow::anyhow!("Failed to print report: {e}"))?;
    }

    Ok(())
}

fn print_summary(reports: &[FileAnalysis]) {
    let with_errors = reports.iter().filter(|r| r.has_syntax_errors()).count();
    let failed = reports
        .iter()
        .flat_map(|r| &r.findings)
        .filter(|f| f.status == FindingStatus::Failed)
        .count();
    let warnings = reports
        .iter()
        .flat_map(|r| &r.findings)
        .filter(|f| f.status == FindingStatus::Warning)
        .count();

    println!();
    if with_errors == 0 && failed == 0 {
        println!(
            "{} {} file(s) analyzed, no failures ({} warning(s))",
            "✓".green(),
            reports.len(),
            warnings
        );
    } else {
        println!(
            "{} {} file(s) analyzed: {} with syntax errors, {} failed finding(s), {} warning(s)",
            "✗".red(),
            reports.len(),
            with_errors,
            failed,
            warnings
        );
    }
}
