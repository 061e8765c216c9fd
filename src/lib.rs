//! **teachassist** - Fast CLI for checking and grading student Java submissions
//!
//! Detects submission archives, extracts them safely, locates Java
//! sources, analyzes them with tree-sitter against exercise rules, and
//! scores assessments.

/// Command-line interface with clap integration
pub mod cli;

/// Shell completion generation
pub mod completion;

/// Core processing pipeline - submission handling, analysis and grading
pub mod core {
    /// Detection of student submission ZIP archives
    pub mod detect;
    pub use self::detect::{SubmissionZip, run as detect_run};

    /// Safe archive extraction into per-student folders
    pub mod extract;
    pub use self::extract::{ArchiveExtractor, run as extract_run};

    /// Java source location inside extracted submissions
    pub mod locate;
    pub use self::locate::run as locate_run;

    /// Exercise analysis: syntax issues + rule findings per file
    pub mod analyze;
    pub use self::analyze::{CodeAnalyzer, FileAnalysis, Finding, FindingStatus, run as analyze_run};

    /// Exercise rule engine over parsed symbols
    pub mod rules;
    pub use self::rules::RuleEngine;

    /// Assessment scoring across submissions
    pub mod assess;
    pub use self::assess::run as assess_run;
}

/// Language processing - tree-sitter parsing of Java sources
pub mod parsers {
    /// Java parse tree views: syntax issues, symbols, scope defects
    pub mod java_parser;
    pub use self::java_parser::{JavaParser, SourceAnalysis, SyntaxIssue};
}

/// Infrastructure - Configuration, I/O, and utilities
pub mod infra {
    /// Tool config (TOML) plus exercise/assessment JSON loaders
    pub mod config;
    pub use self::config::{Config, ExerciseConfig, load_config, load_exercise_config};

    /// Memory-mapped file I/O for large files (>1MB threshold)
    pub mod io;
    pub use self::io::{FileContent, read_file_smart};

    /// CRLF/LF-robust line indexing for diagnostic positions
    pub mod line_index;
    pub use self::line_index::NewlineIndex;

    /// Gitignore-aware directory walking with extension filters
    pub mod walk;
    pub use self::walk::FileWalker;
}

// Strategic re-exports for clean CLI interface
pub use cli::{AppContext, Cli, Commands};
pub use crate::core::{analyze_run, assess_run, detect_run, extract_run, locate_run};
pub use infra::{Config, FileWalker, load_config};
pub use parsers::{JavaParser, SourceAnalysis};

// Core types for external consumers
pub use crate::core::{CodeAnalyzer, FileAnalysis, Finding, FindingStatus};
