//! Locating Java sources inside extracted submissions.
//!
//! Maps each extraction directory (one per student) to the sorted list
//! of `.java` files it contains. Submissions without any Java file are
//! kept in the map with an empty list so the caller can warn about them.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use indexmap::IndexMap;
use owo_colors::OwoColorize;
use serde::Serialize;
use tracing::debug;

use crate::cli::{AppContext, LocateArgs};
use crate::infra::walk::FileWalker;

/// Java files found for one student directory.
#[derive(Debug, Serialize)]
pub struct LocatedSubmission {
    pub student_name: String,
    pub files: Vec<PathBuf>,
}

/// Find all `.java` files under one extraction directory (recursive,
/// case-insensitive extension).
pub fn find_java_files(extract_dir: &Path) -> Result<Vec<PathBuf>> {
    let walker = FileWalker::new(&[])?.with_extensions(&["java"]);
    Ok(walker.walk_files(extract_dir))
}

/// Map every immediate child directory of `extracted_root` (one per
/// student) to its Java files, in sorted student order.
pub fn locate_all_java_files(extracted_root: &Path) -> Result<IndexMap<String, Vec<PathBuf>>> {
    if !extracted_root.is_dir() {
        anyhow::bail!(
            "Extraction root does not exist: {}",
            extracted_root.display()
        );
    }

    let mut students: Vec<PathBuf> = std::fs::read_dir(extracted_root)
        .with_context(|| format!("listing {}", extracted_root.display()))?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_dir())
        .collect();
    students.sort();

    let mut results = IndexMap::new();
    for dir in students {
        let name = dir
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let files = find_java_files(&dir)?;
        debug!(student = %name, count = files.len(), "located java files");
        results.insert(name, files);
    }

    Ok(results)
}

pub fn run(args: LocateArgs, ctx: &AppContext) -> Result<()> {
    let located = locate_all_java_files(&args.path)?;

    if args.json {
        let records: Vec<LocatedSubmission> = located
            .iter()
            .map(|(name, files)| LocatedSubmission {
                student_name: name.clone(),
                files: files.clone(),
            })
            .collect();
        println!("{}", serde_json::to_string(&records)?);
        return Ok(());
    }

    let mut total = 0usize;
    let mut empty = 0usize;

    for (student, files) in &located {
        total += files.len();
        if files.is_empty() {
            empty += 1;
            if !ctx.quiet {
                println!("  {} {}", student.cyan(), "no Java files".yellow());
            }
        } else if !ctx.quiet {
            println!("  {} {} file(s)", student.cyan(), files.len());
            for f in files {
                println!("    {}", f.display());
            }
        }
    }

    if !ctx.quiet {
        if empty > 0 {
            println!(
                "{} {} Java file(s) in {} submission(s); {} submission(s) contain none",
                "!".yellow(),
                total,
                located.len(),
                empty
            );
        } else {
            println!(
                "{} {} Java file(s) in {} submission(s)",
                "✓".green(),
                total,
                located.len()
            );
        }
    }

    Ok(())
}
