//! Detection of student submission archives.
//!
//! Every `*.zip` under the chosen folder is treated as one student's
//! submission; the student name is the archive file stem and the
//! submission date is the file's modification time.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use owo_colors::OwoColorize;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::cli::{AppContext, DetectArgs};
use crate::infra::config::load_config;
use crate::infra::walk::FileWalker;

/// One detected student archive.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SubmissionZip {
    pub student_name: String,
    pub file_path: PathBuf,
    pub file_name: String,
    /// File modification time; None when the filesystem won't say
    pub submitted_at: Option<DateTime<Utc>>,
}

/// Find all ZIP archives under `folder`, sorted by path.
pub fn detect_zip_files(folder: &Path, extra_ignores: &[String]) -> Result<Vec<SubmissionZip>> {
    if !folder.is_dir() {
        anyhow::bail!("Folder does not exist: {}", folder.display());
    }

    let walker = FileWalker::new(extra_ignores)?.with_extensions(&["zip"]);

    let mut out = Vec::new();
    for path in walker.walk_files(folder) {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();

        // Strip the extension case-insensitively ("A.ZIP" → "A")
        let student_name = path
            .file_stem()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| file_name.clone());

        let submitted_at = std::fs::metadata(&path)
            .and_then(|m| m.modified())
            .ok()
            .map(DateTime::<Utc>::from);

        debug!(student = %student_name, path = %path.display(), "detected submission");

        out.push(SubmissionZip {
            student_name,
            file_path: path,
            file_name,
            submitted_at,
        });
    }

    Ok(out)
}

pub fn run(args: DetectArgs, ctx: &AppContext) -> Result<()> {
    let config = load_config().unwrap_or_default();

    if ctx.dry_run {
        if !ctx.quiet {
            println!("{}", "DRY RUN: Would scan:".yellow());
            println!("  Root: {}", args.path.display());
        }
        return Ok(());
    }

    let submissions = detect_zip_files(&args.path, &config.ignore_patterns)
        .with_context(|| format!("detecting submissions under {}", args.path.display()))?;

    if args.json {
        println!("{}", serde_json::to_string(&submissions)?);
        return Ok(());
    }

    if submissions.is_empty() {
        if !ctx.quiet {
            println!(
                "{}",
                "No ZIP archives found in the working folder.".yellow()
            );
        }
        return Ok(());
    }

    if !ctx.quiet {
        for sub in &submissions {
            let date = sub
                .submitted_at
                .map(|d| d.format("%Y-%m-%d %H:%M").to_string())
                .unwrap_or_else(|| "unknown date".to_string());
            println!(
                "  {} ({}) — {}",
                sub.student_name.cyan(),
                date,
                sub.file_path.display()
            );
        }
        println!("{} {} archive(s) found", "✓".green(), submissions.len());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn detects_zips_with_student_names() -> Result<()> {
        let tmp = TempDir::new()?;
        fs::write(tmp.path().join("alice.zip"), b"PK")?;
        fs::write(tmp.path().join("bob.ZIP"), b"PK")?;
        fs::write(tmp.path().join("notes.txt"), b"x")?;

        let mut subs = detect_zip_files(tmp.path(), &[])?;
        subs.sort_by(|a, b| a.student_name.cmp(&b.student_name));

        assert_eq!(subs.len(), 2);
        assert_eq!(subs[0].student_name, "alice");
        assert_eq!(subs[1].student_name, "bob");
        assert!(subs[0].submitted_at.is_some());
        Ok(())
    }

    #[test]
    fn missing_folder_is_an_error() {
        let err = detect_zip_files(Path::new("no/such/folder"), &[]).unwrap_err();
        assert!(err.to_string().contains("does not exist"));
    }

    #[test]
    fn nested_archives_are_found() -> Result<()> {
        let tmp = TempDir::new()?;
        fs::create_dir_all(tmp.path().join("late"))?;
        fs::write(tmp.path().join("late/carol.zip"), b"PK")?;

        let subs = detect_zip_files(tmp.path(), &[])?;
        assert_eq!(subs.len(), 1);
        assert_eq!(subs[0].student_name, "carol");
        Ok(())
    }
}
