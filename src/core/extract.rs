//! Submission archive extraction.
//!
//! Each student ZIP unpacks into `<output_dir>/<student>/`. A previous
//! extraction for the same student is removed first so re-runs always
//! reflect the current archive. Entries whose paths would escape the
//! target directory are rejected (zip-slip).

use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use indexmap::IndexMap;
use indicatif::{ProgressBar, ProgressStyle};
use owo_colors::OwoColorize;
use tracing::{debug, warn};
use zip::ZipArchive;

use crate::cli::{AppContext, ExtractArgs};
use crate::core::detect::{SubmissionZip, detect_zip_files};
use crate::infra::config::load_config;

pub struct ArchiveExtractor {
    /// Root under which per-student directories are created
    output_dir: PathBuf,
}

impl ArchiveExtractor {
    pub fn new<P: Into<PathBuf>>(output_dir: P) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    /// Unpack one archive into `<output_dir>/<student>/` and return that
    /// directory.
    pub fn extract_zip(&self, zip_path: &Path) -> Result<PathBuf> {
        let student = zip_path
            .file_stem()
            .map(|n| n.to_string_lossy().to_string())
            .ok_or_else(|| anyhow::anyhow!("Archive has no file name: {}", zip_path.display()))?;

        let target = self.output_dir.join(&student);

        // Start from a clean slate for this student
        if target.exists() {
            std::fs::remove_dir_all(&target)
                .with_context(|| format!("removing previous extraction {}", target.display()))?;
        }
        std::fs::create_dir_all(&target)
            .with_context(|| format!("creating extraction dir {}", target.display()))?;

        let file = File::open(zip_path)
            .with_context(|| format!("opening archive {}", zip_path.display()))?;
        let mut archive = ZipArchive::new(file)
            .with_context(|| format!("reading archive {}", zip_path.display()))?;

        for i in 0..archive.len() {
            let mut entry = archive
                .by_index(i)
                .with_context(|| format!("reading entry {i} of {}", zip_path.display()))?;

            // enclosed_name() is None for entries that traverse outside
            // the archive root.
            let Some(rel) = entry.enclosed_name() else {
                warn!(
                    archive = %zip_path.display(),
                    entry = entry.name(),
                    "skipping entry with unsafe path"
                );
                continue;
            };
            let dest = target.join(rel);

            if entry.is_dir() {
                std::fs::create_dir_all(&dest)?;
                continue;
            }

            if let Some(parent) = dest.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let mut out = File::create(&dest)
                .with_context(|| format!("creating {}", dest.display()))?;
            io::copy(&mut entry, &mut out)
                .with_context(|| format!("writing {}", dest.display()))?;
        }

        debug!(archive = %zip_path.display(), target = %target.display(), "extracted");
        Ok(target)
    }

    /// Unpack several archives; failures are reported per archive and do
    /// not abort the rest. Returns archive path → extraction directory in
    /// input order.
    pub fn extract_all(
        &self,
        zips: &[SubmissionZip],
        progress: &ProgressBar,
    ) -> IndexMap<PathBuf, PathBuf> {
        let mut results = IndexMap::new();

        for sub in zips {
            progress.set_message(format!("Extracting {}", sub.student_name));
            match self.extract_zip(&sub.file_path) {
                Ok(dir) => {
                    results.insert(sub.file_path.clone(), dir);
                }
                Err(err) => {
                    warn!(
                        archive = %sub.file_path.display(),
                        error = %err,
                        "extraction failed"
                    );
                    eprintln!(
                        "{} Failed to extract {}: {err:#}",
                        "✗".red(),
                        sub.file_name
                    );
                }
            }
            progress.inc(1);
        }

        results
    }
}

pub fn run(args: ExtractArgs, ctx: &AppContext) -> Result<()> {
    let config = load_config().unwrap_or_default();

    let output_dir = args
        .output_dir
        .unwrap_or_else(|| PathBuf::from(&config.extract.output_dir));

    let submissions = detect_zip_files(&args.path, &config.ignore_patterns)
        .with_context(|| format!("detecting submissions under {}", args.path.display()))?;

    if submissions.is_empty() {
        if !ctx.quiet {
            println!("{}", "No ZIP archives to extract.".yellow());
        }
        return Ok(());
    }

    if ctx.dry_run {
        if !ctx.quiet {
            println!("{}", "DRY RUN: Would extract:".yellow());
            for sub in &submissions {
                println!(
                    "  {} -> {}",
                    sub.file_path.display(),
                    output_dir.join(&sub.student_name).display()
                );
            }
        }
        return Ok(());
    }

    let progress = if ctx.quiet {
        ProgressBar::hidden()
    } else {
        let pb = ProgressBar::new(submissions.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template(
                    "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}",
                )
                .unwrap()
                .progress_chars("#>-"),
        );
        pb
    };

    let extractor = ArchiveExtractor::new(&output_dir);
    let extracted = extractor.extract_all(&submissions, &progress);
    progress.finish_with_message("Extraction complete");

    if !ctx.quiet {
        println!(
            "{} Extracted {}/{} archive(s) into {}",
            "✓".green(),
            extracted.len(),
            submissions.len(),
            output_dir.display()
        );
    }

    Ok(())
}
