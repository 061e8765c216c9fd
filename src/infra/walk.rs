//! Gitignore-aware file walker tuned for submission folders.
//! - Respects .gitignore, .git/info/exclude, and global gitignore
//! - Extra ignore globs (early prune + late filter)
//! - Optional case-insensitive extension filter (".java", ".zip" show up
//!   with every capitalization in student uploads)
//! - Optional max depth
//! - Deterministic ordering for stable tests/CI
//!
//! Backed by ripgrep's `ignore` crate and `globset`.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use anyhow::Result;
use globset::{Glob, GlobSet, GlobSetBuilder};
use ignore::{DirEntry, WalkBuilder};

/// Gitignore-aware walker with extra ignore globs and filters.
/// Extra globs are applied in two places:
///   1) Early: prune directories during traversal (filter_entry).
///   2) Late: filter out files that still slipped through.
pub struct FileWalker {
    /// Compiled set of additional ignore patterns
    ignore_patterns: GlobSet,

    /// Lowercased extension filter (without dot), e.g. ["java"]
    extensions: Vec<String>,

    /// Maximum recursion depth; default None (unbounded)
    max_depth: Option<usize>,
}

impl FileWalker {
    /// Build a walker with additional ignore patterns (e.g. "target/**",
    /// "extracted/**"). Patterns match on (relative) paths.
    pub fn new(additional_ignores: &[String]) -> Result<Self> {
        let mut builder = GlobSetBuilder::new();

        for pattern in additional_ignores {
            builder.add(Glob::new(pattern)?);
        }

        Ok(Self {
            ignore_patterns: builder.build()?,
            extensions: Vec::new(),
            max_depth: None,
        })
    }

    /// Keep only files with one of these extensions (case-insensitive,
    /// no leading dot). Empty list means all files.
    pub fn with_extensions(mut self, exts: &[&str]) -> Self {
        self.extensions = exts.iter().map(|e| e.to_ascii_lowercase()).collect();
        self
    }

    /// Limit recursion depth (`None` = unbounded).
    pub fn with_max_depth(mut self, depth: Option<usize>) -> Self {
        self.max_depth = depth;
        self
    }

    fn extension_matches(&self, path: &Path) -> bool {
        if self.extensions.is_empty() {
            return true;
        }
        path.extension()
            .and_then(OsStr::to_str)
            .map(|e| e.to_ascii_lowercase())
            .is_some_and(|e| self.extensions.contains(&e))
    }

    /// Internal: construct a configured WalkBuilder for `root`.
    fn build_walk(&self, root: &Path) -> WalkBuilder {
        let mut b = WalkBuilder::new(root);

        // Include dotfiles; ignore rules still apply
        b.hidden(false);

        // Respect .ignore/.gitignore/.git/info/exclude and global gitignore
        b.git_ignore(true);
        b.git_global(true);
        b.git_exclude(true);

        b.max_depth(self.max_depth);

        // Early directory pruning using extra ignores (fast short-circuit).
        let extra = self.ignore_patterns.clone();
        b.filter_entry(move |ent: &DirEntry| {
            let is_dir = ent.file_type().map(|ft| ft.is_dir()).unwrap_or(false);

            if is_dir && extra.is_match(ent.path()) {
                return false;
            }
            true
        });

        b
    }

    /// Traverse files under `root`, respecting ignore rules, extra globs,
    /// and the extension filter. Returns a **sorted** list for determinism.
    pub fn walk_files<P: AsRef<Path>>(&self, root: P) -> Vec<PathBuf> {
        let root_path = root.as_ref();
        let walker = self.build_walk(root_path).build();

        let mut out: Vec<PathBuf> = walker
            // Drop entries with IO errors (could be collected/logged later)
            .filter_map(|res| res.ok())
            // Keep only regular files
            .filter(|entry| entry.file_type().is_some_and(|ft| ft.is_file()))
            .map(|entry| entry.into_path())
            // Late file-level extra ignore filtering using RELATIVE path
            .filter(|abs| {
                let rel = abs.strip_prefix(root_path).unwrap_or(abs);
                !self.ignore_patterns.is_match(rel)
            })
            .filter(|abs| self.extension_matches(abs))
            .collect();

        // Deterministic order (stable CLI & tests)
        out.sort();

        out
    }
}
