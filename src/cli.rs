use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Shared application context for global flags
#[derive(Clone, Debug)]
pub struct AppContext {
    pub quiet: bool,    // global --quiet
    pub no_color: bool, // global --no-color
    pub dry_run: bool,  // global --dry-run
}

#[derive(Parser)]
#[command(name = "teachassist")]
#[command(about = "A fast CLI for checking and grading student Java submissions")]
#[command(version, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Suppress progress bars and non-essential output
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Show what would be done without executing
    #[arg(long, global = true)]
    pub dry_run: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Detect student submission ZIP archives
    Detect(DetectArgs),

    /// Extract submission archives into per-student folders
    Extract(ExtractArgs),

    /// Locate Java files inside extracted submissions
    Locate(LocateArgs),

    /// Analyze Java sources against an exercise configuration
    Analyze(AnalyzeArgs),

    /// Score an assessment across all submissions
    Assess(AssessArgs),

    /// Initialize a teachassist.toml config file
    Init(InitArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(Parser)]
pub struct DetectArgs {
    /// Folder containing student submissions
    #[arg(default_value = ".")]
    pub path: PathBuf,

    /// Emit JSON output (single line)
    #[arg(long)]
    pub json: bool,
}

#[derive(Parser)]
pub struct ExtractArgs {
    /// Folder containing student ZIP archives
    #[arg(default_value = ".")]
    pub path: PathBuf,

    /// Directory to extract into (default from config: "extracted")
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,
}

#[derive(Parser)]
pub struct LocateArgs {
    /// Extraction root holding one directory per student
    #[arg(default_value = "extracted")]
    pub path: PathBuf,

    /// Emit JSON output (single line)
    #[arg(long)]
    pub json: bool,
}

#[derive(Parser, Debug)]
pub struct AnalyzeArgs {
    /// Files or directories to analyze
    #[arg(value_name = "TARGET", required = true)]
    pub targets: Vec<PathBuf>,

    /// Exercise id whose rules apply (syntax-only when omitted)
    #[arg(short, long)]
    pub exercise: Option<String>,

    /// Directory holding exercises/ and assessments/ configs
    #[arg(long)]
    pub config_dir: Option<PathBuf>,

    /// Report file path
    #[arg(short, long, default_value = "analysis.json")]
    pub output: PathBuf,

    /// Emit JSON to stdout instead of human-readable text
    #[arg(long)]
    pub json: bool,
}

#[derive(Parser, Debug)]
pub struct AssessArgs {
    /// Assessment id to score
    pub assessment: String,

    /// Extraction root holding one directory per student
    #[arg(short, long, default_value = "extracted")]
    pub submissions: PathBuf,

    /// Directory holding exercises/ and assessments/ configs
    #[arg(long)]
    pub config_dir: Option<PathBuf>,

    /// Write results JSON to this file
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Emit JSON to stdout instead of a table
    #[arg(long)]
    pub json: bool,
}

#[derive(Parser)]
pub struct InitArgs {
    /// Directory to initialize config in
    #[arg(default_value = ".")]
    pub path: PathBuf,

    /// Overwrite existing config file
    #[arg(long)]
    pub force: bool,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
    Elvish,
}

#[derive(Parser)]
pub struct CompletionsArgs {
    /// Target shell
    #[arg(value_enum)]
    pub shell: Shell,

    /// Output directory; if omitted and --stdout not set, prints error
    #[arg(long)]
    pub out_dir: Option<PathBuf>,

    /// Print completion script to stdout instead of a file
    #[arg(long)]
    pub stdout: bool,
}
