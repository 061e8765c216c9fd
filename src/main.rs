use anyhow::Result;
use clap::Parser;
use teachassist::cli::{AppContext, Cli, Commands};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    // Logging is opt-in via TEACHASSIST_LOG (e.g. "debug")
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("TEACHASSIST_LOG").unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    // Build a context once, pass everywhere
    let ctx = AppContext {
        quiet: cli.quiet,
        no_color: cli.no_color,
        dry_run: cli.dry_run,
    };

    match cli.command {
        Commands::Detect(args) => teachassist::detect_run(args, &ctx),
        Commands::Extract(args) => teachassist::extract_run(args, &ctx),
        Commands::Locate(args) => teachassist::locate_run(args, &ctx),
        Commands::Analyze(args) => teachassist::analyze_run(args, &ctx),
        Commands::Assess(args) => teachassist::assess_run(args, &ctx),
        Commands::Init(args) => teachassist::infra::config::init(args, &ctx),
        Commands::Completions(args) => teachassist::completion::run(args),
    }
}
