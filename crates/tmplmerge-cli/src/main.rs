mod prompt;
mod report;

use clap::{Parser, Subcommand, ValueEnum};
use merge_engine::{
    check_pairs, detect_format, BatchReport, ConfigMerger, FilePair, MergeResult, MergerConfig,
    Outcome, ResolutionMode, Strategy,
};
use prompt::DialoguerHandler;
use report::RunReport;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tmplmerge_core::config::{Mapping, Settings};
use tmplmerge_core::logging::init_logging;
use tokio::sync::Semaphore;

#[derive(Parser)]
#[command(
    name = "tmplmerge",
    about = "Merge template configuration files into an existing project"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to the settings file
    #[arg(long, global = true, default_value = ".tmplmerge.json")]
    settings: PathBuf,

    /// How to settle conflicts when not prompting
    #[arg(long, global = true, value_enum)]
    strategy: Option<StrategyArg>,

    /// Ask about every conflict
    #[arg(long, global = true)]
    interactive: bool,

    /// Overwrite targets with the templates without merging
    #[arg(long, global = true)]
    force: bool,

    /// Show what would change without writing anything
    #[arg(long, global = true)]
    dry_run: bool,

    /// Pairs merged at once in non-interactive mode
    #[arg(long, global = true)]
    jobs: Option<usize>,

    /// Write a JSON report of the run to this path
    #[arg(long, global = true)]
    report: Option<PathBuf>,

    /// Directory for tmplmerge.log
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Merge one template into one target
    Merge {
        /// Template file
        source: PathBuf,
        /// Existing (or new) project file
        target: PathBuf,
    },
    /// Merge several pairs, from --map flags or the settings file
    Batch {
        /// A pair as SOURCE=TARGET; may be repeated
        #[arg(long = "map", value_parser = parse_mapping)]
        maps: Vec<FilePair>,
    },
    /// Print the detected format of each file
    Detect {
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },
    /// Run interactive setup wizard
    Setup,
}

#[derive(Clone, Copy, ValueEnum)]
enum StrategyArg {
    UseSource,
    UseTarget,
    Merge,
    Manual,
}

impl From<StrategyArg> for Strategy {
    fn from(arg: StrategyArg) -> Self {
        match arg {
            StrategyArg::UseSource => Strategy::UseSource,
            StrategyArg::UseTarget => Strategy::UseTarget,
            StrategyArg::Merge => Strategy::Merge,
            StrategyArg::Manual => Strategy::Manual,
        }
    }
}

fn parse_mapping(raw: &str) -> Result<FilePair, String> {
    match raw.split_once('=') {
        Some((source, target)) if !source.is_empty() && !target.is_empty() => {
            Ok(FilePair::new(source, target))
        }
        _ => Err(format!("expected SOURCE=TARGET, got `{}`", raw)),
    }
}

/// Effective run options: flags over the settings file over defaults.
struct RunOptions {
    strategy: Strategy,
    interactive: bool,
    force: bool,
    dry_run: bool,
    jobs: usize,
}

impl RunOptions {
    fn resolve(cli: &Cli, settings: &Settings) -> Self {
        Self {
            strategy: cli
                .strategy
                .map(Strategy::from)
                .unwrap_or(settings.merge.strategy),
            interactive: cli.interactive || settings.merge.interactive,
            force: cli.force || settings.merge.force,
            dry_run: cli.dry_run || settings.merge.dry_run,
            jobs: cli.jobs.unwrap_or(settings.merge.jobs).max(1),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match &cli.command {
        Commands::Merge { source, target } => {
            cmd_run(&cli, vec![FilePair::new(source, target)]).await
        }
        Commands::Batch { maps } => cmd_batch(&cli, maps).await,
        Commands::Detect { paths } => cmd_detect(paths),
        Commands::Setup => cmd_setup(&cli).await,
    }
}

async fn cmd_batch(cli: &Cli, maps: &[FilePair]) -> anyhow::Result<()> {
    let pairs = if maps.is_empty() {
        Settings::load_or_default(&cli.settings)?.pairs()
    } else {
        maps.to_vec()
    };
    if pairs.is_empty() {
        eprintln!(
            "No pairs to merge. Pass --map SOURCE=TARGET or add mappings to {}.",
            cli.settings.display()
        );
        std::process::exit(1);
    }
    cmd_run(cli, pairs).await
}

async fn cmd_run(cli: &Cli, pairs: Vec<FilePair>) -> anyhow::Result<()> {
    let settings = Settings::load_or_default(&cli.settings)?;
    let opts = RunOptions::resolve(cli, &settings);
    let log_dir = cli.log_dir.clone().unwrap_or(settings.logging.dir.clone());
    let guard = init_logging(&log_dir, &settings.logging.filter)?;

    check_pairs(&pairs)?;
    tracing::info!(
        pairs = pairs.len(),
        strategy = %opts.strategy,
        interactive = opts.interactive,
        dry_run = opts.dry_run,
        "starting merge run"
    );

    let cancel = Arc::new(AtomicBool::new(false));
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                eprintln!("Interrupted; finishing the current file and stopping.");
                cancel.store(true, Ordering::SeqCst);
            }
        });
    }

    let merger = Arc::new(ConfigMerger::new(MergerConfig {
        force_overwrite: opts.force,
        dry_run: opts.dry_run,
    }));

    let report = if opts.interactive && !opts.force {
        let merger = merger.clone();
        let cancel = cancel.clone();
        tokio::task::spawn_blocking(move || {
            let mut handler = DialoguerHandler::new();
            merger.merge_batch_until(&pairs, &mut ResolutionMode::Interactive(&mut handler), &cancel)
        })
        .await??
    } else {
        run_concurrent(merger, pairs, opts.strategy, opts.jobs, cancel).await?
    };

    print_report(&report, opts.dry_run);

    if let Some(path) = &cli.report {
        RunReport::new(&report, opts.dry_run).write(path)?;
        println!("Report written to {}", path.display());
    }

    if report.has_failures() {
        tracing::warn!(failed = report.summary().failed, "merge run finished with failures");
        drop(guard);
        std::process::exit(1);
    }
    tracing::info!("merge run finished");
    Ok(())
}

/// Merge pairs on the blocking pool, at most `jobs` at a time. Results keep
/// input order. Pairs not started when the cancel flag is set are dropped.
async fn run_concurrent(
    merger: Arc<ConfigMerger>,
    pairs: Vec<FilePair>,
    strategy: Strategy,
    jobs: usize,
    cancel: Arc<AtomicBool>,
) -> anyhow::Result<BatchReport> {
    let total = pairs.len();
    let limit = Arc::new(Semaphore::new(jobs));
    let mut handles = Vec::with_capacity(total);

    for pair in pairs {
        let permit = limit.clone().acquire_owned().await?;
        if cancel.load(Ordering::SeqCst) {
            break;
        }
        let merger = merger.clone();
        handles.push(tokio::task::spawn_blocking(move || {
            let _permit = permit;
            merger.merge_one(&pair.source, &pair.target, &mut ResolutionMode::Force(strategy))
        }));
    }

    let mut report = BatchReport {
        results: Vec::with_capacity(handles.len()),
        cancelled: handles.len() < total,
    };
    for handle in handles {
        report.results.push(handle.await?);
    }
    if report.cancelled {
        tracing::warn!(
            remaining = total - report.results.len(),
            "batch cancelled"
        );
    }
    Ok(report)
}

fn print_report(report: &BatchReport, dry_run: bool) {
    println!();
    for result in &report.results {
        println!("{}", describe(result));
        for conflict in result.deferred_conflicts() {
            println!(
                "    {}: template {} / existing {}",
                conflict.path_display(),
                conflict.source,
                conflict.target
            );
        }
    }

    let summary = report.summary();
    println!();
    println!(
        "{}{} written, {} skipped, {} failed, {} conflicts",
        if dry_run { "[dry run] " } else { "" },
        summary.written,
        summary.skipped,
        summary.failed,
        summary.conflicts
    );
    if report.cancelled {
        println!("Run was interrupted; remaining pairs were not touched.");
    }
}

fn describe(result: &MergeResult) -> String {
    let target = result.target.display();
    let format = result.format.map(|f| f.name()).unwrap_or("-");
    let detail = match result.outcome {
        Outcome::Written if result.conflicts.is_empty() => String::new(),
        Outcome::Written => format!(" ({} conflicts resolved)", result.conflicts.len()),
        Outcome::Skipped => result
            .skip_reason
            .map(|reason| format!(" ({})", reason))
            .unwrap_or_default(),
        Outcome::Failed => result
            .error
            .as_ref()
            .map(|e| format!(": {}", e))
            .unwrap_or_default(),
    };
    format!("  {:<8} {:<7} {}{}", result.outcome, format, target, detail)
}

fn cmd_detect(paths: &[PathBuf]) -> anyhow::Result<()> {
    for path in paths {
        let content = std::fs::read(path).ok();
        let format = detect_format(path, content.as_deref());
        println!("{:<7} {}", format, path.display());
    }
    Ok(())
}

async fn cmd_setup(cli: &Cli) -> anyhow::Result<()> {
    let mut settings = Settings::load_or_default(&cli.settings)?;

    println!();
    println!("tmplmerge - Setup Wizard");
    println!("========================");
    println!();

    let strategies = [
        Strategy::Merge,
        Strategy::UseSource,
        Strategy::UseTarget,
        Strategy::Manual,
    ];
    let labels = [
        "MERGE (combine both, template wins on conflicts)",
        "USE_SOURCE (template wins)",
        "USE_TARGET (existing files win)",
        "MANUAL (never change conflicting files)",
    ];
    let current = strategies
        .iter()
        .position(|s| *s == settings.merge.strategy)
        .unwrap_or(0);
    let strategy_idx = dialoguer::Select::new()
        .with_prompt("Default conflict strategy")
        .items(&labels)
        .default(current)
        .interact()?;
    settings.merge.strategy = strategies[strategy_idx];

    settings.merge.interactive = dialoguer::Confirm::new()
        .with_prompt("Ask about each conflict interactively?")
        .default(settings.merge.interactive)
        .interact()?;

    settings.merge.jobs = dialoguer::Input::new()
        .with_prompt("Files merged at once")
        .default(settings.merge.jobs)
        .interact_text()?;

    println!();
    println!("Template mappings (SOURCE=TARGET, empty line to finish):");
    for mapping in &settings.mappings {
        println!("  {} -> {}", mapping.source.display(), mapping.target.display());
    }
    loop {
        let line: String = dialoguer::Input::new()
            .with_prompt("Mapping")
            .allow_empty(true)
            .interact_text()?;
        if line.trim().is_empty() {
            break;
        }
        match parse_mapping(line.trim()) {
            Ok(pair) => settings.mappings.push(Mapping {
                source: pair.source,
                target: pair.target,
            }),
            Err(e) => eprintln!("  {}", e),
        }
    }

    settings.save(&cli.settings)?;

    println!();
    println!("Configuration saved to {}", cli.settings.display());
    println!();
    println!("Run with: tmplmerge batch");
    println!();

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_mapping() {
        assert_eq!(
            parse_mapping("templates/.env=.env").unwrap(),
            FilePair::new("templates/.env", ".env")
        );
        assert!(parse_mapping("no-separator").is_err());
        assert!(parse_mapping("=target").is_err());
    }

    #[test]
    fn test_flags_override_settings() {
        let cli = Cli::parse_from([
            "tmplmerge",
            "--strategy",
            "use-target",
            "--jobs",
            "0",
            "batch",
            "--map",
            "a.json=b.json",
        ]);
        let mut settings = Settings::default();
        settings.merge.strategy = Strategy::UseSource;
        settings.merge.dry_run = true;

        let opts = RunOptions::resolve(&cli, &settings);
        assert_eq!(opts.strategy, Strategy::UseTarget);
        assert!(opts.dry_run);
        assert!(!opts.interactive);
        assert_eq!(opts.jobs, 1);
    }
}
