use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand};
use iscc_eval::logging::init_tracing;
use iscc_eval::{
    Bits, EvalConfig, PerceptualMode, QueryFailurePolicy, SettingsFile, clear_cache,
    run_match_benchmark,
};

#[derive(Debug, Parser)]
#[command(name = "iscc-eval", version, about = "ISCC matching-accuracy evaluation")]
struct Cli {
    /// Raise log verbosity (-v debug, -vv trace).
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Evaluate matching accuracy on a labeled corpus.
    Match(MatchArgs),
    /// Manage cached ground truth.
    Cache {
        #[command(subcommand)]
        action: CacheCommand,
    },
    /// Show or change persistent settings.
    Config {
        #[command(subcommand)]
        action: ConfigCommand,
    },
}

#[derive(Debug, Args)]
struct MatchArgs {
    /// Corpus root: one sub-directory per cluster, loose files are distractors.
    path: PathBuf,
    /// Maximum bit distance for a match (inclusive).
    #[arg(short, long)]
    threshold: Option<u32>,
    /// Fingerprint size: 64, 128 or 256.
    #[arg(short, long)]
    bits: Option<Bits>,
    /// Perceptual mode; detected from the corpus when omitted.
    #[arg(short, long)]
    mode: Option<PerceptualMode>,
    /// drop-cluster or promote-next.
    #[arg(long)]
    policy: Option<QueryFailurePolicy>,
    /// Match queries in parallel.
    #[arg(long)]
    parallel: bool,
    /// Configuration file (YAML, JSON or TOML).
    #[arg(long)]
    config: Option<PathBuf>,
    /// Print the full report as JSON.
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Subcommand)]
enum CacheCommand {
    /// Delete the cached ground truth of a corpus.
    Clear {
        path: PathBuf,
        #[arg(short, long, default_value_t = Bits::B64)]
        bits: Bits,
    },
}

#[derive(Debug, Subcommand)]
enum ConfigCommand {
    /// Show current settings.
    Show,
    /// Set a single setting.
    Set { key: String, value: String },
    /// Reset settings to defaults.
    Reset,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let settings_file = SettingsFile::default_location()?;

    match cli.command {
        Commands::Match(args) => {
            let mut cfg = EvalConfig::load(args.config.as_deref())?;
            setup_logging(&cfg.log_level, cli.verbose, cli.json_logs)?;
            apply_overrides(&mut cfg, &args);
            if cfg.data_dir.is_none() {
                cfg.data_dir = Some(settings_file.load_or_default().data_dir);
            }

            println!(
                "ISCC Matching Benchmark - {} - Threshold {}",
                args.path.display(),
                cfg.threshold
            );
            let report = run_match_benchmark(&args.path, &cfg)
                .with_context(|| format!("benchmark failed for {}", args.path.display()))?;
            if args.json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!(
                    "{} {}-bit, {} queries against {} samples (cache {})",
                    report.code_type,
                    report.bits,
                    report.queries,
                    report.samples,
                    if report.cache_hit { "hit" } else { "miss" }
                );
                println!("{report}");
            }
        }
        Commands::Cache {
            action: CacheCommand::Clear { path, bits },
        } => {
            setup_logging("info", cli.verbose, cli.json_logs)?;
            let cfg = EvalConfig {
                data_dir: Some(settings_file.load_or_default().data_dir),
                ..EvalConfig::default()
            };
            if clear_cache(&path, bits, &cfg)? {
                println!("Removed cached ground truth for {}", path.display());
            } else {
                println!("No cached ground truth for {}", path.display());
            }
        }
        Commands::Config { action } => {
            setup_logging("warn", cli.verbose, cli.json_logs)?;
            match action {
                ConfigCommand::Show => print_settings(&settings_file.load_or_default()),
                ConfigCommand::Set { key, value } => {
                    let settings = settings_file.set(&key, &value)?;
                    println!("\nNew Settings:\n");
                    print_settings(&settings);
                }
                ConfigCommand::Reset => {
                    println!("Deleting {}", settings_file.path().display());
                    settings_file.reset()?;
                }
            }
        }
    }
    Ok(())
}

fn setup_logging(level: &str, verbose: u8, json: bool) -> Result<()> {
    init_tracing(level, verbose, json)
        .map_err(|e| anyhow::anyhow!("failed to initialise logging: {e}"))
}

fn apply_overrides(cfg: &mut EvalConfig, args: &MatchArgs) {
    if let Some(threshold) = args.threshold {
        cfg.threshold = threshold;
    }
    if let Some(bits) = args.bits {
        cfg.bits = bits;
    }
    if let Some(mode) = args.mode {
        cfg.mode = Some(mode);
    }
    if let Some(policy) = args.policy {
        cfg.policy = policy;
    }
    if args.parallel {
        cfg.parallel = true;
    }
}

fn print_settings(settings: &iscc_eval::Settings) {
    for (key, value) in settings.entries() {
        println!("{key} = {value}");
    }
}
