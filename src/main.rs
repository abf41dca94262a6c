//! # archlens CLI
//!
//! Inspects how a repository would be chunked and manages the analysis cache.
//! No command calls a text-generation backend.
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `archlens plan <dir>` | Print the chunk plan for a directory |
//! | `archlens boundaries <file>` | Print the structural boundaries of one file |
//! | `archlens rank <dir>` | Print file buckets and importance scores |
//! | `archlens cache stats` | Entry counts per cache namespace |
//! | `archlens cache purge-expired` | Delete entries older than the TTL |
//! | `archlens cache clear` | Delete every entry |

use anyhow::{Context, Result};
use archlens::cache::{AnalysisCache, CacheNamespace};
use archlens::chunking::{ChunkPlanner, ImportanceRanker, detect_boundaries};
use archlens::config::Config;
use archlens::error::ValidationError;
use archlens::ingest::{SourceLoader, detect_language};
use archlens::types::ChunkPlan;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "archlens",
    about = "Token-budgeted chunking and response caching for repository architecture analysis",
    version = concat!(
        env!("CARGO_PKG_VERSION"),
        " (",
        env!("GIT_COMMIT_HASH"),
        ", built ",
        env!("BUILD_TIMESTAMP"),
        ")"
    )
)]
struct Cli {
    /// Path to a TOML configuration file; defaults to the platform config path
    #[arg(long, global = true, env = "ARCHLENS_CONFIG")]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the chunk plan for a directory
    Plan {
        dir: PathBuf,

        /// Override the per-chunk token budget
        #[arg(long)]
        max_tokens: Option<usize>,

        /// Print the plan as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the structural boundaries detected in one file
    Boundaries { file: PathBuf },

    /// Print file buckets and importance scores
    Rank { dir: PathBuf },

    /// Manage the analysis cache
    Cache {
        #[command(subcommand)]
        action: CacheCommand,
    },
}

#[derive(Subcommand, Clone, Copy)]
enum CacheCommand {
    /// Entry counts and size per namespace
    Stats {
        /// cobol, generic or repository; all namespaces when omitted
        #[arg(long)]
        namespace: Option<CacheNamespace>,
    },
    /// Delete expired and unreadable entries
    PurgeExpired {
        #[arg(long)]
        namespace: Option<CacheNamespace>,
    },
    /// Delete every entry
    Clear {
        #[arg(long)]
        namespace: Option<CacheNamespace>,
    },
}

impl CacheCommand {
    fn namespace(&self) -> Option<CacheNamespace> {
        match self {
            CacheCommand::Stats { namespace }
            | CacheCommand::PurgeExpired { namespace }
            | CacheCommand::Clear { namespace } => *namespace,
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    let mut config = match path {
        Some(path) => Config::from_file(path)?,
        None => Config::load_or_default()?,
    };
    config.apply_env_overrides();
    config.validate()?;
    Ok(config)
}

fn validate_dir(dir: &Path) -> Result<()> {
    if !dir.exists() {
        return Err(ValidationError::PathNotFound(dir.display().to_string()).into());
    }
    if !dir.is_dir() {
        return Err(ValidationError::NotADirectory(dir.display().to_string()).into());
    }
    Ok(())
}

fn print_plan(plan: &ChunkPlan) {
    println!(
        "Strategy: {} ({} chunks, {} tokens)",
        plan.strategy(),
        plan.len(),
        plan.total_tokens()
    );
    if let ChunkPlan::Structured(_, language) = plan {
        println!("Language: {}", language);
    }

    for chunk in plan.chunks() {
        println!();
        println!(
            "#{} {} [{} tokens]",
            chunk.sequence,
            chunk.banner(),
            chunk.token_count
        );
        for member in &chunk.members {
            print!("    {}:{}-{}", member.path, member.start_line, member.end_line);
            if member.overlap_lines > 0 {
                print!(" (overlap {})", member.overlap_lines);
            }
            println!();
        }
    }
}

fn plan(config: &Config, dir: &Path, max_tokens: Option<usize>, json: bool) -> Result<()> {
    validate_dir(dir)?;
    let mut config = config.clone();
    if let Some(max_tokens) = max_tokens {
        config.chunking.max_tokens = max_tokens;
        config.validate()?;
    }

    let files = SourceLoader::new(dir).with_config(config.ingest.clone()).load()?;
    let plan = ChunkPlanner::from_config(&config).plan(&files)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&plan)?);
    } else {
        print_plan(&plan);
    }
    Ok(())
}

fn boundaries(file: &Path) -> Result<()> {
    let content = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let language = detect_language(&file.to_string_lossy());
    let lines: Vec<&str> = content.lines().collect();
    let map = detect_boundaries(&lines, &language);

    println!("{} ({}): {} boundaries", file.display(), language, map.len());
    for boundary in map.iter() {
        println!(
            "{:>6}  {:<9} {}",
            boundary.line + 1,
            boundary.level.as_str(),
            boundary.label
        );
    }
    Ok(())
}

fn rank(config: &Config, dir: &Path) -> Result<()> {
    validate_dir(dir)?;
    let files = SourceLoader::new(dir).with_config(config.ingest.clone()).load()?;
    let ranker = ImportanceRanker::new(config.ranking.clone());

    for (bucket, members) in ranker.group(&files) {
        println!("{} ({} files)", bucket, members.len());
        for file in members {
            println!("  {:>7.1}  {}", ranker.importance(file), file.path);
        }
    }
    Ok(())
}

fn cache_command(config: &Config, action: CacheCommand) -> Result<()> {
    let namespaces: Vec<CacheNamespace> = match action.namespace() {
        Some(ns) => vec![ns],
        None => CacheNamespace::ALL.to_vec(),
    };

    for namespace in namespaces {
        let cache =
            AnalysisCache::open(&config.cache.directory, namespace, config.cache.ttl_hours)?;
        match action {
            CacheCommand::Stats { .. } => {
                let stats = cache.stats()?;
                println!(
                    "{}: {} entries ({} valid, {} expired), {} bytes",
                    stats.namespace, stats.total, stats.valid, stats.expired, stats.size_bytes
                );
            }
            CacheCommand::PurgeExpired { .. } => {
                println!("{}: removed {} expired entries", namespace, cache.purge_expired()?)
            }
            CacheCommand::Clear { .. } => {
                println!("{}: removed {} entries", namespace, cache.purge_all()?)
            }
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Plan {
            dir,
            max_tokens,
            json,
        } => plan(&config, &dir, max_tokens, json),
        Commands::Boundaries { file } => boundaries(&file),
        Commands::Rank { dir } => rank(&config, &dir),
        Commands::Cache { action } => cache_command(&config, action),
    }
}
