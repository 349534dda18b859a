use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use wordix::engine::Engine;
use wordix::index::types::EngineConfig;
use wordix::{output, query, repl, store};

#[derive(Parser)]
#[command(name = "wordix")]
#[command(about = "In-memory word dictionary with prefix, suffix, substring, and edit-distance search")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Word log to open in the interactive session (when no subcommand is given)
    #[arg(default_value = "words.csv")]
    file: PathBuf,

    /// Path to a JSON config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the indexes for a word log and write its snapshot cache
    Index {
        /// Word log file
        file: PathBuf,
    },
    /// Run a single query against a word log
    Query {
        /// Word log file
        file: PathBuf,
        /// Query command, e.g. "pre app" or "sim apple 2"
        query: Vec<String>,
    },
    /// Write a fresh word log of synthetic words
    Generate {
        /// Target file (overwritten)
        file: PathBuf,
        /// Number of distinct words
        #[arg(short = 'n', long, default_value = "100000")]
        count: usize,
        /// Minimum word length
        #[arg(long, default_value = "3")]
        min_len: usize,
        /// Maximum word length
        #[arg(long, default_value = "12")]
        max_len: usize,
        /// RNG seed for reproducible corpora
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Show index statistics for a word log
    Stats {
        /// Word log file
        file: PathBuf,
    },
}

fn load_config(path: Option<&PathBuf>) -> Result<EngineConfig> {
    match path {
        Some(path) => EngineConfig::load(path),
        None => Ok(EngineConfig::default()),
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_ref())?;
    let color = !cli.no_color;

    match cli.command {
        Some(Commands::Index { file }) => {
            let engine = Engine::open(&file, config)?;
            engine.save_snapshot()?;
            engine.stats().print();
        }
        Some(Commands::Query { file, query }) => {
            let engine = Engine::open(&file, config)?;
            let parsed = query::parse_query(&query.join(" "))?;
            if let query::Query::Complex { skipped, .. } = &parsed {
                for term in skipped {
                    output::print_warning(&format!("unknown term {term:?} skipped"), color)?;
                }
            }
            let outcome = engine.query(&parsed);
            output::print_outcome(engine.dict(), &outcome, color)?;
            engine.shutdown()?;
        }
        Some(Commands::Generate {
            file,
            count,
            min_len,
            max_len,
            seed,
        }) => {
            store::generate_log(&file, count, min_len, max_len, seed)?;
            println!("wrote {} words to {}", count, file.display());
        }
        Some(Commands::Stats { file }) => {
            let engine = Engine::open(&file, config)?;
            engine.stats().print();
        }
        None => {
            let mut engine = Engine::open(&cli.file, config)?;
            repl::run(&mut engine, color)?;
            engine.shutdown()?;
        }
    }

    Ok(())
}
