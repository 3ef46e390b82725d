use anyhow::Result;
use clap::{Parser, Subcommand};
use command::{SearchKind, SearchRequest};
use config::{ConfigOverrides, FolioConfig};
use folio_protocol::serialize_json;
use folio_search::IntegratedOptions;
use std::io;
use std::path::PathBuf;

pub mod command;
pub mod config;
pub mod pages;

fn print_stdout(text: &str) -> Result<()> {
    use std::io::Write;

    let mut stdout = io::stdout().lock();
    if let Err(err) = stdout
        .write_all(text.as_bytes())
        .and_then(|_| stdout.write_all(b"\n"))
        .and_then(|_| stdout.flush())
    {
        if err.kind() == io::ErrorKind::BrokenPipe {
            return Ok(());
        }
        return Err(err.into());
    }
    Ok(())
}

#[derive(Parser)]
#[command(name = "folio")]
#[command(about = "Exact, heuristic and semantic search over document pages", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file (defaults to ./folio.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Quiet mode: log only warnings/errors (stdout is reserved for JSON)
    #[arg(long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    /// Override embedding backend: stub|ollama
    #[arg(long, global = true)]
    embed_mode: Option<String>,

    /// Override embedding model id
    #[arg(long, global = true)]
    embed_model: Option<String>,

    /// Override embedding server URL
    #[arg(long, global = true)]
    embed_url: Option<String>,

    /// Directory for the persistent embedding cache
    #[arg(long, global = true)]
    cache_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Search pages with one mode
    Search {
        /// Pages file: JSON array of strings or form-feed separated text
        pages: PathBuf,

        /// Search mode: exact|heuristic|semantic
        #[arg(short, long, default_value = "exact")]
        mode: String,

        /// Search terms; a single argument is split on whitespace
        #[arg(required = true, num_args = 1..)]
        terms: Vec<String>,
    },

    /// Run the integrator and print mode-tagged rows
    Integrated {
        /// Pages file: JSON array of strings or form-feed separated text
        pages: PathBuf,

        /// Rank terms by relevance instead of raw counts
        #[arg(long)]
        heuristic: bool,

        /// Rank pages by embedding similarity (overrides --heuristic)
        #[arg(long)]
        semantic: bool,

        #[arg(required = true, num_args = 1..)]
        terms: Vec<String>,
    },

    /// Print the normalized form of a text
    Normalize { text: String },
}

impl Cli {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            embed_mode: self.embed_mode.clone(),
            embed_model: self.embed_model.clone(),
            embed_url: self.embed_url.clone(),
            cache_dir: self.cache_dir.clone(),
        }
    }
}

fn init_logger(cli: &Cli) {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if cli.quiet {
        builder.filter_level(log::LevelFilter::Warn);
    } else if cli.verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    // reqwest/hyper connection chatter drowns the search logs
    if !cli.verbose {
        builder.filter_module("hyper", log::LevelFilter::Warn);
        builder.filter_module("reqwest", log::LevelFilter::Warn);
    }
    builder.target(env_logger::Target::Stderr).init();
}

pub async fn main_entry() -> Result<()> {
    let cli = Cli::parse();
    init_logger(&cli);

    let request = match &cli.command {
        Commands::Normalize { text } => {
            return print_stdout(&command::normalize_command(text)?);
        }
        Commands::Search { pages, mode, terms } => SearchRequest {
            pages: pages.clone(),
            terms: terms.clone(),
            kind: SearchKind::Single(mode.clone()),
        },
        Commands::Integrated {
            pages,
            heuristic,
            semantic,
            terms,
        } => SearchRequest {
            pages: pages.clone(),
            terms: terms.clone(),
            kind: SearchKind::Integrated(IntegratedOptions {
                use_heuristic: *heuristic,
                use_semantic: *semantic,
            }),
        },
    };

    let response = match FolioConfig::load(cli.config.as_deref()) {
        Ok(config) => command::execute(&request, &config.resolve(&cli.overrides())).await,
        Err(err) => folio_protocol::SearchResponse::error(
            command::classify_error(&err),
            folio_protocol::ResponseMeta::default(),
        ),
    };
    print_stdout(&serialize_json(&response)?)?;
    if response.is_error() {
        std::process::exit(1);
    }
    Ok(())
}
