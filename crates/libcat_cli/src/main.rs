//! libcat CLI
//!
//! Command-line front end for the libcat catalog engine.
//!
//! # Commands
//!
//! - `serve` - Answer JSON-lines requests on stdin
//! - `search` - Prefix search or autocomplete
//! - `lookup` - Find books by ordering key or key range
//! - `recommend` - Related or personalized recommendations
//! - `inspect` - Display catalog statistics and verify the indexes
//! - `export` - Write the catalog out in canonical form

mod catalog_file;
mod commands;
mod error;
mod protocol;

use clap::{Parser, Subcommand};
use commands::{CatalogOptions, Format};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// libcat catalog tools.
#[derive(Parser)]
#[command(name = "libcat")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(flatten)]
    options: CatalogOptions,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Answer JSON-lines requests on stdin, one response per line on stdout
    Serve {
        /// Rewrite the catalog file when input ends
        #[arg(long)]
        save: bool,
    },

    /// Prefix search across search fields
    Search {
        /// The prefix to search for
        query: String,

        /// Restrict to one field (title, author or a named field)
        #[arg(short, long)]
        field: Option<String>,

        /// Print up to N completions instead of books
        #[arg(long, value_name = "N")]
        complete: Option<usize>,

        /// Output format
        #[arg(long, value_enum, default_value_t = Format::Text)]
        format: Format,
    },

    /// Find a book by ordering key, or every book in a key range
    Lookup {
        /// The key (or range start)
        key: String,

        /// Range end, inclusive
        #[arg(long)]
        to: Option<String>,

        /// Output format
        #[arg(long, value_enum, default_value_t = Format::Text)]
        format: Format,
    },

    /// Recommend books related to one book, or to several at once
    Recommend {
        /// Book ids
        #[arg(required = true, num_args = 1..)]
        ids: Vec<u64>,

        /// Maximum number of results
        #[arg(short = 'k', long, default_value_t = 6)]
        limit: usize,

        /// Output format
        #[arg(long, value_enum, default_value_t = Format::Text)]
        format: Format,
    },

    /// Display catalog statistics and verify the indexes
    Inspect {
        /// Show how many books share each value of this field
        #[arg(long)]
        histogram: Option<String>,

        /// Output format
        #[arg(long, value_enum, default_value_t = Format::Text)]
        format: Format,
    },

    /// Write the catalog in canonical form
    Export {
        /// Output file (stdout if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show version information
    Version,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Logs go to stderr; stdout carries results and protocol responses.
    let level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match run(cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> error::CliResult<bool> {
    let options = &cli.options;
    match cli.command {
        Commands::Serve { save } => commands::serve::run(options, save)?,
        Commands::Search {
            query,
            field,
            complete,
            format,
        } => commands::search::run(options, &query, field.as_deref(), complete, format)?,
        Commands::Lookup { key, to, format } => {
            commands::lookup::run(options, &key, to.as_deref(), format)?;
        }
        Commands::Recommend { ids, limit, format } => {
            commands::recommend::run(options, &ids, limit, format)?;
        }
        Commands::Inspect { histogram, format } => {
            return commands::inspect::run(options, histogram.as_deref(), format);
        }
        Commands::Export { output } => commands::export::run(options, output.as_deref())?,
        Commands::Version => {
            println!("libcat CLI v{}", env!("CARGO_PKG_VERSION"));
            println!("libcat Core v{}", libcat_core::VERSION);
        }
    }
    Ok(true)
}
