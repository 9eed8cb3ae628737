use clap::{Parser, Subcommand};
use std::path::PathBuf;
use anyhow::{Result, Context};

mod config;
mod commands;
mod error;

use config::Config;

#[derive(Parser)]
#[command(name = "embmap")]
#[command(about = "EmbMap - multi-resolution summaries for embedding maps")]
#[command(version)]
#[command(long_about = "
EmbMap turns projected embedding points and their texts into a density contour
grid and a set of tile topics for every zoom level of a map viewer.

Input is NDJSON, one point per line: {\"x\": 0.1, \"y\": 2.3, \"text\": \"...\"}
with optional \"label\" (group index) and \"time\" fields.

Examples:
  embmap summarize --input points.ndjson --out grid.json --name 'Paper abstracts'
  embmap summarize --input points.ndjson --out grid.json --group-names train,test
  embmap contour --input points.ndjson --out contour.json
  embmap topics --input points.ndjson --out topics.json
  embmap levels --input points.ndjson
  embmap config --example
")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file path
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Number of threads to use
    #[arg(short, long, global = true)]
    pub threads: Option<usize>,

    /// Verbose output
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (suppress non-error output)
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Generate contours and tile topics into one grid file
    Summarize {
        /// Input points (NDJSON)
        #[arg(short, long)]
        input: PathBuf,

        /// Output grid file (JSON)
        #[arg(short, long)]
        out: PathBuf,

        /// Embedding name shown by the viewer
        #[arg(long)]
        name: Option<String>,

        /// Group names, one per distinct label, in label order
        #[arg(long, value_delimiter = ',')]
        group_names: Option<Vec<String>>,

        /// strptime-style format of the time field, passed to the viewer
        #[arg(long)]
        time_format: Option<String>,

        /// Treat each text as a JSON object and summarize this field
        #[arg(long)]
        json_text_key: Option<String>,
    },

    /// Generate density contours only
    Contour {
        /// Input points (NDJSON)
        #[arg(short, long)]
        input: PathBuf,

        /// Output file (JSON)
        #[arg(short, long)]
        out: PathBuf,

        /// Group names, one per distinct label, in label order
        #[arg(long, value_delimiter = ',')]
        group_names: Option<Vec<String>>,

        /// strptime-style format of the time field
        #[arg(long)]
        time_format: Option<String>,
    },

    /// Generate multi-level tile topics only
    Topics {
        /// Input points (NDJSON)
        #[arg(short, long)]
        input: PathBuf,

        /// Output file (JSON)
        #[arg(short, long)]
        out: PathBuf,
    },

    /// Print the quadtree levels selected for the configured zoom range
    Levels {
        /// Input points (NDJSON)
        #[arg(short, long)]
        input: PathBuf,
    },

    /// Print or write the default configuration
    Config {
        /// Print an example embmap.toml
        #[arg(long)]
        example: bool,

        /// Write the default configuration to this file
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
}

fn setup_logging(verbose: u8, quiet: bool) -> Result<()> {
    let level = if quiet {
        "error"
    } else {
        match verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();

    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    setup_logging(cli.verbose, cli.quiet)?;

    // Load configuration
    let config = Config::load(cli.config.as_deref())
        .unwrap_or_else(|e| error::print_error_and_exit(&error::CliError::config(format!("{:#}", e))));

    // Set global thread count
    let threads = cli.threads.unwrap_or(config.general.threads).max(1);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .context("Failed to set thread count")?;

    let progress = config.general.progress && !cli.quiet;

    let outcome = match cli.command {
        Commands::Summarize { input, out, name, group_names, time_format, json_text_key } => {
            commands::summarize::execute(&config, input, out, name, group_names, time_format, json_text_key, progress)
        }

        Commands::Contour { input, out, group_names, time_format } => {
            commands::contour::execute(&config, input, out, group_names, time_format)
        }

        Commands::Topics { input, out } => commands::topics::execute(&config, input, out, progress),

        Commands::Levels { input } => commands::levels::execute(&config, input),

        Commands::Config { example, out } => {
            if let Some(path) = out {
                config.save_to_file(&path)?;
                log::info!("Wrote configuration to {}", path.display());
            }
            if example {
                print!("{}", Config::example_toml()?);
            }
            Ok(())
        }
    };

    if let Err(err) = outcome {
        if let Some(cli_err) = err.downcast_ref::<error::CliError>() {
            error::print_error_and_exit(cli_err);
        }
        return Err(err);
    }

    Ok(())
}
