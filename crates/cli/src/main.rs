mod commands;
mod config;
mod render;
mod serve;

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::commands::{
    cmd_history, cmd_list, cmd_register, cmd_show, cmd_total, cmd_update, CommandError,
};
use crate::config::TrackerConfig;

/// Output format for CLI responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    Text,
    Json,
}

/// Produce supply-chain tracker.
#[derive(Parser)]
#[command(name = "tracker", version, about = "Produce supply-chain tracker")]
struct Cli {
    /// Output format (text or json)
    #[arg(long, global = true, default_value = "text", value_enum)]
    output: OutputFormat,

    /// Suppress non-essential output
    #[arg(long, global = true)]
    quiet: bool,

    /// Path to the config file (default: ./tracker.toml if present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Path to the ledger journal (overrides config and TRACKER_JOURNAL)
    #[arg(long, global = true)]
    journal: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Register a new produce item at the Farm stage
    Register {
        /// Produce name
        name: String,
        /// Free-form provenance descriptor
        origin: String,
        /// Price in the smallest currency unit
        #[arg(allow_hyphen_values = true)]
        price: i64,
        /// Registration location, conventionally "lat,lon"
        #[arg(default_value = "", allow_hyphen_values = true)]
        location: String,
    },

    /// Append a custody/status update to a produce item
    Update {
        /// Produce id
        id: u64,
        /// Stage code (0-3) or label (farm, distributor, retailer, consumer)
        #[arg(allow_hyphen_values = true)]
        status: String,
        /// What happened, e.g. "shipped"
        action: String,
        /// Location, conventionally "lat,lon"
        #[arg(default_value = "", allow_hyphen_values = true)]
        location: String,
    },

    /// Show a produce record
    Show {
        /// Produce id
        id: u64,
    },

    /// Show the update history of a produce item, oldest first
    History {
        /// Produce id
        id: u64,
    },

    /// Print the number of registered produce items
    Total,

    /// List produce items in id order
    List {
        /// Number of items to skip
        #[arg(long, default_value = "0")]
        offset: u64,
        /// Maximum number of items to show
        #[arg(long, default_value = "50")]
        limit: usize,
    },

    /// Start the HTTP API server
    Serve {
        /// Port to listen on (default: config, then 8080)
        #[arg(long)]
        port: Option<u16>,
        /// Address to bind (default: config, then 0.0.0.0)
        #[arg(long)]
        bind: Option<String>,
        /// Path to TLS certificate PEM file (requires --tls-key)
        #[arg(long)]
        tls_cert: Option<PathBuf>,
        /// Path to TLS private key PEM file (requires --tls-cert)
        #[arg(long)]
        tls_key: Option<PathBuf>,
    },
}

fn init_tracing(quiet: bool) {
    let default_level = if quiet { "error" } else { "info" };
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .with(env_filter)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.quiet);

    if let Err(e) = run(cli.command, cli.config, cli.journal, cli.output) {
        report_error(&e, cli.output, cli.quiet);
        process::exit(e.exit_code());
    }
}

fn run(
    command: Commands,
    config_path: Option<PathBuf>,
    journal: Option<PathBuf>,
    output: OutputFormat,
) -> Result<(), CommandError> {
    let config = TrackerConfig::load(config_path.as_deref())?;
    let journal = journal.unwrap_or_else(|| config.journal_path());

    match command {
        Commands::Register {
            name,
            origin,
            price,
            location,
        } => cmd_register(
            &config,
            &journal,
            commands::RegisterArgs {
                name: &name,
                origin: &origin,
                price,
                location: &location,
            },
            output,
        ),
        Commands::Update {
            id,
            status,
            action,
            location,
        } => cmd_update(&config, &journal, id, &status, &action, &location, output),
        Commands::Show { id } => cmd_show(&journal, id, output),
        Commands::History { id } => cmd_history(&journal, id, output),
        Commands::Total => cmd_total(&journal, output),
        Commands::List { offset, limit } => cmd_list(&journal, offset, limit, output),
        Commands::Serve {
            port,
            bind,
            tls_cert,
            tls_key,
        } => {
            // Validate TLS flags: both must be provided or neither
            if tls_cert.is_some() != tls_key.is_some() {
                return Err(config::ConfigError::Invalid {
                    key: "--tls-cert/--tls-key".to_string(),
                    reason: "both must be provided".to_string(),
                }
                .into());
            }
            let opts = serve::ServeOptions {
                bind: bind.unwrap_or_else(|| config.server.bind.clone()),
                port: port.unwrap_or(config.server.port),
                journal,
                principals: config.principal_table()?,
                rate_limit: config.server.rate_limit,
                tls_cert,
                tls_key,
            };
            commands::runtime()?
                .block_on(serve::start_server(opts))
                .map_err(|e| CommandError::Serve(e.to_string()))
        }
    }
}

/// Print an error to stderr, as plain text or a JSON object.
pub(crate) fn report_error(err: &CommandError, output: OutputFormat, quiet: bool) {
    if quiet {
        return;
    }
    match output {
        OutputFormat::Text => eprintln!("error: {}", err),
        OutputFormat::Json => eprintln!(
            "{}",
            serde_json::json!({ "error": err.to_string(), "kind": err.kind() })
        ),
    }
}
