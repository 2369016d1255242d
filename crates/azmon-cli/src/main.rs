use clap::{Parser, Subcommand, ValueEnum};

mod commands;

use commands::OutputFormat;

#[derive(Parser)]
#[command(
    name = "azmon",
    about = "Resolve Azure Monitor metric targets and collect their latest values",
    version,
    propagate_version = true,
)]
struct Cli {
    /// Log output format.
    #[arg(long, global = true, value_enum, default_value = "text")]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Check a configuration file without calling Azure.
    Validate {
        #[arg(short, long, default_value = "azmon.toml")]
        config: String,
    },
    /// Expand and normalize the configured targets and print the requests
    /// a collection cycle would issue.
    Targets {
        #[arg(short, long, default_value = "azmon.toml")]
        config: String,
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
        /// Environment variable holding the client secret when the file
        /// leaves it empty.
        #[arg(long, default_value = commands::DEFAULT_SECRET_ENV)]
        client_secret_env: String,
    },
    /// Run one collection cycle and print the records.
    Collect {
        #[arg(short, long, default_value = "azmon.toml")]
        config: String,
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
        /// Resource targets collected at the same time.
        #[arg(long, default_value_t = 8)]
        concurrency: usize,
        #[arg(long, default_value = commands::DEFAULT_SECRET_ENV)]
        client_secret_env: String,
    },
}

fn init_tracing(format: LogFormat) -> anyhow::Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new("info,azmon=debug"))?;
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_format)?;

    match cli.command {
        Commands::Validate { config } => commands::validate::validate(&config),
        Commands::Targets {
            config,
            format,
            client_secret_env,
        } => commands::targets::targets(&config, format, &client_secret_env).await,
        Commands::Collect {
            config,
            format,
            concurrency,
            client_secret_env,
        } => commands::collect::collect(&config, format, concurrency, &client_secret_env).await,
    }
}
