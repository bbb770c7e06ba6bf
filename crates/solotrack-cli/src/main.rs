use clap::{CommandFactory, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "solotrack", version, about = "SoloTrack student pilot logbook CLI")]
struct Cli {
    /// Log filter used when RUST_LOG is unset (e.g. "debug")
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Flight log management
    Flight {
        #[command(subcommand)]
        action: commands::flight::FlightAction,
    },
    /// Day and night passenger-carrying currency
    Currency(commands::currency::CurrencyArgs),
    /// Progress toward private pilot hour requirements
    Progress(commands::progress::ProgressArgs),
    /// Training notifications
    Notify {
        #[command(subcommand)]
        action: commands::notify::NotifyAction,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
    /// Generate shell completions
    Completions {
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

fn init_tracing(log_level: &str) -> Result<(), Box<dyn std::error::Error>> {
    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(log_level)
            .map_err(|e| format!("invalid log level '{log_level}': {e}"))?,
    };

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .with_ansi(false)
        .try_init()
        .map_err(|e| format!("failed to initialize logging: {e}"))?;
    Ok(())
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = init_tracing(&cli.log_level) {
        eprintln!("error: {e}");
        std::process::exit(1);
    }

    let result = match cli.command {
        Commands::Flight { action } => commands::flight::run(action),
        Commands::Currency(args) => commands::currency::run(args),
        Commands::Progress(args) => commands::progress::run(args),
        Commands::Notify { action } => commands::notify::run(action),
        Commands::Config { action } => commands::config::run(action),
        Commands::Completions { shell } => {
            commands::completions::run(shell, &mut Cli::command());
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
