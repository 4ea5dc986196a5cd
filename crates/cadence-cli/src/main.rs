use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "cadence-cli", version, about = "Cadence program schedule CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Current day index of an enrollment
    DayIndex(commands::day_index::DayIndexArgs),
    /// Effective content of a day or week
    Resolve {
        #[command(subcommand)]
        action: commands::resolve::ResolveAction,
    },
    /// Distribute a week's tasks over its days
    Distribute(commands::distribute::DistributeArgs),
    /// Recompute module and week day ranges
    Reindex(commands::reindex::ReindexArgs),
    /// Focus list helpers
    Focus {
        #[command(subcommand)]
        action: commands::focus::FocusAction,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("CADENCE_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    init_tracing();
    let cli = Cli::parse();
    let result = match cli.command {
        Commands::DayIndex(args) => commands::day_index::run(args),
        Commands::Resolve { action } => commands::resolve::run(action),
        Commands::Distribute(args) => commands::distribute::run(args),
        Commands::Reindex(args) => commands::reindex::run(args),
        Commands::Focus { action } => commands::focus::run(action),
        Commands::Config { action } => commands::config::run(action),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
