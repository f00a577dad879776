use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "sprintraffle", version, about = "Sprint raffle CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Current and upcoming sprints
    Sprint {
        #[command(subcommand)]
        action: commands::sprint::SprintAction,
    },
    /// Raffle ticket standing
    Tickets {
        #[command(subcommand)]
        action: commands::tickets::TicketsAction,
    },
    /// Ad playback: report views, pick the next ad
    Ad {
        #[command(subcommand)]
        action: commands::ad::AdAction,
    },
    /// Stored credentials
    Auth {
        #[command(subcommand)]
        action: commands::auth::AuthAction,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
    /// Format milliseconds as a countdown
    Countdown {
        #[arg(allow_negative_numbers = true)]
        ms: i64,
    },
    /// Name of a day-of-week index (0 = Sunday)
    Day {
        #[arg(allow_negative_numbers = true)]
        index: i32,
        /// Locale for the day name (en, tr); defaults to ui.locale
        #[arg(long)]
        locale: Option<sprintraffle_core::Locale>,
    },
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("SPRINTRAFFLE_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    init_tracing();
    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Sprint { action } => commands::sprint::run(action),
        Commands::Tickets { action } => commands::tickets::run(action),
        Commands::Ad { action } => commands::ad::run(action),
        Commands::Auth { action } => commands::auth::run(action),
        Commands::Config { action } => commands::config::run(action),
        Commands::Countdown { ms } => commands::format::countdown(ms),
        Commands::Day { index, locale } => commands::format::day(index, locale),
    };

    if let Err(e) = result {
        eprintln!("error: {}", commands::error_message(e.as_ref()));
        std::process::exit(1);
    }
}
