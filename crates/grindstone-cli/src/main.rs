use clap::{Parser, Subcommand};

mod commands;
mod logging;

#[derive(Parser)]
#[command(name = "grindstone", version, about = "Grindstone CLI")]
struct Cli {
    /// Debug logging on stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// User accounts, XP and level
    User {
        #[command(subcommand)]
        action: commands::user::UserAction,
    },
    /// Task management
    Task {
        #[command(subcommand)]
        action: commands::task::TaskAction,
    },
    /// Goals and milestone progress
    Goal {
        #[command(subcommand)]
        action: commands::goal::GoalAction,
    },
    /// Daily habits
    Habit {
        #[command(subcommand)]
        action: commands::habit::HabitAction,
    },
    /// Focus sessions
    Focus {
        #[command(subcommand)]
        action: commands::focus::FocusAction,
    },
    /// Multi-day challenges
    Challenge {
        #[command(subcommand)]
        action: commands::challenge::ChallengeAction,
    },
    /// Reward log
    Events {
        #[command(subcommand)]
        action: commands::events::EventsAction,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
}

fn main() {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let result = match cli.command {
        Commands::User { action } => commands::user::run(action),
        Commands::Task { action } => commands::task::run(action),
        Commands::Goal { action } => commands::goal::run(action),
        Commands::Habit { action } => commands::habit::run(action),
        Commands::Focus { action } => commands::focus::run(action),
        Commands::Challenge { action } => commands::challenge::run(action),
        Commands::Events { action } => commands::events::run(action),
        Commands::Config { action } => commands::config::run(action),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
