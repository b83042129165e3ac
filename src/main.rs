use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use quotelock::cli::{
    collection::CollectionAction, custom::CustomAction, fortune::FortuneAction,
    history::HistoryAction,
};
use quotelock::core::log::init_logging;

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to optional configuration file
    #[arg(short, long, global = true)]
    config_path: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

impl From<Commands> for quotelock::AppCommand {
    fn from(cmd: Commands) -> quotelock::AppCommand {
        match cmd {
            Commands::Refresh => quotelock::AppCommand::Refresh,
            Commands::Daemon => quotelock::AppCommand::Daemon,
            Commands::Current => quotelock::AppCommand::Current,
            Commands::Modules => quotelock::AppCommand::Modules,
            Commands::History { action } => quotelock::AppCommand::History(action),
            Commands::Collection { action } => quotelock::AppCommand::Collection(action),
            Commands::Custom { action } => quotelock::AppCommand::Custom(action),
            Commands::Fortune { action } => quotelock::AppCommand::Fortune(action),
            Commands::Setup => unreachable!("Setup command should be handled separately"),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Create default configuration
    Setup,
    /// Fetch a new quote from the active module
    Refresh,
    /// Keep refreshing quotes in the foreground until Ctrl-C
    Daemon,
    /// Show the current quote
    Current,
    /// List available quote modules
    Modules,
    /// Browse quotes shown so far
    History {
        #[command(subcommand)]
        action: HistoryAction,
    },
    /// Manage collected quotes
    Collection {
        #[command(subcommand)]
        action: CollectionAction,
    },
    /// Manage your own quotes
    Custom {
        #[command(subcommand)]
        action: CustomAction,
    },
    /// Manage imported fortune files
    Fortune {
        #[command(subcommand)]
        action: FortuneAction,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose, matches!(cli.command, Some(Commands::Daemon)));

    let result = match cli.command {
        Some(Commands::Setup) => quotelock::cli::setup::setup(),
        Some(cmd) => quotelock::run_command(cmd.into(), cli.config_path.as_deref()).await,
        None => {
            Cli::command().print_help()?;
            Ok(())
        }
    };

    if let Err(e) = &result {
        tracing::error!(error = %e, "Application failed");
    }
    result
}
