pub mod cli;
pub mod core;
pub mod providers;
pub mod store;

use crate::cli::{
    collection::CollectionAction, custom::CustomAction, fortune::FortuneAction,
    history::HistoryAction,
};
use crate::core::config::AppConfig;
use crate::core::network::ProbeNetworkMonitor;
use crate::core::repository::QuoteRepository;
use crate::core::scheduler::RefreshScheduler;
use crate::providers::registry::ModuleRegistry;
use crate::store::QuoteDatabase;
use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub enum AppCommand {
    Refresh,
    Daemon,
    Current,
    Modules,
    History(HistoryAction),
    Collection(CollectionAction),
    Custom(CustomAction),
    Fortune(FortuneAction),
}

/// Loads the configuration from `config_path`, the default location, or
/// built-in defaults when no file exists there.
pub fn load_config(config_path: Option<&str>) -> Result<AppConfig> {
    if let Some(path) = config_path {
        return AppConfig::load_from_path(path);
    }
    let default_path = AppConfig::default_config_path()?;
    if default_path.exists() {
        AppConfig::load()
    } else {
        warn!(
            path = %default_path.display(),
            "No configuration file, using defaults. Run `quotelock setup` to create one"
        );
        Ok(AppConfig::default())
    }
}

/// Opens the database and wires the registry and repository for `config`.
pub fn open_repository(config: &AppConfig) -> Result<Arc<QuoteRepository>> {
    let data_path = config.data_path()?;
    debug!(path = %data_path.display(), "Opening quote database");
    let database = Arc::new(
        QuoteDatabase::open(&data_path)
            .with_context(|| format!("Failed to open quote database at {}", data_path.display()))?,
    );
    let registry = Arc::new(ModuleRegistry::from_config(config, Arc::clone(&database))?);
    registry
        .get(&config.module)
        .with_context(|| format!("Invalid module in configuration: {}", config.module))?;
    Ok(Arc::new(QuoteRepository::new(
        registry,
        database,
        &config.module,
    )))
}

pub async fn run_command(command: AppCommand, config_path: Option<&str>) -> Result<()> {
    let config = load_config(config_path)?;
    debug!(module = %config.module, "Loaded config");
    let repository = open_repository(&config)?;
    let database = Arc::clone(repository.database());

    let scheduler = || -> Result<Arc<RefreshScheduler>> {
        Ok(Arc::new(RefreshScheduler::new(
            Arc::clone(&repository),
            Arc::new(ProbeNetworkMonitor::new(&config.network)?),
            config.refresh.clone(),
        )))
    };

    match command {
        AppCommand::Refresh => cli::refresh::run(&*scheduler()?).await?,
        AppCommand::Daemon => {
            info!(module = %config.module, "Starting quotelock daemon");
            let watched = match config_path {
                Some(path) => PathBuf::from(path),
                None => AppConfig::default_config_path()?,
            };
            cli::daemon::run(scheduler()?, Some(watched)).await?
        }
        AppCommand::Current => cli::current::run(&repository)?,
        AppCommand::Modules => {
            cli::modules::run(repository.registry(), &config.module, &config.refresh)
        }
        AppCommand::History(action) => cli::history::run(&database, action)?,
        AppCommand::Collection(action) => cli::collection::run(&repository, action)?,
        AppCommand::Custom(action) => cli::custom::run(&database, action)?,
        AppCommand::Fortune(action) => cli::fortune::run(&database, action)?,
    }

    database.persist()
}
