use super::ui;
use crate::core::config::AppConfig;
use crate::core::repository::QuoteRepository;
use crate::core::scheduler::{RefreshOutcome, RefreshScheduler, SchedulerHandle};
use anyhow::{Context, Result};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

/// How often the configuration file is checked for changes.
pub const CONFIG_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Runs the refresh loop until Ctrl-C, printing every new quote and
/// applying edits to `config_path`.
pub async fn run(scheduler: Arc<RefreshScheduler>, config_path: Option<PathBuf>) -> Result<()> {
    run_until(scheduler, config_path, CONFIG_POLL_INTERVAL, async {
        tokio::signal::ctrl_c()
            .await
            .context("Failed to listen for Ctrl-C")
    })
    .await
}

/// Runs the refresh loop until `shutdown` completes.
///
/// When `config_path` is set the file is polled every `poll`; a change
/// selects the configured module and reschedules with its refresh policy.
/// Provider and network settings are read once at startup.
pub async fn run_until<F>(
    scheduler: Arc<RefreshScheduler>,
    config_path: Option<PathBuf>,
    poll: Duration,
    shutdown: F,
) -> Result<()>
where
    F: Future<Output = Result<()>>,
{
    let repository = Arc::clone(scheduler.repository());
    let mut updates = repository.subscribe();

    let current = updates.borrow_and_update().clone();
    if let Some(current) = current {
        ui::print_quote(&current);
        ui::print_separator();
    }
    match scheduler.scheduled_delay()? {
        Some(delay) => info!(module = %repository.module_id()?, ?delay, "Daemon started"),
        None => info!(module = %repository.module_id()?, "Daemon started, automatic refresh disabled"),
    }

    let mut watch = config_path.map(ConfigWatch::new);
    let mut ticker = tokio::time::interval(poll);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let handle = Arc::clone(&scheduler).start();
    tokio::pin!(shutdown);
    loop {
        tokio::select! {
            result = &mut shutdown => {
                result?;
                break;
            }
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
                let current = updates.borrow_and_update().clone();
                if let Some(current) = current {
                    ui::print_quote(&current);
                    ui::print_separator();
                }
            }
            _ = ticker.tick(), if watch.is_some() => {
                if let Some(watch) = watch.as_mut()
                    && watch.changed()
                    && let Err(err) = reload_config(&repository, &handle, &watch.path).await
                {
                    warn!(error = ?err, "Keeping previous configuration");
                }
            }
        }
    }

    info!("Shutting down");
    handle.shutdown().await?;
    repository.database().persist()
}

/// Applies the module and refresh policy of the file at `path`.
async fn reload_config(
    repository: &QuoteRepository,
    handle: &SchedulerHandle,
    path: &Path,
) -> Result<()> {
    let config = AppConfig::load_from_path(path)?;
    let previous = repository.module_id()?;
    let module_changed = config.module != previous;
    if module_changed {
        repository.select_module(&config.module)?;
    }
    handle.reschedule(config.refresh).await?;
    info!(path = %path.display(), module = %config.module, "Configuration reloaded");

    if module_changed {
        match handle.refresh_now().await? {
            RefreshOutcome::Updated(_) => {}
            outcome => debug!(?outcome, "Refresh after module change did not update"),
        }
    }
    Ok(())
}

struct ConfigWatch {
    path: PathBuf,
    stamp: Option<(SystemTime, u64)>,
}

impl ConfigWatch {
    fn new(path: PathBuf) -> Self {
        let stamp = file_stamp(&path);
        Self { path, stamp }
    }

    /// True once for every change of the file's modification time or size.
    /// A missing file is not a change.
    fn changed(&mut self) -> bool {
        let stamp = file_stamp(&self.path);
        if stamp.is_none() || stamp == self.stamp {
            return false;
        }
        self.stamp = stamp;
        true
    }
}

fn file_stamp(path: &Path) -> Option<(SystemTime, u64)> {
    let metadata = std::fs::metadata(path).ok()?;
    Some((metadata.modified().ok()?, metadata.len()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_config_watch_reports_each_change_once() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        let mut watch = ConfigWatch::new(path.clone());
        assert!(!watch.changed());

        std::fs::write(&path, "module: custom\n").unwrap();
        assert!(watch.changed());
        assert!(!watch.changed());

        std::fs::write(&path, "module: fortune-cookies\n").unwrap();
        assert!(watch.changed());

        std::fs::remove_file(&path).unwrap();
        assert!(!watch.changed());
    }
}
