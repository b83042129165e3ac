//! Periodic quote refresh with backoff and network gating

use super::config::{BackoffConfig, BackoffPolicy, RefreshConfig};
use super::module::NEVER_REFRESH;
use super::network::{NetworkMonitor, NetworkStatus};
use super::quote::QuoteDataWithCollectState;
use super::repository::QuoteRepository;
use anyhow::{Context, Result, anyhow};
use chrono::{DateTime, Utc};
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tokio::sync::{Mutex, mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

pub const MIN_REFRESH_INTERVAL_SECS: u32 = 60;

/// Effective refresh interval for a module, or `None` when the module must
/// never be refreshed automatically.
pub fn refresh_interval(config: &RefreshConfig, module_minimum: u32) -> Option<Duration> {
    if module_minimum == NEVER_REFRESH {
        return None;
    }
    let configured = match config.interval_override_secs {
        Some(secs) if secs > 0 => secs,
        _ => config.interval_secs,
    };
    let secs = configured
        .max(MIN_REFRESH_INTERVAL_SECS)
        .max(module_minimum);
    Some(Duration::from_secs(u64::from(secs)))
}

/// Time left until the next refresh, counting from the last successful one.
pub fn update_delay(
    interval: Duration,
    last_update: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> Duration {
    let Some(last_update) = last_update else {
        return interval;
    };
    let elapsed = (now - last_update).to_std().unwrap_or_default();
    interval.saturating_sub(elapsed)
}

pub fn should_refresh(requires_internet: bool, status: NetworkStatus, unmetered_only: bool) -> bool {
    if !requires_internet {
        return true;
    }
    match status {
        NetworkStatus::Disconnected => false,
        NetworkStatus::Metered => !unmetered_only,
        NetworkStatus::Unmetered => true,
    }
}

/// Retry delays after failed refreshes.
#[derive(Debug, Clone)]
pub struct Backoff {
    policy: BackoffPolicy,
    initial: Duration,
    max: Duration,
    attempts: u32,
}

impl Backoff {
    pub fn new(config: &BackoffConfig) -> Self {
        Self {
            policy: config.policy,
            initial: Duration::from_millis(config.initial_delay_ms),
            max: Duration::from_secs(config.max_delay_secs),
            attempts: 0,
        }
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn next_delay(&mut self) -> Duration {
        self.attempts = self.attempts.saturating_add(1);
        let delay = match self.policy {
            BackoffPolicy::Linear => self.initial.checked_mul(self.attempts),
            BackoffPolicy::Exponential => 2u32
                .checked_pow(self.attempts - 1)
                .and_then(|factor| self.initial.checked_mul(factor)),
        };
        delay.map_or(self.max, |delay| delay.min(self.max))
    }

    pub fn reset(&mut self) {
        self.attempts = 0;
    }
}

#[derive(Debug)]
pub enum RefreshOutcome {
    Updated(QuoteDataWithCollectState),
    /// The network does not allow a refresh right now.
    Skipped(NetworkStatus),
    Failed,
    /// Another refresh was already running.
    Busy,
}

enum Trigger {
    RefreshNow(oneshot::Sender<Result<RefreshOutcome>>),
    Reschedule(RefreshConfig),
}

pub struct RefreshScheduler {
    repository: Arc<QuoteRepository>,
    network: Arc<dyn NetworkMonitor>,
    config: RwLock<RefreshConfig>,
    in_flight: Mutex<()>,
}

impl RefreshScheduler {
    pub fn new(
        repository: Arc<QuoteRepository>,
        network: Arc<dyn NetworkMonitor>,
        config: RefreshConfig,
    ) -> Self {
        Self {
            repository,
            network,
            config: RwLock::new(config),
            in_flight: Mutex::new(()),
        }
    }

    pub fn repository(&self) -> &Arc<QuoteRepository> {
        &self.repository
    }

    fn config(&self) -> Result<RefreshConfig> {
        self.config
            .read()
            .map(|config| config.clone())
            .map_err(|_| anyhow!("Refresh config lock poisoned"))
    }

    fn set_config(&self, config: RefreshConfig) -> Result<()> {
        *self
            .config
            .write()
            .map_err(|_| anyhow!("Refresh config lock poisoned"))? = config;
        Ok(())
    }

    /// Interval of the active module under the current configuration.
    pub fn interval(&self) -> Result<Option<Duration>> {
        let module = self.repository.active_module()?;
        Ok(refresh_interval(
            &self.config()?,
            module.minimum_refresh_interval(),
        ))
    }

    /// Delay until the next regular refresh.
    pub fn scheduled_delay(&self) -> Result<Option<Duration>> {
        let Some(interval) = self.interval()? else {
            return Ok(None);
        };
        let last_update = self.repository.last_update_time()?;
        Ok(Some(update_delay(interval, last_update, Utc::now())))
    }

    /// Runs a single refresh unless one is already in flight.
    pub async fn run_once(&self) -> Result<RefreshOutcome> {
        let Ok(_guard) = self.in_flight.try_lock() else {
            debug!("Refresh already in flight");
            return Ok(RefreshOutcome::Busy);
        };
        let module = self.repository.active_module()?;
        if module.requires_internet() {
            let status = self.network.status().await;
            if !should_refresh(true, status, self.config()?.unmetered_only) {
                info!(?status, module = module.id(), "Network unsuitable, skipping refresh");
                return Ok(RefreshOutcome::Skipped(status));
            }
        }
        Ok(match self.repository.download_quote().await? {
            Some(quote) => {
                info!(text = %quote.quote.text, source = %quote.quote.readable_source(), "Quote refreshed");
                RefreshOutcome::Updated(quote)
            }
            None => RefreshOutcome::Failed,
        })
    }

    /// Delay before the next attempt, given the result of the last one.
    fn delay_after(&self, outcome: &Result<RefreshOutcome>, backoff: &mut Backoff) -> Option<Duration> {
        match outcome {
            Ok(RefreshOutcome::Updated(_)) => {
                backoff.reset();
                self.scheduled_or_log()
            }
            Ok(RefreshOutcome::Busy) => self.scheduled_or_log(),
            Ok(RefreshOutcome::Skipped(_)) | Ok(RefreshOutcome::Failed) | Err(_) => {
                if let Err(err) = outcome {
                    error!(error = ?err, "Refresh failed");
                }
                // Modules that never refresh automatically are not retried either.
                match self.interval() {
                    Ok(Some(_)) => {
                        let delay = backoff.next_delay();
                        warn!(attempt = backoff.attempts(), ?delay, "Retrying refresh with backoff");
                        Some(delay)
                    }
                    Ok(None) => None,
                    Err(err) => {
                        error!(error = ?err, "Cannot compute refresh interval");
                        None
                    }
                }
            }
        }
    }

    fn scheduled_or_log(&self) -> Option<Duration> {
        match self.scheduled_delay() {
            Ok(delay) => delay,
            Err(err) => {
                error!(error = ?err, "Cannot compute refresh delay");
                None
            }
        }
    }

    /// Spawns the refresh loop.
    ///
    /// The loop sleeps until the next refresh is due and reacts to explicit
    /// refresh requests, configuration changes and shutdown. Failed
    /// refreshes are retried with backoff; a success resets it.
    pub fn start(self: Arc<Self>) -> SchedulerHandle {
        let (trigger_tx, mut trigger_rx) = mpsc::channel(8);
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);

        let task = tokio::spawn(async move {
            let mut backoff = match self.config() {
                Ok(config) => Backoff::new(&config.backoff),
                Err(_) => Backoff::new(&BackoffConfig::default()),
            };
            let mut delay = self.scheduled_or_log();
            debug!(?delay, "Refresh scheduler started");

            loop {
                tokio::select! {
                    _ = shutdown_rx.changed() => break,
                    trigger = trigger_rx.recv() => match trigger {
                        Some(Trigger::RefreshNow(reply)) => {
                            let outcome = self.run_once().await;
                            delay = self.delay_after(&outcome, &mut backoff);
                            let _ = reply.send(outcome);
                        }
                        Some(Trigger::Reschedule(config)) => {
                            backoff = Backoff::new(&config.backoff);
                            if let Err(err) = self.set_config(config) {
                                error!(error = ?err, "Cannot apply refresh config");
                            }
                            delay = self.scheduled_or_log();
                            info!(?delay, "Refresh rescheduled");
                        }
                        None => break,
                    },
                    _ = tokio::time::sleep(delay.unwrap_or_default()), if delay.is_some() => {
                        let outcome = self.run_once().await;
                        delay = self.delay_after(&outcome, &mut backoff);
                        debug!(?delay, "Next refresh scheduled");
                    }
                }
            }
            debug!("Refresh scheduler stopped");
        });

        SchedulerHandle {
            triggers: trigger_tx,
            shutdown: shutdown_tx,
            task,
        }
    }
}

/// Controls a running refresh loop.
pub struct SchedulerHandle {
    triggers: mpsc::Sender<Trigger>,
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl SchedulerHandle {
    /// Requests an immediate refresh and waits for its outcome.
    pub async fn refresh_now(&self) -> Result<RefreshOutcome> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.triggers
            .send(Trigger::RefreshNow(reply_tx))
            .await
            .map_err(|_| anyhow!("Refresh scheduler is not running"))?;
        reply_rx.await.context("Refresh did not complete")?
    }

    /// Replaces the refresh configuration and the pending schedule.
    pub async fn reschedule(&self, config: RefreshConfig) -> Result<()> {
        self.triggers
            .send(Trigger::Reschedule(config))
            .await
            .map_err(|_| anyhow!("Refresh scheduler is not running"))
    }

    pub async fn shutdown(self) -> Result<()> {
        let _ = self.shutdown.send(true);
        self.task.await.context("Refresh scheduler panicked")
    }
}
