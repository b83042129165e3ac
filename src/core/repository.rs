//! Quote acquisition: fetch from the active module, record, publish

use super::module::QuoteModule;
use super::quote::{QuoteData, QuoteDataWithCollectState};
use crate::providers::registry::ModuleRegistry;
use crate::store::QuoteDatabase;
use anyhow::{Result, anyhow};
use chrono::{DateTime, Utc};
use std::path::Path;
use std::sync::{Arc, RwLock};
use tokio::sync::watch;
use tracing::{debug, error, info};

pub struct QuoteRepository {
    registry: Arc<ModuleRegistry>,
    database: Arc<QuoteDatabase>,
    module_id: RwLock<String>,
}

impl QuoteRepository {
    pub fn new(registry: Arc<ModuleRegistry>, database: Arc<QuoteDatabase>, module_id: &str) -> Self {
        Self {
            registry,
            database,
            module_id: RwLock::new(module_id.to_string()),
        }
    }

    pub fn registry(&self) -> &Arc<ModuleRegistry> {
        &self.registry
    }

    pub fn database(&self) -> &Arc<QuoteDatabase> {
        &self.database
    }

    pub fn module_id(&self) -> Result<String> {
        self.module_id
            .read()
            .map(|id| id.clone())
            .map_err(|_| anyhow!("Module selection lock poisoned"))
    }

    /// Switches the active module. Unknown ids are rejected.
    pub fn select_module(&self, id: &str) -> Result<()> {
        self.registry.get(id)?;
        let mut module_id = self
            .module_id
            .write()
            .map_err(|_| anyhow!("Module selection lock poisoned"))?;
        *module_id = id.to_string();
        info!(module = id, "Selected quote module");
        Ok(())
    }

    pub fn active_module(&self) -> Result<Arc<dyn QuoteModule>> {
        self.registry.get(&self.module_id()?)
    }

    /// Fetches a quote from the active module and makes it current.
    ///
    /// Returns `Ok(None)` when the module is unknown, fails or has no quote;
    /// those cases are logged. Storage failures are returned as errors.
    pub async fn download_quote(&self) -> Result<Option<QuoteDataWithCollectState>> {
        let module_id = self.module_id()?;
        let module = match self.registry.get(&module_id) {
            Ok(module) => module,
            Err(err) => {
                error!(module = %module_id, error = %err, "Selected module not found");
                return Ok(None);
            }
        };
        debug!(provider = module.display_name(), "Downloading quote");

        let quote = match module.fetch_quote().await {
            Ok(Some(quote)) => quote,
            Ok(None) => {
                info!(module = %module_id, "Module returned no quote");
                return Ok(None);
            }
            Err(err) => {
                error!(module = %module_id, error = ?err, "Quote download failed");
                return Ok(None);
            }
        };
        self.handle_downloaded_quote(quote).map(Some)
    }

    /// Records `quote` in history and stores it as the current quote.
    pub fn handle_downloaded_quote(&self, quote: QuoteData) -> Result<QuoteDataWithCollectState> {
        debug!(text = %quote.text, source = %quote.source, author = %quote.author, "Downloaded quote");
        if !quote.is_placeholder() {
            self.database.histories.insert(&quote)?;
        }
        let collected = self
            .database
            .collections
            .find_by_quote(&quote.text, &quote.source, &quote.author)?
            .is_some();
        self.database
            .state
            .set_current(&quote, Some(collected), Utc::now())?;
        Ok(quote.with_collect_state(Some(collected)))
    }

    pub fn set_collection_state(&self, state: bool) -> Result<()> {
        self.database.state.set_collect_state(Some(state))
    }

    /// Recomputes the current quote's collect state from the collection.
    pub fn sync_collection_state(&self) -> Result<()> {
        let Some(current) = self.current_quote()? else {
            return Ok(());
        };
        let quote = &current.quote;
        let collected = self
            .database
            .collections
            .find_by_quote(&quote.text, &quote.source, &quote.author)?
            .is_some();
        if current.collect_state != Some(collected) {
            debug!(collected, "Collect state of current quote changed");
            self.set_collection_state(collected)?;
        }
        Ok(())
    }

    /// Replaces the collection with the rows of the CSV at `path`.
    pub fn import_collection(&self, path: &Path) -> Result<usize> {
        let count = self.database.collections.import_csv(path)?;
        self.sync_collection_state()?;
        Ok(count)
    }

    pub fn clear_collection(&self) -> Result<()> {
        self.database.collections.clear()?;
        self.sync_collection_state()
    }

    /// Adds the current quote to the collection. Returns false when there is
    /// no current quote or it is a placeholder.
    pub fn collect_current(&self) -> Result<bool> {
        let Some(current) = self.current_quote()? else {
            return Ok(false);
        };
        if current.quote.is_placeholder() {
            return Ok(false);
        }
        self.database.collections.insert(&current.quote)?;
        self.set_collection_state(true)?;
        Ok(true)
    }

    /// Removes the current quote from the collection. Returns false when it
    /// was not collected.
    pub fn uncollect_current(&self) -> Result<bool> {
        let Some(current) = self.current_quote()? else {
            return Ok(false);
        };
        let quote = &current.quote;
        let removed = match self
            .database
            .collections
            .find_by_quote(&quote.text, &quote.source, &quote.author)?
        {
            Some(entity) => match entity.id {
                Some(id) => self.database.collections.delete(id)?,
                None => false,
            },
            None => false,
        };
        self.set_collection_state(false)?;
        Ok(removed)
    }

    pub fn current_quote(&self) -> Result<Option<QuoteDataWithCollectState>> {
        self.database.state.current()
    }

    pub fn last_update_time(&self) -> Result<Option<DateTime<Utc>>> {
        self.database.state.last_updated()
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<QuoteDataWithCollectState>> {
        self.database.state.subscribe()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::core::module::QuoteModule;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use tempfile::tempdir;

    /// Serves queued results, then `Ok(None)`.
    pub(crate) struct ScriptedModule {
        pub id: &'static str,
        pub requires_internet: bool,
        pub minimum_refresh_interval: u32,
        pub results: Mutex<Vec<Result<Option<QuoteData>>>>,
        pub calls: Mutex<Vec<tokio::time::Instant>>,
    }

    impl ScriptedModule {
        pub(crate) fn new(id: &'static str, results: Vec<Result<Option<QuoteData>>>) -> Self {
            Self {
                id,
                requires_internet: true,
                minimum_refresh_interval: 0,
                results: Mutex::new(results.into_iter().rev().collect()),
                calls: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl QuoteModule for ScriptedModule {
        fn id(&self) -> &'static str {
            self.id
        }

        fn display_name(&self) -> &'static str {
            "Scripted"
        }

        fn minimum_refresh_interval(&self) -> u32 {
            self.minimum_refresh_interval
        }

        fn requires_internet(&self) -> bool {
            self.requires_internet
        }

        async fn fetch_quote(&self) -> Result<Option<QuoteData>> {
            self.calls.lock().unwrap().push(tokio::time::Instant::now());
            self.results.lock().unwrap().pop().unwrap_or(Ok(None))
        }
    }

    pub(crate) fn repository_with(
        module: Arc<dyn QuoteModule>,
        dir: &std::path::Path,
    ) -> QuoteRepository {
        let mut registry = ModuleRegistry::new();
        let id = module.id();
        registry.register(module);
        let database = Arc::new(QuoteDatabase::open(dir).unwrap());
        QuoteRepository::new(Arc::new(registry), database, id)
    }

    #[tokio::test]
    async fn test_download_records_history_and_state() {
        let dir = tempdir().unwrap();
        let quote = QuoteData::new("Stay hungry", "Speech", "Jobs", "scripted");
        let module = Arc::new(ScriptedModule::new("scripted", vec![Ok(Some(quote.clone()))]));
        let repository = repository_with(module, dir.path());
        let mut updates = repository.subscribe();

        let current = repository.download_quote().await.unwrap().unwrap();
        assert_eq!(current.quote, quote);
        assert_eq!(current.collect_state, Some(false));
        assert_eq!(repository.database().histories.count().unwrap(), 1);
        assert!(repository.last_update_time().unwrap().is_some());
        assert!(updates.has_changed().unwrap());
        assert_eq!(
            updates.borrow_and_update().clone().unwrap().quote.text,
            "Stay hungry"
        );
    }

    #[tokio::test]
    async fn test_download_failures_return_none() {
        let dir = tempdir().unwrap();
        let module = Arc::new(ScriptedModule::new(
            "scripted",
            vec![Err(anyhow!("boom")), Ok(None)],
        ));
        let repository = repository_with(module, dir.path());

        assert!(repository.download_quote().await.unwrap().is_none());
        assert!(repository.download_quote().await.unwrap().is_none());
        assert!(repository.current_quote().unwrap().is_none());
        assert!(repository.last_update_time().unwrap().is_none());
    }

    #[tokio::test]
    async fn test_unknown_module_is_not_selectable() {
        let dir = tempdir().unwrap();
        let module = Arc::new(ScriptedModule::new("scripted", vec![]));
        let repository = repository_with(module, dir.path());
        assert!(repository.select_module("missing").is_err());
        assert_eq!(repository.module_id().unwrap(), "scripted");
    }

    #[test]
    fn test_placeholder_skips_history() {
        let dir = tempdir().unwrap();
        let module = Arc::new(ScriptedModule::new("scripted", vec![]));
        let repository = repository_with(module, dir.path());

        let placeholder = QuoteData::placeholder("Add a quote first", "quotelock");
        repository.handle_downloaded_quote(placeholder).unwrap();
        assert_eq!(repository.database().histories.count().unwrap(), 0);
        assert!(repository.current_quote().unwrap().unwrap().quote.is_placeholder());

        assert!(!repository.collect_current().unwrap());
        assert_eq!(repository.database().collections.count().unwrap(), 0);
        assert_eq!(repository.current_quote().unwrap().unwrap().collect_state, Some(false));
    }

    #[test]
    fn test_collect_and_uncollect_current() {
        let dir = tempdir().unwrap();
        let module = Arc::new(ScriptedModule::new("scripted", vec![]));
        let repository = repository_with(module, dir.path());
        assert!(!repository.collect_current().unwrap());

        let quote = QuoteData::new("Keep", "It", "", "scripted");
        repository.handle_downloaded_quote(quote.clone()).unwrap();
        assert!(repository.collect_current().unwrap());
        assert_eq!(repository.current_quote().unwrap().unwrap().collect_state, Some(true));

        // Seeing the same quote again reports it as collected.
        let again = repository.handle_downloaded_quote(quote).unwrap();
        assert_eq!(again.collect_state, Some(true));

        assert!(repository.uncollect_current().unwrap());
        assert!(!repository.uncollect_current().unwrap());
        assert_eq!(repository.current_quote().unwrap().unwrap().collect_state, Some(false));
        assert_eq!(repository.database().collections.count().unwrap(), 0);
    }

    #[test]
    fn test_import_updates_collect_state() {
        let dir = tempdir().unwrap();
        let module = Arc::new(ScriptedModule::new("scripted", vec![]));
        let repository = repository_with(module, dir.path());

        let quote = QuoteData::new("Keep", "It", "", "scripted");
        repository.handle_downloaded_quote(quote.clone()).unwrap();
        assert!(repository.collect_current().unwrap());
        let mut updates = repository.subscribe();
        let _ = updates.borrow_and_update();

        let other = dir.path().join("other.csv");
        std::fs::write(
            &other,
            "id,text,source,author,provider,uid,extra\n7,Other,Book,,custom,abc,\n",
        )
        .unwrap();
        assert_eq!(repository.import_collection(&other).unwrap(), 1);
        assert_eq!(repository.current_quote().unwrap().unwrap().collect_state, Some(false));
        assert!(updates.has_changed().unwrap());
        assert_eq!(
            updates.borrow_and_update().clone().unwrap().collect_state,
            Some(false)
        );

        let exported = dir.path().join("exported.csv");
        repository.database().collections.insert(&quote).unwrap();
        repository.database().collections.export_csv(&exported).unwrap();
        repository.clear_collection().unwrap();
        assert_eq!(repository.current_quote().unwrap().unwrap().collect_state, Some(false));
        assert_eq!(repository.import_collection(&exported).unwrap(), 2);
        assert_eq!(repository.current_quote().unwrap().unwrap().collect_state, Some(true));
    }
}
