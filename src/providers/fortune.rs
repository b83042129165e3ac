use crate::core::config::FortuneProviderConfig;
use crate::core::module::QuoteModule;
use crate::core::quote::QuoteData;
use crate::store::QuoteDatabase;
use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

/// Unix fortune cookies imported into the local database.
pub struct FortuneModule {
    config: FortuneProviderConfig,
    database: Arc<QuoteDatabase>,
}

impl FortuneModule {
    pub const ID: &'static str = "fortune";

    pub fn new(config: FortuneProviderConfig, database: Arc<QuoteDatabase>) -> Self {
        Self { config, database }
    }

    /// `None` and `"all"` both mean every category.
    fn category(&self) -> Option<&str> {
        self.config
            .category
            .as_deref()
            .filter(|category| !category.is_empty() && *category != "all")
    }
}

#[async_trait]
impl QuoteModule for FortuneModule {
    fn id(&self) -> &'static str {
        Self::ID
    }

    fn display_name(&self) -> &'static str {
        "Fortune"
    }

    fn requires_internet(&self) -> bool {
        false
    }

    async fn fetch_quote(&self) -> Result<Option<QuoteData>> {
        let entry = self
            .database
            .fortunes
            .random(self.category(), self.config.max_length)?;
        debug!(found = entry.is_some(), "Fortune lookup");
        Ok(entry.map(|entry| QuoteData::new(&entry.text, &entry.source, &entry.author, Self::ID)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::fortune::FortuneEntity;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_fetch_respects_category() {
        let dir = tempdir().unwrap();
        let database = Arc::new(QuoteDatabase::open(dir.path()).unwrap());
        let config = FortuneProviderConfig {
            category: Some("art".to_string()),
            ..Default::default()
        };
        let module = FortuneModule::new(config, Arc::clone(&database));
        assert!(module.fetch_quote().await.unwrap().is_none());

        database
            .fortunes
            .insert(&mut FortuneEntity::new("Not art", "", "science"))
            .unwrap();
        assert!(module.fetch_quote().await.unwrap().is_none());

        database
            .fortunes
            .insert(&mut FortuneEntity::new("Art is long", "Hippocrates", "art"))
            .unwrap();
        let quote = module.fetch_quote().await.unwrap().unwrap();
        assert_eq!(quote.text, "Art is long");
        assert_eq!(quote.source, "Hippocrates");
    }

    #[tokio::test]
    async fn test_all_means_any_category() {
        let dir = tempdir().unwrap();
        let database = Arc::new(QuoteDatabase::open(dir.path()).unwrap());
        database
            .fortunes
            .insert(&mut FortuneEntity::new("Anything", "", "misc"))
            .unwrap();
        let config = FortuneProviderConfig {
            category: Some("all".to_string()),
            ..Default::default()
        };
        let module = FortuneModule::new(config, database);
        assert!(module.fetch_quote().await.unwrap().is_some());
    }
}
