use super::{
    brainyquote::BrainyQuoteModule, collections::CollectionsModule, custom::CustomQuoteModule,
    fortune::FortuneModule, freakuotes::FreakuotesModule, hitokoto::HitokotoModule,
    jinrishici::JinrishiciModule, libquotes::LibquotesModule, natune::NatuneModule,
    openai::OpenAiModule, wikiquote::WikiquoteModule,
};
use crate::core::config::{AppConfig, DEFAULT_MODULE};
use crate::core::module::{QuoteModule, QuoteModuleData};
use crate::store::QuoteDatabase;
use anyhow::{Result, anyhow};
use std::sync::Arc;
use tracing::debug;

/// Quote modules in registration order, looked up by id.
#[derive(Default)]
pub struct ModuleRegistry {
    modules: Vec<Arc<dyn QuoteModule>>,
}

impl ModuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers every built-in module.
    pub fn from_config(config: &AppConfig, database: Arc<QuoteDatabase>) -> Result<Self> {
        let providers = &config.providers;
        let mut registry = Self::new();

        registry.register(Arc::new(HitokotoModule::new(
            providers.hitokoto.as_ref().map_or(HitokotoModule::DEFAULT_BASE_URL, |p| &p.base_url),
            providers.hitokoto.as_ref().map_or(&[] as &[String], |p| p.types.as_slice()),
        )?));
        registry.register(Arc::new(WikiquoteModule::new(
            providers.wikiquote.as_ref().map_or("", |p| &p.language),
            providers.wikiquote.as_ref().and_then(|p| p.base_url.as_deref()),
        )?));
        registry.register(Arc::new(JinrishiciModule::new(
            providers.jinrishici.as_ref().map_or(JinrishiciModule::DEFAULT_BASE_URL, |p| &p.base_url),
            database.prefs.clone(),
        )?));
        registry.register(Arc::new(FreakuotesModule::new(
            providers.freakuotes.as_ref().map_or(FreakuotesModule::DEFAULT_BASE_URL, |p| &p.base_url),
        )?));
        registry.register(Arc::new(NatuneModule::new(
            providers.natune.as_ref().map_or(NatuneModule::DEFAULT_BASE_URL, |p| &p.base_url),
        )?));
        registry.register(Arc::new(BrainyQuoteModule::new(
            providers.brainyquote.as_ref().map_or(BrainyQuoteModule::DEFAULT_BASE_URL, |p| &p.base_url),
            providers.brainyquote.as_ref().map_or("BR", |p| &p.feed_type),
        )?));
        registry.register(Arc::new(LibquotesModule::new(
            providers.libquotes.as_ref().map_or(LibquotesModule::DEFAULT_BASE_URL, |p| &p.base_url),
        )?));
        registry.register(Arc::new(FortuneModule::new(
            providers.fortune.clone().unwrap_or_default(),
            Arc::clone(&database),
        )));
        registry.register(Arc::new(CustomQuoteModule::new(Arc::clone(&database))));
        registry.register(Arc::new(CollectionsModule::new(Arc::clone(&database))));
        registry.register(Arc::new(OpenAiModule::new(
            providers.openai.clone().unwrap_or_default(),
        )?));

        debug!(count = registry.modules.len(), "Registered quote modules");
        Ok(registry)
    }

    /// Adds a module, replacing one with the same id in place.
    pub fn register(&mut self, module: Arc<dyn QuoteModule>) {
        match self.modules.iter().position(|m| m.id() == module.id()) {
            Some(index) => self.modules[index] = module,
            None => self.modules.push(module),
        }
    }

    pub fn get(&self, id: &str) -> Result<Arc<dyn QuoteModule>> {
        self.modules
            .iter()
            .find(|m| m.id() == id)
            .cloned()
            .ok_or_else(|| anyhow!("Quote module not found: {id}"))
    }

    pub fn contains(&self, id: &str) -> bool {
        self.modules.iter().any(|m| m.id() == id)
    }

    pub fn modules(&self) -> &[Arc<dyn QuoteModule>] {
        &self.modules
    }

    pub fn module_data(&self, id: &str) -> Result<QuoteModuleData> {
        Ok(QuoteModuleData::from(self.get(id)?.as_ref()))
    }

    pub fn default_id(&self) -> &'static str {
        DEFAULT_MODULE
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::module::NEVER_REFRESH;
    use tempfile::tempdir;

    fn registry() -> (tempfile::TempDir, ModuleRegistry) {
        let dir = tempdir().unwrap();
        let database = Arc::new(QuoteDatabase::open(dir.path()).unwrap());
        let registry = ModuleRegistry::from_config(&AppConfig::default(), database).unwrap();
        (dir, registry)
    }

    #[test]
    fn test_builtin_modules_in_order() {
        let (_dir, registry) = registry();
        let ids: Vec<_> = registry.modules().iter().map(|m| m.id()).collect();
        assert_eq!(
            ids,
            vec![
                "hitokoto",
                "wikiquote",
                "jinrishici",
                "freakuotes",
                "natune",
                "brainyquote",
                "libquotes",
                "fortune",
                "custom",
                "collections",
                "openai",
            ]
        );
        assert!(registry.contains(registry.default_id()));
    }

    #[test]
    fn test_module_data() {
        let (_dir, registry) = registry();
        let wikiquote = registry.module_data("wikiquote").unwrap();
        assert_eq!(wikiquote.minimum_refresh_interval, 86_400);
        assert!(wikiquote.requires_internet);

        let custom = registry.module_data("custom").unwrap();
        assert!(!custom.requires_internet);
        assert_ne!(custom.minimum_refresh_interval, NEVER_REFRESH);
    }

    #[test]
    fn test_unknown_module() {
        let (_dir, registry) = registry();
        assert!(!registry.contains("nope"));
        let err = registry.get("nope").err().unwrap();
        assert!(err.to_string().contains("not found"));
    }

    #[test]
    fn test_register_replaces_in_place() {
        let (_dir, mut registry) = registry();
        let dir = tempdir().unwrap();
        let database = Arc::new(QuoteDatabase::open(dir.path()).unwrap());
        registry.register(Arc::new(CustomQuoteModule::new(database)));
        assert_eq!(registry.modules().len(), 11);
        assert_eq!(registry.modules()[8].id(), "custom");
    }
}
