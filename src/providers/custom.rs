use crate::core::module::QuoteModule;
use crate::core::quote::QuoteData;
use crate::store::QuoteDatabase;
use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;

/// A random quote entered by the user.
pub struct CustomQuoteModule {
    database: Arc<QuoteDatabase>,
}

impl CustomQuoteModule {
    pub const ID: &'static str = "custom";

    pub fn new(database: Arc<QuoteDatabase>) -> Self {
        Self { database }
    }
}

#[async_trait]
impl QuoteModule for CustomQuoteModule {
    fn id(&self) -> &'static str {
        Self::ID
    }

    fn display_name(&self) -> &'static str {
        "Custom quotes"
    }

    fn requires_internet(&self) -> bool {
        false
    }

    async fn fetch_quote(&self) -> Result<Option<QuoteData>> {
        let quote = match self.database.custom_quotes.random()? {
            Some(entity) => QuoteData::new(&entity.text, &entity.source, &entity.author, Self::ID),
            None => QuoteData::placeholder(
                "Add some quotes first",
                "quotelock custom add <text> --source <source>",
            ),
        };
        Ok(Some(quote))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_empty_table_yields_placeholder() {
        let dir = tempdir().unwrap();
        let database = Arc::new(QuoteDatabase::open(dir.path()).unwrap());
        let module = CustomQuoteModule::new(Arc::clone(&database));

        assert!(module.fetch_quote().await.unwrap().unwrap().is_placeholder());

        database.custom_quotes.insert("Mine", "Me", "").unwrap();
        let quote = module.fetch_quote().await.unwrap().unwrap();
        assert_eq!(quote.text, "Mine");
        assert!(!quote.is_placeholder());
    }
}
