use crate::core::module::QuoteModule;
use crate::core::quote::QuoteData;
use crate::store::QuoteDatabase;
use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;

/// Replays a random collected quote.
pub struct CollectionsModule {
    database: Arc<QuoteDatabase>,
}

impl CollectionsModule {
    pub const ID: &'static str = "collections";

    pub fn new(database: Arc<QuoteDatabase>) -> Self {
        Self { database }
    }
}

#[async_trait]
impl QuoteModule for CollectionsModule {
    fn id(&self) -> &'static str {
        Self::ID
    }

    fn display_name(&self) -> &'static str {
        "Collections"
    }

    fn requires_internet(&self) -> bool {
        false
    }

    async fn fetch_quote(&self) -> Result<Option<QuoteData>> {
        let quote = match self.database.collections.random()? {
            // Keep the original provider and uid so the quote stays recognisable.
            Some(entity) => QuoteData::from(entity),
            None => QuoteData::placeholder(
                "No collected quotes yet",
                "quotelock collection add",
            ),
        };
        Ok(Some(quote))
    }
}
