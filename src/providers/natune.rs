use super::util::{element_text, fetch_text, http_client, selector};
use crate::core::module::{CharacterType, QuoteModule};
use crate::core::quote::QuoteData;
use anyhow::{Result, anyhow};
use async_trait::async_trait;
use scraper::Html;
use tracing::instrument;

/// German quotes from natune.net.
pub struct NatuneModule {
    base_url: String,
    client: reqwest::Client,
}

impl NatuneModule {
    pub const ID: &'static str = "natune";
    pub const DEFAULT_BASE_URL: &'static str = "https://natune.net";

    pub fn new(base_url: &str) -> Result<Self> {
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: http_client()?,
        })
    }

    fn parse(html: &str) -> Result<QuoteData> {
        let document = Html::parse_document(html);
        let item = document
            .select(&selector(".quotes > li")?)
            .next()
            .ok_or_else(|| anyhow!("No quote in natune page"))?;
        let text = item
            .select(&selector(".quote_text")?)
            .next()
            .map(|e| element_text(&e))
            .ok_or_else(|| anyhow!("Quote text missing from natune page"))?;
        let author = item
            .select(&selector(".quote_author")?)
            .next()
            .map(|e| element_text(&e))
            .unwrap_or_default();
        Ok(QuoteData::new(&text, "", &author, Self::ID))
    }
}

#[async_trait]
impl QuoteModule for NatuneModule {
    fn id(&self) -> &'static str {
        Self::ID
    }

    fn display_name(&self) -> &'static str {
        "Natune.net"
    }

    fn character_type(&self) -> CharacterType {
        CharacterType::Latin
    }

    #[instrument(name = "NatuneFetch", skip(self))]
    async fn fetch_quote(&self) -> Result<Option<QuoteData>> {
        let url = format!("{}/zitate/Zufalls5", self.base_url);
        let html = fetch_text(&self.client, &url).await?;
        Self::parse(&html).map(Some)
    }
}
