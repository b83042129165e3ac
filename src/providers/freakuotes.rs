use super::util::{element_text, fetch_text, http_client, selector};
use crate::core::module::{CharacterType, QuoteModule};
use crate::core::quote::QuoteData;
use anyhow::Result;
use async_trait::async_trait;
use scraper::Html;
use tracing::{error, instrument, warn};

/// Random Spanish quotes scraped from freakuotes.com.
pub struct FreakuotesModule {
    base_url: String,
    client: reqwest::Client,
}

impl FreakuotesModule {
    pub const ID: &'static str = "freakuotes";
    pub const DEFAULT_BASE_URL: &'static str = "https://freakuotes.com";

    pub fn new(base_url: &str) -> Result<Self> {
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: http_client()?,
        })
    }

    fn parse(html: &str) -> Result<Option<QuoteData>> {
        let document = Html::parse_document(html);
        let container = selector(".quote-container > blockquote")?;
        let Some(quote) = document.select(&container).next() else {
            error!("Failed to find quote container");
            return Ok(None);
        };

        let paragraph = selector("p")?;
        let text = quote
            .select(&paragraph)
            .map(|p| element_text(&p))
            .collect::<Vec<_>>()
            .join(" ");
        if text.is_empty() {
            error!("Failed to find quote text");
            return Ok(None);
        }

        let left = quote
            .select(&selector("footer > span")?)
            .map(|e| element_text(&e))
            .collect::<Vec<_>>()
            .join(" ");
        let right = quote
            .select(&selector("footer > cite")?)
            .next()
            .and_then(|e| e.value().attr("title"))
            .unwrap_or_default()
            .to_string();
        let source = match (left.is_empty(), right.is_empty()) {
            (true, true) => {
                warn!("Quote source not found");
                String::new()
            }
            (true, false) => right,
            (false, true) => left,
            (false, false) => format!("{left}, {right}"),
        };
        Ok(Some(QuoteData::new(&text, &source, "", Self::ID)))
    }
}

#[async_trait]
impl QuoteModule for FreakuotesModule {
    fn id(&self) -> &'static str {
        Self::ID
    }

    fn display_name(&self) -> &'static str {
        "Freakuotes"
    }

    fn character_type(&self) -> CharacterType {
        CharacterType::Latin
    }

    #[instrument(name = "FreakuotesFetch", skip(self))]
    async fn fetch_quote(&self) -> Result<Option<QuoteData>> {
        let url = format!("{}/frase/aleatoria", self.base_url);
        let html = fetch_text(&self.client, &url).await?;
        Self::parse(&html)
    }
}
