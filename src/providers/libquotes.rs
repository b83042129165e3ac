use super::util::{fetch_text, first_feed_item, http_client, parse_feed};
use crate::core::module::QuoteModule;
use crate::core::quote::QuoteData;
use anyhow::Result;
use async_trait::async_trait;
use tracing::{debug, instrument};

/// Quote of the day feed of libquotes.com.
pub struct LibquotesModule {
    base_url: String,
    client: reqwest::Client,
}

impl LibquotesModule {
    pub const ID: &'static str = "libquotes";
    pub const DEFAULT_BASE_URL: &'static str = "https://feeds.feedburner.com";

    pub fn new(base_url: &str) -> Result<Self> {
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: http_client()?,
        })
    }
}

#[async_trait]
impl QuoteModule for LibquotesModule {
    fn id(&self) -> &'static str {
        Self::ID
    }

    fn display_name(&self) -> &'static str {
        "Libquotes"
    }

    fn minimum_refresh_interval(&self) -> u32 {
        86_400
    }

    #[instrument(name = "LibquotesFetch", skip(self))]
    async fn fetch_quote(&self) -> Result<Option<QuoteData>> {
        let url = format!("{}/libquotes/QuoteOfTheDay", self.base_url);
        let body = fetch_text(&self.client, &url).await?;
        let Some((author, text)) = first_feed_item(&parse_feed(&body))? else {
            return Ok(None);
        };
        debug!(%text, %author, "Downloaded quote of the day");
        if text.is_empty() {
            return Ok(None);
        }
        Ok(Some(QuoteData::new(&text, "", &author, Self::ID)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_fetch_quote() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/libquotes/QuoteOfTheDay"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"<rss><channel><item><title>Seneca</title>
                <description><![CDATA[Luck is what happens when preparation meets opportunity.]]></description>
                </item></channel></rss>"#,
            ))
            .mount(&server)
            .await;

        let module = LibquotesModule::new(&server.uri()).unwrap();
        let quote = module.fetch_quote().await.unwrap().unwrap();
        assert_eq!(
            quote.text,
            "Luck is what happens when preparation meets opportunity."
        );
        assert_eq!(quote.author, "Seneca");
    }

    #[tokio::test]
    async fn test_empty_feed_has_no_quote() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<rss><channel></channel></rss>"))
            .mount(&server)
            .await;

        let module = LibquotesModule::new(&server.uri()).unwrap();
        assert!(module.fetch_quote().await.unwrap().is_none());
    }
}
