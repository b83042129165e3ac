use super::util::{fetch_text, http_client};
use crate::core::module::{CharacterType, QuoteModule};
use crate::core::quote::QuoteData;
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use tracing::{error, instrument};

#[derive(Debug, Deserialize)]
struct HitokotoResponse {
    hitokoto: String,
    from: Option<String>,
    from_who: Option<String>,
}

/// Sentences from hitokoto.cn, filtered by category letters.
pub struct HitokotoModule {
    base_url: String,
    types: Vec<String>,
    client: reqwest::Client,
}

impl HitokotoModule {
    pub const ID: &'static str = "hitokoto";
    pub const DEFAULT_BASE_URL: &'static str = "https://v1.hitokoto.cn";

    /// An empty `types` list selects category `a`.
    pub fn new(base_url: &str, types: &[String]) -> Result<Self> {
        let types = if types.is_empty() {
            vec!["a".to_string()]
        } else {
            types.to_vec()
        };
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            types,
            client: http_client()?,
        })
    }

    fn url(&self) -> String {
        let query: Vec<String> = self.types.iter().map(|t| format!("c={t}")).collect();
        format!("{}/?{}", self.base_url, query.join("&"))
    }
}

#[async_trait]
impl QuoteModule for HitokotoModule {
    fn id(&self) -> &'static str {
        Self::ID
    }

    fn display_name(&self) -> &'static str {
        "Hitokoto"
    }

    fn character_type(&self) -> CharacterType {
        CharacterType::Cjk
    }

    #[instrument(name = "HitokotoFetch", skip(self), fields(types = ?self.types))]
    async fn fetch_quote(&self) -> Result<Option<QuoteData>> {
        let body = fetch_text(&self.client, &self.url()).await?;
        let response: HitokotoResponse = match serde_json::from_str(&body) {
            Ok(data) => data,
            Err(e) => {
                error!(error = ?e, response = %body, "Failed to parse hitokoto response");
                return Err(e).context("Failed to parse hitokoto response");
            }
        };
        Ok(Some(QuoteData::new(
            &response.hitokoto,
            response.from.as_deref().unwrap_or_default(),
            response.from_who.as_deref().unwrap_or_default(),
            Self::ID,
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_fetch_quote() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/"))
            .and(query_param("c", "d"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"{"id":1,"hitokoto":"人生若只如初见","type":"d","from":"木兰词","from_who":null}"#,
            ))
            .mount(&server)
            .await;

        let module = HitokotoModule::new(&server.uri(), &["d".to_string()]).unwrap();
        let quote = module.fetch_quote().await.unwrap().unwrap();
        assert_eq!(quote.text, "人生若只如初见");
        assert_eq!(quote.source, "木兰词");
        assert_eq!(quote.author, "");
        assert_eq!(quote.provider, "hitokoto");
    }

    #[test]
    fn test_url_lists_every_type() {
        let module =
            HitokotoModule::new("http://host/", &["a".to_string(), "k".to_string()]).unwrap();
        assert_eq!(module.url(), "http://host/?c=a&c=k");
        let module = HitokotoModule::new("http://host", &[]).unwrap();
        assert_eq!(module.url(), "http://host/?c=a");
    }

    #[tokio::test]
    async fn test_malformed_response_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let module = HitokotoModule::new(&server.uri(), &[]).unwrap();
        assert!(module.fetch_quote().await.is_err());
    }
}
