use super::util::{http_client, with_retry};
use crate::core::config::OpenAiProviderConfig;
use crate::core::module::QuoteModule;
use crate::core::quote::QuoteData;
use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

const SYSTEM_PROMPT: &str = "You are a literary assistant who is well-versed in literature works \
from various countries and languages. Users will input a language name and you will create a \
creative and philosophical aphorism that has never appeared in literary works in the language. \
Set the style of aphorism to be the most representative of the cultural style of the language \
region. Please provide the information in a JSON format where the keys are: \"quote\" for the \
aphorism and \"source\" for its source. All values should be presented in the language of the \
quote. If the value is unknown or empty, please set the value to an empty string(\"\").";

const MAX_TOKENS: u32 = 2000;

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeneratedQuote {
    #[serde(default)]
    quote: String,
    #[serde(default)]
    source: String,
}

/// Aphorisms generated by an OpenAI compatible chat completion endpoint.
pub struct OpenAiModule {
    config: OpenAiProviderConfig,
    client: reqwest::Client,
}

impl OpenAiModule {
    pub const ID: &'static str = "openai";

    pub fn new(mut config: OpenAiProviderConfig) -> Result<Self> {
        config.base_url = config.base_url.trim_end_matches('/').to_string();
        Ok(Self {
            config,
            client: http_client()?,
        })
    }

    fn api_key(&self) -> Option<&str> {
        self.config
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
    }
}

#[async_trait]
impl QuoteModule for OpenAiModule {
    fn id(&self) -> &'static str {
        Self::ID
    }

    fn display_name(&self) -> &'static str {
        "OpenAI"
    }

    #[instrument(name = "OpenAiFetch", skip(self), fields(model = %self.config.model))]
    async fn fetch_quote(&self) -> Result<Option<QuoteData>> {
        let Some(api_key) = self.api_key() else {
            return Ok(Some(QuoteData::placeholder(
                "Set an OpenAI API key first",
                "providers.openai.api_key",
            )));
        };

        let url = format!("{}/v1/chat/completions", self.config.base_url);
        let request = ChatRequest {
            model: &self.config.model,
            messages: vec![
                ChatMessage { role: "system", content: SYSTEM_PROMPT },
                ChatMessage { role: "user", content: &self.config.language },
            ],
            max_tokens: MAX_TOKENS,
            temperature: 0.9,
        };
        let response = with_retry(
            || async {
                self.client
                    .post(&url)
                    .bearer_auth(api_key)
                    .json(&request)
                    .send()
                    .await?
                    .error_for_status()
            },
            1,
            500,
        )
        .await;
        let response = match response {
            Ok(response) => response,
            Err(err) => {
                if let Some(reqwest_err) = err.downcast_ref::<reqwest::Error>()
                    && reqwest_err.status() == Some(reqwest::StatusCode::UNAUTHORIZED)
                {
                    bail!("OpenAI rejected the API key");
                }
                return Err(err.context("Chat completion request failed"));
            }
        };
        let chat: ChatResponse = response
            .json()
            .await
            .context("Failed to parse chat completion response")?;

        let Some(content) = chat.choices.into_iter().find_map(|choice| choice.message.content)
        else {
            debug!("Chat completion returned no content");
            return Ok(None);
        };
        let generated: GeneratedQuote = serde_json::from_str(content.trim())
            .with_context(|| format!("Unexpected quote format: {content}"))?;
        if generated.quote.trim().is_empty() {
            return Ok(None);
        }
        Ok(Some(QuoteData::new(
            generated.quote.trim(),
            generated.source.trim(),
            "",
            Self::ID,
        )))
    }
}
