use super::util::{http_client, with_retry};
use crate::core::module::{CharacterType, QuoteModule};
use crate::core::quote::QuoteData;
use crate::store::prefs::ModulePreferences;
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, error, instrument};

const TOKEN_PREF: &str = "token";

#[derive(Debug, Deserialize)]
struct TokenResponse {
    data: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SentenceResponse {
    status: String,
    #[serde(default)]
    errcode: Option<Value>,
    data: Option<SentenceData>,
}

#[derive(Debug, Deserialize)]
struct SentenceData {
    content: Option<String>,
    origin: Option<Origin>,
}

#[derive(Debug, Deserialize, Serialize)]
struct Origin {
    #[serde(default)]
    dynasty: String,
    #[serde(default)]
    author: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    content: Vec<String>,
}

/// Classical Chinese poetry lines from jinrishici.com.
///
/// The API hands out a user token once; it is kept in the module preferences
/// and sent with every sentence request.
pub struct JinrishiciModule {
    base_url: String,
    prefs: ModulePreferences,
    client: reqwest::Client,
}

impl JinrishiciModule {
    pub const ID: &'static str = "jinrishici";
    pub const DEFAULT_BASE_URL: &'static str = "https://v2.jinrishici.com";

    pub fn new(base_url: &str, prefs: ModulePreferences) -> Result<Self> {
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            prefs,
            client: http_client()?,
        })
    }

    async fn token(&self) -> Result<Option<String>> {
        if let Some(token) = self.prefs.get(Self::ID, TOKEN_PREF)?
            && !token.trim().is_empty()
        {
            return Ok(Some(token));
        }
        let url = format!("{}/token", self.base_url);
        let response: TokenResponse = with_retry(
            || async { self.client.get(&url).send().await?.error_for_status()?.json().await },
            2,
            500,
        )
        .await
        .context("Token request failed")?;
        match response.data.filter(|token| !token.is_empty()) {
            Some(token) => {
                debug!("Obtained jinrishici token");
                self.prefs.put(Self::ID, TOKEN_PREF, &token)?;
                Ok(Some(token))
            }
            None => {
                error!("Failed to get jinrishici token");
                Ok(None)
            }
        }
    }
}

#[async_trait]
impl QuoteModule for JinrishiciModule {
    fn id(&self) -> &'static str {
        Self::ID
    }

    fn display_name(&self) -> &'static str {
        "Jinrishici"
    }

    fn character_type(&self) -> CharacterType {
        CharacterType::Cjk
    }

    #[instrument(name = "JinrishiciFetch", skip(self))]
    async fn fetch_quote(&self) -> Result<Option<QuoteData>> {
        let Some(token) = self.token().await? else {
            return Ok(None);
        };
        let url = format!("{}/sentence", self.base_url);
        let response: SentenceResponse = with_retry(
            || async {
                self.client
                    .get(&url)
                    .header("X-User-Token", &token)
                    .send()
                    .await?
                    .error_for_status()?
                    .json()
                    .await
            },
            2,
            500,
        )
        .await
        .context("Sentence request failed")?;

        if response.status != "success" {
            error!(errcode = ?response.errcode, "Jinrishici returned an error status");
            return Ok(None);
        }
        let Some(data) = response.data else {
            return Ok(None);
        };
        let Some(text) = data.content.filter(|text| !text.is_empty()) else {
            return Ok(None);
        };

        let Some(origin) = data.origin else {
            return Ok(Some(QuoteData::new(&text, "", "", Self::ID)));
        };
        let mut author = origin.dynasty.clone();
        if !origin.author.is_empty() {
            author.push('·');
            author.push_str(&origin.author);
        }
        let source = if origin.title.is_empty() {
            String::new()
        } else {
            format!("《{}》", origin.title)
        };
        let quote = QuoteData::new(&text, &source, &author, Self::ID)
            .with_extra(serde_json::to_vec(&origin)?);
        Ok(Some(quote))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::QuoteDatabase;
    use tempfile::tempdir;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const SENTENCE: &str = r#"{
        "status": "success",
        "data": {
            "id": "5b8b9572e116fb3714e6faba",
            "content": "落霞与孤鹜齐飞，秋水共长天一色。",
            "origin": {
                "title": "滕王阁序",
                "dynasty": "唐代",
                "author": "王勃",
                "content": ["豫章故郡，洪都新府。"]
            }
        }
    }"#;

    #[tokio::test]
    async fn test_fetch_quote_caches_token() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/token"))
            .respond_with(
                ResponseTemplate::new(200).set_body_string(r#"{"status":"success","data":"tok"}"#),
            )
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/sentence"))
            .and(header("X-User-Token", "tok"))
            .respond_with(ResponseTemplate::new(200).set_body_string(SENTENCE))
            .expect(2)
            .mount(&server)
            .await;

        let dir = tempdir().unwrap();
        let database = QuoteDatabase::open(dir.path()).unwrap();
        let module = JinrishiciModule::new(&server.uri(), database.prefs.clone()).unwrap();

        let quote = module.fetch_quote().await.unwrap().unwrap();
        assert_eq!(quote.text, "落霞与孤鹜齐飞，秋水共长天一色。");
        assert_eq!(quote.source, "《滕王阁序》");
        assert_eq!(quote.author, "唐代·王勃");
        assert!(quote.extra.is_some());

        module.fetch_quote().await.unwrap().unwrap();
        assert_eq!(
            database.prefs.get("jinrishici", "token").unwrap().as_deref(),
            Some("tok")
        );
    }

    #[tokio::test]
    async fn test_error_status_has_no_quote() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/sentence"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(r#"{"status":"error","errcode":1001,"errMessage":"bad"}"#),
            )
            .mount(&server)
            .await;

        let dir = tempdir().unwrap();
        let database = QuoteDatabase::open(dir.path()).unwrap();
        database.prefs.put("jinrishici", "token", "stale").unwrap();
        let module = JinrishiciModule::new(&server.uri(), database.prefs.clone()).unwrap();
        assert!(module.fetch_quote().await.unwrap().is_none());
    }
}
