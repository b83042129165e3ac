use super::util::{element_text, fetch_text, http_client, selector};
use crate::core::module::{CharacterType, QuoteModule};
use crate::core::quote::QuoteData;
use anyhow::Result;
use async_trait::async_trait;
use regex::Regex;
use scraper::{ElementRef, Html, Node};
use std::sync::LazyLock;
use tracing::{debug, error, instrument};

/// Text and author separated by two dashes, box-drawing or em dashes.
static DASH_SEPARATED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(.*?)\s*[\u{2500}\u{2014}\-]{2}\s*(.*)$").expect("Invalid separator pattern")
});
static ITALIAN_QUOTE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\u{201C}(.*?)\u{201E}\s*(.*)$").expect("Invalid italian quote pattern")
});

const BREAK_MARKER: char = '\u{2500}';

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WikiquoteLanguage {
    English,
    Chinese,
    Japanese,
    German,
    Spanish,
    French,
    Italian,
    Portuguese,
    Russian,
    Esperanto,
}

impl WikiquoteLanguage {
    /// Unknown names fall back to English.
    pub fn from_name(name: &str) -> Self {
        match name.trim() {
            "中文" | "Chinese" => Self::Chinese,
            "日本語" | "日本语" | "Japanese" => Self::Japanese,
            "Deutsch" | "German" => Self::German,
            "Español" | "Spanish" => Self::Spanish,
            "Français" | "French" => Self::French,
            "Italiano" | "Italian" => Self::Italian,
            "Português" | "Portuguese" => Self::Portuguese,
            "Русский" | "Russian" => Self::Russian,
            "Esperanto" => Self::Esperanto,
            _ => Self::English,
        }
    }

    pub fn main_page(&self) -> &'static str {
        match self {
            Self::English => "https://en.m.wikiquote.org/wiki/Main_Page",
            Self::Chinese => "https://zh.m.wikiquote.org/zh-cn/Wikiquote:%E9%A6%96%E9%A1%B5",
            Self::Japanese => {
                "https://ja.wikiquote.org/wiki/%E3%83%A1%E3%82%A4%E3%83%B3%E3%83%9A%E3%83%BC%E3%82%B8"
            }
            Self::German => "https://de.m.wikiquote.org/wiki/Hauptseite",
            Self::Spanish => "https://es.m.wikiquote.org/wiki/Portada",
            Self::French => "https://fr.m.wikiquote.org/wiki/Wikiquote:Accueil",
            Self::Italian => "https://it.m.wikiquote.org/wiki/Pagina_principale",
            Self::Portuguese => "https://pt.m.wikiquote.org/wiki/P%C3%A1gina_principal",
            Self::Russian => {
                "https://ru.m.wikiquote.org/wiki/%D0%97%D0%B0%D0%B3%D0%BB%D0%B0%D0%B2%D0%BD%D0%B0%D1%8F_%D1%81%D1%82%D1%80%D0%B0%D0%BD%D0%B8%D1%86%D0%B0"
            }
            Self::Esperanto => "https://eo.m.wikiquote.org/wiki/%C4%88efpa%C4%9Do",
        }
    }
}

/// Text, author and source of a quote of the day.
type Parsed = (String, String, String);

/// Quote of the day from the main page of a Wikiquote edition.
pub struct WikiquoteModule {
    language: WikiquoteLanguage,
    url: String,
    client: reqwest::Client,
}

impl WikiquoteModule {
    pub const ID: &'static str = "wikiquote";

    /// `page_url` replaces the main page of `language`.
    pub fn new(language: &str, page_url: Option<&str>) -> Result<Self> {
        let language = WikiquoteLanguage::from_name(language);
        Ok(Self {
            language,
            url: page_url.unwrap_or(language.main_page()).to_string(),
            client: http_client()?,
        })
    }

    fn parse(language: WikiquoteLanguage, html: &str) -> Result<Option<Parsed>> {
        let document = Html::parse_document(html);
        match language {
            WikiquoteLanguage::English => parse_english(&document),
            WikiquoteLanguage::Chinese => parse_chinese(&document),
            WikiquoteLanguage::Japanese => parse_japanese(&document),
            WikiquoteLanguage::German => parse_german(&document),
            WikiquoteLanguage::Spanish => parse_spanish(&document),
            WikiquoteLanguage::French => parse_french(&document),
            WikiquoteLanguage::Italian => parse_italian(&document),
            WikiquoteLanguage::Portuguese => parse_portuguese(&document),
            WikiquoteLanguage::Russian => parse_russian(&document),
            WikiquoteLanguage::Esperanto => parse_esperanto(&document),
        }
    }
}

fn child_elements<'a>(element: &ElementRef<'a>) -> Vec<ElementRef<'a>> {
    element.children().filter_map(ElementRef::wrap).collect()
}

fn has_class(element: &ElementRef<'_>, class: &str) -> bool {
    element.value().classes().any(|c| c == class)
}

fn first<'a>(scope: &ElementRef<'a>, css: &str) -> Result<Option<ElementRef<'a>>> {
    Ok(scope.select(&selector(css)?).next())
}

/// Element text where the first `<br>` becomes [`BREAK_MARKER`].
fn text_with_break(element: &ElementRef<'_>) -> String {
    let mut text = String::new();
    let mut replaced = false;
    for node in element.descendants() {
        match node.value() {
            Node::Text(t) => text.push_str(t),
            Node::Element(e) if e.name() == "br" && !replaced => {
                text.push(BREAK_MARKER);
                replaced = true;
            }
            _ => {}
        }
    }
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn split_dashes(text: &str) -> Option<Parsed> {
    match DASH_SEPARATED.captures(text) {
        Some(captures) => Some((captures[1].to_string(), captures[2].to_string(), String::new())),
        None => {
            error!(%text, "Failed to parse quote");
            None
        }
    }
}

fn parse_english(document: &Html) -> Result<Option<Parsed>> {
    let cells: Vec<String> = document
        .select(&selector(r#"#mf-qotd table[style="text-align:center; width:100%"] td"#)?)
        .map(|td| element_text(&td))
        .collect();
    debug!(?cells, "Downloaded text");
    if cells.len() != 2 {
        return Ok(None);
    }
    Ok(Some((
        cells[0].clone(),
        cells[1].trim_matches('~').trim().to_string(),
        String::new(),
    )))
}

fn parse_chinese(document: &Html) -> Result<Option<Parsed>> {
    let Some(table) = document.select(&selector("#mp-everyday-quote table")?).next() else {
        return Ok(None);
    };
    let text = table
        .select(&selector("td")?)
        .map(|td| element_text(&td))
        .collect::<Vec<_>>()
        .join(" ");
    debug!(%text, "Downloaded text");
    Ok(split_dashes(&text))
}

fn parse_japanese(document: &Html) -> Result<Option<Parsed>> {
    let Some(content) = document.select(&selector(".mw-parser-output")?).next() else {
        return Ok(None);
    };
    let quote = child_elements(&content)
        .into_iter()
        .filter(|e| e.value().name() == "div")
        .find(|e| !has_class(e, "center"));
    Ok(quote.and_then(|div| split_dashes(&element_text(&div))))
}

/// Two table rows: the quote, then `author,<br>source`.
fn quote_table_rows<'a>(document: &'a Html, css: &str) -> Result<Option<Vec<ElementRef<'a>>>> {
    let Some(table) = document.select(&selector(css)?).next() else {
        return Ok(None);
    };
    let Some(body) = first(&table, "tbody")? else {
        return Ok(None);
    };
    let rows = child_elements(&body);
    Ok((rows.len() == 2).then_some(rows))
}

fn parse_german(document: &Html) -> Result<Option<Parsed>> {
    let Some(rows) = quote_table_rows(document, "#mf-ZitatdW table")? else {
        return Ok(None);
    };
    let quote = element_text(&rows[0]);
    let attribution = text_with_break(&rows[1]);
    let mut parts = attribution.splitn(2, BREAK_MARKER);
    let author = parts.next().unwrap_or_default().trim().trim_end_matches(',').to_string();
    let source = parts.next().unwrap_or_default().trim().to_string();
    Ok(Some((quote, author, source)))
}

fn parse_spanish(document: &Html) -> Result<Option<Parsed>> {
    let Some(rows) = quote_table_rows(document, "#toc table")? else {
        return Ok(None);
    };
    let quote = element_text(&rows[0])
        .trim_matches(['\u{00AB}', '\u{00BB}'])
        .trim()
        .to_string();
    let attribution = text_with_break(&rows[1]);
    let author = attribution
        .split(BREAK_MARKER)
        .next()
        .unwrap_or_default()
        .trim()
        .to_string();
    Ok(Some((quote, author, String::new())))
}

fn parse_french(document: &Html) -> Result<Option<Parsed>> {
    let Some(quote) = document.select(&selector("blockquote")?).next() else {
        return Ok(None);
    };
    let author = quote
        .next_siblings()
        .find_map(ElementRef::wrap)
        .map(|e| element_text(&e).trim_matches('\u{2014}').trim().to_string())
        .unwrap_or_default();
    let text = element_text(&quote)
        .trim_matches(['\u{00AB}', '\u{00BB}'])
        .trim()
        .to_string();
    Ok(Some((text, author, String::new())))
}

fn parse_italian(document: &Html) -> Result<Option<Parsed>> {
    let Some(container) = document.select(&selector(".main-page-qotd")?).next() else {
        return Ok(None);
    };
    let Some(quote) = child_elements(&container)
        .into_iter()
        .find(|e| !has_class(e, "main-page-heading"))
    else {
        return Ok(None);
    };
    let text = element_text(&quote);
    debug!(%text, "Downloaded text");
    Ok(ITALIAN_QUOTE
        .captures(&text)
        .map(|c| (c[1].to_string(), c[2].to_string(), String::new())))
}

fn parse_portuguese(document: &Html) -> Result<Option<Parsed>> {
    let Some(container) = document.select(&selector(".inhalt")?).next() else {
        return Ok(None);
    };
    let Some(block) = child_elements(&container).into_iter().next() else {
        return Ok(None);
    };
    let Some(cell) = child_elements(&block).into_iter().nth(1) else {
        return Ok(None);
    };
    let Some(paragraph) = first(&cell, "p")? else {
        return Ok(None);
    };
    let text = element_text(&paragraph);
    let parts: Vec<&str> = text
        .split(['\u{2500}', '\u{2014}', '-'])
        .map(|p| p.trim_matches(['"', ' ']))
        .filter(|p| !p.is_empty())
        .collect();
    if parts.len() < 2 {
        return Ok(None);
    }
    Ok(Some((parts[0].to_string(), parts[1].to_string(), String::new())))
}

fn parse_russian(document: &Html) -> Result<Option<Parsed>> {
    let Some(row) = document.select(&selector("#main-quote table tbody tr")?).next() else {
        return Ok(None);
    };
    let Some(cell) = child_elements(&row).into_iter().nth(1) else {
        return Ok(None);
    };
    let Some(quote) = first(&cell, "cite")? else {
        return Ok(None);
    };
    let author = cell
        .select(&selector("div")?)
        .last()
        .map(|e| element_text(&e))
        .unwrap_or_default();
    Ok(Some((element_text(&quote), author, String::new())))
}

fn parse_esperanto(document: &Html) -> Result<Option<Parsed>> {
    let root = document.root_element();
    let text = first(&root, "#Citaĵo_CDLT")?.map(|e| element_text(&e)).unwrap_or_default();
    let author = first(&root, "#Aŭtoro_CDLT")?.map(|e| element_text(&e)).unwrap_or_default();
    Ok(Some((text, author, String::new())))
}

#[async_trait]
impl QuoteModule for WikiquoteModule {
    fn id(&self) -> &'static str {
        Self::ID
    }

    fn display_name(&self) -> &'static str {
        "Wikiquote QotD"
    }

    fn minimum_refresh_interval(&self) -> u32 {
        86_400
    }

    fn character_type(&self) -> CharacterType {
        match self.language {
            WikiquoteLanguage::Chinese | WikiquoteLanguage::Japanese => CharacterType::Cjk,
            _ => CharacterType::Default,
        }
    }

    #[instrument(name = "WikiquoteFetch", skip(self), fields(language = ?self.language))]
    async fn fetch_quote(&self) -> Result<Option<QuoteData>> {
        let html = fetch_text(&self.client, &self.url).await?;
        let Some((text, author, source)) = Self::parse(self.language, &html)? else {
            return Ok(None);
        };
        if text.is_empty() {
            return Ok(None);
        }
        Ok(Some(QuoteData::new(&text, &source, &author, Self::ID)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn parse(language: WikiquoteLanguage, html: &str) -> Parsed {
        WikiquoteModule::parse(language, html).unwrap().unwrap()
    }

    #[tokio::test]
    async fn test_fetch_english_quote() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/wiki/Main_Page"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"<div id="mf-qotd"><table style="text-align:center; width:100%"><tbody><tr>
                <td>Knowledge speaks, but wisdom listens.</td></tr>
                <tr><td>~ Jimi Hendrix ~</td></tr></tbody></table></div>"#,
            ))
            .mount(&server)
            .await;

        let url = format!("{}/wiki/Main_Page", server.uri());
        let module = WikiquoteModule::new("English", Some(&url)).unwrap();
        let quote = module.fetch_quote().await.unwrap().unwrap();
        assert_eq!(quote.text, "Knowledge speaks, but wisdom listens.");
        assert_eq!(quote.author, "Jimi Hendrix");
        assert_eq!(quote.provider, "wikiquote");
    }

    #[test]
    fn test_chinese_layout() {
        let (text, author, _) = parse(
            WikiquoteLanguage::Chinese,
            r#"<div id="mp-everyday-quote"><table><tr><td>知之为知之，不知为不知，是知也。</td>
            <td>——孔子</td></tr></table></div>"#,
        );
        assert_eq!(text, "知之为知之，不知为不知，是知也。");
        assert_eq!(author, "孔子");
    }

    #[test]
    fn test_german_layout() {
        let (text, author, source) = parse(
            WikiquoteLanguage::German,
            r#"<div id="mf-ZitatdW"><table><tbody>
            <tr><td>Phantasie ist wichtiger als Wissen.</td></tr>
            <tr><td>Albert Einstein,<br>Über den Glauben</td></tr>
            </tbody></table></div>"#,
        );
        assert_eq!(text, "Phantasie ist wichtiger als Wissen.");
        assert_eq!(author, "Albert Einstein");
        assert_eq!(source, "Über den Glauben");
    }

    #[test]
    fn test_french_layout() {
        let (text, author, _) = parse(
            WikiquoteLanguage::French,
            r#"<div><blockquote>« Je pense, donc je suis. »</blockquote><p>— Descartes</p></div>"#,
        );
        assert_eq!(text, "Je pense, donc je suis.");
        assert_eq!(author, "Descartes");
    }

    #[test]
    fn test_esperanto_layout() {
        let (text, author, _) = parse(
            WikiquoteLanguage::Esperanto,
            r#"<p id="Citaĵo_CDLT">Kiu scias, tiu ne parolas.</p><p id="Aŭtoro_CDLT">Laozi</p>"#,
        );
        assert_eq!(text, "Kiu scias, tiu ne parolas.");
        assert_eq!(author, "Laozi");
    }

    #[test]
    fn test_unparseable_text_has_no_quote() {
        assert!(
            WikiquoteModule::parse(
                WikiquoteLanguage::Chinese,
                r#"<div id="mp-everyday-quote"><table><tr><td>no separator</td></tr></table></div>"#,
            )
            .unwrap()
            .is_none()
        );
    }

    #[test]
    fn test_language_names() {
        assert_eq!(WikiquoteLanguage::from_name("Русский"), WikiquoteLanguage::Russian);
        assert_eq!(WikiquoteLanguage::from_name("Klingon"), WikiquoteLanguage::English);
    }
}
