//! Quote data and its compact persisted form

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

/// Prefix shown in front of a formatted source line.
pub const SOURCE_PREFIX: &str = "― ";

/// Provider tag attached to the "set me up" quotes emitted by local modules.
pub const PLACEHOLDER_PROVIDER: &str = "placeholder";

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct QuoteData {
    pub text: String,
    pub source: String,
    pub author: String,
    pub provider: String,
    pub uid: String,
    #[serde(default)]
    pub extra: Option<Vec<u8>>,
}

impl QuoteData {
    /// Builds a quote whose uid is derived from its content.
    pub fn new(text: &str, source: &str, author: &str, provider: &str) -> Self {
        Self {
            text: text.to_string(),
            source: source.to_string(),
            author: author.to_string(),
            provider: provider.to_string(),
            uid: quote_uid(text, source, author),
            extra: None,
        }
    }

    pub fn placeholder(text: &str, source: &str) -> Self {
        Self::new(text, source, "", PLACEHOLDER_PROVIDER)
    }

    pub fn with_extra(mut self, extra: Vec<u8>) -> Self {
        self.extra = Some(extra);
        self
    }

    pub fn is_placeholder(&self) -> bool {
        self.provider == PLACEHOLDER_PROVIDER
    }

    pub fn readable_source(&self) -> String {
        build_readable_source(&self.source, &self.author, false)
    }

    pub fn with_collect_state(self, state: Option<bool>) -> QuoteDataWithCollectState {
        QuoteDataWithCollectState {
            quote: self,
            collect_state: state,
        }
    }

    /// Hex string of the length-prefixed fields, used to keep the current quote
    /// in a single value.
    pub fn byte_string(&self) -> String {
        let mut bytes = Vec::new();
        for field in [
            self.text.as_bytes(),
            self.source.as_bytes(),
            self.author.as_bytes(),
            self.provider.as_bytes(),
            self.uid.as_bytes(),
            self.extra.as_deref().unwrap_or_default(),
        ] {
            bytes.extend_from_slice(&(field.len() as u32).to_be_bytes());
            bytes.extend_from_slice(field);
        }
        hex::encode(bytes)
    }

    pub fn from_byte_string(encoded: &str) -> Result<Self> {
        let bytes = hex::decode(encoded).context("Quote byte string is not valid hex")?;
        let mut fields: Vec<&[u8]> = Vec::with_capacity(6);
        let mut offset = 0;
        while offset < bytes.len() {
            let Some(len_bytes) = bytes.get(offset..offset + 4) else {
                bail!("Truncated field length at offset {offset}");
            };
            let len = u32::from_be_bytes([len_bytes[0], len_bytes[1], len_bytes[2], len_bytes[3]])
                as usize;
            offset += 4;
            let field = bytes
                .get(offset..offset + len)
                .with_context(|| format!("Truncated field of {len} bytes at offset {offset}"))?;
            fields.push(field);
            offset += len;
        }
        if fields.len() < 5 {
            bail!("Expected at least 5 fields in quote byte string, found {}", fields.len());
        }

        let text_field = |i: usize| -> Result<String> {
            String::from_utf8(fields[i].to_vec()).context("Quote field is not valid UTF-8")
        };
        let extra = fields
            .get(5)
            .filter(|extra| !extra.is_empty())
            .map(|extra| extra.to_vec());

        Ok(Self {
            text: text_field(0)?,
            source: text_field(1)?,
            author: text_field(2)?,
            provider: text_field(3)?,
            uid: text_field(4)?,
            extra,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct QuoteDataWithCollectState {
    #[serde(flatten)]
    pub quote: QuoteData,
    pub collect_state: Option<bool>,
}

/// Lowercase hex MD5 of the concatenated quote fields.
pub fn quote_uid(text: &str, source: &str, author: &str) -> String {
    format!("{:x}", md5::compute(format!("{text}{source}{author}")))
}

pub fn build_readable_source(source: &str, author: &str, with_prefix: bool) -> String {
    let formatted = if author.trim().is_empty() {
        source.to_string()
    } else if source.trim().is_empty() {
        author.to_string()
    } else {
        format!("{author} {source}")
    };
    if formatted.trim().is_empty() {
        String::new()
    } else if with_prefix {
        format!("{SOURCE_PREFIX}{formatted}")
    } else {
        formatted
    }
}
