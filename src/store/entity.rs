use super::migration::{Migration, add_field, rename_field};
use super::table::Record;
use crate::core::quote::{QuoteData, quote_uid};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A quote row of the history and collection tables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuoteEntity {
    #[serde(default)]
    pub id: Option<u64>,
    pub text: String,
    pub source: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub provider: String,
    pub uid: String,
    #[serde(default)]
    pub extra: Option<Vec<u8>>,
}

impl QuoteEntity {
    /// Case-insensitive substring match over text, source and author.
    pub fn matches(&self, keyword: &str) -> bool {
        let keyword = keyword.to_lowercase();
        [&self.text, &self.source, &self.author]
            .iter()
            .any(|field| field.to_lowercase().contains(&keyword))
    }

    pub fn same_content(&self, text: &str, source: &str, author: &str) -> bool {
        self.text == text && self.source == source && self.author == author
    }
}

impl Record for QuoteEntity {
    fn id(&self) -> Option<u64> {
        self.id
    }

    fn set_id(&mut self, id: u64) {
        self.id = Some(id);
    }

    fn uid(&self) -> Option<&str> {
        Some(&self.uid)
    }
}

impl From<&QuoteData> for QuoteEntity {
    fn from(quote: &QuoteData) -> Self {
        Self {
            id: None,
            text: quote.text.clone(),
            source: quote.source.clone(),
            author: quote.author.clone(),
            provider: quote.provider.clone(),
            uid: quote.uid.clone(),
            extra: quote.extra.clone(),
        }
    }
}

impl From<QuoteEntity> for QuoteData {
    fn from(entity: QuoteEntity) -> Self {
        Self {
            text: entity.text,
            source: entity.source,
            author: entity.author,
            provider: entity.provider,
            uid: entity.uid,
            extra: entity.extra,
        }
    }
}

/// Layout of quote tables: v1 `{id, text, source, md5}`, v2 adds `author`,
/// v3 renames `md5` to `uid` and adds `provider` and `extra`. Rows without a
/// legacy hash get one computed from their content.
pub const QUOTE_TABLE_VERSION: u32 = 3;

pub const QUOTE_TABLE_MIGRATIONS: &[Migration] = &[
    Migration {
        from: 1,
        migrate: quote_table_v1_to_v2,
    },
    Migration {
        from: 2,
        migrate: quote_table_v2_to_v3,
    },
];

fn quote_table_v1_to_v2(row: Value) -> Result<Value> {
    add_field(row, "author", Value::from(""))
}

fn quote_table_v2_to_v3(row: Value) -> Result<Value> {
    let mut row = rename_field(row, "md5", "uid")?;
    let has_uid = row
        .get("uid")
        .and_then(Value::as_str)
        .is_some_and(|uid| !uid.is_empty());
    if !has_uid {
        let field = |name: &str| {
            row.get(name)
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string()
        };
        let uid = quote_uid(&field("text"), &field("source"), &field("author"));
        if let Some(object) = row.as_object_mut() {
            object.insert("uid".to_string(), Value::from(uid));
        }
    }
    let row = add_field(row, "provider", Value::from(""))?;
    add_field(row, "extra", Value::Null)
}
