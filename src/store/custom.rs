use super::migration::{self, Migration, add_field};
use super::table::{Record, Table};
use anyhow::Result;
use fjall::{Keyspace, PartitionHandle};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const CUSTOM_QUOTE_TABLE: &str = "custom_quotes";

/// v1 `{id, text, source}`, v2 adds `author`.
const CUSTOM_QUOTE_VERSION: u32 = 2;

const CUSTOM_QUOTE_MIGRATIONS: &[Migration] = &[Migration {
    from: 1,
    migrate: |row| add_field(row, "author", Value::from("")),
}];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomQuoteEntity {
    #[serde(default)]
    pub id: Option<u64>,
    pub text: String,
    pub source: String,
    #[serde(default)]
    pub author: String,
}

impl Record for CustomQuoteEntity {
    fn id(&self) -> Option<u64> {
        self.id
    }

    fn set_id(&mut self, id: u64) {
        self.id = Some(id);
    }
}

/// Quotes entered by the user.
pub struct CustomQuoteRepository {
    table: Table,
}

impl CustomQuoteRepository {
    pub(crate) fn open(keyspace: &Keyspace, meta: &PartitionHandle) -> Result<Self> {
        let table = Table::open(keyspace, meta, CUSTOM_QUOTE_TABLE, false)?;
        migration::migrate(&table, CUSTOM_QUOTE_VERSION, CUSTOM_QUOTE_MIGRATIONS)?;
        Ok(Self { table })
    }

    pub fn insert(&self, text: &str, source: &str, author: &str) -> Result<u64> {
        let mut entity = CustomQuoteEntity {
            id: None,
            text: text.to_string(),
            source: source.to_string(),
            author: author.to_string(),
        };
        // Rows without uid are never rejected.
        Ok(self.table.insert(&mut entity)?.unwrap_or_default())
    }

    pub fn update(&self, entity: &CustomQuoteEntity) -> Result<bool> {
        self.table.update(entity)
    }

    pub fn get(&self, id: u64) -> Result<Option<CustomQuoteEntity>> {
        self.table.get(id)
    }

    pub fn list(&self) -> Result<Vec<CustomQuoteEntity>> {
        self.table.all()
    }

    pub fn delete(&self, id: u64) -> Result<bool> {
        self.table.remove(id)
    }

    pub fn random(&self) -> Result<Option<CustomQuoteEntity>> {
        self.table.random(|_: &CustomQuoteEntity| true)
    }

    pub fn count(&self) -> Result<usize> {
        self.table.len()
    }

    #[cfg(test)]
    pub(crate) fn table(&self) -> &Table {
        &self.table
    }
}
