use super::entity::{QUOTE_TABLE_MIGRATIONS, QUOTE_TABLE_VERSION, QuoteEntity};
use super::migration;
use super::table::Table;
use crate::core::quote::QuoteData;
use anyhow::{Context, Result, bail};
use fjall::{Keyspace, PartitionHandle};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};

pub const COLLECTION_TABLE: &str = "collections";

/// Flat row layout of exported collections.
#[derive(Debug, Serialize, Deserialize)]
struct CsvRow {
    id: Option<u64>,
    text: String,
    source: String,
    #[serde(default)]
    author: String,
    #[serde(default)]
    provider: String,
    uid: String,
    /// Hex encoded, empty when absent.
    #[serde(default)]
    extra: String,
}

impl From<QuoteEntity> for CsvRow {
    fn from(entity: QuoteEntity) -> Self {
        Self {
            id: entity.id,
            text: entity.text,
            source: entity.source,
            author: entity.author,
            provider: entity.provider,
            uid: entity.uid,
            extra: entity.extra.as_deref().map(hex::encode).unwrap_or_default(),
        }
    }
}

impl TryFrom<CsvRow> for QuoteEntity {
    type Error = anyhow::Error;

    fn try_from(row: CsvRow) -> Result<Self> {
        let extra = if row.extra.is_empty() {
            None
        } else {
            Some(hex::decode(&row.extra).context("Quote extra is not valid hex")?)
        };
        Ok(Self {
            id: row.id,
            text: row.text,
            source: row.source,
            author: row.author,
            provider: row.provider,
            uid: row.uid,
            extra,
        })
    }
}

/// Quotes saved by the user.
pub struct QuoteCollectionRepository {
    table: Table,
}

impl QuoteCollectionRepository {
    pub(crate) fn open(keyspace: &Keyspace, meta: &PartitionHandle) -> Result<Self> {
        let table = Table::open(keyspace, meta, COLLECTION_TABLE, true)?;
        migration::migrate(&table, QUOTE_TABLE_VERSION, QUOTE_TABLE_MIGRATIONS)?;
        Ok(Self { table })
    }

    /// Returns `None` when a quote with the same uid is already collected.
    pub fn insert(&self, quote: &QuoteData) -> Result<Option<u64>> {
        self.table.insert(&mut QuoteEntity::from(quote))
    }

    /// Inserts every row, replacing rows that share an id or uid.
    pub fn insert_all(&self, entities: Vec<QuoteEntity>) -> Result<usize> {
        let mut count = 0;
        for mut entity in entities {
            self.table.replace(&mut entity)?;
            count += 1;
        }
        Ok(count)
    }

    pub fn find_by_quote(&self, text: &str, source: &str, author: &str) -> Result<Option<QuoteEntity>> {
        Ok(self
            .table
            .all::<QuoteEntity>()?
            .into_iter()
            .find(|row| row.same_content(text, source, author)))
    }

    pub fn get_by_uid(&self, uid: &str) -> Result<Option<QuoteEntity>> {
        self.table.get_by_uid(uid)
    }

    pub fn random(&self) -> Result<Option<QuoteEntity>> {
        self.table.random(|_: &QuoteEntity| true)
    }

    pub fn list(&self) -> Result<Vec<QuoteEntity>> {
        let mut rows: Vec<QuoteEntity> = self.table.all()?;
        rows.reverse();
        Ok(rows)
    }

    pub fn search(&self, keyword: &str) -> Result<Vec<QuoteEntity>> {
        Ok(self
            .list()?
            .into_iter()
            .filter(|row| row.matches(keyword))
            .collect())
    }

    pub fn count(&self) -> Result<usize> {
        self.table.len()
    }

    pub fn delete(&self, id: u64) -> Result<bool> {
        self.table.remove(id)
    }

    pub fn delete_by_uid(&self, uid: &str) -> Result<bool> {
        self.table.remove_by_uid(uid)
    }

    pub fn clear(&self) -> Result<()> {
        self.table.clear()
    }

    /// Writes all collected quotes to `path`, oldest first. Returns the row count.
    pub fn export_csv(&self, path: &Path) -> Result<usize> {
        let mut writer = csv::Writer::from_path(path)
            .with_context(|| format!("Failed to create {}", path.display()))?;
        let rows: Vec<QuoteEntity> = self.table.all()?;
        let count = rows.len();
        for row in rows {
            writer.serialize(CsvRow::from(row))?;
        }
        writer.flush()?;
        info!(count, path = %path.display(), "Exported collections");
        Ok(count)
    }

    /// Replaces the collection with the rows of `path`.
    pub fn import_csv(&self, path: &Path) -> Result<usize> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .from_path(path)
            .with_context(|| format!("Failed to open {}", path.display()))?;
        let mut entities = Vec::new();
        for record in reader.deserialize::<CsvRow>() {
            let row = record.with_context(|| format!("Malformed row in {}", path.display()))?;
            entities.push(QuoteEntity::try_from(row)?);
        }
        if entities.is_empty() {
            bail!("No collected quotes found in {}", path.display());
        }
        debug!(count = entities.len(), "Importing collections");
        self.clear()?;
        let count = self.insert_all(entities)?;
        info!(count, path = %path.display(), "Imported collections");
        Ok(count)
    }

    #[cfg(test)]
    pub(crate) fn table(&self) -> &Table {
        &self.table
    }
}
