use super::entity::{QUOTE_TABLE_MIGRATIONS, QUOTE_TABLE_VERSION, QuoteEntity};
use super::migration;
use super::table::Table;
use crate::core::quote::QuoteData;
use anyhow::Result;
use fjall::{Keyspace, PartitionHandle};
use tracing::debug;

pub const HISTORY_TABLE: &str = "histories";

/// Log of previously shown quotes, deduplicated on uid.
pub struct QuoteHistoryRepository {
    table: Table,
}

impl QuoteHistoryRepository {
    pub(crate) fn open(keyspace: &Keyspace, meta: &PartitionHandle) -> Result<Self> {
        let table = Table::open(keyspace, meta, HISTORY_TABLE, true)?;
        migration::migrate(&table, QUOTE_TABLE_VERSION, QUOTE_TABLE_MIGRATIONS)?;
        Ok(Self { table })
    }

    /// Returns the id of the new row, or `None` when the quote was already
    /// recorded.
    pub fn insert(&self, quote: &QuoteData) -> Result<Option<u64>> {
        let id = self.table.insert(&mut QuoteEntity::from(quote))?;
        debug!(uid = %quote.uid, inserted = id.is_some(), "History insert");
        Ok(id)
    }

    /// Newest first.
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

    pub fn get(&self, id: u64) -> Result<Option<QuoteEntity>> {
        self.table.get(id)
    }

    pub fn count(&self) -> Result<usize> {
        self.table.len()
    }

    pub fn delete(&self, id: u64) -> Result<bool> {
        self.table.remove(id)
    }

    pub fn clear(&self) -> Result<()> {
        self.table.clear()
    }

    #[cfg(test)]
    pub(crate) fn table(&self) -> &Table {
        &self.table
    }
}
