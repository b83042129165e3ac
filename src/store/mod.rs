pub mod collection;
pub mod custom;
pub mod entity;
pub mod fortune;
pub mod history;
pub mod migration;
pub mod prefs;
pub mod state;
pub mod table;

use anyhow::{Context, Result};
use collection::QuoteCollectionRepository;
use custom::CustomQuoteRepository;
use fjall::{Keyspace, PartitionCreateOptions, PersistMode};
use fortune::FortuneRepository;
use history::QuoteHistoryRepository;
use prefs::ModulePreferences;
use state::QuoteStateStore;
use std::path::Path;
use tracing::debug;

pub use entity::QuoteEntity;

const META_PARTITION: &str = "meta";

/// All quote tables, stored in one fjall keyspace.
pub struct QuoteDatabase {
    keyspace: Keyspace,
    pub histories: QuoteHistoryRepository,
    pub collections: QuoteCollectionRepository,
    pub custom_quotes: CustomQuoteRepository,
    pub fortunes: FortuneRepository,
    pub state: QuoteStateStore,
    pub prefs: ModulePreferences,
}

impl QuoteDatabase {
    /// Opens the database under `path`, upgrading every table to its current
    /// schema.
    pub fn open(path: &Path) -> Result<Self> {
        std::fs::create_dir_all(path)
            .with_context(|| format!("Failed to create data directory: {}", path.display()))?;
        let keyspace = fjall::Config::new(path.join("quotes"))
            .open()
            .with_context(|| format!("Failed to open database in {}", path.display()))?;
        Self::from_keyspace(keyspace)
    }

    fn from_keyspace(keyspace: Keyspace) -> Result<Self> {
        let meta = keyspace.open_partition(META_PARTITION, PartitionCreateOptions::default())?;
        let database = Self {
            histories: QuoteHistoryRepository::open(&keyspace, &meta)?,
            collections: QuoteCollectionRepository::open(&keyspace, &meta)?,
            custom_quotes: CustomQuoteRepository::open(&keyspace, &meta)?,
            fortunes: FortuneRepository::open(&keyspace, &meta)?,
            state: QuoteStateStore::open(&keyspace)?,
            prefs: ModulePreferences::open(&keyspace)?,
            keyspace,
        };
        debug!("Quote database ready");
        Ok(database)
    }

    /// Flushes pending writes to disk.
    pub fn persist(&self) -> Result<()> {
        self.keyspace.persist(PersistMode::SyncAll)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::quote::{QuoteData, quote_uid};
    use chrono::Utc;
    use serde_json::json;
    use tempfile::tempdir;

    fn quote(text: &str) -> QuoteData {
        QuoteData::new(text, "Source", "Author", "test")
    }

    #[test]
    fn test_history_dedup_and_order() {
        let dir = tempdir().unwrap();
        let db = QuoteDatabase::open(dir.path()).unwrap();

        assert!(db.histories.insert(&quote("first")).unwrap().is_some());
        assert!(db.histories.insert(&quote("second")).unwrap().is_some());
        assert!(db.histories.insert(&quote("first")).unwrap().is_none());

        let rows = db.histories.list().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].text, "second");
        assert_eq!(db.histories.count().unwrap(), 2);

        let found = db.histories.search("FIR").unwrap();
        assert_eq!(found.len(), 1);
        assert!(db.histories.search("author").unwrap().len() == 2);

        let id = rows[0].id.unwrap();
        assert!(db.histories.delete(id).unwrap());
        assert!(!db.histories.delete(id).unwrap());
        // A deleted quote can be recorded again.
        assert!(db.histories.insert(&quote("second")).unwrap().is_some());

        db.histories.clear().unwrap();
        assert_eq!(db.histories.count().unwrap(), 0);
        assert!(db.histories.insert(&quote("first")).unwrap().is_some());
    }

    #[test]
    fn test_ids_are_not_reused() {
        let dir = tempdir().unwrap();
        let db = QuoteDatabase::open(dir.path()).unwrap();
        let first = db.histories.insert(&quote("a")).unwrap().unwrap();
        db.histories.delete(first).unwrap();
        let second = db.histories.insert(&quote("b")).unwrap().unwrap();
        assert!(second > first);
    }

    #[test]
    fn test_collections() {
        let dir = tempdir().unwrap();
        let db = QuoteDatabase::open(dir.path()).unwrap();
        let saved = quote("keep me");

        assert!(db.collections.random().unwrap().is_none());
        db.collections.insert(&saved).unwrap();
        assert!(db.collections.insert(&saved).unwrap().is_none());

        let found = db
            .collections
            .find_by_quote("keep me", "Source", "Author")
            .unwrap()
            .unwrap();
        assert_eq!(found.uid, saved.uid);
        assert!(
            db.collections
                .find_by_quote("keep me", "Other", "Author")
                .unwrap()
                .is_none()
        );
        assert_eq!(db.collections.random().unwrap().unwrap().text, "keep me");

        assert!(db.collections.delete_by_uid(&saved.uid).unwrap());
        assert!(db.collections.get_by_uid(&saved.uid).unwrap().is_none());
        assert_eq!(db.collections.count().unwrap(), 0);
    }

    #[test]
    fn test_collections_bulk_insert_replaces() {
        let dir = tempdir().unwrap();
        let db = QuoteDatabase::open(dir.path()).unwrap();
        db.collections.insert(&quote("one")).unwrap();

        let mut replacement = QuoteEntity::from(&quote("one"));
        replacement.provider = "imported".to_string();
        let fresh = QuoteEntity::from(&quote("two"));
        assert_eq!(db.collections.insert_all(vec![replacement, fresh]).unwrap(), 2);

        assert_eq!(db.collections.count().unwrap(), 2);
        let one = db.collections.get_by_uid(&quote("one").uid).unwrap().unwrap();
        assert_eq!(one.provider, "imported");
    }

    #[test]
    fn test_collections_csv_round_trip() {
        let dir = tempdir().unwrap();
        let db = QuoteDatabase::open(&dir.path().join("db")).unwrap();
        db.collections
            .insert(&quote("with extra").with_extra(vec![1, 2, 255]))
            .unwrap();
        db.collections.insert(&quote("plain, with comma")).unwrap();

        let csv_path = dir.path().join("collections.csv");
        assert_eq!(db.collections.export_csv(&csv_path).unwrap(), 2);

        db.collections.clear().unwrap();
        db.collections.insert(&quote("dropped on import")).unwrap();
        assert_eq!(db.collections.import_csv(&csv_path).unwrap(), 2);

        let rows = db.collections.list().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].text, "plain, with comma");
        assert_eq!(rows[1].extra, Some(vec![1, 2, 255]));
    }

    #[test]
    fn test_collections_import_rejects_empty_file() {
        let dir = tempdir().unwrap();
        let db = QuoteDatabase::open(&dir.path().join("db")).unwrap();
        db.collections.insert(&quote("kept")).unwrap();

        let csv_path = dir.path().join("empty.csv");
        std::fs::write(&csv_path, "id,text,source,author,provider,uid,extra\n").unwrap();
        assert!(db.collections.import_csv(&csv_path).is_err());
        assert_eq!(db.collections.count().unwrap(), 1);
    }

    #[test]
    fn test_custom_quotes() {
        let dir = tempdir().unwrap();
        let db = QuoteDatabase::open(dir.path()).unwrap();
        let id = db.custom_quotes.insert("Hello", "Me", "").unwrap();
        db.custom_quotes.insert("Hello", "Me", "").unwrap();
        assert_eq!(db.custom_quotes.count().unwrap(), 2);

        let mut entity = db.custom_quotes.get(id).unwrap().unwrap();
        entity.author = "Someone".to_string();
        assert!(db.custom_quotes.update(&entity).unwrap());
        assert_eq!(
            db.custom_quotes.get(id).unwrap().unwrap().author,
            "Someone"
        );

        assert!(db.custom_quotes.delete(id).unwrap());
        assert!(!db.custom_quotes.update(&entity).unwrap());
        assert_eq!(db.custom_quotes.list().unwrap().len(), 1);
    }

    #[test]
    fn test_fortunes() {
        let dir = tempdir().unwrap();
        let db = QuoteDatabase::open(&dir.path().join("db")).unwrap();
        let file = dir.path().join("art.txt");
        std::fs::write(&file, "Short art.\n%\nAnother art piece.\n%\nShort art.\n%\n").unwrap();

        assert_eq!(db.fortunes.import_file(&file, None).unwrap(), 2);
        let long = "x".repeat(200);
        db.fortunes
            .insert(&mut fortune::FortuneEntity::new(&long, "", "long"))
            .unwrap();

        assert_eq!(db.fortunes.count().unwrap(), 3);
        assert_eq!(db.fortunes.categories().unwrap(), vec!["art", "long"]);
        assert_eq!(
            db.fortunes.random(Some("art"), 160).unwrap().unwrap().category,
            "art"
        );
        assert!(db.fortunes.random(Some("long"), 160).unwrap().is_none());
        assert!(db.fortunes.random(Some("missing"), 160).unwrap().is_none());
    }

    #[test]
    fn test_state_and_notifications() {
        let dir = tempdir().unwrap();
        let db = QuoteDatabase::open(dir.path()).unwrap();
        let mut receiver = db.state.subscribe();
        assert!(db.state.current().unwrap().is_none());
        assert!(db.state.last_updated().unwrap().is_none());

        let now = Utc::now();
        db.state.set_current(&quote("now"), Some(false), now).unwrap();
        assert!(receiver.has_changed().unwrap());
        let seen = receiver.borrow_and_update().clone().unwrap();
        assert_eq!(seen.quote.text, "now");
        assert_eq!(seen.collect_state, Some(false));
        assert_eq!(
            db.state.last_updated().unwrap().unwrap().timestamp_millis(),
            now.timestamp_millis()
        );

        db.state.set_collect_state(Some(true)).unwrap();
        assert_eq!(receiver.borrow_and_update().clone().unwrap().collect_state, Some(true));
    }

    #[test]
    fn test_state_survives_reopen() {
        let dir = tempdir().unwrap();
        {
            let db = QuoteDatabase::open(dir.path()).unwrap();
            db.state.set_current(&quote("persisted"), None, Utc::now()).unwrap();
            db.prefs.put("jinrishici", "token", "abc").unwrap();
            db.persist().unwrap();
        }
        let db = QuoteDatabase::open(dir.path()).unwrap();
        let current = db.state.current().unwrap().unwrap();
        assert_eq!(current.quote.text, "persisted");
        assert_eq!(db.state.subscribe().borrow().clone().unwrap().quote.text, "persisted");
        assert_eq!(db.prefs.get("jinrishici", "token").unwrap().as_deref(), Some("abc"));
    }

    #[test]
    fn test_quote_table_migrates_from_v1() {
        let dir = tempdir().unwrap();
        {
            let db = QuoteDatabase::open(dir.path()).unwrap();
            let table = db.histories.table();
            table.set_schema_version(1).unwrap();
            let legacy = quote_uid("Old", "Book", "");
            table
                .put_raw(1, &json!({"id": 1, "text": "Old", "source": "Book", "md5": legacy}))
                .unwrap();
            db.persist().unwrap();
        }

        let db = QuoteDatabase::open(dir.path()).unwrap();
        assert_eq!(db.histories.table().schema_version().unwrap(), Some(3));
        let row = db.histories.get(1).unwrap().unwrap();
        assert_eq!(row.author, "");
        assert_eq!(row.provider, "");
        assert_eq!(row.uid, quote_uid("Old", "Book", ""));
        // The uid index is rebuilt, so the migrated row still deduplicates.
        assert!(
            db.histories
                .insert(&QuoteData::new("Old", "Book", "", "test"))
                .unwrap()
                .is_none()
        );
        // New rows continue after the migrated ids.
        assert_eq!(db.histories.insert(&quote("new")).unwrap(), Some(2));
    }

    #[test]
    fn test_quote_table_migration_keeps_legacy_hash_and_merges_duplicates() {
        let dir = tempdir().unwrap();
        {
            let db = QuoteDatabase::open(dir.path()).unwrap();
            let table = db.collections.table();
            table.set_schema_version(2).unwrap();
            for (id, text) in [(1, "First"), (2, "Second")] {
                table
                    .put_raw(
                        id,
                        &json!({"id": id, "text": text, "source": "", "author": "", "md5": "shared"}),
                    )
                    .unwrap();
            }
            table
                .put_raw(3, &json!({"id": 3, "text": "Unhashed", "source": "S", "author": "A"}))
                .unwrap();
            db.persist().unwrap();
        }

        let db = QuoteDatabase::open(dir.path()).unwrap();
        assert_eq!(db.collections.count().unwrap(), 2);
        let kept = db.collections.get_by_uid("shared").unwrap().unwrap();
        assert_eq!(kept.id, Some(2));
        assert_eq!(kept.text, "Second");
        let computed = db
            .collections
            .get_by_uid(&quote_uid("Unhashed", "S", "A"))
            .unwrap()
            .unwrap();
        assert_eq!(computed.id, Some(3));
    }

    #[test]
    fn test_custom_table_migrates_from_v1() {
        let dir = tempdir().unwrap();
        {
            let db = QuoteDatabase::open(dir.path()).unwrap();
            let table = db.custom_quotes.table();
            table
                .put_raw(7, &json!({"id": 7, "text": "Mine", "source": "Me"}))
                .unwrap();
            table.set_schema_version(1).unwrap();
            db.persist().unwrap();
        }
        let db = QuoteDatabase::open(dir.path()).unwrap();
        let row = db.custom_quotes.get(7).unwrap().unwrap();
        assert_eq!(row.author, "");
    }

    #[test]
    fn test_newer_schema_is_rejected() {
        let dir = tempdir().unwrap();
        {
            let db = QuoteDatabase::open(dir.path()).unwrap();
            db.histories.table().set_schema_version(9).unwrap();
            db.persist().unwrap();
        }
        assert!(QuoteDatabase::open(dir.path()).is_err());
    }
}
