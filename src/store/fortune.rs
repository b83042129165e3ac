use super::migration;
use super::table::{Record, Table};
use crate::core::quote::quote_uid;
use anyhow::{Context, Result};
use fjall::{Keyspace, PartitionHandle};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;
use std::sync::LazyLock;
use tracing::{debug, info};

pub const FORTUNE_TABLE: &str = "fortunes";
const FORTUNE_VERSION: u32 = 1;

static DELIMITER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*%\s*$").expect("Invalid fortune delimiter pattern"));
static FOOTER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*%%\s*$").expect("Invalid fortune footer pattern"));
static SOURCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\t{2,}-{2,}\s*(.+)$").expect("Invalid fortune source pattern"));

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FortuneEntity {
    #[serde(default)]
    pub id: Option<u64>,
    pub text: String,
    pub source: String,
    #[serde(default)]
    pub author: String,
    pub category: String,
    pub uid: String,
}

impl FortuneEntity {
    pub fn new(text: &str, source: &str, category: &str) -> Self {
        Self {
            id: None,
            text: text.to_string(),
            source: source.to_string(),
            author: String::new(),
            category: category.to_string(),
            uid: quote_uid(text, source, FORTUNE_TABLE),
        }
    }
}

impl Record for FortuneEntity {
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

/// Splits a fortune cookie file into entries.
///
/// Entries are separated by `%` lines, a `%%` line is ignored, and a line
/// indented by two tabs starting with `--` names the source. Text lines are
/// trimmed and joined with single spaces.
pub fn parse_fortunes(content: &str, category: &str) -> Vec<FortuneEntity> {
    let mut entries = Vec::new();
    let mut text = String::new();
    let mut source = String::new();

    let mut flush = |text: &mut String, source: &mut String| {
        if !text.trim().is_empty() {
            entries.push(FortuneEntity::new(text, source, category));
        }
        text.clear();
        source.clear();
    };

    for line in content.lines() {
        if FOOTER.is_match(line) {
            continue;
        }
        if DELIMITER.is_match(line) {
            flush(&mut text, &mut source);
            continue;
        }
        if let Some(captures) = SOURCE.captures(line) {
            let group = captures[1].trim();
            if !group.is_empty() {
                source = group.to_string();
            }
        } else if !line.trim().is_empty() {
            if !text.is_empty() {
                text.push(' ');
            }
            text.push_str(line.trim());
        }
    }
    flush(&mut text, &mut source);
    entries
}

/// Fortune cookies grouped by category.
pub struct FortuneRepository {
    table: Table,
}

impl FortuneRepository {
    pub(crate) fn open(keyspace: &Keyspace, meta: &PartitionHandle) -> Result<Self> {
        let table = Table::open(keyspace, meta, FORTUNE_TABLE, true)?;
        migration::migrate(&table, FORTUNE_VERSION, &[])?;
        Ok(Self { table })
    }

    pub fn insert(&self, entity: &mut FortuneEntity) -> Result<Option<u64>> {
        self.table.insert(entity)
    }

    /// Imports a fortune file, using the file stem as category unless given.
    /// Returns the number of new entries.
    pub fn import_file(&self, path: &Path, category: Option<&str>) -> Result<usize> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read fortune file: {}", path.display()))?;
        let category = match category {
            Some(category) => category.to_string(),
            None => path
                .file_stem()
                .map(|stem| stem.to_string_lossy().to_string())
                .unwrap_or_default(),
        };
        let mut inserted = 0;
        for mut entry in parse_fortunes(&content, &category) {
            if self.insert(&mut entry)?.is_some() {
                inserted += 1;
            }
        }
        info!(inserted, category, "Imported fortune file");
        Ok(inserted)
    }

    /// A random entry no longer than `max_length` characters, restricted to
    /// `category` when given.
    pub fn random(&self, category: Option<&str>, max_length: usize) -> Result<Option<FortuneEntity>> {
        debug!(?category, max_length, "Picking a fortune");
        self.table.random(|entry: &FortuneEntity| {
            entry.text.chars().count() <= max_length
                && category.is_none_or(|category| entry.category == category)
        })
    }

    pub fn count(&self) -> Result<usize> {
        self.table.len()
    }

    pub fn categories(&self) -> Result<Vec<String>> {
        let categories: BTreeSet<String> = self
            .table
            .all::<FortuneEntity>()?
            .into_iter()
            .map(|entry| entry.category)
            .collect();
        Ok(categories.into_iter().collect())
    }
}
