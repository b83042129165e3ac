use anyhow::{Context, Result, anyhow};
use fjall::{Keyspace, PartitionCreateOptions, PartitionHandle};
use rand::Rng;
use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Mutex;
use tracing::{debug, info};

/// A row stored in a [`Table`].
pub trait Record: Serialize + DeserializeOwned {
    fn id(&self) -> Option<u64>;

    fn set_id(&mut self, id: u64);

    /// Unique content key; tables created with a uid index reject duplicates.
    fn uid(&self) -> Option<&str> {
        None
    }
}

/// A fjall partition of JSON rows keyed by an auto-incremented id, with an
/// optional unique index on the row uid.
pub struct Table {
    name: &'static str,
    keyspace: Keyspace,
    rows: PartitionHandle,
    uid_index: Option<PartitionHandle>,
    meta: PartitionHandle,
    write_lock: Mutex<()>,
}

fn row_key(id: u64) -> Vec<u8> {
    id.to_be_bytes().to_vec()
}

fn id_from_key(key: &[u8]) -> Result<u64> {
    let bytes: [u8; 8] = key
        .try_into()
        .map_err(|_| anyhow!("Invalid row key of {} bytes", key.len()))?;
    Ok(u64::from_be_bytes(bytes))
}

impl Table {
    pub fn open(
        keyspace: &Keyspace,
        meta: &PartitionHandle,
        name: &'static str,
        unique_uid: bool,
    ) -> Result<Self> {
        let rows = keyspace
            .open_partition(name, PartitionCreateOptions::default())
            .with_context(|| format!("Failed to open partition: {name}"))?;
        let uid_index = if unique_uid {
            let index_name = format!("{name}_uid");
            Some(
                keyspace
                    .open_partition(&index_name, PartitionCreateOptions::default())
                    .with_context(|| format!("Failed to open partition: {index_name}"))?,
            )
        } else {
            None
        };
        Ok(Self {
            name,
            keyspace: keyspace.clone(),
            rows,
            uid_index,
            meta: meta.clone(),
            write_lock: Mutex::new(()),
        })
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, ()>> {
        self.write_lock
            .lock()
            .map_err(|_| anyhow!("Write lock poisoned for table {}", self.name))
    }

    fn next_id_key(&self) -> String {
        format!("{}.next_id", self.name)
    }

    fn next_id(&self) -> Result<u64> {
        match self.meta.get(self.next_id_key())? {
            Some(value) => Ok(serde_json::from_slice(&value)?),
            None => Ok(1),
        }
    }

    pub fn schema_version(&self) -> Result<Option<u32>> {
        match self.meta.get(format!("{}.version", self.name))? {
            Some(value) => Ok(Some(serde_json::from_slice(&value)?)),
            None => Ok(None),
        }
    }

    pub fn set_schema_version(&self, version: u32) -> Result<()> {
        self.meta.insert(
            format!("{}.version", self.name),
            serde_json::to_vec(&version)?,
        )?;
        Ok(())
    }

    fn uid_lookup(&self, uid: &str) -> Result<Option<u64>> {
        match &self.uid_index {
            Some(index) => match index.get(uid)? {
                Some(value) => Ok(Some(id_from_key(&value)?)),
                None => Ok(None),
            },
            None => Ok(None),
        }
    }

    /// Inserts the record unless its uid already exists. Returns the new id.
    pub fn insert<R: Record>(&self, record: &mut R) -> Result<Option<u64>> {
        let _guard = self.lock()?;
        if let Some(uid) = record.uid()
            && self.uid_lookup(uid)?.is_some()
        {
            debug!(table = self.name, uid, "Ignoring duplicate row");
            return Ok(None);
        }
        let id = self.next_id()?;
        record.set_id(id);
        self.write_row(record, id, None)?;
        Ok(Some(id))
    }

    /// Inserts the record, replacing any row with the same id or uid.
    pub fn replace<R: Record>(&self, record: &mut R) -> Result<u64> {
        let _guard = self.lock()?;
        let conflicting = match record.uid() {
            Some(uid) => self.uid_lookup(uid)?,
            None => None,
        };
        let id = match record.id() {
            Some(id) => id,
            None => self.next_id()?,
        };
        record.set_id(id);
        let mut stale = Vec::new();
        if let Some(old_id) = conflicting.filter(|old_id| *old_id != id) {
            stale.push(old_id);
        }
        if self.rows.contains_key(row_key(id))? {
            stale.push(id);
        }
        self.write_row(record, id, Some(&stale))?;
        Ok(id)
    }

    fn write_row<R: Record>(&self, record: &R, id: u64, stale: Option<&[u64]>) -> Result<()> {
        let mut batch = self.keyspace.batch();
        // A batch commits under one seqno, so keys rewritten below must not
        // also be removed here.
        for stale_id in stale.unwrap_or_default() {
            if let Some(index) = &self.uid_index
                && let Some(old_uid) = self.raw_uid(*stale_id)?
                && record.uid() != Some(old_uid.as_str())
            {
                batch.remove(index, old_uid);
            }
            if *stale_id != id {
                batch.remove(&self.rows, row_key(*stale_id));
            }
        }
        batch.insert(&self.rows, row_key(id), serde_json::to_vec(record)?);
        if let (Some(index), Some(uid)) = (&self.uid_index, record.uid()) {
            batch.insert(index, uid, row_key(id));
        }
        let next_id = self.next_id()?.max(id + 1);
        batch.insert(&self.meta, self.next_id_key(), serde_json::to_vec(&next_id)?);
        batch.commit()?;
        debug!(table = self.name, id, "Row written");
        Ok(())
    }

    /// Overwrites an existing row. Returns false when the id is unknown.
    pub fn update<R: Record>(&self, record: &R) -> Result<bool> {
        let _guard = self.lock()?;
        let id = record
            .id()
            .ok_or_else(|| anyhow!("Cannot update a row without id in {}", self.name))?;
        if !self.rows.contains_key(row_key(id))? {
            return Ok(false);
        }
        self.write_row(record, id, Some(&[id]))?;
        Ok(true)
    }

    pub fn get<R: Record>(&self, id: u64) -> Result<Option<R>> {
        match self.rows.get(row_key(id))? {
            Some(value) => Ok(Some(serde_json::from_slice(&value).with_context(|| {
                format!("Failed to decode row {id} of {}", self.name)
            })?)),
            None => Ok(None),
        }
    }

    pub fn get_by_uid<R: Record>(&self, uid: &str) -> Result<Option<R>> {
        match self.uid_lookup(uid)? {
            Some(id) => self.get(id),
            None => Ok(None),
        }
    }

    fn raw_uid(&self, id: u64) -> Result<Option<String>> {
        Ok(self.get_raw(id)?.and_then(|value| {
            value
                .get("uid")
                .and_then(Value::as_str)
                .map(str::to_string)
        }))
    }

    pub fn remove(&self, id: u64) -> Result<bool> {
        let _guard = self.lock()?;
        if !self.rows.contains_key(row_key(id))? {
            return Ok(false);
        }
        let mut batch = self.keyspace.batch();
        if let Some(index) = &self.uid_index
            && let Some(uid) = self.raw_uid(id)?
        {
            batch.remove(index, uid);
        }
        batch.remove(&self.rows, row_key(id));
        batch.commit()?;
        debug!(table = self.name, id, "Row removed");
        Ok(true)
    }

    pub fn remove_by_uid(&self, uid: &str) -> Result<bool> {
        match self.uid_lookup(uid)? {
            Some(id) => self.remove(id),
            None => Ok(false),
        }
    }

    /// All rows in ascending id order.
    pub fn all<R: Record>(&self) -> Result<Vec<R>> {
        self.rows
            .iter()
            .map(|item| {
                let (_, value) = item?;
                serde_json::from_slice(&value)
                    .with_context(|| format!("Failed to decode a row of {}", self.name))
            })
            .collect()
    }

    pub fn len(&self) -> Result<usize> {
        Ok(self.rows.len()?)
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.rows.is_empty()?)
    }

    /// A uniformly chosen row among those accepted by `filter`.
    pub fn random<R: Record>(&self, filter: impl Fn(&R) -> bool) -> Result<Option<R>> {
        let mut candidates: Vec<R> = self.all::<R>()?.into_iter().filter(|r| filter(r)).collect();
        if candidates.is_empty() {
            return Ok(None);
        }
        let index = rand::thread_rng().gen_range(0..candidates.len());
        Ok(Some(candidates.swap_remove(index)))
    }

    pub fn clear(&self) -> Result<()> {
        let _guard = self.lock()?;
        let mut batch = self.keyspace.batch();
        for item in self.rows.keys() {
            batch.remove(&self.rows, item?);
        }
        if let Some(index) = &self.uid_index {
            for item in index.keys() {
                batch.remove(index, item?);
            }
        }
        batch.commit()?;
        debug!(table = self.name, "Table cleared");
        Ok(())
    }

    pub(crate) fn get_raw(&self, id: u64) -> Result<Option<Value>> {
        match self.rows.get(row_key(id))? {
            Some(value) => Ok(Some(serde_json::from_slice(&value)?)),
            None => Ok(None),
        }
    }

    /// Writes an untyped row, bypassing the uid index. Used by migrations and
    /// tests seeding old layouts.
    pub(crate) fn put_raw(&self, id: u64, value: &Value) -> Result<()> {
        self.rows.insert(row_key(id), serde_json::to_vec(value)?)?;
        let next_id = self.next_id()?.max(id + 1);
        self.meta
            .insert(self.next_id_key(), serde_json::to_vec(&next_id)?)?;
        Ok(())
    }

    /// Rewrites every row through `migrate` and rebuilds the uid index.
    /// Rows that end up sharing a uid are merged, the highest id wins.
    pub(crate) fn rewrite_rows(&self, migrate: impl Fn(Value) -> Result<Value>) -> Result<()> {
        let _guard = self.lock()?;
        let mut rows = Vec::new();
        for item in self.rows.iter() {
            let (key, value) = item?;
            rows.push((id_from_key(&key)?, migrate(serde_json::from_slice::<Value>(&value)?)?));
        }

        // Rows are in ascending id order, so later rows replace earlier ones.
        let mut owners: HashMap<String, u64> = HashMap::new();
        if self.uid_index.is_some() {
            for (id, migrated) in &rows {
                if let Some(uid) = migrated.get("uid").and_then(Value::as_str) {
                    owners.insert(uid.to_string(), *id);
                }
            }
        }

        let mut batch = self.keyspace.batch();
        for (id, migrated) in rows {
            let uid = migrated.get("uid").and_then(Value::as_str);
            if let (Some(index), Some(uid)) = (&self.uid_index, uid) {
                if owners.get(uid) != Some(&id) {
                    info!(table = self.name, id, uid, "Dropping duplicate row");
                    batch.remove(&self.rows, row_key(id));
                    continue;
                }
                batch.insert(index, uid, row_key(id));
            }
            batch.insert(&self.rows, row_key(id), serde_json::to_vec(&migrated)?);
        }
        if let Some(index) = &self.uid_index {
            for item in index.keys() {
                let key = item?;
                let live = std::str::from_utf8(&key)
                    .map(|uid| owners.contains_key(uid))
                    .unwrap_or(false);
                if !live {
                    batch.remove(index, key);
                }
            }
        }
        batch.commit()?;
        Ok(())
    }
}
