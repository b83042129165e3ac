use crate::core::quote::{QuoteData, QuoteDataWithCollectState};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use fjall::{Keyspace, PartitionCreateOptions, PartitionHandle};
use tokio::sync::watch;
use tracing::{debug, warn};

pub const STATE_PARTITION: &str = "quote_state";

const QUOTE_KEY: &str = "quote";
const COLLECT_STATE_KEY: &str = "collect_state";
const LAST_UPDATED_KEY: &str = "last_updated";

/// The quote currently on display, with change notifications.
pub struct QuoteStateStore {
    keyspace: Keyspace,
    partition: PartitionHandle,
    sender: watch::Sender<Option<QuoteDataWithCollectState>>,
}

impl QuoteStateStore {
    pub(crate) fn open(keyspace: &Keyspace) -> Result<Self> {
        let partition = keyspace
            .open_partition(STATE_PARTITION, PartitionCreateOptions::default())
            .with_context(|| format!("Failed to open partition: {STATE_PARTITION}"))?;
        let mut store = Self {
            keyspace: keyspace.clone(),
            partition,
            sender: watch::Sender::new(None),
        };
        let initial = store.current()?;
        store.sender = watch::Sender::new(initial);
        Ok(store)
    }

    /// Receives the current quote now and after every change.
    pub fn subscribe(&self) -> watch::Receiver<Option<QuoteDataWithCollectState>> {
        self.sender.subscribe()
    }

    pub fn current(&self) -> Result<Option<QuoteDataWithCollectState>> {
        let Some(value) = self.partition.get(QUOTE_KEY)? else {
            return Ok(None);
        };
        let encoded = String::from_utf8(value.to_vec()).context("Stored quote is not UTF-8")?;
        let quote = match QuoteData::from_byte_string(&encoded) {
            Ok(quote) => quote,
            Err(err) => {
                warn!(error = %err, "Discarding unreadable current quote");
                return Ok(None);
            }
        };
        let collect_state = match self.partition.get(COLLECT_STATE_KEY)? {
            Some(value) => serde_json::from_slice(&value)?,
            None => None,
        };
        Ok(Some(quote.with_collect_state(collect_state)))
    }

    /// Stores a freshly downloaded quote and its refresh time.
    pub fn set_current(
        &self,
        quote: &QuoteData,
        collect_state: Option<bool>,
        updated_at: DateTime<Utc>,
    ) -> Result<()> {
        let mut batch = self.keyspace.batch();
        batch.insert(&self.partition, QUOTE_KEY, quote.byte_string());
        batch.insert(
            &self.partition,
            COLLECT_STATE_KEY,
            serde_json::to_vec(&collect_state)?,
        );
        batch.insert(
            &self.partition,
            LAST_UPDATED_KEY,
            serde_json::to_vec(&updated_at.timestamp_millis())?,
        );
        batch.commit()?;
        debug!(uid = %quote.uid, "Current quote updated");
        self.notify()
    }

    pub fn set_collect_state(&self, collect_state: Option<bool>) -> Result<()> {
        self.partition
            .insert(COLLECT_STATE_KEY, serde_json::to_vec(&collect_state)?)?;
        self.notify()
    }

    pub fn last_updated(&self) -> Result<Option<DateTime<Utc>>> {
        match self.partition.get(LAST_UPDATED_KEY)? {
            Some(value) => {
                let millis: i64 = serde_json::from_slice(&value)?;
                Ok(DateTime::from_timestamp_millis(millis))
            }
            None => Ok(None),
        }
    }

    fn notify(&self) -> Result<()> {
        let current = self.current()?;
        self.sender.send_replace(current);
        Ok(())
    }
}
