use anyhow::{Context, Result};
use fjall::{Keyspace, PartitionCreateOptions, PartitionHandle};

pub const PREFS_PARTITION: &str = "module_prefs";

/// Small string values owned by quote modules, keyed `<module>.<name>`.
#[derive(Clone)]
pub struct ModulePreferences {
    partition: PartitionHandle,
}

impl ModulePreferences {
    pub(crate) fn open(keyspace: &Keyspace) -> Result<Self> {
        let partition = keyspace
            .open_partition(PREFS_PARTITION, PartitionCreateOptions::default())
            .with_context(|| format!("Failed to open partition: {PREFS_PARTITION}"))?;
        Ok(Self { partition })
    }

    pub fn get(&self, module: &str, name: &str) -> Result<Option<String>> {
        match self.partition.get(format!("{module}.{name}"))? {
            Some(value) => Ok(Some(
                String::from_utf8(value.to_vec()).context("Preference is not UTF-8")?,
            )),
            None => Ok(None),
        }
    }

    pub fn put(&self, module: &str, name: &str, value: &str) -> Result<()> {
        self.partition.insert(format!("{module}.{name}"), value)?;
        Ok(())
    }
}
