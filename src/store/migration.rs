//! Per-table schema versions and ordered upgrades

use super::table::Table;
use anyhow::{Result, bail};
use serde_json::Value;
use tracing::info;

/// Upgrades the rows of a table from `from` to `from + 1`.
pub struct Migration {
    pub from: u32,
    pub migrate: fn(Value) -> Result<Value>,
}

/// Brings `table` to `latest`, applying `migrations` in order.
///
/// A table without a recorded version is created at `latest` when empty and
/// treated as version 1 otherwise.
pub fn migrate(table: &Table, latest: u32, migrations: &[Migration]) -> Result<()> {
    let mut version = match table.schema_version()? {
        Some(version) => version,
        None if table.is_empty()? => {
            table.set_schema_version(latest)?;
            return Ok(());
        }
        None => 1,
    };

    if version > latest {
        bail!(
            "Table {} has schema version {version}, newer than supported {latest}",
            table.name()
        );
    }

    while version < latest {
        let Some(step) = migrations.iter().find(|m| m.from == version) else {
            bail!(
                "No migration for table {} from version {version}",
                table.name()
            );
        };
        info!(table = table.name(), from = version, to = version + 1, "Migrating table");
        table.rewrite_rows(step.migrate)?;
        version += 1;
        table.set_schema_version(version)?;
    }
    Ok(())
}

/// Adds `field` with `default` to a JSON object row when missing.
pub(crate) fn add_field(mut row: Value, field: &str, default: Value) -> Result<Value> {
    let Some(object) = row.as_object_mut() else {
        bail!("Expected a JSON object row");
    };
    object.entry(field).or_insert(default);
    Ok(row)
}

pub(crate) fn rename_field(mut row: Value, from: &str, to: &str) -> Result<Value> {
    let Some(object) = row.as_object_mut() else {
        bail!("Expected a JSON object row");
    };
    if let Some(value) = object.remove(from) {
        object.insert(to.to_string(), value);
    }
    Ok(row)
}
