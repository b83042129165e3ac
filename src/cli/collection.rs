use super::ui;
use crate::core::repository::QuoteRepository;
use anyhow::{Result, bail};
use clap::Subcommand;
use std::path::PathBuf;

#[derive(Debug, Clone, Subcommand)]
pub enum CollectionAction {
    /// List collected quotes
    List,
    /// Find collected quotes whose text, source or author contain a keyword
    Search { keyword: String },
    /// Collect the current quote
    Add,
    /// Remove a collected quote, or the current one when no id is given
    Remove { id: Option<u64> },
    /// Remove every collected quote
    Clear,
    /// Write the collection to a CSV file
    Export { path: PathBuf },
    /// Replace the collection with the contents of a CSV file
    Import { path: PathBuf },
}

pub fn run(repository: &QuoteRepository, action: CollectionAction) -> Result<()> {
    let collections = &repository.database().collections;
    match action {
        CollectionAction::List => {
            ui::print_quotes(&collections.list()?, "No collected quotes");
        }
        CollectionAction::Search { keyword } => {
            ui::print_quotes(
                &collections.search(&keyword)?,
                &format!("No collected quote matches \"{keyword}\""),
            );
        }
        CollectionAction::Add => {
            if !repository.collect_current()? {
                bail!("There is no current quote to collect, refresh first");
            }
            println!("Collected the current quote");
        }
        CollectionAction::Remove { id: Some(id) } => {
            if !collections.delete(id)? {
                bail!("No collected quote with id {id}");
            }
            repository.sync_collection_state()?;
            println!("Removed collected quote {id}");
        }
        CollectionAction::Remove { id: None } => {
            if !repository.uncollect_current()? {
                bail!("The current quote is not collected");
            }
            println!("Removed the current quote from the collection");
        }
        CollectionAction::Clear => {
            let count = collections.count()?;
            repository.clear_collection()?;
            println!("Removed {count} collected quotes");
        }
        CollectionAction::Export { path } => {
            let count = collections.export_csv(&path)?;
            println!("Exported {count} quotes to {}", path.display());
        }
        CollectionAction::Import { path } => {
            let count = repository.import_collection(&path)?;
            println!("Imported {count} quotes from {}", path.display());
        }
    }
    Ok(())
}
