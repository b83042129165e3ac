use super::ui;
use crate::store::QuoteDatabase;
use anyhow::{Result, bail};
use clap::Subcommand;

#[derive(Debug, Clone, Subcommand)]
pub enum HistoryAction {
    /// List every quote shown so far, newest first
    List,
    /// Find quotes whose text, source or author contain a keyword
    Search { keyword: String },
    /// Delete one history entry
    Delete { id: u64 },
    /// Delete the whole history
    Clear,
}

pub fn run(database: &QuoteDatabase, action: HistoryAction) -> Result<()> {
    match action {
        HistoryAction::List => {
            ui::print_quotes(&database.histories.list()?, "History is empty");
        }
        HistoryAction::Search { keyword } => {
            ui::print_quotes(
                &database.histories.search(&keyword)?,
                &format!("No history entry matches \"{keyword}\""),
            );
        }
        HistoryAction::Delete { id } => {
            if !database.histories.delete(id)? {
                bail!("No history entry with id {id}");
            }
            println!("Deleted history entry {id}");
        }
        HistoryAction::Clear => {
            let count = database.histories.count()?;
            database.histories.clear()?;
            println!("Deleted {count} history entries");
        }
    }
    Ok(())
}
