use super::ui;
use crate::store::QuoteDatabase;
use anyhow::Result;
use clap::Subcommand;
use std::path::PathBuf;

#[derive(Debug, Clone, Subcommand)]
pub enum FortuneAction {
    /// Import a fortune(6) data file
    Import {
        path: PathBuf,
        /// Category of the imported entries, the file name by default
        #[arg(long)]
        category: Option<String>,
    },
    /// Show how many fortunes are stored per category
    Count,
}

pub fn run(database: &QuoteDatabase, action: FortuneAction) -> Result<()> {
    match action {
        FortuneAction::Import { path, category } => {
            let spinner = ui::new_spinner(&format!("Importing {}", path.display()))?;
            let imported = database.fortunes.import_file(&path, category.as_deref());
            spinner.finish_and_clear();
            println!("Imported {} fortunes from {}", imported?, path.display());
        }
        FortuneAction::Count => {
            let categories = database.fortunes.categories()?;
            println!(
                "{} fortunes in {} categories",
                database.fortunes.count()?,
                categories.len()
            );
            for category in categories {
                println!("  {}", ui::style_text(&category, ui::StyleType::Subtle));
            }
        }
    }
    Ok(())
}
