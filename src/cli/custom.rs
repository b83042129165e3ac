use super::ui;
use crate::store::QuoteDatabase;
use anyhow::{Result, bail};
use clap::Subcommand;
use comfy_table::Cell;

#[derive(Debug, Clone, Subcommand)]
pub enum CustomAction {
    /// Add a quote of your own
    Add {
        text: String,
        #[arg(short, long, default_value = "")]
        source: String,
        #[arg(short, long, default_value = "")]
        author: String,
    },
    /// List your quotes
    List,
    /// Change fields of one of your quotes
    Update {
        id: u64,
        #[arg(short, long)]
        text: Option<String>,
        #[arg(short, long)]
        source: Option<String>,
        #[arg(short, long)]
        author: Option<String>,
    },
    /// Remove one of your quotes
    Remove { id: u64 },
}

pub fn run(database: &QuoteDatabase, action: CustomAction) -> Result<()> {
    let custom_quotes = &database.custom_quotes;
    match action {
        CustomAction::Add { text, source, author } => {
            if text.trim().is_empty() {
                bail!("Quote text must not be empty");
            }
            let id = custom_quotes.insert(text.trim(), source.trim(), author.trim())?;
            println!("Added custom quote {id}");
        }
        CustomAction::List => {
            let quotes = custom_quotes.list()?;
            if quotes.is_empty() {
                println!(
                    "{}",
                    ui::style_text("No custom quotes", ui::StyleType::Subtle)
                );
                return Ok(());
            }
            let mut table = ui::new_styled_table();
            table.set_header(vec![
                ui::header_cell("Id"),
                ui::header_cell("Quote"),
                ui::header_cell("Source"),
                ui::header_cell("Author"),
            ]);
            for quote in &quotes {
                table.add_row(vec![
                    ui::id_cell(quote.id),
                    Cell::new(&quote.text),
                    ui::text_cell(&quote.source),
                    ui::text_cell(&quote.author),
                ]);
            }
            println!("{table}");
        }
        CustomAction::Update { id, text, source, author } => {
            let Some(mut quote) = custom_quotes.get(id)? else {
                bail!("No custom quote with id {id}");
            };
            if let Some(text) = text {
                if text.trim().is_empty() {
                    bail!("Quote text must not be empty");
                }
                quote.text = text.trim().to_string();
            }
            if let Some(source) = source {
                quote.source = source.trim().to_string();
            }
            if let Some(author) = author {
                quote.author = author.trim().to_string();
            }
            custom_quotes.update(&quote)?;
            println!("Updated custom quote {id}");
        }
        CustomAction::Remove { id } => {
            if !custom_quotes.delete(id)? {
                bail!("No custom quote with id {id}");
            }
            println!("Removed custom quote {id}");
        }
    }
    Ok(())
}
