use super::ui;
use crate::core::repository::QuoteRepository;
use anyhow::Result;
use chrono::Local;

pub fn run(repository: &QuoteRepository) -> Result<()> {
    let Some(current) = repository.current_quote()? else {
        println!(
            "{}",
            ui::style_text("No quote yet, run `quotelock refresh`", ui::StyleType::Subtle)
        );
        return Ok(());
    };
    ui::print_quote(&current);
    if let Some(updated) = repository.last_update_time()? {
        let updated = updated.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S");
        println!(
            "{}",
            ui::style_text(&format!("Updated {updated}"), ui::StyleType::Subtle)
        );
    }
    Ok(())
}
