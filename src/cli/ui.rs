use crate::core::quote::QuoteDataWithCollectState;
use crate::store::QuoteEntity;
use anyhow::Result;
use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Defines different styles for text elements.
pub enum StyleType {
    Title,
    Quote,
    Source,
    Error,
    Subtle,
}

/// Applies a consistent style to a string.
pub fn style_text(text: &str, style_type: StyleType) -> String {
    let styled = match style_type {
        StyleType::Title => style(text).bold().underlined(),
        StyleType::Quote => style(text).bold(),
        StyleType::Source => style(text).cyan().italic(),
        StyleType::Error => style(text).red(),
        StyleType::Subtle => style(text).dim(),
    };
    styled.to_string()
}

/// Creates a new `comfy_table::Table` with standard styling.
pub fn new_styled_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

/// Creates a styled header cell for a table.
pub fn header_cell(text: &str) -> Cell {
    Cell::new(text)
        .fg(Color::Cyan)
        .add_attribute(Attribute::Bold)
}

pub fn id_cell(id: Option<u64>) -> Cell {
    id.map_or(Cell::new("-").fg(Color::DarkGrey), |id| {
        Cell::new(id).set_alignment(CellAlignment::Right)
    })
}

/// Empty values are displayed as a dimmed dash.
pub fn text_cell(text: &str) -> Cell {
    if text.is_empty() {
        Cell::new("-").fg(Color::DarkGrey)
    } else {
        Cell::new(text)
    }
}

/// Table of stored quotes, one row per entity.
pub fn quote_table(entities: &[QuoteEntity]) -> Table {
    let mut table = new_styled_table();
    table.set_header(vec![
        header_cell("Id"),
        header_cell("Quote"),
        header_cell("Source"),
        header_cell("Author"),
        header_cell("Provider"),
    ]);
    for entity in entities {
        table.add_row(vec![
            id_cell(entity.id),
            text_cell(&entity.text),
            text_cell(&entity.source),
            text_cell(&entity.author),
            Cell::new(&entity.provider).fg(Color::DarkGrey),
        ]);
    }
    table
}

/// Prints a quote list, or `empty_message` when there is nothing to show.
pub fn print_quotes(entities: &[QuoteEntity], empty_message: &str) {
    if entities.is_empty() {
        println!("{}", style_text(empty_message, StyleType::Subtle));
        return;
    }
    println!("{}", quote_table(entities));
    println!(
        "{}",
        style_text(&format!("{} quote(s)", entities.len()), StyleType::Subtle)
    );
}

/// Prints a quote the way a lock screen would show it.
pub fn print_quote(current: &QuoteDataWithCollectState) {
    let quote = &current.quote;
    println!("{}", style_text(&quote.text, StyleType::Quote));
    let source = quote.readable_source();
    if !source.is_empty() {
        println!("{}", style_text(&source, StyleType::Source));
    }
    let collected = match current.collect_state {
        Some(true) => "★ collected",
        Some(false) => "☆ not collected",
        None => "",
    };
    println!(
        "{}",
        style_text(
            &format!("{} {collected}", quote.provider).trim_end().to_string(),
            StyleType::Subtle
        )
    );
}

/// Creates a new `indicatif::ProgressBar` spinner with standard styling.
pub fn new_spinner(message: &str) -> Result<ProgressBar> {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(ProgressStyle::default_spinner().template("{spinner:.green} {msg}")?);
    spinner.set_message(message.to_string());
    spinner.enable_steady_tick(Duration::from_millis(100));
    Ok(spinner)
}

/// Prints a separator line matching the terminal width.
pub fn print_separator() {
    let term_width = console::Term::stdout()
        .size_checked()
        .map(|(_, w)| w as usize)
        .unwrap_or(80);
    println!("{}", style_text(&"─".repeat(term_width), StyleType::Subtle));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::quote::QuoteData;

    #[test]
    fn test_quote_table_rows() {
        let entities = vec![
            QuoteEntity {
                id: Some(7),
                ..QuoteEntity::from(&QuoteData::new("First", "Book", "", "hitokoto"))
            },
            QuoteEntity::from(&QuoteData::new("Second", "", "Someone", "custom")),
        ];
        let rendered = quote_table(&entities).to_string();
        assert!(rendered.contains("First"));
        assert!(rendered.contains("Someone"));
        assert!(rendered.contains('7'));
    }
}
