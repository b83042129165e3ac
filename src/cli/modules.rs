use super::ui;
use crate::core::config::RefreshConfig;
use crate::core::module::QuoteModuleData;
use crate::core::scheduler::refresh_interval;
use crate::providers::registry::ModuleRegistry;
use comfy_table::{Cell, CellAlignment, Color};

fn interval_cell(module: &QuoteModuleData, refresh: &RefreshConfig) -> Cell {
    match refresh_interval(refresh, module.minimum_refresh_interval) {
        Some(interval) => {
            Cell::new(format!("{}s", interval.as_secs())).set_alignment(CellAlignment::Right)
        }
        None => Cell::new("never").fg(Color::DarkGrey),
    }
}

/// Prints every registered module, marking the active one.
pub fn run(registry: &ModuleRegistry, active: &str, refresh: &RefreshConfig) {
    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell(""),
        ui::header_cell("Id"),
        ui::header_cell("Name"),
        ui::header_cell("Interval"),
        ui::header_cell("Internet"),
        ui::header_cell("Characters"),
    ]);
    for module in registry.modules() {
        let data = QuoteModuleData::from(module.as_ref());
        let marker = if data.id == active {
            Cell::new("*").fg(Color::Green)
        } else {
            Cell::new("")
        };
        table.add_row(vec![
            marker,
            Cell::new(&data.id),
            Cell::new(&data.display_name),
            interval_cell(&data, refresh),
            Cell::new(if data.requires_internet { "yes" } else { "no" }),
            Cell::new(data.character_type),
        ]);
    }
    println!("{table}");
}
