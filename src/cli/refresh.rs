use super::ui;
use crate::core::scheduler::{RefreshOutcome, RefreshScheduler};
use anyhow::{Result, bail};

/// Fetches one quote from the active module and prints it.
pub async fn run(scheduler: &RefreshScheduler) -> Result<()> {
    let module = scheduler.repository().active_module()?;
    let spinner = ui::new_spinner(&format!("Fetching a quote from {}", module.display_name()))?;
    let outcome = scheduler.run_once().await;
    spinner.finish_and_clear();

    match outcome? {
        RefreshOutcome::Updated(quote) => {
            ui::print_quote(&quote);
            Ok(())
        }
        RefreshOutcome::Skipped(status) => {
            println!(
                "{}",
                ui::style_text(
                    &format!("Skipped: {} needs a suitable network ({status:?})", module.id()),
                    ui::StyleType::Error
                )
            );
            Ok(())
        }
        RefreshOutcome::Busy => bail!("Another refresh is already running"),
        RefreshOutcome::Failed => bail!("{} did not return a quote", module.display_name()),
    }
}
