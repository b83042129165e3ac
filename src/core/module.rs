//! Quote provider abstraction

use super::quote::QuoteData;
use anyhow::Result;
use async_trait::async_trait;
use serde::Serialize;
use std::fmt::Display;

/// Minimum refresh interval of a module whose quote must never be refreshed
/// automatically.
pub const NEVER_REFRESH: u32 = u32::MAX;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CharacterType {
    Default,
    Latin,
    Cjk,
}

impl Display for CharacterType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                CharacterType::Default => "default",
                CharacterType::Latin => "latin",
                CharacterType::Cjk => "cjk",
            }
        )
    }
}

/// Fetches quotes from one source.
///
/// Everything except [`QuoteModule::fetch_quote`] must return immediately.
#[async_trait]
pub trait QuoteModule: Send + Sync {
    /// Stable identifier, used as the registry key and in configuration.
    fn id(&self) -> &'static str;

    fn display_name(&self) -> &'static str;

    /// Minimum refresh interval in seconds. `0` means no minimum and
    /// [`NEVER_REFRESH`] disables automatic refresh.
    fn minimum_refresh_interval(&self) -> u32 {
        0
    }

    /// Whether the module downloads data from the internet.
    fn requires_internet(&self) -> bool {
        true
    }

    fn character_type(&self) -> CharacterType {
        CharacterType::Default
    }

    /// Gets a new quote. `Ok(None)` means the source answered without a usable
    /// quote.
    async fn fetch_quote(&self) -> Result<Option<QuoteData>>;
}

/// Static description of a module.
#[derive(Debug, Clone, Serialize)]
pub struct QuoteModuleData {
    pub id: String,
    pub display_name: String,
    pub minimum_refresh_interval: u32,
    pub requires_internet: bool,
    pub character_type: CharacterType,
}

impl From<&dyn QuoteModule> for QuoteModuleData {
    fn from(module: &dyn QuoteModule) -> Self {
        Self {
            id: module.id().to_string(),
            display_name: module.display_name().to_string(),
            minimum_refresh_interval: module.minimum_refresh_interval(),
            requires_internet: module.requires_internet(),
            character_type: module.character_type(),
        }
    }
}
