//! Core quote abstractions and the refresh pipeline

pub mod config;
pub mod log;
pub mod module;
pub mod network;
pub mod quote;
pub mod repository;
pub mod scheduler;

// Re-export main types for cleaner imports
pub use module::{CharacterType, NEVER_REFRESH, QuoteModule, QuoteModuleData};
pub use quote::{QuoteData, QuoteDataWithCollectState};
pub use repository::QuoteRepository;
pub use scheduler::{RefreshOutcome, RefreshScheduler, SchedulerHandle};
