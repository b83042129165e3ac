pub mod brainyquote;
pub mod collections;
pub mod custom;
pub mod fortune;
pub mod freakuotes;
pub mod hitokoto;
pub mod jinrishici;
pub mod libquotes;
pub mod natune;
pub mod openai;
pub mod registry;
pub mod util;
pub mod wikiquote;

pub use registry::ModuleRegistry;
