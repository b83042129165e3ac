pub mod collection;
pub mod current;
pub mod custom;
pub mod daemon;
pub mod fortune;
pub mod history;
pub mod modules;
pub mod refresh;
pub mod setup;
pub mod ui;
