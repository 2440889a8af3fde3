pub mod app;
pub mod catalog;
pub mod cli;
pub mod config;
pub mod highlight;
pub mod launcher;
pub mod notes;
pub mod search;
pub mod ui;

pub use catalog::{Catalog, Item, Module};
pub use config::{ConfigPaths, Settings, SettingsStore};
pub use notes::{NoteBook, NoteEntry, NotesStore};
