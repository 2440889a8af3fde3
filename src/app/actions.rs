use anyhow::{Context, Result};

use crate::notes::{EntryRemoval, NoteBook, NoteEntry, NotesStore};

/// Applies note mutations and flushes the whole book after each one.
pub struct NoteActions<'a> {
    store: &'a NotesStore,
}

impl<'a> NoteActions<'a> {
    pub fn new(store: &'a NotesStore) -> Self {
        Self { store }
    }

    /// Empty notes are not written to disk until they receive an entry.
    pub fn create_note(&self, book: &mut NoteBook, name: &str) -> Result<String> {
        let name = book.create_note(name)?;
        tracing::debug!(note = %name, "note created");
        Ok(name)
    }

    pub fn add_entry(&self, book: &mut NoteBook, name: &str, entry: NoteEntry) -> Result<()> {
        book.add_entry(name, entry)?;
        self.flush(book)
    }

    pub fn edit_entry(
        &self,
        book: &mut NoteBook,
        name: &str,
        index: usize,
        entry: NoteEntry,
    ) -> Result<()> {
        book.edit_entry(name, index, entry)?;
        self.flush(book)
    }

    pub fn delete_entry(
        &self,
        book: &mut NoteBook,
        name: &str,
        index: usize,
    ) -> Result<EntryRemoval> {
        let removal = book.delete_entry(name, index)?;
        self.flush(book)?;
        Ok(removal)
    }

    fn flush(&self, book: &NoteBook) -> Result<()> {
        self.store
            .save_all(book)
            .with_context(|| format!("saving notes to {}", self.store.path().display()))
    }
}
