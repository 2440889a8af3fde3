use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use indexmap::IndexMap;
use thiserror::Error;

use crate::catalog::{Catalog, Item};

const NOTES_TMP_EXTENSION: &str = "csv.tmp";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum NotesError {
    #[error("note name cannot be empty")]
    EmptyName,
    #[error("a note named '{0}' already exists")]
    DuplicateNote(String),
    #[error("no note named '{0}'")]
    UnknownNote(String),
    #[error("note '{note}' has no entry #{index}")]
    UnknownEntry { note: String, index: usize },
    #[error("{0} is required")]
    MissingField(&'static str),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteEntry {
    pub module_id: String,
    pub item_id: String,
    pub description: String,
}

impl NoteEntry {
    /// Trims every field and rejects empty ones.
    pub fn new(
        module_id: impl AsRef<str>,
        item_id: impl AsRef<str>,
        description: impl AsRef<str>,
    ) -> Result<Self, NotesError> {
        let module_id = required(module_id.as_ref(), "module")?;
        let item_id = required(item_id.as_ref(), "item")?;
        let description = required(description.as_ref(), "description")?;
        Ok(Self {
            module_id,
            item_id,
            description,
        })
    }

    /// The catalog item this entry points at; `None` for dangling references.
    pub fn resolve<'a>(&self, catalog: &'a Catalog) -> Option<&'a Item> {
        catalog.item(&self.module_id, &self.item_id)
    }
}

fn required(value: &str, field: &'static str) -> Result<String, NotesError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(NotesError::MissingField(field))
    } else {
        Ok(trimmed.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryRemoval {
    pub note_removed: bool,
}

/// Notes grouped by name, in the order names were first seen.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NoteBook {
    notes: IndexMap<String, Vec<NoteEntry>>,
}

impl NoteBook {
    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.notes.keys().map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.notes.contains_key(name)
    }

    pub fn entries(&self, name: &str) -> Option<&[NoteEntry]> {
        self.notes.get(name).map(Vec::as_slice)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[NoteEntry])> {
        self.notes
            .iter()
            .map(|(name, entries)| (name.as_str(), entries.as_slice()))
    }

    pub fn create_note(&mut self, name: &str) -> Result<String, NotesError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(NotesError::EmptyName);
        }
        if self.notes.contains_key(name) {
            return Err(NotesError::DuplicateNote(name.to_string()));
        }
        self.notes.insert(name.to_string(), Vec::new());
        Ok(name.to_string())
    }

    /// Appends to the named note, creating it when absent.
    pub fn add_entry(&mut self, name: &str, entry: NoteEntry) -> Result<(), NotesError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(NotesError::EmptyName);
        }
        self.notes.entry(name.to_string()).or_default().push(entry);
        Ok(())
    }

    pub fn edit_entry(
        &mut self,
        name: &str,
        index: usize,
        entry: NoteEntry,
    ) -> Result<(), NotesError> {
        let entries = self
            .notes
            .get_mut(name)
            .ok_or_else(|| NotesError::UnknownNote(name.to_string()))?;
        let slot = entries.get_mut(index).ok_or_else(|| NotesError::UnknownEntry {
            note: name.to_string(),
            index,
        })?;
        *slot = entry;
        Ok(())
    }

    /// Removes one entry; a note left without entries is removed as well.
    pub fn delete_entry(&mut self, name: &str, index: usize) -> Result<EntryRemoval, NotesError> {
        let entries = self
            .notes
            .get_mut(name)
            .ok_or_else(|| NotesError::UnknownNote(name.to_string()))?;
        if index >= entries.len() {
            return Err(NotesError::UnknownEntry {
                note: name.to_string(),
                index,
            });
        }
        entries.remove(index);
        let note_removed = entries.is_empty();
        if note_removed {
            self.notes.shift_remove(name);
        }
        Ok(EntryRemoval { note_removed })
    }

    /// Loads a row, bypassing validation; used for rows read back from disk.
    fn push_raw(&mut self, name: String, entry: NoteEntry) {
        self.notes.entry(name).or_default().push(entry);
    }
}

/// Headerless four column CSV: note name, module ID, item ID, description.
#[derive(Debug, Clone)]
pub struct NotesStore {
    path: PathBuf,
}

impl NotesStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Missing file reads as an empty book. Short rows are skipped.
    pub fn load(&self) -> Result<NoteBook> {
        let mut book = NoteBook::default();
        if !self.path.exists() {
            return Ok(book);
        }
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_path(&self.path)
            .with_context(|| format!("opening notes {}", self.path.display()))?;
        let mut skipped = 0usize;
        for record in reader.records() {
            let record = record.context("reading notes row")?;
            if record.len() < 4 {
                skipped += 1;
                continue;
            }
            book.push_raw(
                record[0].to_string(),
                NoteEntry {
                    module_id: record[1].to_string(),
                    item_id: record[2].to_string(),
                    description: record[3].to_string(),
                },
            );
        }
        if skipped > 0 {
            tracing::debug!(skipped, "ignored short rows in notes file");
        }
        Ok(book)
    }

    /// Rewrites the whole file from `book`.
    pub fn save_all(&self, book: &NoteBook) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).with_context(|| format!("creating {}", parent.display()))?;
        }
        let tmp_path = self.path.with_extension(NOTES_TMP_EXTENSION);
        {
            let mut writer = csv::WriterBuilder::new()
                .has_headers(false)
                .from_path(&tmp_path)
                .with_context(|| format!("creating {}", tmp_path.display()))?;
            for (name, entries) in book.iter() {
                for entry in entries {
                    writer
                        .write_record([
                            name,
                            entry.module_id.as_str(),
                            entry.item_id.as_str(),
                            entry.description.as_str(),
                        ])
                        .context("writing notes row")?;
                }
            }
            writer.flush().context("flushing notes")?;
        }
        fs::rename(&tmp_path, &self.path)
            .with_context(|| format!("replacing notes {}", self.path.display()))?;
        tracing::debug!(notes = book.len(), path = %self.path.display(), "notes saved");
        Ok(())
    }

    /// Appends one row without touching existing content.
    pub fn append_one(&self, name: &str, entry: &NoteEntry) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).with_context(|| format!("creating {}", parent.display()))?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("opening notes {}", self.path.display()))?;
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);
        writer
            .write_record([
                name,
                entry.module_id.as_str(),
                entry.item_id.as_str(),
                entry.description.as_str(),
            ])
            .context("appending notes row")?;
        writer.flush().context("flushing notes")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use tempfile::TempDir;

    type TestResult<T = ()> = Result<T>;

    fn entry(module: &str, item: &str, desc: &str) -> NoteEntry {
        NoteEntry::new(module, item, desc).expect("valid entry")
    }

    #[test]
    fn load_groups_rows_by_name_in_first_seen_order() -> TestResult {
        let temp = TempDir::new()?;
        let path = temp.path().join("notes.csv");
        fs::write(
            &path,
            "hair,m001,it01,long twin tails\n\
             short row,m002\n\
             outfits,m003,it07,\"coat, red\"\n\
             hair,m004,it02,bob cut\n",
        )?;

        let book = NotesStore::new(&path).load()?;
        assert_eq!(book.names().collect::<Vec<_>>(), vec!["hair", "outfits"]);
        let hair = book.entries("hair").expect("hair note");
        assert_eq!(hair.len(), 2);
        assert_eq!(hair[1], entry("m004", "it02", "bob cut"));
        assert_eq!(
            book.entries("outfits").expect("outfits")[0].description,
            "coat, red"
        );
        Ok(())
    }

    #[test]
    fn load_ignores_fields_after_the_description() -> TestResult {
        let temp = TempDir::new()?;
        let path = temp.path().join("notes.csv");
        fs::write(&path, "n,m001,it01,desc,extra\nn,m002,it02,more,x,y\n")?;

        let book = NotesStore::new(&path).load()?;
        let entries = book.entries("n").expect("note n");
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0], entry("m001", "it01", "desc"));
        assert_eq!(entries[1].description, "more");
        Ok(())
    }

    #[test]
    fn save_all_round_trips_rows_in_order() -> TestResult {
        let temp = TempDir::new()?;
        let path = temp.path().join("notes.csv");
        let original = "b,m002,it02,second note first\n\
                        a,m001,it01,\"quoted, with comma\"\n\
                        b,m009,it03,\"line one\nline two\"\n";
        fs::write(&path, original)?;

        let store = NotesStore::new(&path);
        let book = store.load()?;
        store.save_all(&book)?;
        let reloaded = store.load()?;

        assert_eq!(reloaded, book);
        let flattened: Vec<_> = reloaded
            .iter()
            .flat_map(|(name, entries)| entries.iter().map(move |e| (name, e.item_id.as_str())))
            .collect();
        assert_eq!(
            flattened,
            vec![("b", "it02"), ("b", "it03"), ("a", "it01")]
        );
        assert!(!path.with_extension(NOTES_TMP_EXTENSION).exists());
        Ok(())
    }

    #[test]
    fn deleting_last_entry_removes_the_note() {
        let mut book = NoteBook::default();
        book.add_entry("first", entry("m001", "it01", "a")).expect("add");
        book.add_entry("solo", entry("m002", "it02", "b")).expect("add");
        book.add_entry("last", entry("m003", "it03", "c")).expect("add");

        let removal = book.delete_entry("solo", 0).expect("delete");
        assert!(removal.note_removed);
        assert!(!book.contains("solo"));
        assert!(book.entries("solo").is_none());
        assert_eq!(book.names().collect::<Vec<_>>(), vec!["first", "last"]);
    }

    #[test]
    fn edit_and_delete_validate_indices() {
        let mut book = NoteBook::default();
        book.add_entry("n", entry("m001", "it01", "a")).expect("add");
        book.add_entry("n", entry("m001", "it02", "b")).expect("add");

        book.edit_entry("n", 1, entry("m005", "it09", "changed"))
            .expect("edit");
        assert_eq!(book.entries("n").expect("n")[1].module_id, "m005");

        assert_matches!(
            book.edit_entry("n", 5, entry("m", "i", "d")),
            Err(NotesError::UnknownEntry { index: 5, .. })
        );
        assert_matches!(
            book.delete_entry("missing", 0),
            Err(NotesError::UnknownNote(_))
        );
        let removal = book.delete_entry("n", 0).expect("delete");
        assert!(!removal.note_removed);
        assert_eq!(book.entries("n").expect("n").len(), 1);
    }

    #[test]
    fn create_note_rejects_blank_and_duplicate_names() {
        let mut book = NoteBook::default();
        assert_eq!(book.create_note("  Hair ideas "), Ok("Hair ideas".to_string()));
        assert_eq!(
            book.create_note("Hair ideas"),
            Err(NotesError::DuplicateNote("Hair ideas".into()))
        );
        assert_eq!(book.create_note("   "), Err(NotesError::EmptyName));
        assert_eq!(
            NoteEntry::new("m001", " ", "desc"),
            Err(NotesError::MissingField("item"))
        );
    }

    #[test]
    fn append_one_adds_a_row() -> TestResult {
        let temp = TempDir::new()?;
        let store = NotesStore::new(temp.path().join("nested/notes.csv"));
        store.append_one("n", &entry("m001", "it01", "first"))?;
        store.append_one("n", &entry("m001", "it02", "second"))?;
        let book = store.load()?;
        assert_eq!(book.entries("n").map(<[NoteEntry]>::len), Some(2));
        Ok(())
    }

    #[test]
    fn entries_resolve_against_catalog_and_tolerate_dangling_refs() {
        let csv = "Module ID,Name (EN),Name (JP),Character,Source,COS ID,Item ID,Object(s),Type\n\
                   m001,A,,Miku,X,c1,it01,obj_a,Outfit\n";
        let catalog = Catalog::from_reader(csv.as_bytes()).expect("catalog");
        let live = entry("m001", "it01", "ok");
        let dangling = entry("m404", "it01", "gone");
        assert_eq!(live.resolve(&catalog).map(|item| item.object.as_str()), Some("obj_a"));
        assert!(dangling.resolve(&catalog).is_none());
    }
}
