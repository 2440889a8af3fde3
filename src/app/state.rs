use std::path::PathBuf;
use std::sync::Arc;

use unicode_segmentation::UnicodeSegmentation;

use crate::app::list_view::{ModuleListView, RowContext};
use crate::catalog::{Catalog, Item, Module};
use crate::config::themes::{Palette, ThemeName, ThemeRegistry};
use crate::highlight::build_highlight_regex;
use crate::notes::{NoteBook, NoteEntry};
use crate::search::{character_options, filter_modules, CharacterFilter, ModuleQuery};

const INPUT_LIMIT: usize = 240;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusPane {
    Modules,
    Items,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusMessage {
    pub text: String,
    pub severity: Severity,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotesFocus {
    Names,
    Entries,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryMode {
    Add,
    Edit(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryField {
    Module,
    Item,
    Description,
}

impl EntryField {
    fn next(self) -> Self {
        match self {
            EntryField::Module => EntryField::Item,
            EntryField::Item => EntryField::Description,
            EntryField::Description => EntryField::Module,
        }
    }
}

#[derive(Debug, Clone)]
pub struct EntryDialog {
    pub mode: EntryMode,
    pub note: String,
    pub module_ids: Vec<String>,
    pub module_index: Option<usize>,
    pub item_index: Option<usize>,
    pub description: String,
    pub field: EntryField,
    pub warning: Option<String>,
}

#[derive(Debug, Clone)]
pub enum NotesDialog {
    NewNote { name: String, warning: Option<String> },
    Entry(EntryDialog),
    ConfirmDelete { index: usize },
}

#[derive(Debug, Clone)]
pub struct NotesOverlay {
    pub selected_note: usize,
    pub selected_entry: usize,
    pub focus: NotesFocus,
    pub dialog: Option<NotesDialog>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingsField {
    Editor,
    Theme,
}

#[derive(Debug, Clone)]
pub struct SettingsOverlay {
    pub editor_input: String,
    pub field: SettingsField,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetupField {
    Editor,
    WinePrefix,
}

#[derive(Debug, Clone)]
pub struct SetupOverlay {
    pub editor_input: String,
    pub prefix_input: String,
    pub field: SetupField,
    pub error: Option<String>,
}

#[derive(Debug, Clone)]
pub struct MessageOverlay {
    pub title: String,
    pub body: String,
    pub severity: Severity,
}

#[derive(Debug, Clone)]
pub enum OverlayState {
    Setup(SetupOverlay),
    Notes(NotesOverlay),
    Settings(SettingsOverlay),
    Message(MessageOverlay),
}

pub struct AppState {
    catalog: Arc<Catalog>,
    pub notes: NoteBook,
    pub query: ModuleQuery,
    character_options: Vec<String>,
    pub list: ModuleListView,
    pub focus: FocusPane,
    pub item_selected: usize,
    search_active: bool,
    status: Option<StatusMessage>,
    overlay: Option<OverlayState>,
    theme: ThemeName,
    palette: Palette,
    images_dir: PathBuf,
}

impl AppState {
    pub fn new(
        catalog: Arc<Catalog>,
        notes: NoteBook,
        theme: ThemeName,
        images_dir: PathBuf,
    ) -> Self {
        let character_options = character_options(&catalog);
        let palette = *ThemeRegistry::default().palette(theme);
        let mut state = Self {
            catalog,
            notes,
            query: ModuleQuery::default(),
            character_options,
            list: ModuleListView::default(),
            focus: FocusPane::Modules,
            item_selected: 0,
            search_active: false,
            status: None,
            overlay: None,
            theme,
            palette,
            images_dir,
        };
        state.apply_filter();
        state
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn theme(&self) -> ThemeName {
        self.theme
    }

    pub fn palette(&self) -> &Palette {
        &self.palette
    }

    pub fn images_dir(&self) -> &std::path::Path {
        &self.images_dir
    }

    pub fn set_theme(&mut self, theme: ThemeName) {
        if theme == self.theme {
            return;
        }
        self.theme = theme;
        self.palette = *ThemeRegistry::default().palette(theme);
        self.list.invalidate();
    }

    /// Sizes the list viewport and redraws the rows that became visible or
    /// stale since the previous frame.
    pub fn prepare_list(&mut self, width: u16, height: u16) -> usize {
        self.list.set_viewport_height(height as usize);
        let highlight = build_highlight_regex(&self.query.highlight_terms());
        let ctx = RowContext {
            palette: &self.palette,
            width,
            highlight: highlight.as_ref(),
        };
        self.list.refresh_visible(&ctx)
    }

    fn apply_filter(&mut self) {
        let modules = filter_modules(&self.catalog, &self.query);
        self.list.rebuild(&modules, &self.images_dir);
        self.list.invalidate();
        self.item_selected = 0;
    }

    pub fn selected_module(&self) -> Option<&Module> {
        self.list
            .selected_module_id()
            .and_then(|id| self.catalog.get(id))
    }

    pub fn selected_item(&self) -> Option<&Item> {
        self.selected_module()
            .and_then(|module| module.items.get(self.item_selected))
    }

    pub fn move_selection(&mut self, delta: isize) {
        match self.focus {
            FocusPane::Modules => {
                self.list.move_selection(delta);
                self.item_selected = 0;
            }
            FocusPane::Items => {
                let count = self
                    .selected_module()
                    .map(|module| module.items.len())
                    .unwrap_or(0);
                if count == 0 {
                    return;
                }
                let next = (self.item_selected as isize + delta).clamp(0, count as isize - 1);
                self.item_selected = next as usize;
            }
        }
    }

    pub fn toggle_focus(&mut self) {
        self.focus = match self.focus {
            FocusPane::Modules if self.selected_module().is_some() => FocusPane::Items,
            FocusPane::Modules => FocusPane::Modules,
            FocusPane::Items => FocusPane::Modules,
        };
    }

    pub fn is_search_active(&self) -> bool {
        self.search_active
    }

    pub fn begin_search(&mut self) {
        self.search_active = true;
        self.focus = FocusPane::Modules;
    }

    pub fn finish_search(&mut self) {
        self.search_active = false;
    }

    pub fn cancel_search(&mut self) {
        self.search_active = false;
        if !self.query.text.is_empty() {
            self.query.text.clear();
            self.apply_filter();
        }
    }

    pub fn push_search_char(&mut self, ch: char) {
        if self.query.text.len() < INPUT_LIMIT {
            self.query.text.push(ch);
            self.apply_filter();
        }
    }

    pub fn pop_search_char(&mut self) {
        if pop_grapheme(&mut self.query.text) {
            self.apply_filter();
        }
    }

    pub fn character_options(&self) -> &[String] {
        &self.character_options
    }

    /// Advances the character filter to the next option, wrapping around.
    pub fn cycle_character(&mut self, delta: isize) {
        if self.character_options.is_empty() {
            return;
        }
        let current = self
            .character_options
            .iter()
            .position(|option| option == self.query.character.label())
            .unwrap_or(0) as isize;
        let len = self.character_options.len() as isize;
        let next = (current + delta).rem_euclid(len) as usize;
        self.query.character = CharacterFilter::from_label(&self.character_options[next]);
        self.apply_filter();
    }

    pub fn status(&self) -> Option<&StatusMessage> {
        self.status.as_ref()
    }

    pub fn set_status<S: Into<String>>(&mut self, severity: Severity, text: S) {
        self.status = Some(StatusMessage {
            text: text.into(),
            severity,
        });
    }

    pub fn clear_status(&mut self) {
        self.status = None;
    }

    pub fn overlay(&self) -> Option<&OverlayState> {
        self.overlay.as_ref()
    }

    pub fn overlay_mut(&mut self) -> Option<&mut OverlayState> {
        self.overlay.as_mut()
    }

    pub fn close_overlay(&mut self) {
        self.overlay = None;
    }

    pub fn open_setup(&mut self, editor: String, prefix: String) {
        self.overlay = Some(OverlayState::Setup(SetupOverlay {
            editor_input: editor,
            prefix_input: prefix,
            field: SetupField::Editor,
            error: None,
        }));
    }

    pub fn open_settings(&mut self, editor: String) {
        self.overlay = Some(OverlayState::Settings(SettingsOverlay {
            editor_input: editor,
            field: SettingsField::Editor,
        }));
    }

    pub fn show_message<T: Into<String>, B: Into<String>>(
        &mut self,
        severity: Severity,
        title: T,
        body: B,
    ) {
        self.overlay = Some(OverlayState::Message(MessageOverlay {
            title: title.into(),
            body: body.into(),
            severity,
        }));
    }

    pub fn open_notes(&mut self) {
        self.overlay = Some(OverlayState::Notes(NotesOverlay {
            selected_note: 0,
            selected_entry: 0,
            focus: NotesFocus::Names,
            dialog: None,
        }));
    }

    pub fn notes_overlay(&self) -> Option<&NotesOverlay> {
        match self.overlay.as_ref() {
            Some(OverlayState::Notes(overlay)) => Some(overlay),
            _ => None,
        }
    }

    pub fn notes_overlay_mut(&mut self) -> Option<&mut NotesOverlay> {
        match self.overlay.as_mut() {
            Some(OverlayState::Notes(overlay)) => Some(overlay),
            _ => None,
        }
    }

    pub fn selected_note_name(&self) -> Option<&str> {
        let overlay = self.notes_overlay()?;
        self.notes.names().nth(overlay.selected_note)
    }

    pub fn selected_note_entry(&self) -> Option<(usize, &NoteEntry)> {
        let overlay = self.notes_overlay()?;
        let name = self.selected_note_name()?;
        self.notes
            .entries(name)?
            .get(overlay.selected_entry)
            .map(|entry| (overlay.selected_entry, entry))
    }

    pub fn notes_move(&mut self, delta: isize) {
        let note_count = self.notes.len();
        let entry_count = self
            .selected_note_name()
            .and_then(|name| self.notes.entries(name))
            .map(<[NoteEntry]>::len)
            .unwrap_or(0);
        let Some(overlay) = self.notes_overlay_mut() else {
            return;
        };
        match overlay.focus {
            NotesFocus::Names => {
                overlay.selected_note = step(overlay.selected_note, delta, note_count);
                overlay.selected_entry = 0;
            }
            NotesFocus::Entries => {
                overlay.selected_entry = step(overlay.selected_entry, delta, entry_count);
            }
        }
    }

    pub fn notes_toggle_focus(&mut self) {
        if let Some(overlay) = self.notes_overlay_mut() {
            overlay.focus = match overlay.focus {
                NotesFocus::Names => NotesFocus::Entries,
                NotesFocus::Entries => NotesFocus::Names,
            };
        }
    }

    /// Keeps note/entry cursors in range after the book changed.
    pub fn notes_select(&mut self, name: Option<&str>) {
        let position = name.and_then(|name| self.notes.names().position(|n| n == name));
        let current = self.notes_overlay().map(|o| o.selected_note).unwrap_or(0);
        let note_index = position
            .unwrap_or(current)
            .min(self.notes.len().saturating_sub(1));
        let entry_count = self
            .notes
            .names()
            .nth(note_index)
            .and_then(|n| self.notes.entries(n))
            .map(<[NoteEntry]>::len)
            .unwrap_or(0);
        if let Some(overlay) = self.notes_overlay_mut() {
            overlay.selected_note = note_index;
            overlay.selected_entry = overlay.selected_entry.min(entry_count.saturating_sub(1));
        }
    }

    pub fn open_new_note_dialog(&mut self) {
        if let Some(overlay) = self.notes_overlay_mut() {
            overlay.dialog = Some(NotesDialog::NewNote {
                name: String::new(),
                warning: None,
            });
        }
    }

    pub fn open_entry_dialog(&mut self, mode: EntryMode) {
        let Some(note) = self.selected_note_name().map(str::to_string) else {
            self.set_status(Severity::Warning, "Select a note first");
            return;
        };
        let module_ids: Vec<String> = self
            .catalog
            .picker_order()
            .into_iter()
            .map(|module| module.id.clone())
            .collect();
        let mut dialog = EntryDialog {
            mode,
            note,
            module_ids,
            module_index: None,
            item_index: None,
            description: String::new(),
            field: EntryField::Module,
            warning: None,
        };
        if let EntryMode::Edit(index) = mode {
            let Some(entry) = self
                .notes
                .entries(&dialog.note)
                .and_then(|entries| entries.get(index))
                .cloned()
            else {
                return;
            };
            dialog.module_index = dialog
                .module_ids
                .iter()
                .position(|id| *id == entry.module_id);
            dialog.item_index = self.catalog.get(&entry.module_id).and_then(|module| {
                module
                    .items
                    .iter()
                    .position(|item| item.item_id == entry.item_id)
            });
            dialog.description = entry.description;
        }
        if let Some(overlay) = self.notes_overlay_mut() {
            overlay.dialog = Some(NotesDialog::Entry(dialog));
        }
    }

    pub fn entry_dialog_mut(&mut self) -> Option<&mut EntryDialog> {
        match self.notes_overlay_mut()?.dialog.as_mut() {
            Some(NotesDialog::Entry(dialog)) => Some(dialog),
            _ => None,
        }
    }

    pub fn entry_dialog_next_field(&mut self) {
        if let Some(dialog) = self.entry_dialog_mut() {
            dialog.field = dialog.field.next();
        }
    }

    /// Moves the module or item picker, whichever has focus.
    pub fn entry_dialog_pick(&mut self, delta: isize) {
        let catalog = Arc::clone(&self.catalog);
        let Some(dialog) = self.entry_dialog_mut() else {
            return;
        };
        match dialog.field {
            EntryField::Module => {
                let count = dialog.module_ids.len();
                if count == 0 {
                    return;
                }
                let next = match dialog.module_index {
                    Some(current) => step(current, delta, count),
                    None => 0,
                };
                if dialog.module_index != Some(next) {
                    dialog.module_index = Some(next);
                    dialog.item_index = None;
                }
            }
            EntryField::Item => {
                let count = dialog
                    .module_index
                    .and_then(|idx| dialog.module_ids.get(idx))
                    .and_then(|id| catalog.get(id))
                    .map(|module| module.items.len())
                    .unwrap_or(0);
                if count == 0 {
                    return;
                }
                dialog.item_index = Some(match dialog.item_index {
                    Some(current) => step(current, delta, count),
                    None => 0,
                });
            }
            EntryField::Description => {}
        }
    }

    /// Module and item IDs picked in the entry dialog, empty when unset.
    pub fn entry_dialog_selection(&self, dialog: &EntryDialog) -> (String, String) {
        let module = dialog
            .module_index
            .and_then(|idx| dialog.module_ids.get(idx))
            .and_then(|id| self.catalog.get(id));
        let item = module
            .zip(dialog.item_index)
            .and_then(|(module, idx)| module.items.get(idx));
        (
            module.map(|m| m.id.clone()).unwrap_or_default(),
            item.map(|i| i.item_id.clone()).unwrap_or_default(),
        )
    }
}

fn step(current: usize, delta: isize, len: usize) -> usize {
    if len == 0 {
        return 0;
    }
    (current as isize + delta).clamp(0, len as isize - 1) as usize
}

/// Removes the last grapheme; false when the text was already empty.
pub fn pop_grapheme(text: &mut String) -> bool {
    match text.grapheme_indices(true).next_back() {
        Some((idx, _)) => {
            text.truncate(idx);
            true
        }
        None => false,
    }
}

pub fn push_limited(text: &mut String, ch: char) {
    if text.len() < INPUT_LIMIT {
        text.push(ch);
    }
}
