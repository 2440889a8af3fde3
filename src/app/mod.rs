use std::io::Stdout;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
    KeyModifiers, MouseEventKind,
};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;

use crate::catalog::Catalog;
use crate::config::bootstrap::items_dir_is_empty;
use crate::config::{ConfigPaths, SettingsStore, SettingsWrite};
use crate::launcher::{
    ItemLauncher, LaunchError, ProcessSpawner, Severity as LaunchSeverity, SystemSpawner,
};
use crate::notes::{NoteEntry, NotesStore};
use crate::ui;

mod actions;
pub mod list_view;
pub mod state;

pub use actions::NoteActions;
pub use state::{
    AppState, EntryDialog, EntryField, EntryMode, FocusPane, MessageOverlay, NotesDialog,
    NotesFocus, NotesOverlay, OverlayState, SettingsField, SettingsOverlay, SetupField,
    SetupOverlay, Severity, StatusMessage,
};

use state::{pop_grapheme, push_limited};

const SCROLL_STEP: isize = 3;
const PAGE_STEP: isize = 10;

enum Action {
    Quit,
    SelectNext,
    SelectPrevious,
    PageDown,
    PageUp,
    SelectFirst,
    SelectLast,
    ToggleFocus,
    Activate,
    OpenItem,
    StartSearch,
    NextCharacter,
    PreviousCharacter,
    ShowNotes,
    ShowSettings,
    ToggleTheme,
}

fn is_plain(key: &KeyEvent) -> bool {
    !key.modifiers
        .intersects(KeyModifiers::CONTROL | KeyModifiers::ALT | KeyModifiers::SUPER)
}

pub struct App {
    settings: SettingsStore,
    notes_store: NotesStore,
    paths: ConfigPaths,
    spawner: Box<dyn ProcessSpawner>,
    state: AppState,
    should_quit: bool,
    tick_rate: Duration,
}

impl App {
    pub fn new(paths: ConfigPaths, settings: SettingsStore, catalog: Arc<Catalog>) -> Result<Self> {
        let notes_store = NotesStore::new(paths.notes_csv.clone());
        let notes = notes_store
            .load()
            .with_context(|| format!("loading notes from {}", paths.notes_csv.display()))?;
        let state = AppState::new(catalog, notes, settings.theme(), paths.images_dir.clone());
        let mut app = Self {
            settings,
            notes_store,
            paths,
            spawner: Box::new(SystemSpawner),
            state,
            should_quit: false,
            tick_rate: Duration::from_millis(250),
        };
        app.startup_checks();
        Ok(app)
    }

    pub fn with_spawner(mut self, spawner: Box<dyn ProcessSpawner>) -> Self {
        self.spawner = spawner;
        self
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn should_quit(&self) -> bool {
        self.should_quit
    }

    pub fn run(&mut self) -> Result<()> {
        let mut terminal = setup_terminal()?;
        let result = self.event_loop(&mut terminal);
        restore_terminal(&mut terminal)?;
        result
    }

    fn startup_checks(&mut self) {
        if self.settings.needs_setup() {
            let current = self.settings.settings();
            let editor = current
                .editor_path()
                .map(|path| path.display().to_string())
                .unwrap_or_default();
            let prefix = current
                .wine_prefix()
                .map(|path| path.display().to_string())
                .unwrap_or_default();
            tracing::info!("editor not configured, showing setup");
            self.state.open_setup(editor, prefix);
        } else {
            self.check_items_dir();
        }
    }

    fn check_items_dir(&mut self) {
        if items_dir_is_empty(&self.paths.items_dir) {
            let body = format!(
                "Copy your .farc item files into\n{}\nso they can be opened from the catalog.",
                self.paths.items_dir.display()
            );
            self.state
                .show_message(Severity::Info, "Items folder is empty", body);
        }
    }

    fn event_loop(&mut self, terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
        loop {
            terminal
                .draw(|frame| ui::draw_app(frame, &mut self.state))
                .context("rendering frame")?;

            if self.should_quit {
                break;
            }

            if event::poll(self.tick_rate).context("polling for terminal events")? {
                match event::read().context("reading terminal event")? {
                    Event::Key(key) => self.handle_key(key),
                    Event::Mouse(mouse) if self.state.overlay().is_none() => match mouse.kind {
                        MouseEventKind::ScrollDown => self.state.list.scroll_by(SCROLL_STEP),
                        MouseEventKind::ScrollUp => self.state.list.scroll_by(-SCROLL_STEP),
                        _ => {}
                    },
                    _ => {}
                }
            }
        }
        Ok(())
    }

    pub fn handle_key(&mut self, key: KeyEvent) {
        if key.kind != KeyEventKind::Press {
            return;
        }
        self.state.clear_status();

        if self.handle_overlay_key(key) {
            return;
        }

        if self.state.is_search_active() {
            match key.code {
                KeyCode::Esc => {
                    self.state.cancel_search();
                    return;
                }
                KeyCode::Enter => {
                    self.state.finish_search();
                    return;
                }
                KeyCode::Backspace => {
                    self.state.pop_search_char();
                    return;
                }
                KeyCode::Char(ch) if is_plain(&key) => {
                    self.state.push_search_char(ch);
                    return;
                }
                _ => {}
            }
        }

        let action = match key.code {
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                Some(Action::Quit)
            }
            KeyCode::Char('q') if is_plain(&key) => Some(Action::Quit),
            KeyCode::Char('j') | KeyCode::Down => Some(Action::SelectNext),
            KeyCode::Char('k') | KeyCode::Up => Some(Action::SelectPrevious),
            KeyCode::PageDown => Some(Action::PageDown),
            KeyCode::PageUp => Some(Action::PageUp),
            KeyCode::Home | KeyCode::Char('g') => Some(Action::SelectFirst),
            KeyCode::End | KeyCode::Char('G') => Some(Action::SelectLast),
            KeyCode::Tab | KeyCode::BackTab => Some(Action::ToggleFocus),
            KeyCode::Enter => Some(Action::Activate),
            KeyCode::Char('o') if is_plain(&key) => Some(Action::OpenItem),
            KeyCode::Char('/') if is_plain(&key) => Some(Action::StartSearch),
            KeyCode::Char('c') if is_plain(&key) => Some(Action::NextCharacter),
            KeyCode::Char('C') => Some(Action::PreviousCharacter),
            KeyCode::Char('n') if is_plain(&key) => Some(Action::ShowNotes),
            KeyCode::Char('s') if is_plain(&key) => Some(Action::ShowSettings),
            KeyCode::Char('t') if is_plain(&key) => Some(Action::ToggleTheme),
            _ => None,
        };

        if let Some(action) = action {
            self.handle_action(action);
        }
    }

    fn handle_action(&mut self, action: Action) {
        match action {
            Action::Quit => self.should_quit = true,
            Action::SelectNext => self.state.move_selection(1),
            Action::SelectPrevious => self.state.move_selection(-1),
            Action::PageDown => self.state.move_selection(PAGE_STEP),
            Action::PageUp => self.state.move_selection(-PAGE_STEP),
            Action::SelectFirst => {
                self.state.list.select_first();
                self.state.item_selected = 0;
            }
            Action::SelectLast => {
                self.state.list.select_last();
                self.state.item_selected = 0;
            }
            Action::ToggleFocus => self.state.toggle_focus(),
            Action::Activate => match self.state.focus {
                FocusPane::Modules => self.state.toggle_focus(),
                FocusPane::Items => self.open_selected_item(),
            },
            Action::OpenItem => self.open_selected_item(),
            Action::StartSearch => self.state.begin_search(),
            Action::NextCharacter => self.state.cycle_character(1),
            Action::PreviousCharacter => self.state.cycle_character(-1),
            Action::ShowNotes => self.state.open_notes(),
            Action::ShowSettings => {
                let editor = self
                    .settings
                    .settings()
                    .editor_path()
                    .map(|path| path.display().to_string())
                    .unwrap_or_default();
                self.state.open_settings(editor);
            }
            Action::ToggleTheme => self.toggle_theme(),
        }
    }

    fn handle_overlay_key(&mut self, key: KeyEvent) -> bool {
        match self.state.overlay() {
            Some(OverlayState::Setup(_)) => self.handle_setup_key(key),
            Some(OverlayState::Notes(_)) => self.handle_notes_key(key),
            Some(OverlayState::Settings(_)) => self.handle_settings_key(key),
            Some(OverlayState::Message(_)) => {
                if matches!(
                    key.code,
                    KeyCode::Esc | KeyCode::Enter | KeyCode::Char('q') | KeyCode::Char(' ')
                ) {
                    self.state.close_overlay();
                }
            }
            None => return false,
        }
        true
    }

    fn handle_setup_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Esc => {
                tracing::info!("setup cancelled");
                self.should_quit = true;
            }
            KeyCode::Tab | KeyCode::BackTab | KeyCode::Up | KeyCode::Down => {
                if let Some(OverlayState::Setup(setup)) = self.state.overlay_mut() {
                    setup.field = match setup.field {
                        SetupField::Editor => SetupField::WinePrefix,
                        SetupField::WinePrefix => SetupField::Editor,
                    };
                }
            }
            KeyCode::Enter => self.submit_setup(),
            KeyCode::Backspace => {
                if let Some(input) = self.setup_input() {
                    pop_grapheme(input);
                }
            }
            KeyCode::Char(ch) if is_plain(&key) => {
                if let Some(input) = self.setup_input() {
                    push_limited(input, ch);
                }
            }
            _ => {}
        }
    }

    fn setup_input(&mut self) -> Option<&mut String> {
        match self.state.overlay_mut()? {
            OverlayState::Setup(setup) => Some(match setup.field {
                SetupField::Editor => &mut setup.editor_input,
                SetupField::WinePrefix => &mut setup.prefix_input,
            }),
            _ => None,
        }
    }

    fn submit_setup(&mut self) {
        let Some(OverlayState::Setup(setup)) = self.state.overlay() else {
            return;
        };
        let editor = PathBuf::from(setup.editor_input.trim());
        let prefix = Some(setup.prefix_input.trim())
            .filter(|raw| !raw.is_empty())
            .map(PathBuf::from);
        match self.settings.complete_setup(&editor, prefix.as_deref()) {
            Ok(()) => {
                self.state.set_theme(self.settings.theme());
                self.state.close_overlay();
                self.state.set_status(Severity::Info, "Settings saved");
                self.check_items_dir();
            }
            Err(err) => {
                tracing::warn!(?err, "setup rejected");
                if let Some(OverlayState::Setup(setup)) = self.state.overlay_mut() {
                    setup.error = Some(format!("{err:#}"));
                }
            }
        }
    }

    fn handle_settings_key(&mut self, key: KeyEvent) {
        let field = match self.state.overlay() {
            Some(OverlayState::Settings(settings)) => settings.field,
            _ => return,
        };
        match key.code {
            KeyCode::Esc => self.state.close_overlay(),
            KeyCode::Tab | KeyCode::BackTab | KeyCode::Up | KeyCode::Down => {
                if let Some(OverlayState::Settings(settings)) = self.state.overlay_mut() {
                    settings.field = match settings.field {
                        SettingsField::Editor => SettingsField::Theme,
                        SettingsField::Theme => SettingsField::Editor,
                    };
                }
            }
            KeyCode::Enter => self.save_settings(),
            KeyCode::Char('r') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.reset_settings()
            }
            KeyCode::Left | KeyCode::Right | KeyCode::Char(' ')
                if field == SettingsField::Theme =>
            {
                self.toggle_theme()
            }
            KeyCode::Backspace if field == SettingsField::Editor => {
                if let Some(OverlayState::Settings(settings)) = self.state.overlay_mut() {
                    pop_grapheme(&mut settings.editor_input);
                }
            }
            KeyCode::Char(ch) if field == SettingsField::Editor && is_plain(&key) => {
                if let Some(OverlayState::Settings(settings)) = self.state.overlay_mut() {
                    push_limited(&mut settings.editor_input, ch);
                }
            }
            _ => {}
        }
    }

    fn save_settings(&mut self) {
        let Some(OverlayState::Settings(overlay)) = self.state.overlay() else {
            return;
        };
        let editor = overlay.editor_input.trim().to_string();
        let write = SettingsWrite::Replace {
            mikumikumodel_exe: Some(PathBuf::from(&editor)).filter(|_| !editor.is_empty()),
            wineprefix: self.settings.settings().wineprefix.clone(),
        };
        match self.settings.save(write) {
            Ok(()) => {
                self.state.close_overlay();
                if Path::new(&editor).is_file() {
                    self.state.set_status(Severity::Info, "Settings saved");
                } else {
                    self.state.set_status(
                        Severity::Warning,
                        "Settings saved, but the editor executable was not found",
                    );
                }
            }
            Err(err) => {
                tracing::error!(?err, "failed to save settings");
                self.state
                    .set_status(Severity::Error, format!("Could not save settings: {err:#}"));
            }
        }
    }

    fn reset_settings(&mut self) {
        match self.settings.reset() {
            Ok(()) => {
                self.state.set_theme(self.settings.theme());
                if let Some(OverlayState::Settings(settings)) = self.state.overlay_mut() {
                    settings.editor_input.clear();
                }
                self.state.set_status(Severity::Info, "Settings reset");
            }
            Err(err) => {
                tracing::error!(?err, "failed to reset settings");
                self.state
                    .set_status(Severity::Error, format!("Could not reset settings: {err:#}"));
            }
        }
    }

    fn toggle_theme(&mut self) {
        let next = self.state.theme().toggled();
        match self.settings.set_theme(&next.to_string()) {
            Ok(theme) => {
                self.state.set_theme(theme);
                self.state
                    .set_status(Severity::Info, format!("Theme switched to {theme}"));
            }
            Err(err) => {
                tracing::error!(?err, "failed to persist theme");
                self.state
                    .set_status(Severity::Error, "Could not save the theme");
            }
        }
    }

    fn handle_notes_key(&mut self, key: KeyEvent) {
        match self
            .state
            .notes_overlay()
            .and_then(|overlay| overlay.dialog.as_ref())
        {
            Some(NotesDialog::NewNote { .. }) => self.handle_new_note_key(key),
            Some(NotesDialog::Entry(_)) => self.handle_entry_dialog_key(key),
            Some(NotesDialog::ConfirmDelete { .. }) => self.handle_confirm_delete_key(key),
            None => self.handle_notes_browse_key(key),
        }
    }

    fn handle_notes_browse_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Esc | KeyCode::Char('q') => self.state.close_overlay(),
            KeyCode::Down | KeyCode::Char('j') => self.state.notes_move(1),
            KeyCode::Up | KeyCode::Char('k') => self.state.notes_move(-1),
            KeyCode::Tab
            | KeyCode::BackTab
            | KeyCode::Left
            | KeyCode::Right
            | KeyCode::Char('h')
            | KeyCode::Char('l') => self.state.notes_toggle_focus(),
            KeyCode::Char('N') => self.state.open_new_note_dialog(),
            KeyCode::Char('a') if is_plain(&key) => self.state.open_entry_dialog(EntryMode::Add),
            KeyCode::Char('e') if is_plain(&key) => match self.state.selected_note_entry() {
                Some((index, _)) => self.state.open_entry_dialog(EntryMode::Edit(index)),
                None => self
                    .state
                    .set_status(Severity::Warning, "Select an entry to edit"),
            },
            KeyCode::Char('d') if is_plain(&key) => {
                match self.state.selected_note_entry().map(|(index, _)| index) {
                    Some(index) => {
                        if let Some(overlay) = self.state.notes_overlay_mut() {
                            overlay.dialog = Some(NotesDialog::ConfirmDelete { index });
                        }
                    }
                    None => self
                        .state
                        .set_status(Severity::Warning, "Select an entry to delete"),
                }
            }
            KeyCode::Enter | KeyCode::Char('o') => {
                let target = self
                    .state
                    .selected_note_entry()
                    .map(|(_, entry)| (entry.module_id.clone(), entry.item_id.clone()));
                match target {
                    Some((module_id, item_id)) => self.open_entry(&module_id, &item_id),
                    None => self
                        .state
                        .set_status(Severity::Warning, "Select an entry to open"),
                }
            }
            _ => {}
        }
    }

    fn close_notes_dialog(&mut self) {
        if let Some(overlay) = self.state.notes_overlay_mut() {
            overlay.dialog = None;
        }
    }

    fn handle_new_note_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Esc => self.close_notes_dialog(),
            KeyCode::Enter => self.submit_new_note(),
            KeyCode::Backspace => {
                if let Some(NotesDialog::NewNote { name, .. }) = self
                    .state
                    .notes_overlay_mut()
                    .and_then(|overlay| overlay.dialog.as_mut())
                {
                    pop_grapheme(name);
                }
            }
            KeyCode::Char(ch) if is_plain(&key) => {
                if let Some(NotesDialog::NewNote { name, .. }) = self
                    .state
                    .notes_overlay_mut()
                    .and_then(|overlay| overlay.dialog.as_mut())
                {
                    push_limited(name, ch);
                }
            }
            _ => {}
        }
    }

    fn submit_new_note(&mut self) {
        let Some(NotesDialog::NewNote { name, .. }) = self
            .state
            .notes_overlay()
            .and_then(|overlay| overlay.dialog.as_ref())
        else {
            return;
        };
        let requested = name.clone();
        let actions = NoteActions::new(&self.notes_store);
        match actions.create_note(&mut self.state.notes, &requested) {
            Ok(name) => {
                self.close_notes_dialog();
                self.state.notes_select(Some(&name));
                self.state.set_status(
                    Severity::Info,
                    format!("Created note '{name}'; add an entry to keep it"),
                );
            }
            Err(err) => {
                if let Some(NotesDialog::NewNote { warning, .. }) = self
                    .state
                    .notes_overlay_mut()
                    .and_then(|overlay| overlay.dialog.as_mut())
                {
                    *warning = Some(err.to_string());
                }
            }
        }
    }

    fn handle_entry_dialog_key(&mut self, key: KeyEvent) {
        let Some(field) = self.state.entry_dialog_mut().map(|dialog| dialog.field) else {
            return;
        };
        match key.code {
            KeyCode::Esc => self.close_notes_dialog(),
            KeyCode::Tab | KeyCode::BackTab => self.state.entry_dialog_next_field(),
            KeyCode::Enter => self.submit_entry_dialog(),
            KeyCode::Down if field != EntryField::Description => self.state.entry_dialog_pick(1),
            KeyCode::Up if field != EntryField::Description => self.state.entry_dialog_pick(-1),
            KeyCode::PageDown if field != EntryField::Description => {
                self.state.entry_dialog_pick(PAGE_STEP)
            }
            KeyCode::PageUp if field != EntryField::Description => {
                self.state.entry_dialog_pick(-PAGE_STEP)
            }
            KeyCode::Backspace if field == EntryField::Description => {
                if let Some(dialog) = self.state.entry_dialog_mut() {
                    pop_grapheme(&mut dialog.description);
                }
            }
            KeyCode::Char(ch) if field == EntryField::Description && is_plain(&key) => {
                if let Some(dialog) = self.state.entry_dialog_mut() {
                    push_limited(&mut dialog.description, ch);
                }
            }
            _ => {}
        }
    }

    fn set_entry_warning(&mut self, warning: String) {
        if let Some(dialog) = self.state.entry_dialog_mut() {
            dialog.warning = Some(warning);
        }
    }

    fn submit_entry_dialog(&mut self) {
        let Some(dialog) = self.state.entry_dialog_mut().map(|dialog| dialog.clone()) else {
            return;
        };
        let (module_id, item_id) = self.state.entry_dialog_selection(&dialog);
        let entry = match NoteEntry::new(&module_id, &item_id, &dialog.description) {
            Ok(entry) => entry,
            Err(err) => {
                self.set_entry_warning(format!("Cannot save: {err}"));
                return;
            }
        };
        let actions = NoteActions::new(&self.notes_store);
        let result = match dialog.mode {
            EntryMode::Add => actions.add_entry(&mut self.state.notes, &dialog.note, entry),
            EntryMode::Edit(index) => {
                actions.edit_entry(&mut self.state.notes, &dialog.note, index, entry)
            }
        };
        match result {
            Ok(()) => {
                self.close_notes_dialog();
                self.state.notes_select(Some(&dialog.note));
                if dialog.mode == EntryMode::Add {
                    let last = self
                        .state
                        .notes
                        .entries(&dialog.note)
                        .map(|entries| entries.len().saturating_sub(1))
                        .unwrap_or(0);
                    if let Some(overlay) = self.state.notes_overlay_mut() {
                        overlay.focus = NotesFocus::Entries;
                        overlay.selected_entry = last;
                    }
                }
                self.state.set_status(Severity::Info, "Note saved");
            }
            Err(err) => {
                tracing::error!(?err, note = %dialog.note, "failed to save note entry");
                self.set_entry_warning(format!("{err:#}"));
            }
        }
    }

    fn handle_confirm_delete_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('y') | KeyCode::Enter => self.delete_selected_entry(),
            KeyCode::Char('n') | KeyCode::Esc => self.close_notes_dialog(),
            _ => {}
        }
    }

    fn delete_selected_entry(&mut self) {
        let index = match self
            .state
            .notes_overlay()
            .and_then(|overlay| overlay.dialog.as_ref())
        {
            Some(NotesDialog::ConfirmDelete { index }) => *index,
            _ => return,
        };
        self.close_notes_dialog();
        let Some(name) = self.state.selected_note_name().map(str::to_string) else {
            return;
        };
        let actions = NoteActions::new(&self.notes_store);
        match actions.delete_entry(&mut self.state.notes, &name, index) {
            Ok(removal) => {
                self.state.notes_select(None);
                let text = if removal.note_removed {
                    format!("Deleted the last entry; note '{name}' removed")
                } else {
                    "Entry deleted".to_string()
                };
                self.state.set_status(Severity::Info, text);
            }
            Err(err) => {
                tracing::error!(?err, note = %name, index, "failed to delete note entry");
                self.state
                    .set_status(Severity::Error, format!("Could not delete entry: {err:#}"));
            }
        }
    }

    fn open_selected_item(&mut self) {
        let Some(object) = self.state.selected_item().map(|item| item.object.clone()) else {
            self.state
                .set_status(Severity::Warning, "Select an item to open");
            return;
        };
        if object.is_empty() {
            self.state
                .set_status(Severity::Warning, "This item has no object name");
            return;
        }
        let result = ItemLauncher::from_settings(self.settings.settings(), &self.paths.items_dir)
            .and_then(|launcher| launcher.open(&object, self.spawner.as_ref()));
        self.report_launch(result);
    }

    fn open_entry(&mut self, module_id: &str, item_id: &str) {
        let result = ItemLauncher::from_settings(self.settings.settings(), &self.paths.items_dir)
            .and_then(|launcher| {
                launcher.open_entry(self.state.catalog(), module_id, item_id, self.spawner.as_ref())
            });
        self.report_launch(result);
    }

    fn report_launch(&mut self, result: std::result::Result<PathBuf, LaunchError>) {
        match result {
            Ok(path) => {
                self.state
                    .set_status(Severity::Info, format!("Opened {}", path.display()));
            }
            Err(err) => {
                let (severity, title) = match err.severity() {
                    LaunchSeverity::Warning => {
                        tracing::warn!(?err, "item not opened");
                        (Severity::Warning, "Item not opened")
                    }
                    LaunchSeverity::Error => {
                        tracing::error!(?err, "cannot launch editor");
                        (Severity::Error, "Cannot open item")
                    }
                };
                let body = format!("{:#}", anyhow::Error::new(err));
                self.state.show_message(severity, title, body);
            }
        }
    }
}

fn setup_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>> {
    enable_raw_mode().context("enabling raw mode")?;
    let mut stdout = std::io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)
        .context("switching to alternate screen")?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("creating terminal backend")?;
    terminal.hide_cursor().context("hiding cursor")?;
    Ok(terminal)
}

fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
    terminal.show_cursor().ok();
    disable_raw_mode().context("disabling raw mode")?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )
    .context("restoring screen state")?;
    Ok(())
}
