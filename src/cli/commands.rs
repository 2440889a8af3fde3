use std::fmt::Write as _;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Args, Subcommand};

use crate::app::{App, NoteActions};
use crate::catalog::{Catalog, Module};
use crate::config::{Settings, SettingsStore};
use crate::launcher::{ItemLauncher, ProcessSpawner};
use crate::notes::{NoteEntry, NotesError, NotesStore};
use crate::search::{filter_modules, parse_query, CharacterFilter};

#[derive(Args, Debug, Clone)]
pub struct ListArgs {
    /// Search text matched against "[id] name (character)"; `char:<name>` filters by character
    #[arg()]
    pub query: Vec<String>,
    /// Only list modules of this character
    #[arg(long)]
    pub character: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct ShowArgs {
    /// Module identifier, e.g. m001
    pub module_id: String,
}

#[derive(Args, Debug, Clone)]
pub struct OpenArgs {
    /// Object name of the item file (without the .farc extension)
    #[arg(conflicts_with_all = ["module", "item"], required_unless_present = "module")]
    pub object: Option<String>,
    /// Module identifier; resolves the object name through the catalog
    #[arg(long, requires = "item")]
    pub module: Option<String>,
    /// Item identifier within the module
    #[arg(long, requires = "module")]
    pub item: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct NotesArgs {
    #[command(subcommand)]
    pub command: NotesCommand,
}

#[derive(Subcommand, Debug, Clone)]
pub enum NotesCommand {
    /// List note names with their entry counts
    List,
    /// Print the entries of one note
    Show(NoteShowArgs),
    /// Add an entry, creating the note when needed
    Add(NoteAddArgs),
    /// Replace fields of an existing entry
    Edit(NoteEditArgs),
    /// Delete an entry; the note goes away with its last entry
    Delete(NoteDeleteArgs),
}

#[derive(Args, Debug, Clone)]
pub struct NoteShowArgs {
    pub name: String,
}

#[derive(Args, Debug, Clone)]
pub struct NoteAddArgs {
    /// Note name
    pub name: String,
    /// Module identifier
    pub module: String,
    /// Item identifier
    pub item: String,
    /// Entry text. If omitted, reads from stdin.
    #[arg(long)]
    pub description: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct NoteEditArgs {
    /// Note name
    pub name: String,
    /// Entry number as printed by `notes show` (starting at 1)
    pub number: usize,
    #[arg(long)]
    pub module: Option<String>,
    #[arg(long)]
    pub item: Option<String>,
    #[arg(long)]
    pub description: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct NoteDeleteArgs {
    /// Note name
    pub name: String,
    /// Entry number as printed by `notes show` (starting at 1)
    pub number: usize,
}

#[derive(Args, Debug, Clone)]
pub struct ThemeArgs {
    /// light or dark; prints the current theme when omitted
    pub theme: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct SetupArgs {
    /// Path to the MikuMikuModel executable
    #[arg(long)]
    pub exe: PathBuf,
    /// Wine prefix used when launching the editor outside Windows
    #[arg(long)]
    pub wineprefix: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct SettingsArgs {
    #[command(subcommand)]
    pub command: SettingsCommand,
}

#[derive(Subcommand, Debug, Clone)]
pub enum SettingsCommand {
    /// Print the settings document
    Show,
    /// Clear the editor path and return to the light theme
    Reset,
}

pub fn run_tui(app: &mut App) -> Result<()> {
    app.run()
}

pub fn list_modules(catalog: &Catalog, args: &ListArgs) -> Result<()> {
    print!("{}", format_module_list(catalog, args));
    Ok(())
}

fn format_module_list(catalog: &Catalog, args: &ListArgs) -> String {
    let mut query = parse_query(&args.query.join(" "));
    if let Some(character) = &args.character {
        query.character = CharacterFilter::from_label(character);
    }
    let modules = filter_modules(catalog, &query);
    if modules.is_empty() {
        return "No modules match.\n".to_string();
    }
    let mut out = String::new();
    for module in &modules {
        let _ = writeln!(&mut out, "{}", module.display_name());
    }
    let _ = writeln!(&mut out, "\n{} of {} modules", modules.len(), catalog.len());
    out
}

pub fn show_module(catalog: &Catalog, args: &ShowArgs) -> Result<()> {
    print!("{}", format_module(catalog, &args.module_id)?);
    Ok(())
}

fn format_module(catalog: &Catalog, module_id: &str) -> Result<String> {
    let Some(module) = catalog.get(module_id.trim()) else {
        bail!("no module with id '{module_id}'");
    };
    let mut out = String::new();
    let _ = writeln!(&mut out, "{}", module.display_name());
    for (name, value) in module.fields() {
        let _ = writeln!(&mut out, "  {name:<10} {value}");
    }
    let _ = writeln!(&mut out, "  Items:");
    for item in &module.items {
        let _ = writeln!(&mut out, "    {:<8} {:<24} {}", item.item_id, item.object, item.kind);
    }
    Ok(out)
}

pub fn open_item(
    catalog: &Catalog,
    settings: &Settings,
    items_dir: &Path,
    spawner: &dyn ProcessSpawner,
    args: OpenArgs,
) -> Result<()> {
    let launcher = ItemLauncher::from_settings(settings, items_dir)?;
    let opened = match (args.object, args.module, args.item) {
        (Some(object), None, None) => launcher.open(&object, spawner)?,
        (None, Some(module), Some(item)) => launcher.open_entry(catalog, &module, &item, spawner)?,
        _ => bail!("pass either an object name or both --module and --item"),
    };
    println!("Opened {}", opened.display());
    Ok(())
}

pub fn handle_notes_command(
    catalog: &Catalog,
    store: &NotesStore,
    args: NotesArgs,
) -> Result<()> {
    let output = run_notes_command(catalog, store, args.command)?;
    print!("{output}");
    Ok(())
}

fn run_notes_command(
    catalog: &Catalog,
    store: &NotesStore,
    command: NotesCommand,
) -> Result<String> {
    let mut book = store.load()?;
    let actions = NoteActions::new(store);
    let mut out = String::new();
    match command {
        NotesCommand::List => {
            if book.is_empty() {
                out.push_str("No notes yet.\n");
            }
            for (name, entries) in book.iter() {
                let _ = writeln!(&mut out, "{name} ({} entries)", entries.len());
            }
        }
        NotesCommand::Show(args) => {
            let name = args.name.trim();
            let entries = book
                .entries(name)
                .ok_or_else(|| NotesError::UnknownNote(name.to_string()))?;
            let _ = writeln!(&mut out, "{name}");
            for (idx, entry) in entries.iter().enumerate() {
                let target = match entry.resolve(catalog) {
                    Some(item) => item.object.clone(),
                    None => "not in catalog".to_string(),
                };
                let _ = writeln!(
                    &mut out,
                    "  {}. [{}] {} ({target}): {}",
                    idx + 1,
                    entry.module_id,
                    entry.item_id,
                    entry.description
                );
            }
        }
        NotesCommand::Add(args) => {
            let name = args.name.trim();
            let description = match args.description {
                Some(description) => description,
                None => read_stdin()?.unwrap_or_default(),
            };
            let entry = NoteEntry::new(&args.module, &args.item, &description)?;
            ensure_in_catalog(catalog, &entry)?;
            actions.add_entry(&mut book, name, entry)?;
            let count = book.entries(name).map(<[NoteEntry]>::len).unwrap_or(0);
            let _ = writeln!(&mut out, "Added entry #{count} to '{name}'");
        }
        NotesCommand::Edit(args) => {
            let name = args.name.trim();
            let index = entry_index(name, args.number)?;
            let current = book
                .entries(name)
                .ok_or_else(|| NotesError::UnknownNote(name.to_string()))?
                .get(index)
                .cloned()
                .ok_or_else(|| NotesError::UnknownEntry {
                    note: name.to_string(),
                    index,
                })?;
            let entry = NoteEntry::new(
                args.module.unwrap_or(current.module_id),
                args.item.unwrap_or(current.item_id),
                args.description.unwrap_or(current.description),
            )?;
            ensure_in_catalog(catalog, &entry)?;
            actions.edit_entry(&mut book, name, index, entry)?;
            let _ = writeln!(&mut out, "Updated entry #{} of '{name}'", args.number);
        }
        NotesCommand::Delete(args) => {
            let name = args.name.trim();
            let index = entry_index(name, args.number)?;
            let removal = actions.delete_entry(&mut book, name, index)?;
            let _ = writeln!(&mut out, "Deleted entry #{} of '{name}'", args.number);
            if removal.note_removed {
                let _ = writeln!(&mut out, "Note '{name}' had no entries left and was removed");
            }
        }
    }
    Ok(out)
}

fn entry_index(name: &str, number: usize) -> Result<usize> {
    number.checked_sub(1).ok_or_else(|| {
        NotesError::UnknownEntry {
            note: name.to_string(),
            index: number,
        }
        .into()
    })
}

fn ensure_in_catalog(catalog: &Catalog, entry: &NoteEntry) -> Result<()> {
    let Some(module) = catalog.get(&entry.module_id) else {
        bail!("module '{}' is not in the catalog", entry.module_id);
    };
    if module.item(&entry.item_id).is_none() {
        bail!(
            "module {} has no item '{}' (items: {})",
            entry.module_id,
            entry.item_id,
            item_ids(module)
        );
    }
    Ok(())
}

fn item_ids(module: &Module) -> String {
    module
        .items
        .iter()
        .map(|item| item.item_id.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

pub fn theme(settings: &mut SettingsStore, args: ThemeArgs) -> Result<()> {
    println!("{}", run_theme(settings, args)?);
    Ok(())
}

fn run_theme(settings: &mut SettingsStore, args: ThemeArgs) -> Result<String> {
    match args.theme {
        None => Ok(settings.theme().to_string()),
        Some(raw) => {
            let theme = settings.set_theme(&raw)?;
            Ok(format!("Theme set to {theme}"))
        }
    }
}

pub fn setup(settings: &mut SettingsStore, args: SetupArgs) -> Result<()> {
    settings.complete_setup(&args.exe, args.wineprefix.as_deref())?;
    println!("Editor set to {}", args.exe.display());
    Ok(())
}

pub fn handle_settings_command(settings: &mut SettingsStore, args: SettingsArgs) -> Result<()> {
    print!("{}", run_settings_command(settings, args.command)?);
    Ok(())
}

fn run_settings_command(settings: &mut SettingsStore, command: SettingsCommand) -> Result<String> {
    let mut out = String::new();
    match command {
        SettingsCommand::Show => {
            let json = serde_json::to_string_pretty(settings.settings())
                .context("serializing settings")?;
            let _ = writeln!(&mut out, "# {}", settings.path().display());
            let _ = writeln!(&mut out, "{json}");
            if settings.needs_setup() {
                out.push_str("# editor not configured; run `divacat setup --exe <PATH>`\n");
            }
        }
        SettingsCommand::Reset => {
            settings.reset()?;
            out.push_str("Settings reset\n");
        }
    }
    Ok(out)
}

fn read_stdin() -> Result<Option<String>> {
    if atty::is(atty::Stream::Stdin) {
        return Ok(None);
    }
    let mut buf = String::new();
    io::stdin()
        .read_to_string(&mut buf)
        .context("reading description from stdin")?;
    Ok(Some(buf))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::themes::ThemeName;
    use crate::launcher::LaunchCommand;
    use assert_matches::assert_matches;
    use std::cell::RefCell;
    use std::fs;
    use tempfile::TempDir;

    type TestResult<T = ()> = Result<T>;

    fn catalog() -> Catalog {
        let csv = "Module ID,Name (EN),Name (JP),Character,Source,COS ID,Item ID,Object(s),Type\n\
                   m001,Snow Miku,雪ミク,Miku,Project DIVA,c1,it01,obj_a,Outfit\n\
                   m001,Snow Miku,雪ミク,Miku,Project DIVA,c1,it02,obj_b,Hair\n\
                   m002,Summer Rin,,Rin,X,c2,it03,obj_c,Outfit\n\
                   m003,Snow Len,,Len,X,c3,it04,obj_d,Outfit\n";
        Catalog::from_reader(csv.as_bytes()).expect("catalog")
    }

    #[derive(Default)]
    struct RecordingSpawner {
        launched: RefCell<Vec<LaunchCommand>>,
    }

    impl ProcessSpawner for RecordingSpawner {
        fn spawn(&self, command: &LaunchCommand) -> io::Result<()> {
            self.launched.borrow_mut().push(command.clone());
            Ok(())
        }
    }

    #[test]
    fn list_combines_text_and_character() {
        let catalog = catalog();
        let all = format_module_list(
            &catalog,
            &ListArgs {
                query: vec!["snow".into()],
                character: None,
            },
        );
        assert!(all.contains("[m001] Snow Miku (Miku)"));
        assert!(all.contains("[m003] Snow Len (Len)"));
        assert!(all.contains("2 of 3 modules"));

        let len_only = format_module_list(
            &catalog,
            &ListArgs {
                query: vec!["snow".into()],
                character: Some("Len".into()),
            },
        );
        assert!(!len_only.contains("m001"));
        assert!(len_only.contains("[m003]"));

        let none = format_module_list(
            &catalog,
            &ListArgs {
                query: vec!["char:Kaito".into()],
                character: None,
            },
        );
        assert_eq!(none, "No modules match.\n");
    }

    #[test]
    fn show_prints_fields_and_items() -> TestResult {
        let output = format_module(&catalog(), "m001")?;
        assert!(output.starts_with("[m001] Snow Miku (Miku)\n"));
        assert!(output.contains("雪ミク"));
        assert!(output.contains("obj_b"));
        assert!(format_module(&catalog(), "m999").is_err());
        Ok(())
    }

    #[test]
    fn notes_add_edit_delete_round_trip() -> TestResult {
        let dir = TempDir::new()?;
        let store = NotesStore::new(dir.path().join("notes.csv"));
        let catalog = catalog();

        let added = run_notes_command(
            &catalog,
            &store,
            NotesCommand::Add(NoteAddArgs {
                name: "winter".into(),
                module: "m001".into(),
                item: "it02".into(),
                description: Some("hair with snow".into()),
            }),
        )?;
        assert_eq!(added, "Added entry #1 to 'winter'\n");

        run_notes_command(
            &catalog,
            &store,
            NotesCommand::Edit(NoteEditArgs {
                name: "winter".into(),
                number: 1,
                module: None,
                item: Some("it01".into()),
                description: None,
            }),
        )?;
        let shown = run_notes_command(
            &catalog,
            &store,
            NotesCommand::Show(NoteShowArgs {
                name: "winter".into(),
            }),
        )?;
        assert!(shown.contains("1. [m001] it01 (obj_a): hair with snow"));

        let deleted = run_notes_command(
            &catalog,
            &store,
            NotesCommand::Delete(NoteDeleteArgs {
                name: "winter".into(),
                number: 1,
            }),
        )?;
        assert!(deleted.contains("was removed"));
        assert_eq!(
            run_notes_command(&catalog, &store, NotesCommand::List)?,
            "No notes yet.\n"
        );
        Ok(())
    }

    #[test]
    fn padded_note_names_resolve_to_the_trimmed_note() -> TestResult {
        let dir = TempDir::new()?;
        let store = NotesStore::new(dir.path().join("notes.csv"));
        let catalog = catalog();

        let added = run_notes_command(
            &catalog,
            &store,
            NotesCommand::Add(NoteAddArgs {
                name: " hair ".into(),
                module: "m001".into(),
                item: "it02".into(),
                description: Some("twin tails".into()),
            }),
        )?;
        assert_eq!(added, "Added entry #1 to 'hair'\n");

        let shown = run_notes_command(
            &catalog,
            &store,
            NotesCommand::Show(NoteShowArgs {
                name: "hair  ".into(),
            }),
        )?;
        assert!(shown.starts_with("hair\n"));

        let deleted = run_notes_command(
            &catalog,
            &store,
            NotesCommand::Delete(NoteDeleteArgs {
                name: " hair ".into(),
                number: 1,
            }),
        )?;
        assert!(deleted.contains("Note 'hair' had no entries left"));
        assert!(store.load()?.is_empty());
        Ok(())
    }

    #[test]
    fn notes_reject_unknown_items_and_bad_numbers() -> TestResult {
        let dir = TempDir::new()?;
        let store = NotesStore::new(dir.path().join("notes.csv"));
        let catalog = catalog();

        let err = run_notes_command(
            &catalog,
            &store,
            NotesCommand::Add(NoteAddArgs {
                name: "x".into(),
                module: "m001".into(),
                item: "it99".into(),
                description: Some("nope".into()),
            }),
        )
        .expect_err("unknown item");
        assert!(err.to_string().contains("it01, it02"));

        let err = run_notes_command(
            &catalog,
            &store,
            NotesCommand::Add(NoteAddArgs {
                name: "x".into(),
                module: "m001".into(),
                item: "it01".into(),
                description: Some("   ".into()),
            }),
        )
        .expect_err("empty description");
        assert_matches!(
            err.downcast_ref::<NotesError>(),
            Some(NotesError::MissingField("description"))
        );

        let err = run_notes_command(
            &catalog,
            &store,
            NotesCommand::Delete(NoteDeleteArgs {
                name: "x".into(),
                number: 0,
            }),
        )
        .expect_err("entry numbers start at 1");
        assert_matches!(
            err.downcast_ref::<NotesError>(),
            Some(NotesError::UnknownEntry { index: 0, .. })
        );
        assert!(!store.path().exists());
        Ok(())
    }

    #[test]
    fn open_resolves_module_item_pairs() -> TestResult {
        let dir = TempDir::new()?;
        let items = dir.path().join("items");
        fs::create_dir_all(&items)?;
        fs::write(items.join("obj_b.farc"), b"farc")?;
        let editor = dir.path().join("mmm.exe");
        fs::write(&editor, b"")?;
        let settings = Settings {
            mikumikumodel_exe: Some(editor),
            ..Settings::default()
        };
        let spawner = RecordingSpawner::default();

        open_item(
            &catalog(),
            &settings,
            &items,
            &spawner,
            OpenArgs {
                object: None,
                module: Some("m001".into()),
                item: Some("it02".into()),
            },
        )?;
        let launched = spawner.launched.borrow();
        assert_eq!(launched.len(), 1);
        assert!(launched[0].file.ends_with("obj_b.farc"));
        Ok(())
    }

    #[test]
    fn theme_and_settings_commands_persist() -> TestResult {
        let dir = TempDir::new()?;
        let path = dir.path().join("settings.json");
        fs::write(&path, r#"{"theme":"light","window":"800x600"}"#)?;
        let mut settings = SettingsStore::load(&path);

        assert_eq!(run_theme(&mut settings, ThemeArgs { theme: None })?, "light");
        run_theme(
            &mut settings,
            ThemeArgs {
                theme: Some("DARK".into()),
            },
        )?;
        assert_eq!(SettingsStore::load(&path).theme(), ThemeName::Dark);
        assert!(run_theme(
            &mut settings,
            ThemeArgs {
                theme: Some("sepia".into())
            }
        )
        .is_err());

        let shown = run_settings_command(&mut settings, SettingsCommand::Show)?;
        assert!(shown.contains("\"window\""));
        assert!(shown.contains("editor not configured"));

        run_settings_command(&mut settings, SettingsCommand::Reset)?;
        let raw = fs::read_to_string(&path)?;
        assert!(raw.contains("800x600"));
        assert_eq!(SettingsStore::load(&path).theme(), ThemeName::Light);
        Ok(())
    }
}
