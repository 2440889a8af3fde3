use std::env;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use once_cell::sync::OnceCell;
use tracing_subscriber::{fmt, EnvFilter};

use crate::app::App;
use crate::catalog::Catalog;
use crate::config::bootstrap::ensure_app_structure;
use crate::config::{ConfigPaths, SettingsStore, HOME_ENV};
use crate::launcher::SystemSpawner;
use crate::notes::NotesStore;

pub mod commands;

use self::commands::{ListArgs, NotesArgs, OpenArgs, SettingsArgs, SetupArgs, ShowArgs, ThemeArgs};

const LOG_FILE: &str = "divacat.log";

#[derive(Parser, Debug)]
#[command(
    name = "divacat",
    version,
    about = "Browse costume modules, keep item notes and open items in MikuMikuModel"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Override the application directory (takes precedence over DIVACAT_HOME)
    #[arg(long, global = true)]
    pub home: Option<PathBuf>,

    /// Minimum log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", global = true)]
    pub log_level: String,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Launch the interactive TUI (default)
    Tui,
    /// Print modules matching a search
    List(ListArgs),
    /// Print one module with its items
    Show(ShowArgs),
    /// Open an item file in the configured editor
    Open(OpenArgs),
    /// Manage item notes
    Notes(NotesArgs),
    /// Print or change the colour theme
    Theme(ThemeArgs),
    /// Configure the editor executable
    Setup(SetupArgs),
    /// Inspect or reset the settings document
    Settings(SettingsArgs),
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    if let Some(path) = &cli.home {
        env::set_var(HOME_ENV, path);
    }

    let paths = ConfigPaths::discover()?;
    paths.ensure_directories()?;
    let command = cli.command.unwrap_or(Commands::Tui);
    let log_file = matches!(command, Commands::Tui).then(|| paths.log_dir.join(LOG_FILE));
    init_tracing(&cli.log_level, log_file.as_deref())
        .with_context(|| format!("initialising logging at level {}", cli.log_level))?;

    let report = ensure_app_structure(&paths).context("preparing application directory")?;
    tracing::debug!(?report, app_dir = %paths.app_dir.display(), "application directory ready");
    let settings = SettingsStore::load(&paths.settings_file);
    dispatch(command, paths, settings)
}

fn dispatch(command: Commands, paths: ConfigPaths, mut settings: SettingsStore) -> Result<()> {
    match command {
        Commands::Tui => {
            let catalog = Arc::new(load_catalog(&paths)?);
            let mut app = App::new(paths, settings, catalog)?;
            commands::run_tui(&mut app)
        }
        Commands::List(args) => commands::list_modules(&load_catalog(&paths)?, &args),
        Commands::Show(args) => commands::show_module(&load_catalog(&paths)?, &args),
        Commands::Open(args) => {
            let catalog = load_catalog(&paths)?;
            commands::open_item(
                &catalog,
                settings.settings(),
                &paths.items_dir,
                &SystemSpawner,
                args,
            )
        }
        Commands::Notes(args) => {
            let catalog = load_catalog(&paths)?;
            let store = NotesStore::new(paths.notes_csv.clone());
            commands::handle_notes_command(&catalog, &store, args)
        }
        Commands::Theme(args) => commands::theme(&mut settings, args),
        Commands::Setup(args) => commands::setup(&mut settings, args),
        Commands::Settings(args) => commands::handle_settings_command(&mut settings, args),
    }
}

/// The catalog is required for every browsing command; failure is fatal.
fn load_catalog(paths: &ConfigPaths) -> Result<Catalog> {
    let catalog = Catalog::load(&paths.modules_csv)
        .map_err(|err| {
            tracing::error!(?err, path = %paths.modules_csv.display(), "catalog failed to load");
            err
        })
        .with_context(|| format!("loading module catalog {}", paths.modules_csv.display()))?;
    Ok(catalog)
}

fn init_tracing(level: &str, log_file: Option<&Path>) -> Result<()> {
    static INIT: OnceCell<()> = OnceCell::new();
    INIT.get_or_try_init(|| {
        let env_filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"));
        match log_file {
            Some(path) => {
                let file = OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(path)
                    .with_context(|| format!("opening log file {}", path.display()))?;
                fmt()
                    .with_env_filter(env_filter)
                    .with_writer(Mutex::new(file))
                    .with_ansi(false)
                    .init();
            }
            None => {
                fmt()
                    .with_env_filter(env_filter)
                    .with_writer(std::io::stderr)
                    .init();
            }
        }
        Ok(())
    })
    .map(|_| ())
}
