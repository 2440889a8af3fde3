use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use directories::{BaseDirs, ProjectDirs};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::config::themes::{ThemeName, ThemeRegistry};

pub mod bootstrap;
pub mod themes;

const APP_DOMAIN: &str = "io";
const APP_ORG: &str = "DivaCat";
const APP_NAME: &str = "divacat";

pub const HOME_ENV: &str = "DIVACAT_HOME";
pub const STARTER_ENV: &str = "DIVACAT_STARTER_DIR";

const SETTINGS_FILE: &str = "settings.json";
const MODULES_FILE: &str = "modules_data.csv";
const NOTES_FILE: &str = "notes.csv";
const LEGACY_DIR: &str = ".divadivamodule";

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("unknown theme '{0}' (expected light or dark)")]
    UnknownTheme(String),
    #[error("editor executable '{}' does not exist", .0.display())]
    InvalidEditor(PathBuf),
    #[error("editor executable path cannot be empty")]
    EmptyEditor,
}

#[derive(Debug, Clone)]
pub struct ConfigPaths {
    pub app_dir: PathBuf,
    pub settings_file: PathBuf,
    pub modules_csv: PathBuf,
    pub notes_csv: PathBuf,
    pub images_dir: PathBuf,
    pub items_dir: PathBuf,
    pub log_dir: PathBuf,
    pub legacy_dir: Option<PathBuf>,
    pub starter_dir: Option<PathBuf>,
}

impl ConfigPaths {
    pub fn discover() -> Result<Self> {
        let app_dir = match env::var(HOME_ENV).ok().filter(|value| !value.is_empty()) {
            Some(home) => PathBuf::from(home),
            None => ProjectDirs::from(APP_DOMAIN, APP_ORG, APP_NAME)
                .context("resolving project data directory")?
                .data_local_dir()
                .to_path_buf(),
        };
        let legacy_dir = BaseDirs::new().map(|base| base.home_dir().join(LEGACY_DIR));
        let starter_dir = env::var(STARTER_ENV)
            .ok()
            .filter(|value| !value.is_empty())
            .map(PathBuf::from)
            .or_else(|| {
                env::current_exe()
                    .ok()
                    .and_then(|exe| exe.parent().map(Path::to_path_buf))
            });

        let mut paths = Self::rooted(app_dir);
        paths.legacy_dir = legacy_dir;
        paths.starter_dir = starter_dir;
        Ok(paths)
    }

    /// Layout under an explicit root with no legacy or starter sources.
    pub fn rooted(app_dir: impl Into<PathBuf>) -> Self {
        let app_dir = app_dir.into();
        Self {
            settings_file: app_dir.join(SETTINGS_FILE),
            modules_csv: app_dir.join(MODULES_FILE),
            notes_csv: app_dir.join(NOTES_FILE),
            images_dir: app_dir.join("images"),
            items_dir: app_dir.join("items"),
            log_dir: app_dir.join("logs"),
            legacy_dir: None,
            starter_dir: None,
            app_dir,
        }
    }

    pub fn ensure_directories(&self) -> Result<()> {
        for dir in [
            &self.app_dir,
            &self.images_dir,
            &self.items_dir,
            &self.log_dir,
        ] {
            fs::create_dir_all(dir)
                .with_context(|| format!("creating application directory {}", dir.display()))?;
        }
        Ok(())
    }
}

/// On-disk settings document. Keys this program does not know about are kept
/// in `extra` so a merge write does not drop them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mikumikumodel_exe: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wineprefix: Option<PathBuf>,
    #[serde(deserialize_with = "lenient_theme")]
    pub theme: ThemeName,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Settings {
    /// Configured editor path, treating an empty string as unset.
    pub fn editor_path(&self) -> Option<&Path> {
        self.mikumikumodel_exe
            .as_deref()
            .filter(|path| !path.as_os_str().is_empty())
    }

    pub fn wine_prefix(&self) -> Option<&Path> {
        self.wineprefix
            .as_deref()
            .filter(|path| !path.as_os_str().is_empty())
    }
}

/// How a save treats the document already on disk.
#[derive(Debug, Clone, PartialEq)]
pub enum SettingsWrite {
    /// Reload the file and overlay the in-memory fields; unknown keys survive.
    Merge,
    /// Write exactly these fields plus the current theme.
    Replace {
        mikumikumodel_exe: Option<PathBuf>,
        wineprefix: Option<PathBuf>,
    },
}

#[derive(Debug, Clone)]
pub struct SettingsStore {
    path: PathBuf,
    current: Settings,
    registry: ThemeRegistry,
}

impl SettingsStore {
    /// Never fails: a missing or unreadable document yields defaults.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let current = read_settings(&path).unwrap_or_else(|err| {
            if path.exists() {
                tracing::warn!(?err, path = %path.display(), "settings unreadable, using defaults");
            }
            Settings::default()
        });
        Self {
            path,
            current,
            registry: ThemeRegistry::default(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn settings(&self) -> &Settings {
        &self.current
    }

    pub fn theme(&self) -> ThemeName {
        self.current.theme
    }

    pub fn needs_setup(&self) -> bool {
        match self.current.editor_path() {
            Some(path) => !path.is_file(),
            None => true,
        }
    }

    pub fn set_theme(&mut self, raw: &str) -> Result<ThemeName> {
        let theme = self.registry.parse(raw)?;
        let previous = std::mem::replace(&mut self.current.theme, theme);
        if let Err(err) = self.save(SettingsWrite::Merge) {
            self.current.theme = previous;
            return Err(err);
        }
        tracing::info!(%theme, "theme changed");
        Ok(theme)
    }

    pub fn save(&mut self, write: SettingsWrite) -> Result<()> {
        let document = match write {
            SettingsWrite::Merge => {
                let mut on_disk = read_settings(&self.path).unwrap_or_default();
                on_disk.theme = self.current.theme;
                if self.current.mikumikumodel_exe.is_some() {
                    on_disk.mikumikumodel_exe = self.current.mikumikumodel_exe.clone();
                }
                if self.current.wineprefix.is_some() {
                    on_disk.wineprefix = self.current.wineprefix.clone();
                }
                for (key, value) in &self.current.extra {
                    on_disk.extra.insert(key.clone(), value.clone());
                }
                on_disk
            }
            SettingsWrite::Replace {
                mikumikumodel_exe,
                wineprefix,
            } => Settings {
                mikumikumodel_exe,
                wineprefix,
                theme: self.current.theme,
                extra: Map::new(),
            },
        };
        write_settings(&self.path, &document)?;
        self.current = document;
        Ok(())
    }

    /// First-run configuration: the editor must exist on disk.
    pub fn complete_setup(&mut self, exe: &Path, wineprefix: Option<&Path>) -> Result<()> {
        if exe.as_os_str().is_empty() {
            return Err(SettingsError::EmptyEditor.into());
        }
        if !exe.is_file() {
            return Err(SettingsError::InvalidEditor(exe.to_path_buf()).into());
        }
        self.current.theme = ThemeName::Light;
        self.save(SettingsWrite::Replace {
            mikumikumodel_exe: Some(exe.to_path_buf()),
            wineprefix: wineprefix.map(Path::to_path_buf),
        })
        .context("saving initial settings")?;
        tracing::info!(exe = %exe.display(), "initial settings saved");
        Ok(())
    }

    /// Clears the editor path and returns to the light theme, keeping any
    /// other keys in the document.
    pub fn reset(&mut self) -> Result<()> {
        self.current.theme = ThemeName::Light;
        self.current.mikumikumodel_exe = Some(PathBuf::new());
        self.save(SettingsWrite::Merge)
            .context("resetting settings")
    }
}

/// Unrecognised theme values read as the default instead of failing the
/// whole document.
fn lenient_theme<'de, D>(deserializer: D) -> Result<ThemeName, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Value>::deserialize(deserializer)?;
    Ok(raw
        .as_ref()
        .and_then(Value::as_str)
        .and_then(|name| name.parse().ok())
        .unwrap_or_default())
}

fn read_settings(path: &Path) -> Result<Settings> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("reading settings {}", path.display()))?;
    serde_json::from_str(&raw).context("parsing settings json")
}

fn write_settings(path: &Path, settings: &Settings) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).with_context(|| format!("creating {}", parent.display()))?;
    }
    let json = serde_json::to_string_pretty(settings).context("serializing settings")?;
    fs::write(path, json).with_context(|| format!("writing settings {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    type TestResult<T = ()> = Result<T>;

    #[test]
    fn set_theme_on_empty_document_persists() -> TestResult {
        let temp = TempDir::new()?;
        let path = temp.path().join("settings.json");
        fs::write(&path, "{}")?;

        let mut store = SettingsStore::load(&path);
        assert_eq!(store.theme(), ThemeName::Light);
        store.set_theme("dark")?;

        let reloaded = SettingsStore::load(&path);
        assert_eq!(reloaded.theme(), ThemeName::Dark);
        assert!(reloaded.settings().editor_path().is_none());
        Ok(())
    }

    #[test]
    fn corrupt_document_falls_back_to_defaults() -> TestResult {
        let temp = TempDir::new()?;
        let path = temp.path().join("settings.json");
        fs::write(&path, "{ not json")?;

        let store = SettingsStore::load(&path);
        assert_eq!(store.settings(), &Settings::default());
        assert!(store.needs_setup());

        let missing = SettingsStore::load(temp.path().join("absent.json"));
        assert_eq!(missing.theme(), ThemeName::Light);
        Ok(())
    }

    #[test]
    fn unknown_theme_on_disk_keeps_other_fields() -> TestResult {
        let temp = TempDir::new()?;
        let path = temp.path().join("settings.json");
        fs::write(
            &path,
            r#"{"mikumikumodel_exe": "/opt/mmm.exe", "theme": "sepia", "geometry": "800x600"}"#,
        )?;
        let store = SettingsStore::load(&path);
        assert_eq!(store.theme(), ThemeName::Light);
        assert_eq!(store.settings().editor_path(), Some(Path::new("/opt/mmm.exe")));
        assert!(store.settings().extra.contains_key("geometry"));
        Ok(())
    }

    #[test]
    fn failed_theme_write_keeps_previous_theme() -> TestResult {
        let temp = TempDir::new()?;
        let blocker = temp.path().join("not-a-dir");
        fs::write(&blocker, "")?;
        let mut store = SettingsStore::load(blocker.join("settings.json"));
        assert!(store.set_theme("dark").is_err());
        assert_eq!(store.theme(), ThemeName::Light);
        Ok(())
    }

    #[test]
    fn unknown_theme_is_rejected_and_not_saved() -> TestResult {
        let temp = TempDir::new()?;
        let path = temp.path().join("settings.json");
        let mut store = SettingsStore::load(&path);
        assert!(store.set_theme("neon").is_err());
        assert!(!path.exists());
        Ok(())
    }

    #[test]
    fn merge_keeps_unknown_keys_and_replace_drops_them() -> TestResult {
        let temp = TempDir::new()?;
        let path = temp.path().join("settings.json");
        fs::write(
            &path,
            r#"{"mikumikumodel_exe": "/opt/mmm.exe", "wineprefix": "/home/u/.wine", "window": 3}"#,
        )?;

        let mut store = SettingsStore::load(&path);
        store.set_theme("dark")?;
        let merged: Value = serde_json::from_str(&fs::read_to_string(&path)?)?;
        assert_eq!(merged["window"], 3);
        assert_eq!(merged["wineprefix"], "/home/u/.wine");
        assert_eq!(merged["theme"], "dark");

        store.save(SettingsWrite::Replace {
            mikumikumodel_exe: Some(PathBuf::from("/opt/other.exe")),
            wineprefix: None,
        })?;
        let replaced: Value = serde_json::from_str(&fs::read_to_string(&path)?)?;
        assert!(replaced.get("window").is_none());
        assert!(replaced.get("wineprefix").is_none());
        assert_eq!(replaced["mikumikumodel_exe"], "/opt/other.exe");
        assert_eq!(replaced["theme"], "dark");
        Ok(())
    }

    #[test]
    fn setup_requires_existing_executable() -> TestResult {
        let temp = TempDir::new()?;
        let path = temp.path().join("settings.json");
        let mut store = SettingsStore::load(&path);
        assert!(store.needs_setup());

        let missing = temp.path().join("missing.exe");
        let err = store
            .complete_setup(&missing, None)
            .expect_err("missing executable must be rejected");
        assert!(matches!(
            err.downcast_ref::<SettingsError>(),
            Some(SettingsError::InvalidEditor(_))
        ));

        let exe = temp.path().join("MikuMikuModel.exe");
        fs::write(&exe, b"MZ")?;
        store.complete_setup(&exe, Some(Path::new("/home/u/.wine")))?;
        assert!(!store.needs_setup());

        let reloaded = SettingsStore::load(&path);
        assert_eq!(reloaded.settings().editor_path(), Some(exe.as_path()));
        assert_eq!(
            reloaded.settings().wine_prefix(),
            Some(Path::new("/home/u/.wine"))
        );
        Ok(())
    }

    #[test]
    fn reset_clears_editor_and_theme() -> TestResult {
        let temp = TempDir::new()?;
        let path = temp.path().join("settings.json");
        fs::write(
            &path,
            r#"{"mikumikumodel_exe": "/opt/mmm.exe", "theme": "dark", "wineprefix": "/w"}"#,
        )?;
        let mut store = SettingsStore::load(&path);
        store.reset()?;

        let reloaded = SettingsStore::load(&path);
        assert_eq!(reloaded.theme(), ThemeName::Light);
        assert!(reloaded.settings().editor_path().is_none());
        assert_eq!(reloaded.settings().wine_prefix(), Some(Path::new("/w")));
        assert!(reloaded.needs_setup());
        Ok(())
    }
}
