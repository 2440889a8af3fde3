//! Opens `.farc` item archives in the external model editor.

use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use thiserror::Error;

use crate::catalog::Catalog;
use crate::config::Settings;

pub const ITEM_EXTENSION: &str = "farc";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Warning,
    Error,
}

#[derive(Debug, Error)]
pub enum LaunchError {
    #[error("the editor executable is not configured; set it in Settings")]
    EditorNotConfigured,
    #[error("the editor executable '{}' does not exist", .0.display())]
    EditorMissing(PathBuf),
    #[error("the items folder '{}' does not exist", .0.display())]
    ItemsDirMissing(PathBuf),
    #[error("item file for '{object}' not found in '{}'", dir.display())]
    NotFound { object: String, dir: PathBuf },
    #[error("could not find an object name for item {item_id} of module {module_id}")]
    UnresolvedItem { module_id: String, item_id: String },
    #[error("could not open {}", path.display())]
    Spawn {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl LaunchError {
    pub fn severity(&self) -> Severity {
        match self {
            LaunchError::EditorNotConfigured
            | LaunchError::EditorMissing(_)
            | LaunchError::Spawn { .. } => Severity::Error,
            LaunchError::ItemsDirMissing(_)
            | LaunchError::NotFound { .. }
            | LaunchError::UnresolvedItem { .. } => Severity::Warning,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LaunchMode {
    /// Run the editor directly with the archive path.
    Native,
    /// Run the editor through `wine`, optionally inside a prefix.
    Wine { prefix: Option<PathBuf> },
}

impl LaunchMode {
    /// Native on Windows, Wine elsewhere.
    pub fn for_platform(settings: &Settings) -> Self {
        if cfg!(windows) {
            LaunchMode::Native
        } else {
            LaunchMode::Wine {
                prefix: settings.wine_prefix().map(Path::to_path_buf),
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchCommand {
    pub program: OsString,
    pub args: Vec<OsString>,
    pub file: PathBuf,
}

pub trait ProcessSpawner {
    fn spawn(&self, command: &LaunchCommand) -> io::Result<()>;
}

/// Starts the process detached from our stdio and does not wait for it.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemSpawner;

impl ProcessSpawner for SystemSpawner {
    fn spawn(&self, command: &LaunchCommand) -> io::Result<()> {
        let child = Command::new(&command.program)
            .args(&command.args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()?;
        tracing::info!(pid = child.id(), file = %command.file.display(), "editor started");
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct ItemLauncher {
    editor: PathBuf,
    items_dir: PathBuf,
    mode: LaunchMode,
}

impl ItemLauncher {
    pub fn new(editor: PathBuf, items_dir: PathBuf, mode: LaunchMode) -> Self {
        Self {
            editor,
            items_dir,
            mode,
        }
    }

    pub fn from_settings(settings: &Settings, items_dir: &Path) -> Result<Self, LaunchError> {
        let editor = settings
            .editor_path()
            .ok_or(LaunchError::EditorNotConfigured)?;
        if !editor.is_file() {
            return Err(LaunchError::EditorMissing(editor.to_path_buf()));
        }
        Ok(Self::new(
            editor.to_path_buf(),
            items_dir.to_path_buf(),
            LaunchMode::for_platform(settings),
        ))
    }

    /// Finds `<object>.farc` by case-insensitive file name.
    pub fn locate(&self, object: &str) -> Result<PathBuf, LaunchError> {
        if !self.items_dir.is_dir() {
            return Err(LaunchError::ItemsDirMissing(self.items_dir.clone()));
        }
        let target = format!("{}.{ITEM_EXTENSION}", object.to_lowercase());
        let entries = fs::read_dir(&self.items_dir)
            .map_err(|_| LaunchError::ItemsDirMissing(self.items_dir.clone()))?;
        entries
            .filter_map(|entry| entry.ok())
            .find(|entry| entry.file_name().to_string_lossy().to_lowercase() == target)
            .map(|entry| absolute(&entry.path()))
            .ok_or_else(|| LaunchError::NotFound {
                object: object.to_string(),
                dir: self.items_dir.clone(),
            })
    }

    pub fn plan(&self, object: &str) -> Result<LaunchCommand, LaunchError> {
        let file = self.locate(object)?;
        let command = match &self.mode {
            LaunchMode::Native => LaunchCommand {
                program: self.editor.clone().into_os_string(),
                args: vec![file.clone().into_os_string()],
                file,
            },
            LaunchMode::Wine { prefix } => {
                let mut args: Vec<OsString> = Vec::with_capacity(4);
                if let Some(prefix) = prefix {
                    let mut assignment = OsString::from("WINEPREFIX=");
                    assignment.push(prefix.as_os_str());
                    args.push(assignment);
                }
                args.push("wine".into());
                args.push(self.editor.clone().into_os_string());
                args.push(wine_path(&file).into());
                LaunchCommand {
                    program: "env".into(),
                    args,
                    file,
                }
            }
        };
        Ok(command)
    }

    pub fn open(&self, object: &str, spawner: &dyn ProcessSpawner) -> Result<PathBuf, LaunchError> {
        let command = self.plan(object)?;
        spawner
            .spawn(&command)
            .map_err(|source| LaunchError::Spawn {
                path: command.file.clone(),
                source,
            })?;
        Ok(command.file)
    }

    /// Resolves a module/item pair to its object name before opening it.
    pub fn open_entry(
        &self,
        catalog: &Catalog,
        module_id: &str,
        item_id: &str,
        spawner: &dyn ProcessSpawner,
    ) -> Result<PathBuf, LaunchError> {
        let object = catalog
            .object_for(module_id, item_id)
            .ok_or_else(|| LaunchError::UnresolvedItem {
                module_id: module_id.to_string(),
                item_id: item_id.to_string(),
            })?;
        self.open(object, spawner)
    }
}

fn absolute(path: &Path) -> PathBuf {
    if path.is_absolute() {
        return path.to_path_buf();
    }
    std::env::current_dir()
        .map(|cwd| cwd.join(path))
        .unwrap_or_else(|_| path.to_path_buf())
}

/// Maps a host path onto Wine's `Z:` drive (`/a/b.farc` -> `Z:\a\b.farc`).
pub fn wine_path(path: &Path) -> String {
    let raw = path.to_string_lossy();
    if raw.len() >= 2 && raw.as_bytes()[1] == b':' {
        return raw.replace('/', "\\");
    }
    format!("Z:{}", raw.replace('/', "\\"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use std::cell::RefCell;
    use tempfile::TempDir;

    #[derive(Default)]
    struct RecordingSpawner {
        calls: RefCell<Vec<LaunchCommand>>,
        fail: bool,
    }

    impl ProcessSpawner for RecordingSpawner {
        fn spawn(&self, command: &LaunchCommand) -> io::Result<()> {
            self.calls.borrow_mut().push(command.clone());
            if self.fail {
                Err(io::Error::new(io::ErrorKind::PermissionDenied, "denied"))
            } else {
                Ok(())
            }
        }
    }

    fn setup() -> (TempDir, PathBuf, PathBuf) {
        let temp = TempDir::new().expect("temp dir");
        let editor = temp.path().join("MikuMikuModel.exe");
        fs::write(&editor, b"MZ").expect("write editor");
        let items = temp.path().join("items");
        fs::create_dir_all(&items).expect("items dir");
        (temp, editor, items)
    }

    #[test]
    fn missing_archive_warns_and_spawns_nothing() {
        let (_temp, editor, items) = setup();
        fs::write(items.join("bar.farc"), b"farc").expect("write");
        let launcher = ItemLauncher::new(editor, items, LaunchMode::Native);
        let spawner = RecordingSpawner::default();

        let err = launcher.open("Foo", &spawner).expect_err("not found");
        assert_matches!(err, LaunchError::NotFound { ref object, .. } if object == "Foo");
        assert_eq!(err.severity(), Severity::Warning);
        assert!(spawner.calls.borrow().is_empty());
    }

    #[test]
    fn archive_lookup_ignores_case() {
        let (_temp, editor, items) = setup();
        fs::write(items.join("MIKITM001.FARC"), b"farc").expect("write");
        let launcher = ItemLauncher::new(editor.clone(), items.clone(), LaunchMode::Native);
        let spawner = RecordingSpawner::default();

        let opened = launcher.open("mikitm001", &spawner).expect("opened");
        assert_eq!(opened, items.join("MIKITM001.FARC"));
        let calls = spawner.calls.borrow();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].program, editor.into_os_string());
        assert_eq!(calls[0].args, vec![opened.into_os_string()]);
    }

    #[test]
    fn wine_mode_wraps_with_env_and_prefix() {
        let (_temp, editor, items) = setup();
        fs::write(items.join("obj_a.farc"), b"farc").expect("write");
        let launcher = ItemLauncher::new(
            editor.clone(),
            items.clone(),
            LaunchMode::Wine {
                prefix: Some(PathBuf::from("/home/u/.wine")),
            },
        );
        let command = launcher.plan("obj_a").expect("plan");
        assert_eq!(command.program, OsString::from("env"));
        assert_eq!(command.args[0], OsString::from("WINEPREFIX=/home/u/.wine"));
        assert_eq!(command.args[1], OsString::from("wine"));
        assert_eq!(command.args[2], editor.into_os_string());
        assert_eq!(command.args[3], OsString::from(wine_path(&items.join("obj_a.farc"))));

        let bare = ItemLauncher::new(
            PathBuf::from("/e.exe"),
            items,
            LaunchMode::Wine { prefix: None },
        );
        assert_eq!(bare.plan("obj_a").expect("plan").args[0], OsString::from("wine"));
    }

    #[test]
    fn wine_paths_use_drive_letters() {
        assert_eq!(
            wine_path(Path::new("/home/u/items/obj.farc")),
            "Z:\\home\\u\\items\\obj.farc"
        );
        assert_eq!(wine_path(Path::new("C:/games/obj.farc")), "C:\\games\\obj.farc");
    }

    #[test]
    fn configuration_problems_are_errors() {
        let (temp, _editor, items) = setup();
        let unset = Settings::default();
        assert_matches!(
            ItemLauncher::from_settings(&unset, &items),
            Err(LaunchError::EditorNotConfigured)
        );

        let missing = Settings {
            mikumikumodel_exe: Some(temp.path().join("gone.exe")),
            ..Settings::default()
        };
        let err = ItemLauncher::from_settings(&missing, &items).expect_err("missing editor");
        assert_eq!(err.severity(), Severity::Error);

        let blank = Settings {
            mikumikumodel_exe: Some(PathBuf::new()),
            ..Settings::default()
        };
        assert_matches!(
            ItemLauncher::from_settings(&blank, &items),
            Err(LaunchError::EditorNotConfigured)
        );
    }

    #[test]
    fn missing_items_folder_and_spawn_failures_surface() {
        let (temp, editor, _items) = setup();
        let launcher = ItemLauncher::new(
            editor.clone(),
            temp.path().join("nowhere"),
            LaunchMode::Native,
        );
        assert_matches!(launcher.locate("obj"), Err(LaunchError::ItemsDirMissing(_)));

        let items = temp.path().join("items");
        fs::write(items.join("obj.farc"), b"farc").expect("write");
        let launcher = ItemLauncher::new(editor, items, LaunchMode::Native);
        let spawner = RecordingSpawner {
            fail: true,
            ..RecordingSpawner::default()
        };
        assert_matches!(launcher.open("obj", &spawner), Err(LaunchError::Spawn { .. }));
    }

    #[test]
    fn dangling_entries_do_not_spawn() {
        let (_temp, editor, items) = setup();
        let csv = "Module ID,Name (EN),Name (JP),Character,Source,COS ID,Item ID,Object(s),Type\n\
                   m001,A,,Miku,X,c1,it01,obj_a,Outfit\n";
        let catalog = Catalog::from_reader(csv.as_bytes()).expect("catalog");
        let launcher = ItemLauncher::new(editor, items, LaunchMode::Native);
        let spawner = RecordingSpawner::default();
        assert_matches!(
            launcher.open_entry(&catalog, "m001", "it99", &spawner),
            Err(LaunchError::UnresolvedItem { .. })
        );
        assert!(spawner.calls.borrow().is_empty());
    }
}
