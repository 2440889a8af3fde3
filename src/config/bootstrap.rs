//! First-run layout of the application directory.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

use crate::catalog::{icon_file_names, CATALOG_HEADER};
use crate::config::themes::known_characters;
use crate::config::ConfigPaths;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BootstrapReport {
    pub migrated_entries: usize,
    pub kept_legacy_entries: usize,
    pub seeded_catalog: bool,
    pub created_empty_catalog: bool,
    pub copied_icons: Vec<String>,
}

pub fn ensure_app_structure(paths: &ConfigPaths) -> Result<BootstrapReport> {
    paths.ensure_directories()?;
    let mut report = BootstrapReport::default();

    if let Some(legacy) = paths.legacy_dir.as_deref() {
        if legacy.is_dir() && needs_population(paths) {
            match migrate_legacy_dir(legacy, &paths.app_dir) {
                Ok(migration) => {
                    report.migrated_entries = migration.moved;
                    report.kept_legacy_entries = migration.skipped;
                    tracing::info!(
                        from = %legacy.display(),
                        moved = migration.moved,
                        skipped = migration.skipped,
                        "migrated legacy data directory"
                    );
                }
                Err(err) => {
                    tracing::error!(?err, from = %legacy.display(), "legacy data migration failed");
                }
            }
        }
    }

    if !paths.modules_csv.exists() {
        let starter = paths
            .starter_dir
            .as_deref()
            .map(|dir| dir.join("modules_data.csv"))
            .filter(|path| path.is_file());
        match starter {
            Some(starter) => {
                fs::copy(&starter, &paths.modules_csv).with_context(|| {
                    format!("copying starter catalog {}", starter.display())
                })?;
                report.seeded_catalog = true;
            }
            None => {
                let mut header = CATALOG_HEADER.join(",");
                header.push('\n');
                fs::write(&paths.modules_csv, header).with_context(|| {
                    format!("creating catalog {}", paths.modules_csv.display())
                })?;
                report.created_empty_catalog = true;
            }
        }
    }

    if !paths.notes_csv.exists() {
        fs::write(&paths.notes_csv, "")
            .with_context(|| format!("creating notes {}", paths.notes_csv.display()))?;
    }

    if !paths.settings_file.exists() {
        fs::write(&paths.settings_file, "{}")
            .with_context(|| format!("creating settings {}", paths.settings_file.display()))?;
    }

    if let Some(source) = paths.starter_dir.as_deref().map(|dir| dir.join("images")) {
        if source.is_dir() {
            report.copied_icons = copy_character_icons(&source, &paths.images_dir)?;
        }
    }

    Ok(report)
}

/// True when the items folder is missing or holds no entries.
pub fn items_dir_is_empty(items_dir: &Path) -> bool {
    fs::read_dir(items_dir)
        .map(|mut entries| entries.next().is_none())
        .unwrap_or(true)
}

fn needs_population(paths: &ConfigPaths) -> bool {
    let catalog_ready = fs::metadata(&paths.modules_csv)
        .map(|meta| meta.len() > 0)
        .unwrap_or(false);
    !(catalog_ready && paths.notes_csv.exists())
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Migration {
    moved: usize,
    skipped: usize,
}

/// Moves legacy entries into `target` without overwriting anything already
/// there. Directories that exist on both sides are merged file by file. The
/// legacy directory is removed only when every entry made it across.
fn migrate_legacy_dir(legacy: &Path, target: &Path) -> Result<Migration> {
    let mut migration = Migration::default();
    for entry in fs::read_dir(legacy).with_context(|| format!("listing {}", legacy.display()))? {
        let entry = entry?;
        let src = entry.path();
        let dest = target.join(entry.file_name());
        if src.is_dir() && dest.exists() {
            let merged = merge_dir(&src, &dest)?;
            migration.moved += merged.moved;
            migration.skipped += merged.skipped;
        } else if !dest.exists() {
            move_path(&src, &dest)?;
            migration.moved += 1;
        } else {
            tracing::warn!(dest = %dest.display(), "destination exists, leaving legacy copy");
            migration.skipped += 1;
        }
    }
    if migration.skipped == 0 {
        fs::remove_dir_all(legacy)
            .with_context(|| format!("removing legacy directory {}", legacy.display()))?;
    } else {
        tracing::warn!(
            legacy = %legacy.display(),
            skipped = migration.skipped,
            "legacy directory kept, some entries already existed"
        );
    }
    Ok(migration)
}

fn merge_dir(src: &Path, dest: &Path) -> Result<Migration> {
    let mut merged = Migration::default();
    for entry in fs::read_dir(src).with_context(|| format!("listing {}", src.display()))? {
        let entry = entry?;
        let from = entry.path();
        let to = dest.join(entry.file_name());
        if to.exists() {
            tracing::debug!(dest = %to.display(), "destination exists, leaving legacy copy");
            merged.skipped += 1;
            continue;
        }
        if from.is_dir() {
            copy_dir(&from, &to)?;
        } else {
            fs::copy(&from, &to).with_context(|| format!("copying {}", from.display()))?;
        }
        merged.moved += 1;
    }
    Ok(merged)
}

fn move_path(src: &Path, dest: &Path) -> Result<()> {
    if fs::rename(src, dest).is_ok() {
        return Ok(());
    }
    // rename fails across filesystems
    if src.is_dir() {
        copy_dir(src, dest)?;
    } else {
        fs::copy(src, dest).with_context(|| format!("copying {}", src.display()))?;
    }
    Ok(())
}

fn copy_dir(src: &Path, dest: &Path) -> Result<()> {
    fs::create_dir_all(dest).with_context(|| format!("creating {}", dest.display()))?;
    for entry in fs::read_dir(src).with_context(|| format!("listing {}", src.display()))? {
        let entry = entry?;
        let from = entry.path();
        let to = dest.join(entry.file_name());
        if from.is_dir() {
            copy_dir(&from, &to)?;
        } else {
            fs::copy(&from, &to).with_context(|| format!("copying {}", from.display()))?;
        }
    }
    Ok(())
}

fn copy_character_icons(source: &Path, images_dir: &Path) -> Result<Vec<String>> {
    let mut copied = Vec::new();
    for character in known_characters() {
        for file_name in icon_file_names(character) {
            let src = source.join(&file_name);
            let dest = images_dir.join(&file_name);
            if !src.is_file() || dest.exists() {
                continue;
            }
            match fs::copy(&src, &dest) {
                Ok(_) => {
                    copied.push(file_name);
                    break;
                }
                Err(err) => {
                    tracing::warn!(?err, icon = %src.display(), "failed to copy character icon");
                }
            }
        }
    }
    Ok(copied)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    type TestResult<T = ()> = Result<T>;

    #[test]
    fn creates_layout_with_header_only_catalog() -> TestResult {
        let temp = TempDir::new()?;
        let paths = ConfigPaths::rooted(temp.path().join("app"));

        let report = ensure_app_structure(&paths)?;
        assert!(report.created_empty_catalog);
        assert!(paths.items_dir.is_dir());
        assert!(paths.images_dir.is_dir());
        assert_eq!(fs::read_to_string(&paths.settings_file)?, "{}");
        assert_eq!(fs::read_to_string(&paths.notes_csv)?, "");
        let catalog = fs::read_to_string(&paths.modules_csv)?;
        assert!(catalog.starts_with("Module ID,Name (EN),Name (JP)"));
        assert!(items_dir_is_empty(&paths.items_dir));

        let again = ensure_app_structure(&paths)?;
        assert!(!again.created_empty_catalog);
        Ok(())
    }

    #[test]
    fn seeds_catalog_and_icons_from_starter_dir() -> TestResult {
        let temp = TempDir::new()?;
        let starter = temp.path().join("starter");
        fs::create_dir_all(starter.join("images"))?;
        fs::write(starter.join("modules_data.csv"), "Module ID\nm001\n")?;
        fs::write(starter.join("images/Miku.png"), b"png")?;
        fs::write(starter.join("images/Unrelated.png"), b"png")?;

        let mut paths = ConfigPaths::rooted(temp.path().join("app"));
        paths.starter_dir = Some(starter);
        let report = ensure_app_structure(&paths)?;

        assert!(report.seeded_catalog);
        assert_eq!(report.copied_icons, vec!["Miku.png".to_string()]);
        assert!(paths.images_dir.join("Miku.png").is_file());
        assert!(!paths.images_dir.join("Unrelated.png").exists());
        Ok(())
    }

    #[test]
    fn migrates_legacy_directory_without_overwriting() -> TestResult {
        let temp = TempDir::new()?;
        let legacy = temp.path().join("legacy");
        fs::create_dir_all(legacy.join("items"))?;
        fs::write(legacy.join("notes.csv"), "a,m001,it01,desc\n")?;
        fs::write(legacy.join("items/obj_a.farc"), b"farc")?;

        let mut paths = ConfigPaths::rooted(temp.path().join("app"));
        paths.legacy_dir = Some(legacy.clone());
        let report = ensure_app_structure(&paths)?;

        assert_eq!(report.migrated_entries, 2);
        assert!(!legacy.exists());
        assert_eq!(
            fs::read_to_string(&paths.notes_csv)?,
            "a,m001,it01,desc\n"
        );
        assert!(paths.items_dir.join("obj_a.farc").is_file());
        assert!(!items_dir_is_empty(&paths.items_dir));
        Ok(())
    }

    #[test]
    fn legacy_directory_survives_when_entries_collide() -> TestResult {
        let temp = TempDir::new()?;
        let legacy = temp.path().join("legacy");
        fs::create_dir_all(&legacy)?;
        fs::write(legacy.join("modules_data.csv"), "user_edited")?;
        fs::write(legacy.join("notes.csv"), "a,m001,it01,desc\n")?;

        let mut paths = ConfigPaths::rooted(temp.path().join("app"));
        paths.legacy_dir = Some(legacy.clone());
        paths.ensure_directories()?;
        fs::write(&paths.modules_csv, "Module ID\nm001\n")?;

        let report = ensure_app_structure(&paths)?;
        assert_eq!(report.migrated_entries, 1);
        assert_eq!(report.kept_legacy_entries, 1);
        assert_eq!(fs::read_to_string(legacy.join("modules_data.csv"))?, "user_edited");
        assert_eq!(fs::read_to_string(&paths.modules_csv)?, "Module ID\nm001\n");
        assert_eq!(fs::read_to_string(&paths.notes_csv)?, "a,m001,it01,desc\n");
        Ok(())
    }
}
