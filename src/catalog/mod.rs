use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use thiserror::Error;

pub const CATALOG_HEADER: [&str; 9] = [
    "Module ID",
    "Name (EN)",
    "Name (JP)",
    "Character",
    "Source",
    "COS ID",
    "Item ID",
    "Object(s)",
    "Type",
];

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("could not open catalog {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("catalog is not valid CSV")]
    Csv(#[from] csv::Error),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Item {
    pub item_id: String,
    pub object: String,
    pub kind: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Module {
    pub id: String,
    pub name_en: String,
    pub name_jp: String,
    pub character: String,
    pub source: String,
    pub cos_id: String,
    pub items: Vec<Item>,
}

impl Module {
    pub fn display_name(&self) -> String {
        format!("[{}] {} ({})", self.id, self.name_en, self.character)
    }

    pub fn item(&self, item_id: &str) -> Option<&Item> {
        self.items.iter().find(|item| item.item_id == item_id)
    }

    /// Label/value pairs shown in the detail pane, in display order.
    pub fn fields(&self) -> [(&'static str, &str); 6] {
        [
            ("Module ID", self.id.as_str()),
            ("Name (EN)", self.name_en.as_str()),
            ("Name (JP)", self.name_jp.as_str()),
            ("Character", self.character.as_str()),
            ("Source", self.source.as_str()),
            ("COS ID", self.cos_id.as_str()),
        ]
    }
}

/// Read-only module catalog keyed by module ID in first-seen order.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    modules: IndexMap<String, Module>,
}

impl Catalog {
    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let file = File::open(path).map_err(|source| CatalogError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let catalog = Self::from_reader(file)?;
        tracing::info!(
            path = %path.display(),
            modules = catalog.len(),
            "catalog loaded"
        );
        Ok(catalog)
    }

    /// Folds one-row-per-item CSV into modules. Metadata of repeated module
    /// rows is ignored; their items are appended unless already present.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, CatalogError> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(reader);
        let columns: HashMap<String, usize> = reader
            .headers()?
            .iter()
            .enumerate()
            .map(|(idx, name)| (name.trim().to_string(), idx))
            .collect();
        let field = |record: &csv::StringRecord, name: &str| -> String {
            columns
                .get(name)
                .and_then(|idx| record.get(*idx))
                .unwrap_or("")
                .to_string()
        };

        let mut modules: IndexMap<String, Module> = IndexMap::new();
        let mut seen: HashMap<String, HashSet<(String, String, String)>> = HashMap::new();
        for record in reader.records() {
            let record = record?;
            let module_id = field(&record, "Module ID");
            if module_id.is_empty() {
                continue;
            }
            let module = modules.entry(module_id.clone()).or_insert_with(|| Module {
                id: module_id.clone(),
                name_en: field(&record, "Name (EN)"),
                name_jp: field(&record, "Name (JP)"),
                character: field(&record, "Character"),
                source: field(&record, "Source"),
                cos_id: field(&record, "COS ID"),
                items: Vec::new(),
            });
            let item = Item {
                item_id: field(&record, "Item ID"),
                object: field(&record, "Object(s)"),
                kind: field(&record, "Type"),
            };
            let key = (item.item_id.clone(), item.object.clone(), item.kind.clone());
            if seen.entry(module_id).or_default().insert(key) {
                module.items.push(item);
            }
        }
        Ok(Self { modules })
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    pub fn get(&self, module_id: &str) -> Option<&Module> {
        self.modules.get(module_id)
    }

    pub fn modules(&self) -> impl Iterator<Item = &Module> {
        self.modules.values()
    }

    pub fn item(&self, module_id: &str, item_id: &str) -> Option<&Item> {
        self.get(module_id).and_then(|module| module.item(item_id))
    }

    pub fn object_for(&self, module_id: &str, item_id: &str) -> Option<&str> {
        self.item(module_id, item_id)
            .map(|item| item.object.as_str())
            .filter(|object| !object.is_empty())
    }

    /// Distinct non-empty character names, sorted.
    pub fn characters(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .modules
            .values()
            .map(|module| module.character.clone())
            .filter(|name| !name.is_empty())
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        names.sort();
        names
    }

    /// Modules ordered by the number embedded in their ID (`m012` sorts as
    /// 12). IDs without digits follow in ID order.
    pub fn picker_order(&self) -> Vec<&Module> {
        let mut ordered: Vec<&Module> = self.modules.values().collect();
        ordered.sort_by(|a, b| match (numeric_id(&a.id), numeric_id(&b.id)) {
            (Some(x), Some(y)) => x.cmp(&y).then_with(|| a.id.cmp(&b.id)),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => a.id.cmp(&b.id),
        });
        ordered
    }
}

fn numeric_id(id: &str) -> Option<u64> {
    let digits: String = id.chars().filter(|ch| ch.is_ascii_digit()).collect();
    digits.parse().ok()
}

/// Candidate icon names for a character: the exact name, then the
/// lower-snake-case form.
pub fn icon_file_names(character: &str) -> Vec<String> {
    let exact = format!("{character}.png");
    let snake = format!("{}.png", character.to_lowercase().replace(' ', "_"));
    if snake == exact {
        vec![exact]
    } else {
        vec![exact, snake]
    }
}

pub fn character_icon(images_dir: &Path, character: &str) -> Option<PathBuf> {
    if character.is_empty() {
        return None;
    }
    icon_file_names(character)
        .into_iter()
        .map(|name| images_dir.join(name))
        .find(|path| path.is_file())
}
