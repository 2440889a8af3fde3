use crate::catalog::{Catalog, Module};
use crate::config::themes::known_characters;

pub const ALL_CHARACTERS: &str = "All Characters";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum CharacterFilter {
    #[default]
    All,
    Only(String),
}

impl CharacterFilter {
    pub fn from_label(label: &str) -> Self {
        let label = label.trim();
        if label.is_empty() || label.eq_ignore_ascii_case(ALL_CHARACTERS) {
            CharacterFilter::All
        } else {
            CharacterFilter::Only(label.to_string())
        }
    }

    pub fn label(&self) -> &str {
        match self {
            CharacterFilter::All => ALL_CHARACTERS,
            CharacterFilter::Only(name) => name,
        }
    }

    pub fn matches(&self, module: &Module) -> bool {
        match self {
            CharacterFilter::All => true,
            CharacterFilter::Only(name) => module.character == *name,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModuleQuery {
    pub text: String,
    pub character: CharacterFilter,
}

impl ModuleQuery {
    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty() && self.character == CharacterFilter::All
    }

    /// Case-insensitive substring match against the module's display name.
    pub fn matches(&self, module: &Module) -> bool {
        if !self.character.matches(module) {
            return false;
        }
        let needle = self.text.to_lowercase();
        needle.is_empty() || module.display_name().to_lowercase().contains(&needle)
    }

    /// Terms to highlight in rendered rows.
    pub fn highlight_terms(&self) -> Vec<String> {
        let trimmed = self.text.trim();
        if trimmed.is_empty() {
            Vec::new()
        } else {
            vec![trimmed.to_string()]
        }
    }
}

/// Parses command-line style input. `char:<name>` / `character:<name>` set the
/// character filter (underscores stand for spaces); the remaining words form
/// the search text.
pub fn parse_query(input: &str) -> ModuleQuery {
    let mut query = ModuleQuery::default();
    let mut words = Vec::new();
    for raw in input.split_whitespace() {
        let filter = raw
            .strip_prefix("char:")
            .or_else(|| raw.strip_prefix("character:"));
        match filter {
            Some(name) if !name.is_empty() => {
                query.character = CharacterFilter::from_label(&name.replace('_', " "));
            }
            Some(_) => {}
            None => words.push(raw),
        }
    }
    query.text = words.join(" ");
    query
}

pub fn filter_modules<'a>(catalog: &'a Catalog, query: &ModuleQuery) -> Vec<&'a Module> {
    catalog
        .modules()
        .filter(|module| query.matches(module))
        .collect()
}

/// Character filter choices: "All Characters" followed by the known cast and
/// any other characters present in the catalog, sorted.
pub fn character_options(catalog: &Catalog) -> Vec<String> {
    let mut names: Vec<String> = known_characters().map(str::to_string).collect();
    for name in catalog.characters() {
        if !names.contains(&name) {
            names.push(name);
        }
    }
    names.sort();
    let mut options = Vec::with_capacity(names.len() + 1);
    options.push(ALL_CHARACTERS.to_string());
    options.extend(names);
    options
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Catalog {
        let csv = "Module ID,Name (EN),Name (JP),Character,Source,COS ID,Item ID,Object(s),Type\n\
                   m001,Snow Miku,,Miku,X,c1,it01,obj_a,Outfit\n\
                   m002,Append,,Miku,X,c2,it02,obj_b,Outfit\n\
                   m003,Snow Rin,,Rin,X,c3,it03,obj_c,Outfit\n\
                   m004,Guest,,Yowane Haku,X,c4,it04,obj_d,Outfit\n";
        Catalog::from_reader(csv.as_bytes()).expect("catalog")
    }

    fn ids(modules: &[&Module]) -> Vec<String> {
        modules.iter().map(|module| module.id.clone()).collect()
    }

    #[test]
    fn text_matches_display_name_case_insensitively() {
        let catalog = sample();
        let query = ModuleQuery {
            text: "snow".into(),
            character: CharacterFilter::All,
        };
        assert_eq!(ids(&filter_modules(&catalog, &query)), vec!["m001", "m003"]);

        let by_id = ModuleQuery {
            text: "[m002]".into(),
            ..ModuleQuery::default()
        };
        assert_eq!(ids(&filter_modules(&catalog, &by_id)), vec!["m002"]);
    }

    #[test]
    fn character_filter_combines_with_text() {
        let catalog = sample();
        let query = parse_query("char:Miku snow");
        assert_eq!(query.character, CharacterFilter::Only("Miku".into()));
        assert_eq!(query.text, "snow");
        assert_eq!(ids(&filter_modules(&catalog, &query)), vec!["m001"]);

        let spaced = parse_query("character:Yowane_Haku");
        assert_eq!(ids(&filter_modules(&catalog, &spaced)), vec!["m004"]);
    }

    #[test]
    fn empty_query_matches_everything() {
        let catalog = sample();
        let query = parse_query("   ");
        assert!(query.is_empty());
        assert_eq!(filter_modules(&catalog, &query).len(), 4);
        assert!(query.highlight_terms().is_empty());
    }

    #[test]
    fn options_start_with_all_characters() {
        let catalog = sample();
        let options = character_options(&catalog);
        assert_eq!(options[0], ALL_CHARACTERS);
        assert!(options.contains(&"Yowane Haku".to_string()));
        assert!(options.contains(&"Sakine".to_string()));
        let mut sorted = options[1..].to_vec();
        sorted.sort();
        assert_eq!(sorted, options[1..].to_vec());
        assert_eq!(CharacterFilter::from_label(ALL_CHARACTERS), CharacterFilter::All);
    }
}
