use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoEnumIterator};

use crate::config::SettingsError;

#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum ThemeName {
    #[default]
    Light,
    Dark,
}

impl ThemeName {
    pub fn toggled(self) -> Self {
        match self {
            ThemeName::Light => ThemeName::Dark,
            ThemeName::Dark => ThemeName::Light,
        }
    }

    pub fn is_light(self) -> bool {
        matches!(self, ThemeName::Light)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self(r, g, b)
    }

    /// Parses `#rrggbb` (leading `#` optional).
    pub fn from_hex(hex: &str) -> Option<Self> {
        let digits = hex.strip_prefix('#').unwrap_or(hex);
        if digits.len() != 6 || !digits.is_ascii() {
            return None;
        }
        let channel = |range: std::ops::Range<usize>| u8::from_str_radix(&digits[range], 16).ok();
        Some(Self(channel(0..2)?, channel(2..4)?, channel(4..6)?))
    }

    pub fn lerp(self, other: Rgb, t: f32) -> Rgb {
        let t = t.clamp(0.0, 1.0);
        let mix = |a: u8, b: u8| (a as f32 + (b as f32 - a as f32) * t).round() as u8;
        Rgb(mix(self.0, other.0), mix(self.1, other.1), mix(self.2, other.2))
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.0, self.1, self.2)
    }
}

/// Evenly spaced colours from `from` to `to`, both ends included.
pub fn gradient(from: Rgb, to: Rgb, steps: usize) -> Vec<Rgb> {
    match steps {
        0 => Vec::new(),
        1 => vec![to],
        _ => (0..steps)
            .map(|step| from.lerp(to, step as f32 / (steps - 1) as f32))
            .collect(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Palette {
    pub bg: Rgb,
    pub fg: Rgb,
    pub select_bg: Rgb,
    pub select_fg: Rgb,
    pub entry_bg: Rgb,
    pub entry_fg: Rgb,
    pub button_bg: Rgb,
    pub button_fg: Rgb,
    pub frame_bg: Rgb,
    pub listbox_bg: Rgb,
    pub listbox_fg: Rgb,
    pub tree_bg: Rgb,
    pub tree_fg: Rgb,
}

const LIGHT: Palette = Palette {
    bg: Rgb::new(0xff, 0xff, 0xff),
    fg: Rgb::new(0x00, 0x00, 0x00),
    select_bg: Rgb::new(0xde, 0xde, 0xde),
    select_fg: Rgb::new(0xff, 0xff, 0xff),
    entry_bg: Rgb::new(0xff, 0xff, 0xff),
    entry_fg: Rgb::new(0x00, 0x00, 0x00),
    button_bg: Rgb::new(0xf0, 0xf0, 0xf0),
    button_fg: Rgb::new(0x00, 0x00, 0x00),
    frame_bg: Rgb::new(0xf0, 0xf0, 0xf0),
    listbox_bg: Rgb::new(0xff, 0xff, 0xff),
    listbox_fg: Rgb::new(0x00, 0x00, 0x00),
    tree_bg: Rgb::new(0xff, 0xff, 0xff),
    tree_fg: Rgb::new(0x00, 0x00, 0x00),
};

const DARK: Palette = Palette {
    bg: Rgb::new(0x2d, 0x2d, 0x2d),
    fg: Rgb::new(0xff, 0xff, 0xff),
    select_bg: Rgb::new(0xde, 0xde, 0xde),
    select_fg: Rgb::new(0xff, 0xff, 0xff),
    entry_bg: Rgb::new(0x40, 0x40, 0x40),
    entry_fg: Rgb::new(0xff, 0xff, 0xff),
    button_bg: Rgb::new(0x40, 0x40, 0x40),
    button_fg: Rgb::new(0xff, 0xff, 0xff),
    frame_bg: Rgb::new(0x2d, 0x2d, 0x2d),
    listbox_bg: Rgb::new(0x40, 0x40, 0x40),
    listbox_fg: Rgb::new(0xff, 0xff, 0xff),
    tree_bg: Rgb::new(0x40, 0x40, 0x40),
    tree_fg: Rgb::new(0xff, 0xff, 0xff),
};

/// Every kind of surface the front-end paints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter)]
pub enum UiRole {
    Window,
    Frame,
    Label,
    Entry,
    Button,
    Listbox,
    Tree,
    Combobox,
    Separator,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoleStyle {
    pub bg: Rgb,
    pub fg: Rgb,
    pub select_bg: Rgb,
    pub select_fg: Rgb,
}

impl Palette {
    pub fn style_for(&self, role: UiRole) -> RoleStyle {
        let (bg, fg) = match role {
            UiRole::Window | UiRole::Label => (self.bg, self.fg),
            UiRole::Frame => (self.frame_bg, self.fg),
            UiRole::Entry | UiRole::Combobox => (self.entry_bg, self.entry_fg),
            UiRole::Button => (self.button_bg, self.button_fg),
            UiRole::Listbox => (self.listbox_bg, self.listbox_fg),
            UiRole::Tree => (self.tree_bg, self.tree_fg),
            UiRole::Separator => (self.bg, self.fg),
        };
        RoleStyle {
            bg,
            fg,
            select_bg: self.select_bg,
            select_fg: self.select_fg,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ThemeRegistry {
    palettes: Vec<(ThemeName, Palette)>,
}

impl ThemeRegistry {
    pub fn contains(&self, theme: &ThemeName) -> bool {
        self.palettes.iter().any(|(name, _)| name == theme)
    }

    pub fn palette(&self, theme: ThemeName) -> &Palette {
        self.palettes
            .iter()
            .find(|(name, _)| *name == theme)
            .map(|(_, palette)| palette)
            .unwrap_or(&LIGHT)
    }

    /// Resolves a user supplied theme name against the known palettes.
    pub fn parse(&self, raw: &str) -> Result<ThemeName, SettingsError> {
        let name = ThemeName::from_str(raw.trim())
            .map_err(|_| SettingsError::UnknownTheme(raw.trim().to_string()))?;
        if self.contains(&name) {
            Ok(name)
        } else {
            Err(SettingsError::UnknownTheme(raw.trim().to_string()))
        }
    }
}

impl Default for ThemeRegistry {
    fn default() -> Self {
        let palettes = ThemeName::iter()
            .map(|name| match name {
                ThemeName::Light => (name, LIGHT),
                ThemeName::Dark => (name, DARK),
            })
            .collect();
        Self { palettes }
    }
}

pub const DEFAULT_CHARACTER_COLOR: Rgb = Rgb::new(0xdd, 0xdd, 0xdd);

pub const CHARACTER_COLORS: &[(&str, Rgb)] = &[
    ("Miku", Rgb::new(0x00, 0xea, 0xff)),
    ("Len", Rgb::new(0xff, 0xfb, 0x00)),
    ("Rin", Rgb::new(0xff, 0xae, 0x00)),
    ("Kaito", Rgb::new(0x08, 0x00, 0xff)),
    ("Meiko", Rgb::new(0xff, 0x08, 0x00)),
    ("Luka", Rgb::new(0xf5, 0x8e, 0xd3)),
    ("Teto", Rgb::new(0xf7, 0x05, 0x35)),
    ("Neru", Rgb::new(0xff, 0xe6, 0x00)),
    ("Haku", Rgb::new(0xdb, 0xce, 0xf2)),
    ("Sakine", Rgb::new(0x57, 0x25, 0x13)),
];

pub fn character_color(character: &str) -> Rgb {
    CHARACTER_COLORS
        .iter()
        .find(|(name, _)| *name == character)
        .map(|(_, color)| *color)
        .unwrap_or(DEFAULT_CHARACTER_COLOR)
}

pub fn known_characters() -> impl Iterator<Item = &'static str> {
    CHARACTER_COLORS.iter().map(|(name, _)| *name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn parses_theme_names_case_insensitively() {
        let registry = ThemeRegistry::default();
        assert_eq!(registry.parse("dark").unwrap(), ThemeName::Dark);
        assert_eq!(registry.parse(" Light ").unwrap(), ThemeName::Light);
        assert_matches!(
            registry.parse("solarized"),
            Err(SettingsError::UnknownTheme(name)) if name == "solarized"
        );
    }

    #[test]
    fn role_styles_follow_palette_slots() {
        let registry = ThemeRegistry::default();
        let dark = registry.palette(ThemeName::Dark);
        let entry = dark.style_for(UiRole::Entry);
        assert_eq!(entry.bg, Rgb::new(0x40, 0x40, 0x40));
        assert_eq!(entry.fg, Rgb::new(0xff, 0xff, 0xff));
        assert_eq!(dark.style_for(UiRole::Frame).bg, dark.frame_bg);
        assert_eq!(dark.style_for(UiRole::Tree).bg, dark.tree_bg);
    }

    #[test]
    fn gradient_includes_both_ends() {
        let stops = gradient(Rgb::new(0, 0, 0), Rgb::new(200, 100, 0), 3);
        assert_eq!(
            stops,
            vec![Rgb::new(0, 0, 0), Rgb::new(100, 50, 0), Rgb::new(200, 100, 0)]
        );
        assert!(gradient(Rgb::new(0, 0, 0), Rgb::new(1, 1, 1), 0).is_empty());
    }

    #[test]
    fn unknown_characters_use_neutral_color() {
        assert_eq!(character_color("Miku"), Rgb::new(0x00, 0xea, 0xff));
        assert_eq!(character_color("Nobody"), DEFAULT_CHARACTER_COLOR);
        assert_eq!(Rgb::from_hex("#f58ed3"), Some(Rgb::new(0xf5, 0x8e, 0xd3)));
        assert_eq!(Rgb::from_hex("#zzzzzz"), None);
        assert_eq!(Rgb::new(0xf5, 0x8e, 0xd3).to_string(), "#f58ed3");
    }
}
