use std::path::Path;

use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use regex::Regex;
use unicode_width::UnicodeWidthChar;

use crate::catalog::{character_icon, Module};
use crate::config::themes::{character_color, gradient, Palette, Rgb, UiRole};

/// Share of the row width covered by the character colour fade.
pub const GRADIENT_PORTION: f32 = 0.55;
pub const ENTRY_HEIGHT: usize = 1;
const ICON_MARKER: char = '◆';

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Viewport {
    pub offset: usize,
    pub height: usize,
}

impl Viewport {
    pub fn intersects(&self, top: usize, height: usize) -> bool {
        top + height > self.offset && top < self.offset + self.height
    }
}

pub struct RowContext<'a> {
    pub palette: &'a Palette,
    pub width: u16,
    pub highlight: Option<&'a Regex>,
}

#[derive(Debug, Clone)]
struct RenderedRow {
    generation: u64,
    width: u16,
    line: Line<'static>,
}

/// One row of the module list. Knows where it sits in the scrollable area and
/// keeps its last rendering until the view asks it to redraw.
#[derive(Debug, Clone)]
pub struct ModuleEntry {
    module_id: String,
    label: String,
    color: Rgb,
    has_icon: bool,
    top: usize,
    rendered: Option<RenderedRow>,
}

impl ModuleEntry {
    fn new(module: &Module, top: usize, images_dir: &Path) -> Self {
        Self {
            module_id: module.id.clone(),
            label: module.display_name(),
            color: character_color(&module.character),
            has_icon: character_icon(images_dir, &module.character).is_some(),
            top,
            rendered: None,
        }
    }

    pub fn module_id(&self) -> &str {
        &self.module_id
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn is_visible(&self, viewport: &Viewport) -> bool {
        viewport.intersects(self.top, ENTRY_HEIGHT)
    }

    fn is_stale(&self, generation: u64, width: u16) -> bool {
        self.rendered
            .as_ref()
            .map(|row| row.generation != generation || row.width != width)
            .unwrap_or(true)
    }

    fn redraw(&mut self, ctx: &RowContext<'_>, generation: u64) {
        let line = render_row(
            &self.label,
            self.has_icon,
            self.color,
            ctx.palette,
            ctx.width,
            ctx.highlight,
        );
        self.rendered = Some(RenderedRow {
            generation,
            width: ctx.width,
            line,
        });
    }

    pub fn line(&self) -> Option<&Line<'static>> {
        self.rendered.as_ref().map(|row| &row.line)
    }
}

/// Owns the entries for the current filter result and tracks scrolling.
#[derive(Debug, Clone, Default)]
pub struct ModuleListView {
    entries: Vec<ModuleEntry>,
    selected: usize,
    viewport: Viewport,
    generation: u64,
    redraws: u64,
}

impl ModuleListView {
    pub fn rebuild(&mut self, modules: &[&Module], images_dir: &Path) {
        let keep = self.selected_module_id().map(str::to_string);
        self.entries = modules
            .iter()
            .enumerate()
            .map(|(idx, module)| ModuleEntry::new(module, idx * ENTRY_HEIGHT, images_dir))
            .collect();
        self.selected = keep
            .and_then(|id| self.entries.iter().position(|entry| entry.module_id == id))
            .unwrap_or(0);
        self.viewport.offset = 0;
        self.scroll_to_selected();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[ModuleEntry] {
        &self.entries
    }

    pub fn selected(&self) -> usize {
        self.selected
    }

    pub fn selected_module_id(&self) -> Option<&str> {
        self.entries.get(self.selected).map(ModuleEntry::module_id)
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn redraw_count(&self) -> u64 {
        self.redraws
    }

    /// Marks every entry stale, e.g. after a theme or highlight change.
    pub fn invalidate(&mut self) {
        self.generation += 1;
    }

    pub fn set_viewport_height(&mut self, height: usize) {
        self.viewport.height = height;
        self.scroll_to_selected();
    }

    pub fn move_selection(&mut self, delta: isize) {
        if self.entries.is_empty() {
            return;
        }
        let last = self.entries.len() as isize - 1;
        self.selected = (self.selected as isize + delta).clamp(0, last) as usize;
        self.scroll_to_selected();
    }

    pub fn select_first(&mut self) {
        self.selected = 0;
        self.scroll_to_selected();
    }

    pub fn select_last(&mut self) {
        self.selected = self.entries.len().saturating_sub(1);
        self.scroll_to_selected();
    }

    /// Scrolls without moving the selection past the visible window.
    pub fn scroll_by(&mut self, delta: isize) {
        let max_offset = self.content_height().saturating_sub(self.viewport.height);
        let offset = (self.viewport.offset as isize + delta).clamp(0, max_offset as isize);
        self.viewport.offset = offset as usize;
        if self.viewport.height == 0 || self.entries.is_empty() {
            return;
        }
        let first = self.viewport.offset / ENTRY_HEIGHT;
        let last = (self.viewport.offset + self.viewport.height - 1) / ENTRY_HEIGHT;
        let last = last.min(self.entries.len() - 1);
        self.selected = self.selected.clamp(first, last);
    }

    /// Redraws visible entries whose rendering is out of date and returns how
    /// many were redrawn. Off-screen entries are left untouched.
    pub fn refresh_visible(&mut self, ctx: &RowContext<'_>) -> usize {
        let viewport = self.viewport;
        let generation = self.generation;
        let mut redrawn = 0;
        for entry in self
            .entries
            .iter_mut()
            .filter(|entry| entry.is_visible(&viewport))
        {
            if entry.is_stale(generation, ctx.width) {
                entry.redraw(ctx, generation);
                redrawn += 1;
            }
        }
        self.redraws += redrawn as u64;
        redrawn
    }

    /// Entries intersecting the viewport with their index in the list.
    pub fn visible(&self) -> impl Iterator<Item = (usize, &ModuleEntry)> {
        let viewport = self.viewport;
        self.entries
            .iter()
            .enumerate()
            .filter(move |(_, entry)| entry.is_visible(&viewport))
    }

    fn content_height(&self) -> usize {
        self.entries.len() * ENTRY_HEIGHT
    }

    fn scroll_to_selected(&mut self) {
        if self.viewport.height == 0 {
            return;
        }
        let top = self.selected * ENTRY_HEIGHT;
        if top < self.viewport.offset {
            self.viewport.offset = top;
        } else if top + ENTRY_HEIGHT > self.viewport.offset + self.viewport.height {
            self.viewport.offset = top + ENTRY_HEIGHT - self.viewport.height;
        }
    }
}

pub fn to_color(rgb: Rgb) -> Color {
    Color::Rgb(rgb.0, rgb.1, rgb.2)
}

fn render_row(
    label: &str,
    has_icon: bool,
    color: Rgb,
    palette: &Palette,
    width: u16,
    highlight: Option<&Regex>,
) -> Line<'static> {
    let role = palette.style_for(UiRole::Listbox);
    let fade_cols = (width as f32 * GRADIENT_PORTION).round() as usize;
    let fade_start = (width as usize).saturating_sub(fade_cols);
    let stops = gradient(palette.bg, color, fade_cols);
    let cell_bg = |column: usize| match column.checked_sub(fade_start) {
        Some(step) => stops.get(step).copied().unwrap_or(color),
        None => palette.bg,
    };
    let text_fg = to_color(role.fg);

    let marker = if has_icon { ICON_MARKER } else { ' ' };
    let text = format!(" {marker} {label}");
    let matches: Vec<(usize, usize)> = highlight
        .map(|regex| regex.find_iter(&text).map(|m| (m.start(), m.end())).collect())
        .unwrap_or_default();

    let mut spans = Vec::with_capacity(width as usize);
    let mut column = 0usize;
    for (offset, ch) in text.char_indices() {
        let cell_width = ch.width().unwrap_or(0);
        if column + cell_width > width as usize {
            break;
        }
        let bg = cell_bg(column);
        let mut style = Style::default().bg(to_color(bg)).fg(text_fg);
        if matches
            .iter()
            .any(|(start, end)| offset >= *start && offset < *end)
        {
            style = style.add_modifier(Modifier::BOLD | Modifier::UNDERLINED);
        }
        spans.push(Span::styled(ch.to_string(), style));
        column += cell_width;
    }
    while column < width as usize {
        let bg = cell_bg(column);
        spans.push(Span::styled(" ", Style::default().bg(to_color(bg))));
        column += 1;
    }
    Line::from(spans)
}
