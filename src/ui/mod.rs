use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{
    Block, Borders, Cell, Clear, List, ListItem, ListState, Paragraph, Row, Table, TableState,
    Wrap,
};
use ratatui::Frame;

use crate::app::list_view::to_color;
use crate::app::state::{
    AppState, EntryDialog, EntryField, EntryMode, FocusPane, NotesDialog, NotesFocus,
    NotesOverlay, OverlayState, SettingsField, SettingsOverlay, SetupField, SetupOverlay,
    Severity,
};
use crate::catalog::{character_icon, Module};
use crate::config::themes::{Palette, UiRole};
use crate::highlight::{build_highlight_regex, highlight_spans};

const CURSOR: char = '▌';

fn role_style(palette: &Palette, role: UiRole) -> Style {
    let role = palette.style_for(role);
    Style::default().bg(to_color(role.bg)).fg(to_color(role.fg))
}

fn selection_style(palette: &Palette, role: UiRole) -> Style {
    let role = palette.style_for(role);
    Style::default()
        .bg(to_color(role.select_bg))
        .fg(to_color(role.select_fg))
        .add_modifier(Modifier::BOLD)
}

fn severity_color(severity: Severity) -> Color {
    match severity {
        Severity::Info => Color::Cyan,
        Severity::Warning => Color::Yellow,
        Severity::Error => Color::Red,
    }
}

fn frame_block<'a>(palette: &Palette, title: &'a str, focused: bool) -> Block<'a> {
    let border = if focused {
        role_style(palette, UiRole::Frame).add_modifier(Modifier::BOLD)
    } else {
        role_style(palette, UiRole::Separator)
    };
    Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(border)
        .style(role_style(palette, UiRole::Frame))
}

pub fn draw_app(frame: &mut Frame, state: &mut AppState) {
    let palette = *state.palette();
    frame.render_widget(
        Block::default().style(role_style(&palette, UiRole::Window)),
        frame.size(),
    );

    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(5),
            Constraint::Length(1),
        ])
        .split(frame.size());

    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(45), Constraint::Percentage(55)])
        .split(vertical[1]);

    draw_filter_bar(frame, state, &palette, vertical[0]);
    draw_module_list(frame, state, &palette, columns[0]);
    draw_details(frame, state, &palette, columns[1]);
    draw_status_line(frame, state, &palette, vertical[2]);
    render_overlay(frame, state, &palette);
}

fn draw_filter_bar(frame: &mut Frame, state: &AppState, palette: &Palette, area: Rect) {
    let label = role_style(palette, UiRole::Label);
    let entry = role_style(palette, UiRole::Entry);
    let mut search = state.query.text.clone();
    if state.is_search_active() {
        search.push(CURSOR);
    }
    let line = Line::from(vec![
        Span::styled("Search: ", label.add_modifier(Modifier::BOLD)),
        Span::styled(format!(" {search} "), entry),
        Span::styled("   Character: ", label.add_modifier(Modifier::BOLD)),
        Span::styled(
            format!(" {} ", state.query.character.label()),
            role_style(palette, UiRole::Combobox),
        ),
    ]);
    let block = frame_block(palette, "Filter", state.is_search_active());
    frame.render_widget(Paragraph::new(line).block(block), area);
}

fn draw_module_list(frame: &mut Frame, state: &mut AppState, palette: &Palette, area: Rect) {
    let title = format!("Modules ({})", state.list.len());
    let block = frame_block(
        palette,
        &title,
        state.focus == FocusPane::Modules && !state.is_search_active(),
    );
    let inner = block.inner(area);
    frame.render_widget(block, area);

    state.prepare_list(inner.width, inner.height);

    if state.list.is_empty() {
        let empty = Paragraph::new("No modules match the current filter.")
            .style(role_style(palette, UiRole::Listbox).add_modifier(Modifier::ITALIC));
        frame.render_widget(empty, inner);
        return;
    }

    frame.render_widget(
        Block::default().style(role_style(palette, UiRole::Listbox)),
        inner,
    );
    let offset = state.list.viewport().offset;
    let selected = state.list.selected();
    let highlight = selection_style(palette, UiRole::Listbox);
    for (index, entry) in state.list.visible() {
        let Some(line) = entry.line() else {
            continue;
        };
        let row = (index - offset) as u16;
        if row >= inner.height {
            break;
        }
        let rect = Rect::new(inner.x, inner.y + row, inner.width, 1);
        let line = if index == selected {
            Line::from(
                line.spans
                    .iter()
                    .map(|span| Span::styled(span.content.clone(), span.style.patch(highlight)))
                    .collect::<Vec<_>>(),
            )
        } else {
            line.clone()
        };
        frame.render_widget(Paragraph::new(line), rect);
    }
}

fn draw_details(frame: &mut Frame, state: &AppState, palette: &Palette, area: Rect) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(10), Constraint::Min(3)])
        .split(area);

    let Some(module) = state.selected_module() else {
        let block = frame_block(palette, "Details", false);
        let hint = Paragraph::new("Select a module to see its details.")
            .style(role_style(palette, UiRole::Label))
            .block(block);
        frame.render_widget(hint, area);
        return;
    };

    let details = Paragraph::new(detail_lines(module, state, palette))
        .block(frame_block(palette, "Details", false))
        .wrap(Wrap { trim: false });
    frame.render_widget(details, rows[0]);

    let tree = role_style(palette, UiRole::Tree);
    let header = Row::new(vec!["Item ID", "Object", "Type"])
        .style(tree.add_modifier(Modifier::BOLD | Modifier::UNDERLINED));
    let items: Vec<Row> = module
        .items
        .iter()
        .map(|item| {
            Row::new(vec![
                Cell::from(item.item_id.clone()),
                Cell::from(item.object.clone()),
                Cell::from(item.kind.clone()),
            ])
        })
        .collect();
    let table = Table::new(
        items,
        [
            Constraint::Percentage(25),
            Constraint::Percentage(50),
            Constraint::Percentage(25),
        ],
    )
    .header(header)
    .style(tree)
    .highlight_style(selection_style(palette, UiRole::Tree))
    .block(frame_block(
        palette,
        "Items (Enter/o to open)",
        state.focus == FocusPane::Items,
    ));
    let selected = (state.focus == FocusPane::Items).then_some(state.item_selected);
    let mut table_state = TableState::default().with_selected(selected);
    frame.render_stateful_widget(table, rows[1], &mut table_state);
}

fn detail_lines(module: &Module, state: &AppState, palette: &Palette) -> Vec<Line<'static>> {
    let label = role_style(palette, UiRole::Label);
    let highlight = build_highlight_regex(&state.query.highlight_terms());
    let mut lines = Vec::with_capacity(8);
    lines.push(Line::from(highlight_spans(
        &module.display_name(),
        highlight.as_ref(),
        label.add_modifier(Modifier::BOLD),
        Style::default().add_modifier(Modifier::UNDERLINED),
    )));
    for (name, value) in module.fields() {
        lines.push(Line::from(vec![
            Span::styled(format!("{name:<12}"), label.add_modifier(Modifier::BOLD)),
            Span::styled(value.to_string(), label),
        ]));
    }
    if let Some(icon) = character_icon(state.images_dir(), &module.character) {
        lines.push(Line::from(vec![
            Span::styled(format!("{:<12}", "Icon"), label.add_modifier(Modifier::BOLD)),
            Span::styled(icon.display().to_string(), label),
        ]));
    }
    lines
}

fn draw_status_line(frame: &mut Frame, state: &AppState, palette: &Palette, area: Rect) {
    let base = role_style(palette, UiRole::Label);
    let line = match state.status() {
        Some(status) => Line::from(Span::styled(
            status.text.clone(),
            base.fg(severity_color(status.severity))
                .add_modifier(Modifier::BOLD),
        )),
        None if state.is_search_active() => Line::from(Span::styled(
            "Type to filter • Enter keep • Esc clear",
            base,
        )),
        None => Line::from(Span::styled(
            "/ search • c character • Tab focus • Enter/o open • n notes • s settings • t theme • q quit",
            base,
        )),
    };
    frame.render_widget(Paragraph::new(line).style(base), area);
}

fn render_overlay(frame: &mut Frame, state: &AppState, palette: &Palette) {
    match state.overlay() {
        Some(OverlayState::Setup(setup)) => draw_setup(frame, setup, palette),
        Some(OverlayState::Settings(settings)) => draw_settings(frame, state, settings, palette),
        Some(OverlayState::Notes(notes)) => draw_notes(frame, state, notes, palette),
        Some(OverlayState::Message(message)) => {
            let area = centered_rect(60, 35, frame.size());
            frame.render_widget(Clear, area);
            let mut lines = vec![
                Line::from(Span::styled(
                    message.title.clone(),
                    Style::default()
                        .fg(severity_color(message.severity))
                        .add_modifier(Modifier::BOLD),
                )),
                Line::from(""),
            ];
            lines.extend(message.body.lines().map(|line| Line::from(line.to_string())));
            lines.push(Line::from(""));
            lines.push(hint_line(palette, "Enter or Esc to dismiss"));
            let paragraph = Paragraph::new(lines)
                .style(role_style(palette, UiRole::Window))
                .block(overlay_block(palette, &message.title, severity_color(message.severity)))
                .wrap(Wrap { trim: false });
            frame.render_widget(paragraph, area);
        }
        None => {}
    }
}

fn overlay_block<'a>(palette: &Palette, title: &'a str, accent: Color) -> Block<'a> {
    Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(Style::default().fg(accent))
        .style(role_style(palette, UiRole::Window))
}

fn hint_line(palette: &Palette, text: &str) -> Line<'static> {
    Line::from(Span::styled(
        text.to_string(),
        role_style(palette, UiRole::Label).add_modifier(Modifier::DIM),
    ))
}

fn input_line(palette: &Palette, label: &str, value: &str, focused: bool) -> Line<'static> {
    let mut shown = value.to_string();
    let entry = if focused {
        shown.push(CURSOR);
        selection_style(palette, UiRole::Entry)
    } else {
        role_style(palette, UiRole::Entry)
    };
    Line::from(vec![
        Span::styled(
            format!("{label:<14}"),
            role_style(palette, UiRole::Label).add_modifier(Modifier::BOLD),
        ),
        Span::styled(format!(" {shown} "), entry),
    ])
}

fn draw_setup(frame: &mut Frame, setup: &SetupOverlay, palette: &Palette) {
    let area = centered_rect(70, 50, frame.size());
    frame.render_widget(Clear, area);
    let mut lines = vec![
        Line::from(Span::styled(
            "Welcome! Point divacat at your MikuMikuModel executable.",
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        input_line(
            palette,
            "Editor",
            &setup.editor_input,
            setup.field == SetupField::Editor,
        ),
    ];
    if !cfg!(windows) {
        lines.push(input_line(
            palette,
            "Wine prefix",
            &setup.prefix_input,
            setup.field == SetupField::WinePrefix,
        ));
    }
    lines.push(Line::from(""));
    if let Some(error) = &setup.error {
        lines.push(Line::from(Span::styled(
            error.clone(),
            Style::default().fg(Color::Red),
        )));
        lines.push(Line::from(""));
    }
    lines.push(hint_line(palette, "Tab switch field • Enter save • Esc quit"));
    let paragraph = Paragraph::new(lines)
        .style(role_style(palette, UiRole::Window))
        .block(overlay_block(palette, "Setup", Color::Cyan))
        .wrap(Wrap { trim: false });
    frame.render_widget(paragraph, area);
}

fn draw_settings(
    frame: &mut Frame,
    state: &AppState,
    settings: &SettingsOverlay,
    palette: &Palette,
) {
    let area = centered_rect(70, 40, frame.size());
    frame.render_widget(Clear, area);
    let theme_focused = settings.field == SettingsField::Theme;
    let theme_style = if theme_focused {
        selection_style(palette, UiRole::Button)
    } else {
        role_style(palette, UiRole::Button)
    };
    let lines = vec![
        input_line(
            palette,
            "Editor",
            &settings.editor_input,
            settings.field == SettingsField::Editor,
        ),
        Line::from(vec![
            Span::styled(
                format!("{:<14}", "Theme"),
                role_style(palette, UiRole::Label).add_modifier(Modifier::BOLD),
            ),
            Span::styled(format!(" ◀ {} ▶ ", state.theme()), theme_style),
        ]),
        Line::from(""),
        hint_line(
            palette,
            "Tab switch field • ←/→ theme • Enter save • Ctrl-r reset • Esc close",
        ),
    ];
    let paragraph = Paragraph::new(lines)
        .style(role_style(palette, UiRole::Window))
        .block(overlay_block(palette, "Settings", Color::Cyan))
        .wrap(Wrap { trim: false });
    frame.render_widget(paragraph, area);
}

fn draw_notes(frame: &mut Frame, state: &AppState, notes: &NotesOverlay, palette: &Palette) {
    let area = centered_rect(85, 80, frame.size());
    frame.render_widget(Clear, area);
    let outer = overlay_block(palette, "Notes", Color::Cyan);
    let inner = outer.inner(area);
    frame.render_widget(outer, area);

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(3), Constraint::Length(1)])
        .split(inner);
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(30), Constraint::Percentage(70)])
        .split(rows[0]);

    let listbox = role_style(palette, UiRole::Listbox);
    let names: Vec<ListItem> = state
        .notes
        .iter()
        .map(|(name, entries)| ListItem::new(format!("{name} ({})", entries.len())))
        .collect();
    let names_list = List::new(names)
        .style(listbox)
        .highlight_style(selection_style(palette, UiRole::Listbox))
        .block(frame_block(palette, "Notes", notes.focus == NotesFocus::Names));
    let mut names_state = ListState::default();
    if !state.notes.is_empty() {
        names_state.select(Some(notes.selected_note));
    }
    frame.render_stateful_widget(names_list, columns[0], &mut names_state);

    let catalog = state.catalog();
    let entries: Vec<ListItem> = state
        .selected_note_name()
        .and_then(|name| state.notes.entries(name))
        .unwrap_or_default()
        .iter()
        .map(|entry| {
            let target = match entry.resolve(catalog) {
                Some(item) => Span::styled(
                    format!("[{}] {} {}", entry.module_id, item.item_id, item.object),
                    listbox.add_modifier(Modifier::BOLD),
                ),
                None => Span::styled(
                    format!("[{}] {} (not in catalog)", entry.module_id, entry.item_id),
                    listbox.fg(Color::Yellow),
                ),
            };
            ListItem::new(vec![
                Line::from(target),
                Line::from(Span::styled(format!("  {}", entry.description), listbox)),
            ])
        })
        .collect();
    let entries_list = List::new(entries)
        .style(listbox)
        .highlight_style(selection_style(palette, UiRole::Listbox))
        .block(frame_block(
            palette,
            "Entries",
            notes.focus == NotesFocus::Entries,
        ));
    let mut entries_state = ListState::default();
    if state.selected_note_entry().is_some() {
        entries_state.select(Some(notes.selected_entry));
    }
    frame.render_stateful_widget(entries_list, columns[1], &mut entries_state);

    frame.render_widget(
        Paragraph::new(hint_line(
            palette,
            "N new note • a add • e edit • d delete • Enter open • Tab switch • Esc close",
        )),
        rows[1],
    );

    match &notes.dialog {
        Some(NotesDialog::NewNote { name, warning }) => {
            let area = centered_rect(50, 25, frame.size());
            frame.render_widget(Clear, area);
            let mut lines = vec![input_line(palette, "Name", name, true), Line::from("")];
            if let Some(warning) = warning {
                lines.push(Line::from(Span::styled(
                    warning.clone(),
                    Style::default().fg(Color::Yellow),
                )));
            }
            lines.push(hint_line(palette, "Enter create • Esc cancel"));
            let paragraph = Paragraph::new(lines)
                .style(role_style(palette, UiRole::Window))
                .block(overlay_block(palette, "New Note", Color::Cyan));
            frame.render_widget(paragraph, area);
        }
        Some(NotesDialog::Entry(dialog)) => draw_entry_dialog(frame, state, dialog, palette),
        Some(NotesDialog::ConfirmDelete { index }) => {
            let area = centered_rect(50, 25, frame.size());
            frame.render_widget(Clear, area);
            let note = state.selected_note_name().unwrap_or_default();
            let lines = vec![
                Line::from(format!("Delete entry #{} from '{note}'?", index + 1)),
                Line::from(""),
                hint_line(palette, "y/Enter delete • n/Esc keep"),
            ];
            let paragraph = Paragraph::new(lines)
                .style(role_style(palette, UiRole::Window))
                .block(overlay_block(palette, "Confirm Delete", Color::Red))
                .wrap(Wrap { trim: false });
            frame.render_widget(paragraph, area);
        }
        None => {}
    }
}

fn draw_entry_dialog(frame: &mut Frame, state: &AppState, dialog: &EntryDialog, palette: &Palette) {
    let area = centered_rect(70, 45, frame.size());
    frame.render_widget(Clear, area);

    let module = dialog
        .module_index
        .and_then(|idx| dialog.module_ids.get(idx))
        .and_then(|id| state.catalog().get(id));
    let module_label = module
        .map(Module::display_name)
        .unwrap_or_else(|| "(choose with ↑/↓)".to_string());
    let item_label = module
        .zip(dialog.item_index)
        .and_then(|(module, idx)| module.items.get(idx))
        .map(|item| format!("{} {} ({})", item.item_id, item.object, item.kind))
        .unwrap_or_else(|| "(choose with ↑/↓)".to_string());

    let picker = |label: &str, value: String, field: EntryField| {
        let style = if dialog.field == field {
            selection_style(palette, UiRole::Combobox)
        } else {
            role_style(palette, UiRole::Combobox)
        };
        Line::from(vec![
            Span::styled(
                format!("{label:<14}"),
                role_style(palette, UiRole::Label).add_modifier(Modifier::BOLD),
            ),
            Span::styled(format!(" {value} "), style),
        ])
    };

    let mut lines = vec![
        Line::from(Span::styled(
            format!("Note: {}", dialog.note),
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        picker("Module", module_label, EntryField::Module),
        picker("Item", item_label, EntryField::Item),
        input_line(
            palette,
            "Description",
            &dialog.description,
            dialog.field == EntryField::Description,
        ),
        Line::from(""),
    ];
    if let Some(warning) = &dialog.warning {
        lines.push(Line::from(Span::styled(
            warning.clone(),
            Style::default().fg(Color::Yellow),
        )));
    }
    lines.push(hint_line(palette, "Tab next field • ↑/↓ pick • Enter save • Esc cancel"));
    let title = match dialog.mode {
        EntryMode::Add => "Add Entry",
        EntryMode::Edit(_) => "Edit Entry",
    };
    let paragraph = Paragraph::new(lines)
        .style(role_style(palette, UiRole::Window))
        .block(overlay_block(palette, title, Color::Cyan))
        .wrap(Wrap { trim: false });
    frame.render_widget(paragraph, area);
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical[1])[1]
}
